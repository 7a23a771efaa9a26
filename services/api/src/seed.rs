//! services/api/src/seed.rs
//!
//! Demo data for local development: three courses of three modules each, with
//! videos, PDFs and activities under every resource, plus an admin and two
//! students.

use learning_core::{
    DatabaseService, MediaKind, NewActivity, NewCourse, NewMedia, NewModule, NewResource,
    NewUser, Page, ProgressEngine, TableCounts,
};
use tracing::{info, warn};

use crate::credentials::hash_password;
use crate::error::ApiError;

struct SeedUser {
    email: &'static str,
    password: &'static str,
    is_admin: bool,
}

const USERS: &[SeedUser] = &[
    SeedUser {
        email: "admin@example.com",
        password: "admin123",
        is_admin: true,
    },
    SeedUser {
        email: "user1@example.com",
        password: "user123",
        is_admin: false,
    },
    SeedUser {
        email: "user2@example.com",
        password: "user123",
        is_admin: false,
    },
];

struct SeedCourse {
    name: &'static str,
    description: &'static str,
    background_image: &'static str,
    /// (name, description, background image)
    modules: [(&'static str, &'static str, &'static str); 3],
}

const COURSES: &[SeedCourse] = &[
    SeedCourse {
        name: "Python Programming",
        description: "Learn Python from basics to advanced concepts",
        background_image: "assets/courses/python-bg.jpg",
        modules: [
            ("Python Basics", "Introduction to Python programming", "assets/modules/python-basics.jpg"),
            ("Object-Oriented Programming", "Learn OOP concepts in Python", "assets/modules/python-oop.jpg"),
            ("Advanced Python", "Advanced Python features and patterns", "assets/modules/python-advanced.jpg"),
        ],
    },
    SeedCourse {
        name: "Web Development",
        description: "Full-stack web development course",
        background_image: "assets/courses/web-bg.jpg",
        modules: [
            ("HTML & CSS", "Web fundamentals", "assets/modules/web-basics.jpg"),
            ("JavaScript", "Interactive web programming", "assets/modules/javascript.jpg"),
            ("Backend Development", "Server-side programming", "assets/modules/backend.jpg"),
        ],
    },
    SeedCourse {
        name: "Data Science",
        description: "Introduction to data science and analytics",
        background_image: "assets/courses/data-bg.jpg",
        modules: [
            ("Data Analysis", "Introduction to data analysis", "assets/modules/data-analysis.jpg"),
            ("Machine Learning", "Basic machine learning concepts", "assets/modules/machine-learning.jpg"),
            ("Data Visualization", "Creating effective visualizations", "assets/modules/data-viz.jpg"),
        ],
    },
];

/// Inserts the demo catalog and accounts. Returns `None` without writing
/// anything when the database already has users.
pub async fn seed_demo_data(db: &dyn DatabaseService) -> Result<Option<TableCounts>, ApiError> {
    if !db.list_users(Page::new(0, 1)).await?.is_empty() {
        warn!("Database already has users; skipping seed");
        return Ok(None);
    }

    for course in COURSES {
        seed_course(db, course).await?;
    }

    // Users come last so their initial unlocks point at the seeded catalog.
    let engine = ProgressEngine::new(db);
    for user in USERS {
        let created = db
            .create_user(NewUser {
                email: user.email.to_string(),
                password_hash: hash_password(user.password)?,
                is_admin: user.is_admin,
            })
            .await?;
        engine.initialize_user(created.id).await?;
        info!(user_id = created.id, email = user.email, is_admin = user.is_admin, "Seeded user");
    }

    Ok(Some(db.table_counts().await?))
}

async fn seed_course(db: &dyn DatabaseService, seed: &SeedCourse) -> Result<(), ApiError> {
    let course = db
        .create_course(NewCourse {
            name: seed.name.to_string(),
            description: Some(seed.description.to_string()),
            background_image: Some(seed.background_image.to_string()),
        })
        .await?;

    for (name, description, background_image) in seed.modules {
        let module = db
            .create_module(NewModule {
                description: Some(description.to_string()),
                background_image: Some(background_image.to_string()),
                ..NewModule::new(course.id, name)
            })
            .await?;

        for resource_name in [
            format!("Introduction to {}", name),
            format!("Practice - {}", name),
            format!("Advanced {}", name),
        ] {
            let resource = db
                .create_resource(NewResource {
                    module_id: module.id,
                    name: resource_name,
                })
                .await?;
            seed_resource_content(db, module.id, resource.id, &resource.name).await?;
        }
    }

    info!(course_id = course.id, name = seed.name, "Seeded course");
    Ok(())
}

async fn seed_resource_content(
    db: &dyn DatabaseService,
    module_id: i64,
    resource_id: i64,
    resource_name: &str,
) -> Result<(), ApiError> {
    let media = [
        (MediaKind::Video, format!("Introduction Video - {}", resource_name), "videos", "intro.mp4", "video", 1),
        (MediaKind::Video, format!("Tutorial Video - {}", resource_name), "videos", "tutorial.mp4", "video", 2),
        (MediaKind::Pdf, format!("Study Guide - {}", resource_name), "pdfs", "guide.pdf", "pdf", 1),
        (MediaKind::Pdf, format!("Exercise Sheet - {}", resource_name), "pdfs", "exercises.pdf", "pdf", 2),
    ];
    for (kind, title, folder, file, thumb, n) in media {
        db.create_media(
            kind,
            NewMedia {
                resource_id,
                title,
                url: format!("https://example.com/{}/{}/{}/{}", folder, module_id, resource_id, file),
                thumbnail: Some(format!("assets/thumbnails/{}_{}_{}.jpg", thumb, resource_id, n)),
            },
        )
        .await?;
    }

    for prefix in ["Quiz", "Programming Exercise"] {
        db.create_activity(NewActivity {
            resource_id,
            name: format!("{} - {}", prefix, resource_name),
            completed: false,
            score: 0.0,
        })
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use learning_core::memory::MemoryStore;
    use learning_core::ProgressScope;

    #[tokio::test]
    async fn seeds_the_full_catalog_once() {
        let store = MemoryStore::new();

        let counts = seed_demo_data(&store).await.unwrap().unwrap();
        assert_eq!(counts.users, 3);
        assert_eq!(counts.courses, 3);
        assert_eq!(counts.modules, 9);
        assert_eq!(counts.resources, 27);
        assert_eq!(counts.videos, 54);
        assert_eq!(counts.pdfs, 54);
        assert_eq!(counts.activities, 54);

        assert!(seed_demo_data(&store).await.unwrap().is_none());
        assert_eq!(store.table_counts().await.unwrap().courses, 3);
    }

    #[tokio::test]
    async fn seeded_users_can_start_the_first_module() {
        let store = MemoryStore::new();
        seed_demo_data(&store).await.unwrap();

        let student = store.get_user_by_email("user1@example.com").await.unwrap();
        assert!(!student.is_admin);
        assert!(crate::credentials::verify_password("user123", &student.password_hash));

        let unlocked = store
            .list_progress(ProgressScope::Module, student.id)
            .await
            .unwrap();
        assert_eq!(unlocked.len(), 1);
        let module = store.get_module(unlocked[0].entity_id).await.unwrap();
        assert_eq!(module.name, "Python Basics");

        let pdf = store.get_media(MediaKind::Pdf, 1).await.unwrap();
        assert_eq!(pdf.url, "https://example.com/pdfs/1/1/guide.pdf");
    }
}
