//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learning_core::domain::{
    Activity, ActivityPatch, ActivityProgress, Course, CoursePatch, Media, MediaKind,
    MediaPatch, Module, ModulePatch, NewActivity, NewCourse, NewMedia, NewModule, NewResource,
    NewUser, Page, Progress, ProgressChange, ProgressScope, Resource, ResourcePatch,
    StudentScore, TableCounts, User, UserCredentials, UserPatch,
};
use learning_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool, Postgres};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn port_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => return PortError::Conflict(db_err.message().to_string()),
            // foreign_key_violation
            Some("23503") => return PortError::Integrity(db_err.message().to_string()),
            _ => {}
        }
    }
    PortError::Unexpected(e.to_string())
}

fn email_conflict(e: sqlx::Error, email: &str) -> PortError {
    match port_error(e) {
        PortError::Conflict(_) => PortError::Conflict(format!("Email {} already registered", email)),
        other => other,
    }
}

fn not_found(what: &str, id: i64) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

/// Turns an `execute` result into `NotFound` when nothing was touched.
fn expect_affected(
    result: Result<sqlx::postgres::PgQueryResult, sqlx::Error>,
    what: &str,
    id: i64,
) -> PortResult<()> {
    match result.map_err(port_error)?.rows_affected() {
        0 => Err(not_found(what, id)),
        _ => Ok(()),
    }
}

fn media_table(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video => "videos",
        MediaKind::Pdf => "pdfs",
    }
}

/// (table, entity column) for a progress scope.
fn progress_table(scope: ProgressScope) -> (&'static str, &'static str) {
    match scope {
        ProgressScope::Module => ("user_module_progress", "module_id"),
        ProgressScope::Course => ("user_course_progress", "course_id"),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, email, password_hash, is_admin";
const COURSE_COLUMNS: &str = "id, name, description, background_image";
const MODULE_COLUMNS: &str =
    "id, course_id, name, description, background_image, locked, completed, score";
const RESOURCE_COLUMNS: &str = "id, module_id, name";
const MEDIA_COLUMNS: &str = "id, resource_id, title, url, thumbnail";
const ACTIVITY_COLUMNS: &str = "id, resource_id, name, completed, score";
const SCORE_COLUMNS: &str = "id, user_id, module_id, total_score, completed_at";

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password_hash: String,
    is_admin: bool,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            is_admin: self.is_admin,
        }
    }

    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            is_admin: self.is_admin,
        }
    }
}

#[derive(FromRow)]
struct CourseRecord {
    id: i64,
    name: String,
    description: Option<String>,
    background_image: Option<String>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            name: self.name,
            description: self.description,
            background_image: self.background_image,
        }
    }
}

#[derive(FromRow)]
struct ModuleRecord {
    id: i64,
    course_id: i64,
    name: String,
    description: Option<String>,
    background_image: Option<String>,
    locked: bool,
    completed: bool,
    score: f64,
}
impl ModuleRecord {
    fn to_domain(self) -> Module {
        Module {
            id: self.id,
            course_id: self.course_id,
            name: self.name,
            description: self.description,
            background_image: self.background_image,
            locked: self.locked,
            completed: self.completed,
            score: self.score,
        }
    }
}

#[derive(FromRow)]
struct ResourceRecord {
    id: i64,
    module_id: i64,
    name: String,
}
impl ResourceRecord {
    fn to_domain(self) -> Resource {
        Resource {
            id: self.id,
            module_id: self.module_id,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct MediaRecord {
    id: i64,
    resource_id: i64,
    title: String,
    url: String,
    thumbnail: Option<String>,
}
impl MediaRecord {
    fn to_domain(self, kind: MediaKind) -> Media {
        Media {
            id: self.id,
            resource_id: self.resource_id,
            kind,
            title: self.title,
            url: self.url,
            thumbnail: self.thumbnail,
        }
    }
}

#[derive(FromRow)]
struct ActivityRecord {
    id: i64,
    resource_id: i64,
    name: String,
    completed: bool,
    score: f64,
}
impl ActivityRecord {
    fn to_domain(self) -> Activity {
        Activity {
            id: self.id,
            resource_id: self.resource_id,
            name: self.name,
            completed: self.completed,
            score: self.score,
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    user_id: i64,
    entity_id: i64,
    locked: bool,
    completed: bool,
    last_accessed: DateTime<Utc>,
}
impl ProgressRecord {
    fn to_domain(self, scope: ProgressScope) -> Progress {
        Progress {
            user_id: self.user_id,
            scope,
            entity_id: self.entity_id,
            locked: self.locked,
            completed: self.completed,
            last_accessed: self.last_accessed,
        }
    }
}

#[derive(FromRow)]
struct ScoreRecord {
    id: i64,
    user_id: i64,
    module_id: i64,
    total_score: f64,
    completed_at: DateTime<Utc>,
}
impl ScoreRecord {
    fn to_domain(self) -> StudentScore {
        StudentScore {
            id: self.id,
            user_id: self.user_id,
            module_id: self.module_id,
            total_score: self.total_score,
            completed_at: self.completed_at,
        }
    }
}

#[derive(FromRow)]
struct ActivityProgressRecord {
    user_id: i64,
    activity_id: i64,
    completed: bool,
}
impl ActivityProgressRecord {
    fn to_domain(self) -> ActivityProgress {
        ActivityProgress {
            user_id: self.user_id,
            activity_id: self.activity_id,
            completed: self.completed,
        }
    }
}

#[derive(FromRow)]
struct TableCountsRecord {
    users: i64,
    courses: i64,
    modules: i64,
    resources: i64,
    videos: i64,
    pdfs: i64,
    activities: i64,
}

//=========================================================================================
// Shared Statements
//=========================================================================================

fn upsert_progress_sql(scope: ProgressScope) -> String {
    let (table, column) = progress_table(scope);
    format!(
        "INSERT INTO {table} (user_id, {column}, locked, completed, last_accessed) \
         VALUES ($1, $2, COALESCE($3, TRUE), COALESCE($4, FALSE), COALESCE($5, NOW())) \
         ON CONFLICT (user_id, {column}) DO UPDATE SET \
             locked = COALESCE($3, {table}.locked), \
             completed = COALESCE($4, {table}.completed), \
             last_accessed = COALESCE($5, {table}.last_accessed) \
         RETURNING user_id, {column} AS entity_id, locked, completed, last_accessed"
    )
}

async fn upsert_progress_with<'e, E>(
    executor: E,
    scope: ProgressScope,
    user_id: i64,
    entity_id: i64,
    change: ProgressChange,
) -> PortResult<Progress>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let sql = upsert_progress_sql(scope);
    let record = sqlx::query_as::<_, ProgressRecord>(&sql)
        .bind(user_id)
        .bind(entity_id)
        .bind(change.locked)
        .bind(change.completed)
        .bind(change.accessed_at)
        .fetch_one(executor)
        .await
        .map_err(port_error)?;
    Ok(record.to_domain(scope))
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users ---

    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (email, password_hash, is_admin) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| email_conflict(e, &new_user.email))?;
        Ok(record.to_domain())
    }

    async fn register_user(&self, email: &str, password_hash: &str) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(port_error)?;

        // Serializes concurrent registrations so only one can see an empty table.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(port_error)?;

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (email, password_hash, is_admin) \
             SELECT $1, $2, NOT EXISTS (SELECT 1 FROM users) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| email_conflict(e, email))?;

        tx.commit().await.map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: i64) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(port_error)?
            .map(UserRecord::to_domain)
            .ok_or_else(|| not_found("User", user_id))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(UserRecord::to_credentials)
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn list_users(&self, page: Page) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_user(&self, user_id: i64, patch: UserPatch) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET \
                 email = COALESCE($2, email), \
                 password_hash = COALESCE($3, password_hash), \
                 is_admin = COALESCE($4, is_admin) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(patch.email)
        .bind(patch.password_hash)
        .bind(patch.is_admin)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(UserRecord::to_domain)
        .ok_or_else(|| not_found("User", user_id))
    }

    async fn delete_user(&self, user_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await;
        expect_affected(result, "User", user_id)
    }

    // --- Courses ---

    async fn create_course(&self, new_course: NewCourse) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "INSERT INTO courses (name, description, background_image) VALUES ($1, $2, $3) \
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(new_course.name)
        .bind(new_course.description)
        .bind(new_course.background_image)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn get_course(&self, course_id: i64) -> PortResult<Course> {
        sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(CourseRecord::to_domain)
        .ok_or_else(|| not_found("Course", course_id))
    }

    async fn list_courses(&self, page: Page) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_course(&self, course_id: i64, patch: CoursePatch) -> PortResult<Course> {
        sqlx::query_as::<_, CourseRecord>(&format!(
            "UPDATE courses SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 background_image = COALESCE($4, background_image) \
             WHERE id = $1 RETURNING {COURSE_COLUMNS}"
        ))
        .bind(course_id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.background_image)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(CourseRecord::to_domain)
        .ok_or_else(|| not_found("Course", course_id))
    }

    async fn delete_course(&self, course_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await;
        expect_affected(result, "Course", course_id)
    }

    async fn first_course(&self) -> PortResult<Option<Course>> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY id LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(CourseRecord::to_domain))
    }

    async fn next_course(&self, after_course_id: i64) -> PortResult<Option<Course>> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id > $1 ORDER BY id LIMIT 1"
        ))
        .bind(after_course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(CourseRecord::to_domain))
    }

    // --- Modules ---

    async fn create_module(&self, new_module: NewModule) -> PortResult<Module> {
        let record = sqlx::query_as::<_, ModuleRecord>(&format!(
            "INSERT INTO modules (course_id, name, description, background_image, locked, completed, score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {MODULE_COLUMNS}"
        ))
        .bind(new_module.course_id)
        .bind(new_module.name)
        .bind(new_module.description)
        .bind(new_module.background_image)
        .bind(new_module.locked)
        .bind(new_module.completed)
        .bind(new_module.score)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn get_module(&self, module_id: i64) -> PortResult<Module> {
        sqlx::query_as::<_, ModuleRecord>(&format!(
            "SELECT {MODULE_COLUMNS} FROM modules WHERE id = $1"
        ))
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(ModuleRecord::to_domain)
        .ok_or_else(|| not_found("Module", module_id))
    }

    async fn list_modules(&self, page: Page) -> PortResult<Vec<Module>> {
        let records = sqlx::query_as::<_, ModuleRecord>(&format!(
            "SELECT {MODULE_COLUMNS} FROM modules ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_modules_by_course(&self, course_id: i64) -> PortResult<Vec<Module>> {
        let records = sqlx::query_as::<_, ModuleRecord>(&format!(
            "SELECT {MODULE_COLUMNS} FROM modules WHERE course_id = $1 ORDER BY id"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_module(&self, module_id: i64, patch: ModulePatch) -> PortResult<Module> {
        sqlx::query_as::<_, ModuleRecord>(&format!(
            "UPDATE modules SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 background_image = COALESCE($4, background_image), \
                 locked = COALESCE($5, locked), \
                 completed = COALESCE($6, completed), \
                 score = COALESCE($7, score) \
             WHERE id = $1 RETURNING {MODULE_COLUMNS}"
        ))
        .bind(module_id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.background_image)
        .bind(patch.locked)
        .bind(patch.completed)
        .bind(patch.score)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(ModuleRecord::to_domain)
        .ok_or_else(|| not_found("Module", module_id))
    }

    async fn delete_module(&self, module_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM modules WHERE id = $1")
            .bind(module_id)
            .execute(&self.pool)
            .await;
        expect_affected(result, "Module", module_id)
    }

    // --- Resources ---

    async fn create_resource(&self, new_resource: NewResource) -> PortResult<Resource> {
        let record = sqlx::query_as::<_, ResourceRecord>(&format!(
            "INSERT INTO resources (module_id, name) VALUES ($1, $2) RETURNING {RESOURCE_COLUMNS}"
        ))
        .bind(new_resource.module_id)
        .bind(new_resource.name)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn get_resource(&self, resource_id: i64) -> PortResult<Resource> {
        sqlx::query_as::<_, ResourceRecord>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1"
        ))
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(ResourceRecord::to_domain)
        .ok_or_else(|| not_found("Resource", resource_id))
    }

    async fn list_resources(&self, page: Page) -> PortResult<Vec<Resource>> {
        let records = sqlx::query_as::<_, ResourceRecord>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_resources_by_module(&self, module_id: i64) -> PortResult<Vec<Resource>> {
        let records = sqlx::query_as::<_, ResourceRecord>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE module_id = $1 ORDER BY id"
        ))
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_resource(
        &self,
        resource_id: i64,
        patch: ResourcePatch,
    ) -> PortResult<Resource> {
        sqlx::query_as::<_, ResourceRecord>(&format!(
            "UPDATE resources SET name = COALESCE($2, name) WHERE id = $1 RETURNING {RESOURCE_COLUMNS}"
        ))
        .bind(resource_id)
        .bind(patch.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(ResourceRecord::to_domain)
        .ok_or_else(|| not_found("Resource", resource_id))
    }

    async fn delete_resource(&self, resource_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(resource_id)
            .execute(&self.pool)
            .await;
        expect_affected(result, "Resource", resource_id)
    }

    // --- Videos and PDFs ---

    async fn create_media(&self, kind: MediaKind, new_media: NewMedia) -> PortResult<Media> {
        let table = media_table(kind);
        let record = sqlx::query_as::<_, MediaRecord>(&format!(
            "INSERT INTO {table} (resource_id, title, url, thumbnail) VALUES ($1, $2, $3, $4) \
             RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(new_media.resource_id)
        .bind(new_media.title)
        .bind(new_media.url)
        .bind(new_media.thumbnail)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.to_domain(kind))
    }

    async fn get_media(&self, kind: MediaKind, media_id: i64) -> PortResult<Media> {
        let table = media_table(kind);
        sqlx::query_as::<_, MediaRecord>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM {table} WHERE id = $1"
        ))
        .bind(media_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(|r| r.to_domain(kind))
        .ok_or_else(|| not_found(kind.label(), media_id))
    }

    async fn list_media(&self, kind: MediaKind, page: Page) -> PortResult<Vec<Media>> {
        let table = media_table(kind);
        let records = sqlx::query_as::<_, MediaRecord>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM {table} ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain(kind)).collect())
    }

    async fn list_media_by_resource(
        &self,
        kind: MediaKind,
        resource_id: i64,
    ) -> PortResult<Vec<Media>> {
        let table = media_table(kind);
        let records = sqlx::query_as::<_, MediaRecord>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM {table} WHERE resource_id = $1 ORDER BY id"
        ))
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain(kind)).collect())
    }

    async fn list_media_by_module(
        &self,
        kind: MediaKind,
        module_id: i64,
    ) -> PortResult<Vec<Media>> {
        let table = media_table(kind);
        let records = sqlx::query_as::<_, MediaRecord>(&format!(
            "SELECT m.id, m.resource_id, m.title, m.url, m.thumbnail FROM {table} m \
             JOIN resources r ON r.id = m.resource_id \
             WHERE r.module_id = $1 ORDER BY m.id"
        ))
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain(kind)).collect())
    }

    async fn update_media(
        &self,
        kind: MediaKind,
        media_id: i64,
        patch: MediaPatch,
    ) -> PortResult<Media> {
        let table = media_table(kind);
        sqlx::query_as::<_, MediaRecord>(&format!(
            "UPDATE {table} SET \
                 title = COALESCE($2, title), \
                 url = COALESCE($3, url), \
                 thumbnail = COALESCE($4, thumbnail) \
             WHERE id = $1 RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(media_id)
        .bind(patch.title)
        .bind(patch.url)
        .bind(patch.thumbnail)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(|r| r.to_domain(kind))
        .ok_or_else(|| not_found(kind.label(), media_id))
    }

    async fn delete_media(&self, kind: MediaKind, media_id: i64) -> PortResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", media_table(kind)))
            .bind(media_id)
            .execute(&self.pool)
            .await;
        expect_affected(result, kind.label(), media_id)
    }

    // --- Activities ---

    async fn create_activity(&self, new_activity: NewActivity) -> PortResult<Activity> {
        let record = sqlx::query_as::<_, ActivityRecord>(&format!(
            "INSERT INTO activities (resource_id, name, completed, score) VALUES ($1, $2, $3, $4) \
             RETURNING {ACTIVITY_COLUMNS}"
        ))
        .bind(new_activity.resource_id)
        .bind(new_activity.name)
        .bind(new_activity.completed)
        .bind(new_activity.score)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn get_activity(&self, activity_id: i64) -> PortResult<Activity> {
        sqlx::query_as::<_, ActivityRecord>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = $1"
        ))
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(ActivityRecord::to_domain)
        .ok_or_else(|| not_found("Activity", activity_id))
    }

    async fn list_activities(&self, page: Page) -> PortResult<Vec<Activity>> {
        let records = sqlx::query_as::<_, ActivityRecord>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_activities_by_resource(&self, resource_id: i64) -> PortResult<Vec<Activity>> {
        let records = sqlx::query_as::<_, ActivityRecord>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE resource_id = $1 ORDER BY id"
        ))
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_activities_by_module(&self, module_id: i64) -> PortResult<Vec<Activity>> {
        let records = sqlx::query_as::<_, ActivityRecord>(
            "SELECT a.id, a.resource_id, a.name, a.completed, a.score FROM activities a \
             JOIN resources r ON r.id = a.resource_id \
             WHERE r.module_id = $1 ORDER BY a.id",
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_activity(
        &self,
        activity_id: i64,
        patch: ActivityPatch,
    ) -> PortResult<Activity> {
        sqlx::query_as::<_, ActivityRecord>(&format!(
            "UPDATE activities SET \
                 name = COALESCE($2, name), \
                 completed = COALESCE($3, completed), \
                 score = COALESCE($4, score) \
             WHERE id = $1 RETURNING {ACTIVITY_COLUMNS}"
        ))
        .bind(activity_id)
        .bind(patch.name)
        .bind(patch.completed)
        .bind(patch.score)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(ActivityRecord::to_domain)
        .ok_or_else(|| not_found("Activity", activity_id))
    }

    async fn delete_activity(&self, activity_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM activities WHERE id = $1")
            .bind(activity_id)
            .execute(&self.pool)
            .await;
        expect_affected(result, "Activity", activity_id)
    }

    // --- Progress ---

    async fn get_progress(
        &self,
        scope: ProgressScope,
        user_id: i64,
        entity_id: i64,
    ) -> PortResult<Option<Progress>> {
        let (table, column) = progress_table(scope);
        let record = sqlx::query_as::<_, ProgressRecord>(&format!(
            "SELECT user_id, {column} AS entity_id, locked, completed, last_accessed \
             FROM {table} WHERE user_id = $1 AND {column} = $2"
        ))
        .bind(user_id)
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(|r| r.to_domain(scope)))
    }

    async fn list_progress(
        &self,
        scope: ProgressScope,
        user_id: i64,
    ) -> PortResult<Vec<Progress>> {
        let (table, column) = progress_table(scope);
        let records = sqlx::query_as::<_, ProgressRecord>(&format!(
            "SELECT user_id, {column} AS entity_id, locked, completed, last_accessed \
             FROM {table} WHERE user_id = $1 ORDER BY {column}"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain(scope)).collect())
    }

    async fn upsert_progress(
        &self,
        scope: ProgressScope,
        user_id: i64,
        entity_id: i64,
        change: ProgressChange,
    ) -> PortResult<Progress> {
        upsert_progress_with(&self.pool, scope, user_id, entity_id, change).await
    }

    async fn record_module_completion(
        &self,
        user_id: i64,
        module_id: i64,
        total_score: f64,
        at: DateTime<Utc>,
    ) -> PortResult<(Progress, StudentScore)> {
        let mut tx = self.pool.begin().await.map_err(port_error)?;

        let progress = upsert_progress_with(
            &mut *tx,
            ProgressScope::Module,
            user_id,
            module_id,
            ProgressChange::complete(at),
        )
        .await?;

        let score = sqlx::query_as::<_, ScoreRecord>(&format!(
            "INSERT INTO student_scores (user_id, module_id, total_score, completed_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, module_id) DO UPDATE SET \
                 total_score = EXCLUDED.total_score, \
                 completed_at = EXCLUDED.completed_at \
             RETURNING {SCORE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(module_id)
        .bind(total_score)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(port_error)?;

        tx.commit().await.map_err(port_error)?;
        Ok((progress, score.to_domain()))
    }

    // --- Scores ---

    async fn get_score(&self, user_id: i64, module_id: i64) -> PortResult<Option<StudentScore>> {
        let record = sqlx::query_as::<_, ScoreRecord>(&format!(
            "SELECT {SCORE_COLUMNS} FROM student_scores WHERE user_id = $1 AND module_id = $2"
        ))
        .bind(user_id)
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(ScoreRecord::to_domain))
    }

    async fn list_scores_for_user(&self, user_id: i64) -> PortResult<Vec<StudentScore>> {
        let records = sqlx::query_as::<_, ScoreRecord>(&format!(
            "SELECT {SCORE_COLUMNS} FROM student_scores WHERE user_id = $1 ORDER BY module_id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_scores_for_module(&self, module_id: i64) -> PortResult<Vec<StudentScore>> {
        let records = sqlx::query_as::<_, ScoreRecord>(&format!(
            "SELECT {SCORE_COLUMNS} FROM student_scores WHERE module_id = $1 \
             ORDER BY total_score DESC, id"
        ))
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn upsert_activity_progress(
        &self,
        user_id: i64,
        activity_id: i64,
        completed: bool,
    ) -> PortResult<ActivityProgress> {
        let record = sqlx::query_as::<_, ActivityProgressRecord>(
            "INSERT INTO user_activity_progress (user_id, activity_id, completed) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, activity_id) DO UPDATE SET completed = EXCLUDED.completed \
             RETURNING user_id, activity_id, completed",
        )
        .bind(user_id)
        .bind(activity_id)
        .bind(completed)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn list_activity_progress(&self, user_id: i64) -> PortResult<Vec<ActivityProgress>> {
        let records = sqlx::query_as::<_, ActivityProgressRecord>(
            "SELECT user_id, activity_id, completed FROM user_activity_progress \
             WHERE user_id = $1 ORDER BY activity_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Admin ---

    async fn table_counts(&self) -> PortResult<TableCounts> {
        let r = sqlx::query_as::<_, TableCountsRecord>(
            "SELECT \
                 (SELECT COUNT(*) FROM users) AS users, \
                 (SELECT COUNT(*) FROM courses) AS courses, \
                 (SELECT COUNT(*) FROM modules) AS modules, \
                 (SELECT COUNT(*) FROM resources) AS resources, \
                 (SELECT COUNT(*) FROM videos) AS videos, \
                 (SELECT COUNT(*) FROM pdfs) AS pdfs, \
                 (SELECT COUNT(*) FROM activities) AS activities",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(TableCounts {
            users: r.users,
            courses: r.courses,
            modules: r.modules,
            resources: r.resources,
            videos: r.videos,
            pdfs: r.pdfs,
            activities: r.activities,
        })
    }
}
