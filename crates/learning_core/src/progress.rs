//! crates/learning_core/src/progress.rs
//!
//! The progress/unlock engine. It owns every rule about when a module or
//! course is locked, unlocked or completed for a user, and how a user's
//! module score is computed.
//!
//! Effective state: a stored progress row always wins. Without one, the first
//! course (lowest id) and the first module of that course are unlocked and
//! everything else is locked. Read paths never write rows; rows are created at
//! registration (`initialize_user`) and by the completion flow.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::info;

use crate::domain::{
    Activity, ActivityPatch, Course, Module, Page, Progress, ProgressChange, ProgressScope,
    ProgressState, Resource, StudentScore,
};
use crate::ports::{DatabaseService, PortResult};

//=========================================================================================
// Read Models
//=========================================================================================

#[derive(Debug, Clone)]
pub struct CourseWithProgress {
    pub course: Course,
    pub progress: ProgressState,
}

#[derive(Debug, Clone)]
pub struct ModuleWithProgress {
    pub module: Module,
    pub progress: ProgressState,
    pub score: Option<StudentScore>,
}

/// What the unlock cascade opened up after a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Unlocked {
    /// The next module of the same course.
    Module(Module),
    /// The next course, together with its first module when it has one.
    Course {
        course: Course,
        first_module: Option<Module>,
    },
    /// The completed module was the last module of the last course.
    Nothing,
}

#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub module: Module,
    pub progress: Progress,
    pub score: StudentScore,
    pub unlocked: Unlocked,
    pub course_completed: bool,
}

#[derive(Debug, Clone)]
pub struct ResourceProgress {
    pub resource: Resource,
    pub locked: bool,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct ModuleProgressNode {
    pub module: Module,
    pub progress: ProgressState,
    pub score: f64,
    pub resources: Vec<ResourceProgress>,
}

#[derive(Debug, Clone)]
pub struct CourseProgressTree {
    pub course: Course,
    pub progress: ProgressState,
    pub modules: Vec<ModuleProgressNode>,
}

//=========================================================================================
// The Engine
//=========================================================================================

/// Applies progress rules on top of a `DatabaseService`.
pub struct ProgressEngine<'a> {
    db: &'a dyn DatabaseService,
}

impl<'a> ProgressEngine<'a> {
    pub fn new(db: &'a dyn DatabaseService) -> Self {
        Self { db }
    }

    /// Stores unlocked rows for the first course and its first module.
    /// Does nothing while the catalog is empty.
    pub async fn initialize_user(&self, user_id: i64) -> PortResult<()> {
        let Some(course) = self.db.first_course().await? else {
            return Ok(());
        };
        self.db
            .upsert_progress(ProgressScope::Course, user_id, course.id, ProgressChange::unlock())
            .await?;
        if let Some(module) = self.first_module(course.id).await? {
            self.db
                .upsert_progress(ProgressScope::Module, user_id, module.id, ProgressChange::unlock())
                .await?;
        }
        info!(user_id, course_id = course.id, "Initialized progress for new user");
        Ok(())
    }

    pub async fn courses_with_progress(
        &self,
        user_id: i64,
        page: Page,
    ) -> PortResult<Vec<CourseWithProgress>> {
        let courses = self.db.list_courses(page).await?;
        let first_course_id = self.db.first_course().await?.map(|c| c.id);
        let rows = self.progress_rows(ProgressScope::Course, user_id).await?;

        Ok(courses
            .into_iter()
            .map(|course| {
                let progress = effective(&rows, course.id, first_course_id == Some(course.id));
                CourseWithProgress { course, progress }
            })
            .collect())
    }

    /// Modules of one course with the user's state and score.
    pub async fn modules_with_progress(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> PortResult<Vec<ModuleWithProgress>> {
        let course = self.db.get_course(course_id).await?;
        let first_course_id = self.db.first_course().await?.map(|c| c.id);
        let rows = self.progress_rows(ProgressScope::Module, user_id).await?;
        let mut scores: HashMap<i64, StudentScore> = self
            .db
            .list_scores_for_user(user_id)
            .await?
            .into_iter()
            .map(|s| (s.module_id, s))
            .collect();

        let is_first_course = first_course_id == Some(course.id);
        let modules = self.db.list_modules_by_course(course.id).await?;
        Ok(modules
            .into_iter()
            .enumerate()
            .map(|(index, module)| {
                let progress = effective(&rows, module.id, is_first_course && index == 0);
                let score = scores.remove(&module.id);
                ModuleWithProgress {
                    module,
                    progress,
                    score,
                }
            })
            .collect())
    }

    /// Marks a module completed, recomputes the score and unlocks what follows.
    ///
    /// The completion and the score are written together. The cascade runs
    /// afterwards; if it fails the completion stays committed.
    pub async fn complete_module(
        &self,
        user_id: i64,
        module_id: i64,
    ) -> PortResult<CompletionOutcome> {
        self.db.get_user(user_id).await?;
        let module = self.db.get_module(module_id).await?;

        let total = self.module_score(module.id).await?;
        let now = Utc::now();
        let (progress, score) = self
            .db
            .record_module_completion(user_id, module.id, total, now)
            .await?;
        info!(user_id, module_id, total_score = total, "Module completed");

        let unlocked = self.unlock_next(user_id, &module).await?;
        let course_completed = self.refresh_course_completion(user_id, module.course_id).await?;

        Ok(CompletionOutcome {
            module,
            progress,
            score,
            unlocked,
            course_completed,
        })
    }

    /// Sets the user's completion flag for a module. Completing goes through
    /// `complete_module`; clearing only resets the flag.
    pub async fn set_module_progress(
        &self,
        user_id: i64,
        module_id: i64,
        completed: bool,
    ) -> PortResult<ModuleWithProgress> {
        if completed {
            let outcome = self.complete_module(user_id, module_id).await?;
            return Ok(ModuleWithProgress {
                progress: ProgressState::from(&outcome.progress),
                score: Some(outcome.score),
                module: outcome.module,
            });
        }

        let module = self.db.get_module(module_id).await?;
        let current = self.module_state(user_id, &module).await?;
        let row = self
            .db
            .upsert_progress(
                ProgressScope::Module,
                user_id,
                module.id,
                ProgressChange {
                    locked: Some(current.locked),
                    completed: Some(false),
                    accessed_at: Some(Utc::now()),
                },
            )
            .await?;
        self.clear_course_completion(user_id, module.course_id).await?;
        let score = self.db.get_score(user_id, module.id).await?;
        Ok(ModuleWithProgress {
            module,
            progress: ProgressState::from(&row),
            score,
        })
    }

    /// Records a submitted activity: the activity is marked completed with the
    /// submitted score, and the user's activity progress is stored.
    pub async fn submit_activity(
        &self,
        user_id: i64,
        activity_id: i64,
        score: f64,
    ) -> PortResult<Activity> {
        let activity = self
            .db
            .update_activity(
                activity_id,
                ActivityPatch {
                    completed: Some(true),
                    score: Some(score),
                    ..ActivityPatch::default()
                },
            )
            .await?;
        self.db
            .upsert_activity_progress(user_id, activity.id, true)
            .await?;
        info!(user_id, activity_id, score, "Activity submitted");
        Ok(activity)
    }

    /// The user's whole course → module → resource tree.
    pub async fn progress_overview(&self, user_id: i64) -> PortResult<Vec<CourseProgressTree>> {
        let course_rows = self.progress_rows(ProgressScope::Course, user_id).await?;
        let module_rows = self.progress_rows(ProgressScope::Module, user_id).await?;
        let scores: HashMap<i64, f64> = self
            .db
            .list_scores_for_user(user_id)
            .await?
            .into_iter()
            .map(|s| (s.module_id, s.total_score))
            .collect();
        let done_activities: HashSet<i64> = self
            .db
            .list_activity_progress(user_id)
            .await?
            .into_iter()
            .filter(|p| p.completed)
            .map(|p| p.activity_id)
            .collect();

        let courses = self.db.list_courses(Page::all()).await?;
        let first_course_id = courses.first().map(|c| c.id);
        let mut tree = Vec::with_capacity(courses.len());

        for course in courses {
            let is_first_course = first_course_id == Some(course.id);
            let progress = effective(&course_rows, course.id, is_first_course);
            let modules = self.db.list_modules_by_course(course.id).await?;
            let mut nodes = Vec::with_capacity(modules.len());

            for (index, module) in modules.into_iter().enumerate() {
                let state = effective(&module_rows, module.id, is_first_course && index == 0);
                let mut resources = Vec::new();
                for resource in self.db.list_resources_by_module(module.id).await? {
                    let activities = self.db.list_activities_by_resource(resource.id).await?;
                    let completed = !activities.is_empty()
                        && activities.iter().all(|a| done_activities.contains(&a.id));
                    resources.push(ResourceProgress {
                        resource,
                        locked: state.locked,
                        completed,
                    });
                }
                nodes.push(ModuleProgressNode {
                    score: scores.get(&module.id).copied().unwrap_or(0.0),
                    module,
                    progress: state,
                    resources,
                });
            }

            tree.push(CourseProgressTree {
                course,
                progress,
                modules: nodes,
            });
        }

        Ok(tree)
    }

    //=====================================================================================
    // Internals
    //=====================================================================================

    /// Sum of `score` over the module's completed activities.
    async fn module_score(&self, module_id: i64) -> PortResult<f64> {
        Ok(self
            .db
            .list_activities_by_module(module_id)
            .await?
            .iter()
            .filter(|a| a.completed)
            .map(|a| a.score)
            .sum())
    }

    /// Unlocks exactly one follow-on unit after `module`.
    async fn unlock_next(&self, user_id: i64, module: &Module) -> PortResult<Unlocked> {
        let next_module = self
            .db
            .list_modules_by_course(module.course_id)
            .await?
            .into_iter()
            .find(|m| m.id > module.id);

        if let Some(next) = next_module {
            self.db
                .upsert_progress(ProgressScope::Module, user_id, next.id, ProgressChange::unlock())
                .await?;
            info!(user_id, module_id = next.id, "Unlocked next module");
            return Ok(Unlocked::Module(next));
        }

        let Some(course) = self.db.next_course(module.course_id).await? else {
            return Ok(Unlocked::Nothing);
        };
        self.db
            .upsert_progress(ProgressScope::Course, user_id, course.id, ProgressChange::unlock())
            .await?;
        let first_module = self.first_module(course.id).await?;
        if let Some(first) = &first_module {
            self.db
                .upsert_progress(ProgressScope::Module, user_id, first.id, ProgressChange::unlock())
                .await?;
        }
        info!(user_id, course_id = course.id, "Unlocked next course");
        Ok(Unlocked::Course {
            course,
            first_module,
        })
    }

    /// Marks the course completed once every one of its modules is.
    async fn refresh_course_completion(&self, user_id: i64, course_id: i64) -> PortResult<bool> {
        let completed: HashSet<i64> = self
            .db
            .list_progress(ProgressScope::Module, user_id)
            .await?
            .into_iter()
            .filter(|p| p.completed)
            .map(|p| p.entity_id)
            .collect();
        let modules = self.db.list_modules_by_course(course_id).await?;
        if modules.is_empty() || !modules.iter().all(|m| completed.contains(&m.id)) {
            return Ok(false);
        }
        self.db
            .upsert_progress(
                ProgressScope::Course,
                user_id,
                course_id,
                ProgressChange::complete(Utc::now()),
            )
            .await?;
        info!(user_id, course_id, "Course completed");
        Ok(true)
    }

    /// A course stays completed only while all of its modules are.
    async fn clear_course_completion(&self, user_id: i64, course_id: i64) -> PortResult<()> {
        let Some(row) = self
            .db
            .get_progress(ProgressScope::Course, user_id, course_id)
            .await?
        else {
            return Ok(());
        };
        if row.completed {
            self.db
                .upsert_progress(
                    ProgressScope::Course,
                    user_id,
                    course_id,
                    ProgressChange {
                        completed: Some(false),
                        ..ProgressChange::default()
                    },
                )
                .await?;
            info!(user_id, course_id, "Course completion cleared");
        }
        Ok(())
    }

    async fn first_module(&self, course_id: i64) -> PortResult<Option<Module>> {
        Ok(self
            .db
            .list_modules_by_course(course_id)
            .await?
            .into_iter()
            .next())
    }

    async fn module_state(&self, user_id: i64, module: &Module) -> PortResult<ProgressState> {
        if let Some(row) = self
            .db
            .get_progress(ProgressScope::Module, user_id, module.id)
            .await?
        {
            return Ok(ProgressState::from(&row));
        }
        let first_course_id = self.db.first_course().await?.map(|c| c.id);
        let first_module_id = self.first_module(module.course_id).await?.map(|m| m.id);
        let unlocked =
            first_course_id == Some(module.course_id) && first_module_id == Some(module.id);
        Ok(ProgressState::default_for(unlocked))
    }

    async fn progress_rows(
        &self,
        scope: ProgressScope,
        user_id: i64,
    ) -> PortResult<HashMap<i64, Progress>> {
        Ok(self
            .db
            .list_progress(scope, user_id)
            .await?
            .into_iter()
            .map(|p| (p.entity_id, p))
            .collect())
    }
}

fn effective(rows: &HashMap<i64, Progress>, entity_id: i64, unlocked_by_default: bool) -> ProgressState {
    rows.get(&entity_id)
        .map(ProgressState::from)
        .unwrap_or_else(|| ProgressState::default_for(unlocked_by_default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewActivity, NewCourse, NewModule, NewResource, NewUser};
    use crate::memory::MemoryStore;

    struct Catalog {
        store: MemoryStore,
        courses: Vec<Course>,
        /// modules[course_index][module_index]
        modules: Vec<Vec<Module>>,
    }

    /// Two courses, two modules each.
    async fn two_by_two() -> Catalog {
        let store = MemoryStore::new();
        let mut courses = Vec::new();
        let mut modules = Vec::new();
        for c in 1..=2 {
            let course = store
                .create_course(NewCourse {
                    name: format!("C{}", c),
                    ..NewCourse::default()
                })
                .await
                .unwrap();
            let mut course_modules = Vec::new();
            for m in 1..=2 {
                course_modules.push(
                    store
                        .create_module(NewModule::new(course.id, format!("C{}.M{}", c, m)))
                        .await
                        .unwrap(),
                );
            }
            courses.push(course);
            modules.push(course_modules);
        }
        Catalog {
            store,
            courses,
            modules,
        }
    }

    async fn user(store: &MemoryStore, email: &str) -> i64 {
        store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                is_admin: false,
            })
            .await
            .unwrap()
            .id
    }

    async fn module_locked(engine: &ProgressEngine<'_>, user_id: i64, course_id: i64) -> Vec<bool> {
        engine
            .modules_with_progress(user_id, course_id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.progress.locked)
            .collect()
    }

    #[tokio::test]
    async fn first_course_and_module_are_unlocked_without_rows() {
        let catalog = two_by_two().await;
        let user_id = user(&catalog.store, "a@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);

        let courses = engine
            .courses_with_progress(user_id, Page::default())
            .await
            .unwrap();
        let locked: Vec<bool> = courses.iter().map(|c| c.progress.locked).collect();
        assert_eq!(locked, [false, true]);
        assert_eq!(module_locked(&engine, user_id, catalog.courses[0].id).await, [false, true]);
        assert_eq!(module_locked(&engine, user_id, catalog.courses[1].id).await, [true, true]);

        // Listing is read-only.
        let rows = catalog
            .store
            .list_progress(ProgressScope::Module, user_id)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn initialize_user_stores_the_default_unlocks() {
        let catalog = two_by_two().await;
        let user_id = user(&catalog.store, "a@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);

        engine.initialize_user(user_id).await.unwrap();

        let course_row = catalog
            .store
            .get_progress(ProgressScope::Course, user_id, catalog.courses[0].id)
            .await
            .unwrap()
            .unwrap();
        assert!(!course_row.locked);
        let module_rows = catalog
            .store
            .list_progress(ProgressScope::Module, user_id)
            .await
            .unwrap();
        assert_eq!(module_rows.len(), 1);
        assert_eq!(module_rows[0].entity_id, catalog.modules[0][0].id);
        assert!(!module_rows[0].locked);
    }

    #[tokio::test]
    async fn initialize_user_with_empty_catalog_is_a_no_op() {
        let store = MemoryStore::new();
        let user_id = user(&store, "a@example.com").await;
        ProgressEngine::new(&store)
            .initialize_user(user_id)
            .await
            .unwrap();
        assert!(store
            .list_progress(ProgressScope::Course, user_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn completion_walks_modules_then_courses() {
        let catalog = two_by_two().await;
        let user_id = user(&catalog.store, "a@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);
        let (c1, c2) = (&catalog.courses[0], &catalog.courses[1]);
        let m = &catalog.modules;

        let outcome = engine.complete_module(user_id, m[0][0].id).await.unwrap();
        assert_eq!(outcome.unlocked, Unlocked::Module(m[0][1].clone()));
        assert!(!outcome.course_completed);
        assert_eq!(module_locked(&engine, user_id, c1.id).await, [false, false]);
        assert_eq!(module_locked(&engine, user_id, c2.id).await, [true, true]);

        let outcome = engine.complete_module(user_id, m[0][1].id).await.unwrap();
        assert_eq!(
            outcome.unlocked,
            Unlocked::Course {
                course: c2.clone(),
                first_module: Some(m[1][0].clone()),
            }
        );
        assert!(outcome.course_completed);
        assert_eq!(module_locked(&engine, user_id, c2.id).await, [false, true]);

        let courses = engine
            .courses_with_progress(user_id, Page::default())
            .await
            .unwrap();
        assert!(courses[0].progress.completed);
        assert!(!courses[1].progress.locked);
        assert!(!courses[1].progress.completed);
    }

    #[tokio::test]
    async fn clearing_a_module_reopens_its_course() {
        let catalog = two_by_two().await;
        let user_id = user(&catalog.store, "a@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);
        let course = &catalog.courses[0];
        let m = &catalog.modules[0];

        engine.complete_module(user_id, m[0].id).await.unwrap();
        let outcome = engine.complete_module(user_id, m[1].id).await.unwrap();
        assert!(outcome.course_completed);

        let cleared = engine
            .set_module_progress(user_id, m[1].id, false)
            .await
            .unwrap();
        assert!(!cleared.progress.completed);
        assert!(!cleared.progress.locked);

        let row = catalog
            .store
            .get_progress(ProgressScope::Course, user_id, course.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!row.completed);
        assert!(!row.locked);
    }

    #[tokio::test]
    async fn completing_the_last_module_unlocks_nothing() {
        let catalog = two_by_two().await;
        let user_id = user(&catalog.store, "a@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);

        let outcome = engine
            .complete_module(user_id, catalog.modules[1][1].id)
            .await
            .unwrap();
        assert_eq!(outcome.unlocked, Unlocked::Nothing);
    }

    #[tokio::test]
    async fn score_is_the_sum_of_completed_activities_and_idempotent() {
        let catalog = two_by_two().await;
        let user_id = user(&catalog.store, "a@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);
        let module = &catalog.modules[0][0];
        let resource = catalog
            .store
            .create_resource(NewResource {
                module_id: module.id,
                name: "Lesson".to_string(),
            })
            .await
            .unwrap();
        for (name, completed, score) in [("q1", true, 4.0), ("q2", true, 6.5), ("q3", false, 100.0)] {
            catalog
                .store
                .create_activity(NewActivity {
                    resource_id: resource.id,
                    name: name.to_string(),
                    completed,
                    score,
                })
                .await
                .unwrap();
        }

        let first = engine.complete_module(user_id, module.id).await.unwrap();
        assert_eq!(first.score.total_score, 10.5);

        let again = engine.complete_module(user_id, module.id).await.unwrap();
        assert_eq!(again.score.total_score, 10.5);
        assert_eq!(again.score.id, first.score.id);
        assert_eq!(
            catalog.store.list_scores_for_user(user_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn submitted_activity_counts_towards_the_next_completion() {
        let catalog = two_by_two().await;
        let user_id = user(&catalog.store, "a@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);
        let module = &catalog.modules[0][0];
        let resource = catalog
            .store
            .create_resource(NewResource {
                module_id: module.id,
                name: "Lesson".to_string(),
            })
            .await
            .unwrap();
        let activity = catalog
            .store
            .create_activity(NewActivity {
                resource_id: resource.id,
                name: "quiz".to_string(),
                completed: false,
                score: 0.0,
            })
            .await
            .unwrap();

        assert_eq!(
            engine.complete_module(user_id, module.id).await.unwrap().score.total_score,
            0.0
        );
        engine.submit_activity(user_id, activity.id, 8.0).await.unwrap();
        assert_eq!(
            engine.complete_module(user_id, module.id).await.unwrap().score.total_score,
            8.0
        );

        let tree = engine.progress_overview(user_id).await.unwrap();
        let node = &tree[0].modules[0];
        assert_eq!(node.score, 8.0);
        assert!(node.resources[0].completed);
    }

    #[tokio::test]
    async fn unknown_module_is_not_found() {
        let catalog = two_by_two().await;
        let user_id = user(&catalog.store, "a@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);

        let err = engine.complete_module(user_id, 999).await.unwrap_err();
        assert!(matches!(err, crate::ports::PortError::NotFound(_)));
        let err = engine.modules_with_progress(user_id, 999).await.unwrap_err();
        assert!(matches!(err, crate::ports::PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn clearing_completion_keeps_lock_state_and_score() {
        let catalog = two_by_two().await;
        let user_id = user(&catalog.store, "a@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);
        let module = &catalog.modules[0][0];

        engine
            .set_module_progress(user_id, module.id, true)
            .await
            .unwrap();
        let cleared = engine
            .set_module_progress(user_id, module.id, false)
            .await
            .unwrap();

        assert!(!cleared.progress.completed);
        assert!(!cleared.progress.locked);
        assert!(cleared.score.is_some());
    }

    #[tokio::test]
    async fn progress_is_per_user() {
        let catalog = two_by_two().await;
        let alice = user(&catalog.store, "alice@example.com").await;
        let bob = user(&catalog.store, "bob@example.com").await;
        let engine = ProgressEngine::new(&catalog.store);

        engine
            .complete_module(alice, catalog.modules[0][0].id)
            .await
            .unwrap();

        assert_eq!(module_locked(&engine, bob, catalog.courses[0].id).await, [false, true]);
    }
}
