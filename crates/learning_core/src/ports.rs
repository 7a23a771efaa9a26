//! crates/learning_core/src/ports.rs
//!
//! Defines the service contract (trait) for the application's core logic.
//! The trait forms the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Activity, ActivityPatch, ActivityProgress, Course, CoursePatch, Media, MediaKind,
    MediaPatch, Module, ModulePatch, NewActivity, NewCourse, NewMedia, NewModule, NewResource,
    NewUser, Page, Progress, ProgressChange, ProgressScope, Resource, ResourcePatch,
    StudentScore, TableCounts, User, UserCredentials, UserPatch,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the database driver.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness rule was violated (e.g. a duplicate email).
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A referenced parent row does not exist.
    #[error("Integrity error: {0}")]
    Integrity(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Port (Trait)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    /// Creates a self-registered user. The account is an admin exactly when no
    /// other user exists, decided atomically with the insert.
    async fn register_user(&self, email: &str, password_hash: &str) -> PortResult<User>;

    async fn get_user(&self, user_id: i64) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn list_users(&self, page: Page) -> PortResult<Vec<User>>;

    async fn update_user(&self, user_id: i64, patch: UserPatch) -> PortResult<User>;

    async fn delete_user(&self, user_id: i64) -> PortResult<()>;

    // --- Courses ---
    async fn create_course(&self, new_course: NewCourse) -> PortResult<Course>;

    async fn get_course(&self, course_id: i64) -> PortResult<Course>;

    /// Courses in ascending id order.
    async fn list_courses(&self, page: Page) -> PortResult<Vec<Course>>;

    async fn update_course(&self, course_id: i64, patch: CoursePatch) -> PortResult<Course>;

    /// Removes the course and everything beneath it.
    async fn delete_course(&self, course_id: i64) -> PortResult<()>;

    /// The course with the lowest id, if any.
    async fn first_course(&self) -> PortResult<Option<Course>>;

    /// The course with the smallest id greater than `after_course_id`.
    async fn next_course(&self, after_course_id: i64) -> PortResult<Option<Course>>;

    // --- Modules ---
    async fn create_module(&self, new_module: NewModule) -> PortResult<Module>;

    async fn get_module(&self, module_id: i64) -> PortResult<Module>;

    async fn list_modules(&self, page: Page) -> PortResult<Vec<Module>>;

    /// Modules of one course in ascending id order.
    async fn list_modules_by_course(&self, course_id: i64) -> PortResult<Vec<Module>>;

    async fn update_module(&self, module_id: i64, patch: ModulePatch) -> PortResult<Module>;

    async fn delete_module(&self, module_id: i64) -> PortResult<()>;

    // --- Resources ---
    async fn create_resource(&self, new_resource: NewResource) -> PortResult<Resource>;

    async fn get_resource(&self, resource_id: i64) -> PortResult<Resource>;

    async fn list_resources(&self, page: Page) -> PortResult<Vec<Resource>>;

    async fn list_resources_by_module(&self, module_id: i64) -> PortResult<Vec<Resource>>;

    async fn update_resource(
        &self,
        resource_id: i64,
        patch: ResourcePatch,
    ) -> PortResult<Resource>;

    async fn delete_resource(&self, resource_id: i64) -> PortResult<()>;

    // --- Videos and PDFs ---
    async fn create_media(&self, kind: MediaKind, new_media: NewMedia) -> PortResult<Media>;

    async fn get_media(&self, kind: MediaKind, media_id: i64) -> PortResult<Media>;

    async fn list_media(&self, kind: MediaKind, page: Page) -> PortResult<Vec<Media>>;

    async fn list_media_by_resource(
        &self,
        kind: MediaKind,
        resource_id: i64,
    ) -> PortResult<Vec<Media>>;

    async fn list_media_by_module(&self, kind: MediaKind, module_id: i64)
        -> PortResult<Vec<Media>>;

    async fn update_media(
        &self,
        kind: MediaKind,
        media_id: i64,
        patch: MediaPatch,
    ) -> PortResult<Media>;

    async fn delete_media(&self, kind: MediaKind, media_id: i64) -> PortResult<()>;

    // --- Activities ---
    async fn create_activity(&self, new_activity: NewActivity) -> PortResult<Activity>;

    async fn get_activity(&self, activity_id: i64) -> PortResult<Activity>;

    async fn list_activities(&self, page: Page) -> PortResult<Vec<Activity>>;

    async fn list_activities_by_resource(&self, resource_id: i64) -> PortResult<Vec<Activity>>;

    async fn list_activities_by_module(&self, module_id: i64) -> PortResult<Vec<Activity>>;

    async fn update_activity(
        &self,
        activity_id: i64,
        patch: ActivityPatch,
    ) -> PortResult<Activity>;

    async fn delete_activity(&self, activity_id: i64) -> PortResult<()>;

    // --- Progress ---
    async fn get_progress(
        &self,
        scope: ProgressScope,
        user_id: i64,
        entity_id: i64,
    ) -> PortResult<Option<Progress>>;

    async fn list_progress(&self, scope: ProgressScope, user_id: i64)
        -> PortResult<Vec<Progress>>;

    /// Creates or updates the (user, entity) row in one statement.
    async fn upsert_progress(
        &self,
        scope: ProgressScope,
        user_id: i64,
        entity_id: i64,
        change: ProgressChange,
    ) -> PortResult<Progress>;

    /// Marks the module completed for the user and stores `total_score` as the
    /// user's score for it. Both writes succeed or fail together.
    async fn record_module_completion(
        &self,
        user_id: i64,
        module_id: i64,
        total_score: f64,
        at: DateTime<Utc>,
    ) -> PortResult<(Progress, StudentScore)>;

    // --- Scores ---
    async fn get_score(&self, user_id: i64, module_id: i64) -> PortResult<Option<StudentScore>>;

    async fn list_scores_for_user(&self, user_id: i64) -> PortResult<Vec<StudentScore>>;

    /// Scores for one module, highest total first.
    async fn list_scores_for_module(&self, module_id: i64) -> PortResult<Vec<StudentScore>>;

    async fn upsert_activity_progress(
        &self,
        user_id: i64,
        activity_id: i64,
        completed: bool,
    ) -> PortResult<ActivityProgress>;

    async fn list_activity_progress(&self, user_id: i64) -> PortResult<Vec<ActivityProgress>>;

    // --- Admin ---
    async fn table_counts(&self) -> PortResult<TableCounts>;
}
