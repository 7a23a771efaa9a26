//! crates/learning_core/src/domain.rs
//!
//! Defines the pure, core data structures for the learning platform.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};

//=========================================================================================
// Accounts
//=========================================================================================

/// Represents a user - used throughout the app.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
}

/// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

impl UserCredentials {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            is_admin: self.is_admin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: Option<bool>,
}

//=========================================================================================
// Catalog
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub background_image: Option<String>,
}

/// A unit within a course. `locked`/`completed` are catalog defaults only;
/// per-user state lives in progress rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub locked: bool,
    pub completed: bool,
    /// Descriptive point value of the module.
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct NewModule {
    pub course_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub locked: bool,
    pub completed: bool,
    pub score: f64,
}

impl NewModule {
    pub fn new(course_id: i64, name: impl Into<String>) -> Self {
        Self {
            course_id,
            name: name.into(),
            description: None,
            background_image: None,
            locked: true,
            completed: false,
            score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModulePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub locked: Option<bool>,
    pub completed: Option<bool>,
    pub score: Option<f64>,
}

/// A content bundle inside a module.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: i64,
    pub module_id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub module_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ResourcePatch {
    pub name: Option<String>,
}

/// Videos and PDFs share one shape and differ only by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Pdf,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Pdf => "PDF",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub id: i64,
    pub resource_id: i64,
    pub kind: MediaKind,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub resource_id: i64,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MediaPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
}

/// A scorable exercise within a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: i64,
    pub resource_id: i64,
    pub name: String,
    pub completed: bool,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub resource_id: i64,
    pub name: String,
    pub completed: bool,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub name: Option<String>,
    pub completed: Option<bool>,
    pub score: Option<f64>,
}

//=========================================================================================
// Progress and Scores
//=========================================================================================

/// Which kind of entity a progress row tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressScope {
    Module,
    Course,
}

/// A stored per-user lock/completion record, unique per (user, scope, entity).
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub user_id: i64,
    pub scope: ProgressScope,
    pub entity_id: i64,
    pub locked: bool,
    pub completed: bool,
    pub last_accessed: DateTime<Utc>,
}

/// A partial update applied by an upsert. Fields left `None` keep their
/// stored value, or the insert default (locked, not completed, now) for a
/// fresh row.
#[derive(Debug, Clone, Default)]
pub struct ProgressChange {
    pub locked: Option<bool>,
    pub completed: Option<bool>,
    pub accessed_at: Option<DateTime<Utc>>,
}

impl ProgressChange {
    pub fn unlock() -> Self {
        Self {
            locked: Some(false),
            ..Self::default()
        }
    }

    pub fn complete(at: DateTime<Utc>) -> Self {
        Self {
            locked: Some(false),
            completed: Some(true),
            accessed_at: Some(at),
        }
    }
}

/// The effective state a user sees, whether backed by a row or by defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    pub locked: bool,
    pub completed: bool,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl ProgressState {
    pub fn default_for(unlocked: bool) -> Self {
        Self {
            locked: !unlocked,
            completed: false,
            last_accessed: None,
        }
    }
}

impl From<&Progress> for ProgressState {
    fn from(p: &Progress) -> Self {
        Self {
            locked: p.locked,
            completed: p.completed,
            last_accessed: Some(p.last_accessed),
        }
    }
}

/// The per-user, per-module accumulated score record.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentScore {
    pub id: i64,
    pub user_id: i64,
    pub module_id: i64,
    pub total_score: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityProgress {
    pub user_id: i64,
    pub activity_id: i64,
    pub completed: bool,
}

//=========================================================================================
// Listing helpers
//=========================================================================================

/// Offset pagination. No upper bound is enforced on `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

impl Page {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip: skip.max(0),
            limit: limit.max(0),
        }
    }

    /// Every row.
    pub fn all() -> Self {
        Self {
            skip: 0,
            limit: i64::MAX,
        }
    }
}

/// Row counts per catalog table, as reported to admins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub users: i64,
    pub courses: i64,
    pub modules: i64,
    pub resources: i64,
    pub videos: i64,
    pub pdfs: i64,
    pub activities: i64,
}

impl TableCounts {
    /// Caps every count at `cap`.
    pub fn capped(self, cap: i64) -> Self {
        Self {
            users: self.users.min(cap),
            courses: self.courses.min(cap),
            modules: self.modules.min(cap),
            resources: self.resources.min(cap),
            videos: self.videos.min(cap),
            pdfs: self.pdfs.min(cap),
            activities: self.activities.min(cap),
        }
    }
}
