//! services/api/src/web/schema.rs
//!
//! Request and response payloads of the JSON API, and their conversions from
//! the core domain types.

use chrono::{DateTime, Utc};
use learning_core::{
    Activity, ActivityPatch, Course, CoursePatch, CourseProgressTree, CourseWithProgress, Media,
    MediaPatch, Module, ModulePatch, ModuleProgressNode, ModuleWithProgress, NewActivity,
    NewCourse, NewMedia, NewModule, NewResource, Page, ProgressState, Resource, ResourcePatch,
    ResourceProgress, StudentScore, TableCounts, Unlocked, User,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Generic Envelopes
//=========================================================================================

/// The body of every plain acknowledgement and of every error.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    pub success: bool,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

/// `skip`/`limit` query parameters of every list endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    /// Rows to skip (default 0).
    pub skip: Option<i64>,
    /// Maximum rows to return (default 100).
    pub limit: Option<i64>,
}

impl PaginationQuery {
    pub fn page(&self) -> Page {
        let default = Page::default();
        Page::new(
            self.skip.unwrap_or(default.skip),
            self.limit.unwrap_or(default.limit),
        )
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminRegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    /// The issued token, also set as the `access_token` cookie.
    pub cookie: String,
    pub success: bool,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            is_admin: u.is_admin,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UserUpdateRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

//=========================================================================================
// Courses
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct CourseResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
}

impl From<Course> for CourseResponse {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            background_image: c.background_image,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CourseCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
}

impl From<CourseCreateRequest> for NewCourse {
    fn from(r: CourseCreateRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
            background_image: r.background_image,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CourseUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub background_image: Option<String>,
}

impl From<CourseUpdateRequest> for CoursePatch {
    fn from(r: CourseUpdateRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
            background_image: r.background_image,
        }
    }
}

/// A user's lock/completion state for one course or module.
#[derive(Serialize, ToSchema)]
pub struct UserProgressResponse {
    pub locked: bool,
    pub completed: bool,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl From<ProgressState> for UserProgressResponse {
    fn from(p: ProgressState) -> Self {
        Self {
            locked: p.locked,
            completed: p.completed,
            last_accessed: p.last_accessed,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CourseWithProgressResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub user_progress: UserProgressResponse,
}

impl From<CourseWithProgress> for CourseWithProgressResponse {
    fn from(c: CourseWithProgress) -> Self {
        Self {
            id: c.course.id,
            name: c.course.name,
            description: c.course.description,
            background_image: c.course.background_image,
            user_progress: c.progress.into(),
        }
    }
}

/// A course with all of its modules.
#[derive(Serialize, ToSchema)]
pub struct CourseDetailResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub modules: Vec<ModuleResponse>,
}

impl CourseDetailResponse {
    pub fn new(course: Course, modules: Vec<Module>) -> Self {
        Self {
            id: course.id,
            name: course.name,
            description: course.description,
            background_image: course.background_image,
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }
}

//=========================================================================================
// Modules
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ModuleResponse {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub locked: bool,
    pub completed: bool,
    pub score: f64,
}

impl From<Module> for ModuleResponse {
    fn from(m: Module) -> Self {
        Self {
            id: m.id,
            course_id: m.course_id,
            name: m.name,
            description: m.description,
            background_image: m.background_image,
            locked: m.locked,
            completed: m.completed,
            score: m.score,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ModuleCreateRequest {
    pub course_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub locked: Option<bool>,
    pub completed: Option<bool>,
    pub score: Option<f64>,
}

impl From<ModuleCreateRequest> for NewModule {
    fn from(r: ModuleCreateRequest) -> Self {
        let defaults = NewModule::new(r.course_id, r.name);
        Self {
            description: r.description,
            background_image: r.background_image,
            locked: r.locked.unwrap_or(defaults.locked),
            completed: r.completed.unwrap_or(defaults.completed),
            score: r.score.unwrap_or(defaults.score),
            ..defaults
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ModuleUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub locked: Option<bool>,
    pub completed: Option<bool>,
    pub score: Option<f64>,
}

impl From<ModuleUpdateRequest> for ModulePatch {
    fn from(r: ModuleUpdateRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
            background_image: r.background_image,
            locked: r.locked,
            completed: r.completed,
            score: r.score,
        }
    }
}

/// A module with the caller's state and recorded score.
#[derive(Serialize, ToSchema)]
pub struct ModuleWithProgressResponse {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub user_progress: UserProgressResponse,
    pub score: Option<StudentScoreResponse>,
}

impl From<ModuleWithProgress> for ModuleWithProgressResponse {
    fn from(m: ModuleWithProgress) -> Self {
        Self {
            id: m.module.id,
            course_id: m.module.course_id,
            name: m.module.name,
            description: m.module.description,
            background_image: m.module.background_image,
            user_progress: m.progress.into(),
            score: m.score.map(Into::into),
        }
    }
}

/// A module with its resources and their content.
#[derive(Serialize, ToSchema)]
pub struct ModuleDetailResponse {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub resources: Vec<ResourceDetailResponse>,
}

impl ModuleDetailResponse {
    pub fn new(module: Module, resources: Vec<ResourceDetailResponse>) -> Self {
        Self {
            id: module.id,
            course_id: module.course_id,
            name: module.name,
            description: module.description,
            background_image: module.background_image,
            resources,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UserProgressRequest {
    pub completed: bool,
}

//=========================================================================================
// Resources and Content
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ResourceResponse {
    pub id: i64,
    pub module_id: i64,
    pub name: String,
}

impl From<Resource> for ResourceResponse {
    fn from(r: Resource) -> Self {
        Self {
            id: r.id,
            module_id: r.module_id,
            name: r.name,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ResourceCreateRequest {
    pub module_id: i64,
    pub name: String,
}

impl From<ResourceCreateRequest> for NewResource {
    fn from(r: ResourceCreateRequest) -> Self {
        Self {
            module_id: r.module_id,
            name: r.name,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ResourceUpdateRequest {
    pub name: Option<String>,
}

impl From<ResourceUpdateRequest> for ResourcePatch {
    fn from(r: ResourceUpdateRequest) -> Self {
        Self { name: r.name }
    }
}

/// A resource with its videos, PDFs and activities.
#[derive(Serialize, ToSchema)]
pub struct ResourceDetailResponse {
    pub id: i64,
    pub module_id: i64,
    pub name: String,
    pub videos: Vec<MediaResponse>,
    pub pdfs: Vec<MediaResponse>,
    pub activities: Vec<ActivityResponse>,
}

/// A video or a PDF.
#[derive(Serialize, ToSchema)]
pub struct MediaResponse {
    pub id: i64,
    pub resource_id: i64,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
}

impl From<Media> for MediaResponse {
    fn from(m: Media) -> Self {
        Self {
            id: m.id,
            resource_id: m.resource_id,
            title: m.title,
            url: m.url,
            thumbnail: m.thumbnail,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MediaCreateRequest {
    pub resource_id: i64,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
}

impl From<MediaCreateRequest> for NewMedia {
    fn from(r: MediaCreateRequest) -> Self {
        Self {
            resource_id: r.resource_id,
            title: r.title,
            url: r.url,
            thumbnail: r.thumbnail,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MediaUpdateRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
}

impl From<MediaUpdateRequest> for MediaPatch {
    fn from(r: MediaUpdateRequest) -> Self {
        Self {
            title: r.title,
            url: r.url,
            thumbnail: r.thumbnail,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ActivityResponse {
    pub id: i64,
    pub resource_id: i64,
    pub name: String,
    pub completed: bool,
    pub score: f64,
}

impl From<Activity> for ActivityResponse {
    fn from(a: Activity) -> Self {
        Self {
            id: a.id,
            resource_id: a.resource_id,
            name: a.name,
            completed: a.completed,
            score: a.score,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ActivityCreateRequest {
    pub resource_id: i64,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub score: f64,
}

impl From<ActivityCreateRequest> for NewActivity {
    fn from(r: ActivityCreateRequest) -> Self {
        Self {
            resource_id: r.resource_id,
            name: r.name,
            completed: r.completed,
            score: r.score,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ActivityUpdateRequest {
    pub name: Option<String>,
    pub completed: Option<bool>,
    pub score: Option<f64>,
}

impl From<ActivityUpdateRequest> for ActivityPatch {
    fn from(r: ActivityUpdateRequest) -> Self {
        Self {
            name: r.name,
            completed: r.completed,
            score: r.score,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitActivityRequest {
    pub score: f64,
}

//=========================================================================================
// Progress and Scores
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct StudentScoreResponse {
    pub id: i64,
    pub user_id: i64,
    pub module_id: i64,
    pub total_score: f64,
    pub completed_at: DateTime<Utc>,
}

impl From<StudentScore> for StudentScoreResponse {
    fn from(s: StudentScore) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            module_id: s.module_id,
            total_score: s.total_score,
            completed_at: s.completed_at,
        }
    }
}

/// What a completion opened up: `module`, `course` or `none`.
#[derive(Serialize, ToSchema)]
pub struct UnlockedResponse {
    pub kind: String,
    pub course_id: Option<i64>,
    pub module_id: Option<i64>,
}

impl From<Unlocked> for UnlockedResponse {
    fn from(u: Unlocked) -> Self {
        match u {
            Unlocked::Module(m) => Self {
                kind: "module".to_string(),
                course_id: Some(m.course_id),
                module_id: Some(m.id),
            },
            Unlocked::Course {
                course,
                first_module,
            } => Self {
                kind: "course".to_string(),
                course_id: Some(course.id),
                module_id: first_module.map(|m| m.id),
            },
            Unlocked::Nothing => Self {
                kind: "none".to_string(),
                course_id: None,
                module_id: None,
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CompletionResponse {
    pub message: String,
    pub success: bool,
    pub module_id: i64,
    pub user_progress: UserProgressResponse,
    pub score: StudentScoreResponse,
    pub unlocked: UnlockedResponse,
    pub course_completed: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ResourceProgressResponse {
    pub resource_id: i64,
    pub resource_name: String,
    pub locked: bool,
    pub completed: bool,
}

impl From<ResourceProgress> for ResourceProgressResponse {
    fn from(r: ResourceProgress) -> Self {
        Self {
            resource_id: r.resource.id,
            resource_name: r.resource.name,
            locked: r.locked,
            completed: r.completed,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ModuleProgressResponse {
    pub module_id: i64,
    pub module_name: String,
    pub locked: bool,
    pub completed: bool,
    pub score: f64,
    pub resources: Vec<ResourceProgressResponse>,
}

impl From<ModuleProgressNode> for ModuleProgressResponse {
    fn from(m: ModuleProgressNode) -> Self {
        Self {
            module_id: m.module.id,
            module_name: m.module.name,
            locked: m.progress.locked,
            completed: m.progress.completed,
            score: m.score,
            resources: m.resources.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CourseProgressResponse {
    pub course_id: i64,
    pub course_name: String,
    pub locked: bool,
    pub completed: bool,
    pub modules: Vec<ModuleProgressResponse>,
}

impl From<CourseProgressTree> for CourseProgressResponse {
    fn from(c: CourseProgressTree) -> Self {
        Self {
            course_id: c.course.id,
            course_name: c.course.name,
            locked: c.progress.locked,
            completed: c.progress.completed,
            modules: c.modules.into_iter().map(Into::into).collect(),
        }
    }
}

//=========================================================================================
// Admin
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct AdminStatsResponse {
    pub total_users: i64,
    pub total_courses: i64,
    pub total_modules: i64,
    pub total_resources: i64,
    pub total_videos: i64,
    pub total_pdfs: i64,
    pub total_activities: i64,
}

impl From<TableCounts> for AdminStatsResponse {
    fn from(c: TableCounts) -> Self {
        Self {
            total_users: c.users,
            total_courses: c.courses,
            total_modules: c.modules,
            total_resources: c.resources,
            total_videos: c.videos,
            total_pdfs: c.pdfs,
            total_activities: c.activities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let q = PaginationQuery {
            skip: None,
            limit: None,
        };
        assert_eq!(q.page(), Page { skip: 0, limit: 100 });

        let q = PaginationQuery {
            skip: Some(-5),
            limit: Some(5000),
        };
        assert_eq!(q.page(), Page { skip: 0, limit: 5000 });
    }

    #[test]
    fn module_create_defaults_to_locked() {
        let req: ModuleCreateRequest =
            serde_json::from_str(r#"{"course_id": 3, "name": "Intro"}"#).unwrap();
        let new_module = NewModule::from(req);
        assert_eq!(new_module.course_id, 3);
        assert!(new_module.locked);
        assert!(!new_module.completed);
        assert_eq!(new_module.score, 0.0);
    }
}
