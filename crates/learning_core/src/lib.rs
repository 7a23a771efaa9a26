pub mod domain;
#[cfg(any(test, feature = "memory-store"))]
pub mod memory;
pub mod ports;
pub mod progress;

pub use domain::{
    Activity, ActivityPatch, ActivityProgress, Course, CoursePatch, Media, MediaKind, MediaPatch,
    Module, ModulePatch, NewActivity, NewCourse, NewMedia, NewModule, NewResource, NewUser, Page,
    Progress, ProgressChange, ProgressScope, ProgressState, Resource, ResourcePatch, StudentScore,
    TableCounts, User, UserCredentials, UserPatch,
};
pub use ports::{DatabaseService, PortError, PortResult};
pub use progress::{
    CompletionOutcome, CourseProgressTree, CourseWithProgress, ModuleProgressNode,
    ModuleWithProgress, ProgressEngine, ResourceProgress, Unlocked,
};
