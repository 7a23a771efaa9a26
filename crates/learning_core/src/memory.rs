//! crates/learning_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. It mirrors the
//! relational rules of the PostgreSQL schema (unique emails, foreign keys,
//! cascading deletes, one progress row per user and entity) so the engine
//! and the HTTP layer can be exercised without a database server.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Activity, ActivityPatch, ActivityProgress, Course, CoursePatch, Media, MediaKind,
    MediaPatch, Module, ModulePatch, NewActivity, NewCourse, NewMedia, NewModule, NewResource,
    NewUser, Page, Progress, ProgressChange, ProgressScope, Resource, ResourcePatch,
    StudentScore, TableCounts, User, UserCredentials, UserPatch,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    sequences: HashMap<&'static str, i64>,
    users: BTreeMap<i64, UserCredentials>,
    courses: BTreeMap<i64, Course>,
    modules: BTreeMap<i64, Module>,
    resources: BTreeMap<i64, Resource>,
    videos: BTreeMap<i64, Media>,
    pdfs: BTreeMap<i64, Media>,
    activities: BTreeMap<i64, Activity>,
    progress: HashMap<(ProgressScope, i64, i64), Progress>,
    scores: BTreeMap<(i64, i64), StudentScore>,
    activity_progress: BTreeMap<(i64, i64), ActivityProgress>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.sequences.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn media(&self, kind: MediaKind) -> &BTreeMap<i64, Media> {
        match kind {
            MediaKind::Video => &self.videos,
            MediaKind::Pdf => &self.pdfs,
        }
    }

    fn media_mut(&mut self, kind: MediaKind) -> &mut BTreeMap<i64, Media> {
        match kind {
            MediaKind::Video => &mut self.videos,
            MediaKind::Pdf => &mut self.pdfs,
        }
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn remove_activity(&mut self, activity_id: i64) -> bool {
        self.activity_progress
            .retain(|(_, activity), _| *activity != activity_id);
        self.activities.remove(&activity_id).is_some()
    }

    fn remove_resource(&mut self, resource_id: i64) -> bool {
        self.videos.retain(|_, m| m.resource_id != resource_id);
        self.pdfs.retain(|_, m| m.resource_id != resource_id);
        let activities: Vec<i64> = self
            .activities
            .values()
            .filter(|a| a.resource_id == resource_id)
            .map(|a| a.id)
            .collect();
        for id in activities {
            self.remove_activity(id);
        }
        self.resources.remove(&resource_id).is_some()
    }

    fn remove_module(&mut self, module_id: i64) -> bool {
        let resources: Vec<i64> = self
            .resources
            .values()
            .filter(|r| r.module_id == module_id)
            .map(|r| r.id)
            .collect();
        for id in resources {
            self.remove_resource(id);
        }
        self.progress
            .retain(|(scope, _, entity), _| !(*scope == ProgressScope::Module && *entity == module_id));
        self.scores.retain(|(_, module), _| *module != module_id);
        self.modules.remove(&module_id).is_some()
    }

    fn remove_course(&mut self, course_id: i64) -> bool {
        let modules: Vec<i64> = self
            .modules
            .values()
            .filter(|m| m.course_id == course_id)
            .map(|m| m.id)
            .collect();
        for id in modules {
            self.remove_module(id);
        }
        self.progress
            .retain(|(scope, _, entity), _| !(*scope == ProgressScope::Course && *entity == course_id));
        self.courses.remove(&course_id).is_some()
    }

    fn module_resource_ids(&self, module_id: i64) -> Vec<i64> {
        self.resources
            .values()
            .filter(|r| r.module_id == module_id)
            .map(|r| r.id)
            .collect()
    }
}

fn paged<'a, T: Clone + 'a>(rows: impl Iterator<Item = &'a T>, page: Page) -> Vec<T> {
    let skip = usize::try_from(page.skip).unwrap_or(usize::MAX);
    let take = usize::try_from(page.limit).unwrap_or(usize::MAX);
    rows.skip(skip).take(take).cloned().collect()
}

fn not_found(what: &str, id: i64) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

/// A `DatabaseService` backed by in-memory tables guarded by a mutex.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("memory store lock poisoned".to_string()))
    }
}

fn insert_user(t: &mut Tables, new_user: NewUser) -> PortResult<User> {
    if t.email_taken(&new_user.email, None) {
        return Err(PortError::Conflict(format!(
            "Email {} already registered",
            new_user.email
        )));
    }
    let id = t.next_id("users");
    let creds = UserCredentials {
        id,
        email: new_user.email,
        password_hash: new_user.password_hash,
        is_admin: new_user.is_admin,
    };
    let user = creds.to_user();
    t.users.insert(id, creds);
    Ok(user)
}

fn apply_progress(
    tables: &mut Tables,
    scope: ProgressScope,
    user_id: i64,
    entity_id: i64,
    change: ProgressChange,
) -> Progress {
    let row = tables
        .progress
        .entry((scope, user_id, entity_id))
        .or_insert_with(|| Progress {
            user_id,
            scope,
            entity_id,
            locked: true,
            completed: false,
            last_accessed: change.accessed_at.unwrap_or_else(Utc::now),
        });
    if let Some(locked) = change.locked {
        row.locked = locked;
    }
    if let Some(completed) = change.completed {
        row.completed = completed;
    }
    if let Some(at) = change.accessed_at {
        row.last_accessed = at;
    }
    row.clone()
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut t = self.tables()?;
        insert_user(&mut t, new_user)
    }

    async fn register_user(&self, email: &str, password_hash: &str) -> PortResult<User> {
        let mut t = self.tables()?;
        let is_admin = t.users.is_empty();
        insert_user(
            &mut t,
            NewUser {
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                is_admin,
            },
        )
    }

    async fn get_user(&self, user_id: i64) -> PortResult<User> {
        let t = self.tables()?;
        t.users
            .get(&user_id)
            .map(UserCredentials::to_user)
            .ok_or_else(|| not_found("User", user_id))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let t = self.tables()?;
        t.users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn list_users(&self, page: Page) -> PortResult<Vec<User>> {
        let t = self.tables()?;
        Ok(paged(t.users.values(), page)
            .iter()
            .map(UserCredentials::to_user)
            .collect())
    }

    async fn update_user(&self, user_id: i64, patch: UserPatch) -> PortResult<User> {
        let mut t = self.tables()?;
        if let Some(email) = &patch.email {
            if t.email_taken(email, Some(user_id)) {
                return Err(PortError::Conflict(format!("Email {} already registered", email)));
            }
        }
        let user = t
            .users
            .get_mut(&user_id)
            .ok_or_else(|| not_found("User", user_id))?;
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(is_admin) = patch.is_admin {
            user.is_admin = is_admin;
        }
        Ok(user.to_user())
    }

    async fn delete_user(&self, user_id: i64) -> PortResult<()> {
        let mut t = self.tables()?;
        if t.users.remove(&user_id).is_none() {
            return Err(not_found("User", user_id));
        }
        t.progress.retain(|(_, user, _), _| *user != user_id);
        t.scores.retain(|(user, _), _| *user != user_id);
        t.activity_progress.retain(|(user, _), _| *user != user_id);
        Ok(())
    }

    async fn create_course(&self, new_course: NewCourse) -> PortResult<Course> {
        let mut t = self.tables()?;
        let id = t.next_id("courses");
        let course = Course {
            id,
            name: new_course.name,
            description: new_course.description,
            background_image: new_course.background_image,
        };
        t.courses.insert(id, course.clone());
        Ok(course)
    }

    async fn get_course(&self, course_id: i64) -> PortResult<Course> {
        let t = self.tables()?;
        t.courses
            .get(&course_id)
            .cloned()
            .ok_or_else(|| not_found("Course", course_id))
    }

    async fn list_courses(&self, page: Page) -> PortResult<Vec<Course>> {
        let t = self.tables()?;
        Ok(paged(t.courses.values(), page))
    }

    async fn update_course(&self, course_id: i64, patch: CoursePatch) -> PortResult<Course> {
        let mut t = self.tables()?;
        let course = t
            .courses
            .get_mut(&course_id)
            .ok_or_else(|| not_found("Course", course_id))?;
        if let Some(name) = patch.name {
            course.name = name;
        }
        if patch.description.is_some() {
            course.description = patch.description;
        }
        if patch.background_image.is_some() {
            course.background_image = patch.background_image;
        }
        Ok(course.clone())
    }

    async fn delete_course(&self, course_id: i64) -> PortResult<()> {
        let mut t = self.tables()?;
        if t.remove_course(course_id) {
            Ok(())
        } else {
            Err(not_found("Course", course_id))
        }
    }

    async fn first_course(&self) -> PortResult<Option<Course>> {
        let t = self.tables()?;
        Ok(t.courses.values().next().cloned())
    }

    async fn next_course(&self, after_course_id: i64) -> PortResult<Option<Course>> {
        let t = self.tables()?;
        Ok(t.courses
            .range(after_course_id + 1..)
            .next()
            .map(|(_, c)| c.clone()))
    }

    async fn create_module(&self, new_module: NewModule) -> PortResult<Module> {
        let mut t = self.tables()?;
        if !t.courses.contains_key(&new_module.course_id) {
            return Err(PortError::Integrity(format!(
                "Course {} does not exist",
                new_module.course_id
            )));
        }
        let id = t.next_id("modules");
        let module = Module {
            id,
            course_id: new_module.course_id,
            name: new_module.name,
            description: new_module.description,
            background_image: new_module.background_image,
            locked: new_module.locked,
            completed: new_module.completed,
            score: new_module.score,
        };
        t.modules.insert(id, module.clone());
        Ok(module)
    }

    async fn get_module(&self, module_id: i64) -> PortResult<Module> {
        let t = self.tables()?;
        t.modules
            .get(&module_id)
            .cloned()
            .ok_or_else(|| not_found("Module", module_id))
    }

    async fn list_modules(&self, page: Page) -> PortResult<Vec<Module>> {
        let t = self.tables()?;
        Ok(paged(t.modules.values(), page))
    }

    async fn list_modules_by_course(&self, course_id: i64) -> PortResult<Vec<Module>> {
        let t = self.tables()?;
        Ok(t.modules
            .values()
            .filter(|m| m.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn update_module(&self, module_id: i64, patch: ModulePatch) -> PortResult<Module> {
        let mut t = self.tables()?;
        let module = t
            .modules
            .get_mut(&module_id)
            .ok_or_else(|| not_found("Module", module_id))?;
        if let Some(name) = patch.name {
            module.name = name;
        }
        if patch.description.is_some() {
            module.description = patch.description;
        }
        if patch.background_image.is_some() {
            module.background_image = patch.background_image;
        }
        if let Some(locked) = patch.locked {
            module.locked = locked;
        }
        if let Some(completed) = patch.completed {
            module.completed = completed;
        }
        if let Some(score) = patch.score {
            module.score = score;
        }
        Ok(module.clone())
    }

    async fn delete_module(&self, module_id: i64) -> PortResult<()> {
        let mut t = self.tables()?;
        if t.remove_module(module_id) {
            Ok(())
        } else {
            Err(not_found("Module", module_id))
        }
    }

    async fn create_resource(&self, new_resource: NewResource) -> PortResult<Resource> {
        let mut t = self.tables()?;
        if !t.modules.contains_key(&new_resource.module_id) {
            return Err(PortError::Integrity(format!(
                "Module {} does not exist",
                new_resource.module_id
            )));
        }
        let id = t.next_id("resources");
        let resource = Resource {
            id,
            module_id: new_resource.module_id,
            name: new_resource.name,
        };
        t.resources.insert(id, resource.clone());
        Ok(resource)
    }

    async fn get_resource(&self, resource_id: i64) -> PortResult<Resource> {
        let t = self.tables()?;
        t.resources
            .get(&resource_id)
            .cloned()
            .ok_or_else(|| not_found("Resource", resource_id))
    }

    async fn list_resources(&self, page: Page) -> PortResult<Vec<Resource>> {
        let t = self.tables()?;
        Ok(paged(t.resources.values(), page))
    }

    async fn list_resources_by_module(&self, module_id: i64) -> PortResult<Vec<Resource>> {
        let t = self.tables()?;
        Ok(t.resources
            .values()
            .filter(|r| r.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn update_resource(
        &self,
        resource_id: i64,
        patch: ResourcePatch,
    ) -> PortResult<Resource> {
        let mut t = self.tables()?;
        let resource = t
            .resources
            .get_mut(&resource_id)
            .ok_or_else(|| not_found("Resource", resource_id))?;
        if let Some(name) = patch.name {
            resource.name = name;
        }
        Ok(resource.clone())
    }

    async fn delete_resource(&self, resource_id: i64) -> PortResult<()> {
        let mut t = self.tables()?;
        if t.remove_resource(resource_id) {
            Ok(())
        } else {
            Err(not_found("Resource", resource_id))
        }
    }

    async fn create_media(&self, kind: MediaKind, new_media: NewMedia) -> PortResult<Media> {
        let mut t = self.tables()?;
        if !t.resources.contains_key(&new_media.resource_id) {
            return Err(PortError::Integrity(format!(
                "Resource {} does not exist",
                new_media.resource_id
            )));
        }
        let id = t.next_id(match kind {
            MediaKind::Video => "videos",
            MediaKind::Pdf => "pdfs",
        });
        let media = Media {
            id,
            resource_id: new_media.resource_id,
            kind,
            title: new_media.title,
            url: new_media.url,
            thumbnail: new_media.thumbnail,
        };
        t.media_mut(kind).insert(id, media.clone());
        Ok(media)
    }

    async fn get_media(&self, kind: MediaKind, media_id: i64) -> PortResult<Media> {
        let t = self.tables()?;
        t.media(kind)
            .get(&media_id)
            .cloned()
            .ok_or_else(|| not_found(kind.label(), media_id))
    }

    async fn list_media(&self, kind: MediaKind, page: Page) -> PortResult<Vec<Media>> {
        let t = self.tables()?;
        Ok(paged(t.media(kind).values(), page))
    }

    async fn list_media_by_resource(
        &self,
        kind: MediaKind,
        resource_id: i64,
    ) -> PortResult<Vec<Media>> {
        let t = self.tables()?;
        Ok(t.media(kind)
            .values()
            .filter(|m| m.resource_id == resource_id)
            .cloned()
            .collect())
    }

    async fn list_media_by_module(
        &self,
        kind: MediaKind,
        module_id: i64,
    ) -> PortResult<Vec<Media>> {
        let t = self.tables()?;
        let resources = t.module_resource_ids(module_id);
        Ok(t.media(kind)
            .values()
            .filter(|m| resources.contains(&m.resource_id))
            .cloned()
            .collect())
    }

    async fn update_media(
        &self,
        kind: MediaKind,
        media_id: i64,
        patch: MediaPatch,
    ) -> PortResult<Media> {
        let mut t = self.tables()?;
        let media = t
            .media_mut(kind)
            .get_mut(&media_id)
            .ok_or_else(|| not_found(kind.label(), media_id))?;
        if let Some(title) = patch.title {
            media.title = title;
        }
        if let Some(url) = patch.url {
            media.url = url;
        }
        if patch.thumbnail.is_some() {
            media.thumbnail = patch.thumbnail;
        }
        Ok(media.clone())
    }

    async fn delete_media(&self, kind: MediaKind, media_id: i64) -> PortResult<()> {
        let mut t = self.tables()?;
        t.media_mut(kind)
            .remove(&media_id)
            .map(|_| ())
            .ok_or_else(|| not_found(kind.label(), media_id))
    }

    async fn create_activity(&self, new_activity: NewActivity) -> PortResult<Activity> {
        let mut t = self.tables()?;
        if !t.resources.contains_key(&new_activity.resource_id) {
            return Err(PortError::Integrity(format!(
                "Resource {} does not exist",
                new_activity.resource_id
            )));
        }
        let id = t.next_id("activities");
        let activity = Activity {
            id,
            resource_id: new_activity.resource_id,
            name: new_activity.name,
            completed: new_activity.completed,
            score: new_activity.score,
        };
        t.activities.insert(id, activity.clone());
        Ok(activity)
    }

    async fn get_activity(&self, activity_id: i64) -> PortResult<Activity> {
        let t = self.tables()?;
        t.activities
            .get(&activity_id)
            .cloned()
            .ok_or_else(|| not_found("Activity", activity_id))
    }

    async fn list_activities(&self, page: Page) -> PortResult<Vec<Activity>> {
        let t = self.tables()?;
        Ok(paged(t.activities.values(), page))
    }

    async fn list_activities_by_resource(&self, resource_id: i64) -> PortResult<Vec<Activity>> {
        let t = self.tables()?;
        Ok(t.activities
            .values()
            .filter(|a| a.resource_id == resource_id)
            .cloned()
            .collect())
    }

    async fn list_activities_by_module(&self, module_id: i64) -> PortResult<Vec<Activity>> {
        let t = self.tables()?;
        let resources = t.module_resource_ids(module_id);
        Ok(t.activities
            .values()
            .filter(|a| resources.contains(&a.resource_id))
            .cloned()
            .collect())
    }

    async fn update_activity(
        &self,
        activity_id: i64,
        patch: ActivityPatch,
    ) -> PortResult<Activity> {
        let mut t = self.tables()?;
        let activity = t
            .activities
            .get_mut(&activity_id)
            .ok_or_else(|| not_found("Activity", activity_id))?;
        if let Some(name) = patch.name {
            activity.name = name;
        }
        if let Some(completed) = patch.completed {
            activity.completed = completed;
        }
        if let Some(score) = patch.score {
            activity.score = score;
        }
        Ok(activity.clone())
    }

    async fn delete_activity(&self, activity_id: i64) -> PortResult<()> {
        let mut t = self.tables()?;
        if t.remove_activity(activity_id) {
            Ok(())
        } else {
            Err(not_found("Activity", activity_id))
        }
    }

    async fn get_progress(
        &self,
        scope: ProgressScope,
        user_id: i64,
        entity_id: i64,
    ) -> PortResult<Option<Progress>> {
        let t = self.tables()?;
        Ok(t.progress.get(&(scope, user_id, entity_id)).cloned())
    }

    async fn list_progress(
        &self,
        scope: ProgressScope,
        user_id: i64,
    ) -> PortResult<Vec<Progress>> {
        let t = self.tables()?;
        let mut rows: Vec<Progress> = t
            .progress
            .values()
            .filter(|p| p.scope == scope && p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.entity_id);
        Ok(rows)
    }

    async fn upsert_progress(
        &self,
        scope: ProgressScope,
        user_id: i64,
        entity_id: i64,
        change: ProgressChange,
    ) -> PortResult<Progress> {
        let mut t = self.tables()?;
        if !t.users.contains_key(&user_id) {
            return Err(PortError::Integrity(format!("User {} does not exist", user_id)));
        }
        let parent_exists = match scope {
            ProgressScope::Module => t.modules.contains_key(&entity_id),
            ProgressScope::Course => t.courses.contains_key(&entity_id),
        };
        if !parent_exists {
            return Err(PortError::Integrity(format!(
                "{:?} {} does not exist",
                scope, entity_id
            )));
        }
        Ok(apply_progress(&mut t, scope, user_id, entity_id, change))
    }

    async fn record_module_completion(
        &self,
        user_id: i64,
        module_id: i64,
        total_score: f64,
        at: DateTime<Utc>,
    ) -> PortResult<(Progress, StudentScore)> {
        let mut t = self.tables()?;
        if !t.users.contains_key(&user_id) {
            return Err(not_found("User", user_id));
        }
        if !t.modules.contains_key(&module_id) {
            return Err(not_found("Module", module_id));
        }
        let progress = apply_progress(
            &mut t,
            ProgressScope::Module,
            user_id,
            module_id,
            ProgressChange::complete(at),
        );
        let existing = t.scores.get(&(user_id, module_id)).cloned();
        let score = match existing {
            Some(existing) => StudentScore {
                total_score,
                completed_at: at,
                ..existing
            },
            None => StudentScore {
                id: t.next_id("student_scores"),
                user_id,
                module_id,
                total_score,
                completed_at: at,
            },
        };
        t.scores.insert((user_id, module_id), score.clone());
        Ok((progress, score))
    }

    async fn get_score(&self, user_id: i64, module_id: i64) -> PortResult<Option<StudentScore>> {
        let t = self.tables()?;
        Ok(t.scores.get(&(user_id, module_id)).cloned())
    }

    async fn list_scores_for_user(&self, user_id: i64) -> PortResult<Vec<StudentScore>> {
        let t = self.tables()?;
        Ok(t.scores
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_scores_for_module(&self, module_id: i64) -> PortResult<Vec<StudentScore>> {
        let t = self.tables()?;
        let mut scores: Vec<StudentScore> = t
            .scores
            .values()
            .filter(|s| s.module_id == module_id)
            .cloned()
            .collect();
        scores.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
        Ok(scores)
    }

    async fn upsert_activity_progress(
        &self,
        user_id: i64,
        activity_id: i64,
        completed: bool,
    ) -> PortResult<ActivityProgress> {
        let mut t = self.tables()?;
        if !t.activities.contains_key(&activity_id) {
            return Err(not_found("Activity", activity_id));
        }
        let row = ActivityProgress {
            user_id,
            activity_id,
            completed,
        };
        t.activity_progress
            .insert((user_id, activity_id), row.clone());
        Ok(row)
    }

    async fn list_activity_progress(&self, user_id: i64) -> PortResult<Vec<ActivityProgress>> {
        let t = self.tables()?;
        Ok(t.activity_progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn table_counts(&self) -> PortResult<TableCounts> {
        let t = self.tables()?;
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Ok(TableCounts {
            users: count(t.users.len()),
            courses: count(t.courses.len()),
            modules: count(t.modules.len()),
            resources: count(t.resources.len()),
            videos: count(t.videos.len()),
            pdfs: count(t.pdfs.len()),
            activities: count(t.activities.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, Course, Module, Resource) {
        let store = MemoryStore::new();
        let course = store
            .create_course(NewCourse {
                name: "Python".to_string(),
                ..NewCourse::default()
            })
            .await
            .unwrap();
        let module = store
            .create_module(NewModule::new(course.id, "Basics"))
            .await
            .unwrap();
        let resource = store
            .create_resource(NewResource {
                module_id: module.id,
                name: "Intro".to_string(),
            })
            .await
            .unwrap();
        (store, course, module, resource)
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let new_user = NewUser {
            email: "a@example.com".to_string(),
            password_hash: "x".to_string(),
            is_admin: false,
        };
        store.create_user(new_user.clone()).await.unwrap();
        let err = store.create_user(new_user).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn only_the_first_registration_is_admin() {
        let store = MemoryStore::new();
        let first = store.register_user("a@example.com", "x").await.unwrap();
        let second = store.register_user("b@example.com", "x").await.unwrap();
        assert!(first.is_admin);
        assert!(!second.is_admin);

        let err = store.register_user("b@example.com", "y").await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn missing_parent_is_an_integrity_error() {
        let store = MemoryStore::new();
        let err = store
            .create_module(NewModule::new(42, "Orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Integrity(_)));
    }

    #[tokio::test]
    async fn deleting_a_course_cascades_to_content() {
        let (store, course, module, resource) = seeded().await;
        let video = store
            .create_media(
                MediaKind::Video,
                NewMedia {
                    resource_id: resource.id,
                    title: "Welcome".to_string(),
                    url: "https://videos.example/1".to_string(),
                    thumbnail: None,
                },
            )
            .await
            .unwrap();
        let activity = store
            .create_activity(NewActivity {
                resource_id: resource.id,
                name: "Quiz".to_string(),
                completed: false,
                score: 5.0,
            })
            .await
            .unwrap();

        store.delete_course(course.id).await.unwrap();

        assert!(store.get_module(module.id).await.is_err());
        assert!(store.get_resource(resource.id).await.is_err());
        assert!(store.get_media(MediaKind::Video, video.id).await.is_err());
        assert!(store.get_activity(activity.id).await.is_err());
        assert_eq!(store.table_counts().await.unwrap(), TableCounts::default());
    }

    #[tokio::test]
    async fn progress_upsert_keeps_one_row_per_pair() {
        let (store, _, module, _) = seeded().await;
        let user = store
            .create_user(NewUser {
                email: "b@example.com".to_string(),
                password_hash: "x".to_string(),
                is_admin: false,
            })
            .await
            .unwrap();

        store
            .upsert_progress(ProgressScope::Module, user.id, module.id, ProgressChange::unlock())
            .await
            .unwrap();
        let row = store
            .upsert_progress(
                ProgressScope::Module,
                user.id,
                module.id,
                ProgressChange {
                    completed: Some(true),
                    ..ProgressChange::default()
                },
            )
            .await
            .unwrap();

        assert!(!row.locked);
        assert!(row.completed);
        let rows = store
            .list_progress(ProgressScope::Module, user.id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn pagination_skips_and_limits() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c", "d"] {
            store
                .create_course(NewCourse {
                    name: name.to_string(),
                    ..NewCourse::default()
                })
                .await
                .unwrap();
        }
        let page = store.list_courses(Page::new(1, 2)).await.unwrap();
        let names: Vec<_> = page.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["b", "c"]);
    }
}
