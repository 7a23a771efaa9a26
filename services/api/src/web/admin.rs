//! services/api/src/web/admin.rs
//!
//! Admin statistics, admin-flag toggles and the server-rendered admin panel.

use axum::{
    extract::State,
    response::Html,
    Extension,
};
use learning_core::{Page, UserPatch};
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::web::extract::{Json, Path};
use crate::web::middleware::CurrentUser;
use crate::web::schema::{AdminStatsResponse, MessageResponse};
use crate::web::state::AppState;

/// Counts reported by `/admin/stats` never exceed this.
pub const STATS_CAP: i64 = 10_000;

//=========================================================================================
// JSON Endpoints
//=========================================================================================

/// GET /admin/stats - Row counts per table.
#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "admin",
    responses(
        (status = 200, description = "Table counts", body = AdminStatsResponse),
        (status = 403, description = "Admin access required", body = MessageResponse)
    )
)]
pub async fn admin_stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminStatsResponse>, ApiError> {
    let counts = state.db.table_counts().await?.capped(STATS_CAP);
    Ok(Json(counts.into()))
}

/// POST /admin/users/{id}/make-admin
#[utoipa::path(
    post,
    path = "/admin/users/{id}/make-admin",
    tag = "admin",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User promoted", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn make_admin_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state
        .db
        .update_user(
            id,
            UserPatch {
                is_admin: Some(true),
                ..UserPatch::default()
            },
        )
        .await?;
    info!(user_id = user.id, "Granted admin");
    Ok(Json(MessageResponse::ok(format!("User {} is now an admin", user.email))))
}

/// POST /admin/users/{id}/remove-admin - An admin cannot demote themselves.
#[utoipa::path(
    post,
    path = "/admin/users/{id}/remove-admin",
    tag = "admin",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Admin flag removed", body = MessageResponse),
        (status = 400, description = "Cannot remove your own admin flag", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn remove_admin_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let target = state.db.get_user(id).await?;
    if target.id == admin.id {
        return Err(ApiError::BadRequest(
            "Cannot remove admin privileges from yourself".to_string(),
        ));
    }
    let user = state
        .db
        .update_user(
            target.id,
            UserPatch {
                is_admin: Some(false),
                ..UserPatch::default()
            },
        )
        .await?;
    info!(user_id = user.id, by = admin.id, "Revoked admin");
    Ok(Json(MessageResponse::ok(format!(
        "Admin privileges removed from user {}",
        user.email
    ))))
}

//=========================================================================================
// HTML Panel
//=========================================================================================

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders one `<section>` with a table. Cells are escaped, `actions` is raw HTML.
fn table(title: &str, headers: &[&str], rows: Vec<(Vec<String>, String)>) -> String {
    let mut html = format!("<section><h2>{} ({})</h2><table><thead><tr>", escape(title), rows.len());
    for h in headers {
        let _ = write!(html, "<th>{}</th>", escape(h));
    }
    html.push_str("<th></th></tr></thead><tbody>");
    for (cells, actions) in rows {
        html.push_str("<tr>");
        for cell in cells {
            let _ = write!(html, "<td>{}</td>", escape(&cell));
        }
        let _ = write!(html, "<td>{}</td></tr>", actions);
    }
    html.push_str("</tbody></table></section>");
    html
}

fn delete_button(path: &str, id: i64) -> String {
    format!(r#"<button onclick="callApi('DELETE', '/{path}/{id}')">Delete</button>"#)
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// GET /admin - Server-rendered admin panel over the JSON API.
#[utoipa::path(
    get,
    path = "/admin",
    tag = "admin",
    responses(
        (status = 200, description = "Admin panel", body = String, content_type = "text/html"),
        (status = 403, description = "Admin access required", body = MessageResponse)
    )
)]
pub async fn admin_panel_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> Result<Html<String>, ApiError> {
    let db = &state.db;
    let counts = db.table_counts().await?.capped(STATS_CAP);
    let users = db.list_users(Page::all()).await?;
    let courses = db.list_courses(Page::all()).await?;
    let modules = db.list_modules(Page::all()).await?;
    let resources = db.list_resources(Page::all()).await?;
    let activities = db.list_activities(Page::all()).await?;
    let mut scores = Vec::new();
    for module in &modules {
        scores.extend(db.list_scores_for_module(module.id).await?);
    }

    let user_rows = users
        .iter()
        .map(|u| {
            let toggle = if u.is_admin {
                format!(r#"<button onclick="callApi('POST', '/admin/users/{}/remove-admin')">Remove admin</button>"#, u.id)
            } else {
                format!(r#"<button onclick="callApi('POST', '/admin/users/{}/make-admin')">Make admin</button>"#, u.id)
            };
            let cells = vec![u.id.to_string(), u.email.clone(), u.is_admin.to_string()];
            (cells, format!("{} {}", toggle, delete_button("users", u.id)))
        })
        .collect();
    let course_rows = courses
        .iter()
        .map(|c| {
            let cells = vec![c.id.to_string(), c.name.clone(), opt(&c.description)];
            (cells, delete_button("courses", c.id))
        })
        .collect();
    let module_rows = modules
        .iter()
        .map(|m| {
            let cells = vec![
                m.id.to_string(),
                m.course_id.to_string(),
                m.name.clone(),
                m.score.to_string(),
            ];
            (cells, delete_button("modules", m.id))
        })
        .collect();
    let resource_rows = resources
        .iter()
        .map(|r| {
            let cells = vec![r.id.to_string(), r.module_id.to_string(), r.name.clone()];
            (cells, delete_button("resources", r.id))
        })
        .collect();
    let activity_rows = activities
        .iter()
        .map(|a| {
            let cells = vec![
                a.id.to_string(),
                a.resource_id.to_string(),
                a.name.clone(),
                a.completed.to_string(),
                a.score.to_string(),
            ];
            (cells, delete_button("activities", a.id))
        })
        .collect();
    let score_rows = scores
        .iter()
        .map(|s| {
            let cells = vec![
                s.user_id.to_string(),
                s.module_id.to_string(),
                s.total_score.to_string(),
                s.completed_at.to_rfc3339(),
            ];
            (cells, String::new())
        })
        .collect();

    let sections = [
        table("Users", &["ID", "Email", "Admin"], user_rows),
        table("Courses", &["ID", "Name", "Description"], course_rows),
        table("Modules", &["ID", "Course", "Name", "Points"], module_rows),
        table("Resources", &["ID", "Module", "Name"], resource_rows),
        table("Activities", &["ID", "Resource", "Name", "Completed", "Score"], activity_rows),
        table("Scores", &["User", "Module", "Total", "Completed at"], score_rows),
    ]
    .concat();

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>LMS Admin</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, sans-serif; margin: 20px; color: #222; }}
        .stats {{ display: flex; gap: 12px; margin-bottom: 20px; }}
        .stat {{ background: #f0f4fa; padding: 10px 14px; border-radius: 6px; }}
        table {{ border-collapse: collapse; width: 100%; margin-bottom: 24px; }}
        th, td {{ border: 1px solid #ddd; padding: 6px 8px; text-align: left; }}
        th {{ background: #f7f7f7; }}
    </style>
</head>
<body>
    <h1>LMS Admin</h1>
    <p>Signed in as {email}</p>
    <div class="stats">
        <div class="stat">Users: {users}</div>
        <div class="stat">Courses: {courses}</div>
        <div class="stat">Modules: {modules}</div>
        <div class="stat">Resources: {resources}</div>
        <div class="stat">Videos: {videos}</div>
        <div class="stat">PDFs: {pdfs}</div>
        <div class="stat">Activities: {activities}</div>
    </div>
    {sections}
    <script>
        async function callApi(method, path) {{
            if (method === 'DELETE' && !confirm('Delete ' + path + '?')) return;
            const res = await fetch(path, {{ method, credentials: 'same-origin' }});
            const body = await res.json().catch(() => ({{}}));
            if (!res.ok) {{ alert(body.message || res.statusText); return; }}
            location.reload();
        }}
    </script>
</body>
</html>"#,
        email = escape(&admin.email),
        users = counts.users,
        courses = counts.courses,
        modules = counts.modules,
        resources = counts.resources,
        videos = counts.videos,
        pdfs = counts.pdfs,
        activities = counts.activities,
        sections = sections,
    );

    Ok(Html(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn table_escapes_cells_but_not_actions() {
        let html = table(
            "Users",
            &["Email"],
            vec![(vec!["<b>".to_string()], "<button>x</button>".to_string())],
        );
        assert!(html.contains("<h2>Users (1)</h2>"));
        assert!(html.contains("<td>&lt;b&gt;</td>"));
        assert!(html.contains("<td><button>x</button></td>"));
    }
}
