//! Router-level tests for the api service.
//!
//! Every test drives the real router (middleware, handlers, error mapping)
//! over the in-memory store, so no database is required.

use api_lib::{config::Config, error::NOT_AUTHENTICATED, web};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use learning_core::memory::MemoryStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

//=========================================================================================
// Helpers
//=========================================================================================

struct TestApp {
    router: Router,
    uploads: TempDir,
}

/// Test helper: app over a fresh in-memory store with uploads in a temp dir.
fn setup_app() -> TestApp {
    let uploads = TempDir::new().expect("Should create temp dir");
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://unused/lms".to_string()),
        ("JWT_SECRET", "test-secret".to_string()),
        ("UPLOAD_DIR", uploads.path().display().to_string()),
    ]);
    let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("Should build config");
    let state = Arc::new(web::AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(config),
    ));
    TestApp {
        router: web::router(state),
        uploads,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn call(&self, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(request).await;
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }

    /// Registers and logs in, returning the `access_token=...` cookie pair.
    async fn sign_up(&self, email: &str) -> String {
        let credentials = json!({"email": email, "password": "pa55word"});
        let (status, _) = self.call("POST", "/register", None, Some(credentials.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let response = self.send(json_request("POST", "/login", &credentials)).await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response)
    }

    async fn create(&self, cookie: &str, uri: &str, body: Value) -> i64 {
        let (status, created) = self.call("POST", uri, Some(cookie), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "POST {} failed: {}", uri, created);
        created["id"].as_i64().unwrap()
    }
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Should set a cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Two courses with two modules each, plus one resource holding two
/// activities under the very first module.
struct Catalog {
    c1: i64,
    c1m1: i64,
    c1m2: i64,
    c2: i64,
    c2m1: i64,
    activities: [i64; 2],
}

async fn seed_catalog(app: &TestApp, admin: &str) -> Catalog {
    let c1 = app.create(admin, "/courses", json!({"name": "Basics"})).await;
    let c1m1 = app.create(admin, "/modules", json!({"course_id": c1, "name": "Greetings"})).await;
    let c1m2 = app.create(admin, "/modules", json!({"course_id": c1, "name": "Numbers"})).await;
    let c2 = app.create(admin, "/courses", json!({"name": "Advanced"})).await;
    let c2m1 = app.create(admin, "/modules", json!({"course_id": c2, "name": "Grammar"})).await;
    app.create(admin, "/modules", json!({"course_id": c2, "name": "Idioms"})).await;

    let resource = app.create(admin, "/resources", json!({"module_id": c1m1, "name": "Lesson 1"})).await;
    let a1 = app.create(admin, "/activities", json!({"resource_id": resource, "name": "Quiz", "score": 0.0})).await;
    let a2 = app.create(admin, "/activities", json!({"resource_id": resource, "name": "Drill"})).await;

    Catalog {
        c1,
        c1m1,
        c1m2,
        c2,
        c2m1,
        activities: [a1, a2],
    }
}

//=========================================================================================
// Public Endpoints and Access Control
//=========================================================================================

#[tokio::test]
async fn health_requires_no_auth() {
    let app = setup_app();
    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "API is running successfully");
}

#[tokio::test]
async fn protected_paths_reject_missing_or_bad_tokens() {
    let app = setup_app();

    let (status, body) = app.call("GET", "/courses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], NOT_AUTHENTICATED);

    let (status, _) = app.call("GET", "/me", Some("access_token=forged.token.value"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call("GET", "/admin/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn first_user_is_admin_and_later_users_are_not() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let student = app.sign_up("student@example.com").await;

    let (_, me) = app.call("GET", "/me", Some(&admin), None).await;
    assert_eq!(me["is_admin"], true);
    let (_, me) = app.call("GET", "/me", Some(&student), None).await;
    assert_eq!(me["email"], "student@example.com");
    assert_eq!(me["is_admin"], false);

    let (status, body) = app.call("POST", "/courses", Some(&student), Some(json!({"name": "X"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = app.call("GET", "/users", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, users) = app.call("GET", "/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
}

//=========================================================================================
// Registration and Login
//=========================================================================================

#[tokio::test]
async fn duplicate_and_invalid_registrations_are_rejected() {
    let app = setup_app();
    app.sign_up("a@example.com").await;

    let (status, body) = app
        .call("POST", "/register", None, Some(json!({"email": "a@example.com", "password": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already registered");

    let (status, _) = app
        .call("POST", "/register", None, Some(json!({"email": "not-an-email", "password": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_sets_an_http_only_cookie_and_logout_clears_it() {
    let app = setup_app();
    app.sign_up("a@example.com").await;

    let response = app
        .send(json_request("POST", "/login", &json!({"email": "a@example.com", "password": "pa55word"})))
        .await;
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=31536000"));
    let cookie = session_cookie(&response);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(format!("access_token={}", body["cookie"].as_str().unwrap()), cookie);

    let (status, _) = app.call("GET", "/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let response = app.send(json_request("POST", "/logout", &json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = setup_app();
    app.sign_up("a@example.com").await;

    for body in [
        json!({"email": "a@example.com", "password": "wrong"}),
        json!({"email": "nobody@example.com", "password": "pa55word"}),
    ] {
        let (status, body) = app.call("POST", "/login", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn deleted_user_token_stops_working() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let student = app.sign_up("student@example.com").await;
    let (_, me) = app.call("GET", "/me", Some(&student), None).await;

    let uri = format!("/users/{}", me["id"]);
    let (status, _) = app.call("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call("GET", "/me", Some(&student), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_cannot_demote_themselves_through_user_update() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let student = app.sign_up("student@example.com").await;
    let (_, me) = app.call("GET", "/me", Some(&admin), None).await;

    let uri = format!("/users/{}", me["id"]);
    let (status, body) = app.call("PUT", &uri, Some(&admin), Some(json!({"is_admin": false}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot remove admin privileges from yourself");
    let (_, me) = app.call("GET", "/me", Some(&admin), None).await;
    assert_eq!(me["is_admin"], true);

    // Other users' flags stay editable.
    let (_, other) = app.call("GET", "/me", Some(&student), None).await;
    let uri = format!("/users/{}", other["id"]);
    let (status, user) = app.call("PUT", &uri, Some(&admin), Some(json!({"is_admin": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["is_admin"], true);
    let (status, user) = app.call("PUT", &uri, Some(&admin), Some(json!({"is_admin": false}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["is_admin"], false);
}

#[tokio::test]
async fn user_update_validates_the_email() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let student = app.sign_up("student@example.com").await;
    let (_, me) = app.call("GET", "/me", Some(&student), None).await;
    let uri = format!("/users/{}", me["id"]);

    let (status, body) = app.call("PUT", &uri, Some(&admin), Some(json!({"email": "not-an-email"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .call("PUT", &uri, Some(&admin), Some(json!({"email": "admin@example.com"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, user) = app.call("GET", &uri, Some(&admin), None).await;
    assert_eq!(user["email"], "student@example.com");

    let (status, user) = app
        .call("PUT", &uri, Some(&admin), Some(json!({"email": "learner@example.com"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "learner@example.com");
}

//=========================================================================================
// Malformed Requests
//=========================================================================================

#[tokio::test]
async fn malformed_requests_get_the_json_error_body() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;

    let (status, body) = app
        .call("POST", "/register", None, Some(json!({"email": "b@example.com"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("password"));

    let (status, body) = app.call("GET", "/courses/abc", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.call("GET", "/courses?skip=many", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_routes_are_json_not_found() {
    let app = setup_app();
    let (status, body) = app.call("GET", "/no-such-route", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not found");
}

//=========================================================================================
// CRUD
//=========================================================================================

#[tokio::test]
async fn course_crud_round_trip() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;

    let id = app
        .create(&admin, "/courses", json!({"name": "Basics", "description": "Start here"}))
        .await;
    let uri = format!("/courses/{}", id);

    let (status, course) = app.call("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(course["description"], "Start here");

    let (status, course) = app.call("PUT", &uri, Some(&admin), Some(json!({"name": "Renamed"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(course["name"], "Renamed");
    assert_eq!(course["description"], "Start here");

    let (status, _) = app.call("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.call("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn creating_under_a_missing_parent_is_a_bad_request() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;

    let (status, body) = app
        .call("POST", "/modules", Some(&admin), Some(json!({"course_id": 999, "name": "Orphan"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn nested_reads_include_content() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let catalog = seed_catalog(&app, &admin).await;
    let (_, resources) = app
        .call("GET", &format!("/modules/{}/resources", catalog.c1m1), Some(&admin), None)
        .await;
    let resource_id = resources[0]["id"].as_i64().unwrap();
    app.create(
        &admin,
        "/videos",
        json!({"resource_id": resource_id, "title": "Intro", "url": "https://v.example/1"}),
    )
    .await;

    let (status, module) = app
        .call("GET", &format!("/modules/{}", catalog.c1m1), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(module["resources"][0]["videos"][0]["title"], "Intro");
    assert_eq!(module["resources"][0]["activities"].as_array().unwrap().len(), 2);

    let (_, course) = app
        .call("GET", &format!("/courses/{}/complete", catalog.c1), Some(&admin), None)
        .await;
    assert_eq!(course["modules"].as_array().unwrap().len(), 2);

    let (_, videos) = app
        .call("GET", &format!("/modules/{}/videos", catalog.c1m1), Some(&admin), None)
        .await;
    assert_eq!(videos.as_array().unwrap().len(), 1);

    let (_, listed) = app.call("GET", "/modules?skip=1&limit=2", Some(&admin), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
    assert_eq!(listed[0]["id"], catalog.c1m2);
}

//=========================================================================================
// Progress and Scores
//=========================================================================================

#[tokio::test]
async fn new_student_sees_only_the_first_course_unlocked() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let catalog = seed_catalog(&app, &admin).await;
    let student = app.sign_up("student@example.com").await;

    let (status, courses) = app.call("GET", "/courses", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(courses[0]["id"], catalog.c1);
    assert_eq!(courses[0]["user_progress"]["locked"], false);
    assert_eq!(courses[1]["user_progress"]["locked"], true);

    let (_, modules) = app
        .call("GET", &format!("/courses/{}/modules", catalog.c1), Some(&student), None)
        .await;
    assert_eq!(modules[0]["user_progress"]["locked"], false);
    assert_eq!(modules[1]["user_progress"]["locked"], true);
    assert_eq!(modules[0]["score"], Value::Null);

    let (status, _) = app.call("GET", "/courses/999/modules", Some(&student), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completing_modules_scores_and_unlocks_in_order() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let catalog = seed_catalog(&app, &admin).await;
    let student = app.sign_up("student@example.com").await;

    for (activity, score) in catalog.activities.iter().zip([4.0, 6.5]) {
        let (status, submitted) = app
            .call("POST", &format!("/activities/{}/submit", activity), Some(&student), Some(json!({"score": score})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(submitted["completed"], true);
    }

    // C1.M1 -> C1.M2
    let complete_m1 = format!("/modules/{}/complete", catalog.c1m1);
    let (status, outcome) = app.call("POST", &complete_m1, Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["score"]["total_score"], 10.5);
    assert_eq!(outcome["unlocked"]["kind"], "module");
    assert_eq!(outcome["unlocked"]["module_id"], catalog.c1m2);
    assert_eq!(outcome["course_completed"], false);

    // C1.M2 -> C2 and C2.M1, never C2.M2
    let (_, outcome) = app
        .call("POST", &format!("/modules/{}/complete", catalog.c1m2), Some(&student), None)
        .await;
    assert_eq!(outcome["unlocked"]["kind"], "course");
    assert_eq!(outcome["unlocked"]["course_id"], catalog.c2);
    assert_eq!(outcome["unlocked"]["module_id"], catalog.c2m1);
    assert_eq!(outcome["course_completed"], true);

    let (_, modules) = app
        .call("GET", &format!("/courses/{}/modules", catalog.c2), Some(&student), None)
        .await;
    assert_eq!(modules[0]["user_progress"]["locked"], false);
    assert_eq!(modules[1]["user_progress"]["locked"], true);

    // Re-completing recomputes instead of accumulating.
    let (_, outcome) = app.call("POST", &complete_m1, Some(&student), None).await;
    assert_eq!(outcome["score"]["total_score"], 10.5);

    let (_, scores) = app.call("GET", "/students/scores", Some(&student), None).await;
    assert_eq!(scores.as_array().unwrap().len(), 2);

    let (_, leaderboard) = app
        .call("GET", &format!("/modules/{}/scores", catalog.c1m1), Some(&student), None)
        .await;
    assert_eq!(leaderboard.as_array().unwrap().len(), 1);
    assert_eq!(leaderboard[0]["total_score"], 10.5);

    // The admin's progress is untouched.
    let (_, courses) = app.call("GET", "/courses", Some(&admin), None).await;
    assert_eq!(courses[1]["user_progress"]["locked"], true);
}

#[tokio::test]
async fn user_progress_flag_can_be_cleared() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let catalog = seed_catalog(&app, &admin).await;
    let student = app.sign_up("student@example.com").await;
    let uri = format!("/modules/{}/user-progress", catalog.c1m1);

    let (status, module) = app.call("POST", &uri, Some(&student), Some(json!({"completed": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(module["user_progress"]["completed"], true);

    let (_, module) = app.call("POST", &uri, Some(&student), Some(json!({"completed": false}))).await;
    assert_eq!(module["user_progress"]["completed"], false);
    assert_eq!(module["user_progress"]["locked"], false);
}

#[tokio::test]
async fn progress_overview_reports_resource_completion() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let catalog = seed_catalog(&app, &admin).await;
    let student = app.sign_up("student@example.com").await;

    for activity in catalog.activities {
        app.call("POST", &format!("/activities/{}/submit", activity), Some(&student), Some(json!({"score": 1.0})))
            .await;
    }
    app.call("POST", &format!("/modules/{}/complete", catalog.c1m1), Some(&student), None)
        .await;

    let (status, tree) = app.call("GET", "/progress", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    let first = &tree[0]["modules"][0];
    assert_eq!(first["module_id"], catalog.c1m1);
    assert_eq!(first["completed"], true);
    assert_eq!(first["score"], 2.0);
    assert_eq!(first["resources"][0]["completed"], true);
    assert_eq!(tree[0]["modules"][1]["locked"], false);
    assert_eq!(tree[1]["locked"], true);
}

#[tokio::test]
async fn completing_a_missing_module_is_not_found() {
    let app = setup_app();
    let student = app.sign_up("student@example.com").await;
    let (status, body) = app.call("POST", "/modules/42/complete", Some(&student), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

//=========================================================================================
// Uploads
//=========================================================================================

fn multipart_upload(cookie: &str, file_name: &str, resource_id: i64) -> Request<Body> {
    let boundary = "lmsboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nSyllabus\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"resource_id\"\r\n\r\n{rid}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.4 test\r\n\
         --{b}--\r\n",
        b = boundary,
        rid = resource_id,
        f = file_name,
    );
    Request::builder()
        .method("POST")
        .uri("/pdfs/upload")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn uploaded_pdf_is_stored_and_served() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let catalog = seed_catalog(&app, &admin).await;
    let (_, resources) = app
        .call("GET", &format!("/modules/{}/resources", catalog.c1m1), Some(&admin), None)
        .await;
    let resource_id = resources[0]["id"].as_i64().unwrap();

    let response = app.send(multipart_upload(&admin, "syllabus.pdf", resource_id)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let pdf = extract_json(response.into_body()).await;
    assert_eq!(pdf["title"], "Syllabus");
    let url = pdf["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/") && url.ends_with(".pdf"));

    let stored = app.uploads.path().join(url.trim_start_matches("/uploads/"));
    assert_eq!(std::fs::read(&stored).unwrap(), b"%PDF-1.4 test");

    // Served publicly.
    let response = app
        .send(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.4 test");
}

#[tokio::test]
async fn non_pdf_uploads_are_rejected() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    let catalog = seed_catalog(&app, &admin).await;
    let (_, resources) = app
        .call("GET", &format!("/modules/{}/resources", catalog.c1m1), Some(&admin), None)
        .await;
    let resource_id = resources[0]["id"].as_i64().unwrap();

    let response = app.send(multipart_upload(&admin, "virus.exe", resource_id)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);

    let student = app.sign_up("student@example.com").await;
    let response = app.send(multipart_upload(&student, "notes.pdf", resource_id)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

//=========================================================================================
// Admin
//=========================================================================================

#[tokio::test]
async fn admin_stats_and_flag_toggles() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    seed_catalog(&app, &admin).await;
    app.sign_up("student@example.com").await;

    let (status, stats) = app.call("GET", "/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_users"], 2);
    assert_eq!(stats["total_courses"], 2);
    assert_eq!(stats["total_modules"], 4);
    assert_eq!(stats["total_activities"], 2);

    let (_, me) = app.call("GET", "/me", Some(&admin), None).await;
    let (status, body) = app
        .call("POST", &format!("/admin/users/{}/remove-admin", me["id"]), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot remove admin privileges from yourself");

    let (_, users) = app.call("GET", "/users", Some(&admin), None).await;
    let student_id = users[1]["id"].as_i64().unwrap();
    let (status, body) = app
        .call("POST", &format!("/admin/users/{}/make-admin", student_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User student@example.com is now an admin");

    let (status, _) = app
        .call("POST", "/admin/users/999/make-admin", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_can_register_another_admin() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;

    let (status, user) = app
        .call(
            "POST",
            "/admin/register",
            Some(&admin),
            Some(json!({"email": "ops@example.com", "password": "pw", "is_admin": true})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["is_admin"], true);
}

#[tokio::test]
async fn admin_panel_is_html_for_admins_only() {
    let app = setup_app();
    let admin = app.sign_up("admin@example.com").await;
    seed_catalog(&app, &admin).await;

    let response = app
        .send(
            Request::builder()
                .uri("/admin")
                .header(header::COOKIE, &admin)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("admin@example.com"));
    assert!(html.contains("Greetings"));

    let (status, _) = app.call("GET", "/admin", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn openapi_document_is_public() {
    let app = setup_app();
    let (status, doc) = app.call("GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/modules/{id}/complete"].is_object());
}
