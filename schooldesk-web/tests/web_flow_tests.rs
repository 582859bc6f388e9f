//! End-to-end tests of the web front end driven through the router

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use schooldesk_core::{Role, SchoolDeskConfig};
use schooldesk_session::{ManualClock, EXPIRED_MESSAGE, PERMISSION_DENIED_MESSAGE};
use schooldesk_web::{auth::Account, create_app, AppState, CONTEXT_COOKIE};
use std::sync::Arc;
use tower::ServiceExt;

struct TestClient {
    app: Router,
    state: AppState,
    clock: Arc<ManualClock>,
    cookie: Option<String>,
}

impl TestClient {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 10, 9, 8, 0, 0).unwrap(),
        ));
        let state = AppState::with_clock(&SchoolDeskConfig::default(), clock.clone()).unwrap();
        Self {
            app: create_app(state.clone()),
            state,
            clock,
            cookie: None,
        }
    }

    /// Another browser against the same server
    fn second_browser(&self) -> Self {
        Self {
            app: self.app.clone(),
            state: self.state.clone(),
            clock: self.clock.clone(),
            cookie: None,
        }
    }

    fn context_id(&self) -> Option<String> {
        self.cookie
            .as_deref()
            .and_then(|pair| pair.strip_prefix(&format!("{}=", CONTEXT_COOKIE)))
            .map(str::to_string)
    }

    async fn send(&mut self, request: Request<Body>) -> Response<Body> {
        let response = self.app.clone().oneshot(request).await.unwrap();
        if let Some(value) = response.headers().get(header::SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn get(&mut self, uri: &str) -> Response<Body> {
        let request = self.request("GET", uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn post_json(&mut self, uri: &str, json: serde_json::Value) -> Response<Body> {
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn login(&mut self, email: &str, password: &str) -> Response<Body> {
        self.get("/login").await;
        self.post_form("/login", &[("email", email), ("password", password)])
            .await
    }
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn login_url(message: &str) -> String {
    format!("/login?message={}", urlencoding::encode(message))
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let mut client = TestClient::new();
    let response = client.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    // Health checks do not open a browser context
    assert!(client.cookie.is_none());
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_first_visit_issues_context_cookie_and_redirects_to_login() {
    let mut client = TestClient::new();
    let response = client.get("/").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let cookie = client.cookie.clone().unwrap();
    assert!(cookie.starts_with(&format!("{}=", CONTEXT_COOKIE)));

    // The same cookie is kept on the next request
    client.get("/login").await;
    assert_eq!(client.cookie, Some(cookie));
}

#[tokio::test]
async fn test_teacher_logs_in_and_sees_dashboard() {
    let mut client = TestClient::new();
    let response = client
        .login("maria.santos@schooldesk.test", "teacher123")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/teacher/dashboard");

    let response = client.get("/teacher/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Maria Santos"));
    assert!(html.contains("Weekly schedule"));

    // Login page sends signed-in users on
    let response = client.get("/login").await;
    assert_eq!(location(&response), "/teacher/dashboard");
}

#[tokio::test]
async fn test_bad_credentials_stay_on_login_page() {
    let mut client = TestClient::new();
    let response = client
        .login("maria.santos@schooldesk.test", "wrong-password")
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let html = body_text(response).await;
    assert!(html.contains("Invalid email or password"));

    let response = client.get("/teacher/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login?message="));
}

#[tokio::test]
async fn test_wrong_role_is_signed_out() {
    let mut client = TestClient::new();
    client
        .login("miguel.reyes@schooldesk.test", "student123")
        .await;

    let response = client.get("/admin/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), login_url(PERMISSION_DENIED_MESSAGE));

    // The denied session is gone
    let response = client.get("/student/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_admin_must_change_initial_password() {
    let mut client = TestClient::new();
    let response = client.login("admin@schooldesk.test", "admin123").await;
    assert_eq!(location(&response), "/change-password");

    let response = client.get("/admin/dashboard").await;
    assert_eq!(location(&response), "/change-password");

    let response = client.get("/change-password").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("must choose a new password"));

    let response = client
        .post_form(
            "/change-password",
            &[
                ("current_password", "admin123"),
                ("new_password", "short"),
                ("confirm_password", "short"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post_form(
            "/change-password",
            &[
                ("current_password", "admin123"),
                ("new_password", "a-better-secret"),
                ("confirm_password", "a-better-secret"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/dashboard");

    let response = client.get("/admin/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("School overview"));
}

#[tokio::test]
async fn test_parent_session_expires_after_four_hours() {
    let mut client = TestClient::new();
    let response = client.login("ana.reyes@schooldesk.test", "parent123").await;
    assert_eq!(location(&response), "/parent/dashboard");

    client.clock.advance(Duration::hours(3) + Duration::minutes(59));
    let status = body_json(client.get("/session/status").await).await;
    assert_eq!(status["session"]["state"], "active");
    assert_eq!(status["session"]["remaining_minutes"], 1);
    assert!(status.get("redirect").is_none());

    client.clock.advance(Duration::minutes(2));
    let status = body_json(client.get("/session/status").await).await;
    assert_eq!(status["session"]["state"], "expired");
    assert_eq!(status["redirect"], login_url(EXPIRED_MESSAGE));

    let response = client.get("/parent/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_expired_session_redirects_with_reason() {
    let mut client = TestClient::new();
    client
        .login("miguel.reyes@schooldesk.test", "student123")
        .await;

    client.clock.advance(Duration::hours(8) + Duration::minutes(1));
    let response = client.get("/student/dashboard").await;
    assert_eq!(location(&response), login_url(EXPIRED_MESSAGE));
}

#[tokio::test]
async fn test_activity_extends_session_once_per_window() {
    let mut client = TestClient::new();
    client.login("ana.reyes@schooldesk.test", "parent123").await;
    client.clock.advance(Duration::hours(1));

    let response = client
        .post_json("/session/activity", serde_json::json!({ "signal": "mousemove" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "extended");
    assert_eq!(body["remaining_minutes"], 240);

    let body = body_json(
        client
            .post_json("/session/activity", serde_json::json!({ "signal": "keypress" }))
            .await,
    )
    .await;
    assert_eq!(body["outcome"], "coalesced");

    client.clock.advance(Duration::seconds(31));
    let body = body_json(
        client
            .post_json("/session/activity", serde_json::json!({ "signal": "scroll" }))
            .await,
    )
    .await;
    assert_eq!(body["outcome"], "extended");

    let response = client
        .post_json("/session/activity", serde_json::json!({ "signal": "blink" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_activity_without_session_does_nothing() {
    let mut client = TestClient::new();
    let body = body_json(
        client
            .post_json("/session/activity", serde_json::json!({ "signal": "mousedown" }))
            .await,
    )
    .await;
    assert_eq!(body["outcome"], "not_extended");
    assert_eq!(body["remaining_minutes"], 0);
}

#[tokio::test]
async fn test_attendance_report_is_staff_only() {
    let mut client = TestClient::new();
    client.login("guidance@schooldesk.test", "guidance123").await;

    let response = client
        .get("/reports/attendance?from=2024-10-01&to=2024-10-09&section=sec-7a")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Attendance report"));

    let response = client.get("/reports/attendance?from=2024-10-09&to=2024-10-01").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut student = TestClient::new();
    student
        .login("miguel.reyes@schooldesk.test", "student123")
        .await;
    let response = student.get("/reports/attendance").await;
    assert_eq!(location(&response), login_url(PERMISSION_DENIED_MESSAGE));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let mut client = TestClient::new();
    client.login("guidance@schooldesk.test", "guidance123").await;

    let signed_in = client.context_id().unwrap();

    let response = client.post_form("/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), login_url("You have been logged out."));
    assert_ne!(client.context_id().unwrap(), signed_in);

    let response = client.get("/guidance/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_unknown_pages_are_not_found() {
    let mut client = TestClient::new();
    assert_eq!(
        client.get("/janitor/dashboard").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(client.get("/nowhere").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_browsers_do_not_share_sessions() {
    let mut teacher = TestClient::new();
    teacher
        .login("maria.santos@schooldesk.test", "teacher123")
        .await;

    // A second browser against the same server has its own context
    let mut other = teacher.second_browser();
    let response = other.get("/teacher/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_ne!(other.cookie, teacher.cookie);
}

#[tokio::test]
async fn test_login_issues_fresh_context_id() {
    // A context id obtained by one browser and planted in another
    let mut planter = TestClient::new();
    planter.get("/login").await;
    let planted = planter.cookie.clone().unwrap();

    let mut victim = planter.second_browser();
    victim.cookie = Some(planted.clone());
    let response = victim
        .login("maria.santos@schooldesk.test", "teacher123")
        .await;
    assert_eq!(location(&response), "/teacher/dashboard");
    assert!(response.headers().contains_key(header::SET_COOKIE));
    assert_ne!(victim.cookie.as_deref(), Some(planted.as_str()));

    let response = victim.get("/teacher/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);

    // The planted id reaches no session
    let response = planter.get("/teacher/dashboard").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login?message="));
    assert_ne!(planter.cookie.as_deref(), Some(planted.as_str()));
}

#[tokio::test]
async fn test_unknown_context_id_is_replaced() {
    let planted = "11111111-2222-4333-8444-555555555555";
    let mut client = TestClient::new();
    client.cookie = Some(format!("{}={}", CONTEXT_COOKIE, planted));

    let response = client.get("/login").await;
    assert_eq!(response.status(), StatusCode::OK);
    let issued = client.context_id().unwrap();
    assert_ne!(issued, planted);
    assert!(client.state.contexts.get(planted).await.is_none());
}

#[tokio::test]
async fn test_swept_session_still_reports_expiry() {
    let mut client = TestClient::new();
    client.login("ana.reyes@schooldesk.test", "parent123").await;

    client.clock.advance(Duration::hours(4) + Duration::minutes(1));
    assert_eq!(client.state.sweep_expired().await, 1);

    let status = body_json(client.get("/session/status").await).await;
    assert_eq!(status["session"]["state"], "expired");
    assert_eq!(status["redirect"], login_url(EXPIRED_MESSAGE));

    // Reported once; afterwards the browser simply has no session
    let status = body_json(client.get("/session/status").await).await;
    assert_eq!(status["session"]["state"], "absent");

    let mut other = TestClient::new();
    other.login("ana.reyes@schooldesk.test", "parent123").await;
    other.clock.advance(Duration::hours(4) + Duration::minutes(1));
    other.state.sweep_expired().await;
    let response = other.get("/parent/dashboard").await;
    assert_eq!(location(&response), login_url(EXPIRED_MESSAGE));
}

#[tokio::test]
async fn test_unrecognized_role_opens_fallback_dashboard() {
    let mut client = TestClient::new();
    let account = Account::new(
        "stu-001",
        "pupil@schooldesk.test",
        ("Miguel", "Reyes"),
        Role::from("pupil"),
        "pupil-pass",
    )
    .unwrap();
    client.state.users.insert(account);

    let response = client.login("pupil@schooldesk.test", "pupil-pass").await;
    assert_eq!(location(&response), "/student/dashboard");

    let response = client.get("/student/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);

    // Other dashboards still refuse the role
    let response = client.get("/teacher/dashboard").await;
    assert_eq!(location(&response), login_url(PERMISSION_DENIED_MESSAGE));
}
