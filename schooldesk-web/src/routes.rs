//! Route definitions for the SchoolDesk web server

use crate::{auth, handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Entry point, sign-in flow and role dashboards
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/login",
            get(auth::handlers::login_page).post(auth::handlers::login),
        )
        .route("/logout", post(auth::handlers::logout))
        .route(
            "/change-password",
            get(auth::handlers::change_password_page).post(auth::handlers::change_password),
        )
        .route("/{role}/dashboard", get(handlers::dashboard))
}

/// Endpoints called by the page script
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/session/status", get(handlers::session_status))
        .route("/session/activity", post(handlers::record_activity))
}

/// Staff reports
pub fn report_routes() -> Router<AppState> {
    Router::new().route("/reports/attendance", get(handlers::attendance_report))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health_check))
}
