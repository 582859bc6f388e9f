//! HTTP request handlers for pages, session endpoints and health checks

use crate::{
    middleware::SessionScope,
    templates::{
        render, AdminDashboardTemplate, AttendanceReportTemplate, GuidanceDashboardTemplate,
        Layout, ParentDashboardTemplate, StudentDashboardTemplate, TeacherDashboardTemplate,
    },
    AppState, WebError, WebResult,
};
use axum::{
    extract::{Path, Query, State},
    http::Uri,
    response::{IntoResponse, Json, Redirect, Response},
};
use chrono::{Duration, NaiveDate};
use schooldesk_core::Role;
use schooldesk_records::{AttendanceReport, DashboardStats, ReportRequest};
use schooldesk_session::{
    revalidate, ActivityOutcome, ActivitySignal, RevalidationOutcome, EXPIRED_MESSAGE,
    LOGIN_REQUIRED_MESSAGE,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Days covered by an attendance report when no range is given
const DEFAULT_REPORT_DAYS: i64 = 7;

/// Entry point: the role dashboard when signed in, the login page otherwise
pub async fn home(scope: SessionScope) -> Response {
    let manager = &scope.manager;
    let target = if !manager.is_logged_in() {
        manager.policy().login_url(None)
    } else if manager.must_change_password() {
        manager.policy().change_password_path().to_string()
    } else {
        manager.dashboard_url()
    };
    Redirect::to(&target).into_response()
}

/// Role dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Path(role): Path<String>,
    scope: SessionScope,
) -> WebResult<Response> {
    let role = Role::from(role);
    if !role.is_known() {
        return Err(WebError::NotFound(format!("No dashboard for {}", role)));
    }

    let page_path = format!("/{}/dashboard", role.as_str());
    let allowed = dashboard_roles(&state, &scope, role.clone(), &page_path);
    let page = match scope.guard(&page_path, allowed) {
        Ok(page) => page,
        Err(redirect) => return Ok(redirect),
    };

    let today = state.clock.now().date_naive();
    let stats = state
        .dashboards
        .for_role(&page.role, &page.identity, today)
        .await?;
    let layout = Layout::signed_in(format!("{} dashboard", role.label()), &page, &state.policy);

    let html = match stats {
        DashboardStats::Admin(stats) => render(&AdminDashboardTemplate { layout, stats })?,
        DashboardStats::Teacher(stats) => render(&TeacherDashboardTemplate { layout, stats })?,
        DashboardStats::Student(stats) => render(&StudentDashboardTemplate { layout, stats })?,
        DashboardStats::Parent(stats) => render(&ParentDashboardTemplate { layout, stats })?,
        DashboardStats::Guidance(stats) => render(&GuidanceDashboardTemplate { layout, stats })?,
    };
    Ok(html.into_response())
}

/// Roles admitted to a dashboard: its own role, plus a stored role the role
/// table routes to the same page (an unrecognized role on the fallback page)
fn dashboard_roles(
    state: &AppState,
    scope: &SessionScope,
    role: Role,
    page_path: &str,
) -> Vec<Role> {
    let mut allowed = vec![role];
    if let Some(record) = scope.manager.get_session() {
        if !allowed.contains(&record.role)
            && state.policy.dashboard_path(&record.role) == page_path
        {
            allowed.push(record.role);
        }
    }
    allowed
}

/// Query string of the attendance report page
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub section: Option<String>,
}

impl ReportQuery {
    /// Resolve the query into a report request; the range defaults to the
    /// week ending `today`
    pub fn into_request(self, today: NaiveDate) -> WebResult<ReportRequest> {
        let to = parse_date(self.to.as_deref(), "to")?.unwrap_or(today);
        let from = parse_date(self.from.as_deref(), "from")?
            .unwrap_or(to - Duration::days(DEFAULT_REPORT_DAYS - 1));
        let section_id = self
            .section
            .map(|section| section.trim().to_string())
            .filter(|section| !section.is_empty());

        Ok(ReportRequest {
            from,
            to,
            section_id,
        })
    }
}

fn parse_date(value: Option<&str>, field: &str) -> WebResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| WebError::BadRequest(format!("Invalid {} date: {}", field, value))),
    }
}

/// Attendance report for staff
pub async fn attendance_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    scope: SessionScope,
) -> WebResult<Response> {
    let page = match scope.guard(
        "/reports/attendance",
        vec![Role::Admin, Role::Teacher, Role::Guidance],
    ) {
        Ok(page) => page,
        Err(redirect) => return Ok(redirect),
    };

    let request = query.into_request(state.clock.now().date_naive())?;
    let report = AttendanceReport::build(state.records.as_ref(), &request).await?;
    let sections = state.records.sections().await?;
    info!(
        "Attendance report {}..{} with {} rows for {}",
        report.from,
        report.to,
        report.rows.len(),
        page.identity
    );

    let template = AttendanceReportTemplate {
        layout: Layout::signed_in("Attendance report", &page, &state.policy),
        selected_section: request.section_id.clone().unwrap_or_default(),
        report,
        sections,
    };
    Ok(render(&template)?.into_response())
}

/// Body of `GET /session/status`
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session: RevalidationOutcome,
    /// Where the page should go when the session is gone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Revalidate the session of the calling browser context.
///
/// A session the background sweep already ended is reported as expired once.
pub async fn session_status(scope: SessionScope) -> Json<SessionStatusResponse> {
    let session = match revalidate(&scope.manager) {
        RevalidationOutcome::Absent if scope.take_sweep_expiry() => RevalidationOutcome::Expired,
        outcome => outcome,
    };
    let policy = scope.manager.policy();
    let redirect = match session {
        RevalidationOutcome::Active { .. } => None,
        RevalidationOutcome::Expired => Some(policy.login_url(Some(EXPIRED_MESSAGE))),
        RevalidationOutcome::Absent => Some(policy.login_url(Some(LOGIN_REQUIRED_MESSAGE))),
    };

    Json(SessionStatusResponse { session, redirect })
}

/// Body of `POST /session/activity`
#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub signal: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub outcome: ActivityOutcome,
    pub remaining_minutes: i64,
}

/// Report user interaction from the page
pub async fn record_activity(
    scope: SessionScope,
    Json(request): Json<ActivityRequest>,
) -> WebResult<Json<ActivityResponse>> {
    let signal: ActivitySignal = request.signal.parse()?;
    let outcome = scope.context.monitor().record(signal, &scope.manager);
    debug!(
        "Activity {} in context {}: {:?}",
        signal.event_name(),
        scope.context.id(),
        outcome
    );

    Ok(Json(ActivityResponse {
        outcome,
        remaining_minutes: scope.manager.remaining_session_minutes(),
    }))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    /// Browser contexts currently tracked
    pub browser_contexts: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: state.clock.now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        browser_contexts: state.contexts.len().await,
    })
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> WebError {
    WebError::NotFound(uri.path().to_string())
}
