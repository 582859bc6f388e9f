//! Server-rendered pages
//!
//! Every page extends `base.html`, which carries the header bar and the
//! script that reports activity and polls the session status.

use crate::WebResult;
use askama::Template;
use axum::response::Html;
use schooldesk_records::{
    AdminStats, AttendanceReport, GuidanceStats, ParentStats, Section, StudentStats, TeacherStats,
};
use schooldesk_session::{PageContext, SessionPolicy};

/// Header bar of a signed-in page
#[derive(Debug, Clone)]
pub struct UserBar {
    pub display_name: String,
    pub role_label: String,
    pub remaining_minutes: i64,
}

/// Data shared by every page layout
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: String,
    pub user: Option<UserBar>,
    pub dashboard_url: String,
    /// Minimum seconds between two activity reports
    pub activity_debounce_secs: i64,
    /// Seconds between two session status polls
    pub status_poll_secs: u64,
}

impl Layout {
    /// Layout of a page without a signed-in user
    pub fn anonymous<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            user: None,
            dashboard_url: "/".to_string(),
            activity_debounce_secs: 0,
            status_poll_secs: 0,
        }
    }

    /// Layout of a page that passed its route guard
    pub fn signed_in<S: Into<String>>(title: S, page: &PageContext, policy: &SessionPolicy) -> Self {
        Self {
            title: title.into(),
            user: Some(UserBar {
                display_name: page.display_name.clone(),
                role_label: page.role.label().to_string(),
                remaining_minutes: page.remaining_minutes,
            }),
            dashboard_url: policy.dashboard_path(&page.role).to_string(),
            activity_debounce_secs: policy.activity_debounce().num_seconds(),
            status_poll_secs: policy.revalidation_interval().as_secs().max(1),
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    /// Reason carried over from a redirect
    pub message: Option<String>,
    pub error: Option<String>,
    pub email: String,
}

#[derive(Template)]
#[template(path = "change_password.html")]
pub struct ChangePasswordTemplate {
    pub layout: Layout,
    /// Set when the account may not go anywhere else until it changes
    pub forced: bool,
    pub error: Option<String>,
    pub min_length: usize,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
pub struct AdminDashboardTemplate {
    pub layout: Layout,
    pub stats: AdminStats,
}

#[derive(Template)]
#[template(path = "teacher_dashboard.html")]
pub struct TeacherDashboardTemplate {
    pub layout: Layout,
    pub stats: TeacherStats,
}

#[derive(Template)]
#[template(path = "student_dashboard.html")]
pub struct StudentDashboardTemplate {
    pub layout: Layout,
    pub stats: StudentStats,
}

#[derive(Template)]
#[template(path = "parent_dashboard.html")]
pub struct ParentDashboardTemplate {
    pub layout: Layout,
    pub stats: ParentStats,
}

#[derive(Template)]
#[template(path = "guidance_dashboard.html")]
pub struct GuidanceDashboardTemplate {
    pub layout: Layout,
    pub stats: GuidanceStats,
}

#[derive(Template)]
#[template(path = "attendance_report.html")]
pub struct AttendanceReportTemplate {
    pub layout: Layout,
    pub report: AttendanceReport,
    pub sections: Vec<Section>,
    pub selected_section: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub layout: Layout,
    pub error_code: u16,
    pub error_message: String,
}

impl ErrorTemplate {
    pub fn new(error_code: u16, error_message: String) -> Self {
        Self {
            layout: Layout::anonymous(format!("Error {}", error_code)),
            error_code,
            error_message,
        }
    }
}

/// Render a template into an HTML response body
pub fn render<T: Template>(template: &T) -> WebResult<Html<String>> {
    Ok(Html(template.render()?))
}
