//! Session policy: role durations, dashboards and redirect targets

use chrono::Duration;
use schooldesk_core::{Role, RoleTable, SessionSettings, MAX_ACTIVITY_DEBOUNCE_SECS};

/// Role-dependent session policy and the redirect targets it implies
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    roles: RoleTable,
    login_path: String,
    change_password_path: String,
    activity_debounce: Duration,
    revalidation_interval: std::time::Duration,
}

impl SessionPolicy {
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self {
            roles: settings.roles.clone(),
            login_path: settings.login_path.clone(),
            change_password_path: settings.change_password_path.clone(),
            activity_debounce: Duration::seconds(
                settings.activity_debounce_secs.min(MAX_ACTIVITY_DEBOUNCE_SECS) as i64,
            ),
            revalidation_interval: std::time::Duration::from_secs(
                settings.revalidation_interval_secs,
            ),
        }
    }

    /// Replace the role table
    pub fn with_roles(mut self, roles: RoleTable) -> Self {
        self.roles = roles;
        self
    }

    /// Replace the activity coalescing window
    pub fn with_activity_debounce(mut self, window: Duration) -> Self {
        self.activity_debounce = window;
        self
    }

    /// Session lifetime for a role
    pub fn duration_for(&self, role: &Role) -> Duration {
        Duration::minutes(self.roles.settings_for(role).session_minutes as i64)
    }

    /// Dashboard path for a role
    pub fn dashboard_path(&self, role: &Role) -> &str {
        &self.roles.settings_for(role).dashboard_path
    }

    /// Dashboard used when no role is known
    pub fn fallback_dashboard_path(&self) -> &str {
        &self.roles.fallback.dashboard_path
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn change_password_path(&self) -> &str {
        &self.change_password_path
    }

    /// Login entry point, optionally carrying a display message
    pub fn login_url(&self, message: Option<&str>) -> String {
        match message {
            Some(message) if !message.is_empty() => format!(
                "{}?message={}",
                self.login_path,
                urlencoding::encode(message)
            ),
            _ => self.login_path.clone(),
        }
    }

    pub fn activity_debounce(&self) -> Duration {
        self.activity_debounce
    }

    pub fn revalidation_interval(&self) -> std::time::Duration {
        self.revalidation_interval
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from_settings(&SessionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schooldesk_core::RoleSettings;

    #[test]
    fn test_default_durations() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.duration_for(&Role::Admin), Duration::hours(24));
        assert_eq!(policy.duration_for(&Role::Teacher), Duration::hours(24));
        assert_eq!(policy.duration_for(&Role::Guidance), Duration::hours(24));
        assert_eq!(policy.duration_for(&Role::Student), Duration::hours(8));
        assert_eq!(policy.duration_for(&Role::Parent), Duration::hours(4));
        assert_eq!(
            policy.duration_for(&Role::from("visitor")),
            Duration::hours(8)
        );
    }

    #[test]
    fn test_dashboard_paths() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.dashboard_path(&Role::Admin), "/admin/dashboard");
        assert_eq!(policy.dashboard_path(&Role::Teacher), "/teacher/dashboard");
        assert_eq!(policy.dashboard_path(&Role::Student), "/student/dashboard");
        assert_eq!(policy.dashboard_path(&Role::Guidance), "/guidance/dashboard");
        assert_eq!(policy.dashboard_path(&Role::Parent), "/parent/dashboard");
        assert_eq!(
            policy.dashboard_path(&Role::from("visitor")),
            "/student/dashboard"
        );
    }

    #[test]
    fn test_huge_debounce_is_clamped() {
        let settings = SessionSettings {
            activity_debounce_secs: u64::MAX,
            ..SessionSettings::default()
        };
        let policy = SessionPolicy::from_settings(&settings);
        assert_eq!(policy.activity_debounce(), Duration::days(1));
    }

    #[test]
    fn test_login_url_encodes_message() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.login_url(None), "/login");
        assert_eq!(
            policy.login_url(Some("Session expired & gone")),
            "/login?message=Session%20expired%20%26%20gone"
        );
    }

    #[test]
    fn test_configured_role_table() {
        let mut roles = RoleTable::default();
        roles
            .roles
            .insert("librarian".to_string(), RoleSettings::new(90, "/library"));
        let policy = SessionPolicy::default().with_roles(roles);

        let librarian = Role::from("librarian");
        assert_eq!(policy.duration_for(&librarian), Duration::minutes(90));
        assert_eq!(policy.dashboard_path(&librarian), "/library");
    }
}
