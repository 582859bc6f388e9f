//! Route Guard - per-page entry check

use crate::{SessionLifecycleManager, SessionRecord};
use schooldesk_core::Role;
use serde::Serialize;

/// Signed-in user context handed to a page that passed its guard
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub identity: String,
    pub display_name: String,
    pub role: Role,
    pub remaining_minutes: i64,
    #[serde(skip)]
    pub record: SessionRecord,
}

/// Entry check for one protected page
#[derive(Debug, Clone)]
pub struct RouteGuard {
    page: String,
    allowed: Vec<Role>,
}

impl RouteGuard {
    /// Guard for `page`; an empty `allowed` list admits every role
    pub fn new<S: Into<String>>(page: S, allowed: Vec<Role>) -> Self {
        Self {
            page: page.into(),
            allowed,
        }
    }

    /// Guard admitting any signed-in role
    pub fn any_role<S: Into<String>>(page: S) -> Self {
        Self::new(page, Vec::new())
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    /// Run the guard.
    ///
    /// `None` means a redirect has been issued through the manager's
    /// navigator and the page must stop initializing.
    pub fn check(&self, manager: &SessionLifecycleManager) -> Option<PageContext> {
        if !manager.protect_page(&self.allowed, &self.page) {
            return None;
        }

        let record = manager.get_session()?;
        Some(PageContext {
            identity: record.identity.clone(),
            display_name: record.display_name(),
            role: record.role.clone(),
            remaining_minutes: manager.remaining_session_minutes(),
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoginIdentity, ManualClock, MemorySessionStore, RecordingNavigator, SessionPolicy};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn manager() -> (SessionLifecycleManager, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::new());
        let manager = SessionLifecycleManager::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(SessionPolicy::default()),
            Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap())),
            navigator.clone(),
        );
        (manager, navigator)
    }

    #[test]
    fn test_guard_yields_page_context() {
        let (manager, navigator) = manager();
        manager.create_session(
            LoginIdentity::new("tch-002", Role::Teacher).with_name("Jose", "Cruz"),
        );

        let guard = RouteGuard::new("/teacher/dashboard", vec![Role::Teacher, Role::Admin]);
        let context = guard.check(&manager).unwrap();

        assert_eq!(context.display_name, "Jose Cruz");
        assert_eq!(context.role, Role::Teacher);
        assert_eq!(context.remaining_minutes, 24 * 60);
        assert!(navigator.targets().is_empty());
    }

    #[test]
    fn test_guard_aborts_on_wrong_role() {
        let (manager, navigator) = manager();
        manager.create_session(LoginIdentity::new("stu-010", Role::Student));

        let guard = RouteGuard::new("/admin/dashboard", vec![Role::Admin]);
        assert!(guard.check(&manager).is_none());
        assert!(navigator.last().unwrap().starts_with("/login?message="));
        assert!(!manager.is_logged_in());
    }
}
