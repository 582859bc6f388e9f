//! Session Lifecycle Manager - validity rules and role policy over the store
//!
//! Nothing here returns an error to callers: storage and parsing failures
//! become `false`/`None` plus a log event, so a corrupted session always
//! behaves as "not logged in".
//!
//! Two access tiers exist. [`SessionLifecycleManager::is_logged_in`] checks
//! expiry and clears a stale record on the spot, while
//! [`SessionLifecycleManager::get_session`] is a fast display accessor that
//! returns whatever is stored, expired or not.

use crate::{Clock, LoginIdentity, Navigator, SessionPolicy, SessionRecord, SessionStore};
use chrono::SubsecRound;
use schooldesk_core::Role;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reason shown when a stored session ran out
pub const EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
/// Reason shown when no session was ever stored
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to continue.";
/// Reason shown when the role may not open the page
pub const PERMISSION_DENIED_MESSAGE: &str = "You do not have permission to access that page.";

/// Result of checking the stored record against the clock
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Validity {
    Valid(SessionRecord),
    /// A record existed but was expired or logged out; it has been cleared
    Expired,
    Absent,
}

/// Creates, validates, extends and destroys the session of one browser context
#[derive(Clone)]
pub struct SessionLifecycleManager {
    store: Arc<dyn SessionStore>,
    policy: Arc<SessionPolicy>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
}

impl SessionLifecycleManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        policy: Arc<SessionPolicy>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            policy,
            clock,
            navigator,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Start a session for a resolved login identity.
    ///
    /// Returns `false` only when the store rejects the write.
    pub fn create_session(&self, login: LoginIdentity) -> bool {
        let now = self.clock.now().trunc_subsecs(3);
        let duration = self.policy.duration_for(&login.role);

        let record = SessionRecord {
            identity: login.identity,
            role: login.role,
            first_name: login.first_name,
            last_name: login.last_name,
            email: login.email,
            created_at: now,
            expires_at: now + duration,
            must_change_password: login.must_change_password,
            logged_in: true,
            claims: login.claims,
        };

        match self.store.write(&record) {
            Ok(()) => {
                info!(
                    "Created {} session for {} (expires {})",
                    record.role, record.identity, record.expires_at
                );
                true
            }
            Err(e) => {
                warn!("Failed to create session for {}: {}", record.identity, e);
                false
            }
        }
    }

    /// Whether a valid session exists; clears an expired one.
    pub fn is_logged_in(&self) -> bool {
        matches!(self.validity(), Validity::Valid(_))
    }

    /// Stored record without any expiry check
    pub fn get_session(&self) -> Option<SessionRecord> {
        self.store.read()
    }

    /// Push `expires_at` forward by the role duration, keeping `created_at`.
    ///
    /// Returns whether the record was rewritten.
    pub fn extend_session(&self) -> bool {
        let Validity::Valid(mut record) = self.validity() else {
            return false;
        };

        let now = self.clock.now().trunc_subsecs(3);
        record.expires_at = now + self.policy.duration_for(&record.role);

        match self.store.write(&record) {
            Ok(()) => {
                debug!(
                    "Extended session for {} until {}",
                    record.identity, record.expires_at
                );
                true
            }
            Err(e) => {
                warn!("Failed to extend session for {}: {}", record.identity, e);
                false
            }
        }
    }

    /// Empty the store; with a reason, navigate to login carrying it.
    pub fn clear_session(&self, reason: Option<&str>) {
        self.store.clear();
        info!("Cleared session");

        if let Some(reason) = reason {
            self.navigator.navigate(&self.policy.login_url(Some(reason)));
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.get_session()
            .map(|record| &record.role == role)
            .unwrap_or(false)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.get_session()
            .map(|record| roles.contains(&record.role))
            .unwrap_or(false)
    }

    pub fn must_change_password(&self) -> bool {
        self.get_session()
            .map(|record| record.must_change_password)
            .unwrap_or(false)
    }

    /// Whole minutes left before expiry, 0 without a valid session
    pub fn remaining_session_minutes(&self) -> i64 {
        match self.validity() {
            Validity::Valid(record) => (record.expires_at - self.clock.now()).num_minutes().max(0),
            _ => 0,
        }
    }

    /// Composite page guard. Fails closed.
    ///
    /// In order: no valid session redirects to login; a pending password
    /// change redirects to the change page unless `current_page` is that
    /// page; a role outside a non-empty `allowed` list clears the session
    /// and redirects to login with a permission-denied reason.
    pub fn protect_page(&self, allowed: &[Role], current_page: &str) -> bool {
        let record = match self.validity() {
            Validity::Valid(record) => record,
            Validity::Expired => {
                self.navigator
                    .navigate(&self.policy.login_url(Some(EXPIRED_MESSAGE)));
                return false;
            }
            Validity::Absent => {
                self.navigator
                    .navigate(&self.policy.login_url(Some(LOGIN_REQUIRED_MESSAGE)));
                return false;
            }
        };

        let change_page = self.policy.change_password_path();
        if record.must_change_password && page_path(current_page) != change_page {
            debug!("Password change pending for {}", record.identity);
            self.navigator.navigate(change_page);
            return false;
        }

        if !allowed.is_empty() && !allowed.contains(&record.role) {
            warn!(
                "Role {} denied access to {} for {}",
                record.role, current_page, record.identity
            );
            self.clear_session(Some(PERMISSION_DENIED_MESSAGE));
            return false;
        }

        true
    }

    /// Dashboard of the current role, or the fallback dashboard
    pub fn dashboard_url(&self) -> String {
        match self.get_session() {
            Some(record) => self.policy.dashboard_path(&record.role).to_string(),
            None => self.policy.fallback_dashboard_path().to_string(),
        }
    }

    /// Drop the pending password-change flag after a successful change
    pub fn mark_password_changed(&self) -> bool {
        let Validity::Valid(mut record) = self.validity() else {
            return false;
        };
        record.must_change_password = false;

        match self.store.write(&record) {
            Ok(()) => {
                info!("Password change recorded for {}", record.identity);
                true
            }
            Err(e) => {
                warn!("Failed to update session for {}: {}", record.identity, e);
                false
            }
        }
    }

    pub(crate) fn validity(&self) -> Validity {
        let Some(record) = self.store.read() else {
            return Validity::Absent;
        };

        if record.is_valid_at(self.clock.now()) {
            Validity::Valid(record)
        } else {
            info!("Session for {} expired at {}", record.identity, record.expires_at);
            self.store.clear();
            Validity::Expired
        }
    }
}

impl std::fmt::Debug for SessionLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycleManager")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn page_path(page: &str) -> &str {
    page.split(['?', '#']).next().unwrap_or(page)
}
