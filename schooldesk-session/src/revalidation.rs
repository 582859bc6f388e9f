//! Periodic revalidation step
//!
//! Lazy expiry only notices a stale session on the next access. The host runs
//! [`revalidate`] on a fixed interval to bound that staleness.

use crate::manager::{Validity, EXPIRED_MESSAGE};
use crate::SessionLifecycleManager;
use serde::Serialize;

/// Result of one revalidation pass over a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RevalidationOutcome {
    Active { remaining_minutes: i64 },
    /// The stored session had run out and was cleared in this pass
    Expired,
    Absent,
}

/// Event published when revalidation ends a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Expired { context_id: String, message: String },
}

impl SessionEvent {
    pub fn expired<S: Into<String>>(context_id: S) -> Self {
        SessionEvent::Expired {
            context_id: context_id.into(),
            message: EXPIRED_MESSAGE.to_string(),
        }
    }
}

/// Re-run the authentication check for one context
pub fn revalidate(manager: &SessionLifecycleManager) -> RevalidationOutcome {
    match manager.validity() {
        Validity::Valid(_) => RevalidationOutcome::Active {
            remaining_minutes: manager.remaining_session_minutes(),
        },
        Validity::Expired => RevalidationOutcome::Expired,
        Validity::Absent => RevalidationOutcome::Absent,
    }
}
