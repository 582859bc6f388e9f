//! SchoolDesk Session - client session lifecycle
//!
//! One session record per browser context, with role-based expiry, lazy
//! expiry detection, activity-driven extension and per-page route guarding.
//!
//! ## Architecture
//!
//! - **Store** ([`SessionStore`]): persists exactly one serialized record
//! - **Lifecycle manager** ([`SessionLifecycleManager`]): validity rules and
//!   role policy on top of the store
//! - **Route guard** ([`RouteGuard`]): per-page entry check
//! - **Activity monitor** ([`ActivityMonitor`]): coalesced session extension
//!
//! Every component re-reads the store; none keeps its own copy of the record.

pub mod activity;
pub mod clock;
pub mod guard;
pub mod manager;
pub mod navigator;
pub mod policy;
pub mod record;
pub mod revalidation;
pub mod store;

pub use activity::{ActivityMonitor, ActivityOutcome, ActivitySignal};
pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{PageContext, RouteGuard};
pub use manager::{
    SessionLifecycleManager, EXPIRED_MESSAGE, LOGIN_REQUIRED_MESSAGE, PERMISSION_DENIED_MESSAGE,
};
pub use navigator::{Navigator, NoopNavigator, RecordingNavigator};
pub use policy::SessionPolicy;
pub use record::{LoginIdentity, SessionRecord};
pub use revalidation::{revalidate, RevalidationOutcome, SessionEvent};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, SESSION_STORAGE_KEY};

/// Session store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, {quota} bytes available")]
    QuotaExceeded { needed: usize, quota: usize },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for schooldesk_core::SchoolDeskError {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::Io(_) => "io",
            StoreError::Serialization(_) => "serialization",
            StoreError::QuotaExceeded { .. } => "quota",
        };
        schooldesk_core::SchoolDeskError::Storage {
            message: err.to_string(),
            context: schooldesk_core::ErrorContext::new("session_store")
                .with_metadata("kind", kind),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schooldesk_core::SchoolDeskError;

    #[test]
    fn test_store_error_becomes_storage_error() {
        let error = SchoolDeskError::from(StoreError::QuotaExceeded {
            needed: 2048,
            quota: 1024,
        });

        assert!(matches!(error, SchoolDeskError::Storage { .. }));
        assert!(error.to_string().contains("2048 bytes needed"));
        assert_eq!(error.context().component, "session_store");
        assert_eq!(
            error.context().metadata.get("kind").map(String::as_str),
            Some("quota")
        );
        error.log();
    }
}
