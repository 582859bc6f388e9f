//! Activity Monitor - extends the session on user interaction
//!
//! Extensions are coalesced: at most one per window, however many signals
//! arrive. A zero window extends on every signal.

use crate::{SessionLifecycleManager, SessionPolicy};
use chrono::{DateTime, Duration, Utc};
use schooldesk_core::{validation_error, SchoolDeskError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Kinds of user interaction that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivitySignal {
    MouseDown,
    MouseMove,
    KeyPress,
    Scroll,
    TouchStart,
}

impl ActivitySignal {
    pub const ALL: [ActivitySignal; 5] = [
        ActivitySignal::MouseDown,
        ActivitySignal::MouseMove,
        ActivitySignal::KeyPress,
        ActivitySignal::Scroll,
        ActivitySignal::TouchStart,
    ];

    /// DOM event name of the signal
    pub fn event_name(&self) -> &'static str {
        match self {
            ActivitySignal::MouseDown => "mousedown",
            ActivitySignal::MouseMove => "mousemove",
            ActivitySignal::KeyPress => "keypress",
            ActivitySignal::Scroll => "scroll",
            ActivitySignal::TouchStart => "touchstart",
        }
    }
}

impl FromStr for ActivitySignal {
    type Err = SchoolDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mousedown" | "pointerdown" => Ok(ActivitySignal::MouseDown),
            "mousemove" | "pointermove" => Ok(ActivitySignal::MouseMove),
            "keypress" | "keydown" => Ok(ActivitySignal::KeyPress),
            "scroll" => Ok(ActivitySignal::Scroll),
            "touchstart" => Ok(ActivitySignal::TouchStart),
            other => Err(validation_error!(
                format!("Unknown activity signal: {}", other),
                "signal",
                "activity"
            )),
        }
    }
}

/// What a recorded signal did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityOutcome {
    /// The session expiry was pushed forward
    Extended,
    /// Dropped because an extension happened within the window
    Coalesced,
    /// No valid session to extend, or the store refused the write
    NotExtended,
}

/// Coalescing activity tracker for one browser context
#[derive(Debug)]
pub struct ActivityMonitor {
    window: Duration,
    last_extension: Mutex<Option<DateTime<Utc>>>,
}

impl ActivityMonitor {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_extension: Mutex::new(None),
        }
    }

    pub fn from_policy(policy: &SessionPolicy) -> Self {
        Self::new(policy.activity_debounce())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Handle one interaction signal
    pub fn record(
        &self,
        signal: ActivitySignal,
        manager: &SessionLifecycleManager,
    ) -> ActivityOutcome {
        let now = manager.clock().now();
        let mut last = self
            .last_extension
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = *last {
            if now - previous < self.window {
                return ActivityOutcome::Coalesced;
            }
        }

        if manager.extend_session() {
            debug!("Session extended on {}", signal.event_name());
            *last = Some(now);
            ActivityOutcome::Extended
        } else {
            ActivityOutcome::NotExtended
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoginIdentity, ManualClock, MemorySessionStore, NoopNavigator};
    use chrono::TimeZone;
    use schooldesk_core::Role;
    use std::sync::Arc;

    fn setup() -> (SessionLifecycleManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 2, 5, 9, 0, 0).unwrap(),
        ));
        let manager = SessionLifecycleManager::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(SessionPolicy::default()),
            clock.clone(),
            Arc::new(NoopNavigator),
        );
        (manager, clock)
    }

    #[test]
    fn test_signals_within_window_are_coalesced() {
        let (manager, clock) = setup();
        manager.create_session(LoginIdentity::new("stu-001", Role::Student));
        let monitor = ActivityMonitor::new(Duration::seconds(30));

        assert_eq!(
            monitor.record(ActivitySignal::KeyPress, &manager),
            ActivityOutcome::Extended
        );
        clock.advance(Duration::seconds(10));
        assert_eq!(
            monitor.record(ActivitySignal::MouseMove, &manager),
            ActivityOutcome::Coalesced
        );
        clock.advance(Duration::seconds(20));
        assert_eq!(
            monitor.record(ActivitySignal::Scroll, &manager),
            ActivityOutcome::Extended
        );
    }

    #[test]
    fn test_extension_moves_expiry_forward() {
        let (manager, clock) = setup();
        manager.create_session(LoginIdentity::new("stu-001", Role::Student));
        let created = manager.get_session().unwrap();
        let monitor = ActivityMonitor::new(Duration::zero());

        clock.advance(Duration::hours(7));
        monitor.record(ActivitySignal::TouchStart, &manager);
        clock.advance(Duration::hours(7));

        assert!(manager.is_logged_in());
        let extended = manager.get_session().unwrap();
        assert_eq!(extended.created_at, created.created_at);
        assert_eq!(extended.expires_at, created.created_at + Duration::hours(15));
    }

    #[test]
    fn test_no_session_is_not_extended() {
        let (manager, _) = setup();
        let monitor = ActivityMonitor::new(Duration::seconds(30));

        assert_eq!(
            monitor.record(ActivitySignal::MouseDown, &manager),
            ActivityOutcome::NotExtended
        );
        assert!(manager.get_session().is_none());
    }

    #[test]
    fn test_signal_parsing() {
        assert_eq!("keydown".parse::<ActivitySignal>().unwrap(), ActivitySignal::KeyPress);
        assert_eq!(" Scroll ".parse::<ActivitySignal>().unwrap(), ActivitySignal::Scroll);
        assert!("resize".parse::<ActivitySignal>().is_err());
    }
}
