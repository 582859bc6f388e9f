//! Application state shared by every handler

use crate::{auth::UserDirectory, ContextRegistry, WebConfig, WebResult};
use schooldesk_core::SchoolDeskConfig;
use schooldesk_records::{demo_records, DashboardBuilder, MemoryRecordSource, RecordSource};
use schooldesk_session::{Clock, SessionEvent, SessionPolicy, SystemClock};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: WebConfig,
    pub policy: Arc<SessionPolicy>,
    pub clock: Arc<dyn Clock>,
    /// Live browser contexts and their session stores
    pub contexts: Arc<ContextRegistry>,
    pub users: UserDirectory,
    pub records: Arc<dyn RecordSource>,
    pub dashboards: DashboardBuilder,
    /// Expiry events published by the revalidation sweep
    pub session_events: broadcast::Sender<SessionEvent>,
}

impl AppState {
    /// Create state running on the system clock
    pub fn new(config: &SchoolDeskConfig) -> WebResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create state with an explicit clock
    pub fn with_clock(config: &SchoolDeskConfig, clock: Arc<dyn Clock>) -> WebResult<Self> {
        config.validate()?;

        let policy = Arc::new(SessionPolicy::from_settings(&config.session));
        let contexts = Arc::new(ContextRegistry::new(
            config.session.storage.clone(),
            policy.clone(),
            clock.clone(),
        ));

        let (source, users) = if config.seed_demo_data {
            let today = clock.now().date_naive();
            info!("Seeding demo school records for {}", today);
            (
                MemoryRecordSource::from_records(demo_records(today)),
                UserDirectory::with_demo_accounts(),
            )
        } else {
            (MemoryRecordSource::new(), UserDirectory::new())
        };
        let records: Arc<dyn RecordSource> = Arc::new(source);
        info!("Credential directory holds {} accounts", users.len());

        let (session_events, _) = broadcast::channel(256);

        Ok(Self {
            config: WebConfig::from(config),
            dashboards: DashboardBuilder::new(records.clone()),
            policy,
            clock,
            contexts,
            users,
            records,
            session_events,
        })
    }

    /// Run one revalidation pass and publish the resulting expiry events.
    ///
    /// Returns the number of sessions that expired in this pass.
    pub async fn sweep_expired(&self) -> usize {
        let events = self.contexts.sweep().await;
        let expired = events.len();
        for event in events {
            // No subscribers is fine
            let _ = self.session_events.send(event);
        }
        if expired > 0 {
            info!("Revalidation ended {} sessions", expired);
        } else {
            debug!("Revalidation pass found no expired sessions");
        }
        expired
    }

    /// Subscribe to session expiry events
    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use schooldesk_core::Role;
    use schooldesk_session::{LoginIdentity, ManualClock, NoopNavigator, SessionLifecycleManager};

    #[tokio::test]
    async fn test_sweep_publishes_expiry_events() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 10, 7, 7, 30, 0).unwrap(),
        ));
        let state = AppState::with_clock(&SchoolDeskConfig::default(), clock.clone()).unwrap();
        let mut events = state.subscribe_session_events();

        let (context, _) = state.contexts.resolve(None).await.unwrap();
        let manager = SessionLifecycleManager::new(
            context.store(),
            state.policy.clone(),
            state.clock.clone(),
            Arc::new(NoopNavigator),
        );
        assert!(manager.create_session(LoginIdentity::new("stu-001", Role::Student)));

        assert_eq!(state.sweep_expired().await, 0);
        clock.advance(Duration::hours(8) + Duration::seconds(1));
        assert_eq!(state.sweep_expired().await, 1);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::expired(context.id())
        );
    }

    #[test]
    fn test_demo_seed_is_optional() {
        let config = SchoolDeskConfig {
            seed_demo_data: false,
            ..SchoolDeskConfig::default()
        };
        let state = AppState::new(&config).unwrap();
        assert_eq!(state.users.len(), 1);
    }
}
