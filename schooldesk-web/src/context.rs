//! Browser contexts
//!
//! A browser context is the server-side stand-in for one browser tab set:
//! it owns the session store of that browser and its activity monitor. The
//! registry hands them out by cookie id and drops the ones that have gone
//! empty and idle.

use crate::WebResult;
use chrono::{DateTime, Duration, Utc};
use schooldesk_core::{SchoolDeskError, StorageBackend};
use schooldesk_session::{
    revalidate, ActivityMonitor, Clock, FileSessionStore, MemorySessionStore, NoopNavigator,
    RevalidationOutcome, SessionEvent, SessionLifecycleManager, SessionPolicy, SessionStore,
    SESSION_STORAGE_KEY,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Cookie carrying the browser context id
pub const CONTEXT_COOKIE: &str = "schooldesk_ctx";

/// Session store and activity state of one browser
pub struct BrowserContext {
    id: String,
    store: Arc<dyn SessionStore>,
    monitor: ActivityMonitor,
    last_seen: Mutex<DateTime<Utc>>,
    /// Set when the sweep ended the session, until a page reports it
    expiry_notice: AtomicBool,
}

impl BrowserContext {
    pub fn new(id: String, store: Arc<dyn SessionStore>, monitor: ActivityMonitor, now: DateTime<Utc>) -> Self {
        Self {
            id,
            store,
            monitor,
            last_seen: Mutex::new(now),
            expiry_notice: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    pub fn monitor(&self) -> &ActivityMonitor {
        &self.monitor
    }

    /// Whether the sweep ended the session of this context since the last
    /// call. Clears the notice.
    pub fn take_expiry_notice(&self) -> bool {
        self.expiry_notice.swap(false, Ordering::AcqRel)
    }

    fn note_expiry(&self) {
        self.expiry_notice.store(true, Ordering::Release);
    }

    fn has_expiry_notice(&self) -> bool {
        self.expiry_notice.load(Ordering::Acquire)
    }

    fn touch(&self, now: DateTime<Utc>) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    fn idle_since(&self) -> DateTime<Utc> {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for BrowserContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserContext")
            .field("id", &self.id)
            .field("last_seen", &self.idle_since())
            .finish_non_exhaustive()
    }
}

/// Registry of live browser contexts
pub struct ContextRegistry {
    contexts: RwLock<HashMap<String, Arc<BrowserContext>>>,
    backend: StorageBackend,
    file_root: Option<PathBuf>,
    policy: Arc<SessionPolicy>,
    clock: Arc<dyn Clock>,
}

impl ContextRegistry {
    pub fn new(backend: StorageBackend, policy: Arc<SessionPolicy>, clock: Arc<dyn Clock>) -> Self {
        let file_root = backend.resolved_dir();
        Self {
            contexts: RwLock::new(HashMap::new()),
            backend,
            file_root,
            policy,
            clock,
        }
    }

    /// Context for a cookie value. The flag tells whether a new id was issued.
    ///
    /// A missing or malformed value gets a fresh id. A well-formed but unknown
    /// value is only adopted when the file backend still holds a session
    /// record under it; anything else gets a fresh id too.
    pub async fn resolve(&self, cookie: Option<&str>) -> WebResult<(Arc<BrowserContext>, bool)> {
        let now = self.clock.now();
        let requested = cookie
            .and_then(|value| Uuid::parse_str(value).ok())
            .map(|id| id.to_string());

        if let Some(id) = &requested {
            if let Some(context) = self.contexts.read().await.get(id) {
                context.touch(now);
                return Ok((context.clone(), false));
            }
        }

        let mut contexts = self.contexts.write().await;
        if let Some(id) = &requested {
            if let Some(context) = contexts.get(id) {
                context.touch(now);
                return Ok((context.clone(), false));
            }
            if self.has_stored_record(id) {
                let context = self.open_context(id.clone(), now)?;
                contexts.insert(id.clone(), context.clone());
                debug!("Reopened browser context {} from disk", id);
                return Ok((context, false));
            }
            debug!("Ignoring unknown browser context id {}", id);
        }

        let context = self.open_context(Uuid::new_v4().to_string(), now)?;
        contexts.insert(context.id().to_string(), context.clone());
        debug!("Opened browser context {}", context.id());

        Ok((context, true))
    }

    /// Replace `old` with a context under a fresh id.
    ///
    /// The old context is dropped and its store emptied, so its id no longer
    /// reaches any session.
    pub async fn rotate(&self, old: &BrowserContext) -> WebResult<Arc<BrowserContext>> {
        let context = self.open_context(Uuid::new_v4().to_string(), self.clock.now())?;

        let mut contexts = self.contexts.write().await;
        contexts.remove(old.id());
        contexts.insert(context.id().to_string(), context.clone());
        drop(contexts);

        old.store().clear();
        debug!("Rotated browser context {} to {}", old.id(), context.id());
        Ok(context)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<BrowserContext>> {
        self.contexts.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }

    /// Revalidate every context.
    ///
    /// Returns an expiry event for each session that ran out since the last
    /// pass. Contexts without a session that have been idle for a full
    /// revalidation interval are dropped.
    pub async fn sweep(&self) -> Vec<SessionEvent> {
        let now = self.clock.now();
        let idle_limit = Duration::from_std(self.policy.revalidation_interval())
            .unwrap_or_else(|_| Duration::minutes(1));
        let snapshot: Vec<Arc<BrowserContext>> =
            self.contexts.read().await.values().cloned().collect();

        let mut events = Vec::new();
        let mut idle = Vec::new();
        for context in snapshot {
            let manager = SessionLifecycleManager::new(
                context.store(),
                self.policy.clone(),
                self.clock.clone(),
                Arc::new(NoopNavigator),
            );

            match revalidate(&manager) {
                RevalidationOutcome::Active { .. } => {}
                RevalidationOutcome::Expired => {
                    info!("Session in browser context {} expired", context.id());
                    context.note_expiry();
                    events.push(SessionEvent::expired(context.id()));
                }
                RevalidationOutcome::Absent => {
                    // An unreported expiry keeps the context one interval longer
                    let limit = if context.has_expiry_notice() {
                        idle_limit + idle_limit
                    } else {
                        idle_limit
                    };
                    if now - context.idle_since() >= limit {
                        idle.push(context.id().to_string());
                    }
                }
            }
        }

        if !idle.is_empty() {
            let mut contexts = self.contexts.write().await;
            for id in &idle {
                contexts.remove(id);
            }
            debug!("Dropped {} idle browser contexts", idle.len());
        }

        events
    }

    fn open_context(&self, id: String, now: DateTime<Utc>) -> WebResult<Arc<BrowserContext>> {
        let store = self.open_store(&id)?;
        Ok(Arc::new(BrowserContext::new(
            id,
            store,
            ActivityMonitor::from_policy(&self.policy),
            now,
        )))
    }

    fn open_store(&self, id: &str) -> WebResult<Arc<dyn SessionStore>> {
        match (&self.backend, &self.file_root) {
            (StorageBackend::File { .. }, Some(root)) => {
                let store = FileSessionStore::new(root.join(id)).map_err(SchoolDeskError::from)?;
                Ok(Arc::new(store))
            }
            _ => Ok(Arc::new(MemorySessionStore::new())),
        }
    }

    /// Whether the file backend holds a record for `id`; never creates anything
    fn has_stored_record(&self, id: &str) -> bool {
        match (&self.backend, &self.file_root) {
            (StorageBackend::File { .. }, Some(root)) => root
                .join(id)
                .join(format!("{}.json", SESSION_STORAGE_KEY))
                .is_file(),
            _ => false,
        }
    }
}

impl std::fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
