//! Navigation seam: where redirect targets go

use std::sync::{Mutex, PoisonError};

/// Host navigation mechanism consuming redirect target URLs
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Navigator that drops every target
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _url: &str) {}
}

/// Navigator that records targets for the caller to act on
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    targets: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent target, if any
    pub fn last(&self) -> Option<String> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// All targets in the order they were issued
    pub fn targets(&self) -> Vec<String> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        tracing::debug!("Navigating to {}", url);
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}
