//! Session record and login identity types

use chrono::{DateTime, Utc};
use schooldesk_core::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The single persisted session record of a browser context.
///
/// Timestamps are stored as milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Opaque user reference (account id)
    pub identity: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub must_change_password: bool,
    pub logged_in: bool,
    /// Extra claims supplied by the login flow
    #[serde(default)]
    pub claims: BTreeMap<String, serde_json::Value>,
}

impl SessionRecord {
    /// Whether the record is valid at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.logged_in && now <= self.expires_at
    }

    /// Name shown in page headers
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone().unwrap_or_else(|| self.identity.clone())
        } else {
            full.to_string()
        }
    }

    pub fn claim(&self, key: &str) -> Option<&serde_json::Value> {
        self.claims.get(key)
    }
}

/// Identity resolved by the login flow and handed to `create_session`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginIdentity {
    pub identity: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub must_change_password: bool,
    #[serde(default)]
    pub claims: BTreeMap<String, serde_json::Value>,
}

impl LoginIdentity {
    pub fn new<I: Into<String>, R: Into<Role>>(identity: I, role: R) -> Self {
        Self {
            identity: identity.into(),
            role: role.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            must_change_password: false,
            claims: BTreeMap::new(),
        }
    }

    pub fn with_name<F: Into<String>, L: Into<String>>(mut self, first: F, last: L) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_password_change_required(mut self, required: bool) -> Self {
        self.must_change_password = required;
        self
    }

    pub fn with_claim<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.claims.insert(key.into(), value);
        self
    }
}
