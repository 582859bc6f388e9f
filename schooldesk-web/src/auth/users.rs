//! Credential directory

use super::{AuthError, MIN_PASSWORD_LENGTH};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use schooldesk_core::Role;
use schooldesk_session::LoginIdentity;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Account that can sign in
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub password_hash: String,
    pub must_change_password: bool,
}

impl Account {
    /// Create an account with a hashed password
    pub fn new(
        id: &str,
        email: &str,
        name: (&str, &str),
        role: Role,
        password: &str,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            id: id.to_string(),
            email: normalize_email(email),
            first_name: name.0.to_string(),
            last_name: name.1.to_string(),
            role,
            password_hash: hash_password(password)?,
            must_change_password: false,
        })
    }

    pub fn requiring_password_change(mut self) -> Self {
        self.must_change_password = true;
        self
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash).unwrap_or(false)
    }

    /// Identity handed to the session manager on login
    pub fn login_identity(&self) -> LoginIdentity {
        LoginIdentity::new(self.id.clone(), self.role.clone())
            .with_name(self.first_name.clone(), self.last_name.clone())
            .with_email(self.email.clone())
            .with_password_change_required(self.must_change_password)
    }
}

/// Demo accounts, hashed once per process
static DEMO_ACCOUNTS: LazyLock<Vec<Account>> = LazyLock::new(|| {
    let accounts = [
        ("tch-001", "maria.santos@schooldesk.test", ("Maria", "Santos"), Role::Teacher, "teacher123"),
        ("stu-001", "miguel.reyes@schooldesk.test", ("Miguel", "Reyes"), Role::Student, "student123"),
        ("par-001", "ana.reyes@schooldesk.test", ("Ana", "Reyes"), Role::Parent, "parent123"),
        ("gdn-001", "guidance@schooldesk.test", ("Carmen", "Villanueva"), Role::Guidance, "guidance123"),
    ];

    accounts
        .into_iter()
        .filter_map(|(id, email, name, role, password)| {
            match Account::new(id, email, name, role, password) {
                Ok(account) => Some(account),
                Err(e) => {
                    warn!("Failed to create demo account {}: {}", email, e);
                    None
                }
            }
        })
        .collect()
});

/// Default administrator, created in every directory
static DEFAULT_ADMIN: LazyLock<Option<Account>> = LazyLock::new(|| {
    Account::new(
        "adm-001",
        "admin@schooldesk.test",
        ("School", "Administrator"),
        Role::Admin,
        "admin123",
    )
    .map(Account::requiring_password_change)
    .map_err(|e| warn!("Failed to create default admin account: {}", e))
    .ok()
});

/// In-memory credential directory keyed by email
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl UserDirectory {
    /// Directory holding only the default administrator, who must change
    /// the initial password on first login
    pub fn new() -> Self {
        let directory = Self::default();
        if let Some(admin) = DEFAULT_ADMIN.clone() {
            info!("Creating default admin account: {}", admin.email);
            directory.insert(admin);
        }
        directory
    }

    /// Default administrator plus one demo account per role
    pub fn with_demo_accounts() -> Self {
        let directory = Self::new();
        for account in DEMO_ACCOUNTS.iter() {
            directory.insert(account.clone());
        }
        directory
    }

    pub fn insert(&self, account: Account) {
        self.accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account.email.clone(), account);
    }

    pub fn len(&self) -> usize {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check credentials
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        let account = accounts.get(&email).ok_or(AuthError::InvalidCredentials)?;

        if !account.verify_password(password) {
            warn!("Invalid password for account: {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        debug!("Account authenticated: {}", email);
        Ok(account.clone())
    }

    /// Replace an account's password and drop its password-change flag
    pub fn change_password(
        &self,
        account_id: &str,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        if new.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LENGTH));
        }
        if new == current {
            return Err(AuthError::PasswordReused);
        }

        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        let account = accounts
            .values_mut()
            .find(|account| account.id == account_id)
            .ok_or(AuthError::UnknownAccount)?;

        if !account.verify_password(current) {
            return Err(AuthError::WrongCurrentPassword);
        }

        account.password_hash = hash_password(new)?;
        account.must_change_password = false;
        info!("Password changed for account: {}", account.email);
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash password using Argon2
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hashing)
}

/// Verify password against hash
fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::Hashing)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
