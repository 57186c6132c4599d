//! In-process identity provider.

use std::collections::HashMap;

use async_trait::async_trait;
use buildboard_core::{User, UserId};
use sha2::{Digest, Sha256};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::provider::{AuthError, AuthProvider, Result};

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user: User,
    salt: String,
    digest: String,
}

/// Accounts held in memory, with salted SHA-256 password digests.
pub struct LocalAuth {
    accounts: Mutex<HashMap<String, Account>>,
    session: watch::Sender<Option<User>>,
}

impl LocalAuth {
    /// Provider with no accounts and no session.
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            session,
        }
    }

    fn start_session(&self, user: &User) {
        self.session.send_replace(Some(user.clone()));
    }
}

impl Default for LocalAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    fn current_user(&self) -> Option<User> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let accounts = self.accounts.lock().await;
        let account = accounts.get(&email).ok_or(AuthError::InvalidCredentials)?;
        if !digests_match(&digest(&account.salt, password), &account.digest) {
            debug!(%email, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        let user = account.user.clone();
        drop(accounts);

        info!(user = %user.id, "signed in");
        self.start_session(&user);
        Ok(user)
    }

    async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword { min: MIN_PASSWORD_LEN });
        }

        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&email) {
            return Err(AuthError::EmailTaken);
        }

        let user = User::from_identity(
            UserId::new(ulid::Ulid::new().to_string()),
            Some(&email),
            Some(name),
        );
        let salt = ulid::Ulid::new().to_string();
        accounts.insert(
            email,
            Account {
                user: user.clone(),
                digest: digest(&salt, password),
                salt,
            },
        );
        drop(accounts);

        info!(user = %user.id, "account created");
        self.start_session(&user);
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.session.borrow().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        self.session.send_replace(None);
        info!("signed out");
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => Ok(()),
        _ => Err(AuthError::InvalidEmail),
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare digests without short-circuiting on the first differing byte.
fn digests_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
