//! Auth provider trait.

use async_trait::async_trait;
use buildboard_core::User;
use tokio::sync::watch;

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Auth failures. The display text is what sign-in forms show.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Sign-up with an address that already has an account
    #[error("User already registered")]
    EmailTaken,

    /// Email is not shaped like an address
    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,

    /// Password below the minimum length
    #[error("Password should be at least {min} characters")]
    WeakPassword {
        /// Minimum accepted length
        min: usize,
    },

    /// Operation needs a session
    #[error("Not signed in")]
    NotSignedIn,

    /// Provider-side failure
    #[error("{0}")]
    Provider(String),
}

/// Identity provider consumed by the session layer.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The user of the current session, if any.
    fn current_user(&self) -> Option<User>;

    /// Receiver that yields the current user on every sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<User>>;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<User>;

    /// Create an account and sign it in.
    async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<User>;

    /// End the current session.
    async fn sign_out(&self) -> Result<()>;
}
