//! Identity for Buildboard.
//!
//! The progress engine only needs a stable user id and a notification on
//! every sign-in and sign-out. [`AuthProvider`] is that contract;
//! [`LocalAuth`] is an in-process implementation.

#![warn(missing_docs)]

mod provider;
mod local;

pub use provider::{AuthError, AuthProvider, Result};
pub use local::LocalAuth;
