//! Signed-in user.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// A user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Email address
    pub email: String,
}

impl User {
    /// Map a provider identity to a user.
    ///
    /// The name falls back to the local part of the email, then to `"User"`.
    pub fn from_identity(id: UserId, email: Option<&str>, display_name: Option<&str>) -> Self {
        let email = email.unwrap_or_default().to_string();
        let name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| {
                email
                    .split('@')
                    .next()
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "User".to_string());

        Self { id, name, email }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_fallbacks() {
        let named = User::from_identity("u1".into(), Some("ada@example.com"), Some("Ada"));
        assert_eq!(named.name, "Ada");

        let from_email = User::from_identity("u1".into(), Some("ada@example.com"), Some("  "));
        assert_eq!(from_email.name, "ada");

        let anonymous = User::from_identity("u1".into(), None, None);
        assert_eq!(anonymous.name, "User");
        assert_eq!(anonymous.email, "");
    }
}
