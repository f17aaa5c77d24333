//! Request-scoped identity attached by the bridge.

use crate::host::User;
use crate::types::{Email, UserId};

/// Identity of the user a request was auto-logged-in as.
///
/// Inserted into the request extensions before the downstream handler runs,
/// so handlers behind the bridge can see who the session cookie was issued
/// to without re-reading it.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    user_id: UserId,
    email: Email,
    first_name: String,
    last_name: String,
}

impl AuthedUser {
    /// Get the host store's user id.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the proxy-authenticated email.
    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Get a display-friendly name for this user.
    pub fn display(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.to_string()
        } else {
            name.to_string()
        }
    }
}

impl From<&User> for AuthedUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}
