//! NewType wrappers for strong typing across the bridge.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a role id where a user id is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Identifier of a user record in the host application's store.
    ///
    /// Opaque to the bridge; it is read from the store and echoed back into
    /// the request context, never parsed or generated here.
    UserId
);

newtype_string!(
    /// Identifier of a role record in the host application's store.
    ///
    /// Users may carry a `RoleId` without the role relation being loaded;
    /// the provisioner resolves it through `find_role_by_id` in that case.
    RoleId
);

newtype_string!(
    /// A proxy-authenticated email address.
    ///
    /// The sole matching key between forwarded identities and host user
    /// records. Always stored trimmed; emptiness means "no identity".
    Email
);
