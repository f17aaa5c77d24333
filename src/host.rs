//! Interfaces implemented by the embedding application.
//!
//! The bridge owns no durable state. Users and roles live in the host's
//! store, session tokens come from the host's own cookie primitive, and
//! first-run setup state is host configuration. Each of those seams is a
//! trait here; the host hands the bridge trait objects at construction.

use anyhow::Result;
use async_trait::async_trait;
use axum_extra::extract::cookie::Cookie;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::types::{Email, RoleId, UserId};

/// Role entity owned by the host store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// Authorization slug (e.g. `global:member`). A user whose role slug is
    /// empty is not ready to log in.
    pub slug: String,
}

/// User entity owned by the host store.
///
/// The bridge reads and writes users only through [`UserStore`]; this type
/// mirrors the fields the bridge touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique within the store; the sole key identities are matched on.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// Opaque hash satisfying the store's non-null constraint. Set once at
    /// auto-creation; nothing ever authenticates against it.
    pub password_hash: String,
    /// Role reference, present even when the relation was not loaded.
    pub role_id: Option<RoleId>,
    /// Role relation; may be absent right after creation depending on store
    /// timing.
    pub role: Option<Role>,
}

impl User {
    /// Whether this user may receive a session cookie.
    pub fn has_usable_role(&self) -> bool {
        self.role.as_ref().is_some_and(|role| !role.slug.is_empty())
    }
}

/// Payload for auto-provisioning a user.
///
/// The password hash is generated by the bridge (see
/// [`generate_password_hash`]) because the plaintext must never exist
/// outside the provisioning call.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// The host application's user/role store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by exact email, optionally loading the role relation.
    async fn find_user_by_email(&self, email: &str, with_role: bool) -> Result<Option<User>>;

    /// Create a user carrying the host's default member role.
    async fn create_user_with_default_role(&self, user: NewUser) -> Result<User>;

    /// Persist changed user attributes.
    async fn save_user(&self, user: &User) -> Result<()>;

    /// Fetch a role directly by id.
    async fn find_role_by_id(&self, id: &RoleId) -> Result<Option<Role>>;
}

/// The host application's session-cookie primitive.
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    /// Issue the host's opaque session cookie for an authenticated user.
    ///
    /// The bridge appends the returned cookie to the response; it never
    /// inspects the token value.
    async fn issue_session_cookie(&self, user: &User) -> Result<Cookie<'static>>;
}

/// Host runtime state the bridge reads per request.
pub trait InstanceState: Send + Sync {
    /// Whether first-run setup of the owner account has completed.
    ///
    /// Auto-login must never bypass first-run bootstrap, so this is read on
    /// every request rather than cached at construction.
    fn is_owner_set_up(&self) -> bool;
}

/// Generate the throwaway password hash stored on auto-created users.
///
/// The plaintext is random and immediately discarded; the hash exists only
/// to satisfy the store's non-null column. It is never logged.
pub fn generate_password_hash() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    format!("{:x}", hasher.finalize())
}
