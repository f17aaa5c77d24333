//! Find-or-create user provisioning and the role gate.

use std::fmt;

use tracing::{debug, info};

use crate::auth::resolver::Identity;
use crate::host::{NewUser, User, UserStore, generate_password_hash};
use crate::types::Email;

/// Why provisioning refused to produce an authenticated user.
#[derive(Debug)]
pub enum ProvisionError {
    /// The user exists but no role with a usable slug could be resolved.
    /// Surfaces as a 401 with a remediation message.
    RoleMissing { email: String },
    /// The store or session primitive failed; surfaces through the host's
    /// generic error handling.
    Store(anyhow::Error),
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleMissing { email } => write!(
                f,
                "User {email} has no valid role. Ask an administrator to assign a role."
            ),
            Self::Store(err) => write!(f, "user store failure: {err}"),
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RoleMissing { .. } => None,
            Self::Store(err) => err.source(),
        }
    }
}

impl From<anyhow::Error> for ProvisionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}

/// Map a resolved identity onto a host user record.
///
/// Finds the user by email or creates one with the default member role,
/// reconciles name fields, resolves a missing role relation, and enforces
/// the role gate: no session is ever issued for a user without a role slug.
///
/// Every store call is attempted exactly once; concurrent first requests for
/// the same new email are arbitrated by the store's unique email constraint.
pub async fn provision_user(
    store: &dyn UserStore,
    identity: &Identity,
) -> Result<User, ProvisionError> {
    let mut user = match store.find_user_by_email(&identity.email, true).await? {
        Some(existing) => reconcile_names(store, existing, identity).await?,
        None => {
            let created = store
                .create_user_with_default_role(NewUser {
                    email: Email::new(&identity.email),
                    first_name: identity.first_name.clone(),
                    last_name: identity.last_name.clone(),
                    password_hash: generate_password_hash(),
                })
                .await?;
            info!(email = %created.email, "created user from forward-auth identity");
            created
        }
    };

    if user.role.is_none() {
        user = complete_role(store, user, &identity.email).await?;
    }

    if !user.has_usable_role() {
        return Err(ProvisionError::RoleMissing {
            email: identity.email.clone(),
        });
    }

    Ok(user)
}

/// Update stored name fields from the resolved identity, writing only when
/// a non-empty hint actually differs.
async fn reconcile_names(
    store: &dyn UserStore,
    mut user: User,
    identity: &Identity,
) -> Result<User, ProvisionError> {
    let mut changed = false;
    if !identity.first_name.is_empty() && user.first_name != identity.first_name {
        user.first_name = identity.first_name.clone();
        changed = true;
    }
    if !identity.last_name.is_empty() && user.last_name != identity.last_name {
        user.last_name = identity.last_name.clone();
        changed = true;
    }
    if changed {
        store.save_user(&user).await?;
        debug!(email = %user.email, "updated user names from token hints");
    }
    Ok(user)
}

/// Resolve a missing role relation: directly by id when the store exposes
/// one, otherwise through a fresh lookup that loads the relation (covers
/// stores that do not eager-load the relation on creation).
async fn complete_role(
    store: &dyn UserStore,
    mut user: User,
    email: &str,
) -> Result<User, ProvisionError> {
    if let Some(role_id) = user.role_id.clone() {
        user.role = store.find_role_by_id(&role_id).await?;
    } else if let Some(reloaded) = store.find_user_by_email(email, true).await? {
        user = reloaded;
    }
    Ok(user)
}
