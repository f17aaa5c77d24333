//! Identity resolution, session provisioning, and logout coordination.
//!
//! This module is the bridge's core pipeline, in dependency order:
//!
//! - **resolver** — derive `(email, first_name, last_name)` from the
//!   trusted header and an unverified access token
//! - **provision** — map an identity onto a host user record and enforce
//!   the role gate
//! - **logout** — the marker-cookie protocol that chains local logout to
//!   the identity provider's sign-out
//! - **context** — the request-scoped identity handed to downstream
//!   handlers
//!
//! The request classifier in [`crate::middleware`] composes these into the
//! per-request flow.

mod context;
pub(crate) mod logout;
mod provision;
mod resolver;

pub use context::AuthedUser;
pub use provision::{ProvisionError, provision_user};
pub use resolver::{Identity, resolve_identity};
