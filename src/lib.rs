//! Forward-auth session bridge.
//!
//! Sits between a reverse-auth proxy (oauth2-proxy in front of Keycloak,
//! and the like) that forwards the authenticated identity via trusted
//! headers, and a host application with its own cookie-based sessions.
//! Requests arriving with the trusted email header are transparently mapped
//! onto host user records — created on first sight, reconciled afterwards —
//! and receive the host's native session cookie without ever seeing a login
//! form. Logging out tears down both sides: the host's session through its
//! own logout handler, and the identity-provider session through a deferred
//! sign-out redirect carried by a short-lived marker cookie.
//!
//! The host supplies its side of the contract through three traits
//! ([`UserStore`], [`SessionIssuer`], [`InstanceState`]) and installs the
//! interceptor into its middleware chain right after cookie parsing:
//!
//! ```ignore
//! let bridge = Arc::new(SessionBridge::new(
//!     BridgeConfig::from_env(),
//!     user_store,
//!     session_issuer,
//!     instance_state,
//! ));
//!
//! let mut chain = HandlerChain::new();
//! chain.push(COOKIE_PARSING, |r| r.layer(cookie_layer))?;
//! chain.push("auth-enforcement", |r| r.layer(auth_layer))?;
//! bridge.register(&mut chain)?;
//! let app = chain.into_router(router);
//! ```
//!
//! The bearer token the proxy may forward is decoded for display-name
//! fields only and never signature-verified; the trusted header is the one
//! and only authority on identity, by design.

mod chain;
mod config;
mod middleware;
mod types;

mod auth;
pub mod host;

// Re-export the public surface.
pub use auth::{AuthedUser, Identity, ProvisionError, resolve_identity};
pub use chain::{COOKIE_PARSING, ChainError, HandlerChain};
pub use config::BridgeConfig;
pub use host::{InstanceState, NewUser, Role, SessionIssuer, User, UserStore};
pub use middleware::{BRIDGE_STAGE, SessionBridge, intercept};
pub use types::{Email, RoleId, UserId};
