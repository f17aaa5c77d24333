use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the forward-auth bridge.
///
/// Everything is environment-style: a deployment sets a couple of variables
/// and the rest keeps host-convention defaults. The bridge stays inactive
/// until a trusted email header is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Header carrying the proxy-authenticated email address.
    ///
    /// Only a trusted reverse proxy may set this header; the bridge treats
    /// its value as authoritative. When unset the bridge installs nothing.
    pub trusted_email_header: Option<String>,
    /// Alternate header carrying the upstream access token.
    ///
    /// Consulted after `Authorization` for display-name hints only.
    pub access_token_header: String,
    /// Identity-provider logout URL, forwarded to the proxy sign-out
    /// endpoint as the `rd` query parameter.
    pub upstream_logout_url: Option<String>,
    /// Proxy sign-out endpoint the logout-completion redirect targets.
    pub sign_out_path: String,
    /// Host logout endpoint that starts the two-phase logout.
    pub logout_path: String,
    /// Name of the host's session cookie.
    pub session_cookie: String,
    /// Name of the short-lived logout marker cookie.
    pub marker_cookie: String,
    /// Marker cookie Max-Age in seconds.
    pub marker_max_age_secs: u64,
    /// Path prefixes the bridge never intercepts (static assets, health
    /// checks, webhook receivers, OAuth credential callbacks).
    pub ignored_path_prefixes: Vec<String>,
    /// Whether emitted cookies carry the Secure attribute.
    pub secure_cookies: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            trusted_email_header: None,
            access_token_header: "x-auth-request-access-token".to_string(),
            upstream_logout_url: None,
            sign_out_path: "/oauth2/sign_out".to_string(),
            logout_path: "/rest/logout".to_string(),
            session_cookie: "n8n-auth".to_string(),
            marker_cookie: "sso-logout-pending".to_string(),
            marker_max_age_secs: 60,
            ignored_path_prefixes: vec![
                "/assets".to_string(),
                "/healthz".to_string(),
                "/webhook".to_string(),
                "/rest/oauth2-credential".to_string(),
                "/health".to_string(),
            ],
            secure_cookies: true,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from the environment.
    ///
    /// `FORWARD_AUTH_EMAIL_HEADER` activates the bridge;
    /// `FORWARD_AUTH_UPSTREAM_LOGOUT_URL` selects where the identity
    /// provider sends the browser after sign-out. Unset or blank variables
    /// leave the defaults in place.
    pub fn from_env() -> Self {
        Self {
            trusted_email_header: non_blank_env("FORWARD_AUTH_EMAIL_HEADER"),
            upstream_logout_url: non_blank_env("FORWARD_AUTH_UPSTREAM_LOGOUT_URL"),
            ..Self::default()
        }
    }

    /// Whether a path is excluded from interception.
    pub fn is_ignored_path(&self, path: &str) -> bool {
        self.ignored_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
