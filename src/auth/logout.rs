//! Two-phase logout: the marker cookie and the upstream sign-out redirect.
//!
//! Local logout and the identity-provider sign-out cannot happen in one
//! request/response cycle: the sign-out is a client-driven navigation. The
//! marker cookie bridges the two handler invocations — set on the logout
//! request, observed and cleared on whichever request comes next. There is
//! deliberately no server-side record of a pending logout; the cookie is the
//! whole state machine.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;
use url::form_urlencoded;

use crate::config::BridgeConfig;

/// Build the marker set on the logout request and consumed exactly once on
/// the next request.
pub fn marker_cookie(config: &BridgeConfig) -> Cookie<'static> {
    Cookie::build((config.marker_cookie.clone(), "true"))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(config.marker_max_age_secs as i64))
        .build()
}

/// Build an expired replacement that clears a cookie on the client.
pub fn clear_cookie(name: &str, config: &BridgeConfig) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build()
}

/// Where the logout-completion redirect points: the proxy sign-out
/// endpoint, carrying the upstream logout URL as `rd` when one is
/// configured.
pub fn sign_out_target(config: &BridgeConfig) -> String {
    match config.upstream_logout_url.as_deref() {
        Some(url) if !url.is_empty() => {
            let query: String = form_urlencoded::Serializer::new(String::new())
                .append_pair("rd", url)
                .finish();
            format!("{}?{}", config.sign_out_path, query)
        }
        _ => config.sign_out_path.clone(),
    }
}
