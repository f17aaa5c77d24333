//! Request interception: classification and the auto-login pipeline.
//!
//! Every inbound request is classified first — logout completion and
//! logout marking preempt the normal gates, then the ignore list, the
//! first-run setup gate, and the existing-session short-circuit. Only
//! requests that pass every gate reach identity resolution and
//! provisioning. The classifier itself is pure and synchronous; the only
//! awaits in the pipeline are the user-store calls and session issuance.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::{debug, error, info};

use crate::auth::logout::{clear_cookie, marker_cookie, sign_out_target};
use crate::auth::{AuthedUser, Identity, ProvisionError, provision_user, resolve_identity};
use crate::chain::{COOKIE_PARSING, ChainError, HandlerChain};
use crate::config::BridgeConfig;
use crate::host::{InstanceState, SessionIssuer, User, UserStore};

/// Stage name the bridge registers under in the host's handler chain.
pub const BRIDGE_STAGE: &str = "forward-auth";

/// Shared state driving the interceptor middleware.
///
/// Holds the configuration plus the three host-side collaborators. All
/// durable state lives behind those trait objects; the bridge itself keeps
/// nothing across requests.
pub struct SessionBridge {
    config: BridgeConfig,
    store: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionIssuer>,
    instance: Arc<dyn InstanceState>,
}

/// What the classifier decided for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteDecision {
    /// Marker cookie observed: finish the upstream logout now.
    CompleteUpstreamLogout,
    /// Host logout endpoint: arm the marker and let the host log out
    /// locally.
    MarkLogoutPending,
    /// Not a request the bridge touches.
    PassThrough(&'static str),
    /// All gates passed: attempt auto-login.
    AutoLogin,
}

impl SessionBridge {
    pub fn new(
        config: BridgeConfig,
        store: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionIssuer>,
        instance: Arc<dyn InstanceState>,
    ) -> Self {
        Self {
            config,
            store,
            sessions,
            instance,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Whether a trusted email header is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.config.trusted_email_header.is_some()
    }

    /// Install the interceptor into the host chain, directly after the
    /// cookie-parsing stage.
    ///
    /// Without a configured trusted header the bridge logs one line and
    /// installs nothing; requests then flow exactly as if the crate were
    /// absent.
    pub fn register(self: &Arc<Self>, chain: &mut HandlerChain) -> Result<(), ChainError> {
        let Some(header_name) = self.config.trusted_email_header.as_deref() else {
            info!("no trusted email header configured; forward-auth bridge disabled");
            return Ok(());
        };
        info!(
            header = header_name,
            "installing forward-auth bridge after cookie parsing"
        );
        let bridge = Arc::clone(self);
        chain.register_after(COOKIE_PARSING, BRIDGE_STAGE, move |router| {
            router.layer(axum::middleware::from_fn_with_state(bridge, intercept))
        })
    }

    /// Ordered request classification; first match wins.
    pub(crate) fn classify(&self, path: &str, jar: &CookieJar) -> RouteDecision {
        if jar.get(&self.config.marker_cookie).is_some() {
            return RouteDecision::CompleteUpstreamLogout;
        }
        if path == self.config.logout_path {
            return RouteDecision::MarkLogoutPending;
        }
        if self.config.is_ignored_path(path) {
            return RouteDecision::PassThrough("path is on the ignore list");
        }
        if !self.instance.is_owner_set_up() {
            return RouteDecision::PassThrough("instance owner not set up yet");
        }
        if jar.get(&self.config.session_cookie).is_some() {
            return RouteDecision::PassThrough("session cookie already present");
        }
        RouteDecision::AutoLogin
    }

    async fn provision(
        &self,
        identity: &Identity,
    ) -> Result<(User, Cookie<'static>), ProvisionError> {
        let user = provision_user(self.store.as_ref(), identity).await?;
        let cookie = self
            .sessions
            .issue_session_cookie(&user)
            .await
            .map_err(ProvisionError::Store)?;
        Ok((user, cookie))
    }

    /// Terminal response for a request carrying the marker cookie: both
    /// cookies cleared, browser sent to the proxy sign-out endpoint. The
    /// downstream handler never runs.
    fn complete_upstream_logout(&self) -> Response {
        let target = sign_out_target(&self.config);
        info!("completing upstream logout, redirecting to {target}");

        let response = Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, target.as_str())
            .body(Body::empty());
        let mut response = match response {
            Ok(response) => response,
            Err(err) => {
                error!("sign-out redirect could not be built: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        append_cookie(
            &mut response,
            clear_cookie(&self.config.marker_cookie, &self.config),
        );
        append_cookie(
            &mut response,
            clear_cookie(&self.config.session_cookie, &self.config),
        );
        response
    }
}

/// The bridge middleware.
///
/// Insert directly after cookie parsing and before any auth-enforcing
/// layer, e.g. via [`SessionBridge::register`] or
/// `axum::middleware::from_fn_with_state(bridge, intercept)`.
pub async fn intercept(
    State(bridge): State<Arc<SessionBridge>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match bridge.classify(&path, &jar) {
        RouteDecision::CompleteUpstreamLogout => bridge.complete_upstream_logout(),
        RouteDecision::MarkLogoutPending => {
            debug!("logout request; arming upstream logout marker");
            let mut response = next.run(request).await;
            append_cookie(&mut response, marker_cookie(&bridge.config));
            response
        }
        RouteDecision::PassThrough(reason) => {
            debug!(path = path.as_str(), "forward-auth skipped: {reason}");
            next.run(request).await
        }
        RouteDecision::AutoLogin => {
            let Some(identity) = resolve_identity(request.headers(), &bridge.config) else {
                return next.run(request).await;
            };
            info!(email = identity.email.as_str(), "auto-login attempt");

            match bridge.provision(&identity).await {
                Ok((user, session_cookie)) => {
                    request.extensions_mut().insert(AuthedUser::from(&user));
                    let mut response = next.run(request).await;
                    append_cookie(&mut response, session_cookie);
                    response
                }
                Err(err @ ProvisionError::RoleMissing { .. }) => {
                    info!(
                        email = identity.email.as_str(),
                        "refusing session: no usable role"
                    );
                    (StatusCode::UNAUTHORIZED, err.to_string()).into_response()
                }
                Err(ProvisionError::Store(err)) => {
                    error!("auto-login failed: {err:#}");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
    }
}

fn append_cookie(response: &mut Response, cookie: Cookie<'static>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(err) => error!(
            name = cookie.name(),
            "set-cookie header could not be encoded: {err}"
        ),
    }
}
