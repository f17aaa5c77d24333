//! Ordered, named middleware registration.
//!
//! The bridge must run directly after the host's request-cookie parsing and
//! before any auth-enforcing layer — that ordering is a correctness
//! requirement, not a tuning knob. Rather than splicing into the host
//! router's internals by matching on layer names, hosts build a
//! [`HandlerChain`] of named stages and collaborators register relative to
//! an anchor stage (`register_after`).

use std::fmt;

use axum::Router;
use tracing::debug;

/// Stage name hosts give their request-cookie-parsing layer. The bridge
/// installs itself immediately after it.
pub const COOKIE_PARSING: &str = "cookie-parsing";

type Apply = Box<dyn FnOnce(Router) -> Router + Send>;

/// An ordered list of named middleware stages.
///
/// Stages are listed in request-processing order: the first stage sees the
/// request first. [`HandlerChain::into_router`] translates that order into
/// axum's outermost-last layering.
#[derive(Default)]
pub struct HandlerChain {
    stages: Vec<(String, Apply)>,
}

/// Errors from chain registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The anchor stage to register after does not exist.
    UnknownStage(String),
    /// A stage with this name is already registered.
    DuplicateStage(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownStage(name) => write!(f, "no middleware stage named {name:?}"),
            Self::DuplicateStage(name) => {
                write!(f, "middleware stage {name:?} is already registered")
            }
        }
    }
}

impl std::error::Error for ChainError {}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named stage at the end of the chain.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        apply: impl FnOnce(Router) -> Router + Send + 'static,
    ) -> Result<(), ChainError> {
        let name = name.into();
        self.ensure_unique(&name)?;
        self.stages.push((name, Box::new(apply)));
        Ok(())
    }

    /// Insert a named stage immediately after an existing anchor stage.
    pub fn register_after(
        &mut self,
        anchor: &str,
        name: impl Into<String>,
        apply: impl FnOnce(Router) -> Router + Send + 'static,
    ) -> Result<(), ChainError> {
        let name = name.into();
        self.ensure_unique(&name)?;
        let position = self
            .stages
            .iter()
            .position(|(stage, _)| stage == anchor)
            .ok_or_else(|| ChainError::UnknownStage(anchor.to_string()))?;
        self.stages.insert(position + 1, (name, Box::new(apply)));
        Ok(())
    }

    /// Stage names in request-processing order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply every stage to the router.
    ///
    /// Later `Router::layer` calls wrap earlier ones, so stages are applied
    /// in reverse to make the first listed stage the outermost layer.
    pub fn into_router(self, router: Router) -> Router {
        let mut router = router;
        for (name, apply) in self.stages.into_iter().rev() {
            debug!(stage = name.as_str(), "applying middleware stage");
            router = apply(router);
        }
        router
    }

    fn ensure_unique(&self, name: &str) -> Result<(), ChainError> {
        if self.stages.iter().any(|(stage, _)| stage == name) {
            return Err(ChainError::DuplicateStage(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderValue, Request};
    use axum::middleware::{Next, from_fn};
    use axum::response::Response;
    use axum::routing::get;
    use tower::ServiceExt;

    /// Middleware that appends its tag to a response header, so tests can
    /// observe which stage ran first.
    fn tagging(tag: &'static str) -> impl Fn(Router) -> Router {
        move |router: Router| {
            router.layer(from_fn(move |req: Request<Body>, next: Next| async move {
                let mut response: Response = next.run(req).await;
                response
                    .headers_mut()
                    .append("x-stage", HeaderValue::from_static(tag));
                response
            }))
        }
    }

    fn app() -> Router {
        Router::new().route("/", get(|| async { "ok" }))
    }

    #[test]
    fn test_register_after_orders_stages() {
        let mut chain = HandlerChain::new();
        chain.push(COOKIE_PARSING, tagging("cookies")).unwrap();
        chain.push("auth-enforcement", tagging("auth")).unwrap();
        chain
            .register_after(COOKIE_PARSING, "forward-auth", tagging("bridge"))
            .unwrap();

        assert_eq!(
            chain.names(),
            vec![COOKIE_PARSING, "forward-auth", "auth-enforcement"]
        );
    }

    #[test]
    fn test_register_after_unknown_anchor() {
        let mut chain = HandlerChain::new();
        let err = chain
            .register_after(COOKIE_PARSING, "forward-auth", |router| router)
            .unwrap_err();
        assert_eq!(err, ChainError::UnknownStage(COOKIE_PARSING.to_string()));
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let mut chain = HandlerChain::new();
        chain.push(COOKIE_PARSING, |router| router).unwrap();
        let err = chain.push(COOKIE_PARSING, |router| router).unwrap_err();
        assert_eq!(err, ChainError::DuplicateStage(COOKIE_PARSING.to_string()));
    }

    #[tokio::test]
    async fn test_first_stage_runs_first() {
        let mut chain = HandlerChain::new();
        chain.push("outer", tagging("outer")).unwrap();
        chain.register_after("outer", "inner", tagging("inner")).unwrap();

        let router = chain.into_router(app());
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        // Response headers are appended on the way out: innermost first.
        let stages: Vec<_> = response
            .headers()
            .get_all("x-stage")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(stages, vec!["inner", "outer"]);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }
}
