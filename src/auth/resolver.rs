//! Identity resolution from proxy headers.
//!
//! The email comes from the trusted header the reverse proxy sets; name
//! fields are an opportunistic decode of an access token the proxy may
//! forward alongside it. The token is never signature-verified — it is a
//! display-name hint, not a trust boundary — so every decode failure
//! degrades to empty names instead of failing the request.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use http::{HeaderMap, header};
use serde::Deserialize;
use tracing::debug;

use crate::config::BridgeConfig;

/// Identity resolved from a single request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Trimmed, non-empty email from the trusted header.
    pub email: String,
    /// Best-effort first name; empty when no token or no claim.
    pub first_name: String,
    /// Best-effort last name; empty when no token or no claim.
    pub last_name: String,
}

/// Display-name claims read from the unverified token payload.
#[derive(Debug, Deserialize)]
struct NameClaims {
    #[serde(default, alias = "firstName")]
    given_name: String,
    #[serde(default, alias = "lastName")]
    family_name: String,
}

/// Extract the identity a request carries, if any.
///
/// Returns `None` when no trusted header is configured, the header is
/// absent, or its value trims to empty — callers pass the request through
/// untouched in all three cases.
pub fn resolve_identity(headers: &HeaderMap, config: &BridgeConfig) -> Option<Identity> {
    let header_name = config.trusted_email_header.as_deref()?;
    let email = headers.get(header_name)?.to_str().ok()?.trim();
    if email.is_empty() {
        return None;
    }

    let (first_name, last_name) = resolve_name_hints(headers, &config.access_token_header);
    Some(Identity {
        email: email.to_string(),
        first_name,
        last_name,
    })
}

/// Best-effort name extraction from `Authorization` or the forwarded
/// access-token header.
fn resolve_name_hints(headers: &HeaderMap, token_header: &str) -> (String, String) {
    let raw = headers
        .get(header::AUTHORIZATION)
        .or_else(|| headers.get(token_header))
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let Some(raw) = raw else {
        return (String::new(), String::new());
    };

    match decode_name_claims(strip_bearer(raw)) {
        Ok(claims) => (
            claims.given_name.trim().to_string(),
            claims.family_name.trim().to_string(),
        ),
        Err(reason) => {
            debug!("ignoring undecodable access token: {reason}");
            (String::new(), String::new())
        }
    }
}

/// Drop a leading `Bearer ` scheme, case-insensitively.
fn strip_bearer(value: &str) -> &str {
    let has_scheme = value
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("bearer "));
    if has_scheme {
        value[7..].trim_start()
    } else {
        value
    }
}

fn decode_name_claims(token: &str) -> Result<NameClaims, String> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(format!(
            "expected 3 token segments, got {}",
            segments.len()
        ));
    }
    let payload = decode_base64(segments[1]).map_err(|e| format!("payload is not base64: {e}"))?;
    serde_json::from_slice(&payload).map_err(|e| format!("payload is not claims JSON: {e}"))
}

/// Tokens in the wild use the url-safe alphabet without padding; fall back
/// to the standard alphabet for proxies that re-encode.
fn decode_base64(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| STANDARD.decode(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn config() -> BridgeConfig {
        BridgeConfig {
            trusted_email_header: Some("x-forwarded-email".to_string()),
            ..BridgeConfig::default()
        }
    }

    fn token_with_payload(payload: &str) -> String {
        format!(
            "header.{}.signature",
            URL_SAFE_NO_PAD.encode(payload.as_bytes())
        )
    }

    #[test]
    fn test_email_from_trusted_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-email", HeaderValue::from_static("a@x.com"));

        let identity = resolve_identity(&headers, &config()).unwrap();
        assert_eq!(identity.email, "a@x.com");
        assert_eq!(identity.first_name, "");
        assert_eq!(identity.last_name, "");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-Email", HeaderValue::from_static("a@x.com"));

        let identity = resolve_identity(&headers, &config()).unwrap();
        assert_eq!(identity.email, "a@x.com");
    }

    #[test]
    fn test_email_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-email", HeaderValue::from_static("  a@x.com  "));

        let identity = resolve_identity(&headers, &config()).unwrap();
        assert_eq!(identity.email, "a@x.com");
    }

    #[test]
    fn test_multi_valued_header_takes_first() {
        let mut headers = HeaderMap::new();
        headers.append("x-forwarded-email", HeaderValue::from_static("a@x.com"));
        headers.append("x-forwarded-email", HeaderValue::from_static("b@x.com"));

        let identity = resolve_identity(&headers, &config()).unwrap();
        assert_eq!(identity.email, "a@x.com");
    }

    #[test]
    fn test_missing_or_blank_header_is_no_identity() {
        let headers = HeaderMap::new();
        assert!(resolve_identity(&headers, &config()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-email", HeaderValue::from_static("   "));
        assert!(resolve_identity(&headers, &config()).is_none());
    }

    #[test]
    fn test_unconfigured_header_disables_resolution() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-email", HeaderValue::from_static("a@x.com"));
        assert!(resolve_identity(&headers, &BridgeConfig::default()).is_none());
    }

    #[test]
    fn test_names_from_bearer_token() {
        let token = token_with_payload(r#"{"given_name":"Ada","family_name":"Lovelace"}"#);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-email", HeaderValue::from_static("a@x.com"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let identity = resolve_identity(&headers, &config()).unwrap();
        assert_eq!(identity.first_name, "Ada");
        assert_eq!(identity.last_name, "Lovelace");
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        let token = token_with_payload(r#"{"given_name":"Ada"}"#);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-email", HeaderValue::from_static("a@x.com"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("bearer {token}")).unwrap(),
        );

        let identity = resolve_identity(&headers, &config()).unwrap();
        assert_eq!(identity.first_name, "Ada");
    }

    #[test]
    fn test_names_from_forwarded_access_token_header() {
        let token = token_with_payload(r#"{"firstName":"Grace","lastName":"Hopper"}"#);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-email", HeaderValue::from_static("a@x.com"));
        headers.insert(
            "x-auth-request-access-token",
            HeaderValue::from_str(&token).unwrap(),
        );

        let identity = resolve_identity(&headers, &config()).unwrap();
        assert_eq!(identity.first_name, "Grace");
        assert_eq!(identity.last_name, "Hopper");
    }

    #[test]
    fn test_names_are_trimmed() {
        let token = token_with_payload(r#"{"given_name":"  Ada  ","family_name":" L "}"#);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-email", HeaderValue::from_static("a@x.com"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let identity = resolve_identity(&headers, &config()).unwrap();
        assert_eq!(identity.first_name, "Ada");
        assert_eq!(identity.last_name, "L");
    }

    #[test]
    fn test_malformed_tokens_degrade_to_empty_names() {
        let bad_tokens = [
            "not-a-token".to_string(),
            "only.two".to_string(),
            "a.b.c.d".to_string(),
            "header.!!!not-base64!!!.signature".to_string(),
            format!("header.{}.signature", URL_SAFE_NO_PAD.encode(b"not json")),
        ];

        for bad in bad_tokens {
            let mut headers = HeaderMap::new();
            headers.insert("x-forwarded-email", HeaderValue::from_static("a@x.com"));
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {bad}")).unwrap(),
            );

            let identity = resolve_identity(&headers, &config()).unwrap();
            assert_eq!(identity.email, "a@x.com", "token: {bad}");
            assert_eq!(identity.first_name, "", "token: {bad}");
            assert_eq!(identity.last_name, "", "token: {bad}");
        }
    }

    #[test]
    fn test_standard_alphabet_payload_decodes() {
        let payload = r#"{"given_name":"Ada"}"#;
        let token = format!("header.{}.signature", STANDARD.encode(payload.as_bytes()));
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-email", HeaderValue::from_static("a@x.com"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let identity = resolve_identity(&headers, &config()).unwrap();
        assert_eq!(identity.first_name, "Ada");
    }
}
