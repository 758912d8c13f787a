//! Service-account authentication (OAuth2 JWT bearer grant).
//!
//! A signed RS256 assertion is exchanged at the token endpoint for a short-lived access token.
//! The token is kept in memory and reused until shortly before it expires.

use crate::error::{AnalyticsDataError, Result, bounded_upstream_text};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_SKEW_SECS: i64 = 60;

/// Supplies bearer tokens for outbound API calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// The parts of a service-account key file this client needs.
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// JWT claims of the bearer assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct ServiceAccountTokenSource {
    http: reqwest::Client,
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    /// # Errors
    ///
    /// Returns [`AnalyticsDataError::Config`] if the private key is not an RSA PEM key.
    pub fn new(http: reqwest::Client, credentials: ServiceAccountCredentials) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| {
                AnalyticsDataError::Config(format!("invalid service account private key: {e}"))
            })?;

        Ok(Self {
            http,
            client_email: credentials.client_email,
            token_uri: credentials.token_uri,
            signing_key,
            cached: Mutex::new(None),
        })
    }

    /// Sign a bearer assertion issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsDataError::Config`] if signing fails.
    pub fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: ANALYTICS_READONLY_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| AnalyticsDataError::Config(format!("sign service account assertion: {e}")))
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let assertion = self.signed_assertion(now)?;

        let resp = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<TokenErrorResponse>(&bytes) {
                Ok(TokenErrorResponse {
                    error,
                    error_description: Some(desc),
                }) => format!("{error}: {desc}"),
                Ok(TokenErrorResponse { error, .. }) => error,
                Err(_) => format!(
                    "token endpoint returned {}: {}",
                    status.as_u16(),
                    bounded_upstream_text(&String::from_utf8_lossy(&bytes))
                ),
            };
            return Err(AnalyticsDataError::Auth(message));
        }

        let token: TokenResponse = serde_json::from_slice(&bytes)
            .map_err(|e| AnalyticsDataError::Decode(format!("parse token response: {e}")))?;
        let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);

        tracing::debug!(expires_in = lifetime, "obtained service account access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String> {
        let now = Utc::now();
        let cached = self.cached.lock().clone();
        if let Some(cached) = cached
            && now + Duration::seconds(REFRESH_SKEW_SECS) < cached.expires_at
        {
            return Ok(cached.access_token);
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.access_token.clone();
        *self.cached.lock() = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use ga4_test_support::{TestHttpServer, service_account_key};
    use jsonwebtoken::{DecodingKey, Validation};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CLIENT_EMAIL: &str = "reporter@example-project.iam.gserviceaccount.com";

    fn credentials(token_uri: &str) -> ServiceAccountCredentials {
        ServiceAccountCredentials {
            client_email: CLIENT_EMAIL.to_string(),
            private_key: service_account_key().private_key_pem.clone(),
            token_uri: token_uri.to_string(),
        }
    }

    fn decode_assertion(assertion: &str, audience: &str) -> AssertionClaims {
        let key = DecodingKey::from_rsa_pem(service_account_key().public_key_pem.as_bytes())
            .expect("public key");
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[CLIENT_EMAIL]);
        jsonwebtoken::decode::<AssertionClaims>(assertion, &key, &validation)
            .expect("valid assertion")
            .claims
    }

    #[test]
    fn rejects_non_pem_private_key() {
        let mut creds = credentials("http://127.0.0.1:1/token");
        creds.private_key = "not a key".to_string();

        let Err(err) = ServiceAccountTokenSource::new(reqwest::Client::new(), creds) else {
            panic!("expected config error");
        };
        assert!(matches!(err, AnalyticsDataError::Config(_)));
        assert!(!err.to_string().contains("not a key"));
    }

    #[test]
    fn assertion_is_rs256_with_scope_audience_and_one_hour_lifetime() {
        let token_uri = "https://oauth2.example.test/token";
        let source =
            ServiceAccountTokenSource::new(reqwest::Client::new(), credentials(token_uri))
                .expect("token source");

        let now = Utc::now();
        let assertion = source.signed_assertion(now).expect("sign");

        let header = jsonwebtoken::decode_header(&assertion).expect("header");
        assert_eq!(header.alg, Algorithm::RS256);

        let claims = decode_assertion(&assertion, token_uri);
        assert_eq!(claims.iss, CLIENT_EMAIL);
        assert_eq!(claims.aud, token_uri);
        assert_eq!(claims.scope, ANALYTICS_READONLY_SCOPE);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn credentials_debug_redacts_private_key() {
        let creds = credentials("https://oauth2.example.test/token");
        let debug = format!("{creds:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("PRIVATE KEY"));
    }

    #[derive(Clone)]
    struct TokenEndpoint {
        audience: String,
        hits: Arc<AtomicUsize>,
    }

    async fn token_handler(
        State(endpoint): State<Arc<parking_lot::Mutex<Option<TokenEndpoint>>>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        let Some(endpoint) = endpoint.lock().clone() else {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})));
        };
        endpoint.hits.fetch_add(1, Ordering::SeqCst);

        if form.get("grant_type").map(String::as_str) != Some(JWT_BEARER_GRANT_TYPE) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "unsupported_grant_type" })),
            );
        }
        let Some(assertion) = form.get("assertion") else {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_request" })),
            );
        };
        let claims = decode_assertion(assertion, &endpoint.audience);
        assert_eq!(claims.scope, ANALYTICS_READONLY_SCOPE);

        (
            StatusCode::OK,
            Json(json!({
                "access_token": "ya29.test-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })),
        )
    }

    #[tokio::test]
    async fn exchanges_assertion_and_reuses_token_until_expiry() {
        let endpoint = Arc::new(parking_lot::Mutex::new(None));
        let app = Router::new()
            .route("/token", post(token_handler))
            .with_state(endpoint.clone());
        let server = TestHttpServer::start(app).await.expect("start server");

        let token_uri = server.url("/token");
        let hits = Arc::new(AtomicUsize::new(0));
        *endpoint.lock() = Some(TokenEndpoint {
            audience: token_uri.clone(),
            hits: hits.clone(),
        });

        let source =
            ServiceAccountTokenSource::new(reqwest::Client::new(), credentials(&token_uri))
                .expect("token source");

        let first = source.access_token().await.expect("first token");
        let second = source.access_token().await.expect("second token");
        assert_eq!(first, "ya29.test-token");
        assert_eq!(second, first);
        assert_eq!(hits.load(Ordering::SeqCst), 1, "token should be reused");

        server.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn refetches_when_token_expires_within_refresh_skew() {
        async fn short_lived(State(issued): State<Arc<AtomicUsize>>) -> Json<Value> {
            let n = issued.fetch_add(1, Ordering::SeqCst);
            Json(json!({
                "access_token": format!("ya29.short-{n}"),
                "expires_in": REFRESH_SKEW_SECS / 2,
                "token_type": "Bearer"
            }))
        }

        let issued = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/token", post(short_lived))
            .with_state(issued.clone());
        let server = TestHttpServer::start(app).await.expect("start server");

        let source = ServiceAccountTokenSource::new(
            reqwest::Client::new(),
            credentials(&server.url("/token")),
        )
        .expect("token source");

        let first = source.access_token().await.expect("first token");
        let second = source.access_token().await.expect("second token");
        assert_eq!(first, "ya29.short-0");
        assert_eq!(second, "ya29.short-1");
        assert_eq!(issued.load(Ordering::SeqCst), 2, "near-expiry token must not be reused");

        server.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn token_endpoint_html_error_is_bounded() {
        let app = Router::new().route(
            "/token",
            post(|| async {
                (
                    StatusCode::BAD_GATEWAY,
                    format!("<html>{}</html>", "upstream unavailable ".repeat(100)),
                )
            }),
        );
        let server = TestHttpServer::start(app).await.expect("start server");

        let source = ServiceAccountTokenSource::new(
            reqwest::Client::new(),
            credentials(&server.url("/token")),
        )
        .expect("token source");

        let err = source.access_token().await.expect_err("502");
        let message = err.upstream_message().expect("auth message").to_string();
        assert!(message.starts_with("token endpoint returned 502: <html>upstream"));
        assert!(message.ends_with("..."));
        assert!(!message.contains("</html>"));

        server.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn token_endpoint_rejection_surfaces_google_error_text() {
        let app = Router::new().route(
            "/token",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_grant",
                        "error_description": "Invalid JWT Signature."
                    })),
                )
            }),
        );
        let server = TestHttpServer::start(app).await.expect("start server");

        let source = ServiceAccountTokenSource::new(
            reqwest::Client::new(),
            credentials(&server.url("/token")),
        )
        .expect("token source");

        let err = source.access_token().await.expect_err("rejected");
        assert!(matches!(err, AnalyticsDataError::Auth(_)));
        assert_eq!(
            err.upstream_message(),
            Some("invalid_grant: Invalid JWT Signature.")
        );

        server.shutdown().await.expect("shutdown");
    }
}
