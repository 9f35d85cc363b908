use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::{InvoiceParserError, InvoiceParserResult};

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service-account key file this server needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// OAuth2 service-account credentials. Exchanges a signed JWT for an access
/// token and reuses it until shortly before expiry.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    scope: String,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn from_key(key: ServiceAccountKey, scope: &str) -> InvoiceParserResult<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            key,
            signing_key,
            scope: scope.to_string(),
            client: reqwest::Client::new(),
            cached: Mutex::new(None),
        })
    }

    pub fn from_file(path: &Path, scope: &str) -> InvoiceParserResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InvoiceParserError::Config(format!(
                "cannot read credentials file {}: {e}",
                path.display()
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&content).map_err(|e| {
            InvoiceParserError::Config(format!(
                "invalid service account key in {}: {e}",
                path.display()
            ))
        })?;
        tracing::info!(
            client_email = %key.client_email,
            path = %path.display(),
            "service account credentials loaded"
        );
        Self::from_key(key, scope)
    }

    /// Returns a bearer token, fetching a new one when the cached token is
    /// missing or about to expire.
    pub async fn access_token(&self) -> InvoiceParserResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> InvoiceParserResult<String> {
        let claims = build_claims(&self.key, &self.scope, now);
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        Ok(jsonwebtoken::encode(&header, &claims, &self.signing_key)?)
    }

    async fn fetch_token(&self, now: DateTime<Utc>) -> InvoiceParserResult<CachedToken> {
        let assertion = self.signed_assertion(now)?;
        tracing::debug!(token_uri = %self.key.token_uri, "requesting access token");

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InvoiceParserError::Auth(format!("{status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        tracing::info!(expires_in = token.expires_in, "access token acquired");
        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

fn build_claims<'a>(key: &'a ServiceAccountKey, scope: &'a str, now: DateTime<Utc>) -> Claims<'a> {
    let iat = now.timestamp();
    Claims {
        iss: &key.client_email,
        scope,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    }
}
