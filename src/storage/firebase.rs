//! Firebase Storage client.
//!
//! Talks to the Google Cloud Storage JSON API behind a Firebase project.
//! Access tokens come from the service-account key: an RS256-signed JWT is
//! exchanged at the key's `token_uri` and cached until shortly before expiry.

use super::{BucketClient, GatewayError};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const GCS_API_BASE: &str = "https://storage.googleapis.com";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.full_control";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

/// Fields of a Google service-account key file that are needed here.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
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
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    TOKEN_LIFETIME_SECS as u64
}

#[derive(Debug, Serialize)]
struct AclEntry<'a> {
    entity: &'a str,
    role: &'a str,
}

struct CachedToken {
    access_token: String,
    expiry: Instant,
}

pub struct FirebaseStorageClient {
    http: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    api_base: String,
    token_cache: Mutex<Option<CachedToken>>,
}

impl FirebaseStorageClient {
    pub fn new(key: ServiceAccountKey) -> Result<Self, GatewayError> {
        if key.key_type != "service_account" {
            return Err(GatewayError::Credentials(format!(
                "unsupported credential type: {}",
                key.key_type
            )));
        }

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| GatewayError::Credentials(format!("invalid private key: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| GatewayError::Transfer(format!("Failed to create HTTP client: {}", e)))?;

        if let Some(project) = &key.project_id {
            tracing::debug!("Loaded service account {} for project {}", key.client_email, project);
        }

        Ok(Self {
            http,
            key,
            encoding_key,
            api_base: GCS_API_BASE.to_string(),
            token_cache: Mutex::new(None),
        })
    }

    pub async fn from_key_file(path: &Path) -> Result<Self, GatewayError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let key: ServiceAccountKey = serde_json::from_str(&contents).map_err(|e| {
            GatewayError::Credentials(format!("Failed to parse service account key: {}", e))
        })?;
        Self::new(key)
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut cache = self.token_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.expiry > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let token = self.fetch_access_token().await?;
        let expiry = Instant::now()
            + Duration::from_secs(token.expires_in.saturating_sub(TOKEN_REFRESH_MARGIN_SECS));
        *cache = Some(CachedToken {
            access_token: token.access_token.clone(),
            expiry,
        });

        Ok(token.access_token)
    }

    async fn fetch_access_token(&self) -> Result<TokenResponse, GatewayError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: STORAGE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let assertion = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Credentials(format!("Failed to sign token request: {}", e)))?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| GatewayError::Transfer(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Credentials(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| GatewayError::Transfer(format!("Invalid token response: {}", e)))
    }

    /// `{api_base}/{segments...}` with each segment percent-encoded.
    fn api_url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| GatewayError::Transfer(format!("Invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transfer("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Public URL of an object made readable by `allUsers`.
pub fn public_url(bucket: &str, key: &str) -> Result<String, GatewayError> {
    let mut url = Url::parse(GCS_API_BASE)
        .map_err(|e| GatewayError::Transfer(format!("Invalid API base URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| GatewayError::Transfer("API base URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push(bucket)
        .extend(key.split('/'));
    Ok(url.to_string())
}

async fn check_response(
    response: reqwest::Response,
    action: &str,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Credentials(
            format!("{} ({}): {}", action, status, body),
        )),
        _ => Err(GatewayError::Transfer(format!(
            "{} ({}): {}",
            action, status, body
        ))),
    }
}

#[async_trait]
impl BucketClient for FirebaseStorageClient {
    async fn upload(
        &self,
        bucket: &str,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<(), GatewayError> {
        let data = tokio::fs::read(local_path).await?;
        let token = self.access_token().await?;
        let url = self.api_url(&["upload", "storage", "v1", "b", bucket, "o"])?;

        tracing::debug!("Uploading {} bytes to gs://{}/{}", data.len(), bucket, key);

        let response = self
            .http
            .post(url)
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| GatewayError::Transfer(format!("Failed to upload file: {}", e)))?;

        check_response(response, "Failed to upload file").await?;
        Ok(())
    }

    async fn make_public(&self, bucket: &str, key: &str) -> Result<String, GatewayError> {
        let token = self.access_token().await?;
        let url = self.api_url(&["storage", "v1", "b", bucket, "o", key, "acl"])?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&AclEntry {
                entity: "allUsers",
                role: "READER",
            })
            .send()
            .await
            .map_err(|e| GatewayError::Transfer(format!("Failed to make file public: {}", e)))?;

        check_response(response, "Failed to make file public").await?;
        public_url(bucket, key)
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), GatewayError> {
        let token = self.access_token().await?;
        let url = self.api_url(&["storage", "v1", "b", bucket, "o", key])?;

        let response = self
            .http
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::Transfer(format!("Failed to delete file: {}", e)))?;

        check_response(response, "Failed to delete file").await?;
        Ok(())
    }
}
