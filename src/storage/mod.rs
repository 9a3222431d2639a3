//! Storage gateway: pushes staged uploads to the configured bucket and makes
//! them publicly readable.
//!
//! The gateway is built once at startup. When credentials are missing or
//! invalid it is still constructed, in the [`ClientState::NotConfigured`]
//! state, so status endpoints can report what is wrong and uploads fail fast
//! without touching the network.

pub mod firebase;
pub mod s3;

use crate::config::{Config, StorageBackend};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub use firebase::FirebaseStorageClient;
pub use s3::S3StorageClient;

/// Prefix under which uploaded tracks are stored in the bucket.
pub const MUSIC_PREFIX: &str = "music";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    NotInitialized(String),

    #[error("FIREBASE_STORAGE_BUCKET environment variable not set.")]
    BucketNotConfigured,

    #[error("Storage provider rejected credentials: {0}")]
    Credentials(String),

    #[error("Storage transfer failed: {0}")]
    Transfer(String),

    #[error("Failed to read staged file: {0}")]
    Io(#[from] std::io::Error),
}

/// Minimal set of bucket operations the gateway needs from a provider.
#[async_trait]
pub trait BucketClient: Send + Sync {
    /// Upload the file at `local_path` to `key`.
    async fn upload(
        &self,
        bucket: &str,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<(), GatewayError>;

    /// Make `key` publicly readable and return its public URL.
    async fn make_public(&self, bucket: &str, key: &str) -> Result<String, GatewayError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), GatewayError>;
}

pub enum ClientState {
    Ready(Arc<dyn BucketClient>),
    NotConfigured { reason: String },
}

pub struct StorageGateway {
    backend: StorageBackend,
    client: ClientState,
    bucket: Option<String>,
    credentials_path: PathBuf,
}

/// Build the bucket key for an uploaded track.
pub fn music_key(filename: &str) -> String {
    format!("{}/{}", MUSIC_PREFIX, filename)
}

impl StorageGateway {
    pub fn new(
        backend: StorageBackend,
        client: ClientState,
        bucket: Option<String>,
        credentials_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            client,
            bucket,
            credentials_path: credentials_path.into(),
        }
    }

    /// Initialize the provider client from the credentials file named in
    /// `config`. Never fails; problems are kept for status reporting.
    pub async fn from_config(config: &Config) -> Self {
        let credentials_path = config.firebase_service_account_key_path.clone();
        let bucket = config.firebase_storage_bucket.clone();

        let client = if !tokio::fs::try_exists(&credentials_path)
            .await
            .unwrap_or(false)
        {
            tracing::warn!(
                "Service account key file not found at: {}. Storage client not initialized.",
                credentials_path.display()
            );
            ClientState::NotConfigured {
                reason: format!(
                    "Service account key not found at {}.",
                    credentials_path.display()
                ),
            }
        } else {
            let built: Result<Arc<dyn BucketClient>, GatewayError> = match config.storage_backend {
                StorageBackend::Firebase => FirebaseStorageClient::from_key_file(&credentials_path)
                    .await
                    .map(|c| Arc::new(c) as Arc<dyn BucketClient>),
                StorageBackend::S3 => S3StorageClient::from_credentials_file(&credentials_path)
                    .await
                    .map(|c| Arc::new(c) as Arc<dyn BucketClient>),
            };

            match built {
                Ok(client) => {
                    tracing::info!(
                        "{} initialized using key at {}",
                        client_label(config.storage_backend),
                        credentials_path.display()
                    );
                    ClientState::Ready(client)
                }
                Err(e) => {
                    tracing::error!(
                        "Error initializing {}: {}",
                        client_label(config.storage_backend),
                        e
                    );
                    ClientState::NotConfigured {
                        reason: format!("Failed to load credentials: {}", e),
                    }
                }
            }
        };

        match &bucket {
            Some(name) => tracing::info!("Using storage bucket: {}", name),
            None => tracing::warn!(
                "FIREBASE_STORAGE_BUCKET is not set. Uploads and the admin panel will not work."
            ),
        }

        Self::new(config.storage_backend, client, bucket, credentials_path)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.client, ClientState::Ready(_))
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Why the client could not be initialized, if it was not.
    pub fn init_failure(&self) -> Option<&str> {
        match &self.client {
            ClientState::Ready(_) => None,
            ClientState::NotConfigured { reason } => Some(reason),
        }
    }

    /// Human-readable name of the provider client, used in status messages.
    pub fn client_label(&self) -> &'static str {
        client_label(self.backend)
    }

    pub fn provider_name(&self) -> &'static str {
        match self.backend {
            StorageBackend::Firebase => "Firebase Storage",
            StorageBackend::S3 => "S3 storage",
        }
    }

    /// Every configuration problem that keeps the admin panel from working.
    pub async fn configuration_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let key_present = tokio::fs::try_exists(&self.credentials_path)
            .await
            .unwrap_or(false);
        if !key_present {
            issues.push(format!(
                "Service account key not found at: {}",
                self.credentials_path.display()
            ));
        }
        if self.bucket.is_none() {
            issues.push("FIREBASE_STORAGE_BUCKET environment variable is not set.".to_string());
        }
        if let Some(reason) = self.init_failure() {
            issues.push(format!(
                "{} is not initialized at all. {}",
                self.client_label(),
                reason
            ));
        }
        issues
    }

    fn ready(&self) -> Result<(&Arc<dyn BucketClient>, &str), GatewayError> {
        let client = match &self.client {
            ClientState::Ready(client) => client,
            ClientState::NotConfigured { reason } => {
                return Err(GatewayError::NotInitialized(format!(
                    "{} is not initialized. {}",
                    self.client_label(),
                    reason
                )))
            }
        };
        let bucket = self
            .bucket
            .as_deref()
            .ok_or(GatewayError::BucketNotConfigured)?;
        Ok((client, bucket))
    }

    /// Upload a staged file to `key`, make it public and return its URL.
    pub async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<String, GatewayError> {
        let (client, bucket) = self.ready()?;

        client.upload(bucket, local_path, key, content_type).await?;
        let url = client.make_public(bucket, key).await?;

        tracing::info!("Uploaded {} to bucket {}: {}", key, bucket, url);

        Ok(url)
    }

    /// Best-effort removal of an object that has no metadata record.
    pub async fn discard(&self, key: &str) -> Result<(), GatewayError> {
        let (client, bucket) = self.ready()?;
        client.delete(bucket, key).await
    }
}

fn client_label(backend: StorageBackend) -> &'static str {
    match backend {
        StorageBackend::Firebase => "Firebase Admin SDK",
        StorageBackend::S3 => "S3 client",
    }
}
