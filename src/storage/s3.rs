//! S3-compatible bucket client (AWS S3, Cloudflare R2, MinIO, GCS interop).

use super::{BucketClient, GatewayError};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use serde::Deserialize;
use std::path::Path;

/// Contents of the credentials file when `STORAGE_BACKEND=s3`.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Base URL objects are publicly served from, if it differs from the endpoint.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_region() -> String {
    "auto".to_string()
}

#[derive(Clone)]
pub struct S3StorageClient {
    client: aws_sdk_s3::Client,
    endpoint_url: String,
    public_base_url: Option<String>,
}

impl S3StorageClient {
    pub fn new(credentials: S3Credentials) -> Self {
        // Built directly from the credentials file; no aws-config provider chain.
        let s3_config = aws_sdk_s3::Config::builder()
            .endpoint_url(&credentials.endpoint_url)
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None,
                None,
                "radio-backend",
            ))
            .region(aws_sdk_s3::config::Region::new(credentials.region.clone()))
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            endpoint_url: credentials.endpoint_url,
            public_base_url: credentials.public_base_url,
        }
    }

    pub async fn from_credentials_file(path: &Path) -> Result<Self, GatewayError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let credentials: S3Credentials = serde_json::from_str(&contents).map_err(|e| {
            GatewayError::Credentials(format!("Failed to parse S3 credentials: {}", e))
        })?;
        Ok(Self::new(credentials))
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        object_url(
            &self.endpoint_url,
            self.public_base_url.as_deref(),
            bucket,
            key,
        )
    }
}

fn object_url(endpoint_url: &str, public_base_url: Option<&str>, bucket: &str, key: &str) -> String {
    match public_base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!("{}/{}/{}", endpoint_url.trim_end_matches('/'), bucket, key),
    }
}

#[async_trait]
impl BucketClient for S3StorageClient {
    async fn upload(
        &self,
        bucket: &str,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<(), GatewayError> {
        let data = tokio::fs::read(local_path).await?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| GatewayError::Transfer(format!("Failed to upload file: {}", e)))?;

        Ok(())
    }

    async fn make_public(&self, bucket: &str, key: &str) -> Result<String, GatewayError> {
        self.client
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| GatewayError::Transfer(format!("Failed to make file public: {}", e)))?;

        Ok(self.object_url(bucket, key))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), GatewayError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| GatewayError::Transfer(format!("Failed to delete file: {}", e)))?;

        Ok(())
    }
}
