//! Test utilities: an in-memory bucket client and a router over temp dirs.

use async_trait::async_trait;
use radio_backend::config::StorageBackend;
use radio_backend::storage::{BucketClient, ClientState, GatewayError};
use radio_backend::{create_router, AppState, Config, StorageGateway};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const TEST_BUCKET: &str = "radio-app.appspot.com";

/// In-memory bucket. Optionally fails every upload.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeBucket {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub public: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_uploads: bool,
}

#[allow(dead_code)]
impl FakeBucket {
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Default::default()
        }
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn upload_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl BucketClient for FakeBucket {
    async fn upload(
        &self,
        _bucket: &str,
        local_path: &Path,
        key: &str,
        _content_type: &str,
    ) -> Result<(), GatewayError> {
        if self.fail_uploads {
            return Err(GatewayError::Transfer(
                "simulated transfer error from upstream.example".to_string(),
            ));
        }
        let data = tokio::fs::read(local_path).await?;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn make_public(&self, bucket: &str, key: &str) -> Result<String, GatewayError> {
        self.public.lock().unwrap().push(key.to_string());
        Ok(format!("https://storage.googleapis.com/{}/{}", bucket, key))
    }

    async fn delete(&self, _bucket: &str, key: &str) -> Result<(), GatewayError> {
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

/// Accepts the upload call and never finishes it.
#[allow(dead_code)]
pub struct HangingBucket;

#[async_trait]
impl BucketClient for HangingBucket {
    async fn upload(
        &self,
        _bucket: &str,
        _local_path: &Path,
        _key: &str,
        _content_type: &str,
    ) -> Result<(), GatewayError> {
        std::future::pending().await
    }

    async fn make_public(&self, bucket: &str, key: &str) -> Result<String, GatewayError> {
        Ok(format!("https://storage.googleapis.com/{}/{}", bucket, key))
    }

    async fn delete(&self, _bucket: &str, _key: &str) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// A router wired to temp directories.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub bucket: Option<Arc<FakeBucket>>,
    pub temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    fn config(temp_dir: &TempDir, bucket: Option<&str>) -> Config {
        let mut vars = vec![
            (
                "FIREBASE_SERVICE_ACCOUNT_KEY_PATH".to_string(),
                path_string(&temp_dir.path().join("firebase-admin-sdk-key.json")),
            ),
            (
                "METADATA_FILE".to_string(),
                path_string(&temp_dir.path().join("data").join("metadata.json")),
            ),
            (
                "UPLOAD_DIR".to_string(),
                path_string(&temp_dir.path().join("uploads")),
            ),
            (
                "STATIC_DIR".to_string(),
                path_string(&temp_dir.path().join("static")),
            ),
            ("MAX_FILE_SIZE_MB".to_string(), "1".to_string()),
        ];
        if let Some(bucket) = bucket {
            vars.push(("FIREBASE_STORAGE_BUCKET".to_string(), bucket.to_string()));
        }
        Config::from_iter(vars).expect("test config")
    }

    fn build(
        temp_dir: TempDir,
        config: Config,
        client: ClientState,
        bucket: Option<Arc<FakeBucket>>,
    ) -> Self {
        std::fs::create_dir_all(&config.upload_dir).expect("create upload dir");

        let storage = StorageGateway::new(
            StorageBackend::Firebase,
            client,
            config.firebase_storage_bucket.clone(),
            config.firebase_service_account_key_path.clone(),
        );
        let state = Arc::new(AppState::new(config, storage).expect("templates"));
        let router = create_router(state.clone());

        Self {
            router,
            state,
            bucket,
            temp_dir,
        }
    }

    fn configured(client: Arc<dyn BucketClient>, bucket: Option<Arc<FakeBucket>>) -> Self {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            temp_dir.path().join("firebase-admin-sdk-key.json"),
            b"{\"type\": \"service_account\"}",
        )
        .expect("write key file");

        let config = Self::config(&temp_dir, Some(TEST_BUCKET));
        Self::build(temp_dir, config, ClientState::Ready(client), bucket)
    }

    /// Fully configured app backed by `bucket`.
    pub fn with_bucket(bucket: FakeBucket) -> Self {
        let bucket = Arc::new(bucket);
        Self::configured(bucket.clone(), Some(bucket))
    }

    /// Fully configured app backed by an arbitrary client.
    pub fn with_client(client: Arc<dyn BucketClient>) -> Self {
        Self::configured(client, None)
    }

    pub fn new() -> Self {
        Self::with_bucket(FakeBucket::default())
    }

    /// No key file, no bucket variable.
    pub fn unconfigured() -> Self {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = Self::config(&temp_dir, None);
        let reason = format!(
            "Service account key not found at {}.",
            config.firebase_service_account_key_path.display()
        );
        Self::build(temp_dir, config, ClientState::NotConfigured { reason }, None)
    }

    /// Client initialized, but no bucket variable.
    pub fn without_bucket() -> Self {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            temp_dir.path().join("firebase-admin-sdk-key.json"),
            b"{\"type\": \"service_account\"}",
        )
        .expect("write key file");

        let config = Self::config(&temp_dir, None);
        let bucket = Arc::new(FakeBucket::default());
        Self::build(
            temp_dir,
            config,
            ClientState::Ready(bucket.clone()),
            Some(bucket),
        )
    }

    pub fn fake(&self) -> &FakeBucket {
        self.bucket.as_deref().expect("app has a fake bucket")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.state.config.metadata_file.clone()
    }

    pub fn staged_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.state.config.upload_dir)
            .expect("read upload dir")
            .map(|entry| entry.expect("dir entry").path())
            .collect()
    }
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

pub const BOUNDARY: &str = "radio-test-boundary";

/// One part of a multipart body.
#[allow(dead_code)]
pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

#[allow(dead_code)]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
