use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Which bucket provider the storage gateway talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Firebase,
    S3,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // Storage credentials
    #[serde(default)]
    pub storage_backend: StorageBackend,
    #[serde(default = "default_service_account_key_path")]
    pub firebase_service_account_key_path: PathBuf,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub firebase_storage_bucket: Option<String>,

    // Local state
    #[serde(default = "default_metadata_file")]
    pub metadata_file: PathBuf,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,

    // Reject uploads whose extension is not a known audio format
    #[serde(default)]
    pub restrict_to_audio: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_service_account_key_path() -> PathBuf {
    PathBuf::from("firebase-admin-sdk-key.json")
}

fn default_metadata_file() -> PathBuf {
    PathBuf::from("./data/metadata.json")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./static")
}

fn default_max_file_size() -> u64 {
    100
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn from_iter<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn max_request_body_bytes(&self) -> usize {
        // Allow some overhead for multipart boundaries/headers.
        let bytes = self
            .max_file_size_mb
            .saturating_add(10)
            .saturating_mul(1024 * 1024);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
