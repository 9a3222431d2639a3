//! Flat-file metadata store.
//!
//! All uploaded tracks live in a single JSON array that is read in full and
//! rewritten in full on every change. A missing or unreadable file is treated
//! as an empty list.

use crate::models::MetadataRecord;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write metadata file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode metadata: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct MetadataStore {
    path: PathBuf,
    // Serializes read-modify-write cycles issued by this process.
    append_lock: Mutex<()>,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record. Never fails: an absent or malformed file yields an
    /// empty list.
    pub async fn load(&self) -> Vec<MetadataRecord> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(
                    "Failed to read metadata file {}: {}",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        match serde_json::from_slice(&contents) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "Metadata file {} is not valid, treating as empty: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Overwrite the file with `records`.
    pub async fn save(&self, records: &[MetadataRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let encoded = encode_pretty(records)?;

        let tmp_path = tmp_path_for(&self.path);
        tokio::fs::write(&tmp_path, encoded).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    /// Append a record for a freshly uploaded file and persist it.
    ///
    /// The id is the number of existing records plus one.
    pub async fn append(&self, filename: &str, url: &str) -> Result<MetadataRecord, StoreError> {
        let _guard = self.append_lock.lock().await;

        let mut records = self.load().await;
        let record = MetadataRecord {
            id: records.len() as u64 + 1,
            filename: filename.to_string(),
            url: url.to_string(),
            uploaded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };
        records.push(record.clone());
        self.save(&records).await?;

        tracing::info!("Recorded metadata for {} (id={})", record.filename, record.id);

        Ok(record)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn encode_pretty(records: &[MetadataRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: u64, filename: &str) -> MetadataRecord {
        MetadataRecord {
            id,
            filename: filename.to_string(),
            url: format!("https://storage.googleapis.com/bucket/music/{}", filename),
            uploaded_at: "2024-05-01T12:00:00.000000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("metadata.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = MetadataStore::new(&path);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_reload_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("data").join("metadata.json"));

        let records = vec![
            record(1, "intro.mp3"),
            record(2, "b-side.wav"),
            record(3, "outro.flac"),
        ];
        store.save(&records).await.unwrap();

        assert_eq!(store.load().await, records);
        assert!(!tmp_path_for(store.path()).exists());
    }

    #[tokio::test]
    async fn test_save_uses_four_space_indent() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("metadata.json"));
        store.save(&[record(1, "a.mp3")]).await.unwrap();

        let text = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert!(text.contains("\n        \"id\": 1"));
    }

    #[tokio::test]
    async fn test_append_assigns_count_plus_one() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("metadata.json"));
        store
            .save(&[record(1, "a.mp3"), record(2, "b.mp3")])
            .await
            .unwrap();

        let added = store
            .append("c.mp3", "https://storage.googleapis.com/bucket/music/c.mp3")
            .await
            .unwrap();
        assert_eq!(added.id, 3);
        assert_eq!(added.filename, "c.mp3");
        assert!(added.uploaded_at.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&added.uploaded_at).is_ok());

        let all = store.load().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[2], added);
    }

    #[tokio::test]
    async fn test_append_over_corrupt_file_starts_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.json");
        tokio::fs::write(&path, b"[{\"id\": \"oops\"}]").await.unwrap();

        let store = MetadataStore::new(&path);
        let added = store.append("a.mp3", "https://example/a.mp3").await.unwrap();
        assert_eq!(added.id, 1);
        assert_eq!(store.load().await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_every_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(MetadataStore::new(temp_dir.path().join("metadata.json")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(&format!("track{}.mp3", i), "https://example/x")
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut ids: Vec<u64> = store.load().await.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }
}
