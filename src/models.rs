use serde::{Deserialize, Serialize};

/// One uploaded track as persisted in the metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: u64,
    pub filename: String,
    pub url: String,
    pub uploaded_at: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_info: MetadataRecord,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(rename = "storageBucket")]
    pub storage_bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
