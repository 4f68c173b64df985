//! Object-store XML wire formats for the multipart lifecycle.

use serde::{Deserialize, Serialize};

use crate::error::BreakwaterError;

/// Response body of an initiate-multipart-upload call (`POST ?uploads`).
#[derive(Debug, Deserialize)]
#[serde(rename = "InitiateMultipartUploadResult")]
pub struct InitiateMultipartUploadResult {
    #[serde(rename = "Bucket", default)]
    pub bucket: Option<String>,
    #[serde(rename = "Key", default)]
    pub key: Option<String>,
    #[serde(rename = "UploadId", default)]
    pub upload_id: Option<String>,
}

impl InitiateMultipartUploadResult {
    /// Parse the store's XML and extract the upload id. A 2xx response
    /// without an `UploadId` element is a hard error, never a silent blank.
    pub fn parse_upload_id(xml: &str) -> Result<String, BreakwaterError> {
        let parsed: InitiateMultipartUploadResult = quick_xml::de::from_str(xml)?;
        parsed
            .upload_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                BreakwaterError::Xml("InitiateMultipartUploadResult missing UploadId".to_string())
            })
    }
}

/// One completed part in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletedPart {
    #[serde(rename = "PartNumber", alias = "partNumber")]
    pub part_number: u32,
    #[serde(rename = "ETag", alias = "etag")]
    pub etag: String,
}

/// Manifest submitted to finalize a multipart upload.
#[derive(Debug, Serialize)]
#[serde(rename = "CompleteMultipartUpload")]
pub struct CompleteMultipartUpload {
    #[serde(rename = "Part")]
    pub parts: Vec<CompletedPart>,
}

impl CompleteMultipartUpload {
    /// Build a manifest with parts sorted ascending by part number. The
    /// store rejects out-of-order manifests, so input order is irrelevant.
    pub fn new(mut parts: Vec<CompletedPart>) -> Self {
        parts.sort_by_key(|p| p.part_number);
        Self { parts }
    }

    pub fn to_xml(&self) -> Result<String, BreakwaterError> {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&quick_xml::se::to_string(self)?);
        Ok(xml)
    }
}
