use serde::{Deserialize, Serialize};

/// Per-file entry of the upload negotiation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

/// Request body for `POST /trainings/generate-upload-urls`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateUploadUrlsRequest {
    pub lesson_id: i64,
    pub files: Vec<FileMetadata>,
}

/// Presigned destination returned by the negotiation call.
///
/// `upload_url` accepts one direct PUT of the file bytes with the negotiated
/// content type; `attachment_id` identifies the pending attachment record to
/// finalize afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDestination {
    pub attachment_id: i64,
    pub upload_url: String,
    pub filename: String,
}
