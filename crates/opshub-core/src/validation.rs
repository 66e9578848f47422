//! Attachment pre-validation.
//!
//! Mirrors the backend's allow-list and size cap so obviously invalid files can
//! be rejected before negotiation. The server remains authoritative.

use crate::models::FileMetadata;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Content types accepted for lesson attachments.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "video/mp4",
    "video/webm",
    "application/pdf",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "application/zip",
];

const EXTENSION_MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("pdf", "application/pdf"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("txt", "text/plain"),
    ("zip", "application/zip"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentRejection {
    #[error("File type '{mime_type}' for '{filename}' is not allowed.")]
    UnsupportedType { filename: String, mime_type: String },

    #[error("File '{filename}' exceeds the max size of {max_mb} MB.")]
    TooLarge { filename: String, max_mb: u64 },

    #[error("File '{0}' is empty.")]
    Empty(String),
}

/// Content type for a filename, by extension. Unknown extensions fall back to
/// `application/octet-stream`.
pub fn mime_for_filename(filename: &str) -> &'static str {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return DEFAULT_MIME_TYPE;
    };
    let ext = ext.to_lowercase();
    EXTENSION_MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

pub fn validate_attachment(
    file: &FileMetadata,
    max_size_bytes: u64,
) -> Result<(), AttachmentRejection> {
    if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(AttachmentRejection::UnsupportedType {
            filename: file.filename.clone(),
            mime_type: file.mime_type.clone(),
        });
    }
    if file.size == 0 {
        return Err(AttachmentRejection::Empty(file.filename.clone()));
    }
    if file.size > max_size_bytes {
        return Err(AttachmentRejection::TooLarge {
            filename: file.filename.clone(),
            max_mb: max_size_bytes / 1024 / 1024,
        });
    }
    Ok(())
}

/// Validate every file, collecting all rejections rather than stopping at the first.
pub fn validate_selection(
    files: &[FileMetadata],
    max_size_bytes: u64,
) -> Result<(), Vec<AttachmentRejection>> {
    let rejections: Vec<_> = files
        .iter()
        .filter_map(|f| validate_attachment(f, max_size_bytes).err())
        .collect();
    if rejections.is_empty() {
        Ok(())
    } else {
        Err(rejections)
    }
}

/// Human-readable byte count, e.g. "1.5 KB".
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(filename: &str, size: u64) -> FileMetadata {
        FileMetadata {
            filename: filename.to_string(),
            mime_type: mime_for_filename(filename).to_string(),
            size,
        }
    }

    #[test]
    fn mime_lookup_is_case_insensitive() {
        assert_eq!(mime_for_filename("Report.PDF"), "application/pdf");
        assert_eq!(mime_for_filename("photo.jpeg"), "image/jpeg");
        assert_eq!(mime_for_filename("archive.tar.gz"), DEFAULT_MIME_TYPE);
        assert_eq!(mime_for_filename("Makefile"), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn rejects_unknown_type_and_oversize() {
        let max = 1024 * 1024;
        assert!(validate_attachment(&meta("a.pdf", 10), max).is_ok());
        assert_eq!(
            validate_attachment(&meta("a.exe", 10), max),
            Err(AttachmentRejection::UnsupportedType {
                filename: "a.exe".to_string(),
                mime_type: DEFAULT_MIME_TYPE.to_string(),
            })
        );
        assert_eq!(
            validate_attachment(&meta("big.mp4", max + 1), max),
            Err(AttachmentRejection::TooLarge {
                filename: "big.mp4".to_string(),
                max_mb: 1,
            })
        );
        assert_eq!(
            validate_attachment(&meta("empty.txt", 0), max),
            Err(AttachmentRejection::Empty("empty.txt".to_string()))
        );
    }

    #[test]
    fn selection_collects_all_rejections() {
        let files = vec![meta("ok.png", 5), meta("bad.exe", 5), meta("bad.bin", 5)];
        let rejections = validate_selection(&files, 1024).unwrap_err();
        assert_eq!(rejections.len(), 2);
    }

    #[test]
    fn format_bytes_matches_ui_rendering() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(500), "500 Bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1 MB");
    }
}
