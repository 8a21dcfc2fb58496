//! Gatekeeping for file selection.
//!
//! A candidate is accepted when its MIME type is a spreadsheet type or its name
//! ends in `.xlsx`/`.xls` (any case), and it is no larger than 10 MiB.

use crate::models::{FileCandidate, SelectedFile, XLS_MIME_TYPE, XLSX_MIME_TYPE};
use regex::Regex;
use thiserror::Error;

/// Largest accepted upload, inclusive.
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

const ACCEPTED_MIME_TYPES: [&str; 2] = [XLSX_MIME_TYPE, XLS_MIME_TYPE];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload a valid Excel file (.xlsx or .xls)")]
    InvalidType,

    #[error("File size must be less than 10MB (got {size_bytes} bytes)")]
    TooLarge { size_bytes: u64 },
}

pub struct FileValidator {
    /// Case-insensitive spreadsheet extension match
    extension_pattern: Regex,
    max_size_bytes: u64,
}

impl FileValidator {
    pub fn new() -> Self {
        Self {
            extension_pattern: Regex::new(r"(?i)\.(xlsx|xls)$").expect("Invalid extension regex"),
            max_size_bytes: MAX_FILE_SIZE_BYTES,
        }
    }

    /// Check a candidate and promote it to a [`SelectedFile`].
    ///
    /// Type is checked before size, so an oversize text file reports
    /// `InvalidType`.
    pub fn validate(&self, candidate: FileCandidate) -> Result<SelectedFile, ValidationError> {
        let mime_ok = ACCEPTED_MIME_TYPES.contains(&candidate.mime_type.as_str());
        if !mime_ok && !self.extension_pattern.is_match(&candidate.name) {
            tracing::debug!(
                "Rejected {} (mime {:?}): not a spreadsheet",
                candidate.name,
                candidate.mime_type
            );
            return Err(ValidationError::InvalidType);
        }

        if candidate.size_bytes > self.max_size_bytes {
            tracing::debug!("Rejected {}: {} bytes", candidate.name, candidate.size_bytes);
            return Err(ValidationError::TooLarge {
                size_bytes: candidate.size_bytes,
            });
        }

        Ok(SelectedFile {
            name: candidate.name,
            size_bytes: candidate.size_bytes,
            mime_type: candidate.mime_type,
            source: candidate.source,
        })
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileSource;

    fn candidate(name: &str, mime: &str, size_bytes: u64) -> FileCandidate {
        FileCandidate {
            name: name.to_string(),
            size_bytes,
            mime_type: mime.to_string(),
            source: FileSource::Memory(Vec::new().into()),
        }
    }

    #[test]
    fn test_accepts_by_extension_any_case() {
        let validator = FileValidator::new();
        assert!(validator.validate(candidate("data.XLSX", "", 100)).is_ok());
        assert!(validator.validate(candidate("old.Xls", "application/octet-stream", 100)).is_ok());
    }

    #[test]
    fn test_accepts_by_mime_without_extension() {
        let validator = FileValidator::new();
        let selected = validator
            .validate(candidate("export", XLSX_MIME_TYPE, 42))
            .unwrap();
        assert_eq!(selected.name(), "export");
        assert_eq!(selected.size_bytes(), 42);
    }

    #[test]
    fn test_rejects_other_types() {
        let validator = FileValidator::new();
        assert_eq!(
            validator.validate(candidate("data.csv", "text/csv", 10)),
            Err(ValidationError::InvalidType)
        );
        assert_eq!(
            validator.validate(candidate("data.xlsx.bak", "", 10)),
            Err(ValidationError::InvalidType)
        );
    }

    #[test]
    fn test_size_boundary() {
        let validator = FileValidator::new();
        assert!(validator
            .validate(candidate("a.xlsx", "", MAX_FILE_SIZE_BYTES))
            .is_ok());
        assert_eq!(
            validator.validate(candidate("a.xlsx", "", MAX_FILE_SIZE_BYTES + 1)),
            Err(ValidationError::TooLarge {
                size_bytes: MAX_FILE_SIZE_BYTES + 1
            })
        );
    }

    #[test]
    fn test_type_checked_before_size() {
        let validator = FileValidator::new();
        assert_eq!(
            validator.validate(candidate("huge.txt", "text/plain", MAX_FILE_SIZE_BYTES * 2)),
            Err(ValidationError::InvalidType)
        );
    }
}
