use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// MIME type for `.xlsx` workbooks. Every downloaded artifact carries this type.
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// MIME type for legacy `.xls` workbooks.
pub const XLS_MIME_TYPE: &str = "application/vnd.ms-excel";

/// Where the bytes of a file live.
///
/// On-disk files are only read when a submission is built, so large files that
/// fail validation are never loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSource {
    Path(Utf8PathBuf),
    Memory(Arc<[u8]>),
}

impl FileSource {
    /// Read the full contents of the file.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            FileSource::Path(path) => tokio::fs::read(path).await,
            FileSource::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// A file the user picked but that has not been validated yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub source: FileSource,
}

impl FileCandidate {
    /// Build a candidate from an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            mime_type: mime_type.into(),
            source: FileSource::Memory(bytes.into()),
        }
    }

    /// Build a candidate from a path on disk.
    ///
    /// Only the file metadata is read here. The MIME type is inferred from the
    /// extension, the way a browser file picker reports it.
    pub async fn from_path(path: &Utf8Path) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path),
            ));
        }

        let name = path.file_name().unwrap_or(path.as_str()).to_string();

        Ok(Self {
            mime_type: mime_type_for_name(&name).to_string(),
            name,
            size_bytes: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }
}

/// Guess the spreadsheet MIME type from a filename. Returns an empty string
/// for anything that is not a known spreadsheet extension.
pub fn mime_type_for_name(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".xlsx") {
        XLSX_MIME_TYPE
    } else if lower.ends_with(".xls") {
        XLS_MIME_TYPE
    } else {
        ""
    }
}

/// A file that passed validation and occupies the session's single file slot.
///
/// Only [`crate::services::validation::FileValidator`] constructs these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub(crate) name: String,
    pub(crate) size_bytes: u64,
    pub(crate) mime_type: String,
    pub(crate) source: FileSource,
}

impl SelectedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// MIME type as reported at selection time, possibly empty.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }
}

/// Imputation strategies the service understands.
///
/// The service treats these as opaque; `auto` and `pmm` currently resolve to
/// the same estimator server-side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputationMethod {
    #[default]
    Auto,
    Bayesian,
    #[serde(rename = "rf")]
    RandomForest,
    Pmm,
}

impl ImputationMethod {
    pub const ALL: [ImputationMethod; 4] = [
        ImputationMethod::Auto,
        ImputationMethod::Bayesian,
        ImputationMethod::RandomForest,
        ImputationMethod::Pmm,
    ];

    /// Wire value sent in the `method` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImputationMethod::Auto => "auto",
            ImputationMethod::Bayesian => "bayesian",
            ImputationMethod::RandomForest => "rf",
            ImputationMethod::Pmm => "pmm",
        }
    }
}

impl fmt::Display for ImputationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImputationMethod {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ParameterError::UnknownMethod(s.trim().to_string()))
    }
}

/// Default number of imputation rounds.
pub const DEFAULT_ITERATIONS: u32 = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("Unknown imputation method: {0}")]
    UnknownMethod(String),

    #[error("Iterations must be at least 1")]
    ZeroIterations,

    #[error("Iterations must be a positive whole number, got {0:?}")]
    InvalidIterations(String),
}

/// Parameters sent along with a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestParameters {
    method: ImputationMethod,
    iterations: u32,
}

impl RequestParameters {
    pub fn new(method: ImputationMethod, iterations: u32) -> Result<Self, ParameterError> {
        if iterations == 0 {
            return Err(ParameterError::ZeroIterations);
        }
        Ok(Self { method, iterations })
    }

    pub fn method(&self) -> ImputationMethod {
        self.method
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Replace the method, keeping the iteration count.
    pub fn with_method(self, method: ImputationMethod) -> Self {
        Self { method, ..self }
    }

    /// Parse an iteration count typed by the user.
    pub fn with_iterations_text(self, text: &str) -> Result<Self, ParameterError> {
        let iterations: u32 = text
            .trim()
            .parse()
            .map_err(|_| ParameterError::InvalidIterations(text.trim().to_string()))?;
        Self::new(self.method, iterations)
    }
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self {
            method: ImputationMethod::default(),
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trip_names() {
        assert_eq!("rf".parse::<ImputationMethod>().unwrap(), ImputationMethod::RandomForest);
        assert_eq!(" Bayesian ".parse::<ImputationMethod>().unwrap(), ImputationMethod::Bayesian);
        assert_eq!(ImputationMethod::Pmm.to_string(), "pmm");
        assert!(matches!(
            "mean".parse::<ImputationMethod>(),
            Err(ParameterError::UnknownMethod(m)) if m == "mean"
        ));
    }

    #[test]
    fn test_method_serde_uses_wire_names() {
        let yaml = serde_yaml_ng::to_string(&ImputationMethod::RandomForest).unwrap();
        assert_eq!(yaml.trim(), "rf");
    }

    #[test]
    fn test_parameters_reject_zero_iterations() {
        assert_eq!(
            RequestParameters::new(ImputationMethod::Auto, 0),
            Err(ParameterError::ZeroIterations)
        );
        let params = RequestParameters::default();
        assert_eq!(params.iterations(), 10);
        assert_eq!(params.method(), ImputationMethod::Auto);
    }

    #[test]
    fn test_iterations_text() {
        let params = RequestParameters::default();
        assert_eq!(params.with_iterations_text("25").unwrap().iterations(), 25);
        assert!(matches!(
            params.with_iterations_text("-3"),
            Err(ParameterError::InvalidIterations(_))
        ));
        assert_eq!(params.with_iterations_text("0"), Err(ParameterError::ZeroIterations));
    }

    #[test]
    fn test_mime_type_for_name() {
        assert_eq!(mime_type_for_name("data.XLSX"), XLSX_MIME_TYPE);
        assert_eq!(mime_type_for_name("legacy.xls"), XLS_MIME_TYPE);
        assert_eq!(mime_type_for_name("notes.csv"), "");
    }

    #[tokio::test]
    async fn test_candidate_from_path_reads_metadata() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("survey.xlsx")).unwrap();
        std::fs::write(&path, b"workbook").unwrap();

        let candidate = FileCandidate::from_path(&path).await.unwrap();
        assert_eq!(candidate.name, "survey.xlsx");
        assert_eq!(candidate.size_bytes, 8);
        assert_eq!(candidate.mime_type, XLSX_MIME_TYPE);
        assert_eq!(candidate.source.read().await.unwrap(), b"workbook");
    }

    #[tokio::test]
    async fn test_candidate_from_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        assert!(FileCandidate::from_path(&path).await.is_err());
    }
}
