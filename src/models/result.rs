use serde::{Deserialize, Serialize};

/// The two shapes a successful submission can take.
///
/// Serverless deployments return the workbook inline as base64; a long-running
/// service keeps it and hands back an id to fetch it with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessingResult {
    InlinePayload { encoded_bytes: String, filename: String },
    ReferencePayload { file_id: String },
}

impl ProcessingResult {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingResult::InlinePayload { .. } => "inline",
            ProcessingResult::ReferencePayload { .. } => "reference",
        }
    }
}

/// Per-request statistics reported by the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub missing_filled: u64,
    pub total_rows: u64,
    pub total_cols: u64,
    #[serde(default)]
    pub missing_before: Option<u64>,
    #[serde(default)]
    pub missing_after: Option<u64>,
}

impl Stats {
    /// One-line summary used in logs and the console view.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} missing values filled across {} rows x {} columns",
            self.missing_filled, self.total_rows, self.total_cols
        );
        if let (Some(before), Some(after)) = (self.missing_before, self.missing_after) {
            summary.push_str(&format!(" ({} missing before, {} after)", before, after));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_deserialize_without_optional_counts() {
        let stats: Stats =
            serde_json::from_str(r#"{"missing_filled": 4, "total_rows": 10, "total_cols": 3}"#)
                .unwrap();
        assert_eq!(stats.missing_filled, 4);
        assert_eq!(stats.missing_before, None);
        assert_eq!(stats.summary(), "4 missing values filled across 10 rows x 3 columns");
    }

    #[test]
    fn test_stats_summary_with_before_after() {
        let stats = Stats {
            missing_filled: 5,
            total_rows: 20,
            total_cols: 4,
            missing_before: Some(6),
            missing_after: Some(1),
        };
        assert!(stats.summary().ends_with("(6 missing before, 1 after)"));
    }

    #[test]
    fn test_result_kind() {
        let inline = ProcessingResult::InlinePayload {
            encoded_bytes: String::new(),
            filename: "out.xlsx".into(),
        };
        let reference = ProcessingResult::ReferencePayload { file_id: "abc".into() };
        assert_eq!(inline.kind(), "inline");
        assert_eq!(reference.kind(), "reference");
    }
}
