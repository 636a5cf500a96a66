//! Import run configuration.
//!
//! # Responsibility
//! - Carry caller-chosen knobs for one import run.
//! - Provide defaults suitable for JSON exports from the web app.
//!
//! # Invariants
//! - Options are plain data passed explicitly; nothing is read from globals.

use serde::{Deserialize, Serialize};

/// Declared origin format of the raw records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    #[default]
    Json,
    Csv,
    Xlsx,
}

impl SourceFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "xlsx" | "excel" => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Whether cells arrive flattened to scalars (nested arrays become text).
    pub fn is_tabular(self) -> bool {
        matches!(self, Self::Csv | Self::Xlsx)
    }
}

/// Whether a graph with fatal errors may still be committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    #[default]
    RejectFatal,
    /// Caller accepts fatal errors and commits anyway.
    AllowFatal,
}

/// Options for one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportOptions {
    pub format: SourceFormat,
    /// Emit `UnmappedField` warnings for unknown record fields.
    pub report_unmapped_fields: bool,
    pub commit_policy: CommitPolicy,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            format: SourceFormat::Json,
            report_unmapped_fields: true,
            commit_policy: CommitPolicy::RejectFatal,
        }
    }
}

impl ImportOptions {
    pub fn with_format(format: SourceFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommitPolicy, ImportOptions, SourceFormat};

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let options: ImportOptions =
            serde_json::from_value(serde_json::json!({ "format": "xlsx" })).unwrap();
        assert_eq!(options.format, SourceFormat::Xlsx);
        assert!(options.report_unmapped_fields);
        assert_eq!(options.commit_policy, CommitPolicy::RejectFatal);
    }

    #[test]
    fn format_parse_is_case_insensitive() {
        assert_eq!(SourceFormat::parse(" CSV "), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::parse("excel"), Some(SourceFormat::Xlsx));
        assert_eq!(SourceFormat::parse("yaml"), None);
    }
}
