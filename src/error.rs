// built-in
use std::fmt;

// external
use thiserror::Error;

/// Which external call an [`IngestError::ExternalService`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embed,
    DescribeIndex,
    Upsert,
    Stats,
    CreateIndex,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Embed => "embed",
            Stage::DescribeIndex => "describe-index",
            Stage::Upsert => "upsert",
            Stage::Stats => "stats",
            Stage::CreateIndex => "create-index",
        };
        f.write_str(s)
    }
}

/// Every way a load run can fail. All variants are fatal to the run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing or unusable credential/setting, raised before any I/O.
    #[error("config error: {0}")]
    Config(String),

    /// Input file missing, unreadable, or not the expected JSON shape.
    #[error("format error in {path}: {message}")]
    Format { path: String, message: String },

    /// A record lacks a field the entry needs.
    #[error("validation error: record #{position} ({id}): missing or empty field `{field}`")]
    Validation {
        position: usize,
        id: String,
        field: &'static str,
    },

    /// An embedding or index call failed (transport, status, or response shape).
    #[error("{stage} failed{}: {message}", record_suffix(.record))]
    ExternalService {
        stage: Stage,
        record: Option<String>,
        message: String,
    },

    /// Writer-stage rejection of a vector whose length is not the index dimension.
    #[error("upsert rejected: vector for `{id}` has dimension {actual}, index expects {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
}

impl IngestError {
    pub(crate) fn external(stage: Stage, record: Option<&str>, message: impl Into<String>) -> Self {
        IngestError::ExternalService {
            stage,
            record: record.map(str::to_owned),
            message: message.into(),
        }
    }

    pub(crate) fn format(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        IngestError::Format {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

fn record_suffix(record: &Option<String>) -> String {
    match record {
        Some(id) => format!(" for record `{id}`"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_error_names_stage_and_record() {
        let err = IngestError::external(Stage::Embed, Some("Dr. Smith"), "HTTP 500");
        let msg = err.to_string();
        assert!(msg.contains("embed failed"));
        assert!(msg.contains("`Dr. Smith`"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn external_error_without_record() {
        let err = IngestError::external(Stage::Stats, None, "timed out");
        assert_eq!(err.to_string(), "stats failed: timed out");
    }

    #[test]
    fn validation_error_names_field() {
        let err = IngestError::Validation {
            position: 3,
            id: "Dr. Lee".into(),
            field: "subject",
        };
        assert!(err.to_string().contains("record #3"));
        assert!(err.to_string().contains("`subject`"));
    }
}
