use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown filter field '{name}'")]
    UnknownField { name: String },

    #[error("invalid value for '{field}', expected {expected}")]
    InvalidValue {
        field: &'static str,
        expected: &'static str,
    },

    #[error("bound '{field}' must be finite")]
    NonFinite { field: &'static str },

    #[error("unknown filter tag '{name}'")]
    UnknownTag { name: String },
}

impl FilterError {
    /// Stable machine-readable code, used by the JS envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::UnknownField { .. } => "unknown_field",
            FilterError::InvalidValue { .. } => "invalid_value",
            FilterError::NonFinite { .. } => "non_finite",
            FilterError::UnknownTag { .. } => "unknown_tag",
        }
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dataset must be a JSON array of records")]
    NotAnArray,

    #[error("dataset has {count} records, at most {max} are accepted")]
    TooManyRecords { count: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid dashboard config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv flush failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Failure reported by a view while applying a new subset.
#[derive(Debug, Error)]
#[error("{view}: {message}")]
pub struct ViewError {
    pub view: String,
    pub message: String,
}

impl ViewError {
    pub fn new(view: impl Into<String>, message: impl Into<String>) -> Self {
        ViewError {
            view: view.into(),
            message: message.into(),
        }
    }
}
