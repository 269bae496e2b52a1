use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Unsupported file format: {0}. Use CSV, TSV, or TXT files")]
    UnsupportedFormat(String),

    #[error("No numeric data found for analysis")]
    NoNumericData,

    #[error("At least 2 numeric columns required, found {0}")]
    InsufficientColumns(usize),

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Insufficient data for differential analysis: {0}")]
    InsufficientData(String),

    #[error("No data found for conditions: {0} or {1}")]
    NoGroupData(String, String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ML error: {0}")]
    Ml(String),
}

impl AnalysisError {
    /// Stable identifier for the error kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DatasetNotFound(_) => "dataset_not_found",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::NoNumericData => "no_numeric_data",
            Self::InsufficientColumns(_) => "insufficient_columns",
            Self::UnsupportedMethod(_) => "unsupported_method",
            Self::InsufficientData(_) => "insufficient_data",
            Self::NoGroupData(..) => "no_group_data",
            Self::ColumnNotFound(_) => "column_not_found",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::Csv(_) | Self::Io(_) | Self::Json(_) | Self::Ml(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
