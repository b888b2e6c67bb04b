use thiserror::Error;

/// Error categories for the reporting pipeline.
///
/// Per-cell parse failures are not errors — they become nulls and are
/// counted in the load report. Everything that must stop a computation and
/// be named to the user goes through this enum.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A column required for the requested computation was never resolved
    /// from the uploaded file.
    #[error("required column not found in the uploaded file: {name}")]
    MissingColumn { name: String },

    /// A merge over the contracts file was requested but no contracts file
    /// is available.
    #[error("a contracts file is required for this view; none was loaded")]
    MissingContracts,

    /// A ratio or gap metric has fewer than the minimum required non-null
    /// observations. Surfaced as a notice, never as a zero.
    #[error("not enough data to compute {metric}")]
    InsufficientData { metric: String },

    #[error("workbook has no worksheets")]
    EmptyWorkbook,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] calamine::XlsxError),
}

impl ReportError {
    pub fn missing_column(name: impl Into<String>) -> Self {
        ReportError::MissingColumn { name: name.into() }
    }

    pub fn insufficient(metric: impl Into<String>) -> Self {
        ReportError::InsufficientData {
            metric: metric.into(),
        }
    }
}
