//! Error taxonomy for the extraction and aggregation pipeline.

use thiserror::Error;

/// Errors raised by parsing, validation and aggregation.
///
/// Record-level variants (`MissingField`, `UnsupportedType`, `Parse`) are
/// recoverable at the batch-driver layer: bulk extraction may log the
/// offending record and continue. Aggregation and interval-construction
/// errors always propagate to the top of the run so a partial aggregate is
/// never written to disk.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("required attribute `{0}` is missing")]
    MissingField(&'static str),

    #[error("record type `{0}` is not supported")]
    UnsupportedType(String),

    #[error("field `{field}` has unparseable value `{value}`")]
    Parse { field: &'static str, value: String },

    #[error("range error: {0}")]
    Range(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ETL operations.
pub type EtlResult<T> = Result<T, EtlError>;

impl EtlError {
    /// Whether a bulk-extraction driver may skip the offending record and
    /// keep going. Everything else is fatal to the run.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            EtlError::MissingField(_) | EtlError::UnsupportedType(_) | EtlError::Parse { .. }
        )
    }
}
