//! Data output writers

pub mod csv;
pub mod path;

pub use self::csv::{write_with_metadata, CsvTableWriter};
pub use path::OutputPathBuilder;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
