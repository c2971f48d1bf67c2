//! Error handling for the pipeline engine
//!
//! This module defines the infrastructure error type and a Result alias used
//! throughout the crate. Stage-level failures are NOT represented here: the
//! engine protocol reports those as negative error codes plus messages on the
//! message channel (see `pipeline::stage`). `PipeflowError` covers the things
//! that genuinely abort an operation: document IO, malformed files, registry
//! misses, host misuse.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pipeline infrastructure operations
#[derive(Error, Debug)]
pub enum PipeflowError {
    /// A pipeline document referenced a stage class the registry cannot build
    #[error("Unknown stage class: {0}")]
    UnknownStageClass(String),

    /// A pipeline file path carried an extension no reader handles
    #[error("Unsupported pipeline file extension: {0:?}")]
    UnsupportedExtension(PathBuf),

    /// A pipeline file was syntactically readable but structurally invalid
    #[error("Malformed pipeline document: {0}")]
    Malformed(String),

    /// Errors from the execution host state machine
    #[error("Host error: {0}")]
    Host(#[from] crate::pipeline::host::HostError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for pipeline infrastructure operations
pub type Result<T> = std::result::Result<T, PipeflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipeflowError::UnknownStageClass("FooStage".to_string());
        assert_eq!(err.to_string(), "Unknown stage class: FooStage");
    }

    #[test]
    fn test_unsupported_extension_display() {
        let err = PipeflowError::UnsupportedExtension(PathBuf::from("pipeline.yaml"));
        assert!(err.to_string().contains("pipeline.yaml"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: PipeflowError = io.into();
        assert!(matches!(err, PipeflowError::Io(_)));
    }
}
