//! Error types for FSOP document parsing and injection

use thiserror::Error;

/// Errors raised by the FSOP core.
///
/// Heuristic misses (zero sections found, no checkbox matched a section, a
/// table cell missing) are never errors: the parser degrades to empty
/// collections instead. Only structural absence, archive failures and
/// post-injection validation failures surface here.
#[derive(Debug, Error)]
pub enum FsopError {
    /// A required package part is missing (e.g. word/document.xml)
    #[error("document part not found: {0}")]
    PartNotFound(String),

    /// The archive is not a readable ZIP container
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Underlying IO failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The document body XML is missing its essential root markers
    #[error("invalid document XML: {0}")]
    InvalidXml(String),

    /// Injection produced XML that failed post-mutation validation
    #[error("injection produced invalid XML: {0}")]
    InjectionFailed(String),

    /// An archive write would have produced an empty artifact
    #[error("archive write produced an empty artifact")]
    EmptyArtifact,

    /// JSON (de)serialization of a parse result failed
    #[error("serialization error: {0}")]
    Serialization(String),
}
