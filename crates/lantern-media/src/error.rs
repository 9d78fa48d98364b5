//! Error types for lantern-media.

use thiserror::Error;

/// Result type for lantern-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the segmentation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Appending the sample would push the segment past its size cap.
    #[error("reached maximum segment size")]
    MaximumSegmentSize,

    /// The DTS extractor rejected the access unit.
    #[error("extract DTS: {0}")]
    DtsExtract(#[from] DtsExtractError),
}

/// Error produced by a [`DtsExtractor`](crate::hls::DtsExtractor)
/// implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DtsExtractError(pub String);
