//! Error types for lantern-rtsp.

use thiserror::Error;

/// Result type for lantern-rtsp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for SDP track recognition and construction.
#[derive(Debug, Error)]
pub enum Error {
    /// The `m=` line or rtpmap carried a payload type that is not a u8.
    #[error("invalid payload type '{0}'")]
    PayloadTypeInvalid(String),

    /// The `m=` line carried no payload formats.
    #[error("no formats provided")]
    NoFormats,

    /// No `a=rtpmap` attribute on a media that requires one.
    #[error("attribute 'rtpmap' not found")]
    RtpMapMissing,

    /// The `a=rtpmap` attribute did not parse as `<pt> <codec>/<clock>`.
    #[error("invalid rtpmap '{0}'")]
    RtpMapInvalid(String),

    /// Control URL is relative but no Content-Base was provided.
    #[error("no Content-Base header provided")]
    ContentBaseMissing,

    /// Control attribute did not parse as a URL.
    #[error("invalid control URL: {0}")]
    ControlUrlInvalid(#[from] url::ParseError),

    /// SPS shorter than the 4 bytes needed for profile-level-id.
    #[error("invalid SPS")]
    SpsInvalid,

    /// No `a=fmtp` attribute on an H.264 media.
    #[error("fmtp attribute is missing")]
    FmtpMissing,

    /// The `a=fmtp` attribute is malformed.
    #[error("invalid fmtp attribute ({0})")]
    FmtpInvalid(String),

    /// `sprop-parameter-sets` present but undecodable.
    #[error("invalid sprop-parameter-sets ({0})")]
    SpropInvalid(String),

    /// H.264 fmtp without `sprop-parameter-sets`.
    #[error("sprop-parameter-sets is missing ({0})")]
    SpropMissing(String),
}
