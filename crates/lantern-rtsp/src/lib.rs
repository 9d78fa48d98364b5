//! lantern-rtsp: SDP/RTSP track glue for the lantern media pipeline.
//!
//! The RTSP session and RTP depacketization live upstream; this crate holds
//! the boundary pieces the muxer needs:
//!
//! - `sdp` - minimal SDP media-description model
//! - `track` - codec recognition (H.264 / AAC / Opus), H.264 track
//!   construction (fmtp, sprop-parameter-sets), control URL resolution
//! - `h264` - NAL-unit classification and AVCC framing

pub mod error;
pub mod h264;
pub mod sdp;
pub mod track;

pub use error::{Error, Result};
pub use sdp::{Attribute, MediaDescription};
pub use track::{
    h264_config_from_media_description, resolve_track_url, track_from_media_description, Track,
    TrackAac, TrackGeneric, TrackH264, TrackOpus,
};
