//! lantern-media: low-latency HLS segmentation core.
//!
//! Decoded-but-unmuxed access units (H.264 video, AAC audio) come in from
//! the RTSP reader; fragmented-MP4 parts and segments come out, ready for
//! LL-HLS delivery.
//!
//! # Modules
//!
//! - `sample` - elementary sample model (nanosecond timestamps)
//! - `fmp4` - fMP4 part serialization (moof + mdat, byte-exact)
//! - `hls` - part/segment rotation and the segmenter state machine
//!
//! # Architecture
//!
//! The [`hls::Segmenter`] is the single writer. It holds one sample of
//! lookahead per track so every flushed sample knows its duration, derives
//! DTS through an injected extractor, and routes samples into the live
//! segment. Parts rotate when the adjusted part duration fills; segments
//! rotate on the first IDR past the segment duration or on an SPS change.
//! Finalised parts and segments are immutable and handed to the consumer
//! as shared references.

pub mod error;
pub mod fmp4;
pub mod hls;
pub mod sample;

pub use error::{DtsExtractError, Error, Result};
pub use fmp4::{generate_part, nanos_to_timescale, VIDEO_TIMESCALE};
pub use hls::{
    Clock, DtsExtractor, DtsExtractorFactory, Part, PartsReader, Segment, SegmentSink, Segmenter,
    SegmenterConfig, TrackSource, SAMPLES_PER_ACCESS_UNIT,
};
pub use sample::{AudioSample, VideoSample};
