//! LL-HLS segmentation: parts, segments, and the segmenter state machine.
//!
//! The upstream RTP reader feeds decoded access units into [`Segmenter`];
//! samples accumulate in the live [`Part`] of the live [`Segment`], and
//! finalised parts/segments are handed to a [`SegmentSink`] as shared,
//! immutable references. All writes happen on one thread; readers only see
//! finalised objects.

mod part;
mod segment;
mod segmenter;

pub use part::Part;
pub use segment::{PartsReader, Segment};
pub use segmenter::Segmenter;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::DtsExtractError;

/// PCM samples carried by every AAC access unit.
pub const SAMPLES_PER_ACCESS_UNIT: u32 = 1024;

/// Read-only view of the negotiated track set.
///
/// Backed by the RTSP session; `video_sps` may change mid-stream when the
/// source re-negotiates, which forces a segment boundary.
pub trait TrackSource: Send + Sync {
    fn video_track_exists(&self) -> bool;
    fn audio_track_exists(&self) -> bool;
    /// Current SPS bytes of the video track; empty when there is none.
    fn video_sps(&self) -> Bytes;
    /// Audio sampling rate in Hz, e.g. 44100 or 48000.
    fn audio_clock_rate(&self) -> u32;
}

/// Consumer of finalised parts and segments.
///
/// Both callbacks run synchronously on the writer's thread and must not
/// block beyond brief critical sections. The passed objects are immutable;
/// keep the `Arc` to retain them past the callback.
pub trait SegmentSink: Send {
    fn on_part_finalized(&mut self, part: Arc<Part>);
    fn on_segment_finalized(&mut self, segment: Arc<Segment>);
}

/// Derives decode timestamps from H.264 access units.
///
/// Successive calls over a codec-conforming stream yield monotonically
/// non-decreasing DTS values.
pub trait DtsExtractor: Send {
    fn extract(&mut self, nalus: &[Bytes], pts: i64) -> Result<i64, DtsExtractError>;
}

/// Factory invoked once the first IDR arrives.
pub type DtsExtractorFactory = Box<dyn Fn() -> Box<dyn DtsExtractor> + Send>;

/// Wall-clock source for segment start times; injected so tests stay
/// deterministic.
pub type Clock = Box<dyn Fn() -> SystemTime + Send>;

/// Tuning knobs of the segmenter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Number of segments the playlist advertises; seeds the first segment
    /// id so the sequence keeps climbing across muxer restarts.
    pub segment_count: u64,
    /// Minimum duration of a segment; boundaries land on the first IDR at
    /// or past it.
    pub segment_duration: Duration,
    /// Minimum duration of a part, before per-stream adjustment.
    pub part_duration: Duration,
    /// Cap on a segment's summed sample payload, in bytes.
    pub segment_max_size: u64,
}

/// Monotonic id dispenser shared by segment and part numbering.
#[derive(Debug, Default)]
pub(crate) struct IdCounter(u64);

impl IdCounter {
    pub(crate) fn new(start: u64) -> Self {
        Self(start)
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}
