//! Elementary media samples flowing through the segmenter.
//!
//! Timestamps are signed nanoseconds. A sample's `duration` is the distance
//! to its successor and is filled in by the segmenter's one-sample lookahead
//! at the moment the successor arrives; a sample that never sees a successor
//! keeps duration zero.

use bytes::Bytes;

/// One H.264 access unit, ready for muxing.
#[derive(Debug, Clone, Default)]
pub struct VideoSample {
    /// Presentation timestamp in nanoseconds.
    pub pts: i64,
    /// Decode timestamp in nanoseconds.
    pub dts: i64,
    /// AVCC-framed payload (length-prefixed NAL units).
    pub avcc: Bytes,
    /// True iff any NAL unit in the access unit is an IDR slice.
    pub idr_present: bool,
    /// Decode-time distance to the next sample (`next.dts - dts`).
    pub duration: i64,
}

impl VideoSample {
    /// Composition offset (`pts - dts`), negative when presentation
    /// precedes decode order.
    pub fn composition_offset(&self) -> i64 {
        self.pts - self.dts
    }
}

/// One AAC access unit.
#[derive(Debug, Clone, Default)]
pub struct AudioSample {
    /// Presentation timestamp in nanoseconds.
    pub pts: i64,
    /// Raw AAC payload.
    pub au: Bytes,
    /// Presentation-time distance to the next sample (`next.pts - pts`).
    pub duration: i64,
}
