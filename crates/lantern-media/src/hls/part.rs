//! A sub-segment fragment.

use std::sync::Arc;

use bytes::Bytes;

use super::TrackSource;
use crate::fmp4;
use crate::sample::{AudioSample, VideoSample};

/// One LL-HLS part: buffers samples while live, then owns its serialized
/// moof+mdat bytes once finalised.
pub struct Part {
    id: u64,
    tracks: Arc<dyn TrackSource>,
    videos: Vec<VideoSample>,
    audios: Vec<AudioSample>,
    rendered_content: Option<Bytes>,
    rendered_duration: i64,
}

impl Part {
    pub(super) fn new(id: u64, tracks: Arc<dyn TrackSource>) -> Self {
        Self {
            id,
            tracks,
            videos: Vec::new(),
            audios: Vec::new(),
            rendered_content: None,
            rendered_duration: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub(super) fn write_h264(&mut self, sample: VideoSample) {
        self.videos.push(sample);
    }

    pub(super) fn write_aac(&mut self, sample: AudioSample) {
        self.audios.push(sample);
    }

    /// Media duration covered so far: presentation span of the video
    /// samples, or of the audio samples when there is no video track. Zero
    /// while empty.
    pub fn duration(&self) -> i64 {
        if self.tracks.video_track_exists() {
            match (self.videos.first(), self.videos.last()) {
                (Some(first), Some(last)) => last.pts - first.pts,
                _ => 0,
            }
        } else {
            match (self.audios.first(), self.audios.last()) {
                (Some(first), Some(last)) => last.pts - first.pts,
                _ => 0,
            }
        }
    }

    /// Serialize the buffered samples. A part that never received a sample
    /// stays unrendered and is discarded by its segment.
    pub(super) fn finalize(&mut self) {
        if self.videos.is_empty() && self.audios.is_empty() {
            return;
        }
        self.rendered_duration = self.duration();
        self.rendered_content = Some(fmp4::generate_part(
            self.tracks.audio_track_exists(),
            self.tracks.audio_clock_rate(),
            &self.videos,
            &self.audios,
        ));
    }

    /// Serialized moof+mdat bytes; present iff the part was finalised with
    /// at least one sample.
    pub fn rendered_content(&self) -> Option<&Bytes> {
        self.rendered_content.as_ref()
    }

    pub fn rendered_duration(&self) -> i64 {
        self.rendered_duration
    }
}
