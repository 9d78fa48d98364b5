//! A segment: an ordered list of finalised parts plus one live part.

use std::io::Read;
use std::sync::Arc;
use std::time::SystemTime;

use super::{IdCounter, Part, SegmentSink, TrackSource};
use crate::error::{Error, Result};
use crate::sample::{AudioSample, VideoSample};

/// One HLS segment. Mutable only while live; [`Segment::finalize`] consumes
/// the live segment and returns the immutable, shareable form.
pub struct Segment {
    id: u64,
    start_time: SystemTime,
    start_dts: i64,
    segment_max_size: u64,
    tracks: Arc<dyn TrackSource>,

    size: u64,
    parts: Vec<Arc<Part>>,
    // Some for the entire life of a mutable segment; finalize takes it.
    current_part: Option<Part>,
    rendered_duration: i64,
}

impl Segment {
    pub(super) fn new(
        id: u64,
        start_time: SystemTime,
        start_dts: i64,
        segment_max_size: u64,
        tracks: Arc<dyn TrackSource>,
        part_ids: &mut IdCounter,
    ) -> Self {
        let current_part = Part::new(part_ids.next_id(), tracks.clone());
        Self {
            id,
            start_time,
            start_dts,
            segment_max_size,
            tracks,
            size: 0,
            parts: Vec::new(),
            current_part: Some(current_part),
            rendered_duration: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Playlist name of this segment.
    pub fn name(&self) -> String {
        format!("seg{}", self.id)
    }

    /// Wall-clock time the segment was opened.
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// DTS of the first video sample (PTS of the first audio sample on
    /// audio-only streams), in nanoseconds.
    pub fn start_dts(&self) -> i64 {
        self.start_dts
    }

    /// Finalised parts, ordered by part id.
    pub fn parts(&self) -> &[Arc<Part>] {
        &self.parts
    }

    /// Media duration, set at finalization. Nanoseconds.
    pub fn rendered_duration(&self) -> i64 {
        self.rendered_duration
    }

    pub(super) fn write_h264(
        &mut self,
        sample: VideoSample,
        adjusted_part_duration: i64,
        part_ids: &mut IdCounter,
        sink: &mut dyn SegmentSink,
    ) -> Result<()> {
        let size = sample.avcc.len() as u64;
        if self.size + size > self.segment_max_size {
            return Err(Error::MaximumSegmentSize);
        }

        if let Some(part) = self.current_part.as_mut() {
            part.write_h264(sample);
            self.size += size;

            if part.duration() >= adjusted_part_duration {
                self.rotate_part(part_ids, sink);
            }
        }
        Ok(())
    }

    pub(super) fn write_aac(
        &mut self,
        sample: AudioSample,
        adjusted_part_duration: i64,
        part_ids: &mut IdCounter,
        sink: &mut dyn SegmentSink,
    ) -> Result<()> {
        let size = sample.au.len() as u64;
        if self.size + size > self.segment_max_size {
            return Err(Error::MaximumSegmentSize);
        }

        if let Some(part) = self.current_part.as_mut() {
            part.write_aac(sample);
            self.size += size;

            // Audio alone never rotates a part; audio-only streams cut
            // parts at segment boundaries instead.
            if self.tracks.video_track_exists() && part.duration() >= adjusted_part_duration {
                self.rotate_part(part_ids, sink);
            }
        }
        Ok(())
    }

    fn rotate_part(&mut self, part_ids: &mut IdCounter, sink: &mut dyn SegmentSink) {
        if let Some(mut part) = self.current_part.take() {
            part.finalize();
            let part = Arc::new(part);
            self.parts.push(part.clone());
            sink.on_part_finalized(part);
        }
        self.current_part = Some(Part::new(part_ids.next_id(), self.tracks.clone()));
    }

    /// Close the segment: flush the live part and fix the rendered
    /// duration. `next_video_sample` is the lookahead sample that triggered
    /// the boundary; audio-only streams pass `None` and sum their parts.
    pub(super) fn finalize(
        mut self,
        next_video_sample: Option<&VideoSample>,
        sink: &mut dyn SegmentSink,
    ) -> Arc<Segment> {
        if let Some(mut part) = self.current_part.take() {
            part.finalize();
            if part.rendered_content().is_some() {
                let part = Arc::new(part);
                sink.on_part_finalized(part.clone());
                self.parts.push(part);
            }
        }

        self.rendered_duration = if self.tracks.video_track_exists() {
            next_video_sample.map_or(0, |next| next.dts - self.start_dts)
        } else {
            self.parts.iter().map(|p| p.rendered_duration()).sum()
        };

        Arc::new(self)
    }

    /// Streaming view over the concatenated rendered parts.
    pub fn reader(&self) -> PartsReader {
        PartsReader {
            parts: self.parts.clone(),
            current_part: 0,
            position: 0,
        }
    }
}

/// Reads the rendered content of a finalised segment's parts back to back.
pub struct PartsReader {
    parts: Vec<Arc<Part>>,
    current_part: usize,
    position: usize,
}

impl Read for PartsReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut n = 0;
        loop {
            if self.current_part >= self.parts.len() {
                return Ok(n); // n == 0 signals end of stream
            }

            let content = match self.parts[self.current_part].rendered_content() {
                Some(content) => content,
                None => {
                    self.current_part += 1;
                    self.position = 0;
                    continue;
                }
            };

            let remaining = &content[self.position..];
            let copied = remaining.len().min(buf.len() - n);
            buf[n..n + copied].copy_from_slice(&remaining[..copied]);
            self.position += copied;
            n += copied;

            if self.position == content.len() {
                self.current_part += 1;
                self.position = 0;
            }
            if n == buf.len() {
                return Ok(n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::UNIX_EPOCH;

    struct VideoTracks;

    impl TrackSource for VideoTracks {
        fn video_track_exists(&self) -> bool {
            true
        }
        fn audio_track_exists(&self) -> bool {
            false
        }
        fn video_sps(&self) -> Bytes {
            Bytes::new()
        }
        fn audio_clock_rate(&self) -> u32 {
            0
        }
    }

    #[derive(Default)]
    struct CountingSink {
        parts: usize,
    }

    impl SegmentSink for CountingSink {
        fn on_part_finalized(&mut self, _part: Arc<Part>) {
            self.parts += 1;
        }
        fn on_segment_finalized(&mut self, _segment: Arc<Segment>) {}
    }

    fn sample(pts: i64, payload: &'static [u8]) -> VideoSample {
        VideoSample {
            pts,
            dts: pts,
            avcc: Bytes::from_static(payload),
            idr_present: false,
            duration: 0,
        }
    }

    #[test]
    fn test_empty_segment_discards_its_part() {
        let mut ids = IdCounter::new(0);
        let mut sink = CountingSink::default();
        let segment = Segment::new(3, UNIX_EPOCH, 0, 1024, Arc::new(VideoTracks), &mut ids);
        assert_eq!(segment.name(), "seg3");

        let finalized = segment.finalize(None, &mut sink);
        assert!(finalized.parts().is_empty());
        assert_eq!(finalized.rendered_duration(), 0);
        assert_eq!(sink.parts, 0);

        let mut buf = [0u8; 16];
        assert_eq!(finalized.reader().read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_rejects_sample_past_size_cap() {
        let mut ids = IdCounter::new(0);
        let mut sink = CountingSink::default();
        let mut segment = Segment::new(0, UNIX_EPOCH, 0, 4, Arc::new(VideoTracks), &mut ids);

        let err = segment
            .write_h264(sample(0, b"abcdefgh"), i64::MAX, &mut ids, &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::MaximumSegmentSize));
    }

    #[test]
    fn test_part_rotation_keeps_segment_size() {
        let mut ids = IdCounter::new(0);
        let mut sink = CountingSink::default();
        let mut segment = Segment::new(0, UNIX_EPOCH, 0, 10, Arc::new(VideoTracks), &mut ids);

        // Rotation happens immediately with a zero part target, but the
        // size cap spans all parts of the segment.
        segment
            .write_h264(sample(0, b"abcd"), 0, &mut ids, &mut sink)
            .unwrap();
        segment
            .write_h264(sample(1, b"efgh"), 0, &mut ids, &mut sink)
            .unwrap();
        assert_eq!(sink.parts, 2);

        let err = segment
            .write_h264(sample(2, b"ijkl"), 0, &mut ids, &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::MaximumSegmentSize));
    }
}
