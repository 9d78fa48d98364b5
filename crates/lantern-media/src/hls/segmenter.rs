//! The segmenter state machine.
//!
//! Normalises incoming timestamps against the first IDR, derives DTS via
//! the injected extractor, and routes samples into the live segment. Part
//! and segment boundaries follow the LL-HLS pacing rules: parts rotate when
//! the adjusted part duration fills up, segments rotate on the first IDR at
//! or past the segment duration, or when the SPS changes.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use lantern_rtsp::h264::{avcc_marshal, NaluType};
use tracing::debug;

use super::{
    Clock, DtsExtractor, DtsExtractorFactory, IdCounter, Segment, SegmentSink, SegmenterConfig,
    TrackSource, SAMPLES_PER_ACCESS_UNIT,
};
use crate::error::Result;
use crate::sample::{AudioSample, VideoSample};

const PART_DURATION_STEP: i64 = 5_000_000; // 5 ms
const MAX_PART_DURATION: i64 = 5_000_000_000; // 5 s

/// Whole samples of `sample_duration` packed into a part must not stretch
/// it past `part_duration / 0.85`: iPhone clients reject parts shorter than
/// 85% of the longest part they have seen.
fn part_duration_is_compatible(part_duration: i64, sample_duration: i64) -> bool {
    if sample_duration > part_duration {
        return false;
    }

    let mut filled = part_duration / sample_duration;
    if part_duration % sample_duration != 0 {
        filled += 1;
    }
    filled *= sample_duration;

    part_duration > filled * 85 / 100
}

/// First duration at or above `min_part_duration` compatible with every
/// observed sample duration, probing in 5 ms steps up to 5 s.
fn find_compatible_part_duration(min_part_duration: i64, sample_durations: &HashSet<i64>) -> i64 {
    let mut candidate = min_part_duration;
    while candidate < MAX_PART_DURATION {
        let compatible = sample_durations
            .iter()
            .all(|&sd| part_duration_is_compatible(candidate, sd));
        if compatible {
            break;
        }
        candidate += PART_DURATION_STEP;
    }
    candidate
}

/// Groups incoming access units into LL-HLS parts and segments.
///
/// Single writer: `write_h264` and `write_aac` are called sequentially by
/// the upstream RTP reader, and all sink callbacks fire on that thread.
pub struct Segmenter {
    segment_duration: i64,
    part_duration: i64,
    segment_max_size: u64,
    tracks: Arc<dyn TrackSource>,
    sink: Box<dyn SegmentSink>,
    make_dts_extractor: DtsExtractorFactory,
    clock: Clock,

    start_dts: i64,
    // Some once the first IDR arrived.
    video_dts_extractor: Option<Box<dyn DtsExtractor>>,
    video_sps: Bytes,
    current_segment: Option<Segment>,
    segment_ids: IdCounter,
    part_ids: IdCounter,
    next_video_sample: Option<VideoSample>,
    next_audio_sample: Option<AudioSample>,
    first_segment_finalized: bool,
    sample_durations: HashSet<i64>,
    adjusted_part_duration: i64,
}

impl Segmenter {
    pub fn new(
        config: SegmenterConfig,
        tracks: Arc<dyn TrackSource>,
        sink: Box<dyn SegmentSink>,
        make_dts_extractor: DtsExtractorFactory,
        clock: Clock,
    ) -> Self {
        Self {
            segment_duration: config.segment_duration.as_nanos() as i64,
            part_duration: config.part_duration.as_nanos() as i64,
            segment_max_size: config.segment_max_size,
            tracks,
            sink,
            make_dts_extractor,
            clock,
            start_dts: 0,
            video_dts_extractor: None,
            video_sps: Bytes::new(),
            current_segment: None,
            segment_ids: IdCounter::new(config.segment_count),
            part_ids: IdCounter::new(0),
            next_video_sample: None,
            next_audio_sample: None,
            first_segment_finalized: false,
            sample_durations: HashSet::new(),
            adjusted_part_duration: 0,
        }
    }

    /// Widen the part duration target until every observed sample duration
    /// packs into it; frozen once the first segment is out, reset when the
    /// SPS changes.
    fn adjust_part_duration(&mut self, duration: i64) {
        if self.first_segment_finalized {
            return;
        }
        // Non-positive durations never constrain the search.
        if duration <= 0 {
            return;
        }

        if self.sample_durations.insert(duration) {
            self.adjusted_part_duration =
                find_compatible_part_duration(self.part_duration, &self.sample_durations);
        }
    }

    /// Feed one H.264 access unit.
    ///
    /// Access units without slices are dropped, as is everything before the
    /// first IDR.
    pub fn write_h264(&mut self, pts: i64, nalus: &[Bytes]) -> Result<()> {
        let mut idr_present = false;
        let mut non_idr_present = false;

        for nalu in nalus {
            match NaluType::of(nalu.first().copied().unwrap_or(0)) {
                NaluType::Idr => idr_present = true,
                NaluType::NonIdr => non_idr_present = true,
                _ => {}
            }
        }

        if !idr_present && !non_idr_present {
            return Ok(());
        }

        let avcc = Bytes::from(avcc_marshal(nalus));

        let (pts, dts) = match self.video_dts_extractor.as_mut() {
            None => {
                // Skip samples silently until one carries an IDR.
                if !idr_present {
                    debug!("dropping sample before first IDR");
                    return Ok(());
                }

                let mut extractor = (self.make_dts_extractor)();
                self.video_sps = self.tracks.video_sps();
                let dts = extractor.extract(nalus, 0)?;
                self.video_dts_extractor = Some(extractor);
                self.start_dts = dts;
                (pts - dts, 0)
            }
            Some(extractor) => {
                let dts = extractor.extract(nalus, pts)?;
                (pts - self.start_dts, dts - self.start_dts)
            }
        };

        self.write_h264_entry(VideoSample {
            pts,
            dts,
            avcc,
            idr_present,
            duration: 0,
        })
    }

    fn write_h264_entry(&mut self, incoming: VideoSample) -> Result<()> {
        let next_pts = incoming.pts;
        let next_dts = incoming.dts;
        let next_idr = incoming.idr_present;

        // One-slot lookahead: park the newest sample, flush its
        // predecessor. The first sample on the track only fills the slot.
        let Some(mut sample) = self.next_video_sample.replace(incoming) else {
            return Ok(());
        };
        sample.duration = next_dts - sample.dts;

        let now = (self.clock)();
        if self.current_segment.is_none() {
            self.current_segment = Some(Segment::new(
                self.segment_ids.next_id(),
                now,
                sample.dts,
                self.segment_max_size,
                self.tracks.clone(),
                &mut self.part_ids,
            ));
        }

        self.adjust_part_duration(sample.duration);

        if let Some(segment) = self.current_segment.as_mut() {
            segment.write_h264(
                sample,
                self.adjusted_part_duration,
                &mut self.part_ids,
                self.sink.as_mut(),
            )?;
        }

        // Segment boundaries only land on a successor IDR.
        if !next_idr {
            return Ok(());
        }

        let sps = self.tracks.video_sps();
        let sps_changed = sps != self.video_sps;

        let duration_reached = self
            .current_segment
            .as_ref()
            .is_some_and(|segment| next_dts - segment.start_dts() >= self.segment_duration);

        if duration_reached || sps_changed {
            if let Some(segment) = self.current_segment.take() {
                let finalized =
                    segment.finalize(self.next_video_sample.as_ref(), self.sink.as_mut());
                debug!(id = finalized.id(), sps_changed, "segment finalized");
                self.sink.on_segment_finalized(finalized);

                self.first_segment_finalized = true;

                // The fresh segment starts at the successor's PTS.
                self.current_segment = Some(Segment::new(
                    self.segment_ids.next_id(),
                    now,
                    next_pts,
                    self.segment_max_size,
                    self.tracks.clone(),
                    &mut self.part_ids,
                ));

                if sps_changed {
                    self.video_sps = sps;
                    self.first_segment_finalized = false;
                    self.sample_durations.clear();
                }
            }
        }

        Ok(())
    }

    /// Feed a burst of AAC access units sharing one RTP timestamp.
    pub fn write_aac(&mut self, pts: i64, access_units: &[Bytes]) -> Result<()> {
        let clock_rate = i64::from(self.tracks.audio_clock_rate());
        for (i, au) in access_units.iter().enumerate() {
            let pts =
                pts + (i as i64) * i64::from(SAMPLES_PER_ACCESS_UNIT) * 1_000_000_000 / clock_rate;
            self.write_aac_entry(AudioSample {
                pts,
                au: au.clone(),
                duration: 0,
            })?;
        }
        Ok(())
    }

    fn write_aac_entry(&mut self, mut incoming: AudioSample) -> Result<()> {
        let video_exists = self.tracks.video_track_exists();
        if video_exists {
            // Audio waits for the video track to lock the time base.
            if self.video_dts_extractor.is_none() {
                return Ok(());
            }
            incoming.pts -= self.start_dts;
        }

        let next_pts = incoming.pts;
        let Some(mut sample) = self.next_audio_sample.replace(incoming) else {
            return Ok(());
        };
        sample.duration = next_pts - sample.pts;

        let now = (self.clock)();
        if self.current_segment.is_none() {
            if video_exists {
                // The first video sample opens the segment.
                return Ok(());
            }
            self.current_segment = Some(Segment::new(
                self.segment_ids.next_id(),
                now,
                sample.pts,
                self.segment_max_size,
                self.tracks.clone(),
                &mut self.part_ids,
            ));
        }

        if let Some(segment) = self.current_segment.as_mut() {
            segment.write_aac(
                sample,
                self.part_duration,
                &mut self.part_ids,
                self.sink.as_mut(),
            )?;
        }

        // With a video track, boundaries are the video path's call.
        if video_exists {
            return Ok(());
        }

        let duration_reached = self
            .current_segment
            .as_ref()
            .is_some_and(|segment| next_pts - segment.start_dts() >= self.segment_duration);

        if duration_reached {
            if let Some(segment) = self.current_segment.take() {
                let finalized = segment.finalize(None, self.sink.as_mut());
                debug!(id = finalized.id(), "segment finalized");
                self.sink.on_segment_finalized(finalized);

                self.first_segment_finalized = true;

                self.current_segment = Some(Segment::new(
                    self.segment_ids.next_id(),
                    now,
                    next_pts,
                    self.segment_max_size,
                    self.tracks.clone(),
                    &mut self.part_ids,
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DtsExtractError, Error};
    use crate::hls::Part;
    use std::io::Read;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const SEC: i64 = 1_000_000_000;
    const MS: i64 = 1_000_000;

    struct StubTracks {
        video: bool,
        audio: bool,
        clock_rate: u32,
        sps: Mutex<Bytes>,
    }

    impl StubTracks {
        fn video_only() -> Arc<Self> {
            Arc::new(Self {
                video: true,
                audio: false,
                clock_rate: 0,
                sps: Mutex::new(Bytes::from_static(&[0x67, 0x64, 0x00, 0x1F])),
            })
        }

        fn audio_only(clock_rate: u32) -> Arc<Self> {
            Arc::new(Self {
                video: false,
                audio: true,
                clock_rate,
                sps: Mutex::new(Bytes::new()),
            })
        }

        fn both(clock_rate: u32) -> Arc<Self> {
            Arc::new(Self {
                video: true,
                audio: true,
                clock_rate,
                sps: Mutex::new(Bytes::from_static(&[0x67, 0x64, 0x00, 0x1F])),
            })
        }

        fn set_sps(&self, sps: &'static [u8]) {
            *self.sps.lock().unwrap() = Bytes::from_static(sps);
        }
    }

    impl TrackSource for StubTracks {
        fn video_track_exists(&self) -> bool {
            self.video
        }
        fn audio_track_exists(&self) -> bool {
            self.audio
        }
        fn video_sps(&self) -> Bytes {
            self.sps.lock().unwrap().clone()
        }
        fn audio_clock_rate(&self) -> u32 {
            self.clock_rate
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        parts: Arc<Mutex<Vec<Arc<Part>>>>,
        segments: Arc<Mutex<Vec<Arc<Segment>>>>,
    }

    impl RecordingSink {
        fn part_count(&self) -> usize {
            self.parts.lock().unwrap().len()
        }
        fn segments(&self) -> Vec<Arc<Segment>> {
            self.segments.lock().unwrap().clone()
        }
    }

    impl SegmentSink for RecordingSink {
        fn on_part_finalized(&mut self, part: Arc<Part>) {
            self.parts.lock().unwrap().push(part);
        }
        fn on_segment_finalized(&mut self, segment: Arc<Segment>) {
            self.segments.lock().unwrap().push(segment);
        }
    }

    /// DTS equals PTS: a stream without frame reordering.
    struct PassthroughDts;

    impl DtsExtractor for PassthroughDts {
        fn extract(
            &mut self,
            _nalus: &[Bytes],
            pts: i64,
        ) -> std::result::Result<i64, DtsExtractError> {
            Ok(pts)
        }
    }

    /// DTS lags PTS by a constant, like a stream with one B-frame of delay.
    struct LaggingDts(i64);

    impl DtsExtractor for LaggingDts {
        fn extract(
            &mut self,
            _nalus: &[Bytes],
            pts: i64,
        ) -> std::result::Result<i64, DtsExtractError> {
            Ok(pts - self.0)
        }
    }

    struct FailingDts;

    impl DtsExtractor for FailingDts {
        fn extract(
            &mut self,
            _nalus: &[Bytes],
            _pts: i64,
        ) -> std::result::Result<i64, DtsExtractError> {
            Err(DtsExtractError("unparsable slice header".into()))
        }
    }

    fn config() -> SegmenterConfig {
        SegmenterConfig {
            segment_count: 7,
            segment_duration: Duration::from_secs(2),
            part_duration: Duration::from_millis(100),
            segment_max_size: 1 << 20,
        }
    }

    fn segmenter(config: SegmenterConfig, tracks: Arc<StubTracks>, sink: RecordingSink) -> Segmenter {
        Segmenter::new(
            config,
            tracks,
            Box::new(sink),
            Box::new(|| Box::new(PassthroughDts)),
            Box::new(|| UNIX_EPOCH + Duration::from_secs(1_700_000_000)),
        )
    }

    fn idr_au() -> Vec<Bytes> {
        vec![Bytes::from_static(&[0x65, 0x88, 0x84, 0x00])]
    }

    fn non_idr_au() -> Vec<Bytes> {
        vec![Bytes::from_static(&[0x41, 0x9A, 0x24, 0x6C])]
    }

    fn params_au() -> Vec<Bytes> {
        vec![
            Bytes::from_static(&[0x67, 0x64, 0x00, 0x1F]),
            Bytes::from_static(&[0x68, 0xEE, 0x3C, 0x80]),
        ]
    }

    #[test]
    fn test_first_sample_only_fills_lookahead() {
        let sink = RecordingSink::default();
        let mut seg = segmenter(config(), StubTracks::video_only(), sink.clone());

        seg.write_h264(0, &idr_au()).unwrap();

        assert_eq!(sink.part_count(), 0);
        assert!(sink.segments().is_empty());
    }

    #[test]
    fn test_video_segment_rotation() {
        let sink = RecordingSink::default();
        let mut seg = segmenter(config(), StubTracks::video_only(), sink.clone());

        for pts in [0, SEC, 2 * SEC, 3 * SEC] {
            seg.write_h264(pts, &idr_au()).unwrap();
        }

        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id(), 7);
        assert_eq!(segments[0].name(), "seg7");
        assert_eq!(segments[0].start_dts(), 0);
        assert_eq!(segments[0].rendered_duration(), 2 * SEC);
        assert_eq!(segments[0].parts().len(), 1);
        assert_eq!(sink.part_count(), 1);
        assert_eq!(segments[0].parts()[0].id(), 0);
        assert_eq!(segments[0].parts()[0].rendered_duration(), SEC);
    }

    #[test]
    fn test_drops_before_first_idr() {
        let sink = RecordingSink::default();
        let mut seg = segmenter(config(), StubTracks::video_only(), sink.clone());

        seg.write_h264(-SEC, &non_idr_au()).unwrap();
        for pts in [0, SEC, 2 * SEC, 3 * SEC] {
            seg.write_h264(pts, &idr_au()).unwrap();
        }

        // The pre-IDR sample left no trace.
        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_dts(), 0);
        assert_eq!(segments[0].rendered_duration(), 2 * SEC);
    }

    #[test]
    fn test_parameter_set_only_au_is_ignored() {
        let sink = RecordingSink::default();
        let mut seg = segmenter(config(), StubTracks::video_only(), sink.clone());

        seg.write_h264(0, &idr_au()).unwrap();
        seg.write_h264(500 * MS, &params_au()).unwrap();
        for pts in [SEC, 2 * SEC, 3 * SEC] {
            seg.write_h264(pts, &idr_au()).unwrap();
        }

        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].rendered_duration(), 2 * SEC);
        assert_eq!(sink.part_count(), 1);
    }

    #[test]
    fn test_boundary_requires_idr_successor() {
        let sink = RecordingSink::default();
        let mut seg = segmenter(config(), StubTracks::video_only(), sink.clone());

        // Only the sample at 5s carries an IDR after the opener; the
        // boundary waits for it even though 2s passed long before.
        seg.write_h264(0, &idr_au()).unwrap();
        for pts in [SEC, 2 * SEC, 3 * SEC, 4 * SEC] {
            seg.write_h264(pts, &non_idr_au()).unwrap();
        }
        assert!(sink.segments().is_empty());

        seg.write_h264(5 * SEC, &idr_au()).unwrap();
        seg.write_h264(6 * SEC, &non_idr_au()).unwrap();

        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].rendered_duration(), 5 * SEC);
    }

    #[test]
    fn test_sps_change_forces_boundary() {
        let sink = RecordingSink::default();
        let tracks = StubTracks::video_only();
        let mut seg = segmenter(config(), tracks.clone(), sink.clone());

        seg.write_h264(0, &idr_au()).unwrap();
        seg.write_h264(500 * MS, &idr_au()).unwrap();
        assert!(sink.segments().is_empty());

        tracks.set_sps(&[0x67, 0x64, 0x00, 0x2A]);
        seg.write_h264(SEC, &idr_au()).unwrap();

        // Far below segment_duration, yet the SPS change cut it.
        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].rendered_duration(), SEC);
    }

    #[test]
    fn test_dts_extract_error_propagates() {
        let sink = RecordingSink::default();
        let mut seg = Segmenter::new(
            config(),
            StubTracks::video_only(),
            Box::new(sink),
            Box::new(|| Box::new(FailingDts)),
            Box::new(SystemTime::now),
        );

        let err = seg.write_h264(0, &idr_au()).unwrap_err();
        assert!(matches!(err, Error::DtsExtract(_)));
    }

    #[test]
    fn test_maximum_segment_size() {
        let sink = RecordingSink::default();
        let mut seg = segmenter(
            SegmenterConfig {
                segment_max_size: 5,
                ..config()
            },
            StubTracks::video_only(),
            sink.clone(),
        );

        // The AVCC form of the IDR access unit is 8 bytes, over the cap.
        seg.write_h264(0, &idr_au()).unwrap();
        let err = seg.write_h264(SEC, &idr_au()).unwrap_err();
        assert!(matches!(err, Error::MaximumSegmentSize));
    }

    #[test]
    fn test_lagging_dts_yields_composition_offsets() {
        let sink = RecordingSink::default();
        let mut seg = Segmenter::new(
            config(),
            StubTracks::video_only(),
            Box::new(sink.clone()),
            Box::new(|| Box::new(LaggingDts(500 * MS))),
            Box::new(SystemTime::now),
        );

        for pts in [0, SEC, 2 * SEC, 3 * SEC] {
            seg.write_h264(pts, &idr_au()).unwrap();
        }

        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        let part = &segments[0].parts()[0];
        let content = part.rendered_content().unwrap();

        // First trun entry: moof(8) + mfhd(16) + traf(8) + tfhd(16) +
        // tfdt(20) + trun header(20) = 88; composition offset is the
        // entry's fourth field.
        let cto = i32::from_be_bytes(content[100..104].try_into().unwrap());
        assert_eq!(cto, 45_000); // 500 ms at 90 kHz
    }

    #[test]
    fn test_audio_only_segmentation() {
        let sink = RecordingSink::default();
        let tracks = StubTracks::audio_only(44_100);
        let mut seg = segmenter(config(), tracks, sink.clone());

        let au = vec![Bytes::from_static(&[0x21, 0x10, 0x05])];
        for pts in [0, SEC, 2 * SEC, 3 * SEC] {
            seg.write_aac(pts, &au).unwrap();
        }

        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_dts(), 0);
        // Audio-only rendered duration sums the parts, whose span stops at
        // the last sample's PTS.
        assert_eq!(segments[0].rendered_duration(), SEC);
        assert_eq!(segments[0].parts().len(), 1);
        assert_eq!(sink.part_count(), 1);
    }

    #[test]
    fn test_aac_burst_expands_timestamps() {
        let sink = RecordingSink::default();
        let tracks = StubTracks::audio_only(44_100);
        let mut seg = segmenter(config(), tracks, sink.clone());

        let au = Bytes::from_static(&[0x21, 0x10]);
        seg.write_aac(0, &[au.clone(), au.clone()]).unwrap();
        seg.write_aac(2 * SEC, &[au]).unwrap();

        let per_au = i64::from(SAMPLES_PER_ACCESS_UNIT) * SEC / 44_100;
        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].rendered_duration(), per_au);
    }

    #[test]
    fn test_audio_waits_for_video() {
        let sink = RecordingSink::default();
        let tracks = StubTracks::both(44_100);
        let mut seg = segmenter(config(), tracks, sink.clone());

        let au = vec![Bytes::from_static(&[0x21, 0x10, 0x05])];

        // Dropped: no IDR seen yet.
        seg.write_aac(0, &au).unwrap();

        seg.write_h264(0, &idr_au()).unwrap();
        for pts in [100 * MS, 200 * MS, 300 * MS] {
            seg.write_aac(pts, &au).unwrap();
        }
        for pts in [SEC, 2 * SEC, 3 * SEC] {
            seg.write_h264(pts, &idr_au()).unwrap();
        }

        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        // The boundary comes from the video track.
        assert_eq!(segments[0].rendered_duration(), 2 * SEC);
    }

    #[test]
    fn test_reader_concatenates_parts() {
        let sink = RecordingSink::default();
        let mut seg = segmenter(config(), StubTracks::video_only(), sink.clone());

        // One IDR-led GOP of non-IDR frames, closed by the next IDR: the
        // single finalised segment carries several rotated parts.
        seg.write_h264(0, &idr_au()).unwrap();
        for pts in [SEC, 2 * SEC, 3 * SEC, 4 * SEC] {
            seg.write_h264(pts, &non_idr_au()).unwrap();
        }
        seg.write_h264(5 * SEC, &idr_au()).unwrap();
        seg.write_h264(6 * SEC, &non_idr_au()).unwrap();

        let segments = sink.segments();
        assert_eq!(segments.len(), 1);
        let segment = &segments[0];
        assert_eq!(segment.parts().len(), 3);

        let mut whole = Vec::new();
        segment.reader().read_to_end(&mut whole).unwrap();
        let expected: Vec<u8> = segment
            .parts()
            .iter()
            .filter_map(|p| p.rendered_content())
            .flat_map(|c| c.to_vec())
            .collect();
        assert_eq!(whole, expected);

        // Small-buffer reads cross part boundaries without loss.
        let mut reader = segment.reader();
        let mut pieced = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            pieced.extend_from_slice(&buf[..n]);
        }
        assert_eq!(pieced, expected);

        // The stream parses as moof+mdat pairs.
        let mut pos = 0;
        let mut boxes = Vec::new();
        while pos + 8 <= whole.len() {
            let size = u32::from_be_bytes(whole[pos..pos + 4].try_into().unwrap()) as usize;
            boxes.push(whole[pos + 4..pos + 8].to_vec());
            assert!(size >= 8 && pos + size <= whole.len());
            pos += size;
        }
        assert_eq!(pos, whole.len());
        assert!(!boxes.is_empty());
        assert_eq!(boxes.len() % 2, 0);
        for pair in boxes.chunks(2) {
            assert_eq!(pair[0], b"moof");
            assert_eq!(pair[1], b"mdat");
        }
    }

    #[test]
    fn test_part_duration_compatibility() {
        assert!(part_duration_is_compatible(SEC, 40 * MS));
        assert!(!part_duration_is_compatible(SEC, 300 * MS));
        assert!(!part_duration_is_compatible(SEC, 2 * SEC));
    }

    #[test]
    fn test_find_compatible_part_duration_exact_divisor() {
        let durations = HashSet::from([40 * MS]);
        assert_eq!(find_compatible_part_duration(SEC, &durations), SEC);
    }

    #[test]
    fn test_find_compatible_part_duration_steps_up() {
        // 300 ms samples: 1000..1020 ms all fall at or below 85% of the
        // 1200 ms fill, 1025 ms is the first candidate above it.
        let durations = HashSet::from([300 * MS]);
        assert_eq!(find_compatible_part_duration(SEC, &durations), 1025 * MS);
    }

    #[test]
    fn test_find_compatible_part_duration_fractional_frame_rate() {
        let durations = HashSet::from([33_333_333]);
        assert_eq!(
            find_compatible_part_duration(100 * MS, &durations),
            115 * MS
        );
    }

    #[test]
    fn test_find_compatible_part_duration_gives_up_at_cap() {
        let durations = HashSet::from([6 * SEC]);
        assert_eq!(
            find_compatible_part_duration(100 * MS, &durations),
            MAX_PART_DURATION
        );
    }
}
