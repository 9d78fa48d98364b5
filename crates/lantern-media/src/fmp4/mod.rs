//! fMP4 part serialization.
//!
//! An LL-HLS part is one `moof` box followed by one `mdat` box. The moof
//! carries an `mfhd` (sequence number 0), then a video `traf` when video
//! samples are present, then an audio `traf` when the part carries audio.
//! Each traf's trun points at its track's byte group inside the mdat
//! payload; the payload is all video bytes followed by all audio bytes, in
//! trun order.
//!
//! The byte layout is the wire contract with LL-HLS clients and is pinned
//! by the fixtures in this module's tests. Serialization is two-pass: boxes
//! are laid out with placeholder offsets, then the data offsets are patched
//! once the moof size is known.

mod boxes;

use bytes::{BufMut, Bytes, BytesMut};

use crate::sample::{AudioSample, VideoSample};
use boxes::{AudioRunEntry, VideoRunEntry};

/// MP4 timescale of H.264 video tracks.
pub const VIDEO_TIMESCALE: u32 = 90_000;

const VIDEO_TRACK_ID: u32 = 1;
const AUDIO_TRACK_ID: u32 = 2;

/// Non-sync sample flags (`sample_is_non_sync_sample`); sync samples get 0.
const SAMPLE_FLAG_NON_SYNC: u32 = 0x00010000;

/// Rescale a nanosecond duration to MP4 timescale ticks, rounding to the
/// nearest tick with halves away from zero. Negative inputs stay negative;
/// the box writers encode them as 32-bit two's complement.
pub fn nanos_to_timescale(v: i64, timescale: u32) -> i64 {
    let n = i128::from(v) * i128::from(timescale);
    let rounded = if n >= 0 {
        (n + 500_000_000) / 1_000_000_000
    } else {
        (n - 500_000_000) / 1_000_000_000
    };
    rounded as i64
}

/// Serialize one part from its buffered samples.
///
/// `has_audio` gates the audio traf: it is written only when the mux has an
/// audio track and the part holds at least one audio sample. Video and
/// audio timestamps are rescaled to 90 kHz and `audio_clock_rate`
/// respectively.
pub fn generate_part(
    has_audio: bool,
    audio_clock_rate: u32,
    videos: &[VideoSample],
    audios: &[AudioSample],
) -> Bytes {
    let write_video = !videos.is_empty();
    let write_audio = has_audio && !audios.is_empty();

    let video_data_size: usize = if write_video {
        videos.iter().map(|s| s.avcc.len()).sum()
    } else {
        0
    };
    let audio_data_size: usize = if write_audio {
        audios.iter().map(|s| s.au.len()).sum()
    } else {
        0
    };

    let mut buf = BytesMut::with_capacity(
        192 + 16 * videos.len() + 8 * audios.len() + video_data_size + audio_data_size,
    );

    let moof_start = boxes::begin_box(&mut buf, b"moof");
    boxes::write_mfhd(&mut buf, 0);

    let mut video_offset_pos = None;
    if write_video {
        let traf_start = boxes::begin_box(&mut buf, b"traf");
        boxes::write_tfhd(&mut buf, VIDEO_TRACK_ID);
        boxes::write_tfdt(&mut buf, nanos_to_timescale(videos[0].dts, VIDEO_TIMESCALE));
        let entries: Vec<VideoRunEntry> = videos
            .iter()
            .map(|s| VideoRunEntry {
                duration: nanos_to_timescale(s.duration, VIDEO_TIMESCALE) as i32,
                size: s.avcc.len() as u32,
                flags: if s.idr_present { 0 } else { SAMPLE_FLAG_NON_SYNC },
                composition_offset: nanos_to_timescale(s.composition_offset(), VIDEO_TIMESCALE)
                    as i32,
            })
            .collect();
        video_offset_pos = Some(boxes::write_video_trun(&mut buf, &entries));
        boxes::end_box(&mut buf, traf_start);
    }

    let mut audio_offset_pos = None;
    if write_audio {
        let traf_start = boxes::begin_box(&mut buf, b"traf");
        boxes::write_tfhd(&mut buf, AUDIO_TRACK_ID);
        boxes::write_tfdt(&mut buf, nanos_to_timescale(audios[0].pts, audio_clock_rate));
        let entries: Vec<AudioRunEntry> = audios
            .iter()
            .map(|s| AudioRunEntry {
                duration: nanos_to_timescale(s.duration, audio_clock_rate) as i32,
                size: s.au.len() as u32,
            })
            .collect();
        audio_offset_pos = Some(boxes::write_audio_trun(&mut buf, &entries));
        boxes::end_box(&mut buf, traf_start);
    }

    boxes::end_box(&mut buf, moof_start);

    // Each trun's data offset runs from the start of the moof to the first
    // byte of that track's group inside the mdat payload.
    let moof_size = buf.len();
    if let Some(pos) = video_offset_pos {
        boxes::patch_u32(&mut buf, pos, (moof_size + 8) as u32);
    }
    if let Some(pos) = audio_offset_pos {
        boxes::patch_u32(&mut buf, pos, (moof_size + 8 + video_data_size) as u32);
    }

    buf.put_u32((8 + video_data_size + audio_data_size) as u32);
    buf.put_slice(b"mdat");
    if write_video {
        for sample in videos {
            buf.put_slice(&sample.avcc);
        }
    }
    if write_audio {
        for sample in audios {
            buf.put_slice(&sample.au);
        }
    }

    buf.freeze()
}
