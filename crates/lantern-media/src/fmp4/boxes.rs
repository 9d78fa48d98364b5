//! ISO BMFF box-writing primitives for movie fragments.
//!
//! Boxes are appended to a `BytesMut`; container sizes and trun data
//! offsets are written as placeholders and patched once the enclosing
//! layout is known.

use bytes::{BufMut, BytesMut};

/// Start a box: placeholder size plus type. Returns the start offset for
/// [`end_box`].
pub(crate) fn begin_box(buf: &mut BytesMut, box_type: &[u8; 4]) -> usize {
    let start = buf.len();
    buf.put_u32(0); // size, patched by end_box
    buf.put_slice(box_type);
    start
}

/// Patch the size of a box opened with [`begin_box`].
pub(crate) fn end_box(buf: &mut BytesMut, start: usize) {
    let size = (buf.len() - start) as u32;
    buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
}

/// Overwrite a previously written u32 field.
pub(crate) fn patch_u32(buf: &mut BytesMut, pos: usize, value: u32) {
    buf[pos..pos + 4].copy_from_slice(&value.to_be_bytes());
}

/// Movie fragment header. The muxer addresses parts by id, not sequence
/// number, so callers pass 0.
pub(crate) fn write_mfhd(buf: &mut BytesMut, sequence_number: u32) {
    buf.put_u32(16);
    buf.put_slice(b"mfhd");
    buf.put_u32(0); // version 0, flags 0
    buf.put_u32(sequence_number);
}

/// Track fragment header with the default-base-is-moof flag.
pub(crate) fn write_tfhd(buf: &mut BytesMut, track_id: u32) {
    buf.put_u32(16);
    buf.put_slice(b"tfhd");
    buf.put_u32(0x020000); // version 0, flags: default-base-is-moof
    buf.put_u32(track_id);
}

/// Track fragment decode time, version 1 (64-bit).
pub(crate) fn write_tfdt(buf: &mut BytesMut, base_media_decode_time: i64) {
    buf.put_u32(20);
    buf.put_slice(b"tfdt");
    buf.put_u32(0x01000000); // version 1, flags 0
    buf.put_i64(base_media_decode_time);
}

/// One video trun entry, already rescaled to timescale ticks.
pub(crate) struct VideoRunEntry {
    pub duration: i32,
    pub size: u32,
    pub flags: u32,
    pub composition_offset: i32,
}

/// Video track run: version 1, per-sample duration, size, flags, and signed
/// composition time offset. Returns the position of the data-offset field
/// for patching via [`patch_u32`].
pub(crate) fn write_video_trun(buf: &mut BytesMut, entries: &[VideoRunEntry]) -> usize {
    buf.put_u32((20 + 16 * entries.len()) as u32);
    buf.put_slice(b"trun");
    buf.put_u32(0x01000f01); // version 1, flags: data offset + per-sample fields
    buf.put_u32(entries.len() as u32);
    let data_offset_pos = buf.len();
    buf.put_u32(0); // patched once the moof size is known
    for entry in entries {
        buf.put_i32(entry.duration);
        buf.put_u32(entry.size);
        buf.put_u32(entry.flags);
        buf.put_i32(entry.composition_offset);
    }
    data_offset_pos
}

/// One audio trun entry, already rescaled to timescale ticks.
pub(crate) struct AudioRunEntry {
    pub duration: i32,
    pub size: u32,
}

/// Audio track run: version 0, per-sample duration and size. Returns the
/// position of the data-offset field.
pub(crate) fn write_audio_trun(buf: &mut BytesMut, entries: &[AudioRunEntry]) -> usize {
    buf.put_u32((20 + 8 * entries.len()) as u32);
    buf.put_slice(b"trun");
    buf.put_u32(0x00000301); // version 0, flags: data offset + duration + size
    buf.put_u32(entries.len() as u32);
    let data_offset_pos = buf.len();
    buf.put_u32(0);
    for entry in entries {
        buf.put_i32(entry.duration);
        buf.put_u32(entry.size);
    }
    data_offset_pos
}
