//! Sample format conversion helpers for stem decoding.

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::sample::{i24, u24, Sample};

/// Convert a signed 24-bit sample stored in an `i32` to `f32`.
pub fn convert_signed_24bit_to_f32(sample: i32) -> f32 {
    // The 24-bit sample lives in the least significant bits.
    let shifted_sample = sample << 8 >> 8;
    shifted_sample as f32 / 2f32.powi(23)
}

/// Convert an unsigned 24-bit sample stored in a `u32` to `f32`.
pub fn convert_unsigned_24bit_to_f32(sample: u32) -> f32 {
    let shifted_sample = (sample & 0x00ff_ffff) as i32 - 2i32.pow(23);
    shifted_sample as f32 / 2f32.powi(23)
}

pub fn convert_signed_8bit_to_f32(sample: i8) -> f32 {
    sample as f32 / 2f32.powi(7)
}

pub fn convert_unsigned_8bit_to_f32(sample: u8) -> f32 {
    (sample as i16 - 2i16.pow(7)) as f32 / 2f32.powi(7)
}

pub fn convert_signed_16bit_to_f32(sample: i16) -> f32 {
    sample as f32 / 2f32.powi(15)
}

pub fn convert_unsigned_16bit_to_f32(sample: u16) -> f32 {
    (sample as i32 - 2i32.pow(15)) as f32 / 2f32.powi(15)
}

pub fn convert_signed_32bit_to_f32(sample: i32) -> f32 {
    sample as f32 / 2f32.powi(31)
}

pub fn convert_unsigned_32bit_to_f32(sample: u32) -> f32 {
    (sample as i64 - 2i64.pow(31)) as f32 / 2f32.powi(31)
}

/// Append a decoded packet to `out` as interleaved `f32` samples.
///
/// # Returns
///
/// The channel count of the packet.
pub fn append_interleaved(decoded: AudioBufferRef<'_>, out: &mut Vec<f32>) -> u16 {
    match decoded {
        AudioBufferRef::U8(buf) => interleave(&*buf, out, convert_unsigned_8bit_to_f32),
        AudioBufferRef::S8(buf) => interleave(&*buf, out, convert_signed_8bit_to_f32),
        AudioBufferRef::U16(buf) => interleave(&*buf, out, convert_unsigned_16bit_to_f32),
        AudioBufferRef::S16(buf) => interleave(&*buf, out, convert_signed_16bit_to_f32),
        AudioBufferRef::U24(buf) => interleave(&*buf, out, |s: u24| convert_unsigned_24bit_to_f32(s.0)),
        AudioBufferRef::S24(buf) => interleave(&*buf, out, |s: i24| convert_signed_24bit_to_f32(s.0)),
        AudioBufferRef::U32(buf) => interleave(&*buf, out, convert_unsigned_32bit_to_f32),
        AudioBufferRef::S32(buf) => interleave(&*buf, out, convert_signed_32bit_to_f32),
        AudioBufferRef::F32(buf) => interleave(&*buf, out, |s| s),
        AudioBufferRef::F64(buf) => interleave(&*buf, out, |s| s as f32),
    }
}

fn interleave<S: Sample>(
    buf: &AudioBuffer<S>,
    out: &mut Vec<f32>,
    convert: impl Fn(S) -> f32,
) -> u16 {
    let channels = buf.spec().channels.count().max(1);
    let frames = buf.frames();
    out.reserve(frames * channels);
    for frame in 0..frames {
        for channel in 0..channels {
            out.push(convert(buf.chan(channel)[frame]));
        }
    }
    channels as u16
}
