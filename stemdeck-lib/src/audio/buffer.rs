//! Decoded, immutable stem audio.

/// Interleaved `f32` samples for one stem.
///
/// Buffers are never mutated after decoding; the engine shares them across
/// play cycles behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct StemBuffer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl StemBuffer {
    /// Wrap interleaved samples.
    ///
    /// `channels` and `sample_rate` are clamped to at least 1, and a trailing
    /// partial frame is dropped.
    pub fn from_interleaved(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let mut samples = samples;
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Self {
            samples,
            channels,
            sample_rate: sample_rate.max(1),
        }
    }

    /// A buffer of digital silence lasting `seconds`.
    pub fn silence(channels: u16, sample_rate: u32, seconds: f64) -> Self {
        let channels = channels.max(1);
        let frames = (seconds.max(0.0) * sample_rate.max(1) as f64).round() as usize;
        Self::from_interleaved(vec![0.0; frames * channels as usize], channels, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Index into `samples()` of the first sample at `offset` seconds.
    ///
    /// Offsets past the end map to `samples().len()`.
    pub fn sample_index_at(&self, offset: f64) -> usize {
        if !offset.is_finite() || offset <= 0.0 {
            return 0;
        }
        let frame = (offset * self.sample_rate as f64).floor() as usize;
        frame
            .saturating_mul(self.channels as usize)
            .min(self.samples.len())
    }

    /// Seconds of audio left when playback starts at `offset`.
    pub fn remaining_after(&self, offset: f64) -> f64 {
        (self.duration() - offset.max(0.0)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_frames_and_rate() {
        let buffer = StemBuffer::from_interleaved(vec![0.0; 8_000], 2, 1_000);
        assert_eq!(buffer.frames(), 4_000);
        assert!((buffer.duration() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn partial_frame_is_dropped() {
        let buffer = StemBuffer::from_interleaved(vec![0.1, 0.2, 0.3], 2, 10);
        assert_eq!(buffer.samples(), &[0.1, 0.2]);
    }

    #[test]
    fn sample_index_is_frame_aligned_and_clamped() {
        let buffer = StemBuffer::silence(2, 100, 1.0);
        assert_eq!(buffer.sample_index_at(-1.0), 0);
        assert_eq!(buffer.sample_index_at(0.5), 100);
        assert_eq!(buffer.sample_index_at(0.505), 100);
        assert_eq!(buffer.sample_index_at(3.0), 200);
    }

    #[test]
    fn remaining_never_negative() {
        let buffer = StemBuffer::silence(1, 10, 10.0);
        assert!((buffer.remaining_after(4.0) - 6.0).abs() < 1e-9);
        assert_eq!(buffer.remaining_after(11.0), 0.0);
    }
}
