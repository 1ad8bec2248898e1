//! Transport position tracking.

/// Coarse transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
}

/// Position bookkeeping for a shared playback clock.
///
/// While stopped the position is `play_start_offset`. While playing it is
/// `play_start_offset + (now - start_timestamp)`. Both are clamped to
/// `[0, duration]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    state: TransportState,
    play_start_offset: f64,
    start_timestamp: f64,
    duration: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            play_start_offset: 0.0,
            start_timestamp: 0.0,
            duration: 0.0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
    }

    pub fn play_start_offset(&self) -> f64 {
        self.play_start_offset
    }

    /// Clock reading when playback last began. Meaningful only while playing.
    pub fn start_timestamp(&self) -> f64 {
        self.start_timestamp
    }

    /// Clamp `time` into `[0, duration]`. Non-finite input maps to 0.
    pub fn clamp(&self, time: f64) -> f64 {
        if !time.is_finite() {
            return if time == f64::INFINITY { self.duration } else { 0.0 };
        }
        time.max(0.0).min(self.duration)
    }

    /// Playback position at clock time `now`.
    pub fn position(&self, now: f64) -> f64 {
        match self.state {
            TransportState::Stopped => self.clamp(self.play_start_offset),
            TransportState::Playing => {
                let elapsed = (now - self.start_timestamp).max(0.0);
                self.clamp(self.play_start_offset + elapsed)
            }
        }
    }

    /// Enter `Playing` with the position anchored at `now`.
    pub fn start(&mut self, now: f64) {
        self.start_timestamp = now;
        self.state = TransportState::Playing;
    }

    /// Enter `Stopped`, freezing the position reached at `now`.
    ///
    /// # Returns
    ///
    /// The frozen position.
    pub fn pause(&mut self, now: f64) -> f64 {
        self.play_start_offset = self.position(now);
        self.state = TransportState::Stopped;
        self.play_start_offset
    }

    /// Enter `Stopped` rewound to the beginning.
    pub fn rewind(&mut self) {
        self.play_start_offset = 0.0;
        self.state = TransportState::Stopped;
    }

    /// Set the start offset directly (clamped). Only valid while stopped.
    pub fn set_offset(&mut self, offset: f64) {
        self.play_start_offset = self.clamp(offset);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(duration: f64) -> Transport {
        let mut transport = Transport::new();
        transport.set_duration(duration);
        transport
    }

    #[test]
    fn stopped_position_is_clamped_offset() {
        let mut transport = transport(10.0);
        transport.set_offset(4.0);
        assert_eq!(transport.position(100.0), 4.0);
        transport.set_duration(3.0);
        assert_eq!(transport.position(0.0), 3.0);
    }

    #[test]
    fn playing_position_advances_and_clamps() {
        let mut transport = transport(12.0);
        transport.set_offset(2.0);
        transport.start(100.0);
        assert_eq!(transport.position(100.0), 2.0);
        assert_eq!(transport.position(105.5), 7.5);
        assert_eq!(transport.position(200.0), 12.0);
    }

    #[test]
    fn pause_freezes_position() {
        let mut transport = transport(10.0);
        transport.start(1.0);
        assert_eq!(transport.pause(4.0), 3.0);
        assert!(!transport.is_playing());
        assert_eq!(transport.position(50.0), 3.0);
    }

    #[test]
    fn clamp_handles_out_of_range_and_nan() {
        let transport = transport(8.0);
        assert_eq!(transport.clamp(-5.0), 0.0);
        assert_eq!(transport.clamp(108.0), 8.0);
        assert_eq!(transport.clamp(f64::NAN), 0.0);
        assert_eq!(transport.clamp(f64::INFINITY), 8.0);
    }

    #[test]
    fn rewind_and_reset() {
        let mut transport = transport(10.0);
        transport.set_offset(6.0);
        transport.start(0.0);
        transport.rewind();
        assert_eq!(transport.play_start_offset(), 0.0);
        assert_eq!(transport.state(), TransportState::Stopped);
        transport.reset();
        assert_eq!(transport.duration(), 0.0);
    }
}
