//! Transport operations for `StemEngine`.
//!
//! Every command runs to completion before returning. Pending source
//! completions are applied first so a song that already ended is observed as
//! stopped.

use log::{debug, info};

use super::super::transport::TransportState;
use super::{StemEngine, TransportSnapshot};

impl StemEngine {
    /// Start every stem from the current offset. No-op while playing or with
    /// no stems loaded.
    pub fn play(&mut self) {
        self.process_events();
        if self.transport.is_playing() {
            return;
        }
        if self.mix.is_empty() {
            debug!("play requested with no stems loaded");
            return;
        }

        // Nothing should be live while stopped; clear anything left over.
        self.terminate_all_sources();

        let offset = self.transport.play_start_offset();
        for name in self.mix.names() {
            self.spawn_source(&name, offset);
        }
        self.transport.start(self.clock.now());
        info!("playing {} stems from {:.3}s", self.scheduler.len(), offset);
    }

    /// Freeze the position and discard all sources. No-op while stopped.
    pub fn pause(&mut self) {
        self.process_events();
        if !self.transport.is_playing() {
            return;
        }

        let position = self.transport.pause(self.clock.now());
        self.terminate_all_sources();
        info!("paused at {:.3}s", position);
    }

    /// Move the playback position to `time`, clamped to `[0, duration]`.
    ///
    /// While playing, sources are discarded and restarted at the new offset.
    pub fn seek_to(&mut self, time: f64) {
        self.process_events();
        let target = self.transport.clamp(time);

        if self.transport.is_playing() {
            self.pause();
            self.transport.set_offset(target);
            self.play();
        } else {
            self.transport.set_offset(target);
        }
        debug!("seeked to {:.3}s", target);
    }

    /// Discard all sources and rewind to the beginning.
    pub fn stop(&mut self) {
        self.process_events();
        self.terminate_all_sources();
        self.transport.rewind();
        info!("stopped");
    }

    /// Current playback position in seconds. Never exceeds [`duration`].
    ///
    /// [`duration`]: Self::duration
    pub fn current_time(&self) -> f64 {
        self.transport.position(self.clock.now())
    }

    /// Length of the longest loaded stem, 0 with none loaded.
    pub fn duration(&self) -> f64 {
        self.transport.duration()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    /// Position the transport resumes from, or held while stopped.
    pub fn play_start_offset(&self) -> f64 {
        self.transport.play_start_offset()
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            time: self.current_time(),
            duration: self.duration(),
            playing: self.is_playing(),
        }
    }
}
