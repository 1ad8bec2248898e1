//! Volume, mute and solo controls for `StemEngine`.
//!
//! Setters and getters treat unknown stem names as no-ops so UI code can
//! query stems that are still loading.

use log::{debug, warn};

use super::super::mix::DEFAULT_VOLUME;
use super::StemEngine;

impl StemEngine {
    /// Set a stem's linear volume. Non-finite values are ignored.
    pub fn set_volume(&mut self, name: &str, volume: f32) {
        if !volume.is_finite() {
            warn!("ignoring non-finite volume for stem {}", name);
            return;
        }
        let Some(stem) = self.mix.get_mut(name) else {
            debug!("set_volume on unknown stem {}", name);
            return;
        };
        stem.volume = volume;
        self.apply_gain(name);
    }

    /// A stem's volume, or the default for unknown stems.
    pub fn get_volume(&self, name: &str) -> f32 {
        self.mix
            .get(name)
            .map(|stem| stem.volume)
            .unwrap_or(DEFAULT_VOLUME)
    }

    pub fn set_mute(&mut self, name: &str, muted: bool) {
        let Some(stem) = self.mix.get_mut(name) else {
            debug!("set_mute on unknown stem {}", name);
            return;
        };
        stem.muted = muted;
        self.apply_gain(name);
    }

    pub fn is_muted(&self, name: &str) -> bool {
        self.mix.get(name).map(|stem| stem.muted).unwrap_or(false)
    }

    /// Toggle solo on `name`. Soloing another stem replaces the current
    /// solo; soloing the soloed stem clears it.
    pub fn set_solo(&mut self, name: &str) {
        if !self.mix.toggle_solo(name) {
            debug!("set_solo on unknown stem {}", name);
            return;
        }
        debug!("solo is now {:?}", self.mix.soloed());
        self.apply_all_gains();
    }

    pub fn clear_solo(&mut self) {
        if self.mix.clear_solo() {
            self.apply_all_gains();
        }
    }

    pub fn is_soloed(&self, name: &str) -> bool {
        self.mix.soloed() == Some(name)
    }

    pub fn soloed_stem(&self) -> Option<&str> {
        self.mix.soloed()
    }

    /// Gain currently derived for a stem from volume, mute and solo.
    pub fn effective_gain(&self, name: &str) -> Option<f32> {
        self.mix.effective_gain(name)
    }

    /// Gain of the master node, applied on top of every stem.
    pub fn set_master_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            warn!("ignoring non-finite master volume");
            return;
        }
        self.mixer.set_master_gain(volume);
    }

    pub fn master_volume(&self) -> f32 {
        self.mixer.master_gain()
    }

    pub(super) fn apply_gain(&mut self, name: &str) {
        let Some(stem) = self.mix.get(name) else {
            return;
        };
        let node = stem.node;
        let Some(gain) = self.mix.effective_gain(name) else {
            return;
        };
        let now = self.clock.now();
        if let Err(err) = self.mixer.set_gain_at(node, gain, now) {
            warn!("failed to set gain for stem {}: {}", name, err);
        }
    }

    pub(super) fn apply_all_gains(&mut self) {
        let now = self.clock.now();
        for (node, gain) in self.mix.node_gains() {
            if let Err(err) = self.mixer.set_gain_at(node, gain, now) {
                warn!("failed to set gain for node {}: {}", node, err);
            }
        }
    }
}
