//! Per-stem mix state and effective gain derivation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::audio::StemBuffer;
use crate::graph::GainNodeId;

pub const DEFAULT_VOLUME: f32 = 1.0;

/// Gain a stem should receive given its own settings and the solo state.
///
/// A soloed stem still honors its own mute; every other stem is silenced
/// while any solo is active.
///
/// # Arguments
///
/// * `volume` - The stem's linear volume.
/// * `muted` - The stem's mute flag.
/// * `solo` - `None` when nothing is soloed, otherwise whether this stem is
///   the soloed one.
pub fn effective_gain(volume: f32, muted: bool, solo: Option<bool>) -> f32 {
    match solo {
        Some(false) => 0.0,
        Some(true) | None if muted => 0.0,
        _ => volume,
    }
}

/// A loaded stem.
#[derive(Debug, Clone)]
pub struct Stem {
    pub buffer: Arc<StemBuffer>,
    pub node: GainNodeId,
    pub volume: f32,
    pub muted: bool,
}

impl Stem {
    pub fn new(buffer: Arc<StemBuffer>, node: GainNodeId) -> Self {
        Self {
            buffer,
            node,
            volume: DEFAULT_VOLUME,
            muted: false,
        }
    }

    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }
}

/// All loaded stems plus the single solo reference.
#[derive(Debug, Clone, Default)]
pub struct MixState {
    stems: BTreeMap<String, Stem>,
    soloed: Option<String>,
}

impl MixState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, stem: Stem) -> Option<Stem> {
        self.stems.insert(name, stem)
    }

    /// Remove a stem, clearing solo if it referenced it.
    pub fn remove(&mut self, name: &str) -> Option<Stem> {
        if self.soloed.as_deref() == Some(name) {
            self.soloed = None;
        }
        self.stems.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Stem> {
        self.stems.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Stem> {
        self.stems.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stems.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Stem)> {
        self.stems.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.stems.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    /// Longest stem duration, or 0 with no stems.
    pub fn duration(&self) -> f64 {
        self.stems
            .values()
            .map(Stem::duration)
            .fold(0.0, f64::max)
    }

    pub fn soloed(&self) -> Option<&str> {
        self.soloed.as_deref()
    }

    /// Toggle solo on `name`: soloing the soloed stem clears solo, soloing
    /// another stem replaces it. Unknown names are ignored.
    ///
    /// # Returns
    ///
    /// `true` if the solo reference changed.
    pub fn toggle_solo(&mut self, name: &str) -> bool {
        if !self.stems.contains_key(name) {
            return false;
        }
        if self.soloed.as_deref() == Some(name) {
            self.soloed = None;
        } else {
            self.soloed = Some(name.to_string());
        }
        true
    }

    /// # Returns
    ///
    /// `true` if a solo was active.
    pub fn clear_solo(&mut self) -> bool {
        self.soloed.take().is_some()
    }

    /// Effective gain for one stem, or `None` if it is not loaded.
    pub fn effective_gain(&self, name: &str) -> Option<f32> {
        let stem = self.stems.get(name)?;
        let solo = self.soloed.as_deref().map(|soloed| soloed == name);
        Some(effective_gain(stem.volume, stem.muted, solo))
    }

    /// Effective gain of every stem, keyed by its node.
    pub fn node_gains(&self) -> Vec<(GainNodeId, f32)> {
        self.stems
            .keys()
            .filter_map(|name| {
                let gain = self.effective_gain(name)?;
                Some((self.stems[name].node, gain))
            })
            .collect()
    }

    /// Drain every stem, clearing solo.
    pub fn take_all(&mut self) -> Vec<(String, Stem)> {
        self.soloed = None;
        std::mem::take(&mut self.stems).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(names: &[&str]) -> MixState {
        let mut state = MixState::new();
        for (index, name) in names.iter().enumerate() {
            state.insert(
                name.to_string(),
                Stem::new(
                    Arc::new(StemBuffer::silence(1, 100, index as f64 + 1.0)),
                    GainNodeId(index as u64),
                ),
            );
        }
        state
    }

    #[test]
    fn gain_without_solo_follows_mute_and_volume() {
        assert_eq!(effective_gain(0.7, false, None), 0.7);
        assert_eq!(effective_gain(0.7, true, None), 0.0);
    }

    #[test]
    fn solo_silences_others_but_keeps_own_mute() {
        assert_eq!(effective_gain(1.0, false, Some(false)), 0.0);
        assert_eq!(effective_gain(0.4, false, Some(true)), 0.4);
        assert_eq!(effective_gain(0.4, true, Some(true)), 0.0);
    }

    #[test]
    fn solo_toggles_and_replaces() {
        let mut mix = state(&["drums", "bass"]);
        assert!(mix.toggle_solo("drums"));
        assert_eq!(mix.soloed(), Some("drums"));
        assert!(mix.toggle_solo("bass"));
        assert_eq!(mix.soloed(), Some("bass"));
        assert!(mix.toggle_solo("bass"));
        assert_eq!(mix.soloed(), None);
        assert!(!mix.toggle_solo("keys"));
        assert_eq!(mix.soloed(), None);
    }

    #[test]
    fn removing_soloed_stem_clears_solo() {
        let mut mix = state(&["drums", "bass"]);
        mix.toggle_solo("drums");
        mix.remove("drums");
        assert_eq!(mix.soloed(), None);
        assert_eq!(mix.effective_gain("bass"), Some(1.0));
    }

    #[test]
    fn duration_is_longest_stem() {
        assert_eq!(MixState::new().duration(), 0.0);
        let mix = state(&["a", "b", "c"]);
        assert!((mix.duration() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn node_gains_cover_every_stem() {
        let mut mix = state(&["drums", "bass"]);
        mix.get_mut("bass").unwrap().volume = 0.5;
        mix.toggle_solo("bass");
        let gains = mix.node_gains();
        assert_eq!(gains, vec![(GainNodeId(1), 0.5), (GainNodeId(0), 0.0)]);
    }
}
