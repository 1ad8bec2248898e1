//! Persistable mix settings.
//!
//! `MixSettings` is the JSON form of everything a listener adjusts on a
//! song: master volume, per-stem volume and mute, and the soloed stem.
//! Volumes may be written as linear numbers or as strings like `"-6db"`.

pub mod level;

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::playback::engine::StemEngine;
use crate::playback::mix::DEFAULT_VOLUME;

use level::deserialize_linear_gain;

/// Stem names used by [`MixSettings::template`] when none are given.
pub const DEFAULT_STEM_NAMES: [&str; 4] = ["drums", "bass", "vocals", "other"];

/// Saved state of one stem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemSettings {
    #[serde(deserialize_with = "deserialize_linear_gain")]
    pub volume: f32,
    pub muted: bool,
}

impl Default for StemSettings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            muted: false,
        }
    }
}

/// Saved state of a whole mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixSettings {
    #[serde(deserialize_with = "deserialize_linear_gain")]
    pub master_volume: f32,
    pub stems: BTreeMap<String, StemSettings>,
    pub solo: Option<String>,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            master_volume: DEFAULT_VOLUME,
            stems: BTreeMap::new(),
            solo: None,
        }
    }
}

impl MixSettings {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Default settings with an entry for each of `names`, or for
    /// [`DEFAULT_STEM_NAMES`] when `names` is empty.
    pub fn template(names: &[&str]) -> Self {
        let names: &[&str] = if names.is_empty() {
            &DEFAULT_STEM_NAMES
        } else {
            names
        };
        Self {
            stems: names
                .iter()
                .map(|name| (name.to_string(), StemSettings::default()))
                .collect(),
            ..Self::default()
        }
    }

    /// Record the engine's current mix.
    pub fn capture(engine: &StemEngine) -> Self {
        let stems = engine
            .stem_names()
            .into_iter()
            .map(|name| {
                let settings = StemSettings {
                    volume: engine.get_volume(&name),
                    muted: engine.is_muted(&name),
                };
                (name, settings)
            })
            .collect();
        Self {
            master_volume: engine.master_volume(),
            stems,
            solo: engine.soloed_stem().map(str::to_string),
        }
    }

    /// Apply these settings to the stems loaded in `engine`.
    ///
    /// Entries for stems that are not loaded are skipped.
    ///
    /// # Returns
    ///
    /// Names of skipped entries, including an unknown solo target.
    pub fn apply_to(&self, engine: &mut StemEngine) -> Vec<String> {
        let mut skipped = Vec::new();
        engine.set_master_volume(self.master_volume);

        for (name, stem) in &self.stems {
            if !engine.has_stem(name) {
                warn!("settings mention stem {} which is not loaded", name);
                skipped.push(name.clone());
                continue;
            }
            engine.set_volume(name, stem.volume);
            engine.set_mute(name, stem.muted);
        }

        match self.solo.as_deref() {
            Some(name) if !engine.has_stem(name) => {
                warn!("cannot solo {}: stem is not loaded", name);
                skipped.push(name.to_string());
            }
            Some(name) => {
                if engine.soloed_stem() != Some(name) {
                    engine.set_solo(name);
                }
            }
            None => engine.clear_solo(),
        }

        debug!("applied mix settings ({} skipped)", skipped.len());
        skipped
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::{StemBuffer, SymphoniaDecoder};
    use crate::graph::VirtualMixer;
    use crate::tools::clock::ManualClock;

    fn engine_with(names: &[&str]) -> StemEngine {
        let clock = Arc::new(ManualClock::new());
        let mut engine = StemEngine::new(
            Box::new(VirtualMixer::new(clock.clone())),
            clock,
            Arc::new(SymphoniaDecoder::new()),
        );
        for name in names {
            engine
                .insert_stem(*name, StemBuffer::silence(1, 100, 2.0))
                .unwrap();
        }
        engine
    }

    #[test]
    fn parses_partial_json_with_db_strings() {
        let settings = MixSettings::from_json(
            r#"{"stems": {"bass": {"volume": "-6db"}, "drums": {"muted": true}}, "solo": "vocals"}"#,
        )
        .unwrap();
        assert_eq!(settings.master_volume, 1.0);
        assert!((settings.stems["bass"].volume - 0.501).abs() < 1e-3);
        assert!(!settings.stems["bass"].muted);
        assert_eq!(settings.stems["drums"].volume, 1.0);
        assert!(settings.stems["drums"].muted);
        assert_eq!(settings.solo.as_deref(), Some("vocals"));
    }

    #[test]
    fn malformed_json_is_a_settings_error() {
        let err = MixSettings::from_json("{\"master_volume\": \"loud\"}").unwrap_err();
        assert!(matches!(err, EngineError::Settings(_)));
    }

    #[test]
    fn template_survives_json() {
        let template = MixSettings::template(&[]);
        assert_eq!(template.stems.len(), DEFAULT_STEM_NAMES.len());
        let json = template.to_json_pretty().unwrap();
        assert_eq!(MixSettings::from_json(&json).unwrap(), template);
    }

    #[test]
    fn apply_then_capture() {
        let mut engine = engine_with(&["bass", "drums", "vocals"]);
        let mut settings = MixSettings::template(&["bass", "drums", "keys"]);
        settings.master_volume = 0.8;
        settings.stems.get_mut("bass").unwrap().volume = 0.5;
        settings.stems.get_mut("drums").unwrap().muted = true;
        settings.solo = Some("vocals".to_string());

        let skipped = settings.apply_to(&mut engine);
        assert_eq!(skipped, vec!["keys".to_string()]);
        assert_eq!(engine.get_volume("bass"), 0.5);
        assert!(engine.is_muted("drums"));
        assert_eq!(engine.soloed_stem(), Some("vocals"));
        assert_eq!(engine.effective_gain("bass"), Some(0.0));

        let captured = MixSettings::capture(&engine);
        assert_eq!(captured.master_volume, 0.8);
        assert_eq!(captured.stems.len(), 3);
        assert_eq!(captured.stems["bass"].volume, 0.5);
        assert_eq!(captured.solo.as_deref(), Some("vocals"));

        // Applying again keeps the solo rather than toggling it off.
        captured.apply_to(&mut engine);
        assert_eq!(engine.soloed_stem(), Some("vocals"));
    }

    #[test]
    fn missing_solo_clears_existing_solo() {
        let mut engine = engine_with(&["bass"]);
        engine.set_solo("bass");
        MixSettings::default().apply_to(&mut engine);
        assert_eq!(engine.soloed_stem(), None);
    }
}
