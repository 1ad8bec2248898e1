//! # Stemdeck Library
//!
//! Synchronized playback of multi-stem songs. Every stem (drums, bass,
//! vocals, ...) of a song plays against one shared transport and can be
//! mixed independently with volume, mute and exclusive solo.
//!
//! [`StemEngine`] is the entry point. It is generic over its audio graph
//! ([`graph::MixerBackend`]), its time source ([`tools::clock::Clock`]) and
//! its decoder ([`audio::StemDecoder`]), so the same engine drives the
//! default output device or a deterministic virtual graph.

pub mod audio;
pub mod error;
pub mod graph;
pub mod playback;
pub mod settings;
pub mod tools;

pub use error::{EngineError, MixerError};
pub use playback::{StemEngine, TransportSnapshot, TransportState};
pub use settings::MixSettings;
