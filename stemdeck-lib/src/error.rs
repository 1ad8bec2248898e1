//! Error types shared by the engine and its collaborators.

use std::fmt::{Display, Formatter};

use crate::graph::{GainNodeId, SourceId};

/// Errors reported by a [`MixerBackend`](crate::graph::MixerBackend).
///
/// `AlreadyStopped` and `AlreadyDisconnected` are expected during normal
/// teardown; the engine swallows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixerError {
    AlreadyStopped(SourceId),
    AlreadyDisconnected(GainNodeId),
    UnknownNode(GainNodeId),
    Output(String),
}

impl MixerError {
    /// Return true for double-stop/double-disconnect reports.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyStopped(_) | Self::AlreadyDisconnected(_))
    }
}

impl Display for MixerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyStopped(id) => write!(f, "source {} already stopped", id),
            Self::AlreadyDisconnected(id) => write!(f, "gain node {} already disconnected", id),
            Self::UnknownNode(id) => write!(f, "unknown gain node {}", id),
            Self::Output(err) => write!(f, "output error: {}", err),
        }
    }
}

impl std::error::Error for MixerError {}

/// Error type for stem loading and engine configuration.
#[derive(Debug)]
pub enum EngineError {
    Io(std::io::Error),
    Decode(String),
    UnknownStem(String),
    Mixer(MixerError),
    Settings(String),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Decode(err) => write!(f, "decode error: {}", err),
            Self::UnknownStem(name) => write!(f, "unknown stem: {}", name),
            Self::Mixer(err) => write!(f, "mixer error: {}", err),
            Self::Settings(err) => write!(f, "invalid settings: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Mixer(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MixerError> for EngineError {
    fn from(value: MixerError) -> Self {
        Self::Mixer(value)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::Settings(value.to_string())
    }
}

impl From<symphonia::core::errors::Error> for EngineError {
    fn from(value: symphonia::core::errors::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benign_mixer_errors() {
        assert!(MixerError::AlreadyStopped(SourceId(3)).is_benign());
        assert!(MixerError::AlreadyDisconnected(GainNodeId(1)).is_benign());
        assert!(!MixerError::Output("device lost".into()).is_benign());
    }

    #[test]
    fn display_is_lowercase_and_named() {
        let err = EngineError::UnknownStem("drums".into());
        assert_eq!(err.to_string(), "unknown stem: drums");
        let err = EngineError::from(MixerError::UnknownNode(GainNodeId(7)));
        assert_eq!(err.to_string(), "mixer error: unknown gain node 7");
    }
}
