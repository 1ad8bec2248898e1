//! Argument handling and the non-interactive subcommands.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use log::info;
use stemdeck_lib::audio::{spawn_decode, StemBuffer, StemDecoder};
use stemdeck_lib::EngineError;

pub mod args;
pub mod info;
pub mod stems;

use stems::StemArg;

/// Errors reported by the `stemdeck` binary.
#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Stem { name: String, source: EngineError },
    Engine(EngineError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(message) => write!(f, "{}", message),
            Self::Stem { name, source } => write!(f, "stem {}: {}", name, source),
            Self::Engine(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Usage(_) => None,
            Self::Stem { source, .. } => Some(source),
            Self::Engine(err) => Some(err),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        Self::Usage(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Engine(value.into())
    }
}

/// Read every stem file, then decode them all in parallel.
///
/// The first failure aborts the load and names the stem it came from.
pub fn decode_stems(
    decoder: Arc<dyn StemDecoder>,
    stems: Vec<StemArg>,
) -> Result<Vec<(StemArg, StemBuffer)>, CliError> {
    let mut pending = Vec::with_capacity(stems.len());
    for stem in stems {
        let bytes = std::fs::read(&stem.path).map_err(|err| CliError::Stem {
            name: stem.name.clone(),
            source: EngineError::Io(err),
        })?;
        info!("decoding {} from {}", stem.name, stem.path.display());
        let job = spawn_decode(decoder.clone(), stem.name.clone(), bytes, stem.hint());
        pending.push((stem, job));
    }

    pending
        .into_iter()
        .map(|(stem, job)| match job.wait() {
            Ok(buffer) => Ok((stem, buffer)),
            Err(source) => Err(CliError::Stem {
                name: stem.name,
                source,
            }),
        })
        .collect()
}
