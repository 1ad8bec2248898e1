//! Parsing of stem and per-stem mix arguments.

use std::path::{Path, PathBuf};

use stemdeck_lib::settings::level::parse_volume;

/// A stem named on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct StemArg {
    pub name: String,
    pub path: PathBuf,
}

impl StemArg {
    /// Parse `NAME=PATH` or a bare `PATH`, naming the stem after the file.
    pub fn parse(value: &str) -> Result<Self, String> {
        let (name, path) = match value.split_once('=') {
            Some((name, path)) if !name.is_empty() && !path.is_empty() => {
                (name.to_string(), PathBuf::from(path))
            }
            Some(_) => return Err(format!("invalid stem argument \"{}\"", value)),
            None => {
                let path = PathBuf::from(value);
                let name = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .filter(|stem| !stem.is_empty())
                    .ok_or_else(|| format!("cannot name stem from path \"{}\"", value))?
                    .to_string();
                (name, path)
            }
        };
        Ok(Self { name, path })
    }

    /// File extension, passed to the decoder as a probe hint.
    pub fn hint(&self) -> Option<String> {
        extension_hint(&self.path)
    }
}

pub fn extension_hint(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Parse every stem argument, rejecting duplicate names.
pub fn parse_stems<'a>(values: impl IntoIterator<Item = &'a String>) -> Result<Vec<StemArg>, String> {
    let mut stems: Vec<StemArg> = Vec::new();
    for value in values {
        let stem = StemArg::parse(value)?;
        if stems.iter().any(|existing| existing.name == stem.name) {
            return Err(format!("stem \"{}\" given more than once", stem.name));
        }
        stems.push(stem);
    }
    Ok(stems)
}

/// Parse a `NAME=VOLUME` assignment.
pub fn parse_volume_assignment(value: &str) -> Result<(String, f32), String> {
    let (name, volume) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VOLUME, got \"{}\"", value))?;
    let volume =
        parse_volume(volume).ok_or_else(|| format!("invalid volume for {}: \"{}\"", name, volume))?;
    Ok((name.to_string(), volume))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_default_to_file_stem() {
        let stem = StemArg::parse("/music/song/Drums.WAV").unwrap();
        assert_eq!(stem.name, "Drums");
        assert_eq!(stem.hint().as_deref(), Some("wav"));

        let stem = StemArg::parse("lead=takes/vox_final.flac").unwrap();
        assert_eq!(stem.name, "lead");
        assert_eq!(stem.path, PathBuf::from("takes/vox_final.flac"));
    }

    #[test]
    fn rejects_empty_parts_and_duplicates() {
        assert!(StemArg::parse("=drums.wav").is_err());
        assert!(StemArg::parse("drums=").is_err());
        let values = vec!["drums.wav".to_string(), "drums=other.wav".to_string()];
        assert!(parse_stems(&values).is_err());
    }

    #[test]
    fn volume_assignments() {
        assert_eq!(
            parse_volume_assignment("bass=0.5"),
            Ok(("bass".to_string(), 0.5))
        );
        let (_, volume) = parse_volume_assignment("vocals=-6db").unwrap();
        assert!((volume - 0.501).abs() < 1e-3);
        assert!(parse_volume_assignment("bass").is_err());
        assert!(parse_volume_assignment("bass=loud").is_err());
    }
}
