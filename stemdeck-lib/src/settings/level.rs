//! Parsing and conversion of linear and dB volume values.

use serde::de::{Error as DeError, Visitor};
use serde::Deserializer;
use std::fmt;

/// Convert a dB value to linear gain.
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear gain to dB. Silence maps to a large negative value
/// rather than negative infinity.
pub fn linear_to_db(value: f32) -> f32 {
    let v = value.max(f32::MIN_POSITIVE);
    20.0 * v.log10()
}

/// Parse a volume written either as a linear factor (`"0.5"`) or in dB
/// (`"-6db"`, `"3 dB"`).
///
/// # Returns
///
/// Linear gain, or `None` for empty, malformed or non-finite input.
pub fn parse_volume(value: &str) -> Option<f32> {
    let linear = match parse_db_suffix(value) {
        Some(db) => db_to_linear(db),
        None => parse_number(value)?,
    };
    linear.is_finite().then_some(linear)
}

/// Deserialize a linear volume that may be expressed in dB.
pub fn deserialize_linear_gain<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    struct VolumeVisitor;

    impl<'de> Visitor<'de> for VolumeVisitor {
        type Value = f32;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or a string like \"-6db\"")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            parse_volume(value)
                .ok_or_else(|| DeError::custom(format!("invalid volume \"{}\"", value)))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            self.visit_str(&value)
        }
    }

    deserializer.deserialize_any(VolumeVisitor)
}

fn parse_db_suffix(value: &str) -> Option<f32> {
    let lower = value.trim().to_ascii_lowercase();
    let db_part = lower.strip_suffix("db")?;
    db_part.trim().parse::<f32>().ok()
}

fn parse_number(value: &str) -> Option<f32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linear_and_db() {
        assert_eq!(parse_volume("0.5"), Some(0.5));
        assert_eq!(parse_volume(" 1 "), Some(1.0));
        let half = parse_volume("-6dB").unwrap();
        assert!((half - 0.501).abs() < 1e-3);
        assert_eq!(parse_volume("0 db"), Some(1.0));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_volume(""), None);
        assert_eq!(parse_volume("db"), None);
        assert_eq!(parse_volume("loud"), None);
        assert_eq!(parse_volume("inf"), None);
        assert_eq!(parse_volume("NaN"), None);
    }

    #[test]
    fn db_conversions_agree() {
        assert!((linear_to_db(db_to_linear(-12.0)) + 12.0).abs() < 1e-4);
        assert!(linear_to_db(0.0) < -700.0);
    }
}
