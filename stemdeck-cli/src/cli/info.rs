//! `stemdeck info`: print what each stem decodes to.

use std::sync::Arc;

use clap::ArgMatches;
use serde_json::json;
use stemdeck_lib::audio::{StemBuffer, SymphoniaDecoder};

use super::stems::{parse_stems, StemArg};
use super::{decode_stems, CliError};
use crate::controls::format_time;

pub fn run(args: &ArgMatches) -> Result<i32, CliError> {
    let stems = parse_stems(args.get_many::<String>("STEM").into_iter().flatten())?;
    let decoded = decode_stems(Arc::new(SymphoniaDecoder::new()), stems)?;
    let song_duration = decoded
        .iter()
        .map(|(_, buffer)| buffer.duration())
        .fold(0.0, f64::max);

    if args.get_flag("json") {
        let stems: Vec<_> = decoded.iter().map(|(stem, buffer)| stem_json(stem, buffer)).collect();
        let report = json!({ "duration": song_duration, "stems": stems });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(0);
    }

    for (stem, buffer) in &decoded {
        println!(
            "{:<12} {}  {:>9.3}s  {} Hz  {} ch  {}",
            stem.name,
            format_time(buffer.duration()),
            buffer.duration(),
            buffer.sample_rate(),
            buffer.channels(),
            stem.path.display()
        );
    }
    println!(
        "song duration: {} ({:.3}s)",
        format_time(song_duration),
        song_duration
    );
    Ok(0)
}

fn stem_json(stem: &StemArg, buffer: &StemBuffer) -> serde_json::Value {
    json!({
        "name": stem.name,
        "path": stem.path.display().to_string(),
        "duration": buffer.duration(),
        "frames": buffer.frames(),
        "sample_rate": buffer.sample_rate(),
        "channels": buffer.channels(),
    })
}
