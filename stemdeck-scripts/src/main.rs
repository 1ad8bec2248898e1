use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use stemdeck_lib::audio::{StemDecoder, SymphoniaDecoder};

const DEFAULT_STEMS: [(&str, f64); 3] = [("drums", 10.0), ("bass", 11.0), ("vocals", 12.0)];

fn main() {
    let mut args = env::args().skip(1);
    let Some(cmd) = args.next() else {
        print_help();
        return;
    };

    match cmd.as_str() {
        "tones" => tones_cmd(args.collect()),
        "-h" | "--help" => print_help(),
        _ => {
            eprintln!("Unknown command: {}", cmd);
            print_help();
        }
    }
}

struct ToneOptions {
    out_dir: PathBuf,
    stems: Vec<(String, f64)>,
    sample_rate: u32,
    channels: u16,
    verify: bool,
}

fn tones_cmd(args: Vec<String>) {
    let mut options = ToneOptions {
        out_dir: PathBuf::from("."),
        stems: Vec::new(),
        sample_rate: 44_100,
        channels: 2,
        verify: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" => {
                if let Some(path) = iter.next() {
                    options.out_dir = PathBuf::from(path);
                } else {
                    eprintln!("--out requires a directory");
                    return;
                }
            }
            "--stem" => {
                let Some(value) = iter.next() else {
                    eprintln!("--stem requires NAME=SECONDS");
                    return;
                };
                match parse_stem(&value) {
                    Some(stem) => options.stems.push(stem),
                    None => {
                        eprintln!("Invalid --stem value: {}", value);
                        return;
                    }
                }
            }
            "--rate" => match iter.next().and_then(|value| value.parse::<u32>().ok()) {
                Some(rate) if rate > 0 => options.sample_rate = rate,
                _ => {
                    eprintln!("--rate requires a positive integer");
                    return;
                }
            },
            "--channels" => match iter.next().and_then(|value| value.parse::<u16>().ok()) {
                Some(channels) if channels > 0 => options.channels = channels,
                _ => {
                    eprintln!("--channels requires a positive integer");
                    return;
                }
            },
            "--verify" => options.verify = true,
            "-h" | "--help" => {
                print_tones_help();
                return;
            }
            _ => {
                eprintln!("Unknown tones arg: {}", arg);
                print_tones_help();
                return;
            }
        }
    }

    if options.stems.is_empty() {
        options.stems = DEFAULT_STEMS
            .iter()
            .map(|(name, seconds)| (name.to_string(), *seconds))
            .collect();
    }

    if let Err(err) = fs::create_dir_all(&options.out_dir) {
        eprintln!("Failed to create {}: {}", options.out_dir.display(), err);
        return;
    }

    for (index, (name, seconds)) in options.stems.iter().enumerate() {
        let path = options.out_dir.join(format!("{}.wav", name));
        let frequency = 110.0 * (index + 1) as f64;
        if let Err(err) = write_tone(&path, &options, frequency, *seconds) {
            eprintln!("Failed to write {}: {}", path.display(), err);
            return;
        }
        println!("Wrote {} ({:.3}s, {} Hz tone)", path.display(), seconds, frequency);

        if options.verify {
            verify(&path);
        }
    }
}

fn parse_stem(value: &str) -> Option<(String, f64)> {
    let (name, seconds) = value.split_once('=')?;
    let seconds = seconds.parse::<f64>().ok()?;
    if name.is_empty() || !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Some((name.to_string(), seconds))
}

fn write_tone(
    path: &Path,
    options: &ToneOptions,
    frequency: f64,
    seconds: f64,
) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: options.channels,
        sample_rate: options.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let frames = (seconds * options.sample_rate as f64).round() as u64;
    for frame in 0..frames {
        let t = frame as f64 / options.sample_rate as f64;
        // Short fade at both ends keeps the stem boundaries click-free.
        let fade = (t / 0.01).min((seconds - t) / 0.01).clamp(0.0, 1.0);
        let value = (t * frequency * std::f64::consts::TAU).sin() * fade * 0.25;
        let sample = (value * i16::MAX as f64) as i16;
        for _ in 0..options.channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()
}

fn verify(path: &Path) {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("Failed to read {}: {}", path.display(), err);
            return;
        }
    };
    match SymphoniaDecoder::new().decode(bytes, Some("wav")) {
        Ok(buffer) => println!(
            "  decoded {:.3}s, {} Hz, {} ch",
            buffer.duration(),
            buffer.sample_rate(),
            buffer.channels()
        ),
        Err(err) => eprintln!("  decode failed: {}", err),
    }
}

fn print_help() {
    println!(
        "stemdeck-scripts\n\nCommands:\n  tones    Write synthetic WAV stems of chosen lengths\n\nRun 'stemdeck-scripts tones --help' for options."
    );
}

fn print_tones_help() {
    println!(
        "stemdeck-scripts tones\n\nOptions:\n  --out DIR              Output directory (default: .)\n  --stem NAME=SECONDS    Stem to write, repeatable (default: drums=10 bass=11 vocals=12)\n  --rate HZ              Sample rate (default: 44100)\n  --channels N           Channel count (default: 2)\n  --verify               Decode each file after writing it"
    );
}
