use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn stemdeck() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("stemdeck"))
}

fn write_tone(dir: &Path, name: &str, seconds: f64) -> PathBuf {
    let path = dir.join(format!("{}.wav", name));
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    let frames = (seconds * spec.sample_rate as f64) as usize;
    for frame in 0..frames {
        let t = frame as f64 / spec.sample_rate as f64;
        let sample = ((t * 220.0 * std::f64::consts::TAU).sin() * 8_000.0) as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[test]
fn create_settings_json_lists_default_stems() {
    stemdeck()
        .args(["create", "settings-json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"master_volume\": 1.0"))
        .stdout(predicate::str::contains("\"drums\""))
        .stdout(predicate::str::contains("\"bass\""))
        .stdout(predicate::str::contains("\"vocals\""))
        .stdout(predicate::str::contains("\"other\""));
}

#[test]
fn create_settings_json_uses_given_names() {
    stemdeck()
        .args(["create", "settings-json", "lead", "rhythm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lead\""))
        .stdout(predicate::str::contains("\"rhythm\""))
        .stdout(predicate::str::contains("\"drums\"").not());
}

#[test]
fn info_reports_stem_and_song_durations() {
    let dir = TempDir::new().unwrap();
    let drums = write_tone(dir.path(), "drums", 2.0);
    let vocals = write_tone(dir.path(), "vocals", 3.0);

    stemdeck()
        .arg("info")
        .arg(&drums)
        .arg(format!("lead={}", vocals.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("drums"))
        .stdout(predicate::str::contains("lead"))
        .stdout(predicate::str::contains("8000 Hz"))
        .stdout(predicate::str::contains("song duration: 00:00:03 (3.000s)"));
}

#[test]
fn info_json_is_machine_readable() {
    let dir = TempDir::new().unwrap();
    let bass = write_tone(dir.path(), "bass", 1.5);

    let output = stemdeck()
        .args(["info", "--json"])
        .arg(&bass)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["duration"], 1.5);
    assert_eq!(report["stems"][0]["name"], "bass");
    assert_eq!(report["stems"][0]["channels"], 2);
    assert_eq!(report["stems"][0]["frames"], 12_000);
}

#[test]
fn info_names_the_stem_that_failed_to_decode() {
    let dir = TempDir::new().unwrap();
    let good = write_tone(dir.path(), "drums", 1.0);
    let broken = dir.path().join("broken.wav");
    std::fs::write(&broken, b"definitely not a wav file").unwrap();

    stemdeck()
        .arg("info")
        .arg(&good)
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("stem broken"));
}

#[test]
fn info_reports_missing_files() {
    let dir = TempDir::new().unwrap();
    stemdeck()
        .arg("info")
        .arg(dir.path().join("nope.wav"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("stem nope: io error"));
}

#[test]
fn play_rejects_flags_for_unknown_stems() {
    stemdeck()
        .args(["drums.wav", "bass.wav", "--quiet", "--mute", "keys"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown stem: keys"));
}

#[test]
fn no_arguments_prints_help() {
    stemdeck()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
