use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use stemdeck_lib::settings::level::linear_to_db;
use stemdeck_lib::StemEngine;

const SEEK_STEP_SECONDS: f64 = 5.0;
const VOLUME_STEP: f32 = 0.05;
const MAX_VOLUME: f32 = 2.0;

/// Keyboard-side state that the engine does not own.
#[derive(Debug, Default)]
pub struct ControlState {
    pub selected: usize,
}

pub struct StemLine {
    pub name: String,
    pub volume: f32,
    pub muted: bool,
    pub soloed: bool,
    pub gain: f32,
}

pub struct StatusArgs {
    pub time: f64,
    pub duration: f64,
    pub playing: bool,
    pub master_volume: f32,
    pub stems: Vec<StemLine>,
    pub selected: usize,
}

pub struct StatusSnapshot {
    pub text: String,
    pub stem_lines: Vec<String>,
    pub selected: usize,
}

pub fn collect_status(engine: &StemEngine, state: &ControlState) -> StatusArgs {
    let snapshot = engine.snapshot();
    let stems = engine
        .stem_names()
        .into_iter()
        .map(|name| StemLine {
            volume: engine.get_volume(&name),
            muted: engine.is_muted(&name),
            soloed: engine.is_soloed(&name),
            gain: engine.effective_gain(&name).unwrap_or(0.0),
            name,
        })
        .collect();

    StatusArgs {
        time: snapshot.time,
        duration: snapshot.duration,
        playing: snapshot.playing,
        master_volume: engine.master_volume(),
        stems,
        selected: state.selected,
    }
}

pub fn status_text(args: StatusArgs) -> StatusSnapshot {
    let state = if args.playing { "▶ Playing" } else { "⏸ Stopped" };
    let percent = if args.duration > 0.0 {
        (args.time / args.duration * 100.0).min(100.0)
    } else {
        0.0
    };
    let text = format!(
        "{}   {} / {}   ({:>5.1}%)\nMaster: {:.2} ({:+.1} dB)",
        state,
        format_time(args.time),
        format_time(args.duration),
        percent,
        args.master_volume,
        linear_to_db(args.master_volume)
    );

    let stem_lines = args
        .stems
        .iter()
        .enumerate()
        .map(|(index, stem)| {
            let marker = if index == args.selected { ">" } else { " " };
            format!(
                "{} {} {:<12} vol {:.2} ({:>+6.1} dB)  {}  {}  out {:.2}",
                marker,
                index + 1,
                stem.name,
                stem.volume,
                linear_to_db(stem.volume),
                if stem.muted { "[M]" } else { "   " },
                if stem.soloed { "[S]" } else { "   " },
                stem.gain
            )
        })
        .collect();

    StatusSnapshot {
        text,
        stem_lines,
        selected: args.selected,
    }
}

/// Poll for one key press and apply it.
///
/// # Returns
///
/// `false` once the user asked to quit.
pub fn handle_key_event(engine: &mut StemEngine, state: &mut ControlState) -> bool {
    if event::poll(Duration::from_millis(100)).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind != KeyEventKind::Press {
                return true;
            }
            return apply_key(engine, state, key.code);
        }
    }

    true
}

pub fn apply_key(engine: &mut StemEngine, state: &mut ControlState, code: KeyCode) -> bool {
    let names = engine.stem_names();
    if state.selected >= names.len() {
        state.selected = names.len().saturating_sub(1);
    }
    let selected = names.get(state.selected).cloned();

    match code {
        KeyCode::Char('q') => {
            engine.stop();
            return false;
        }
        KeyCode::Char(' ') => {
            if engine.is_playing() {
                engine.pause();
            } else {
                engine.play();
            }
        }
        KeyCode::Char('s') | KeyCode::Char('S') => engine.stop(),
        KeyCode::Left => engine.seek_to(engine.current_time() - SEEK_STEP_SECONDS),
        KeyCode::Right => engine.seek_to(engine.current_time() + SEEK_STEP_SECONDS),
        KeyCode::Char(digit @ '1'..='9') => {
            let index = digit as usize - '1' as usize;
            if index < names.len() {
                state.selected = index;
            }
        }
        KeyCode::Char('m') | KeyCode::Char('M') => {
            if let Some(name) = selected {
                let muted = engine.is_muted(&name);
                engine.set_mute(&name, !muted);
            }
        }
        KeyCode::Char('o') | KeyCode::Char('O') => {
            if let Some(name) = selected {
                engine.set_solo(&name);
            }
        }
        KeyCode::Char('-') => {
            if let Some(name) = selected {
                let next = (engine.get_volume(&name) - VOLUME_STEP).max(0.0);
                engine.set_volume(&name, next);
            }
        }
        KeyCode::Char('=') | KeyCode::Char('+') => {
            if let Some(name) = selected {
                let next = (engine.get_volume(&name) + VOLUME_STEP).min(MAX_VOLUME);
                engine.set_volume(&name, next);
            }
        }
        KeyCode::Char('[') => {
            let next = (engine.master_volume() - VOLUME_STEP).max(0.0);
            engine.set_master_volume(next);
        }
        KeyCode::Char(']') => {
            let next = (engine.master_volume() + VOLUME_STEP).min(MAX_VOLUME);
            engine.set_master_volume(next);
        }
        _ => {}
    }

    true
}

/// Format seconds as `HH:MM:SS`, truncating fractions.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00:00".to_string();
    }
    let seconds = seconds.floor() as u64;
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    let hours = minutes / 60;
    let minutes = minutes % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
