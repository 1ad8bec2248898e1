use std::{io, sync::Arc, thread::sleep, time::Duration};

use clap::ArgMatches;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use stemdeck_lib::audio::SymphoniaDecoder;
use stemdeck_lib::{MixSettings, StemEngine};

use crate::cli::stems::{parse_stems, parse_volume_assignment};
use crate::cli::{self, CliError};
use crate::controls::{self, format_time, ControlState};
use crate::logging::{self, LogBuffer};
use crate::ui;

const TICK: Duration = Duration::from_millis(50);

pub fn run(args: &ArgMatches, log_buffer: LogBuffer) -> Result<i32, CliError> {
    match args.subcommand() {
        Some(("info", sub)) => {
            logging::set_echo_stderr(true);
            return cli::info::run(sub);
        }
        Some(("create", sub)) => return create(sub),
        _ => {}
    }

    let quiet = args.get_flag("quiet");
    if quiet {
        logging::set_echo_stderr(true);
    }

    let stems = parse_stems(args.get_many::<String>("STEM").into_iter().flatten())?;
    if stems.is_empty() {
        return Err(CliError::Usage("no stems given".to_string()));
    }
    let names: Vec<String> = stems.iter().map(|stem| stem.name.clone()).collect();
    let mix = MixArgs::from_matches(args)?;
    mix.validate(&names)?;
    let seek = match args.get_one::<String>("seek") {
        Some(value) => Some(parse_seconds(value)?),
        None => None,
    };

    // Decode before touching the output device so bad files fail fast.
    let decoded = cli::decode_stems(Arc::new(SymphoniaDecoder::new()), stems)?;

    let mut engine = StemEngine::open_default()?;
    for (stem, buffer) in decoded {
        engine.insert_stem(stem.name, buffer)?;
    }
    mix.apply(&mut engine);
    if let Some(seek) = seek {
        engine.seek_to(seek);
    }
    engine.play();

    if quiet {
        run_quiet(&mut engine);
    } else {
        run_tui(&mut engine, log_buffer);
    }
    Ok(0)
}

/// Mix adjustments collected from flags and an optional settings file.
#[derive(Debug, Default)]
struct MixArgs {
    settings: Option<MixSettings>,
    gain_percent: f32,
    solo: Option<String>,
    mutes: Vec<String>,
    volumes: Vec<(String, f32)>,
}

impl MixArgs {
    fn from_matches(args: &ArgMatches) -> Result<Self, CliError> {
        let gain = args
            .get_one::<String>("GAIN")
            .map(String::as_str)
            .unwrap_or("100");
        let gain_percent = gain
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|gain| gain.is_finite() && *gain >= 0.0)
            .ok_or_else(|| CliError::Usage(format!("invalid gain \"{}\"", gain)))?;

        let settings = match args.get_one::<String>("settings") {
            Some(path) => Some(MixSettings::from_file(path)?),
            None => None,
        };

        let volumes = args
            .get_many::<String>("volume")
            .into_iter()
            .flatten()
            .map(|value| parse_volume_assignment(value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            settings,
            gain_percent,
            solo: args.get_one::<String>("solo").cloned(),
            mutes: args
                .get_many::<String>("mute")
                .into_iter()
                .flatten()
                .cloned()
                .collect(),
            volumes,
        })
    }

    /// Reject flags that name stems which are not being loaded.
    fn validate(&self, names: &[String]) -> Result<(), CliError> {
        let flagged = self
            .solo
            .iter()
            .chain(self.mutes.iter())
            .chain(self.volumes.iter().map(|(name, _)| name));
        for name in flagged {
            if !names.contains(name) {
                return Err(CliError::Usage(format!("unknown stem: {}", name)));
            }
        }
        Ok(())
    }

    /// Settings file first, then individual flags on top.
    fn apply(&self, engine: &mut StemEngine) {
        let base_master = match &self.settings {
            Some(settings) => {
                let skipped = settings.apply_to(engine);
                if !skipped.is_empty() {
                    warn!("settings skipped for: {}", skipped.join(", "));
                }
                settings.master_volume
            }
            None => 1.0,
        };
        engine.set_master_volume(base_master * self.gain_percent / 100.0);

        for (name, volume) in &self.volumes {
            engine.set_volume(name, *volume);
        }
        for name in &self.mutes {
            engine.set_mute(name, true);
        }
        if let Some(name) = &self.solo {
            if engine.soloed_stem() != Some(name.as_str()) {
                engine.set_solo(name);
            }
        }
    }
}

fn parse_seconds(value: &str) -> Result<f64, CliError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite())
        .ok_or_else(|| CliError::Usage(format!("invalid seek time \"{}\"", value)))
}

fn create(args: &ArgMatches) -> Result<i32, CliError> {
    match args.subcommand() {
        Some(("settings-json", sub)) => {
            let names: Vec<&str> = sub
                .get_many::<String>("NAME")
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect();
            println!("{}", MixSettings::template(&names).to_json_pretty()?);
            Ok(0)
        }
        _ => Err(CliError::Usage("nothing to create".to_string())),
    }
}

fn run_quiet(engine: &mut StemEngine) {
    let mut last_second = None;
    loop {
        engine.process_events();
        if !engine.is_playing() {
            break;
        }
        let snapshot = engine.snapshot();
        let second = snapshot.time.floor() as u64;
        if last_second != Some(second) {
            println!(
                "{} / {}",
                format_time(snapshot.time),
                format_time(snapshot.duration)
            );
            last_second = Some(second);
        }
        sleep(TICK);
    }
    info!("finished");
}

fn run_tui(engine: &mut StemEngine, log_buffer: LogBuffer) {
    let _raw_mode = RawModeGuard::enable().ok();
    let _stderr_capture = logging::capture_stderr(log_buffer.clone());
    let mut stdout = io::stdout();
    let _ = execute!(stdout, EnterAlternateScreen, cursor::Hide);
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).ok();
    let mut state = ControlState::default();

    loop {
        engine.process_events();
        if let Some(term) = terminal.as_mut() {
            let log_lines = logging::snapshot(&log_buffer);
            let status = controls::status_text(controls::collect_status(engine, &state));
            ui::draw_status(term, &status, &log_lines);
        }

        if !controls::handle_key_event(engine, &mut state) {
            break;
        }

        sleep(TICK);
    }

    // Restore the terminal state before exiting.
    if let Some(mut term) = terminal {
        let _ = term.show_cursor();
        let _ = execute!(term.backend_mut(), LeaveAlternateScreen, cursor::Show);
    } else {
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stemdeck_lib::audio::StemBuffer;
    use stemdeck_lib::graph::VirtualMixer;
    use stemdeck_lib::tools::ManualClock;

    use super::*;
    use crate::cli::args::build_cli;

    fn matches(extra: &[&str]) -> ArgMatches {
        let mut argv = vec!["stemdeck", "drums.wav", "bass.wav"];
        argv.extend_from_slice(extra);
        build_cli().try_get_matches_from(argv).unwrap()
    }

    fn engine() -> StemEngine {
        let clock = Arc::new(ManualClock::new());
        let mut engine = StemEngine::new(
            Box::new(VirtualMixer::new(clock.clone())),
            clock,
            Arc::new(SymphoniaDecoder::new()),
        );
        for name in ["drums", "bass"] {
            engine
                .insert_stem(name, StemBuffer::silence(1, 100, 4.0))
                .unwrap();
        }
        engine
    }

    #[test]
    fn flags_shape_the_mix() {
        let args = matches(&["--gain", "50", "--volume", "bass=0.25", "--mute", "drums", "--solo", "bass"]);
        let mix = MixArgs::from_matches(&args).unwrap();
        let names = vec!["drums".to_string(), "bass".to_string()];
        mix.validate(&names).unwrap();

        let mut engine = engine();
        mix.apply(&mut engine);
        assert_eq!(engine.master_volume(), 0.5);
        assert_eq!(engine.get_volume("bass"), 0.25);
        assert!(engine.is_muted("drums"));
        assert_eq!(engine.soloed_stem(), Some("bass"));
    }

    #[test]
    fn unknown_stem_flags_are_rejected() {
        let mix = MixArgs::from_matches(&matches(&["--mute", "keys"])).unwrap();
        let err = mix.validate(&["drums".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "unknown stem: keys");
    }

    #[test]
    fn bad_numbers_are_usage_errors() {
        assert!(MixArgs::from_matches(&matches(&["--gain", "loud"])).is_err());
        assert!(MixArgs::from_matches(&matches(&["--volume", "bass"])).is_err());
        assert!(parse_seconds("1.5").is_ok());
        assert!(parse_seconds("later").is_err());
    }
}
