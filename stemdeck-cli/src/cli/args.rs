//! CLI argument definitions for `stemdeck`.

use clap::{Arg, ArgAction, Command};

fn stem_arg(required: bool) -> Arg {
    Arg::new("STEM")
        .help("Stem to load, as NAME=PATH or PATH (name taken from the file stem)")
        .required(required)
        .num_args(1..)
        .action(ArgAction::Append)
}

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("stemdeck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Play the stems of a song in sync and mix them live")
        .arg_required_else_help(true)
        .args_conflicts_with_subcommands(true)
        .arg(stem_arg(false))
        .arg(
            Arg::new("GAIN")
                .long("gain")
                .short('g')
                .value_name("PERCENT")
                .default_value("100")
                .help("Master gain in percent"),
        )
        .arg(
            Arg::new("seek")
                .long("seek")
                .short('s')
                .value_name("SECONDS")
                .help("Start playback at the given time in seconds"),
        )
        .arg(
            Arg::new("solo")
                .long("solo")
                .value_name("NAME")
                .help("Solo one stem"),
        )
        .arg(
            Arg::new("mute")
                .long("mute")
                .short('m')
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Mute a stem (repeatable)"),
        )
        .arg(
            Arg::new("volume")
                .long("volume")
                .short('v')
                .value_name("NAME=VOLUME")
                .action(ArgAction::Append)
                .help("Set a stem volume, linear or in dB like -6db (repeatable)"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("PATH")
                .help("Path to a MixSettings JSON file"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Play without the TUI, printing progress lines"),
        )
        .subcommand(
            Command::new("info")
                .about("Decode stems and print their durations and formats")
                .arg(stem_arg(true))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print info as JSON"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand_required(true)
                .subcommand(
                    Command::new("settings-json")
                        .about("Print a default MixSettings JSON payload")
                        .arg(
                            Arg::new("NAME")
                                .help("Stem names to include")
                                .required(false)
                                .num_args(1..)
                                .action(ArgAction::Append),
                        ),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn repeatable_flags_collect() {
        let matches = build_cli()
            .try_get_matches_from([
                "stemdeck", "drums.wav", "bass=b.flac", "--mute", "drums", "-m", "bass",
                "--volume", "bass=0.5",
            ])
            .unwrap();
        let stems: Vec<&String> = matches.get_many::<String>("STEM").unwrap().collect();
        assert_eq!(stems, ["drums.wav", "bass=b.flac"]);
        let muted: Vec<&String> = matches.get_many::<String>("mute").unwrap().collect();
        assert_eq!(muted, ["drums", "bass"]);
        assert_eq!(matches.get_one::<String>("GAIN").unwrap(), "100");
    }

    #[test]
    fn info_requires_stems() {
        assert!(build_cli().try_get_matches_from(["stemdeck", "info"]).is_err());
    }
}
