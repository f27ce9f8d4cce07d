use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, value_parser};
use clap_complete::Shell;

pub fn build_cli() -> Command {
    Command::new("alive")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Drive a live status board from a server-sent event stream")
        .long_about("alive reconciles box events pushed by a status-board server with local staleness, expiry and keepalive timers, and emits the resulting board updates as JSON lines.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("watch")
                .about("Run the board engine over an SSE stream and print board updates")
                .arg(input_arg())
                .arg(
                    Arg::new("snapshot")
                        .long("snapshot")
                        .short('s')
                        .help("JSON array of boxes already on the board")
                        .value_parser(value_parser!(PathBuf))
                )
                .arg(
                    Arg::new("box")
                        .long("box")
                        .short('b')
                        .help("Follow a single box (detail page scope)")
                )
                .arg(
                    Arg::new("window")
                        .long("window")
                        .help("Keepalive window in seconds (overrides config)")
                        .value_parser(value_parser!(u64))
                )
                .arg(
                    Arg::new("max-missed")
                        .long("max-missed")
                        .help("Missed keepalive windows tolerated before a resync (overrides config)")
                        .value_parser(value_parser!(u32))
                )
                .arg(
                    Arg::new("hard-ceiling")
                        .long("hard-ceiling")
                        .help("Seconds of silence that always force a resync (overrides config)")
                        .value_parser(value_parser!(u64))
                )
        )
        .subcommand(
            Command::new("decode")
                .about("Decode SSE frames and print one summary line per envelope")
                .arg(input_arg())
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration as TOML")
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .help("Shell to generate completions for")
                        .required(true)
                        .index(1)
                        .value_parser(value_parser!(Shell))
                )
        )
}

fn input_arg() -> Arg {
    Arg::new("input")
        .long("input")
        .short('i')
        .help("Read the stream from a file instead of stdin")
        .value_parser(value_parser!(PathBuf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_build() {
        let app = build_cli();
        assert_eq!(app.get_name(), "alive");
    }

    #[test]
    fn test_cli_watch_command() {
        let app = build_cli();
        let matches = app.try_get_matches_from(vec![
            "alive",
            "watch",
            "--input",
            "events.sse",
            "--box",
            "b1",
            "--window",
            "10",
        ]);
        assert!(matches.is_ok());

        let matches = matches.unwrap();
        let watch_matches = matches.subcommand_matches("watch").unwrap();
        assert_eq!(
            watch_matches.get_one::<PathBuf>("input").unwrap(),
            &PathBuf::from("events.sse")
        );
        assert_eq!(watch_matches.get_one::<String>("box").unwrap(), "b1");
        assert_eq!(*watch_matches.get_one::<u64>("window").unwrap(), 10);
        assert!(watch_matches.get_one::<PathBuf>("snapshot").is_none());
    }

    #[test]
    fn test_cli_watch_rejects_bad_window() {
        let app = build_cli();
        let matches = app.try_get_matches_from(vec!["alive", "watch", "--window", "soon"]);
        assert!(matches.is_err());
    }

    #[test]
    fn test_cli_decode_command() {
        let app = build_cli();
        let matches = app.try_get_matches_from(vec!["alive", "decode"]);
        assert!(matches.is_ok());
        let matches = matches.unwrap();
        let decode_matches = matches.subcommand_matches("decode").unwrap();
        assert!(decode_matches.get_one::<PathBuf>("input").is_none());
    }

    #[test]
    fn test_cli_verbose_is_global() {
        let app = build_cli();
        let matches = app
            .try_get_matches_from(vec!["alive", "config", "-v"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
    }

    #[test]
    fn test_cli_completions_requires_shell() {
        let app = build_cli();
        assert!(app.try_get_matches_from(vec!["alive", "completions"]).is_err());

        let app = build_cli();
        let matches = app
            .try_get_matches_from(vec!["alive", "completions", "bash"])
            .unwrap();
        let sub = matches.subcommand_matches("completions").unwrap();
        assert_eq!(*sub.get_one::<Shell>("shell").unwrap(), Shell::Bash);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let app = build_cli();
        assert!(app.try_get_matches_from(vec!["alive"]).is_err());
    }
}
