//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use legal_qa::ConfigLayer;

pub const PROVIDER_ENV_VAR: &str = "LEGAL_QA_PROVIDER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// The answering service over HTTP
    Http,
    /// Offline canned answers
    Mock,
}

/// legal-qa - ask legal questions from the terminal
#[derive(Debug, Parser)]
#[command(name = "legal-qa")]
#[command(version, about = "Ask legal questions and watch the answers arrive")]
#[command(long_about = r#"
Ask legal questions against the answering service. Without --question the
client reads one question per line from stdin; typing a new question while an
answer is still arriving replaces it.

COMMANDS (interactive):
  /help   Show commands
  /clear  Start a new session
  /quit   Exit

EXIT CODES:
  0 - Success
  1 - The question failed or the configuration is invalid
"#)]
pub struct Cli {
    /// Base URL of the answering service
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ask a single question, print the answer and exit
    #[arg(short, long)]
    pub question: Option<String>,

    /// Where answers come from
    #[arg(long, value_enum, env = PROVIDER_ENV_VAR, default_value_t = Provider::Http)]
    pub provider: Provider,

    /// Print answers at once instead of revealing them progressively
    #[arg(long)]
    pub no_animation: bool,

    /// Delay between revealed characters, in milliseconds
    #[arg(long, value_name = "MS", conflicts_with = "no_animation")]
    pub reveal_pace_ms: Option<u64>,

    /// Total attempts per question, including the first
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Base delay of the exponential retry backoff, in milliseconds
    #[arg(long, value_name = "MS")]
    pub backoff_ms: Option<u64>,

    /// Time limit of a single attempt, in seconds
    #[arg(long, value_name = "SECS")]
    pub attempt_timeout_sec: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, value_name = "FILTER", default_value = legal_qa::logging::DEFAULT_FILTER)]
    pub log_level: String,
}

impl Cli {
    /// Settings given on the command line, layered over env and file.
    pub fn to_overrides(&self) -> ConfigLayer {
        let reveal_pace_ms = if self.no_animation {
            Some(0)
        } else {
            self.reveal_pace_ms
        };

        ConfigLayer {
            api_url: self.api_url.clone(),
            max_attempts: self.max_attempts,
            backoff_base_ms: self.backoff_ms,
            attempt_timeout_sec: self.attempt_timeout_sec,
            reveal_pace_ms,
            ..ConfigLayer::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("legal-qa").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn flags_become_overrides() {
        let cli = parse(&[
            "--api-url",
            "http://localhost:9000",
            "--max-attempts",
            "5",
            "--backoff-ms",
            "250",
            "--attempt-timeout-sec",
            "7",
            "--reveal-pace-ms",
            "12",
        ]);

        assert_eq!(
            cli.to_overrides(),
            ConfigLayer {
                api_url: Some("http://localhost:9000".to_string()),
                max_attempts: Some(5),
                backoff_base_ms: Some(250),
                attempt_timeout_sec: Some(7),
                reveal_pace_ms: Some(12),
                ..ConfigLayer::default()
            }
        );
    }

    #[test]
    fn no_animation_zeroes_the_pace() {
        let cli = parse(&["--no-animation"]);

        assert_eq!(cli.to_overrides().reveal_pace_ms, Some(0));
    }

    #[test]
    fn no_animation_conflicts_with_explicit_pace() {
        let result = Cli::try_parse_from(["legal-qa", "--no-animation", "--reveal-pace-ms", "5"]);

        assert!(result.is_err());
    }

    #[test]
    fn defaults_leave_configuration_untouched() {
        let cli = parse(&["--provider", "mock"]);

        assert_eq!(cli.provider, Provider::Mock);
        assert_eq!(cli.log_level, "warn");
        assert_eq!(cli.question, None);
        assert_eq!(cli.to_overrides(), ConfigLayer::default());
    }
}
