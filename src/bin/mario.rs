extern crate mario;

extern crate clap;
extern crate log;
extern crate stderrlog;
extern crate url;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use log::{error, info};

use mario::config::{self, Config};
use mario::{DefaultClassifier, Error, Kind, Message, Outcome, SystemProcessRunner, UreqFetcher};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Url,
    Raw,
}

impl From<KindArg> for Kind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Url => Kind::Url,
            KindArg::Raw => Kind::Raw,
        }
    }
}

/// A user-level plumber: dispatches a message to an external handler
/// according to a rules file.
#[derive(Debug, Parser)]
#[command(name = "mario", version)]
struct Cli {
    /// Increase logging verbosity (-v: warn, -vv: info, -vvv: debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Path to a config file (INI, section [mario])
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to a rules file, overrides the config's 'rules file'
    #[arg(long = "rule", value_name = "FILE")]
    rule: Option<PathBuf>,

    /// Guess the kind from MSG instead of taking it as an argument
    #[arg(long = "guess", conflicts_with = "kind")]
    guess: bool,

    /// The message's kind
    #[arg(value_enum, required_unless_present = "guess")]
    kind: Option<KindArg>,

    /// The message to plumb: a URL, or an opaque byte blob
    message: String,
}

fn setup_logging(verbosity: u8) {
    stderrlog::new()
        .module(module_path!())
        .module("mario")
        .verbosity(verbosity.min(3) as usize)
        .init()
        .ok();
}

fn resolve_rules_path(cli: &Cli, config: &Config) -> Option<PathBuf> {
    cli.rule
        .clone()
        .or_else(|| config.rules_file.clone())
        .or_else(config::default_rules_path)
}

fn build_message(cli: &Cli) -> Message {
    let kind = match cli.kind {
        Some(k) => k.into(),
        None => guess_kind(&cli.message),
    };
    match kind {
        Kind::Url => Message::from_url(cli.message.clone()),
        Kind::Raw => Message::from_raw(cli.message.clone().into_bytes()),
    }
}

fn guess_kind(message: &str) -> Kind {
    match url::Url::parse(message) {
        Ok(parsed) if !parsed.scheme().is_empty() => Kind::Url,
        _ => Kind::Raw,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config_path = cli.config.clone().or_else(config::default_config_path);
    let config = match &config_path {
        Some(path) => config::load(path),
        None => Config::default(),
    };

    let rules_path = match resolve_rules_path(&cli, &config) {
        Some(path) => path,
        None => {
            error!("no rules file specified on the command line, in the config, or at the default location");
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(&rules_path) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", Error::RulesIo(e));
            return ExitCode::FAILURE;
        }
    };

    let program = match mario::parser::parse(&source) {
        Ok(p) => p,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut message = build_message(&cli);
    let classifier = DefaultClassifier;
    let runner = SystemProcessRunner;
    let fetcher = UreqFetcher;

    match mario::plumb(&program, &mut message, &classifier, &runner, &fetcher) {
        Ok(Outcome::Dispatched { rule_name }) => {
            info!("rule '{rule_name}' matched and ran successfully");
        }
        Ok(Outcome::ActionFailed { rule_name }) => {
            info!("rule '{rule_name}' matched but an action failed");
        }
        Ok(Outcome::NoMatch) => {
            info!("no rule matched");
        }
        Err(e) => {
            error!("{e}");
        }
    }

    ExitCode::SUCCESS
}
