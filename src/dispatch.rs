//! Executing a matched rule's actions: running a handler subprocess, or
//! downloading a URL's content to a temp file for a later action to use.

use std::io::{Read, Write};
use std::process::Command;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::message::{Field, Kind, Message};
use crate::rules::{ActionClause, Rule};
use crate::template;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.3; rv:36.0) Gecko/20100101 Firefox/36.0";

/// Runs `argv[0]` with `argv[1..]` and blocks until it exits, returning
/// whether it exited successfully. A seam so tests can record invocations
/// instead of spawning real handler programs.
pub trait ProcessRunner {
    fn run(&self, argv: &[String]) -> Result<bool>;
}

/// Spawns a real child process and waits for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, argv: &[String]) -> Result<bool> {
        let status = Command::new(&argv[0]).args(&argv[1..]).status()?;
        Ok(status.success())
    }
}

/// Fetches a URL's body over HTTP. A seam so tests can avoid the network.
pub trait HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches over real HTTP with the fixed user-agent the classifier also
/// uses.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqFetcher;

impl HttpFetcher for UreqFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = ureq::get(url).set("User-Agent", USER_AGENT).call()?;
        let mut buf = Vec::new();
        response.into_reader().read_to_end(&mut buf).map_err(Error::Io)?;
        Ok(buf)
    }
}

/// Run every action clause of `rule`, in order, against the already-matched
/// `message` and `captures`.
///
/// Stops at the first failing action and returns `Ok(false)`. Returns
/// `Ok(true)` only if every action succeeded.
pub fn dispatch(
    rule: &Rule,
    message: &mut Message,
    captures: &[String],
    runner: &dyn ProcessRunner,
    fetcher: &dyn HttpFetcher,
) -> Result<bool> {
    warn_if_orphaned_download(rule);

    for action in &rule.action_clauses {
        let ok = match action {
            ActionClause::Run(template_str) => run_action(template_str, message, captures, runner)?,
            ActionClause::Download(template_str) => {
                download_action(template_str, message, captures, fetcher)?
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn warn_if_orphaned_download(rule: &Rule) {
    if rule.action_clauses.len() == 1 {
        if let ActionClause::Download(_) = rule.action_clauses[0] {
            warn!(
                "rule '{}' only downloads and never interpolates {{filename}} in a later action; the downloaded file will be orphaned",
                rule.name
            );
        }
    }
}

fn run_action(
    template_str: &str,
    message: &Message,
    captures: &[String],
    runner: &dyn ProcessRunner,
) -> Result<bool> {
    let expanded = template::expand(template_str, message, captures)?;
    for reference in template::list_references(template_str) {
        info!("expanded {{{}}} while building command", reference.0);
    }
    let argv: Vec<String> = expanded.split_whitespace().map(str::to_string).collect();
    if argv.is_empty() {
        return Err(Error::ActionFailure("expanded command is empty".to_string()));
    }
    match runner.run(&argv) {
        Ok(true) => Ok(true),
        Ok(false) => {
            info!("command {argv:?} exited with a nonzero status");
            Ok(false)
        }
        Err(e) => {
            info!("command {argv:?} failed to run: {e}");
            Ok(false)
        }
    }
}

fn download_action(
    template_str: &str,
    message: &mut Message,
    captures: &[String],
    fetcher: &dyn HttpFetcher,
) -> Result<bool> {
    if message.kind() != Kind::Url {
        info!("plumb download requires kind=url, message is raw");
        return Ok(false);
    }
    let url = template::expand(template_str, message, captures)?;
    let body = match fetcher.get(&url) {
        Ok(b) => b,
        Err(e) => {
            info!("download of {url} failed: {e}");
            return Ok(false);
        }
    };

    let mut file = match tempfile::Builder::new().prefix("plumber-").tempfile() {
        Ok(f) => f,
        Err(e) => {
            info!("could not create temp file for download: {e}");
            return Ok(false);
        }
    };
    if let Err(e) = file.write_all(&body) {
        info!("could not write downloaded body to temp file: {e}");
        return Ok(false);
    }

    // Keep the file on disk after this handle drops: the spawned handler
    // needs to be able to read it later.
    let (_, path) = match file.keep() {
        Ok(pair) => pair,
        Err(e) => {
            info!("could not persist temp file: {e}");
            return Ok(false);
        }
    };

    message.set(
        "filename",
        Field::Text(path.to_string_lossy().into_owned()),
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Vec<String>>>,
        succeed: bool,
    }

    impl ProcessRunner for RecordingRunner {
        fn run(&self, argv: &[String]) -> Result<bool> {
            self.calls.borrow_mut().push(argv.to_vec());
            Ok(self.succeed)
        }
    }

    struct FakeFetcher(Vec<u8>);

    impl HttpFetcher for FakeFetcher {
        fn get(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn run_action_splits_expanded_template_into_argv() {
        let rule = Rule {
            name: "web".into(),
            match_clauses: vec![],
            action_clauses: vec![ActionClause::Run("firefox {data}".into())],
        };
        let mut msg = Message::from_url("https://example.com/");
        let runner = RecordingRunner { succeed: true, ..Default::default() };
        let fetcher = FakeFetcher(Vec::new());
        let ok = dispatch(&rule, &mut msg, &[], &runner, &fetcher).unwrap();
        assert!(ok);
        assert_eq!(
            runner.calls.borrow()[0],
            vec!["firefox".to_string(), "https://example.com/".to_string()]
        );
    }

    #[test]
    fn failing_action_halts_remaining_actions() {
        let rule = Rule {
            name: "t".into(),
            match_clauses: vec![],
            action_clauses: vec![
                ActionClause::Run("false".into()),
                ActionClause::Run("echo should-not-run".into()),
            ],
        };
        let mut msg = Message::from_raw(Vec::new());
        msg.set("data", Field::Text("x".into()));
        let runner = RecordingRunner { succeed: false, ..Default::default() };
        let fetcher = FakeFetcher(Vec::new());
        let ok = dispatch(&rule, &mut msg, &[], &runner, &fetcher).unwrap();
        assert!(!ok);
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn download_requires_url_kind() {
        let rule = Rule {
            name: "t".into(),
            match_clauses: vec![],
            action_clauses: vec![ActionClause::Download("{data}".into())],
        };
        let mut msg = Message::from_raw(b"nope".to_vec());
        let runner = RecordingRunner { succeed: true, ..Default::default() };
        let fetcher = FakeFetcher(Vec::new());
        let ok = dispatch(&rule, &mut msg, &[], &runner, &fetcher).unwrap();
        assert!(!ok);
    }

    #[test]
    fn download_then_run_interpolates_filename() {
        let rule = Rule {
            name: "t".into(),
            match_clauses: vec![],
            action_clauses: vec![
                ActionClause::Download("{data}".into()),
                ActionClause::Run("viewer {filename}".into()),
            ],
        };
        let mut msg = Message::from_url("https://example.com/image.png");
        let runner = Rc::new(RecordingRunner { succeed: true, ..Default::default() });
        let fetcher = FakeFetcher(b"fake bytes".to_vec());
        let ok = dispatch(&rule, &mut msg, &[], runner.as_ref(), &fetcher).unwrap();
        assert!(ok);
        let calls = runner.calls.borrow();
        assert_eq!(calls[0][0], "viewer");
        assert!(std::path::Path::new(&calls[0][1]).exists());
        std::fs::remove_file(&calls[0][1]).ok();
    }
}
