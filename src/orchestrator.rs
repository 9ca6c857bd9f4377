//! Driving the top-to-bottom search over a rules program: try to match each
//! rule in file order, and run the first one's actions that fully matches.

use log::{debug, info};

use crate::dispatch::{self, HttpFetcher, ProcessRunner};
use crate::engine;
use crate::error::Result;
use crate::message::Message;
use crate::mime::MimeClassifier;
use crate::rules::RulesProgram;

/// The outcome of running a rules program against a message.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A rule matched and every one of its actions succeeded.
    Dispatched { rule_name: String },
    /// A rule matched but one of its actions failed.
    ActionFailed { rule_name: String },
    /// No rule in the program matched the message.
    NoMatch,
}

/// For each rule in source order, try to match it; on the first rule that
/// fully matches, run its actions and stop — regardless of whether the
/// actions themselves succeed.
pub fn plumb(
    program: &RulesProgram,
    message: &mut Message,
    classifier: &dyn MimeClassifier,
    runner: &dyn ProcessRunner,
    fetcher: &dyn HttpFetcher,
) -> Result<Outcome> {
    for rule in program.iter() {
        debug!("trying rule '{}'", rule.name);
        match engine::evaluate_rule(rule, message, classifier)? {
            Some(captures) => {
                info!("rule '{}' matched", rule.name);
                let succeeded = dispatch::dispatch(rule, message, &captures, runner, fetcher)?;
                return Ok(if succeeded {
                    Outcome::Dispatched { rule_name: rule.name.clone() }
                } else {
                    Outcome::ActionFailed { rule_name: rule.name.clone() }
                });
            }
            None => continue,
        }
    }
    info!("no rule matched");
    Ok(Outcome::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Field, Kind};
    use crate::mime::test_support::FakeClassifier;
    use crate::parser;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ProcessRunner for RecordingRunner {
        fn run(&self, argv: &[String]) -> Result<bool> {
            self.calls.borrow_mut().push(argv.to_vec());
            Ok(true)
        }
    }

    struct NoFetcher;
    impl HttpFetcher for NoFetcher {
        fn get(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn s1_simple_url_dispatch() {
        let src = "[web]\nkind is url\nplumb run firefox {data}\n";
        let program = parser::parse(src).unwrap();
        let mut msg = Message::from_url("https://example.com/");
        let classifier = FakeClassifier::default();
        let runner = RecordingRunner::default();
        let outcome = plumb(&program, &mut msg, &classifier, &runner, &NoFetcher).unwrap();
        assert_eq!(outcome, Outcome::Dispatched { rule_name: "web".into() });
        assert_eq!(
            runner.calls.borrow()[0],
            vec!["firefox".to_string(), "https://example.com/".to_string()]
        );
    }

    #[test]
    fn s2_regex_capture_and_interpolation() {
        let src = "[paste]\narg matches {data} ^https://paste\\.example/(\\w+)$\nplumb run xdg-open https://raw.example/{0}\n";
        let program = parser::parse(src).unwrap();
        let mut msg = Message::from_url("https://paste.example/abc123");
        let classifier = FakeClassifier::default();
        let runner = RecordingRunner::default();
        plumb(&program, &mut msg, &classifier, &runner, &NoFetcher).unwrap();
        assert_eq!(
            runner.calls.borrow()[0],
            vec![
                "xdg-open".to_string(),
                "https://raw.example/abc123".to_string()
            ]
        );
    }

    #[test]
    fn s3_first_match_wins() {
        let src = "[a]\narg is {data} foo\nplumb run echo A\n[b]\narg is {data} foo\nplumb run echo B\n";
        let program = parser::parse(src).unwrap();
        let mut msg = Message::from_raw(Vec::new());
        msg.set("data", Field::Text("foo".into()));
        let classifier = FakeClassifier::default();
        let runner = RecordingRunner::default();
        let outcome = plumb(&program, &mut msg, &classifier, &runner, &NoFetcher).unwrap();
        assert_eq!(outcome, Outcome::Dispatched { rule_name: "a".into() });
        assert_eq!(runner.calls.borrow().len(), 1);
        assert_eq!(runner.calls.borrow()[0][1], "A");
    }

    #[test]
    fn no_match_reports_no_match_outcome() {
        let src = "[only]\narg is {data} needle\nplumb run echo hit\n";
        let program = parser::parse(src).unwrap();
        let mut msg = Message::from_raw(Vec::new());
        msg.set("data", Field::Text("haystack".into()));
        let classifier = FakeClassifier::default();
        let runner = RecordingRunner::default();
        let outcome = plumb(&program, &mut msg, &classifier, &runner, &NoFetcher).unwrap();
        assert_eq!(outcome, Outcome::NoMatch);
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn rule_with_no_match_clauses_and_no_kind_matches_everything() {
        let src = "[catchall]\nplumb run echo caught\n";
        let program = parser::parse(src).unwrap();
        let mut msg = Message::from_raw(Vec::new());
        msg.set("data", Field::Text("anything".into()));
        let classifier = FakeClassifier::default();
        let runner = RecordingRunner::default();
        let outcome = plumb(&program, &mut msg, &classifier, &runner, &NoFetcher).unwrap();
        assert_eq!(outcome, Outcome::Dispatched { rule_name: "catchall".into() });
    }

    #[test]
    fn rule_with_only_kind_clause_gates_on_kind() {
        let src = "[urls-only]\nkind is url\nplumb run echo hit\n";
        let program = parser::parse(src).unwrap();
        let mut msg = Message::from_raw(Vec::new());
        msg.set("data", Field::Text("anything".into()));
        let classifier = FakeClassifier::default();
        let runner = RecordingRunner::default();
        let outcome = plumb(&program, &mut msg, &classifier, &runner, &NoFetcher).unwrap();
        assert_eq!(outcome, Outcome::NoMatch);
        assert_eq!(msg.kind(), Kind::Raw);
    }
}
