//! The normalized rules-program data model produced by the parser and
//! consumed by the matching engine.

use regex::Regex;

use crate::message::Kind;

/// A match predicate, already normalized (`data` clauses have been lowered
/// into the equivalent `arg` form by the parser).
#[derive(Debug)]
pub enum MatchClause {
    /// Must appear first if present; succeeds iff the message's kind agrees.
    KindIs(Kind),
    /// Expand `template`; succeeds iff the result is one of `choices`.
    ArgIs { template: String, choices: Vec<String> },
    /// Expand `template`; succeeds on the first pattern in `patterns` that
    /// matches, extending the capture tuple with its groups.
    ArgMatches { template: String, patterns: Vec<Regex> },
    /// Expand `template`, classify its MIME type, succeed iff any pattern
    /// matches the resulting type string.
    ArgIsType { template: String, patterns: Vec<Regex> },
    /// Expand `template` (a single `{name}` reference), fold `substitutions`
    /// left to right, and store the result back into `message[name]`.
    ArgRewrite {
        field: String,
        substitutions: Vec<(String, String)>,
    },
}

/// An action to run once a rule has fully matched.
#[derive(Debug)]
pub enum ActionClause {
    /// Expand `template`, split on whitespace, spawn the resulting argv.
    Run(String),
    /// Fails unless `kind == Url`. Fetches `template` and stores the
    /// downloaded file's path in `message["filename"]`.
    Download(String),
}

/// A named, ordered group of clauses under a `[name]` heading.
#[derive(Debug)]
pub struct Rule {
    pub name: String,
    pub match_clauses: Vec<MatchClause>,
    pub action_clauses: Vec<ActionClause>,
}

/// An ordered sequence of [`Rule`]s, evaluated top-to-bottom. Parsed once,
/// then immutable.
#[derive(Debug, Default)]
pub struct RulesProgram {
    pub rules: Vec<Rule>,
}

impl RulesProgram {
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}
