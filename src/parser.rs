//! The rules-file lexer and recursive-descent parser.
//!
//! The grammar is line-oriented: each logical line is one clause (a heading,
//! a `kind`/`arg`/`data`/`plumb` clause, or a continuation of the previous
//! clause's pattern list). Comments and blank lines are stripped before
//! anything else runs, so neither ever reaches the grammar proper.
//!
//! Every `data verb ...` clause is lowered to the equivalent
//! `arg verb {data} ...` clause here, so the rest of the crate never has to
//! know `data` clauses exist.

use regex::Regex;

use crate::error::{Error, ParseError, Result};
use crate::message::Kind;
use crate::rules::{ActionClause, MatchClause, Rule, RulesProgram};

/// One non-blank, non-comment line, with enough context to report a
/// caret-pointer diagnostic and to detect continuation lines.
struct Line<'a> {
    number: usize,
    raw: &'a str,
    /// `raw` with any trailing comment stripped and trailing whitespace
    /// trimmed. Leading whitespace is preserved so continuation lines can
    /// be told apart from new clauses.
    content: &'a str,
}

impl<'a> Line<'a> {
    fn is_continuation(&self) -> bool {
        self.raw.starts_with(' ') || self.raw.starts_with('\t')
    }

    fn trimmed(&self) -> &'a str {
        self.content.trim_start_matches([' ', '\t'])
    }

    fn first_token(&self) -> &'a str {
        self.trimmed().split_whitespace().next().unwrap_or("")
    }

    /// Column (1-indexed, counted in chars) of the start of `needle` within
    /// the raw line, falling back to column 1 if it can't be found.
    fn column_of(&self, needle: &str) -> usize {
        match self.raw.find(needle) {
            Some(byte_idx) => self.raw[..byte_idx].chars().count() + 1,
            None => 1,
        }
    }

    fn err(&self, at: &str, message: impl Into<String>) -> Error {
        ParseError {
            line: self.number,
            column: self.column_of(at),
            line_text: self.raw.to_string(),
            message: message.into(),
        }
        .into()
    }
}

/// Strip a trailing comment from a raw line, if any. A line whose first
/// non-whitespace character is `#` is a whole-line comment (becomes
/// empty). An inline comment is introduced by whitespace followed by `#`.
fn strip_comment(raw: &str) -> &str {
    let trimmed_start = raw.trim_start_matches([' ', '\t']);
    if trimmed_start.starts_with('#') {
        return "";
    }
    let mut prev_is_space = false;
    for (idx, ch) in raw.char_indices() {
        if ch == '#' && prev_is_space {
            return raw[..idx].trim_end_matches([' ', '\t']);
        }
        prev_is_space = ch == ' ' || ch == '\t';
    }
    raw.trim_end_matches([' ', '\t', '\r'])
}

fn logical_lines(source: &str) -> Vec<Line<'_>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let content = strip_comment(raw);
            if content.trim().is_empty() {
                None
            } else {
                Some(Line {
                    number: idx + 1,
                    raw,
                    content,
                })
            }
        })
        .collect()
}

/// Parse a complete rules file from its source text.
pub fn parse(source: &str) -> Result<RulesProgram> {
    let lines = logical_lines(source);
    if lines.is_empty() {
        return Err(ParseError {
            line: 1,
            column: 1,
            line_text: String::new(),
            message: "rules file contains no rules".to_string(),
        }
        .into());
    }

    let mut rules = Vec::new();
    let mut pos = 0;
    while pos < lines.len() {
        let (rule, next) = parse_rule(&lines, pos)?;
        rules.push(rule);
        pos = next;
    }
    Ok(RulesProgram { rules })
}

fn parse_rule(lines: &[Line], pos: usize) -> Result<(Rule, usize)> {
    let heading = &lines[pos];
    let name = parse_heading(heading)?;
    let mut pos = pos + 1;

    let mut match_clauses = Vec::new();

    if pos < lines.len() && lines[pos].first_token() == "kind" {
        let (clause, next) = parse_kind_clause(lines, pos)?;
        match_clauses.push(clause);
        pos = next;
    }

    while pos < lines.len() {
        let tok = lines[pos].first_token();
        if tok == "arg" || tok == "data" {
            let (clause, next) = parse_match_clause(lines, pos)?;
            match_clauses.push(clause);
            pos = next;
        } else {
            break;
        }
    }

    let mut action_clauses = Vec::new();
    while pos < lines.len() && lines[pos].first_token() == "plumb" {
        action_clauses.push(parse_action_clause(&lines[pos])?);
        pos += 1;
    }

    if action_clauses.is_empty() {
        let at = lines.get(pos).unwrap_or(heading);
        return Err(at.err(
            at.trimmed(),
            format!("rule '{name}' has no action clauses (every rule needs at least one 'plumb' action)"),
        ));
    }

    Ok((
        Rule {
            name,
            match_clauses,
            action_clauses,
        },
        pos,
    ))
}

fn parse_heading(line: &Line) -> Result<String> {
    let content = line.trimmed();
    if !content.starts_with('[') || !content.ends_with(']') || content.len() < 2 {
        return Err(line.err(content, "expected a rule heading like '[name]'"));
    }
    let name = &content[1..content.len() - 1];
    if name.is_empty() {
        return Err(line.err(content, "rule heading name must not be empty"));
    }
    if name.contains(['{', '}', '[', ']']) {
        return Err(line.err(
            content,
            "rule heading name must not contain '{', '}', '[' or ']'",
        ));
    }
    Ok(name.to_string())
}

fn parse_kind_clause(lines: &[Line], pos: usize) -> Result<(MatchClause, usize)> {
    let line = &lines[pos];
    let tokens: Vec<&str> = line.trimmed().split_whitespace().collect();
    if tokens.len() != 3 || tokens[0] != "kind" || tokens[1] != "is" {
        return Err(line.err(line.trimmed(), "expected 'kind is url' or 'kind is raw'"));
    }
    let kind = match tokens[2] {
        "url" => Kind::Url,
        "raw" => Kind::Raw,
        other => {
            return Err(line.err(other, format!("unknown kind '{other}', expected 'url' or 'raw'")))
        }
    };
    Ok((MatchClause::KindIs(kind), pos + 1))
}

const MATCH_VERBS: [&str; 4] = ["is", "istype", "matches", "rewrite"];

fn parse_match_clause(lines: &[Line], pos: usize) -> Result<(MatchClause, usize)> {
    let line = &lines[pos];
    let tokens: Vec<&str> = line.trimmed().split_whitespace().collect();
    let is_data = tokens[0] == "data";

    if tokens.len() < 2 || !MATCH_VERBS.contains(&tokens[1]) {
        return Err(line.err(
            line.trimmed(),
            "expected a verb: 'is', 'istype', 'matches' or 'rewrite'",
        ));
    }
    let verb = tokens[1];

    let (variable, first_pattern_tokens): (String, &[&str]) = if is_data {
        ("{data}".to_string(), &tokens[2..])
    } else {
        if tokens.len() < 3 {
            return Err(line.err(line.trimmed(), "'arg' clause is missing its variable"));
        }
        (tokens[2].to_string(), &tokens[3..])
    };

    if first_pattern_tokens.is_empty() {
        return Err(line.err(
            line.trimmed(),
            format!("'{verb}' clause requires at least one pattern"),
        ));
    }

    let mut patterns = vec![first_pattern_tokens.join(" ")];
    let mut pos = pos + 1;
    while pos < lines.len() && lines[pos].is_continuation() {
        patterns.push(lines[pos].trimmed().to_string());
        pos += 1;
    }

    let clause = build_match_clause(line, verb, variable, patterns)?;
    Ok((clause, pos))
}

fn build_match_clause(
    line: &Line,
    verb: &str,
    variable: String,
    patterns: Vec<String>,
) -> Result<MatchClause> {
    match verb {
        "is" => Ok(MatchClause::ArgIs {
            template: variable,
            choices: patterns,
        }),
        "matches" => {
            let compiled = compile_patterns(line, &patterns)?;
            Ok(MatchClause::ArgMatches {
                template: variable,
                patterns: compiled,
            })
        }
        "istype" => {
            let compiled = compile_patterns(line, &patterns)?;
            Ok(MatchClause::ArgIsType {
                template: variable,
                patterns: compiled,
            })
        }
        "rewrite" => {
            let substitutions = patterns
                .into_iter()
                .map(|p| parse_substitution(line, &p))
                .collect::<Result<Vec<_>>>()?;
            Ok(MatchClause::ArgRewrite {
                field: reference_name(line, &variable)?,
                substitutions,
            })
        }
        _ => unreachable!("verb already validated"),
    }
}

fn compile_patterns(line: &Line, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| line.err(p, format!("invalid regular expression: {e}"))))
        .collect()
}

fn parse_substitution(line: &Line, pattern: &str) -> Result<(String, String)> {
    match pattern.split_once(',') {
        Some((needle, replacement)) => Ok((needle.to_string(), replacement.to_string())),
        None => Err(line.err(
            pattern,
            "'rewrite' pattern must be a 'needle,replacement' pair",
        )),
    }
}

fn reference_name(line: &Line, variable: &str) -> Result<String> {
    let inner = variable
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| {
            line.err(
                variable,
                "'rewrite' clause's variable must be a single '{name}' reference",
            )
        })?;
    if inner.is_empty() {
        return Err(line.err(variable, "'rewrite' clause's reference name must not be empty"));
    }
    Ok(inner.to_string())
}

fn parse_action_clause(line: &Line) -> Result<ActionClause> {
    let tokens: Vec<&str> = line.trimmed().split_whitespace().collect();
    if tokens.len() < 3 || tokens[0] != "plumb" {
        return Err(line.err(line.trimmed(), "expected 'plumb run ...' or 'plumb download ...'"));
    }
    let arg = tokens[2..].join(" ");
    match tokens[1] {
        "run" => Ok(ActionClause::Run(arg)),
        "download" => Ok(ActionClause::Download(arg)),
        other => Err(line.err(other, format!("unknown plumb verb '{other}', expected 'run' or 'download'"))),
    }
}
