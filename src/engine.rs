//! Evaluating a single rule's match clauses against a message.
//!
//! Clauses are evaluated left to right; the first one to fail aborts the
//! whole rule. Crucially, updates a clause makes to the message (via
//! `arg rewrite`) are **not** rolled back if a later clause in the same
//! rule fails — this mirrors the original plumber's behavior of mutating
//! the message in place while still deciding whether the rule as a whole
//! matches. Callers that want a cleaner "all or nothing" rewrite semantics
//! should clone the message before calling [`evaluate_rule`] and only keep
//! the clone when it returns `Some`.

use log::debug;

use crate::error::Result;
use crate::message::{Field, Message};
use crate::mime::{self, MimeClassifier};
use crate::rules::{MatchClause, Rule};
use crate::template;

/// Evaluate `rule`'s match clauses against `message` in place.
///
/// Returns `Ok(Some(captures))` if every clause succeeded, `Ok(None)` if
/// some clause failed (the rule doesn't match), and `Err` only for
/// unexpected errors unrelated to whether the rule matches (a malformed
/// template reference, for instance).
pub fn evaluate_rule(
    rule: &Rule,
    message: &mut Message,
    classifier: &dyn MimeClassifier,
) -> Result<Option<Vec<String>>> {
    let mut captures: Vec<String> = Vec::new();

    for clause in &rule.match_clauses {
        let ok = evaluate_clause(clause, message, &mut captures, classifier)?;
        debug!("rule '{}': clause {:?} -> {}", rule.name, clause, ok);
        if !ok {
            return Ok(None);
        }
    }

    Ok(Some(captures))
}

fn evaluate_clause(
    clause: &MatchClause,
    message: &mut Message,
    captures: &mut Vec<String>,
    classifier: &dyn MimeClassifier,
) -> Result<bool> {
    match clause {
        MatchClause::KindIs(k) => Ok(message.kind() == *k),
        MatchClause::ArgIs { template: tmpl, choices } => {
            let expanded = template::expand(tmpl, message, captures)?;
            Ok(choices.iter().any(|c| c == &expanded))
        }
        MatchClause::ArgMatches { template: tmpl, patterns } => {
            let expanded = template::expand(tmpl, message, captures)?;
            for re in patterns {
                if let Some(caps) = re.captures(&expanded) {
                    if caps.len() > 1 {
                        for group in caps.iter().skip(1) {
                            captures.push(group.map(|m| m.as_str().to_string()).unwrap_or_default());
                        }
                    } else {
                        captures.push(caps.get(0).unwrap().as_str().to_string());
                    }
                    return Ok(true);
                }
            }
            Ok(false)
        }
        MatchClause::ArgIsType { template: tmpl, patterns } => {
            let expanded = template::expand(tmpl, message, captures)?;
            let bytes = expanded.as_bytes();
            match mime::classify(classifier, message.kind(), bytes) {
                Some(mime_type) => Ok(patterns.iter().any(|p| p.is_match(&mime_type))),
                None => Ok(false),
            }
        }
        MatchClause::ArgRewrite { field, substitutions } => {
            let reference = format!("{{{field}}}");
            let mut value = template::expand(&reference, message, captures)?;
            for (needle, replacement) in substitutions {
                value = value.replace(needle.as_str(), replacement);
            }
            message.set(field.clone(), Field::Text(value));
            Ok(true)
        }
    }
}

/// Convenience wrapper matching the design document's public contract:
/// returns `None` if the rule doesn't match, `Some((message, captures))`
/// (with `message` mutated in place) otherwise.
pub fn try_match<'m>(
    rule: &Rule,
    message: &'m mut Message,
    classifier: &dyn MimeClassifier,
) -> Result<Option<(&'m mut Message, Vec<String>)>> {
    match evaluate_rule(rule, message, classifier)? {
        Some(captures) => Ok(Some((message, captures))),
        None => Ok(None),
    }
}
