/*!

This crate provides both a library as well as a standalone binary
implementing [mario], a "plumber" in the style of the Plan 9 plumber: given
a single message — either a URL or an opaque byte blob — it selects and
executes an external handler program according to a user-authored rules
file.

# What?

A rules file is a sequence of named rules, each made of match clauses
followed by action clauses. Rules are tried top-to-bottom; the first one
whose match clauses all succeed wins, and its actions run.

```text
[web]
kind is url
plumb run firefox {data}

[paste]
arg matches {data} ^https://paste\.example/(\w+)$
plumb run xdg-open https://raw.example/{0}
```

If this rules file is plumbed with `https://paste.example/abc123`, the
`web` rule's `kind is url` clause matches, so the loop does not even
consider `paste`: the first rule whose clauses all succeed wins. (In
practice you would order the more specific `paste` rule first.)

# What mario can match

Literal equality (`arg is`), regular expressions with capture propagation
(`arg matches`), MIME-type classification by extension or content sniffing
with an HTTP HEAD fallback (`arg istype`), and in-place string rewriting
(`arg rewrite`). `data verb ...` is sugar for `arg verb {data} ...`
normalized away by the parser.

[mario]: https://ghom.niij.org/eaon/mario/
*/

extern crate log;
extern crate mime_guess;
extern crate regex;
extern crate tempfile;
extern crate thiserror;
extern crate tree_magic_mini;
extern crate ureq;

#[cfg(feature = "standalone")]
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod message;
pub mod mime;
pub mod orchestrator;
pub mod parser;
pub mod rules;
pub mod template;

pub use dispatch::{HttpFetcher, ProcessRunner, SystemProcessRunner, UreqFetcher};
pub use error::{Error, ParseError, Result};
pub use message::{Field, Kind, Message};
pub use mime::{DefaultClassifier, MimeClassifier};
pub use orchestrator::{plumb, Outcome};
pub use rules::{ActionClause, MatchClause, Rule, RulesProgram};

/// Parse a rules program from its source text and immediately plumb
/// `message` through it, using the production MIME classifier, process
/// runner and HTTP fetcher.
///
/// This is the convenience entry point the standalone binary uses; library
/// consumers that want to inject test doubles should call
/// [`parser::parse`] and [`orchestrator::plumb`] directly.
pub fn plumb_message(rules_source: &str, mut message: Message) -> Result<Outcome> {
    let program = parser::parse(rules_source)?;
    let classifier = DefaultClassifier;
    let runner = SystemProcessRunner;
    let fetcher = UreqFetcher;
    orchestrator::plumb(&program, &mut message, &classifier, &runner, &fetcher)
}
