use thiserror::Error;

/// A rules-file syntax error, carrying enough context to render the
/// caret-pointer diagnostic the parser is known for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub line_text: String,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} at line {}, column {}:", self.message, self.line, self.column)?;
        writeln!(f, "{}", self.line_text)?;
        let caret_col = self.column.saturating_sub(1);
        write!(f, "\t{}^", " ".repeat(caret_col))
    }
}

/// The error taxonomy for every fallible operation in this crate.
///
/// `ClassificationFailure` from the design document has no variant here: a
/// MIME classifier that can't determine a type simply returns `None`, it
/// isn't treated as an error at all.
#[derive(Error, Debug)]
pub enum Error {
    /// The rules file could not be parsed.
    #[error("{0}")]
    Parse(ParseError),
    /// A template referenced a placeholder that doesn't exist.
    #[error("no such reference {{{0}}} in template")]
    BadReference(String),
    /// A `plumb run` or `plumb download` action failed.
    #[error("action failed: {0}")]
    ActionFailure(String),
    /// The rules file couldn't be opened or read.
    #[error("could not read rules file: {0}")]
    RulesIo(#[source] std::io::Error),
    /// The config file couldn't be opened or read. Not fatal; the caller
    /// falls back to defaults and only logs this.
    #[error("could not read config file: {0}")]
    ConfigIo(#[source] std::io::Error),
    /// Generic I/O failure (e.g. during download or temp-file creation).
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A pattern in a rules file did not compile as a regular expression.
    #[error(transparent)]
    Regex(#[from] regex::Error),
    /// A `plumb download` URL could not be fetched.
    #[error("download failed: {0}")]
    Download(#[from] Box<ureq::Error>),
    /// Not a real error case per se, but the engine needs to reject
    /// filters/messages that violate a documented invariant.
    #[error("{0}")]
    Invariant(String),
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<ureq::Error> for Error {
    fn from(e: ureq::Error) -> Self {
        Error::Download(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
