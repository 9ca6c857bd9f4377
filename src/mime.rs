//! Guessing a content type for a URL/path or a raw byte buffer, with an
//! HTTP HEAD fallback for URLs that can't be classified from their path.

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.3; rv:36.0) Gecko/20100101 Firefox/36.0";

/// The MIME backend, as a trait so tests can inject a deterministic double
/// instead of touching the filesystem magic database or the network.
pub trait MimeClassifier {
    /// Deterministic mapping from a file extension / URL path suffix. No I/O.
    fn guess_from_path(&self, s: &str) -> Option<String>;
    /// Content sniffing via magic bytes.
    fn guess_from_buffer(&self, bytes: &[u8]) -> Option<String>;
    /// HTTP HEAD request, parsing the `Content-Type` response header and
    /// discarding any `;`-delimited parameter. Fails silently on any
    /// network/parse error.
    fn head_lookup(&self, url: &str) -> Option<String>;
}

/// The production classifier: extension guessing via `mime_guess`, buffer
/// sniffing via `tree_magic_mini`, and a blocking HTTP HEAD via `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultClassifier;

impl MimeClassifier for DefaultClassifier {
    fn guess_from_path(&self, s: &str) -> Option<String> {
        let path = s.split(['?', '#']).next().unwrap_or(s);
        mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
    }

    fn guess_from_buffer(&self, bytes: &[u8]) -> Option<String> {
        Some(tree_magic_mini::from_u8(bytes).to_string())
    }

    fn head_lookup(&self, url: &str) -> Option<String> {
        let response = ureq::head(url).set("User-Agent", USER_AGENT).call().ok()?;
        let content_type = response.header("Content-Type")?;
        let essence = content_type.split(';').next()?.trim();
        if essence.is_empty() {
            None
        } else {
            Some(essence.to_string())
        }
    }
}

/// Classify `s` (of kind `k`) per the policy in the design document: a URL
/// tries path-guessing then HEAD; a raw buffer is sniffed directly.
pub fn classify(
    classifier: &dyn MimeClassifier,
    kind: crate::message::Kind,
    s: &[u8],
) -> Option<String> {
    use crate::message::Kind;
    match kind {
        Kind::Url => {
            let url = String::from_utf8_lossy(s);
            classifier
                .guess_from_path(&url)
                .or_else(|| classifier.head_lookup(&url))
        }
        Kind::Raw => classifier.guess_from_buffer(s),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::MimeClassifier;
    use std::cell::RefCell;

    /// A classifier double that returns canned answers and records what it
    /// was asked, so tests can assert the fallback order without touching
    /// the network.
    #[derive(Default)]
    pub struct FakeClassifier {
        pub path_answer: Option<String>,
        pub buffer_answer: Option<String>,
        pub head_answer: Option<String>,
        pub head_calls: RefCell<Vec<String>>,
    }

    impl MimeClassifier for FakeClassifier {
        fn guess_from_path(&self, _s: &str) -> Option<String> {
            self.path_answer.clone()
        }

        fn guess_from_buffer(&self, _bytes: &[u8]) -> Option<String> {
            self.buffer_answer.clone()
        }

        fn head_lookup(&self, url: &str) -> Option<String> {
            self.head_calls.borrow_mut().push(url.to_string());
            self.head_answer.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeClassifier;
    use super::*;
    use crate::message::Kind;

    #[test]
    fn url_falls_back_to_head_when_path_guess_fails() {
        let c = FakeClassifier {
            path_answer: None,
            head_answer: Some("text/html".to_string()),
            ..Default::default()
        };
        let got = classify(&c, Kind::Url, b"https://example.com/unknown");
        assert_eq!(got.as_deref(), Some("text/html"));
        assert_eq!(c.head_calls.borrow().len(), 1);
    }

    #[test]
    fn url_skips_head_when_path_guess_succeeds() {
        let c = FakeClassifier {
            path_answer: Some("image/png".to_string()),
            ..Default::default()
        };
        let got = classify(&c, Kind::Url, b"https://example.com/a.png");
        assert_eq!(got.as_deref(), Some("image/png"));
        assert!(c.head_calls.borrow().is_empty());
    }

    #[test]
    fn raw_uses_buffer_sniffing_only() {
        let c = FakeClassifier {
            buffer_answer: Some("application/pdf".to_string()),
            ..Default::default()
        };
        let got = classify(&c, Kind::Raw, b"%PDF-1.4 ...");
        assert_eq!(got.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn classification_failure_is_none_not_error() {
        let c = FakeClassifier::default();
        assert_eq!(classify(&c, Kind::Raw, b"???"), None);
    }
}
