//! Expansion of `{name}` / `{N}` placeholders against a message context and
//! a capture tuple.
//!
//! `{` and `}` cannot currently be escaped; see the design notes on this
//! limitation. A doubled-brace escape is a plausible future extension, not
//! implemented here.

use crate::error::{Error, Result};
use crate::message::Message;

/// One raw placeholder found inside a template, e.g. `"0"` or `"netloc"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference(pub String);

/// Returns every placeholder name referenced in `template`, in order of
/// appearance, without resolving them. Used to log expanded bindings before
/// an action runs.
pub fn list_references(template: &str) -> Vec<Reference> {
    let mut refs = Vec::new();
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i + 1..].find('}') {
                let name = &template[i + 1..i + 1 + end];
                refs.push(Reference(name.to_string()));
                i += end + 2;
                continue;
            }
        }
        i += 1;
    }
    refs
}

/// Expand every `{N}` / `{name}` placeholder in `template`.
///
/// `{N}` looks up `captures[N]`; everything else looks up `message[name]`.
/// A placeholder that resolves to nothing is a [`Error::BadReference`], not
/// an empty-string substitution.
pub fn expand(template: &str, message: &Message, captures: &[String]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i + 1..].find('}') {
                let name = &template[i + 1..i + 1 + end];
                out.push_str(&resolve(name, message, captures)?);
                i += end + 2;
                continue;
            }
        }
        // Not a placeholder start (or an unterminated one): copy one char
        // and move on. Indexing by byte is safe here because `{` is ASCII
        // and we only ever advance past non-'{' bytes one at a time, never
        // splitting a UTF-8 continuation byte off from its lead byte.
        let ch_len = utf8_char_len(bytes[i]);
        out.push_str(&template[i..i + ch_len]);
        i += ch_len;
    }
    Ok(out)
}

fn utf8_char_len(first_byte: u8) -> usize {
    if first_byte & 0x80 == 0 {
        1
    } else if first_byte & 0xE0 == 0xC0 {
        2
    } else if first_byte & 0xF0 == 0xE0 {
        3
    } else {
        4
    }
}

fn resolve(name: &str, message: &Message, captures: &[String]) -> Result<String> {
    if let Ok(idx) = name.parse::<usize>() {
        return captures
            .get(idx)
            .cloned()
            .ok_or_else(|| Error::BadReference(name.to_string()));
    }
    message
        .get(name)
        .map(|f| f.as_text().into_owned())
        .ok_or_else(|| Error::BadReference(name.to_string()))
}
