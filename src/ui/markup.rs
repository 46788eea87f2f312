//! Minimal pango-style markup. Styling tags are validated and stripped; only
//! the text content is drawn.

use std::borrow::Cow;

use thiserror::Error;
use tracing::error;

const TAGS: &[&str] = &["b", "big", "i", "s", "small", "span", "sub", "sup", "tt", "u"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unknown tag <{0}>")]
    UnknownTag(String),
    #[error("unexpected closing tag </{0}>")]
    UnexpectedClose(String),
    #[error("unclosed tag <{0}>")]
    Unclosed(String),
    #[error("unterminated tag")]
    UnterminatedTag,
    #[error("invalid entity &{0};")]
    BadEntity(String),
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Returns the text content of `markup`.
pub fn parse_markup(markup: &str) -> Result<String, MarkupError> {
    let mut out = String::with_capacity(markup.len());
    let mut open: Vec<&str> = Vec::new();
    let mut rest = markup;

    while let Some(pos) = rest.find(['<', '&']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if let Some(after) = rest.strip_prefix('&') {
            let end = after.find(';').ok_or_else(|| MarkupError::BadEntity(after.to_string()))?;
            let name = &after[..end];
            let c = decode_entity(name).ok_or_else(|| MarkupError::BadEntity(name.to_string()))?;
            out.push(c);
            rest = &after[end + 1..];
            continue;
        }

        let end = rest.find('>').ok_or(MarkupError::UnterminatedTag)?;
        let tag = &rest[1..end];
        rest = &rest[end + 1..];
        if let Some(name) = tag.strip_prefix('/') {
            let name = name.trim();
            match open.pop() {
                Some(top) if top == name => {}
                _ => return Err(MarkupError::UnexpectedClose(name.to_string())),
            }
        } else {
            let self_closing = tag.ends_with('/');
            let tag = tag.trim_end_matches('/');
            let name = tag.split_whitespace().next().unwrap_or("");
            if !TAGS.contains(&name) {
                return Err(MarkupError::UnknownTag(name.to_string()));
            }
            if !self_closing {
                open.push(name);
            }
        }
    }
    out.push_str(rest);

    match open.pop() {
        Some(name) => Err(MarkupError::Unclosed(name.to_string())),
        None => Ok(out),
    }
}

/// The text to draw for a label. Malformed markup is drawn as plain text.
pub fn display_text(label: &str, markup: bool) -> Cow<'_, str> {
    if !markup {
        return Cow::Borrowed(label);
    }
    match parse_markup(label) {
        Ok(text) => Cow::Owned(text),
        Err(err) => {
            error!(?label, "failed to parse markup: {err}");
            Cow::Borrowed(label)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn strips_tags_and_decodes_entities() {
        assert_eq!(
            parse_markup("<b>Fish</b> &amp; <span foreground=\"red\">Chips</span>&#33;"),
            Ok("Fish & Chips!".to_string())
        );
        assert_eq!(parse_markup("plain"), Ok("plain".to_string()));
        assert_eq!(parse_markup("&#x41;&lt;&gt;"), Ok("A<>".to_string()));
    }

    #[test]
    fn rejects_malformed_markup() {
        assert_eq!(parse_markup("<b>open"), Err(MarkupError::Unclosed("b".into())));
        assert_eq!(parse_markup("<b><i></b></i>"), Err(MarkupError::UnexpectedClose("b".into())));
        assert_eq!(parse_markup("<blink>x</blink>"), Err(MarkupError::UnknownTag("blink".into())));
        assert_eq!(parse_markup("a & b"), Err(MarkupError::BadEntity(" b".into())));
        assert_eq!(parse_markup("<b"), Err(MarkupError::UnterminatedTag));
    }

    #[test_log::test]
    fn malformed_markup_falls_back_to_raw_text() {
        assert_eq!(display_text("Tom & Jerry", true), "Tom & Jerry");
        assert_eq!(display_text("<i>Tom</i>", true), "Tom");
        assert_eq!(display_text("<i>Tom</i>", false), "<i>Tom</i>");
    }
}
