//! Attribute Parsing
//!
//! Extracts `name="value"` pairs from the raw attribute text of a tag.
//! Only double-quoted values are recognized.

use std::sync::LazyLock;

use regex::Regex;

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_:.-]*)\s*=\s*"([^"]*)""#)
        .expect("attribute pattern is a valid regex")
});

/// A single attribute as written in the document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// Parse attribute text into name/value pairs, in source order
pub fn parse_attributes(text: &str) -> Vec<Attribute<'_>> {
    ATTRIBUTE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            Some(Attribute {
                name: caps.get(1)?.as_str(),
                value: caps.get(2)?.as_str(),
            })
        })
        .collect()
}
