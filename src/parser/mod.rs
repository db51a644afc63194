//! Markup Parser
//!
//! Tokenization of speech-markup documents and helpers to recover the
//! spoken text between tokens. No schema knowledge lives here.

pub mod attributes;
pub mod lexer;

pub use attributes::{parse_attributes, Attribute};
pub use lexer::{tokenize, Token, TokenKind};

/// Remove all markup from a document, keeping text and CDATA content.
///
/// Entities are left as written, so `&amp;` stays five characters long.
pub fn strip_markup(input: &str) -> String {
    let tokens = tokenize(input);
    let mut text = String::with_capacity(input.len());
    let mut cursor = 0;

    for token in &tokens {
        text.push_str(&input[cursor..token.start]);
        text.push_str(token.spoken_text());
        cursor = token.end;
    }
    text.push_str(&input[cursor..]);

    text
}

/// Find the token covering a byte offset
pub fn token_at(tokens: &[Token<'_>], offset: usize) -> Option<usize> {
    tokens
        .iter()
        .position(|t| t.start <= offset && offset < t.end)
}
