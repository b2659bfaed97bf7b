//! Lexer for template placeholders using logos
//!
//! A string field is split into literal text and `{{NAME}}` placeholders.
//! Spaces or tabs just inside the braces are tolerated. Anything that does
//! not form a complete placeholder (`{{ not a name }}`, a lone `{`) lexes as
//! literal text.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[regex(r"\{\{[ \t]*[A-Za-z_][A-Za-z0-9_]*[ \t]*\}\}", |lex| {
        let s = lex.slice();
        s[2..s.len() - 2].trim().to_string()
    })]
    Placeholder(String),

    #[regex(r"[^{]+")]
    Text,

    #[token("{")]
    Brace,
}

/// A piece of a lexed field value
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// Variable name and the exact source text of the placeholder
    Variable { name: String, raw: &'a str },
}

/// Split a field value into literal and placeholder segments
///
/// Adjacent literal tokens are merged, so `"a{b"` is one literal. No byte of
/// the input is dropped: concatenating the segments' source text yields the
/// input again.
pub fn segments(input: &str) -> Vec<Segment<'_>> {
    let mut out: Vec<Segment<'_>> = Vec::new();
    let mut literal_start: Option<usize> = None;

    for (token, span) in Token::lexer(input).spanned() {
        match token {
            Ok(Token::Placeholder(name)) => {
                if let Some(start) = literal_start.take() {
                    out.push(Segment::Literal(&input[start..span.start]));
                }
                out.push(Segment::Variable {
                    name,
                    raw: &input[span],
                });
            }
            // Unlexable input is kept verbatim
            Ok(Token::Text) | Ok(Token::Brace) | Err(_) => {
                literal_start.get_or_insert(span.start);
            }
        }
    }

    if let Some(start) = literal_start {
        out.push(Segment::Literal(&input[start..]));
    }

    out
}
