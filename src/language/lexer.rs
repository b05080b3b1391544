//! Character-level recognizers used by the scanner. Nothing here builds a
//! token list; each function consumes one piece of input and returns the rest.

use nom::{
    branch::alt,
    bytes::complete::take_till,
    character::complete::{char, digit1, multispace1, not_line_ending},
    combinator::{all_consuming, opt, recognize},
    multi::many0_count,
    sequence::{pair, preceded},
    IResult, Parser as NomParser,
};

pub const MAX_IDENTIFIER_LEN: usize = 255;

pub const KEYWORDS: [&str; 7] = ["set", "if", "for", "block", "return", "function", "global"];

/// Skips whitespace and `;` line comments.
pub fn trivia(input: &str) -> IResult<&str, usize> {
    many0_count(alt((multispace1, line_comment))).parse(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(preceded(char(';'), not_line_ending)).parse(input)
}

/// A raw token runs until whitespace, `)` or `;`. An empty match is allowed.
pub fn raw_token(input: &str) -> IResult<&str, &str> {
    take_till(|ch: char| ch.is_whitespace() || ch == ')' || ch == ';')(input)
}

/// Integer literal text: digits, optionally preceded by a single `-`.
fn literal_shape(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(char('-')), digit1)).parse(input)
}

pub fn is_literal(token: &str) -> bool {
    all_consuming(literal_shape)(token).is_ok()
}

pub fn is_keyword(token: &str) -> bool {
    KEYWORDS.contains(&token)
}

/// Tokens starting with a digit are meant as literals; `-` plus digits is a
/// negative literal and never an identifier.
pub fn looks_numeric(token: &str) -> bool {
    token.starts_with(|ch: char| ch.is_ascii_digit()) || is_literal(token)
}

pub fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LEN {
        return false;
    }
    if looks_numeric(name) {
        return false;
    }
    let printable = name
        .chars()
        .all(|ch| ch.is_ascii_graphic() && !"();".contains(ch));
    printable && !is_keyword(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivia_skips_comments_and_whitespace() {
        let (rest, _) = trivia("  ; comment (ignored)\n\t ; more\n(set").unwrap();
        assert_eq!(rest, "(set");
        let (rest, count) = trivia("x").unwrap();
        assert_eq!((rest, count), ("x", 0));
    }

    #[test]
    fn raw_token_stops_at_delimiters() {
        assert_eq!(raw_token("abc)").unwrap(), (")", "abc"));
        assert_eq!(raw_token("a.b;c").unwrap(), (";c", "a.b"));
        assert_eq!(raw_token(") x").unwrap(), (") x", ""));
        assert_eq!(raw_token("(x y").unwrap(), (" y", "(x"));
    }

    #[test]
    fn identifier_rules() {
        assert!(is_valid_identifier("-"));
        assert!(is_valid_identifier("array.get"));
        assert!(is_valid_identifier("-x1"));
        assert!(is_valid_identifier("<="));
        assert!(!is_valid_identifier("-12"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("for"));
        assert!(!is_valid_identifier("global"));
        assert!(!is_valid_identifier("a(b"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier(&"x".repeat(MAX_IDENTIFIER_LEN + 1)));
        assert!(is_valid_identifier(&"x".repeat(MAX_IDENTIFIER_LEN)));
    }

    #[test]
    fn literal_shapes() {
        assert!(is_literal("42"));
        assert!(is_literal("-5"));
        assert!(!is_literal("-"));
        assert!(!is_literal("4a"));
        assert!(looks_numeric("4a"));
    }
}
