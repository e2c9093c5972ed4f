//! Lexical utilities shared by both passes: comment/whitespace stripping,
//! token extraction, and strict integer parsing.

use crate::{DATA_MAX, DATA_MIN, MAX_NAME_LEN};

/// Opcodes, directive stems, macro keywords, and register names — none of
/// these may be used as a label or macro name.
pub const RESERVED: &[&str] = &[
    "mov", "cmp", "add", "sub", "lea", "clr", "not", "inc", "dec", "jmp", "bne", "jsr", "red",
    "prn", "rts", "stop", "data", "string", "mat", "entry", "extern", "mcro", "mcroend", "r0",
    "r1", "r2", "r3", "r4", "r5", "r6", "r7",
];

/// Validate an identifier (label or macro name): starts with a letter, the
/// rest alnum or `_`, at most [`MAX_NAME_LEN`] characters, not a reserved
/// word.
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty name".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("'{}' exceeds {} characters", name, MAX_NAME_LEN));
    }
    if !name.chars().next().unwrap().is_ascii_alphabetic()
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(format!("'{}' is not a valid name", name));
    }
    if RESERVED.contains(&name) {
        return Err(format!("'{}' is a reserved word", name));
    }
    Ok(())
}

/// Strip leading/trailing whitespace and anything from `;` onward.
pub fn trim(line: &str) -> &str {
    let without_comment = match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    };
    without_comment.trim()
}

/// A token cursor over the remainder of a line. Whitespace delimits tokens;
/// a label's trailing `:` is kept as part of its token so [`is_label`] can
/// recognize it, and is otherwise consumed as a separator.
pub struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// What's left of the line, for diagnostics or re-tokenizing manually.
    pub fn remainder(&self) -> &'a str {
        self.rest.trim_start()
    }

    /// What's left of the line without trimming leading whitespace, so a
    /// caller can count the separator between the last token and this one.
    pub fn remainder_untrimmed(&self) -> &'a str {
        self.rest
    }

    /// Consume and return the next token, or `None` if only whitespace is
    /// left.
    pub fn next_token(&mut self) -> Option<&'a str> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .find(|c: char| c.is_whitespace() || c == ':')
            .unwrap_or(self.rest.len());
        let colon = self.rest[end..].starts_with(':');
        let tok_end = if colon { end + 1 } else { end };
        let (tok, after) = self.rest.split_at(tok_end);
        self.rest = after;
        Some(tok)
    }
}

/// True if `tok` (as returned by [`Cursor::next_token`]) ended with `:`.
pub fn is_label(tok: &str) -> bool {
    tok.ends_with(':')
}

/// Parse a whole token as a signed decimal integer in `[-512, 511]`. The
/// whole token must be consumed; partial matches are an error.
pub fn parse_int(tok: &str) -> Result<i32, String> {
    let value: i32 = tok
        .parse()
        .map_err(|_| format!("'{}' is not a valid integer", tok))?;
    if !(DATA_MIN..=DATA_MAX).contains(&value) {
        return Err(format!("value {} out of range [{}, {}]", value, DATA_MIN, DATA_MAX));
    }
    Ok(value)
}

#[test]
fn validate_identifier_allows_underscores() {
    assert!(validate_identifier("MY_LABEL").is_ok());
}

#[test]
fn validate_identifier_rejects_reserved_words_and_bad_starts() {
    assert!(validate_identifier("stop").is_err());
    assert!(validate_identifier("r3").is_err());
    assert!(validate_identifier("1x").is_err());
    assert!(validate_identifier("").is_err());
}

#[test]
fn trim_strips_comment_and_whitespace() {
    assert_eq!(trim("   mov r1, r2  ; move it"), "mov r1, r2");
    assert_eq!(trim("; just a comment"), "");
    assert_eq!(trim("   "), "");
}

#[test]
fn cursor_splits_on_whitespace() {
    let mut c = Cursor::new("mov r1, r2");
    assert_eq!(c.next_token(), Some("mov"));
    assert_eq!(c.next_token(), Some("r1,"));
    assert_eq!(c.next_token(), Some("r2"));
    assert_eq!(c.next_token(), None);
}

#[test]
fn cursor_keeps_label_colon_on_the_token() {
    let mut c = Cursor::new("LOOP: add r1, r2");
    let tok = c.next_token().unwrap();
    assert_eq!(tok, "LOOP:");
    assert!(is_label(tok));
    assert_eq!(c.remainder(), "add r1, r2");
}

#[test]
fn cursor_treats_a_lone_colon_as_a_separator() {
    let mut c = Cursor::new("LOOP:add r1");
    assert_eq!(c.next_token(), Some("LOOP:"));
    assert_eq!(c.next_token(), Some("add"));
}

#[test]
fn parse_int_rejects_out_of_range() {
    assert!(parse_int("512").is_err());
    assert!(parse_int("-513").is_err());
    assert_eq!(parse_int("-512").unwrap(), -512);
    assert_eq!(parse_int("511").unwrap(), 511);
}

#[test]
fn parse_int_rejects_partial_tokens() {
    assert!(parse_int("12a").is_err());
    assert!(parse_int("").is_err());
}
