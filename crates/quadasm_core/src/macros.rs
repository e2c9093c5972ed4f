//! Macro pre-processing: `mcro NAME` / `mcroend` blocks are expanded in two
//! sub-passes over the raw source, before anything else sees it.
//!
//! Sub-pass one walks the file collecting each macro's body and strips the
//! `mcro`/`mcroend` lines (and everything between them) from the output.
//! Sub-pass two walks what's left and replaces any line that is exactly a
//! macro's name with its recorded body, verbatim. Macros take no arguments
//! and cannot nest.

use crate::diagnostics::ErrorLog;
use crate::lex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MacroTable {
    bodies: HashMap<String, Vec<String>>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self { bodies: HashMap::new() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bodies.contains_key(name)
    }
}

/// Run both sub-passes, returning the expanded source and the macro table
/// built along the way. Diagnostics (redefinition, unterminated block,
/// nested definition, name colliding with a reserved word) are appended to
/// `errors`; the corresponding input line is then dropped from the output
/// rather than aborting the whole file.
pub fn expand(source: &[String], errors: &mut ErrorLog) -> (Vec<String>, MacroTable) {
    let (stripped, table) = collect_definitions(source, errors);
    let expanded = substitute(&stripped, &table);
    (expanded, table)
}

fn collect_definitions(source: &[String], errors: &mut ErrorLog) -> (Vec<(usize, String)>, MacroTable) {
    let mut table = MacroTable::new();
    let mut output = Vec::new();
    let mut in_macro: Option<(String, Vec<String>)> = None;

    for (idx, raw) in source.iter().enumerate() {
        let trimmed = lex::trim(raw);
        let mut tokens = lex::Cursor::new(trimmed);
        let first = tokens.next_token();

        match (&mut in_macro, first) {
            (None, Some("mcro")) => {
                let name = tokens.next_token().unwrap_or("").to_string();
                if name.is_empty() {
                    errors.push(idx, "mcro directive is missing a name");
                } else if let Err(msg) = lex::validate_identifier(&name) {
                    errors.push(idx, format!("macro {}", msg));
                } else if table.contains(&name) {
                    errors.push(idx, format!("macro '{}' is already defined", name));
                } else {
                    in_macro = Some((name, Vec::new()));
                }
            }
            (Some(_), Some("mcro")) => {
                errors.push(idx, "macro definitions cannot nest");
            }
            (Some((name, body)), Some("mcroend")) => {
                table.bodies.insert(name.clone(), std::mem::take(body));
                in_macro = None;
            }
            (Some((_, body)), _) => {
                body.push(raw.clone());
            }
            (None, _) => {
                output.push((idx, raw.clone()));
            }
        }
    }

    if let Some((name, _)) = in_macro {
        errors.push(source.len().saturating_sub(1), format!("macro '{}' is missing mcroend", name));
    }

    (output, table)
}

fn substitute(lines: &[(usize, String)], table: &MacroTable) -> Vec<String> {
    let mut output = Vec::with_capacity(lines.len());
    for (_, raw) in lines {
        let trimmed = lex::trim(raw);

        if let Some(body) = table.bodies.get(trimmed) {
            output.extend(body.iter().cloned());
            continue;
        }

        // A label followed by a bare macro name still invokes it; the label
        // is prepended to the first emitted body line.
        if let Some(expansion) = label_prefixed_invocation(trimmed, table) {
            output.extend(expansion);
            continue;
        }

        output.push(raw.clone());
    }
    output
}

fn label_prefixed_invocation(trimmed: &str, table: &MacroTable) -> Option<Vec<String>> {
    let mut cursor = lex::Cursor::new(trimmed);
    let first = cursor.next_token()?;
    if !lex::is_label(first) {
        return None;
    }
    let label = first.trim_end_matches(':');
    let name = cursor.next_token()?;
    if !cursor.remainder().trim().is_empty() {
        return None;
    }
    let body = table.bodies.get(name)?;

    let mut expanded = Vec::with_capacity(body.len());
    let mut iter = body.iter();
    if let Some(first_line) = iter.next() {
        expanded.push(format!("{}: {}", label, first_line));
    }
    expanded.extend(iter.cloned());
    Some(expanded)
}

#[test]
fn expands_a_single_macro_call() {
    let source = vec![
        "mcro CLEAR_BOTH".to_string(),
        "clr r1".to_string(),
        "clr r2".to_string(),
        "mcroend".to_string(),
        "CLEAR_BOTH".to_string(),
        "stop".to_string(),
    ];
    let mut errors = ErrorLog::new();
    let (expanded, _) = expand(&source, &mut errors);
    assert!(errors.is_empty());
    assert_eq!(expanded, vec!["clr r1", "clr r2", "stop"]);
}

#[test]
fn expands_multiple_calls_to_the_same_macro() {
    let source = vec![
        "mcro M".to_string(),
        "inc r1".to_string(),
        "mcroend".to_string(),
        "M".to_string(),
        "M".to_string(),
    ];
    let mut errors = ErrorLog::new();
    let (expanded, _) = expand(&source, &mut errors);
    assert_eq!(expanded, vec!["inc r1", "inc r1"]);
}

#[test]
fn unterminated_macro_is_diagnosed() {
    let source = vec!["mcro M".to_string(), "inc r1".to_string()];
    let mut errors = ErrorLog::new();
    expand(&source, &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn redefinition_is_diagnosed() {
    let source = vec![
        "mcro M".to_string(),
        "mcroend".to_string(),
        "mcro M".to_string(),
        "mcroend".to_string(),
    ];
    let mut errors = ErrorLog::new();
    expand(&source, &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn lines_outside_any_macro_pass_through_unchanged() {
    let source = vec!["mov r1, r2".to_string(), "stop".to_string()];
    let mut errors = ErrorLog::new();
    let (expanded, _) = expand(&source, &mut errors);
    assert_eq!(expanded, source);
}

#[test]
fn reserved_word_is_rejected_as_a_macro_name() {
    let source = vec!["mcro stop".to_string(), "clr r1".to_string(), "mcroend".to_string()];
    let mut errors = ErrorLog::new();
    expand(&source, &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn macro_name_starting_with_a_digit_is_rejected() {
    let source = vec!["mcro 1x".to_string(), "clr r1".to_string(), "mcroend".to_string()];
    let mut errors = ErrorLog::new();
    expand(&source, &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn a_label_on_the_invoking_line_lands_on_the_first_body_line() {
    let source = vec![
        "mcro INC_X".to_string(),
        "add #1, r0".to_string(),
        "mcroend".to_string(),
        "START: INC_X".to_string(),
        "stop".to_string(),
    ];
    let mut errors = ErrorLog::new();
    let (expanded, _) = expand(&source, &mut errors);
    assert!(errors.is_empty());
    assert_eq!(expanded, vec!["START: add #1, r0", "stop"]);
}
