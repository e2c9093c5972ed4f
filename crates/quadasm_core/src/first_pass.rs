//! First pass: classify every line, populate the symbol table, and build an
//! unresolved intermediate image (instructions keep their operands as
//! [`Operand`]s naming labels; `.entry`/`.extern` update the symbol table
//! directly). Label addresses are still relative to their own counter here;
//! [`crate::relocate`] turns them absolute afterward.

use crate::diagnostics::ErrorLog;
use crate::ins::{total_word_count, Opcode, Operand, Register};
use crate::lex::{self, Cursor};
use crate::macros::MacroTable;
use crate::symtab::{SymbolKind, SymbolTable};
use crate::MAX_LINE_LEN;

#[derive(Debug, Clone)]
pub enum ParsedLine {
    Instruction { address: i32, opcode: Opcode, src: Option<Operand>, dst: Option<Operand> },
    Data { address: i32, words: Vec<i32> },
}

#[derive(Debug, Default)]
pub struct FirstPassOutput {
    pub symbols: SymbolTable,
    pub lines: Vec<ParsedLine>,
    pub ic: i32,
    pub dc: i32,
}

pub fn run(source: &[String], macros: &MacroTable, errors: &mut ErrorLog) -> FirstPassOutput {
    let mut out = FirstPassOutput::default();

    for (idx, raw) in source.iter().enumerate() {
        if raw.len() > MAX_LINE_LEN {
            errors.push(idx, format!("line exceeds {} characters", MAX_LINE_LEN));
            continue;
        }
        let trimmed = lex::trim(raw);
        if trimmed.is_empty() {
            continue;
        }

        let mut cursor = Cursor::new(trimmed);
        let first = match cursor.next_token() {
            Some(t) => t,
            None => continue,
        };

        let (label, mnemonic) = if lex::is_label(first) {
            let name = &first[..first.len() - 1];
            match validate_label_name(name, macros) {
                Ok(()) => {}
                Err(msg) => {
                    errors.push(idx, msg);
                    continue;
                }
            }
            let separator = cursor.remainder_untrimmed();
            let separator_len = separator.len() - separator.trim_start().len();
            if separator_len != 1 || !matches!(separator.as_bytes()[0], b' ' | b'\t') {
                errors.push(idx, "space or tab required after label");
                continue;
            }
            match cursor.next_token() {
                Some(m) => (Some(name), m),
                None => {
                    errors.push(idx, "label with no content");
                    continue;
                }
            }
        } else {
            (None, first)
        };

        match mnemonic {
            ".data" | ".string" | ".mat" => {
                handle_data_directive(idx, mnemonic, label, &mut cursor, &mut out, errors);
            }
            ".entry" => {
                if label.is_some() {
                    errors.push(idx, ".entry directive cannot itself be labelled");
                }
                match cursor.next_token() {
                    Some(name) => {
                        if let Err(msg) = out.symbols.declare_entry(name) {
                            errors.push(idx, msg);
                        }
                    }
                    None => errors.push(idx, ".entry is missing a symbol name"),
                }
            }
            ".extern" => {
                if label.is_some() {
                    errors.push(idx, ".extern directive cannot itself be labelled");
                }
                match cursor.next_token() {
                    Some(name) => {
                        if let Err(msg) = out.symbols.declare_extern(name) {
                            errors.push(idx, msg);
                        }
                        if !cursor.remainder().is_empty() {
                            errors.push(idx, "extra tokens after .extern operand");
                        }
                    }
                    None => errors.push(idx, ".extern is missing a symbol name"),
                }
            }
            _ => handle_instruction(idx, mnemonic, label, &mut cursor, &mut out, errors),
        }
    }

    out
}

fn validate_name(name: &str) -> Result<(), String> {
    lex::validate_identifier(name).map_err(|msg| format!("label {}", msg))
}

/// As [`validate_name`], but also rejects names already claimed by a macro.
fn validate_label_name(name: &str, macros: &MacroTable) -> Result<(), String> {
    validate_name(name)?;
    if macros.contains(name) {
        return Err(format!("'{}' is already defined as a macro name", name));
    }
    Ok(())
}

fn define_label(out: &mut FirstPassOutput, idx: usize, label: Option<&str>, kind: SymbolKind, address: i32, errors: &mut ErrorLog) {
    if let Some(name) = label {
        if let Err(msg) = out.symbols.define(name, kind, address) {
            errors.push(idx, msg);
        }
    }
}

fn handle_data_directive(
    idx: usize,
    mnemonic: &str,
    label: Option<&str>,
    cursor: &mut Cursor,
    out: &mut FirstPassOutput,
    errors: &mut ErrorLog,
) {
    let address = out.dc;
    let words = match mnemonic {
        ".data" => match parse_data_list(cursor) {
            Ok(w) => w,
            Err(msg) => {
                errors.push(idx, msg);
                return;
            }
        },
        ".string" => match parse_string(cursor) {
            Ok(w) => w,
            Err(msg) => {
                errors.push(idx, msg);
                return;
            }
        },
        ".mat" => match parse_matrix(cursor) {
            Ok(w) => w,
            Err(msg) => {
                errors.push(idx, msg);
                return;
            }
        },
        _ => unreachable!(),
    };

    define_label(out, idx, label, SymbolKind::Data, address, errors);
    out.dc += words.len() as i32;
    out.lines.push(ParsedLine::Data { address, words });
}

fn parse_data_list(cursor: &mut Cursor) -> Result<Vec<i32>, String> {
    let rest = cursor.remainder();
    if rest.is_empty() {
        return Err(".data directive has no values".to_string());
    }
    rest.split(',')
        .map(|tok| lex::parse_int(tok.trim()))
        .collect()
}

fn parse_string(cursor: &mut Cursor) -> Result<Vec<i32>, String> {
    let rest = cursor.remainder().trim();
    let inner = rest
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| ".string value must be quoted".to_string())?;
    if let Some(bad) = inner.chars().find(|&c| !(' '..='~').contains(&c)) {
        return Err(format!("'{}' is not a printable character in a .string", bad));
    }
    let mut words: Vec<i32> = inner.chars().map(|c| c as i32).collect();
    words.push(0);
    Ok(words)
}

/// `.mat [rows][cols] v1, v2, ...` — zero-pads to exactly `rows * cols`
/// words; more initializers than that is an error.
fn parse_matrix(cursor: &mut Cursor) -> Result<Vec<i32>, String> {
    let rest = cursor.remainder();
    let (rows_part, after_rows) = rest
        .strip_prefix('[')
        .and_then(|s| s.split_once("]["))
        .ok_or_else(|| ".mat directive is missing its [rows][cols] header".to_string())?;
    let (cols_part, values) = after_rows
        .split_once(']')
        .ok_or_else(|| ".mat header must be [rows][cols]".to_string())?;
    let rows: i32 = rows_part.trim().parse().map_err(|_| "invalid .mat row count".to_string())?;
    let cols: i32 = cols_part.trim().parse().map_err(|_| "invalid .mat column count".to_string())?;
    if rows <= 0 || cols <= 0 {
        return Err(".mat dimensions must be positive".to_string());
    }
    let capacity = (rows * cols) as usize;

    let values = values.trim();
    let mut words: Vec<i32> = if values.is_empty() {
        Vec::new()
    } else {
        values
            .split(',')
            .map(|tok| lex::parse_int(tok.trim()))
            .collect::<Result<_, _>>()?
    };
    if words.len() > capacity {
        return Err(format!(".mat has {} values but only room for {}", words.len(), capacity));
    }
    words.resize(capacity, 0);
    Ok(words)
}

fn handle_instruction(
    idx: usize,
    mnemonic: &str,
    label: Option<&str>,
    cursor: &mut Cursor,
    out: &mut FirstPassOutput,
    errors: &mut ErrorLog,
) {
    let opcode = match Opcode::from_mnemonic(mnemonic) {
        Some(op) => op,
        None => {
            errors.push(idx, format!("'{}' is not a recognized instruction", mnemonic));
            return;
        }
    };

    let operand_text = cursor.remainder();
    let tokens: Vec<&str> = if operand_text.is_empty() {
        Vec::new()
    } else {
        operand_text.split(',').map(str::trim).collect()
    };

    let wants = opcode.operand_count();
    if tokens.len() != wants {
        errors.push(idx, format!("'{}' takes {} operand(s), found {}", mnemonic, wants, tokens.len()));
        return;
    }

    let (src, dst) = match wants {
        0 => (None, None),
        1 => match parse_operand(tokens[0]) {
            Ok(op) => (None, Some(op)),
            Err(msg) => {
                errors.push(idx, msg);
                return;
            }
        },
        2 => {
            let src = match parse_operand(tokens[0]) {
                Ok(op) => op,
                Err(msg) => {
                    errors.push(idx, msg);
                    return;
                }
            };
            let dst = match parse_operand(tokens[1]) {
                Ok(op) => op,
                Err(msg) => {
                    errors.push(idx, msg);
                    return;
                }
            };
            (Some(src), Some(dst))
        }
        _ => unreachable!(),
    };

    if let Some(op) = &src {
        if !opcode.src_modes().contains(&op.mode()) {
            errors.push(idx, format!("'{}' does not allow a {:?} source operand", mnemonic, op.mode()));
            return;
        }
    }
    if let Some(op) = &dst {
        if !opcode.dst_modes().contains(&op.mode()) {
            errors.push(idx, format!("'{}' does not allow a {:?} destination operand", mnemonic, op.mode()));
            return;
        }
    }

    let address = out.ic;
    define_label(out, idx, label, SymbolKind::Code, address, errors);
    out.ic += total_word_count(src.as_ref(), dst.as_ref()) as i32;
    out.lines.push(ParsedLine::Instruction { address, opcode, src, dst });
}

fn parse_operand(tok: &str) -> Result<Operand, String> {
    if let Some(imm) = tok.strip_prefix('#') {
        return lex::parse_int(imm).map(Operand::Immediate);
    }
    if let Some(reg) = Register::parse(tok) {
        return Ok(Operand::Register(reg));
    }
    if let Some(open) = tok.find('[') {
        let (name, rest) = tok.split_at(open);
        let (r1, r2) = rest
            .strip_prefix('[')
            .and_then(|s| s.split_once("]["))
            .and_then(|(a, b)| b.strip_suffix(']').map(|b| (a, b)))
            .ok_or_else(|| format!("malformed matrix operand '{}'", tok))?;
        let r1 = Register::parse(r1).ok_or_else(|| format!("'{}' is not a register", r1))?;
        let r2 = Register::parse(r2).ok_or_else(|| format!("'{}' is not a register", r2))?;
        return Ok(Operand::Matrix(name.to_string(), r1, r2));
    }
    validate_name(tok).map(|_| Operand::Direct(tok.to_string()))
}

#[test]
fn label_and_data_directive() {
    let source = vec!["LIST: .data 1, 2, 3".to_string()];
    let mut errors = ErrorLog::new();
    let out = run(&source, &MacroTable::new(), &mut errors);
    assert!(errors.is_empty());
    assert_eq!(out.dc, 3);
    assert_eq!(out.symbols.get("LIST").unwrap().address, 0);
}

#[test]
fn string_directive_adds_terminator() {
    let source = vec![r#".string "ab""#.to_string()];
    let mut errors = ErrorLog::new();
    let out = run(&source, &MacroTable::new(), &mut errors);
    assert!(errors.is_empty());
    match &out.lines[0] {
        ParsedLine::Data { words, .. } => assert_eq!(words, &vec!['a' as i32, 'b' as i32, 0]),
        _ => panic!("expected data line"),
    }
}

#[test]
fn mat_directive_pads_to_full_capacity() {
    let source = vec![".mat [2][2] 1, 2".to_string()];
    let mut errors = ErrorLog::new();
    let out = run(&source, &MacroTable::new(), &mut errors);
    assert!(errors.is_empty());
    match &out.lines[0] {
        ParsedLine::Data { words, .. } => assert_eq!(words, &vec![1, 2, 0, 0]),
        _ => panic!("expected data line"),
    }
}

#[test]
fn instruction_operand_count_mismatch_is_diagnosed() {
    let source = vec!["mov r1".to_string()];
    let mut errors = ErrorLog::new();
    run(&source, &MacroTable::new(), &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn stop_with_operand_is_rejected() {
    let source = vec!["stop r1".to_string()];
    let mut errors = ErrorLog::new();
    run(&source, &MacroTable::new(), &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn lea_rejects_immediate_source() {
    let source = vec!["lea #1, r2".to_string()];
    let mut errors = ErrorLog::new();
    run(&source, &MacroTable::new(), &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn two_register_instruction_consumes_two_words() {
    let source = vec!["mov r1, r2".to_string(), "stop".to_string()];
    let mut errors = ErrorLog::new();
    let out = run(&source, &MacroTable::new(), &mut errors);
    assert!(errors.is_empty());
    assert_eq!(out.ic, 3); // mov: command + shared register word, stop: command
}

#[test]
fn extern_then_use_as_direct_operand() {
    let source = vec![".extern X".to_string(), "mov X, r1".to_string()];
    let mut errors = ErrorLog::new();
    let out = run(&source, &MacroTable::new(), &mut errors);
    assert!(errors.is_empty());
    assert!(out.symbols.get("X").is_some());
}

#[test]
fn extern_with_trailing_token_is_diagnosed() {
    let source = vec![".extern X Y".to_string()];
    let mut errors = ErrorLog::new();
    run(&source, &MacroTable::new(), &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn label_with_no_separator_is_diagnosed() {
    let source = vec!["LOOP:add r1".to_string()];
    let mut errors = ErrorLog::new();
    run(&source, &MacroTable::new(), &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn label_with_extra_separator_whitespace_is_diagnosed() {
    let source = vec!["LOOP:  add r1".to_string()];
    let mut errors = ErrorLog::new();
    run(&source, &MacroTable::new(), &mut errors);
    assert_eq!(errors.len(), 1);
}

#[test]
fn label_name_allows_underscores() {
    let source = vec!["MY_LABEL: stop".to_string()];
    let mut errors = ErrorLog::new();
    let out = run(&source, &MacroTable::new(), &mut errors);
    assert!(errors.is_empty());
    assert!(out.symbols.get("MY_LABEL").is_some());
}

#[test]
fn label_colliding_with_a_macro_name_is_diagnosed() {
    let macro_source = vec!["mcro CLEAR".to_string(), "clr r1".to_string(), "mcroend".to_string()];
    let mut errors = ErrorLog::new();
    let (_, macros) = crate::macros::expand(&macro_source, &mut errors);
    errors = ErrorLog::new();

    let source = vec!["CLEAR: stop".to_string()];
    run(&source, &macros, &mut errors);
    assert_eq!(errors.len(), 1);
}
