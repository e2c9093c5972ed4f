//! Second pass: walk the relocated image, resolve every symbolic operand
//! against the now-final symbol table, and emit the finished instruction and
//! data words. `ic2` below is the running absolute address as words are
//! emitted; it must agree with the first pass's word counts or later labels
//! would have been given the wrong address.

use crate::diagnostics::ErrorLog;
use crate::first_pass::ParsedLine;
use crate::ins::{Are, DataWord, ExternalUse, InstructionWord, Operand};
use crate::relocate::Relocated;
use crate::symtab::{SymbolAttr, SymbolKind, SymbolTable};

pub struct SecondPassOutput {
    pub instructions: Vec<InstructionWord>,
    pub data: Vec<DataWord>,
    pub externals: Vec<ExternalUse>,
}

pub fn run(relocated: Relocated, errors: &mut ErrorLog) -> SecondPassOutput {
    let Relocated { lines, symbols } = relocated;
    let mut instructions = Vec::new();
    let mut data = Vec::new();
    let mut externals = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        match line {
            ParsedLine::Instruction { address, opcode, src, dst } => {
                instructions.push(InstructionWord::Command {
                    opcode: *opcode,
                    src_mode: src.as_ref().map(Operand::mode),
                    dst_mode: dst.as_ref().map(Operand::mode),
                });
                let mut word_addr = address + 1;
                emit_operands(idx, src.as_ref(), dst.as_ref(), &symbols, &mut instructions, &mut externals, &mut word_addr, errors);
            }
            ParsedLine::Data { words, .. } => {
                data.extend(words.iter().map(|&w| DataWord(w)));
            }
        }
    }

    check_unresolved_entries(&symbols, errors, lines.len());

    SecondPassOutput { instructions, data, externals }
}

fn emit_operands(
    line_idx: usize,
    src: Option<&Operand>,
    dst: Option<&Operand>,
    symbols: &SymbolTable,
    instructions: &mut Vec<InstructionWord>,
    externals: &mut Vec<ExternalUse>,
    word_addr: &mut i32,
    errors: &mut ErrorLog,
) {
    if let (Some(Operand::Register(s)), Some(Operand::Register(d))) = (src, dst) {
        instructions.push(InstructionWord::Registers { src: *s, dst: *d });
        *word_addr += 1;
        return;
    }

    for (operand, is_dst) in [(src, false), (dst, true)] {
        let Some(operand) = operand else { continue };
        emit_operand(line_idx, operand, is_dst, symbols, instructions, externals, word_addr, errors);
    }
}

fn emit_operand(
    line_idx: usize,
    operand: &Operand,
    is_dst: bool,
    symbols: &SymbolTable,
    instructions: &mut Vec<InstructionWord>,
    externals: &mut Vec<ExternalUse>,
    word_addr: &mut i32,
    errors: &mut ErrorLog,
) {
    match operand {
        Operand::Immediate(value) => {
            instructions.push(InstructionWord::Address { value: *value, are: Are::Absolute });
            *word_addr += 1;
        }
        Operand::Register(reg) => {
            instructions.push(InstructionWord::Register { reg: *reg, dst: is_dst });
            *word_addr += 1;
        }
        Operand::Direct(name) => {
            let (value, are) = resolve_label(line_idx, name, *word_addr, symbols, externals, errors);
            instructions.push(InstructionWord::Address { value, are });
            *word_addr += 1;
        }
        Operand::Matrix(name, r1, r2) => {
            let (value, are) = resolve_label(line_idx, name, *word_addr, symbols, externals, errors);
            instructions.push(InstructionWord::Address { value, are });
            *word_addr += 1;
            instructions.push(InstructionWord::Registers { src: *r1, dst: *r2 });
            *word_addr += 1;
        }
    }
}

fn resolve_label(
    line_idx: usize,
    name: &str,
    word_addr: i32,
    symbols: &SymbolTable,
    externals: &mut Vec<ExternalUse>,
    errors: &mut ErrorLog,
) -> (i32, Are) {
    match symbols.get(name) {
        Some(sym) if sym.attr == SymbolAttr::Extern => {
            externals.push(ExternalUse { name: name.to_string(), address: word_addr });
            (0, Are::External)
        }
        Some(sym) if sym.kind != SymbolKind::Unknown => (sym.address, Are::Relocatable),
        _ => {
            errors.push(line_idx, format!("undefined symbol '{}'", name));
            (0, Are::Relocatable)
        }
    }
}

fn check_unresolved_entries(symbols: &SymbolTable, errors: &mut ErrorLog, last_line: usize) {
    for sym in symbols.iter() {
        if sym.attr == SymbolAttr::Entry && sym.kind == SymbolKind::Unknown {
            errors.push(last_line, format!("entry symbol '{}' was never defined", sym.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorLog;
    use crate::{first_pass, relocate};

    fn assemble(source: &[&str]) -> (SecondPassOutput, ErrorLog) {
        let lines: Vec<String> = source.iter().map(|s| s.to_string()).collect();
        let mut errors = ErrorLog::new();
        let fp = first_pass::run(&lines, &crate::macros::MacroTable::new(), &mut errors);
        let relocated = relocate::run(fp);
        let out = run(relocated, &mut errors);
        (out, errors)
    }

    #[test]
    fn direct_label_resolves_to_relocatable_address() {
        let (out, errors) = assemble(&["mov LOOP, r1", "LOOP: stop"]);
        assert!(errors.is_empty());
        let addr_word = &out.instructions[1];
        match addr_word {
            InstructionWord::Address { are, .. } => assert_eq!(*are, Are::Relocatable),
            _ => panic!("expected address word"),
        }
    }

    #[test]
    fn extern_operand_records_external_use() {
        let (out, errors) = assemble(&[".extern X", "mov X, r1"]);
        assert!(errors.is_empty());
        assert_eq!(out.externals.len(), 1);
        assert_eq!(out.externals[0].name, "X");
    }

    #[test]
    fn undefined_symbol_is_diagnosed() {
        let (_, errors) = assemble(&["mov MISSING, r1"]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unresolved_entry_is_diagnosed() {
        let (_, errors) = assemble(&[".entry NEVER_DEFINED", "stop"]);
        assert_eq!(errors.len(), 1);
    }
}
