//! Relocation fix-up: turn the first pass's IC-relative and DC-relative
//! addresses into final absolute ones. The instruction image starts at
//! [`crate::MEMORY_START`]; the data image is appended right after it, so
//! every data address (both the symbol table entries and the `.data`/
//! `.string`/`.mat` lines themselves) shifts by `MEMORY_START + final_ic`.

use crate::first_pass::{FirstPassOutput, ParsedLine};
use crate::symtab::SymbolKind;
use crate::MEMORY_START;

pub struct Relocated {
    pub lines: Vec<ParsedLine>,
    pub symbols: crate::symtab::SymbolTable,
}

pub fn run(mut output: FirstPassOutput) -> Relocated {
    let data_base = MEMORY_START + output.ic;

    output.symbols.relocate_data(SymbolKind::Code, MEMORY_START);
    output.symbols.relocate_data(SymbolKind::Data, data_base);
    for line in &mut output.lines {
        match line {
            ParsedLine::Instruction { address, .. } => {
                *address += MEMORY_START;
            }
            ParsedLine::Data { address, .. } => {
                *address += data_base;
            }
        }
    }

    Relocated { lines: output.lines, symbols: output.symbols }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorLog;

    #[test]
    fn data_symbols_and_lines_shift_past_final_instruction_image() {
        let source = vec!["mov r1, r2".to_string(), "NUMS: .data 1, 2".to_string()];
        let mut errors = ErrorLog::new();
        let fp = crate::first_pass::run(&source, &crate::macros::MacroTable::new(), &mut errors);
        assert!(errors.is_empty());
        let final_ic = fp.ic;
        let relocated = run(fp);
        assert_eq!(relocated.symbols.get("NUMS").unwrap().address, MEMORY_START + final_ic);
        match &relocated.lines[1] {
            ParsedLine::Data { address, .. } => assert_eq!(*address, MEMORY_START + final_ic),
            _ => panic!("expected data line"),
        }
    }

    #[test]
    fn instruction_addresses_start_at_memory_start() {
        let source = vec!["stop".to_string()];
        let mut errors = ErrorLog::new();
        let fp = crate::first_pass::run(&source, &crate::macros::MacroTable::new(), &mut errors);
        let relocated = run(fp);
        match &relocated.lines[0] {
            ParsedLine::Instruction { address, .. } => assert_eq!(*address, MEMORY_START),
            _ => panic!("expected instruction line"),
        }
    }

    #[test]
    fn code_symbols_shift_by_memory_start_too() {
        let source = vec!["LOOP: inc r1".to_string(), "jmp LOOP".to_string()];
        let mut errors = ErrorLog::new();
        let fp = crate::first_pass::run(&source, &crate::macros::MacroTable::new(), &mut errors);
        assert!(errors.is_empty());
        let relocated = run(fp);
        assert_eq!(relocated.symbols.get("LOOP").unwrap().address, MEMORY_START);
    }
}
