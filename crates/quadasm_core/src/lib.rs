//! A two-pass assembler for a small 10-bit, 16-opcode, 8-register machine.
//!
//! The pipeline is leaves-first: [`macros`] expands `mcro`/`mcroend` blocks,
//! [`first_pass`] builds the symbol table and the instruction/data images,
//! [`relocate`] turns those relative counters into absolute addresses, and
//! [`second_pass`] resolves symbolic operands into their final encoded form.
//! [`encode`] serializes the result in the machine's base-4 word alphabet.
//!
//! # todo
//!
//! - Support macro arguments; the source dialect only allows verbatim blocks.
//! - Cross translation-unit linking; each file is resolved independently.

pub mod diagnostics;
pub mod driver;
pub mod encode;
pub mod first_pass;
pub mod ins;
pub mod lex;
pub mod macros;
pub mod relocate;
pub mod second_pass;
pub mod symtab;

#[cfg(test)]
mod tests;

pub use diagnostics::{Diagnostic, ErrorLog};
pub use driver::{assemble_basename, assemble_source, AssembleError, Artifacts};
pub use symtab::{Symbol, SymbolAttr, SymbolKind, SymbolTable};

/// Absolute address of the first instruction word. Defined by the target
/// machine, not configurable per run.
pub const MEMORY_START: i32 = 100;

/// Instruction and data images together may not exceed this many words.
pub const MAX_IMAGE_WORDS: i32 = 156;

/// Source lines longer than this are rejected outright.
pub const MAX_LINE_LEN: usize = 80;

/// Longest permitted label or macro name.
pub const MAX_NAME_LEN: usize = 30;

/// Range of a signed data word / immediate operand before encoding.
pub const DATA_MIN: i32 = -512;
pub const DATA_MAX: i32 = 511;
