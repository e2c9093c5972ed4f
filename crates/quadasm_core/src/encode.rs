//! Serializes a resolved image into the three output artifacts: `.ob` (the
//! memory image), `.ent` (entry symbol addresses) and `.ext` (external
//! symbol usage addresses), all in the machine's base-4 "a/b/c/d" alphabet.

use crate::ins::{DataWord, ExternalUse, InstructionWord};
use crate::symtab::{SymbolAttr, SymbolTable};
use crate::MEMORY_START;
use quadasm_util::base4;

/// Width of a listing address field (`.ob`/`.ent`/`.ext` record addresses).
const LISTING_ADDRESS_DIGITS: usize = 4;

/// Width of the `.ob` header's IC/DC fields before leading `a`s are trimmed.
const HEADER_COUNT_DIGITS: usize = 8;

pub struct Artifacts {
    pub object: String,
    pub entries: Option<String>,
    pub externals: Option<String>,
}

pub fn encode(
    instructions: &[InstructionWord],
    data: &[DataWord],
    externals: &[ExternalUse],
    symbols: &SymbolTable,
) -> Artifacts {
    Artifacts {
        object: encode_object(instructions, data),
        entries: encode_entries(symbols),
        externals: encode_externals(externals),
    }
}

fn header_count_field(count: i32) -> String {
    base4::trim_leading(&base4::encode_unsigned(count as u32, HEADER_COUNT_DIGITS)).to_string()
}

fn listing_address_field(address: i32) -> String {
    base4::encode_unsigned(address as u32, LISTING_ADDRESS_DIGITS)
}

fn encode_object(instructions: &[InstructionWord], data: &[DataWord]) -> String {
    let ic = instructions.len() as i32;
    let dc = data.len() as i32;
    let mut out = String::new();
    out.push_str(&header_count_field(ic));
    out.push(' ');
    out.push_str(&header_count_field(dc));
    out.push('\n');

    let mut address = MEMORY_START;
    for word in instructions {
        out.push_str(&listing_address_field(address));
        out.push('\t');
        out.push_str(&word.encode());
        out.push('\n');
        address += 1;
    }
    for word in data {
        out.push_str(&listing_address_field(address));
        out.push('\t');
        out.push_str(&word.encode());
        out.push('\n');
        address += 1;
    }
    out
}

fn encode_entries(symbols: &SymbolTable) -> Option<String> {
    let mut names: Vec<_> = symbols.iter().filter(|s| s.attr == SymbolAttr::Entry).collect();
    if names.is_empty() {
        return None;
    }
    names.sort_by(|a, b| a.name.cmp(&b.name));
    let mut out = String::new();
    for sym in names {
        out.push_str(&sym.name);
        out.push('\t');
        out.push_str(&listing_address_field(sym.address));
        out.push('\n');
    }
    Some(out)
}

fn encode_externals(externals: &[ExternalUse]) -> Option<String> {
    if externals.is_empty() {
        return None;
    }
    let mut out = String::new();
    for use_ in externals {
        out.push_str(&use_.name);
        out.push('\t');
        out.push_str(&listing_address_field(use_.address));
        out.push('\n');
    }
    Some(out)
}

#[test]
fn object_header_counts_words() {
    let instructions = vec![InstructionWord::Command {
        opcode: crate::ins::Opcode::Stop,
        src_mode: None,
        dst_mode: None,
    }];
    let artifacts = encode(&instructions, &[], &[], &SymbolTable::new());
    let header = artifacts.object.lines().next().unwrap();
    assert_eq!(header, "b a");
}

#[test]
fn listing_addresses_are_four_digits_untrimmed() {
    let instructions = vec![InstructionWord::Command {
        opcode: crate::ins::Opcode::Stop,
        src_mode: None,
        dst_mode: None,
    }];
    let artifacts = encode(&instructions, &[], &[], &SymbolTable::new());
    let word_line = artifacts.object.lines().nth(1).unwrap();
    let address = word_line.split('\t').next().unwrap();
    assert_eq!(address.len(), 4);
}

#[test]
fn no_entries_or_externals_yields_no_artifact() {
    let artifacts = encode(&[], &[], &[], &SymbolTable::new());
    assert!(artifacts.entries.is_none());
    assert!(artifacts.externals.is_none());
}

#[test]
fn entries_are_sorted_by_name() {
    let mut symbols = SymbolTable::new();
    symbols.define("ZEBRA", crate::symtab::SymbolKind::Code, 105).unwrap();
    symbols.declare_entry("ZEBRA").unwrap();
    symbols.define("ALPHA", crate::symtab::SymbolKind::Code, 100).unwrap();
    symbols.declare_entry("ALPHA").unwrap();
    let entries = encode_entries(&symbols).unwrap();
    let first_line = entries.lines().next().unwrap();
    assert!(first_line.starts_with("ALPHA"));
}
