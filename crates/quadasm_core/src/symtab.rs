//! The symbol table, shared by the first and second passes.
//!
//! A symbol can be declared `.entry` before its defining label is seen, so
//! table insertion has to tolerate a placeholder entry that is filled in
//! later: [`SymbolKind::Unknown`] until the label arrives, then promoted to
//! [`SymbolKind::Code`] or [`SymbolKind::Data`] without losing the
//! [`SymbolAttr::Entry`] mark.

use std::collections::HashMap;

/// What a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Code,
    Data,
    /// Named by a `.entry` directive before its label was defined.
    Unknown,
}

/// A symbol's linkage, independent of its kind. `Extern` and `Entry` are
/// mutually exclusive; a plain label has neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolAttr {
    None,
    Entry,
    Extern,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub attr: SymbolAttr,
    /// Absolute address once resolved. Always `0` for `Extern` symbols.
    pub address: i32,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { symbols: HashMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Define a label at `address`, giving it `kind`. Fails if the name is
    /// already defined as Code/Data, or already declared `Extern` (a name
    /// can't be both local and external).
    pub fn define(&mut self, name: &str, kind: SymbolKind, address: i32) -> Result<(), String> {
        match self.symbols.get_mut(name) {
            None => {
                self.symbols.insert(
                    name.to_string(),
                    Symbol { name: name.to_string(), kind, attr: SymbolAttr::None, address },
                );
                Ok(())
            }
            Some(existing) if existing.attr == SymbolAttr::Extern => {
                Err(format!("'{}' is already declared extern", name))
            }
            Some(existing) if existing.kind == SymbolKind::Unknown => {
                // A .entry declared before the label; adopt kind/address,
                // keep the Entry attribute.
                existing.kind = kind;
                existing.address = address;
                Ok(())
            }
            Some(_) => Err(format!("symbol '{}' is already defined", name)),
        }
    }

    /// Record `name` as `.extern`. Address is always 0. Fails if the name is
    /// already defined locally or already marked entry.
    pub fn declare_extern(&mut self, name: &str) -> Result<(), String> {
        match self.symbols.get(name) {
            Some(existing) if existing.attr == SymbolAttr::Entry => {
                Err(format!("'{}' is already declared entry", name))
            }
            Some(existing) if existing.kind != SymbolKind::Unknown => {
                Err(format!("'{}' is already defined locally", name))
            }
            _ => {
                self.symbols.insert(
                    name.to_string(),
                    Symbol {
                        name: name.to_string(),
                        kind: SymbolKind::Unknown,
                        attr: SymbolAttr::Extern,
                        address: 0,
                    },
                );
                Ok(())
            }
        }
    }

    /// Record `name` as `.entry`. May arrive before or after the label's own
    /// definition. Fails if the name is already declared extern.
    pub fn declare_entry(&mut self, name: &str) -> Result<(), String> {
        match self.symbols.get_mut(name) {
            Some(existing) if existing.attr == SymbolAttr::Extern => {
                Err(format!("'{}' is already declared extern", name))
            }
            Some(existing) => {
                existing.attr = SymbolAttr::Entry;
                Ok(())
            }
            None => {
                self.symbols.insert(
                    name.to_string(),
                    Symbol {
                        name: name.to_string(),
                        kind: SymbolKind::Unknown,
                        attr: SymbolAttr::Entry,
                        address: 0,
                    },
                );
                Ok(())
            }
        }
    }

    /// Shift every Code/Data symbol's address by `data_offset`, per the
    /// relocation fix-up: data symbols sit after the final instruction image.
    pub fn relocate_data(&mut self, kind: SymbolKind, offset: i32) {
        for symbol in self.symbols.values_mut() {
            if symbol.kind == kind && symbol.attr != SymbolAttr::Extern {
                symbol.address += offset;
            }
        }
    }
}

#[test]
fn define_then_declare_entry() {
    let mut table = SymbolTable::new();
    table.define("LOOP", SymbolKind::Code, 100).unwrap();
    table.declare_entry("LOOP").unwrap();
    let sym = table.get("LOOP").unwrap();
    assert_eq!(sym.kind, SymbolKind::Code);
    assert_eq!(sym.attr, SymbolAttr::Entry);
}

#[test]
fn declare_entry_then_define() {
    let mut table = SymbolTable::new();
    table.declare_entry("LOOP").unwrap();
    table.define("LOOP", SymbolKind::Code, 100).unwrap();
    let sym = table.get("LOOP").unwrap();
    assert_eq!(sym.kind, SymbolKind::Code);
    assert_eq!(sym.attr, SymbolAttr::Entry);
    assert_eq!(sym.address, 100);
}

#[test]
fn duplicate_definition_rejected() {
    let mut table = SymbolTable::new();
    table.define("X", SymbolKind::Data, 100).unwrap();
    assert!(table.define("X", SymbolKind::Data, 101).is_err());
}

#[test]
fn extern_and_entry_conflict() {
    let mut table = SymbolTable::new();
    table.declare_extern("X").unwrap();
    assert!(table.declare_entry("X").is_err());

    let mut table = SymbolTable::new();
    table.declare_entry("X").unwrap();
    assert!(table.declare_extern("X").is_err());
}

#[test]
fn relocate_data_shifts_only_matching_kind() {
    let mut table = SymbolTable::new();
    table.define("CODE_SYM", SymbolKind::Code, 0).unwrap();
    table.define("DATA_SYM", SymbolKind::Data, 5).unwrap();
    table.declare_extern("EXT_SYM").unwrap();
    table.relocate_data(SymbolKind::Data, 100);
    assert_eq!(table.get("CODE_SYM").unwrap().address, 0);
    assert_eq!(table.get("DATA_SYM").unwrap().address, 105);
    assert_eq!(table.get("EXT_SYM").unwrap().address, 0);
}
