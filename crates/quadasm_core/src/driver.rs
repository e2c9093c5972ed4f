//! Orchestrates the whole pipeline for one translation unit: macro
//! expansion, first pass, relocation, second pass, and encoding. Also owns
//! the thin synchronous file-I/O wrapper the CLI front end calls into.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::diagnostics::{Diagnostic, ErrorLog};
use crate::encode::{self, Artifacts as EncodedArtifacts};
use crate::{first_pass, macros, relocate, second_pass, MAX_IMAGE_WORDS};

/// A fatal error: one that stops the whole run rather than being reported
/// per-line and continuing. Distinct from [`Diagnostic`], which is always
/// recoverable within a single file's passes.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("failed to read '{path}': {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to write '{path}': {source}")]
    Write { path: String, #[source] source: std::io::Error },
}

/// What `assemble_source` hands back: either a clean set of encoded
/// artifacts, or the diagnostics that prevented producing one.
pub struct Artifacts {
    pub encoded: Option<EncodedArtifacts>,
    pub diagnostics: Vec<Diagnostic>,
    /// The macro-expanded source, written out as the `.am` intermediate file
    /// when the macro pass itself raised no diagnostics.
    pub expanded_source: Vec<String>,
    pub macro_pass_clean: bool,
}

/// Run the full pipeline over already-loaded source lines (one per input
/// line, comments and blank lines included). Never returns `Err`: every
/// recoverable problem becomes a diagnostic in the result, per line, and
/// assembly continues to the end of the file. Artifacts are only populated
/// when no diagnostic was raised anywhere in the run.
pub fn assemble_source(source: &[String]) -> Artifacts {
    let mut errors = ErrorLog::new();

    let (expanded, macro_table) = macros::expand(source, &mut errors);
    let macro_pass_clean = errors.is_empty();

    let fp = first_pass::run(&expanded, &macro_table, &mut errors);
    if fp.ic + fp.dc > MAX_IMAGE_WORDS {
        let last_line = expanded.len().saturating_sub(1);
        errors.push(last_line, format!("image of {} words exceeds the {}-word limit", fp.ic + fp.dc, MAX_IMAGE_WORDS));
    }
    let relocated = relocate::run(fp);
    let symbols_for_encode = clone_symbols_for_encode(&relocated.symbols);
    let sp = second_pass::run(relocated, &mut errors);

    let diagnostics: Vec<Diagnostic> = errors.iter().cloned().collect();
    let encoded = if diagnostics.is_empty() {
        Some(encode::encode(&sp.instructions, &sp.data, &sp.externals, &symbols_for_encode))
    } else {
        None
    };

    Artifacts { encoded, diagnostics, expanded_source: expanded, macro_pass_clean }
}

/// The symbol table is consumed by the second pass (it owns the final
/// addresses the encoder needs); clone it up front rather than threading a
/// borrow through both passes.
fn clone_symbols_for_encode(symbols: &crate::symtab::SymbolTable) -> crate::symtab::SymbolTable {
    let mut out = crate::symtab::SymbolTable::new();
    for sym in symbols.iter() {
        match sym.attr {
            crate::symtab::SymbolAttr::Extern => {
                let _ = out.declare_extern(&sym.name);
            }
            _ => {
                let _ = out.define(&sym.name, sym.kind, sym.address);
                if sym.attr == crate::symtab::SymbolAttr::Entry {
                    let _ = out.declare_entry(&sym.name);
                }
            }
        }
    }
    out
}

/// Read `path`, split on newlines, and run [`assemble_source`] over it.
pub fn assemble_file(path: &Path) -> Result<Artifacts, AssembleError> {
    let contents = fs::read_to_string(path).map_err(|source| AssembleError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let lines: Vec<String> = contents.lines().map(str::to_string).collect();
    Ok(assemble_source(&lines))
}

/// Assemble `<stem>.as`, managing the `.am` intermediate file the way the
/// CLI contract expects: written once the macro pass is clean, removed
/// again if anything later in the pipeline raised a diagnostic.
pub fn assemble_basename(stem: &Path) -> Result<Artifacts, AssembleError> {
    let source_path = stem.with_extension("as");
    let artifacts = assemble_file(&source_path)?;

    let am_path = stem.with_extension("am");
    if artifacts.macro_pass_clean {
        write_file(&am_path, &artifacts.expanded_source.join("\n"))?;
        if !artifacts.diagnostics.is_empty() {
            let _ = fs::remove_file(&am_path);
        }
    }

    Ok(artifacts)
}

/// Write the encoded artifacts as `.ob`, and `.ent`/`.ext` only when there's
/// anything to put in them. Written next to `stem` unless `output_dir` is
/// given, in which case they land there instead (the `.am` intermediate
/// always stays beside the source, regardless).
pub fn write_artifacts(
    stem: &Path,
    artifacts: &EncodedArtifacts,
    output_dir: Option<&Path>,
) -> Result<(), AssembleError> {
    let stem = resolve_output_stem(stem, output_dir);
    write_file(&stem.with_extension("ob"), &artifacts.object)?;
    if let Some(entries) = &artifacts.entries {
        write_file(&stem.with_extension("ent"), entries)?;
    }
    if let Some(externals) = &artifacts.externals {
        write_file(&stem.with_extension("ext"), externals)?;
    }
    Ok(())
}

fn resolve_output_stem(stem: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => match stem.file_name() {
            Some(name) => dir.join(name),
            None => dir.to_path_buf(),
        },
        None => stem.to_path_buf(),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), AssembleError> {
    fs::write(path, contents).map_err(|source| AssembleError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[test]
fn am_file_is_removed_when_later_passes_fail() {
    let dir = std::env::temp_dir().join("quadasm_driver_test_am_removed");
    fs::create_dir_all(&dir).unwrap();
    let stem = dir.join("prog");
    fs::write(stem.with_extension("as"), "bogus r1, r2\n").unwrap();

    let artifacts = assemble_basename(&stem).unwrap();
    assert!(!artifacts.diagnostics.is_empty());
    assert!(!stem.with_extension("am").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn am_file_survives_a_fully_clean_run() {
    let dir = std::env::temp_dir().join("quadasm_driver_test_am_kept");
    fs::create_dir_all(&dir).unwrap();
    let stem = dir.join("prog");
    fs::write(stem.with_extension("as"), "stop\n").unwrap();

    let artifacts = assemble_basename(&stem).unwrap();
    assert!(artifacts.diagnostics.is_empty());
    assert!(stem.with_extension("am").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn clean_program_produces_artifacts_with_no_diagnostics() {
    let source = vec!["stop".to_string()];
    let result = assemble_source(&source);
    assert!(result.diagnostics.is_empty());
    assert!(result.encoded.is_some());
}

#[test]
fn diagnostics_suppress_artifact_emission() {
    let source = vec!["bogus r1, r2".to_string()];
    let result = assemble_source(&source);
    assert!(!result.diagnostics.is_empty());
    assert!(result.encoded.is_none());
}

#[test]
fn write_artifacts_honors_output_dir() {
    let dir = std::env::temp_dir().join("quadasm_driver_test_output_dir");
    let out_dir = dir.join("out");
    fs::create_dir_all(&out_dir).unwrap();
    let stem = dir.join("prog");

    let artifacts = encode::Artifacts { object: "a a\n".to_string(), entries: None, externals: None };
    write_artifacts(&stem, &artifacts, Some(&out_dir)).unwrap();
    assert!(out_dir.join("prog.ob").exists());
    assert!(!stem.with_extension("ob").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn diagnostic_line_numbers_are_one_based_in_display() {
    let source = vec!["stop".to_string(), "bogus".to_string()];
    let result = assemble_source(&source);
    let msg = result.diagnostics[0].to_string();
    assert!(msg.starts_with("2:"));
}
