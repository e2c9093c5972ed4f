//! Integration-style tests driving the whole pipeline through
//! [`crate::assemble_source`], end to end rather than module by module.

use crate::driver::assemble_source;

fn lines(src: &[&str]) -> Vec<String> {
    src.iter().map(|s| s.to_string()).collect()
}

#[test]
fn minimal_stop_only_program() {
    let result = assemble_source(&lines(&["stop"]));
    assert!(result.diagnostics.is_empty());
    let encoded = result.encoded.unwrap();
    let mut obj_lines = encoded.object.lines();
    assert_eq!(obj_lines.next().unwrap(), "b a");
    let word_line = obj_lines.next().unwrap();
    let mut fields = word_line.split('\t');
    let address = fields.next().unwrap();
    let word = fields.next().unwrap();
    assert!(fields.next().is_none());
    assert_eq!(address, "bcba"); // MEMORY_START = 100
    assert_eq!(word.len(), 5);
    assert!(obj_lines.next().is_none());
}

#[test]
fn immediate_and_register_operand_encoding() {
    let result = assemble_source(&lines(&["mov #5, r3", "stop"]));
    assert!(result.diagnostics.is_empty());
    let encoded = result.encoded.unwrap();
    // command word + one address word (immediate) + one register word + stop's command word.
    assert_eq!(encoded.object.lines().count(), 1 + 4);
}

#[test]
fn label_definition_and_extern_use_together() {
    let result = assemble_source(&lines(&[
        ".extern EXT",
        "mov EXT, r1",
        "LOOP: inc r1",
        "bne LOOP",
        "stop",
    ]));
    assert!(result.diagnostics.is_empty());
    let encoded = result.encoded.unwrap();
    let externals = encoded.externals.expect("external use recorded");
    assert!(externals.contains("EXT"));
}

#[test]
fn matrix_directive_and_operand() {
    let result = assemble_source(&lines(&[
        "M: .mat [2][2] 1, 2, 3, 4",
        "lea M[r1][r2], r3",
        "stop",
    ]));
    assert!(result.diagnostics.is_empty());
    let encoded = result.encoded.unwrap();
    // header + 4 data words + (command, address placeholder, and register
    // words for the matrix src and register dst) + stop's command word.
    assert_eq!(encoded.object.lines().count(), 1 + 4 + 4 + 1);
}

#[test]
fn entry_declared_before_its_label_is_defined() {
    let result = assemble_source(&lines(&[".entry LOOP", "LOOP: stop"]));
    assert!(result.diagnostics.is_empty());
    let encoded = result.encoded.unwrap();
    let entries = encoded.entries.expect("entry recorded");
    assert!(entries.starts_with("LOOP"));
}

#[test]
fn macro_expansion_feeds_directly_into_the_rest_of_the_pipeline() {
    let result = assemble_source(&lines(&[
        "mcro DOUBLE_INC",
        "inc r1",
        "inc r1",
        "mcroend",
        "DOUBLE_INC",
        "stop",
    ]));
    assert!(result.diagnostics.is_empty());
    let encoded = result.encoded.unwrap();
    // header + 2x(command, register word) for the expanded incs + 1 stop command.
    assert_eq!(encoded.object.lines().count(), 6);
}

#[test]
fn image_word_cap_is_enforced() {
    let mut src: Vec<String> = Vec::new();
    src.push(".data ".to_string() + &vec!["1"; 200].join(", "));
    let result = assemble_source(&src);
    assert!(!result.diagnostics.is_empty());
    assert!(result.encoded.is_none());
}

#[test]
fn any_diagnostic_suppresses_all_artifact_emission() {
    let result = assemble_source(&lines(&["stop", "this is not valid"]));
    assert!(result.encoded.is_none());
    assert!(!result.diagnostics.is_empty());
}

#[test]
fn pipeline_is_idempotent_over_the_same_source() {
    let src = lines(&["mov #1, r2", "stop"]);
    let first = assemble_source(&src);
    let second = assemble_source(&src);
    assert_eq!(first.encoded.unwrap().object, second.encoded.unwrap().object);
}
