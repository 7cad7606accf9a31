use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run_nullspect(args: &[&str]) -> Value {
    let model = fixture("get_string.json");
    let output = Command::new(env!("CARGO_BIN_EXE_nullspect"))
        .arg("--input")
        .arg(&model)
        .args(args)
        .output()
        .expect("run nullspect");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("parse stdout as JSON")
}

/// Apply insertions back to front so earlier offsets stay valid.
fn apply_insertions(source: &str, mut insertions: Vec<(usize, String)>) -> String {
    insertions.sort_by(|left, right| right.0.cmp(&left.0));
    let mut updated = source.to_string();
    for (offset, text) in insertions {
        updated.insert_str(offset, &text);
    }
    updated
}

#[test]
fn edit_report_annotates_returns_parameters_and_imports_once() {
    let report = run_nullspect(&["--format", "edits"]);

    assert_eq!(report["qualifier"], "org.jspecify.annotations.Nullable");
    let annotations = report["annotations"].as_array().expect("annotations");
    let offsets: Vec<u64> = annotations
        .iter()
        .filter_map(|edit| edit["offset"].as_u64())
        .collect();
    assert_eq!(offsets, vec![56, 103, 169]);
    assert_eq!(annotations[2]["site"]["kind"], "parameter");
    assert_eq!(annotations[2]["site"]["name"], "value");
    let imports = report["imports"].as_array().expect("imports");
    assert_eq!(imports.len(), 1);

    let insertions: Vec<(usize, String)> = annotations
        .iter()
        .chain(imports.iter())
        .map(|edit| {
            (
                edit["offset"].as_u64().expect("offset") as usize,
                edit["insert"].as_str().expect("insert").to_string(),
            )
        })
        .collect();
    let source = std::fs::read_to_string(fixture("Strings.java")).expect("read source");
    let updated = apply_insertions(&source, insertions);

    assert_eq!(
        updated,
        "package com.example;\n\n\
         import org.jspecify.annotations.Nullable;\n\
         public class Strings {\n    \
         public @Nullable String getString() { return null; }\n    \
         public @Nullable String getString2() { return getString(); }\n    \
         public int length(@Nullable String value) { if (value == null) { return 0; } return value.length(); }\n\
         }\n"
    );
}

#[test]
fn sarif_report_lists_one_result_per_declaration() {
    let sarif = run_nullspect(&[]);

    let run = &sarif["runs"][0];
    assert_eq!(run["tool"]["driver"]["name"], "nullspect");
    let results = run["results"].as_array().expect("results");
    let rule_ids: Vec<&str> = results
        .iter()
        .filter_map(|result| result["ruleId"].as_str())
        .collect();
    assert_eq!(
        rule_ids,
        vec!["NULLABLE_RETURN", "NULLABLE_RETURN", "NULLABLE_PARAMETER"]
    );
    let first_fix = &results[0]["fixes"][0]["artifactChanges"][0];
    assert_eq!(
        first_fix["artifactLocation"]["uri"],
        "com/example/Strings.java"
    );
    assert_eq!(first_fix["replacements"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        results[2]["locations"][0]["physicalLocation"]["region"]["startLine"],
        6
    );
    assert_eq!(
        run["artifacts"][0]["location"]["uri"],
        "com/example/Strings.java"
    );
}

#[test]
fn custom_qualifier_changes_inserted_text() {
    let report = run_nullspect(&[
        "--format",
        "edits",
        "--qualifier",
        "javax.annotation.CheckForNull",
    ]);

    assert_eq!(report["annotations"][0]["insert"], "@CheckForNull ");
    assert_eq!(
        report["imports"][0]["insert"],
        "import javax.annotation.CheckForNull;\n"
    );
}
