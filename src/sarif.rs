use serde_sarif::sarif::{
    ArtifactChange, ArtifactContent, ArtifactLocation, Fix, Location, LogicalLocation, Message,
    MultiformatMessageString, PhysicalLocation, Region, Replacement, ReportingDescriptor,
    Result as SarifResult,
};

use crate::edit::{AnnotationEdit, DeclarationSite, EditSet, ImportEdit};
use crate::program::MethodSignature;

pub(crate) const NULLABLE_RETURN: &str = "NULLABLE_RETURN";
pub(crate) const NULLABLE_PARAMETER: &str = "NULLABLE_PARAMETER";

/// Metadata describing a reported result kind.
struct RuleMetadata {
    id: &'static str,
    name: &'static str,
    description: &'static str,
}

const RULES: [RuleMetadata; 2] = [
    RuleMetadata {
        id: NULLABLE_PARAMETER,
        name: "Nullable parameter",
        description: "Parameter is tested against null and should carry a nullable qualifier",
    },
    RuleMetadata {
        id: NULLABLE_RETURN,
        name: "Nullable return",
        description: "Method may return null and its return type should carry a nullable qualifier",
    },
];

pub(crate) fn rule_descriptors() -> Vec<ReportingDescriptor> {
    RULES
        .iter()
        .map(|metadata| {
            ReportingDescriptor::builder()
                .id(metadata.id)
                .name(metadata.name)
                .short_description(
                    MultiformatMessageString::builder()
                        .text(metadata.description)
                        .build(),
                )
                .build()
        })
        .collect()
}

/// One SARIF result per annotation edit. The first result of each file also
/// carries that file's import insertion.
pub(crate) fn build_results(edits: &EditSet) -> Vec<SarifResult> {
    let mut results = Vec::new();
    for (file, file_edits) in edits.by_file() {
        let mut import = file_edits.import;
        for edit in file_edits.annotations {
            let mut result = SarifResult::builder()
                .message(result_message(edit))
                .locations(vec![method_location(
                    edit.site.method(),
                    file,
                    edit.line,
                )])
                .build();
            result.rule_id = Some(rule_id(&edit.site).to_string());
            if let Some(fix) = annotation_fix(file, edit, import) {
                result.fixes = Some(vec![fix]);
                import = None;
            }
            results.push(result);
        }
    }
    results
}

fn rule_id(site: &DeclarationSite) -> &'static str {
    match site {
        DeclarationSite::Return { .. } => NULLABLE_RETURN,
        DeclarationSite::Parameter { .. } => NULLABLE_PARAMETER,
    }
}

pub(crate) fn result_message(edit: &AnnotationEdit) -> Message {
    let text = match &edit.site {
        DeclarationSite::Return { method } => format!(
            "{} may return null; declare the return type as {}",
            method_display_name(method),
            edit.annotated_type
        ),
        DeclarationSite::Parameter { method, name, .. } => format!(
            "parameter {name} of {} is checked against null; declare it as {}",
            method_display_name(method),
            edit.annotated_type
        ),
    };
    Message::builder().text(text).build()
}

fn method_display_name(method: &MethodSignature) -> String {
    format!("{}.{}", method.class_name.replace(['/', '$'], "."), method.name)
}

fn method_location(method: &MethodSignature, file: &str, line: Option<u32>) -> Location {
    let logical = LogicalLocation::builder()
        .name(method.to_string())
        .kind("function")
        .build();
    let artifact_location = ArtifactLocation::builder().uri(file.to_string()).build();
    let physical = match line {
        Some(line) => PhysicalLocation::builder()
            .artifact_location(artifact_location)
            .region(Region::builder().start_line(line as i64).build())
            .build(),
        None => PhysicalLocation::builder()
            .artifact_location(artifact_location)
            .build(),
    };
    Location::builder()
        .logical_locations(vec![logical])
        .physical_location(physical)
        .build()
}

fn insertion(offset: usize, text: &str) -> Replacement {
    Replacement::builder()
        .deleted_region(
            Region::builder()
                .byte_offset(offset as i64)
                .byte_length(0)
                .build(),
        )
        .inserted_content(ArtifactContent::builder().text(text.to_string()).build())
        .build()
}

/// Fix inserting the qualifier, plus the import when one is still owed.
/// Edits without a source offset cannot be expressed as a fix.
fn annotation_fix(file: &str, edit: &AnnotationEdit, import: Option<&ImportEdit>) -> Option<Fix> {
    let offset = edit.offset?;
    let mut replacements = Vec::new();
    if let Some(import) = import {
        if let Some(import_offset) = import.offset {
            replacements.push(insertion(import_offset, &import.insert));
        }
    }
    replacements.push(insertion(offset, &edit.insert));
    let change = ArtifactChange::builder()
        .artifact_location(ArtifactLocation::builder().uri(file.to_string()).build())
        .replacements(replacements)
        .build();
    Some(
        Fix::builder()
            .description(
                Message::builder()
                    .text(format!("Insert {}", edit.insert.trim()))
                    .build(),
            )
            .artifact_changes(vec![change])
            .build(),
    )
}
