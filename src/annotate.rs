//! Turns final nullable verdicts into qualifier insertions.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{EngineConfig, Qualifier};
use crate::descriptor::ReturnKind;
use crate::edit::{AnnotationEdit, DeclarationSite, EditSet, ImportEdit};
use crate::facts::{Fact, FactOrigin, FactTable, NullabilityVerdict};
use crate::ir::{CompilationUnit, TypeDecl, TypeKind, TypeRef};
use crate::program::{MethodEntry, MethodSignature, ProgramIndex};

/// How the qualifier is brought into scope in one file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ImportDecision {
    /// The simple name already resolves to the qualifier.
    NotNeeded,
    /// Insert a single-type import and use the simple name.
    Insert,
    /// The simple name is taken; spell the qualifier fully qualified.
    FullyQualified,
}

pub(crate) fn import_decision(unit: &CompilationUnit, qualifier: &Qualifier) -> ImportDecision {
    let Some(package) = qualifier.package() else {
        return ImportDecision::NotNeeded;
    };
    if unit.package.as_deref() == Some(package) {
        return ImportDecision::NotNeeded;
    }
    let qualified_name = qualifier.qualified_name();
    let simple_name = qualifier.simple_name();
    let type_imports = || unit.imports.iter().filter(|import| !import.is_static);

    if type_imports().any(|import| import.name == qualified_name) {
        return ImportDecision::NotNeeded;
    }
    if type_imports().any(|import| import.simple_name() == Some(simple_name))
        || unit
            .types
            .iter()
            .any(|declaration| declares_type_named(declaration, simple_name))
    {
        return ImportDecision::FullyQualified;
    }
    if type_imports().any(|import| import.wildcard_package() == Some(package)) {
        return ImportDecision::NotNeeded;
    }
    ImportDecision::Insert
}

fn declares_type_named(declaration: &TypeDecl, simple_name: &str) -> bool {
    let named = !matches!(declaration.kind, TypeKind::Anonymous)
        && declaration.simple_name() == simple_name;
    named
        || declaration
            .nested_types
            .iter()
            .any(|nested| declares_type_named(nested, simple_name))
}

/// Where and what to insert into a declared type's text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Placement {
    /// Offset relative to the start of the type text.
    pub(crate) offset: usize,
    pub(crate) insert: String,
}

impl Placement {
    pub(crate) fn apply(&self, text: &str) -> String {
        let mut annotated = text.to_string();
        annotated.insert_str(self.offset, &self.insert);
        annotated
    }
}

/// Locate the insertion point for a type-use annotation.
///
/// Arrays take the annotation before their dimensions (`String @Nullable []`),
/// qualified names before the innermost simple name (`Outer.@Nullable Inner`).
/// Dots and brackets inside generic arguments are ignored.
pub(crate) fn placement(text: &str, annotation: &str) -> Placement {
    let mut depth = 0usize;
    let mut last_dot = None;
    let mut dimensions = None;
    for (index, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            '[' if depth == 0 => {
                dimensions = Some(index);
                break;
            }
            '.' if depth == 0 => {
                if text[index..].starts_with("...") {
                    dimensions = Some(index);
                    break;
                }
                last_dot = Some(index);
            }
            _ => {}
        }
    }

    if let Some(at) = dimensions {
        let end_of_element = text[..at].trim_end().len();
        let insert = if end_of_element < at {
            format!(" {annotation}")
        } else {
            format!(" {annotation} ")
        };
        return Placement {
            offset: end_of_element,
            insert,
        };
    }
    let name_start = last_dot.map_or(0, |dot| dot + 1);
    let offset = name_start + (text[name_start..].len() - text[name_start..].trim_start().len());
    Placement {
        offset,
        insert: format!("{annotation} "),
    }
}

fn derived_nullable(fact: Option<&Fact>) -> bool {
    matches!(
        fact,
        Some(Fact {
            verdict: NullabilityVerdict::Nullable,
            origin: FactOrigin::Derived,
        })
    )
}

/// Whether the return type of `entry` should receive the qualifier.
pub(crate) fn return_eligible(
    entry: &MethodEntry<'_>,
    index: &ProgramIndex<'_>,
    facts: &FactTable,
) -> bool {
    return_eligible_within(entry, index, facts, &mut BTreeSet::new())
}

fn return_eligible_within(
    entry: &MethodEntry<'_>,
    index: &ProgramIndex<'_>,
    facts: &FactTable,
    visited: &mut BTreeSet<MethodSignature>,
) -> bool {
    if !visited.insert(entry.signature.clone()) {
        return false;
    }
    if !entry.unit.is_analysis_target
        || !entry.has_body()
        || entry.return_kind != ReturnKind::Reference
        || entry.is_private()
        || entry.method.return_type.is_none()
    {
        return false;
    }
    if !derived_nullable(facts.return_fact(&entry.signature)) {
        return false;
    }
    // The overridden declaration must end up nullable as well.
    match index.overridden(entry) {
        Some(overridden) => {
            declared_nullable(facts.return_fact(&overridden.signature))
                || return_eligible_within(overridden, index, facts, visited)
        }
        None => !entry.method.is_override(),
    }
}

fn declared_nullable(fact: Option<&Fact>) -> bool {
    matches!(
        fact,
        Some(Fact {
            verdict: NullabilityVerdict::Nullable,
            origin: FactOrigin::Declared,
        })
    )
}

/// Whether parameter `position` of `entry` should receive the qualifier.
pub(crate) fn parameter_eligible(
    entry: &MethodEntry<'_>,
    position: usize,
    facts: &FactTable,
    config: &EngineConfig,
) -> bool {
    entry.unit.is_analysis_target
        && entry.has_body()
        && entry
            .reference_parameters
            .get(position)
            .copied()
            .unwrap_or(false)
        && (entry.is_public() || config.include_non_public_parameters)
        && derived_nullable(facts.parameter_fact(&entry.signature, position))
}

struct PendingEdit<'a> {
    site: DeclarationSite,
    ty: &'a TypeRef,
    line: Option<u32>,
}

/// Build the edit set for every eligible declaration, with at most one
/// import insertion per file.
pub(crate) fn plan_edits(
    index: &ProgramIndex<'_>,
    facts: &FactTable,
    config: &EngineConfig,
) -> EditSet {
    let mut files: BTreeMap<&str, (&CompilationUnit, Vec<PendingEdit<'_>>)> = BTreeMap::new();
    for entry in index.methods() {
        let mut pending = Vec::new();
        if return_eligible(entry, index, facts) {
            if let Some(ty) = &entry.method.return_type {
                pending.push(PendingEdit {
                    site: DeclarationSite::Return {
                        method: entry.signature.clone(),
                    },
                    ty,
                    line: entry.method.line,
                });
            }
        }
        for (position, parameter) in entry.method.parameters.iter().enumerate() {
            if parameter_eligible(entry, position, facts, config) {
                pending.push(PendingEdit {
                    site: DeclarationSite::Parameter {
                        method: entry.signature.clone(),
                        index: position,
                        name: parameter.name.clone(),
                    },
                    ty: &parameter.ty,
                    line: entry.method.line,
                });
            }
        }
        if !pending.is_empty() {
            files
                .entry(entry.unit.path.as_str())
                .or_insert_with(|| (entry.unit, Vec::new()))
                .1
                .extend(pending);
        }
    }

    let qualifier = &config.qualifier;
    let mut edits = EditSet::default();
    for (path, (unit, pending)) in files {
        let decision = import_decision(unit, qualifier);
        let annotation = match decision {
            ImportDecision::FullyQualified => format!("@{}", qualifier.qualified_name()),
            ImportDecision::NotNeeded | ImportDecision::Insert => {
                format!("@{}", qualifier.simple_name())
            }
        };
        for edit in pending {
            let placement = placement(&edit.ty.text, &annotation);
            edits.annotations.push(AnnotationEdit {
                file: path.to_string(),
                site: edit.site,
                line: edit.line,
                offset: edit.ty.offset.map(|offset| offset + placement.offset),
                annotated_type: placement.apply(&edit.ty.text),
                insert: placement.insert,
            });
        }
        if decision == ImportDecision::Insert {
            edits.imports.push(ImportEdit {
                file: path.to_string(),
                offset: unit.import_offset,
                insert: format!("import {};\n", qualifier.qualified_name()),
                qualified_name: qualifier.qualified_name(),
            });
        }
    }
    edits.normalize();
    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Annotation, Import};
    use crate::test_harness::{
        analyze, binary, class, if_then, interface, invoke, method, name, null, ret, unit,
    };

    const GETTER: &str = "()Ljava/lang/String;";

    fn import(name: &str) -> Import {
        Import {
            name: name.to_string(),
            is_static: false,
        }
    }

    fn sites(edits: &EditSet) -> Vec<String> {
        edits
            .annotations
            .iter()
            .map(|edit| match &edit.site {
                DeclarationSite::Return { method } => format!("return {}", method.name),
                DeclarationSite::Parameter { method, name, .. } => {
                    format!("parameter {}#{name}", method.name)
                }
            })
            .collect()
    }

    #[test]
    fn placement_handles_simple_qualified_and_array_types() {
        let cases = [
            ("String", "@Nullable String"),
            ("Map.Entry<K, V>", "Map.@Nullable Entry<K, V>"),
            (
                "java.util.Map.Entry<java.lang.String, a.B>",
                "java.util.Map.@Nullable Entry<java.lang.String, a.B>",
            ),
            ("String[]", "String @Nullable []"),
            ("String [][]", "String @Nullable [][]"),
            ("List<String[]>[]", "List<String[]> @Nullable []"),
            ("Object...", "Object @Nullable ..."),
        ];
        for (text, expected) in cases {
            assert_eq!(placement(text, "@Nullable").apply(text), expected, "{text}");
        }
    }

    #[test]
    fn import_decision_follows_the_file_scope() {
        let qualifier = Qualifier::default();
        let mut file = unit("com/example/A.java", vec![class("com/example/A", Vec::new())]);
        assert_eq!(import_decision(&file, &qualifier), ImportDecision::Insert);

        file.imports = vec![import("org.jspecify.annotations.Nullable")];
        assert_eq!(import_decision(&file, &qualifier), ImportDecision::NotNeeded);

        file.imports = vec![import("org.jspecify.annotations.*")];
        assert_eq!(import_decision(&file, &qualifier), ImportDecision::NotNeeded);

        file.imports = vec![
            import("org.jspecify.annotations.*"),
            import("javax.annotation.Nullable"),
        ];
        assert_eq!(
            import_decision(&file, &qualifier),
            ImportDecision::FullyQualified
        );

        file.imports = Vec::new();
        file.package = Some("org.jspecify.annotations".to_string());
        assert_eq!(import_decision(&file, &qualifier), ImportDecision::NotNeeded);
    }

    #[test]
    fn declared_type_with_the_same_name_forces_qualified_spelling() {
        let mut outer = class("com/example/A", Vec::new());
        outer
            .nested_types
            .push(class("com/example/A$Nullable", Vec::new()));
        let file = unit("com/example/A.java", vec![outer]);

        assert_eq!(
            import_decision(&file, &Qualifier::default()),
            ImportDecision::FullyQualified
        );
    }

    #[test]
    fn get_string_example_yields_two_edits_and_one_import() {
        let source = "package com.example;\n\npublic class Strings {\n    public String getString() { return null; }\n    public String getString2() { return getString(); }\n}\n";
        let offset_of = |needle: &str| source.find(needle).expect("needle in source");
        let get_string = method("getString", GETTER)
            .public()
            .returns_at("String", offset_of("String getString()"))
            .body(vec![ret(null())])
            .build();
        let get_string2 = method("getString2", GETTER)
            .public()
            .returns_at("String", offset_of("String getString2()"))
            .body(vec![ret(invoke(
                "com/example/Strings",
                "getString",
                GETTER,
                Vec::new(),
            ))])
            .build();
        let mut file = unit(
            "com/example/Strings.java",
            vec![class("com/example/Strings", vec![get_string, get_string2])],
        );
        file.import_offset = Some("package com.example;\n\n".len());

        let output = analyze(&[file], EngineConfig::default());

        assert_eq!(output.edits.annotations.len(), 2);
        assert_eq!(output.edits.imports.len(), 1);
        let updated = output
            .edits
            .apply("com/example/Strings.java", source)
            .expect("apply edits");
        assert_eq!(
            updated,
            "package com.example;\n\nimport org.jspecify.annotations.Nullable;\npublic class Strings {\n    public @Nullable String getString() { return null; }\n    public @Nullable String getString2() { return getString(); }\n}\n"
        );
    }

    #[test]
    fn already_annotated_declarations_are_left_alone() {
        let mut annotated = method("get", GETTER)
            .public()
            .body(vec![ret(null())])
            .build();
        if let Some(return_type) = annotated.return_type.as_mut() {
            return_type.annotations.push(Annotation {
                name: "Nullable".to_string(),
            });
        }
        let accept = method("accept", "(Ljava/lang/String;)V")
            .public()
            .param("value", "String")
            .param_annotated("org.jspecify.annotations.Nullable")
            .body(vec![if_then(binary("==", name("value"), null()), vec![])])
            .build();
        let file = unit(
            "com/example/A.java",
            vec![class("com/example/A", vec![annotated, accept])],
        );

        let output = analyze(&[file], EngineConfig::default());

        assert!(output.edits.is_empty());
    }

    #[test]
    fn visibility_rules_apply_per_declaration_kind() {
        let private_getter = method("hidden", GETTER)
            .private()
            .body(vec![ret(null())])
            .build();
        let package_getter = method("visible", GETTER).body(vec![ret(null())]).build();
        let package_setter = method("store", "(Ljava/lang/String;)V")
            .param("value", "String")
            .body(vec![if_then(binary("==", name("value"), null()), vec![])])
            .build();
        let units = vec![unit(
            "com/example/A.java",
            vec![class(
                "com/example/A",
                vec![private_getter, package_getter, package_setter],
            )],
        )];

        let output = analyze(&units, EngineConfig::default());
        assert_eq!(sites(&output.edits), vec!["return visible"]);

        let config = EngineConfig {
            include_non_public_parameters: true,
            ..EngineConfig::default()
        };
        let output = analyze(&units, config);
        assert_eq!(
            sites(&output.edits),
            vec!["return visible", "parameter store#value"]
        );
    }

    #[test]
    fn overriding_returns_follow_the_overridden_declaration() {
        let api = interface(
            "com/example/Api",
            vec![method("value", GETTER).build(), method("other", GETTER).build()],
        );
        let mut implementation = class(
            "com/example/Impl",
            vec![
                method("value", GETTER)
                    .public()
                    .annotated("Override")
                    .body(vec![ret(null())])
                    .build(),
                method("external", GETTER)
                    .public()
                    .annotated("Override")
                    .body(vec![ret(null())])
                    .build(),
                method("fresh", GETTER).public().body(vec![ret(null())]).build(),
            ],
        );
        implementation
            .interfaces
            .push("com/example/Api".to_string());
        let units = vec![
            unit("com/example/Api.java", vec![api]),
            unit("com/example/Impl.java", vec![implementation]),
        ];

        let output = analyze(&units, EngineConfig::default());

        assert_eq!(sites(&output.edits), vec!["return fresh"]);
    }

    #[test]
    fn override_of_an_unannotated_override_is_left_alone() {
        let api = interface("com/example/Api", vec![method("value", GETTER).build()]);
        let mut base = class(
            "com/example/B",
            vec![
                method("value", GETTER)
                    .public()
                    .annotated("Override")
                    .body(vec![ret(null())])
                    .build(),
            ],
        );
        base.interfaces.push("com/example/Api".to_string());
        let mut child = class(
            "com/example/C",
            vec![
                method("value", GETTER)
                    .public()
                    .annotated("Override")
                    .body(vec![ret(null())])
                    .build(),
            ],
        );
        child.super_class = Some("com/example/B".to_string());
        let units = vec![
            unit("com/example/Api.java", vec![api]),
            unit("com/example/B.java", vec![base]),
            unit("com/example/C.java", vec![child]),
        ];

        let output = analyze(&units, EngineConfig::default());

        assert!(output.edits.is_empty(), "{:?}", sites(&output.edits));
    }

    #[test]
    fn override_chain_follows_parents_annotated_in_the_same_run() {
        let base = class(
            "com/example/B",
            vec![method("value", GETTER).public().body(vec![ret(null())]).build()],
        );
        let mut child = class(
            "com/example/C",
            vec![
                method("value", GETTER)
                    .public()
                    .annotated("Override")
                    .body(vec![ret(null())])
                    .build(),
            ],
        );
        child.super_class = Some("com/example/B".to_string());
        let units = vec![
            unit("com/example/B.java", vec![base]),
            unit("com/example/C.java", vec![child]),
        ];

        let output = analyze(&units, EngineConfig::default());

        assert_eq!(sites(&output.edits), vec!["return value", "return value"]);
        let files: Vec<&str> = output
            .edits
            .annotations
            .iter()
            .map(|edit| edit.file.as_str())
            .collect();
        assert_eq!(files, vec!["com/example/B.java", "com/example/C.java"]);
    }

    #[test]
    fn override_of_a_context_parent_needs_a_declared_qualifier() {
        let parent = |annotation: Option<&str>| {
            let mut value = method("value", GETTER).public().body(vec![ret(null())]);
            if let Some(annotation) = annotation {
                value = value.annotated(annotation);
            }
            let mut context = unit(
                "com/example/Base.java",
                vec![class("com/example/Base", vec![value.build()])],
            );
            context.is_analysis_target = false;
            context
        };
        let mut sub = class(
            "com/example/Sub",
            vec![
                method("value", GETTER)
                    .public()
                    .annotated("Override")
                    .body(vec![ret(null())])
                    .build(),
            ],
        );
        sub.super_class = Some("com/example/Base".to_string());
        let target = unit("com/example/Sub.java", vec![sub]);

        let unannotated = analyze(&[parent(None), target.clone()], EngineConfig::default());
        assert!(unannotated.edits.is_empty());

        let annotated = analyze(&[parent(Some("Nullable")), target], EngineConfig::default());
        assert_eq!(sites(&annotated.edits), vec!["return value"]);
    }

    #[test]
    fn context_units_are_never_edited() {
        let mut file = unit(
            "com/example/A.java",
            vec![class(
                "com/example/A",
                vec![method("get", GETTER).public().body(vec![ret(null())]).build()],
            )],
        );
        file.is_analysis_target = false;

        let output = analyze(&[file], EngineConfig::default());

        assert!(output.edits.is_empty());
    }

    #[test]
    fn custom_qualifier_and_conflicts_use_the_qualified_spelling() {
        let mut file = unit(
            "com/example/A.java",
            vec![class(
                "com/example/A",
                vec![method("get", GETTER).public().body(vec![ret(null())]).build()],
            )],
        );
        file.imports = vec![import("com.acme.MaybeAbsent")];
        let config = EngineConfig {
            qualifier: Qualifier::parse("org.other.MaybeAbsent").expect("qualifier"),
            ..EngineConfig::default()
        };

        let output = analyze(&[file], config);

        assert!(output.edits.imports.is_empty());
        assert_eq!(
            output.edits.annotations[0].annotated_type,
            "@org.other.MaybeAbsent String"
        );
    }

    #[test]
    fn varargs_parameter_edit_lands_before_the_ellipsis() {
        let join = method("join", "([Ljava/lang/String;)Ljava/lang/String;")
            .public()
            .param_at("parts", "String...", 100)
            .returns_at("String", 80)
            .body(vec![
                if_then(binary("==", name("parts"), null()), vec![ret(null())]),
                ret(name("parts")),
            ])
            .build();
        let file = unit(
            "com/example/Join.java",
            vec![class("com/example/Join", vec![join])],
        );

        let output = analyze(&[file], EngineConfig::default());

        let parameter = output
            .edits
            .annotations
            .iter()
            .find(|edit| matches!(edit.site, DeclarationSite::Parameter { .. }))
            .expect("parameter edit");
        assert_eq!(parameter.offset, Some(106));
        assert_eq!(parameter.insert, " @Nullable ");
        assert_eq!(parameter.annotated_type, "String @Nullable ...");
        assert_eq!(sites(&output.edits), vec!["return join", "parameter join#parts"]);
    }
}
