use std::collections::BTreeMap;

use anyhow::Result;

use crate::ir::{CompilationUnit, TypeDecl};
use crate::visit::{Visitor, walk_type};

/// Declared types keyed by internal name, with the unit declaring each.
pub(crate) struct ClasspathIndex<'a> {
    pub(crate) types: BTreeMap<String, DeclaredType<'a>>,
}

/// A type declaration together with the unit it came from.
#[derive(Clone, Copy)]
pub(crate) struct DeclaredType<'a> {
    pub(crate) declaration: &'a TypeDecl,
    pub(crate) unit: &'a CompilationUnit,
}

impl<'a> ClasspathIndex<'a> {
    pub(crate) fn get(&self, name: &str) -> Option<&DeclaredType<'a>> {
        self.types.get(name)
    }
}

pub(crate) fn resolve_classpath(units: &[CompilationUnit]) -> Result<ClasspathIndex<'_>> {
    let mut declared: BTreeMap<String, Vec<DeclaredType<'_>>> = BTreeMap::new();
    for unit in units {
        let mut collector = TypeCollector {
            unit,
            found: Vec::new(),
        };
        for declaration in &unit.types {
            collector.visit_type(declaration);
        }
        for declared_type in collector.found {
            declared
                .entry(declared_type.declaration.name.clone())
                .or_default()
                .push(declared_type);
        }
    }

    let mut duplicates = Vec::new();
    for (name, entries) in &declared {
        if entries.len() > 1 {
            let paths: Vec<&str> = entries.iter().map(|entry| entry.unit.path.as_str()).collect();
            duplicates.push(format!("{name}: {paths:?}"));
        }
    }
    if !duplicates.is_empty() {
        anyhow::bail!("duplicate types found: {}", duplicates.join(", "));
    }

    let types = declared
        .into_iter()
        .filter_map(|(name, entries)| entries.into_iter().next().map(|entry| (name, entry)))
        .collect();

    Ok(ClasspathIndex { types })
}

/// Gathers every type declared in a unit, including local and anonymous classes.
struct TypeCollector<'a> {
    unit: &'a CompilationUnit,
    found: Vec<DeclaredType<'a>>,
}

impl<'a> Visitor<'a> for TypeCollector<'a> {
    fn visit_type(&mut self, declaration: &'a TypeDecl) {
        self.found.push(DeclaredType {
            declaration,
            unit: self.unit,
        });
        walk_type(self, declaration);
    }
}
