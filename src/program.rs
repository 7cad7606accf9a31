use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use crate::classpath::ClasspathIndex;
use crate::descriptor::{ReturnKind, method_return_kind, reference_parameters};
use crate::ir::{CompilationUnit, MethodDecl, MethodRef, TypeDecl, TypeKind};

/// Unique identifier for a method in the program model.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub(crate) struct MethodSignature {
    pub(crate) class_name: String,
    pub(crate) name: String,
    pub(crate) descriptor: String,
}

impl MethodSignature {
    pub(crate) fn new(class_name: &str, name: &str, descriptor: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    /// Parameter part of the descriptor, which identifies an override.
    pub(crate) fn parameter_descriptor(&self) -> &str {
        parameter_descriptor(&self.descriptor)
    }
}

impl From<&MethodRef> for MethodSignature {
    fn from(value: &MethodRef) -> Self {
        Self::new(&value.owner, &value.name, &value.descriptor)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.class_name, self.name, self.descriptor)
    }
}

fn parameter_descriptor(descriptor: &str) -> &str {
    match descriptor.find(')') {
        Some(end) => &descriptor[..=end],
        None => descriptor,
    }
}

/// One declared method with everything the analysis needs to reach from it.
pub(crate) struct MethodEntry<'a> {
    pub(crate) signature: MethodSignature,
    pub(crate) method: &'a MethodDecl,
    pub(crate) owner: &'a TypeDecl,
    pub(crate) unit: &'a CompilationUnit,
    pub(crate) return_kind: ReturnKind,
    pub(crate) reference_parameters: Vec<bool>,
}

impl MethodEntry<'_> {
    pub(crate) fn has_body(&self) -> bool {
        self.method.body.is_some()
    }

    pub(crate) fn is_private(&self) -> bool {
        self.method.has_modifier("private")
    }

    /// Interface members are implicitly public unless declared private.
    pub(crate) fn is_public(&self) -> bool {
        if self.method.has_modifier("public") {
            return true;
        }
        matches!(
            self.owner.kind,
            TypeKind::Interface | TypeKind::Annotation
        ) && !self.is_private()
    }

    pub(crate) fn is_constructor(&self) -> bool {
        self.method.name == "<init>" || self.method.return_type.is_none()
    }
}

/// Arena of every method declared in the program model, keyed by signature.
pub(crate) struct ProgramIndex<'a> {
    methods: BTreeMap<MethodSignature, MethodEntry<'a>>,
    classpath: &'a ClasspathIndex<'a>,
}

impl<'a> ProgramIndex<'a> {
    pub(crate) fn get(&self, signature: &MethodSignature) -> Option<&MethodEntry<'a>> {
        self.methods.get(signature)
    }

    pub(crate) fn methods(&self) -> impl Iterator<Item = &MethodEntry<'a>> {
        self.methods.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.methods.len()
    }

    /// Nearest method the given one overrides, searching superclasses and
    /// interfaces breadth-first.
    pub(crate) fn overridden(&self, entry: &MethodEntry<'a>) -> Option<&MethodEntry<'a>> {
        if entry.method.has_modifier("static") || entry.is_private() || entry.is_constructor() {
            return None;
        }
        let parameters = entry.signature.parameter_descriptor();
        for super_name in self.supertypes(entry.owner) {
            let Some(super_type) = self.classpath.get(&super_name) else {
                continue;
            };
            let found = super_type.declaration.methods.iter().find(|method| {
                method.name == entry.method.name
                    && parameter_descriptor(&method.descriptor) == parameters
                    && !method.has_modifier("private")
                    && !method.has_modifier("static")
            });
            if let Some(method) = found {
                let signature = MethodSignature::new(&super_name, &method.name, &method.descriptor);
                return self.methods.get(&signature);
            }
        }
        None
    }

    fn supertypes(&self, declaration: &TypeDecl) -> Vec<String> {
        let mut result = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        push_direct_supertypes(declaration, &mut queue);
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(super_type) = self.classpath.get(&name) {
                push_direct_supertypes(super_type.declaration, &mut queue);
            }
            result.push(name);
        }
        result
    }
}

fn push_direct_supertypes(declaration: &TypeDecl, queue: &mut VecDeque<String>) {
    if let Some(super_name) = &declaration.super_class {
        queue.push_back(super_name.clone());
    }
    for interface in &declaration.interfaces {
        queue.push_back(interface.clone());
    }
}

/// Build the method arena over every type known to the classpath index.
pub(crate) fn build_program_index<'a>(
    classpath: &'a ClasspathIndex<'a>,
) -> Result<ProgramIndex<'a>> {
    let mut methods = BTreeMap::new();
    for declared in classpath.types.values() {
        for method in &declared.declaration.methods {
            let signature =
                MethodSignature::new(&declared.declaration.name, &method.name, &method.descriptor);
            let return_kind = method_return_kind(&method.descriptor)
                .with_context(|| format!("invalid descriptor for {signature}"))?;
            let reference_parameters = reference_parameters(&method.descriptor)
                .with_context(|| format!("invalid descriptor for {signature}"))?;
            if reference_parameters.len() != method.parameters.len() {
                anyhow::bail!(
                    "{signature} declares {} parameters but its descriptor has {}",
                    method.parameters.len(),
                    reference_parameters.len()
                );
            }
            let entry = MethodEntry {
                signature: signature.clone(),
                method,
                owner: declared.declaration,
                unit: declared.unit,
                return_kind,
                reference_parameters,
            };
            if methods.insert(signature.clone(), entry).is_some() {
                warn!(method = %signature, "duplicate method declaration; keeping the last one");
            }
        }
    }
    Ok(ProgramIndex { methods, classpath })
}
