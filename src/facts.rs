use std::collections::{BTreeMap, BTreeSet};

use crate::ir::Annotation;
use crate::program::{MethodSignature, ProgramIndex};

/// Nullability of one return value or parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum NullabilityVerdict {
    NonNull,
    Nullable,
    /// Depends on callees that have no concrete verdict yet.
    PendingCallees(BTreeSet<MethodSignature>),
}

impl NullabilityVerdict {
    pub(crate) fn is_concrete(&self) -> bool {
        !matches!(self, NullabilityVerdict::PendingCallees(_))
    }
}

/// Where a fact came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FactOrigin {
    /// Seeded from a qualifier already present in source; authoritative.
    Declared,
    Derived,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Fact {
    pub(crate) verdict: NullabilityVerdict,
    pub(crate) origin: FactOrigin,
}

/// Nullness stated by an annotation already written on a declaration.
pub(crate) fn declared_nullness<'a, I>(annotations: I, qualifier_simple_name: &str) -> Option<NullabilityVerdict>
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let mut result = None;
    for annotation in annotations {
        let name = annotation.simple_name();
        if name == qualifier_simple_name || matches!(name, "Nullable" | "CheckForNull") {
            return Some(NullabilityVerdict::Nullable);
        }
        if matches!(name, "NonNull" | "Nonnull" | "NotNull") {
            result = Some(NullabilityVerdict::NonNull);
        }
    }
    result
}

/// Verdicts for every return value and parameter of the program model.
#[derive(Clone, Debug, Default)]
pub(crate) struct FactTable {
    returns: BTreeMap<MethodSignature, Fact>,
    parameters: BTreeMap<(MethodSignature, usize), Fact>,
}

impl FactTable {
    /// Seed the table from qualifiers already present in the program model.
    pub(crate) fn seeded(index: &ProgramIndex<'_>, qualifier_simple_name: &str) -> Self {
        let mut table = Self::default();
        for entry in index.methods() {
            let method = entry.method;
            let return_annotations = method.annotations.iter().chain(
                method
                    .return_type
                    .iter()
                    .flat_map(|return_type| return_type.annotations.iter()),
            );
            if let Some(verdict) = declared_nullness(return_annotations, qualifier_simple_name) {
                table.returns.insert(
                    entry.signature.clone(),
                    Fact {
                        verdict,
                        origin: FactOrigin::Declared,
                    },
                );
            }
            for (position, parameter) in method.parameters.iter().enumerate() {
                let annotations = parameter
                    .annotations
                    .iter()
                    .chain(parameter.ty.annotations.iter());
                if let Some(verdict) = declared_nullness(annotations, qualifier_simple_name) {
                    table.parameters.insert(
                        (entry.signature.clone(), position),
                        Fact {
                            verdict,
                            origin: FactOrigin::Declared,
                        },
                    );
                }
            }
        }
        table
    }

    pub(crate) fn return_fact(&self, signature: &MethodSignature) -> Option<&Fact> {
        self.returns.get(signature)
    }

    /// Concrete return verdict of a method, if one is known.
    pub(crate) fn concrete_return(&self, signature: &MethodSignature) -> Option<&NullabilityVerdict> {
        self.returns
            .get(signature)
            .map(|fact| &fact.verdict)
            .filter(|verdict| verdict.is_concrete())
    }

    /// Record a derived return verdict; returns true when the method gained a
    /// concrete verdict. Concrete verdicts are never replaced.
    pub(crate) fn record_return(
        &mut self,
        signature: &MethodSignature,
        verdict: NullabilityVerdict,
    ) -> bool {
        let became_concrete = verdict.is_concrete();
        match self.returns.get_mut(signature) {
            Some(fact) if fact.verdict.is_concrete() => false,
            Some(fact) => {
                fact.verdict = verdict;
                became_concrete
            }
            None => {
                self.returns.insert(
                    signature.clone(),
                    Fact {
                        verdict,
                        origin: FactOrigin::Derived,
                    },
                );
                became_concrete
            }
        }
    }

    /// Methods whose return verdict is still waiting on callees.
    pub(crate) fn pending_returns(&self) -> impl Iterator<Item = (&MethodSignature, &BTreeSet<MethodSignature>)> {
        self.returns
            .iter()
            .filter_map(|(signature, fact)| match &fact.verdict {
                NullabilityVerdict::PendingCallees(callees) => Some((signature, callees)),
                _ => None,
            })
    }

    /// Resolve every remaining pending verdict to `NonNull`.
    pub(crate) fn default_pending_to_non_null(&mut self) -> Vec<MethodSignature> {
        let mut resolved = Vec::new();
        for (signature, fact) in &mut self.returns {
            if !fact.verdict.is_concrete() {
                fact.verdict = NullabilityVerdict::NonNull;
                resolved.push(signature.clone());
            }
        }
        resolved
    }

    pub(crate) fn parameter_fact(&self, signature: &MethodSignature, position: usize) -> Option<&Fact> {
        self.parameters.get(&(signature.clone(), position))
    }

    /// Record a derived parameter verdict unless the source already decided it.
    pub(crate) fn record_parameter(
        &mut self,
        signature: &MethodSignature,
        position: usize,
        verdict: NullabilityVerdict,
    ) {
        self.parameters
            .entry((signature.clone(), position))
            .or_insert(Fact {
                verdict,
                origin: FactOrigin::Derived,
            });
    }

    pub(crate) fn nullable_returns(&self) -> impl Iterator<Item = (&MethodSignature, &Fact)> {
        self.returns
            .iter()
            .filter(|(_, fact)| fact.verdict == NullabilityVerdict::Nullable)
    }

    pub(crate) fn nullable_parameters(&self) -> impl Iterator<Item = (&(MethodSignature, usize), &Fact)> {
        self.parameters
            .iter()
            .filter(|(_, fact)| fact.verdict == NullabilityVerdict::Nullable)
    }
}
