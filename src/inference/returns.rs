use std::collections::BTreeSet;

use crate::catalog::LibraryCatalog;
use crate::descriptor::ReturnKind;
use crate::facts::{FactTable, NullabilityVerdict};
use crate::ir::{Expression, MethodDecl, MethodRef, Statement, TypeDecl};
use crate::program::{MethodSignature, ProgramIndex};
use crate::visit::{Visitor, walk_statement};

/// What a single return site says about its method.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum SiteContribution {
    Nullable,
    NonNull,
    Pending(MethodSignature),
}

/// Return statements reachable without entering a lambda or nested class body.
pub(crate) fn return_sites(body: &[Statement]) -> Vec<&Expression> {
    let mut collector = ReturnCollector { sites: Vec::new() };
    for statement in body {
        collector.visit_statement(statement);
    }
    collector.sites
}

struct ReturnCollector<'a> {
    sites: Vec<&'a Expression>,
}

impl<'a> Visitor<'a> for ReturnCollector<'a> {
    fn visit_statement(&mut self, statement: &'a Statement) {
        if let Statement::Return { value: Some(value) } = statement {
            self.sites.push(value);
            return;
        }
        walk_statement(self, statement);
    }

    // Returns only occur as statements; expressions hold nothing but
    // lambdas and anonymous classes, whose returns belong to other methods.
    fn visit_expression(&mut self, _expression: &'a Expression) {}

    fn visit_type(&mut self, _declaration: &'a TypeDecl) {}
}

/// Classify one return expression against the current facts.
pub(crate) fn classify_site(
    expression: &Expression,
    index: &ProgramIndex<'_>,
    facts: &FactTable,
    catalog: &LibraryCatalog,
) -> SiteContribution {
    match strip_casts(expression) {
        Expression::Null => SiteContribution::Nullable,
        Expression::Conditional {
            then, otherwise, ..
        } if has_null_branch(then) || has_null_branch(otherwise) => SiteContribution::Nullable,
        Expression::MethodCall {
            arguments,
            resolved: Some(target),
            ..
        } => classify_delegate(target, arguments, index, facts, catalog),
        _ => SiteContribution::NonNull,
    }
}

fn strip_casts(expression: &Expression) -> &Expression {
    let mut current = expression.unparenthesized();
    while let Expression::Cast { expression, .. } = current {
        current = expression.unparenthesized();
    }
    current
}

fn has_null_branch(expression: &Expression) -> bool {
    match strip_casts(expression) {
        Expression::Null => true,
        Expression::Conditional {
            then, otherwise, ..
        } => has_null_branch(then) || has_null_branch(otherwise),
        _ => false,
    }
}

fn classify_delegate(
    target: &MethodRef,
    arguments: &[Expression],
    index: &ProgramIndex<'_>,
    facts: &FactTable,
    catalog: &LibraryCatalog,
) -> SiteContribution {
    let signature = MethodSignature::from(target);
    if let Some(verdict) = facts.concrete_return(&signature) {
        return match verdict {
            NullabilityVerdict::Nullable => SiteContribution::Nullable,
            _ => SiteContribution::NonNull,
        };
    }
    match index.get(&signature) {
        Some(entry) if entry.has_body() && entry.return_kind == ReturnKind::Reference => {
            SiteContribution::Pending(signature)
        }
        // Abstract, native or boxed primitive: nothing to derive from.
        Some(_) => SiteContribution::NonNull,
        None => {
            if catalog.is_known_nullable(&target.owner, &target.name, &target.descriptor) {
                return SiteContribution::Nullable;
            }
            let fallback = catalog
                .fallback_argument(&target.owner, &target.name)
                .and_then(|position| arguments.get(position));
            if fallback.is_some_and(Expression::is_null_literal) {
                return SiteContribution::Nullable;
            }
            SiteContribution::NonNull
        }
    }
}

/// Combine site contributions into the method's verdict for this pass.
pub(crate) fn combine(contributions: impl IntoIterator<Item = SiteContribution>) -> NullabilityVerdict {
    let mut pending = BTreeSet::new();
    for contribution in contributions {
        match contribution {
            SiteContribution::Nullable => return NullabilityVerdict::Nullable,
            SiteContribution::Pending(callee) => {
                pending.insert(callee);
            }
            SiteContribution::NonNull => {}
        }
    }
    if pending.is_empty() {
        NullabilityVerdict::NonNull
    } else {
        NullabilityVerdict::PendingCallees(pending)
    }
}

/// Return-nullability of one method body against the current facts.
pub(crate) fn detect_return_nullability(
    method: &MethodDecl,
    index: &ProgramIndex<'_>,
    facts: &FactTable,
    catalog: &LibraryCatalog,
) -> NullabilityVerdict {
    let Some(body) = &method.body else {
        return NullabilityVerdict::NonNull;
    };
    combine(
        return_sites(body)
            .into_iter()
            .map(|site| classify_site(site, index, facts, catalog)),
    )
}
