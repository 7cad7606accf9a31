use crate::catalog::{LibraryCatalog, PredicatePolarity};
use crate::facts::NullabilityVerdict;
use crate::ir::{Expression, MethodDecl, Statement, TypeDecl};
use crate::program::MethodEntry;
use crate::visit::{Visitor, walk_expression, walk_lambda, walk_statement, walk_statements};

/// Which outcome of a guard is the "absent" branch.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum GuardPolarity {
    /// The guard holds when the parameter is null (`p == null`).
    IfNull,
    /// The guard holds when the parameter is present (`p != null`).
    IfNotNull,
}

impl GuardPolarity {
    fn negated(self) -> Self {
        match self {
            GuardPolarity::IfNull => GuardPolarity::IfNotNull,
            GuardPolarity::IfNotNull => GuardPolarity::IfNull,
        }
    }

    fn apply(self, negated: bool) -> Self {
        if negated { self.negated() } else { self }
    }
}

/// Syntactic form of a guard.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum GuardShape {
    /// `p == null`, `null != p`, ...
    Comparison,
    /// Call to a recognized null-predicate helper.
    Predicate,
    /// Either of the above nested inside `&&` or `||`.
    Compound,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct NullGuard {
    pub(crate) polarity: GuardPolarity,
    pub(crate) shape: GuardShape,
}

/// A parameter together with every null guard found for it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ParameterUsage {
    pub(crate) position: usize,
    pub(crate) name: String,
    pub(crate) guards: Vec<NullGuard>,
}

impl ParameterUsage {
    pub(crate) fn is_nullable(&self) -> bool {
        !self.guards.is_empty()
    }
}

/// Collect the null guards the method body applies to one of its parameters.
pub(crate) fn parameter_usage(
    method: &MethodDecl,
    position: usize,
    catalog: &LibraryCatalog,
) -> Option<ParameterUsage> {
    let parameter = method.parameters.get(position)?;
    let mut finder = GuardFinder {
        name: &parameter.name,
        catalog,
        guards: Vec::new(),
    };
    if let Some(body) = &method.body {
        walk_statements(&mut finder, body);
    }
    Some(ParameterUsage {
        position,
        name: parameter.name.clone(),
        guards: finder.guards,
    })
}

/// Nullability of one parameter, judged from how the body tests it.
/// Primitive parameters are never nullable.
pub(crate) fn detect_parameter_nullability(
    entry: &MethodEntry<'_>,
    position: usize,
    catalog: &LibraryCatalog,
) -> NullabilityVerdict {
    if !entry
        .reference_parameters
        .get(position)
        .copied()
        .unwrap_or(false)
    {
        return NullabilityVerdict::NonNull;
    }
    match parameter_usage(entry.method, position, catalog) {
        Some(usage) if usage.is_nullable() => NullabilityVerdict::Nullable,
        _ => NullabilityVerdict::NonNull,
    }
}

struct GuardFinder<'n> {
    name: &'n str,
    catalog: &'n LibraryCatalog,
    guards: Vec<NullGuard>,
}

impl GuardFinder<'_> {
    /// Walk a boolean expression tree, recording guards at its leaves.
    fn condition<'a>(&mut self, expression: &'a Expression, negated: bool, compound: bool) {
        match expression {
            Expression::Parenthesized { expression } => {
                self.condition(expression, negated, compound);
            }
            Expression::Unary { operator, operand } if operator == "!" => {
                self.condition(operand, !negated, compound);
            }
            Expression::Binary {
                operator,
                left,
                right,
            } if operator == "&&" || operator == "||" => {
                self.condition(left, negated, true);
                self.condition(right, negated, true);
            }
            _ => match self.leaf_guard(expression) {
                Some((polarity, shape)) => self.guards.push(NullGuard {
                    polarity: polarity.apply(negated),
                    shape: if compound { GuardShape::Compound } else { shape },
                }),
                None => walk_expression(self, expression),
            },
        }
    }

    fn leaf_guard(&self, expression: &Expression) -> Option<(GuardPolarity, GuardShape)> {
        let Expression::Binary {
            operator,
            left,
            right,
        } = expression
        else {
            return self
                .predicate_call(expression)
                .map(|polarity| (polarity, GuardShape::Predicate));
        };
        let equals = match operator.as_str() {
            "==" => true,
            "!=" => false,
            _ => return None,
        };
        let (left, right) = (left.unparenthesized(), right.unparenthesized());
        let null_compared = (left.is_null_literal() && self.is_parameter(right))
            || (right.is_null_literal() && self.is_parameter(left));
        if null_compared {
            let polarity = if equals {
                GuardPolarity::IfNull
            } else {
                GuardPolarity::IfNotNull
            };
            return Some((polarity, GuardShape::Comparison));
        }
        // `predicate(p) == true`, `false != predicate(p)`, ...
        let (call, literal) = match (left, right) {
            (Expression::Boolean { value }, other) | (other, Expression::Boolean { value }) => {
                (other, *value)
            }
            _ => return None,
        };
        let polarity = self.predicate_call(call)?;
        // `== true` and `!= false` keep the predicate's meaning.
        let keeps = equals == literal;
        Some((polarity.apply(!keeps), GuardShape::Predicate))
    }

    fn predicate_call(&self, expression: &Expression) -> Option<GuardPolarity> {
        let Expression::MethodCall {
            arguments,
            resolved: Some(target),
            ..
        } = expression.unparenthesized()
        else {
            return None;
        };
        let polarity = self.catalog.predicate(&target.owner, &target.name)?;
        let argument = arguments.first()?;
        if !self.is_parameter(argument.unparenthesized()) {
            return None;
        }
        Some(match polarity {
            PredicatePolarity::TrueWhenNull => GuardPolarity::IfNull,
            PredicatePolarity::TrueWhenNotNull => GuardPolarity::IfNotNull,
        })
    }

    fn is_parameter(&self, expression: &Expression) -> bool {
        matches!(expression, Expression::Name { name } if name == self.name)
    }
}

impl<'a> Visitor<'a> for GuardFinder<'_> {
    fn visit_expression(&mut self, expression: &'a Expression) {
        match expression {
            Expression::Binary { .. } | Expression::Unary { .. } | Expression::MethodCall { .. } => {
                self.condition(expression, false, false);
            }
            _ => walk_expression(self, expression),
        }
    }

    fn visit_lambda(
        &mut self,
        parameters: &'a [String],
        expression: Option<&'a Expression>,
        block: &'a [Statement],
    ) {
        if parameters.iter().any(|parameter| parameter == self.name)
            || declares_local(block, self.name)
        {
            return;
        }
        walk_lambda(self, parameters, expression, block);
    }

    fn visit_type(&mut self, declaration: &'a TypeDecl) {
        // A same-named field shadows the parameter for the whole class body.
        if declaration.declares_field(self.name) {
            return;
        }
        for method in &declaration.methods {
            let shadowed = method
                .parameters
                .iter()
                .any(|parameter| parameter.name == self.name)
                || method
                    .body
                    .as_deref()
                    .is_some_and(|body| declares_local(body, self.name));
            if !shadowed {
                self.visit_method(declaration, method);
            }
        }
        for nested in &declaration.nested_types {
            self.visit_type(nested);
        }
    }
}

/// Whether a statement list declares a variable with the given name,
/// without looking into nested class bodies.
fn declares_local(statements: &[Statement], name: &str) -> bool {
    let mut finder = LocalFinder { name, found: false };
    walk_statements(&mut finder, statements);
    finder.found
}

struct LocalFinder<'n> {
    name: &'n str,
    found: bool,
}

impl<'a> Visitor<'a> for LocalFinder<'_> {
    fn visit_statement(&mut self, statement: &'a Statement) {
        match statement {
            Statement::LocalVariable { name, .. } | Statement::ForEach { variable: name, .. }
                if name == self.name =>
            {
                self.found = true;
            }
            Statement::Try { catches, .. }
                if catches.iter().any(|catch| catch.parameter == self.name) =>
            {
                self.found = true;
            }
            _ => walk_statement(self, statement),
        }
    }

    fn visit_lambda(
        &mut self,
        parameters: &'a [String],
        expression: Option<&'a Expression>,
        block: &'a [Statement],
    ) {
        if parameters.iter().any(|parameter| parameter == self.name) {
            self.found = true;
            return;
        }
        walk_lambda(self, parameters, expression, block);
    }

    fn visit_type(&mut self, _declaration: &'a TypeDecl) {}
}
