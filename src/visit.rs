//! Read-only traversal over the program model.
//!
//! Every `visit_*` method defaults to the matching `walk_*` function, so an
//! implementation overrides only the nodes it cares about and calls the
//! walker to keep descending (or skips it to prune the subtree).

use crate::ir::{CatchClause, Expression, MethodDecl, Statement, SwitchCase, TypeDecl};

pub(crate) trait Visitor<'a> {
    fn visit_type(&mut self, declaration: &'a TypeDecl) {
        walk_type(self, declaration);
    }

    fn visit_method(&mut self, owner: &'a TypeDecl, method: &'a MethodDecl) {
        walk_method(self, owner, method);
    }

    fn visit_statement(&mut self, statement: &'a Statement) {
        walk_statement(self, statement);
    }

    fn visit_expression(&mut self, expression: &'a Expression) {
        walk_expression(self, expression);
    }

    fn visit_lambda(
        &mut self,
        parameters: &'a [String],
        expression: Option<&'a Expression>,
        block: &'a [Statement],
    ) {
        walk_lambda(self, parameters, expression, block);
    }
}

pub(crate) fn walk_type<'a, V>(visitor: &mut V, declaration: &'a TypeDecl)
where
    V: Visitor<'a> + ?Sized,
{
    for method in &declaration.methods {
        visitor.visit_method(declaration, method);
    }
    for nested in &declaration.nested_types {
        visitor.visit_type(nested);
    }
}

pub(crate) fn walk_method<'a, V>(visitor: &mut V, _owner: &'a TypeDecl, method: &'a MethodDecl)
where
    V: Visitor<'a> + ?Sized,
{
    if let Some(body) = &method.body {
        walk_statements(visitor, body);
    }
}

pub(crate) fn walk_statements<'a, V>(visitor: &mut V, statements: &'a [Statement])
where
    V: Visitor<'a> + ?Sized,
{
    for statement in statements {
        visitor.visit_statement(statement);
    }
}

fn walk_cases<'a, V>(visitor: &mut V, cases: &'a [SwitchCase])
where
    V: Visitor<'a> + ?Sized,
{
    for case in cases {
        for label in &case.labels {
            visitor.visit_expression(label);
        }
        walk_statements(visitor, &case.body);
    }
}

fn walk_catches<'a, V>(visitor: &mut V, catches: &'a [CatchClause])
where
    V: Visitor<'a> + ?Sized,
{
    for catch in catches {
        walk_statements(visitor, &catch.body);
    }
}

pub(crate) fn walk_statement<'a, V>(visitor: &mut V, statement: &'a Statement)
where
    V: Visitor<'a> + ?Sized,
{
    match statement {
        Statement::Return { value } => {
            if let Some(value) = value {
                visitor.visit_expression(value);
            }
        }
        Statement::Expression { expression }
        | Statement::Throw {
            exception: expression,
        }
        | Statement::Yield { value: expression } => visitor.visit_expression(expression),
        Statement::LocalVariable { initializer, .. } => {
            if let Some(initializer) = initializer {
                visitor.visit_expression(initializer);
            }
        }
        Statement::If {
            condition,
            then,
            otherwise,
        } => {
            visitor.visit_expression(condition);
            walk_statements(visitor, then);
            walk_statements(visitor, otherwise);
        }
        Statement::While { condition, body } | Statement::DoWhile { condition, body } => {
            visitor.visit_expression(condition);
            walk_statements(visitor, body);
        }
        Statement::For {
            init,
            condition,
            update,
            body,
        } => {
            walk_statements(visitor, init);
            if let Some(condition) = condition {
                visitor.visit_expression(condition);
            }
            for expression in update {
                visitor.visit_expression(expression);
            }
            walk_statements(visitor, body);
        }
        Statement::ForEach { iterable, body, .. } => {
            visitor.visit_expression(iterable);
            walk_statements(visitor, body);
        }
        Statement::Block { statements } => walk_statements(visitor, statements),
        Statement::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            walk_statements(visitor, resources);
            walk_statements(visitor, body);
            walk_catches(visitor, catches);
            walk_statements(visitor, finally);
        }
        Statement::Switch { selector, cases } => {
            visitor.visit_expression(selector);
            walk_cases(visitor, cases);
        }
        Statement::Synchronized { lock, body } => {
            visitor.visit_expression(lock);
            walk_statements(visitor, body);
        }
        Statement::Labeled { body, .. } => walk_statements(visitor, body),
        Statement::Assert { condition, message } => {
            visitor.visit_expression(condition);
            if let Some(message) = message {
                visitor.visit_expression(message);
            }
        }
        Statement::LocalClass { declaration } => visitor.visit_type(declaration),
        Statement::Other => {}
    }
}

pub(crate) fn walk_expression<'a, V>(visitor: &mut V, expression: &'a Expression)
where
    V: Visitor<'a> + ?Sized,
{
    match expression {
        Expression::Null
        | Expression::Boolean { .. }
        | Expression::Literal { .. }
        | Expression::Name { .. }
        | Expression::This
        | Expression::Other => {}
        Expression::FieldAccess { target, .. } => visitor.visit_expression(target),
        Expression::MethodCall {
            target, arguments, ..
        } => {
            if let Some(target) = target {
                visitor.visit_expression(target);
            }
            for argument in arguments {
                visitor.visit_expression(argument);
            }
        }
        Expression::New {
            arguments, body, ..
        } => {
            for argument in arguments {
                visitor.visit_expression(argument);
            }
            if let Some(body) = body {
                visitor.visit_type(body);
            }
        }
        Expression::Lambda {
            parameters,
            expression,
            block,
        } => visitor.visit_lambda(parameters, expression.as_deref(), block),
        Expression::Conditional {
            condition,
            then,
            otherwise,
        } => {
            visitor.visit_expression(condition);
            visitor.visit_expression(then);
            visitor.visit_expression(otherwise);
        }
        Expression::Binary { left, right, .. } => {
            visitor.visit_expression(left);
            visitor.visit_expression(right);
        }
        Expression::Unary { operand, .. } => visitor.visit_expression(operand),
        Expression::Parenthesized { expression }
        | Expression::Cast { expression, .. }
        | Expression::InstanceOf { expression, .. } => visitor.visit_expression(expression),
        Expression::Assignment { target, value } => {
            visitor.visit_expression(target);
            visitor.visit_expression(value);
        }
        Expression::ArrayAccess { array, index } => {
            visitor.visit_expression(array);
            visitor.visit_expression(index);
        }
        Expression::Switch { selector, cases } => {
            visitor.visit_expression(selector);
            walk_cases(visitor, cases);
        }
    }
}

pub(crate) fn walk_lambda<'a, V>(
    visitor: &mut V,
    _parameters: &'a [String],
    expression: Option<&'a Expression>,
    block: &'a [Statement],
) where
    V: Visitor<'a> + ?Sized,
{
    if let Some(expression) = expression {
        visitor.visit_expression(expression);
    }
    walk_statements(visitor, block);
}
