//! Builders for program-model fixtures used by unit tests.

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineOutput};
use crate::ir::{
    Annotation, CompilationUnit, Expression, MethodDecl, MethodRef, Parameter, Statement,
    TypeDecl, TypeKind, TypeRef,
};

/// Analysis-target unit whose package follows the first declared type.
pub(crate) fn unit(path: &str, types: Vec<TypeDecl>) -> CompilationUnit {
    let package = types
        .first()
        .and_then(|declaration| declaration.name.rsplit_once('/'))
        .map(|(package, _)| package.replace('/', "."));
    CompilationUnit {
        path: path.to_string(),
        package,
        imports: Vec::new(),
        import_offset: None,
        types,
        artifact_index: 0,
        is_analysis_target: true,
    }
}

fn declaration(name: &str, kind: TypeKind, methods: Vec<MethodDecl>) -> TypeDecl {
    TypeDecl {
        name: name.to_string(),
        kind,
        super_class: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods,
        nested_types: Vec::new(),
    }
}

pub(crate) fn class(name: &str, methods: Vec<MethodDecl>) -> TypeDecl {
    declaration(name, TypeKind::Class, methods)
}

pub(crate) fn interface(name: &str, methods: Vec<MethodDecl>) -> TypeDecl {
    declaration(name, TypeKind::Interface, methods)
}

/// `new Object() { ... }` with the given anonymous class body.
pub(crate) fn anonymous(name: &str, methods: Vec<MethodDecl>) -> Expression {
    Expression::New {
        _ty: "Object".to_string(),
        arguments: Vec::new(),
        body: Some(Box::new(declaration(name, TypeKind::Anonymous, methods))),
    }
}

pub(crate) fn method(name: &str, descriptor: &str) -> MethodBuilder {
    let return_type = (name != "<init>").then(|| type_ref(&source_return_type(descriptor)));
    MethodBuilder {
        method: MethodDecl {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            modifiers: Vec::new(),
            annotations: Vec::new(),
            return_type,
            parameters: Vec::new(),
            body: None,
            line: None,
        },
    }
}

/// Source spelling of a descriptor's return type, e.g. `String` or `int[]`.
fn source_return_type(descriptor: &str) -> String {
    let returned = descriptor
        .rsplit_once(')')
        .map_or(descriptor, |(_, returned)| returned);
    let dimensions = returned.chars().take_while(|c| *c == '[').count();
    let element = &returned[dimensions..];
    let base = match element {
        "V" => "void".to_string(),
        "Z" => "boolean".to_string(),
        "B" => "byte".to_string(),
        "C" => "char".to_string(),
        "S" => "short".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "F" => "float".to_string(),
        "D" => "double".to_string(),
        _ => element
            .trim_start_matches('L')
            .trim_end_matches(';')
            .rsplit(['/', '$'])
            .next()
            .unwrap_or(element)
            .to_string(),
    };
    format!("{base}{}", "[]".repeat(dimensions))
}

fn type_ref(text: &str) -> TypeRef {
    TypeRef {
        text: text.to_string(),
        offset: None,
        annotations: Vec::new(),
    }
}

pub(crate) struct MethodBuilder {
    method: MethodDecl,
}

impl MethodBuilder {
    pub(crate) fn modifier(mut self, modifier: &str) -> Self {
        self.method.modifiers.push(modifier.to_string());
        self
    }

    pub(crate) fn public(self) -> Self {
        self.modifier("public")
    }

    pub(crate) fn private(self) -> Self {
        self.modifier("private")
    }

    pub(crate) fn annotated(mut self, name: &str) -> Self {
        self.method.annotations.push(Annotation {
            name: name.to_string(),
        });
        self
    }

    pub(crate) fn param(self, name: &str, ty: &str) -> Self {
        self.param_with(name, type_ref(ty))
    }

    /// Parameter whose type is written at `offset` in the source file.
    pub(crate) fn param_at(self, name: &str, ty: &str, offset: usize) -> Self {
        let mut ty = type_ref(ty);
        ty.offset = Some(offset);
        self.param_with(name, ty)
    }

    fn param_with(mut self, name: &str, ty: TypeRef) -> Self {
        self.method.parameters.push(Parameter {
            name: name.to_string(),
            ty,
            annotations: Vec::new(),
        });
        self
    }

    /// Annotate the most recently added parameter.
    pub(crate) fn param_annotated(mut self, annotation: &str) -> Self {
        if let Some(parameter) = self.method.parameters.last_mut() {
            parameter.annotations.push(Annotation {
                name: annotation.to_string(),
            });
        }
        self
    }

    /// Return type written at `offset` in the source file.
    pub(crate) fn returns_at(mut self, text: &str, offset: usize) -> Self {
        let mut ty = type_ref(text);
        ty.offset = Some(offset);
        self.method.return_type = Some(ty);
        self
    }

    pub(crate) fn body(mut self, statements: Vec<Statement>) -> Self {
        self.method.body = Some(statements);
        self
    }

    pub(crate) fn build(self) -> MethodDecl {
        self.method
    }
}

pub(crate) fn ret(value: Expression) -> Statement {
    Statement::Return { value: Some(value) }
}

pub(crate) fn stmt(expression: Expression) -> Statement {
    Statement::Expression { expression }
}

pub(crate) fn local(name: &str, initializer: Option<Expression>) -> Statement {
    Statement::LocalVariable {
        name: name.to_string(),
        initializer,
    }
}

pub(crate) fn if_then(condition: Expression, then: Vec<Statement>) -> Statement {
    Statement::If {
        condition,
        then,
        otherwise: Vec::new(),
    }
}

pub(crate) fn null() -> Expression {
    Expression::Null
}

pub(crate) fn boolean(value: bool) -> Expression {
    Expression::Boolean { value }
}

pub(crate) fn literal(text: &str) -> Expression {
    Expression::Literal {
        _text: text.to_string(),
    }
}

pub(crate) fn name(name: &str) -> Expression {
    Expression::Name {
        name: name.to_string(),
    }
}

pub(crate) fn paren(expression: Expression) -> Expression {
    Expression::Parenthesized {
        expression: Box::new(expression),
    }
}

pub(crate) fn not(operand: Expression) -> Expression {
    Expression::Unary {
        operator: "!".to_string(),
        operand: Box::new(operand),
    }
}

pub(crate) fn binary(operator: &str, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        operator: operator.to_string(),
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub(crate) fn conditional(condition: Expression, then: Expression, otherwise: Expression) -> Expression {
    Expression::Conditional {
        condition: Box::new(condition),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    }
}

/// Call whose target the parser could not resolve.
pub(crate) fn call(name: &str, arguments: Vec<Expression>) -> Expression {
    Expression::MethodCall {
        target: None,
        name: name.to_string(),
        arguments,
        resolved: None,
    }
}

/// Call resolved to `owner.name(descriptor)`.
pub(crate) fn invoke(
    owner: &str,
    name: &str,
    descriptor: &str,
    arguments: Vec<Expression>,
) -> Expression {
    Expression::MethodCall {
        target: None,
        name: name.to_string(),
        arguments,
        resolved: Some(MethodRef {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }),
    }
}

pub(crate) fn lambda(parameters: &[&str], expression: Expression) -> Expression {
    Expression::Lambda {
        parameters: parameters.iter().map(ToString::to_string).collect(),
        expression: Some(Box::new(expression)),
        block: Vec::new(),
    }
}

pub(crate) fn new_object(ty: &str) -> Expression {
    Expression::New {
        _ty: ty.to_string(),
        arguments: Vec::new(),
        body: None,
    }
}

/// Run the whole engine over the given units.
pub(crate) fn analyze(units: &[CompilationUnit], config: EngineConfig) -> EngineOutput {
    Engine::new(config)
        .analyze(units, None)
        .expect("engine analysis")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_type_text_follows_descriptor() {
        assert_eq!(source_return_type("()Ljava/lang/String;"), "String");
        assert_eq!(source_return_type("()[[I"), "int[][]");
        assert_eq!(source_return_type("()Lcom/example/Outer$Inner;"), "Inner");
        assert_eq!(source_return_type("(I)V"), "void");
    }

    #[test]
    fn unit_package_follows_first_type() {
        let unit = unit("com/example/A.java", vec![class("com/example/A", Vec::new())]);
        assert_eq!(unit.package.as_deref(), Some("com.example"));
    }
}
