use serde::Deserialize;

/// Parsed compilation unit as delivered by the external source parser.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CompilationUnit {
    /// Source path of the unit, used for artifact locations and edits.
    pub(crate) path: String,
    /// Dotted package name, absent for the default package.
    #[serde(default)]
    pub(crate) package: Option<String>,
    #[serde(default)]
    pub(crate) imports: Vec<Import>,
    /// Byte offset where a new import declaration may be inserted.
    #[serde(default)]
    pub(crate) import_offset: Option<usize>,
    #[serde(default)]
    pub(crate) types: Vec<TypeDecl>,
    #[serde(skip, default = "no_artifact")]
    pub(crate) artifact_index: i64,
    #[serde(skip)]
    pub(crate) is_analysis_target: bool,
}

fn no_artifact() -> i64 {
    -1
}

/// Import declaration of a compilation unit.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Import {
    /// Dotted name, ending in `.*` for on-demand imports.
    pub(crate) name: String,
    #[serde(default, rename = "static")]
    pub(crate) is_static: bool,
}

impl Import {
    pub(crate) fn wildcard_package(&self) -> Option<&str> {
        self.name.strip_suffix(".*")
    }

    pub(crate) fn simple_name(&self) -> Option<&str> {
        if self.wildcard_package().is_some() {
            return None;
        }
        self.name.rsplit('.').next()
    }
}

/// Kind of a type declaration.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TypeKind {
    #[default]
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
    Anonymous,
    Local,
}

/// Type declaration, including nested, local and anonymous classes.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct TypeDecl {
    /// JVM internal binary name, e.g. `com/example/Outer$Inner`.
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) kind: TypeKind,
    #[serde(default)]
    pub(crate) super_class: Option<String>,
    #[serde(default)]
    pub(crate) interfaces: Vec<String>,
    #[serde(default)]
    pub(crate) fields: Vec<FieldDecl>,
    #[serde(default)]
    pub(crate) methods: Vec<MethodDecl>,
    #[serde(default)]
    pub(crate) nested_types: Vec<TypeDecl>,
}

impl TypeDecl {
    /// Simple source name of the declaration (`Inner` for `a/b/Outer$Inner`).
    pub(crate) fn simple_name(&self) -> &str {
        let tail = self.name.rsplit('/').next().unwrap_or(&self.name);
        tail.rsplit('$').next().unwrap_or(tail)
    }

    pub(crate) fn declares_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct FieldDecl {
    pub(crate) name: String,
}

/// Annotation as written in source, either simple or qualified.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Annotation {
    pub(crate) name: String,
}

impl Annotation {
    pub(crate) fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Declared type of a return value or parameter.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct TypeRef {
    /// Type exactly as written, e.g. `Map.Entry<K, V>` or `String[]`.
    pub(crate) text: String,
    /// Byte offset of `text` in the source file.
    #[serde(default)]
    pub(crate) offset: Option<usize>,
    /// Type-use annotations written inside the type.
    #[serde(default)]
    pub(crate) annotations: Vec<Annotation>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Parameter {
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) ty: TypeRef,
    #[serde(default)]
    pub(crate) annotations: Vec<Annotation>,
}

/// Method declaration with its intraprocedural body.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct MethodDecl {
    pub(crate) name: String,
    /// Erased JVM method descriptor, e.g. `(Ljava/lang/String;I)Ljava/lang/Object;`.
    pub(crate) descriptor: String,
    #[serde(default)]
    pub(crate) modifiers: Vec<String>,
    #[serde(default)]
    pub(crate) annotations: Vec<Annotation>,
    /// Absent for constructors and initializers.
    #[serde(default)]
    pub(crate) return_type: Option<TypeRef>,
    #[serde(default)]
    pub(crate) parameters: Vec<Parameter>,
    /// Absent for abstract, interface and native declarations.
    #[serde(default)]
    pub(crate) body: Option<Vec<Statement>>,
    #[serde(default)]
    pub(crate) line: Option<u32>,
}

impl MethodDecl {
    pub(crate) fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|value| value == modifier)
    }

    pub(crate) fn is_override(&self) -> bool {
        self.annotations
            .iter()
            .any(|annotation| annotation.simple_name() == "Override")
    }
}

/// Statement shapes the analysis needs to walk.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Statement {
    Return {
        #[serde(default)]
        value: Option<Expression>,
    },
    Expression {
        expression: Expression,
    },
    LocalVariable {
        name: String,
        #[serde(default)]
        initializer: Option<Expression>,
    },
    If {
        condition: Expression,
        #[serde(default)]
        then: Vec<Statement>,
        #[serde(default, rename = "else")]
        otherwise: Vec<Statement>,
    },
    While {
        condition: Expression,
        #[serde(default)]
        body: Vec<Statement>,
    },
    DoWhile {
        condition: Expression,
        #[serde(default)]
        body: Vec<Statement>,
    },
    For {
        #[serde(default)]
        init: Vec<Statement>,
        #[serde(default)]
        condition: Option<Expression>,
        #[serde(default)]
        update: Vec<Expression>,
        #[serde(default)]
        body: Vec<Statement>,
    },
    ForEach {
        variable: String,
        iterable: Expression,
        #[serde(default)]
        body: Vec<Statement>,
    },
    Block {
        #[serde(default)]
        statements: Vec<Statement>,
    },
    Try {
        #[serde(default)]
        resources: Vec<Statement>,
        #[serde(default)]
        body: Vec<Statement>,
        #[serde(default)]
        catches: Vec<CatchClause>,
        #[serde(default)]
        finally: Vec<Statement>,
    },
    Switch {
        selector: Expression,
        #[serde(default)]
        cases: Vec<SwitchCase>,
    },
    Synchronized {
        lock: Expression,
        #[serde(default)]
        body: Vec<Statement>,
    },
    Labeled {
        #[serde(rename = "label")]
        _label: String,
        #[serde(default)]
        body: Vec<Statement>,
    },
    Throw {
        exception: Expression,
    },
    Assert {
        condition: Expression,
        #[serde(default)]
        message: Option<Expression>,
    },
    Yield {
        value: Expression,
    },
    LocalClass {
        declaration: TypeDecl,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CatchClause {
    pub(crate) parameter: String,
    #[serde(default)]
    pub(crate) body: Vec<Statement>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct SwitchCase {
    #[serde(default)]
    pub(crate) labels: Vec<Expression>,
    #[serde(default)]
    pub(crate) body: Vec<Statement>,
}

/// Resolved target of a call site.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(crate) struct MethodRef {
    pub(crate) owner: String,
    pub(crate) name: String,
    pub(crate) descriptor: String,
}

/// Expression shapes the analysis needs to classify or walk.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Expression {
    Null,
    Boolean {
        value: bool,
    },
    Literal {
        #[serde(default, rename = "text")]
        _text: String,
    },
    Name {
        name: String,
    },
    This,
    FieldAccess {
        target: Box<Expression>,
        #[serde(rename = "name")]
        _name: String,
    },
    MethodCall {
        #[serde(default)]
        target: Option<Box<Expression>>,
        name: String,
        #[serde(default)]
        arguments: Vec<Expression>,
        /// Absent when the declaring type was unavailable to the parser.
        #[serde(default)]
        resolved: Option<MethodRef>,
    },
    New {
        #[serde(rename = "type")]
        _ty: String,
        #[serde(default)]
        arguments: Vec<Expression>,
        #[serde(default)]
        body: Option<Box<TypeDecl>>,
    },
    Lambda {
        #[serde(default)]
        parameters: Vec<String>,
        #[serde(default)]
        expression: Option<Box<Expression>>,
        #[serde(default)]
        block: Vec<Statement>,
    },
    Conditional {
        condition: Box<Expression>,
        then: Box<Expression>,
        #[serde(rename = "else")]
        otherwise: Box<Expression>,
    },
    Binary {
        operator: String,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        operator: String,
        operand: Box<Expression>,
    },
    Parenthesized {
        expression: Box<Expression>,
    },
    Cast {
        #[serde(rename = "type")]
        _ty: String,
        expression: Box<Expression>,
    },
    Assignment {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    InstanceOf {
        expression: Box<Expression>,
        #[serde(rename = "type")]
        _ty: String,
    },
    ArrayAccess {
        array: Box<Expression>,
        index: Box<Expression>,
    },
    Switch {
        selector: Box<Expression>,
        #[serde(default)]
        cases: Vec<SwitchCase>,
    },
    #[serde(other)]
    Other,
}

impl Expression {
    /// Strip redundant parentheses.
    pub(crate) fn unparenthesized(&self) -> &Expression {
        let mut current = self;
        while let Expression::Parenthesized { expression } = current {
            current = expression;
        }
        current
    }

    pub(crate) fn is_null_literal(&self) -> bool {
        matches!(self.unparenthesized(), Expression::Null)
    }
}
