use anyhow::{Context, Result};

use crate::catalog::{KnownNullableReturn, NullPredicate, PredicatePolarity};

/// Default type-use qualifier written to inferred declarations.
pub(crate) const DEFAULT_QUALIFIER: &str = "org.jspecify.annotations.Nullable";

/// Fully-qualified identity of the nullable qualifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Qualifier {
    package: Option<String>,
    simple_name: String,
}

impl Qualifier {
    pub(crate) fn parse(name: &str) -> Result<Self> {
        let name = name.trim().trim_start_matches('@');
        if name.is_empty() {
            anyhow::bail!("qualifier name must not be empty");
        }
        let valid = name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(first) if first.is_alphabetic() || first == '_' || first == '$')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        });
        if !valid {
            anyhow::bail!("invalid qualifier name: {name}");
        }
        let (package, simple_name) = match name.rsplit_once('.') {
            Some((package, simple)) => (Some(package.to_string()), simple.to_string()),
            None => (None, name.to_string()),
        };
        Ok(Self {
            package,
            simple_name,
        })
    }

    pub(crate) fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub(crate) fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub(crate) fn qualified_name(&self) -> String {
        match &self.package {
            Some(package) => format!("{package}.{}", self.simple_name),
            None => self.simple_name.clone(),
        }
    }
}

impl Default for Qualifier {
    fn default() -> Self {
        Self {
            package: Some("org.jspecify.annotations".to_string()),
            simple_name: "Nullable".to_string(),
        }
    }
}

/// Settings that shape inference and emission.
#[derive(Clone, Debug)]
pub(crate) struct EngineConfig {
    pub(crate) qualifier: Qualifier,
    pub(crate) include_non_public_parameters: bool,
    pub(crate) extra_null_predicates: Vec<NullPredicate>,
    pub(crate) extra_known_nullable: Vec<KnownNullableReturn>,
    /// Upper bound on fixpoint rounds; `None` runs until convergence.
    pub(crate) max_rounds: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            qualifier: Qualifier::default(),
            include_non_public_parameters: false,
            extra_null_predicates: Vec::new(),
            extra_known_nullable: Vec::new(),
            max_rounds: None,
        }
    }
}

/// Parse `owner#name` where owner is a dotted or internal class name.
fn parse_method_key(value: &str) -> Result<(String, String)> {
    let (owner, name) = value
        .split_once('#')
        .with_context(|| format!("expected OWNER#NAME, got {value}"))?;
    if owner.is_empty() || name.is_empty() {
        anyhow::bail!("expected OWNER#NAME, got {value}");
    }
    Ok((owner.replace('.', "/"), name.to_string()))
}

/// Parse a `--null-predicate` value: `owner#name`, optionally suffixed with
/// `:not-null` for predicates that hold when the argument is present.
pub(crate) fn parse_null_predicate(value: &str) -> Result<NullPredicate> {
    let (key, polarity) = match value.rsplit_once(':') {
        Some((key, "not-null")) => (key, PredicatePolarity::TrueWhenNotNull),
        Some((key, "null")) => (key, PredicatePolarity::TrueWhenNull),
        Some((_, other)) => anyhow::bail!("unknown predicate polarity: {other}"),
        None => (value, PredicatePolarity::TrueWhenNull),
    };
    let (owner, name) = parse_method_key(key)?;
    Ok(NullPredicate::owned(owner, name, polarity))
}

/// Parse a `--known-nullable` value.
pub(crate) fn parse_known_nullable(value: &str) -> Result<KnownNullableReturn> {
    let (owner, name) = parse_method_key(value)?;
    Ok(KnownNullableReturn::owned(owner, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_qualifier_is_jspecify() {
        let qualifier = Qualifier::default();
        assert_eq!(qualifier.package(), Some("org.jspecify.annotations"));
        assert_eq!(qualifier.simple_name(), "Nullable");
        assert_eq!(qualifier.qualified_name(), DEFAULT_QUALIFIER);
    }

    #[test]
    fn user_qualifier_is_taken_verbatim() {
        let qualifier = Qualifier::parse("@javax.annotation.CheckForNull").expect("qualifier");
        assert_eq!(qualifier.qualified_name(), "javax.annotation.CheckForNull");
        assert_eq!(qualifier.simple_name(), "CheckForNull");
    }

    #[test]
    fn malformed_qualifier_is_rejected() {
        assert!(Qualifier::parse("").is_err());
        assert!(Qualifier::parse("org..Nullable").is_err());
        assert!(Qualifier::parse("org.1bad.Nullable").is_err());
    }

    #[test]
    fn null_predicate_accepts_polarity_suffix() {
        let predicate = parse_null_predicate("com.acme.Checks#present:not-null").expect("parse");
        assert_eq!(predicate.owner(), "com/acme/Checks");
        assert_eq!(predicate.name(), "present");
        assert_eq!(predicate.polarity(), PredicatePolarity::TrueWhenNotNull);

        let predicate = parse_null_predicate("com.acme.Checks#absent").expect("parse");
        assert_eq!(predicate.polarity(), PredicatePolarity::TrueWhenNull);

        assert!(parse_null_predicate("com.acme.Checks").is_err());
        assert!(parse_null_predicate("com.acme.Checks#x:maybe").is_err());
    }
}
