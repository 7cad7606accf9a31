use std::borrow::Cow;
use std::collections::BTreeMap;

// Generated by build.rs from the directories under src/catalog/.
include!(concat!(env!("OUT_DIR"), "/catalog_modules.rs"));

/// Whether a predicate answers `true` for an absent or a present argument.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum PredicatePolarity {
    TrueWhenNull,
    TrueWhenNotNull,
}

/// Library method that tests its argument for absence.
#[derive(Clone, Debug)]
pub(crate) struct NullPredicate {
    owner: Cow<'static, str>,
    name: Cow<'static, str>,
    polarity: PredicatePolarity,
}

impl NullPredicate {
    pub(crate) const fn new(
        owner: &'static str,
        name: &'static str,
        polarity: PredicatePolarity,
    ) -> Self {
        Self {
            owner: Cow::Borrowed(owner),
            name: Cow::Borrowed(name),
            polarity,
        }
    }

    pub(crate) fn owned(owner: String, name: String, polarity: PredicatePolarity) -> Self {
        Self {
            owner: Cow::Owned(owner),
            name: Cow::Owned(name),
            polarity,
        }
    }

    pub(crate) fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn polarity(&self) -> PredicatePolarity {
        self.polarity
    }
}

/// Library method whose return value is documented to be absent at times.
#[derive(Clone, Debug)]
pub(crate) struct KnownNullableReturn {
    owner: Cow<'static, str>,
    name: Cow<'static, str>,
    /// Restricts the entry to one overload when set.
    descriptor: Option<&'static str>,
}

impl KnownNullableReturn {
    pub(crate) const fn new(owner: &'static str, name: &'static str) -> Self {
        Self {
            owner: Cow::Borrowed(owner),
            name: Cow::Borrowed(name),
            descriptor: None,
        }
    }

    pub(crate) const fn overload(
        owner: &'static str,
        name: &'static str,
        descriptor: &'static str,
    ) -> Self {
        Self {
            owner: Cow::Borrowed(owner),
            name: Cow::Borrowed(name),
            descriptor: Some(descriptor),
        }
    }

    pub(crate) fn owned(owner: String, name: String) -> Self {
        Self {
            owner: Cow::Owned(owner),
            name: Cow::Owned(name),
            descriptor: None,
        }
    }
}

/// Library method that hands back one of its arguments as a fallback, so a
/// null literal in that position makes the result nullable.
#[derive(Clone, Debug)]
pub(crate) struct NullFallback {
    owner: &'static str,
    name: &'static str,
    argument: usize,
}

impl NullFallback {
    pub(crate) const fn new(owner: &'static str, name: &'static str, argument: usize) -> Self {
        Self {
            owner,
            name,
            argument,
        }
    }
}

/// Group of catalog entries describing one library.
pub(crate) struct CatalogFamily {
    pub(crate) name: &'static str,
    pub(crate) null_predicates: &'static [NullPredicate],
    pub(crate) known_nullable: &'static [KnownNullableReturn],
    pub(crate) null_fallbacks: &'static [NullFallback],
}

inventory::collect!(CatalogFamily);

/// Macro to register a catalog family.
///
/// Usage: `register_family!(CatalogFamily { .. });`
#[macro_export]
macro_rules! register_family {
    ($family:expr) => {
        inventory::submit! {
            $family
        }
    };
}

/// Returns all registered families in name order.
pub(crate) fn all_families() -> Vec<&'static CatalogFamily> {
    let mut families: Vec<_> = inventory::iter::<CatalogFamily>.into_iter().collect();
    families.sort_by(|left, right| left.name.cmp(right.name));
    families
}

/// Lookup tables merged from every registered family and configuration.
#[derive(Clone, Debug, Default)]
pub(crate) struct LibraryCatalog {
    predicates: BTreeMap<(String, String), PredicatePolarity>,
    known_nullable: BTreeMap<(String, String), Vec<Option<String>>>,
    fallbacks: BTreeMap<(String, String), usize>,
}

impl LibraryCatalog {
    pub(crate) fn with_registered() -> Self {
        let mut catalog = Self::default();
        for family in all_families() {
            for predicate in family.null_predicates {
                catalog.add_predicate(predicate);
            }
            for entry in family.known_nullable {
                catalog.add_known_nullable(entry);
            }
            for fallback in family.null_fallbacks {
                catalog.fallbacks.insert(
                    (fallback.owner.to_string(), fallback.name.to_string()),
                    fallback.argument,
                );
            }
        }
        catalog
    }

    pub(crate) fn add_predicate(&mut self, predicate: &NullPredicate) {
        self.predicates.insert(
            (predicate.owner().to_string(), predicate.name().to_string()),
            predicate.polarity(),
        );
    }

    pub(crate) fn add_known_nullable(&mut self, entry: &KnownNullableReturn) {
        self.known_nullable
            .entry((entry.owner.to_string(), entry.name.to_string()))
            .or_default()
            .push(entry.descriptor.map(str::to_string));
    }

    pub(crate) fn predicate(&self, owner: &str, name: &str) -> Option<PredicatePolarity> {
        self.predicates
            .get(&(owner.to_string(), name.to_string()))
            .copied()
    }

    pub(crate) fn is_known_nullable(&self, owner: &str, name: &str, descriptor: &str) -> bool {
        let Some(overloads) = self
            .known_nullable
            .get(&(owner.to_string(), name.to_string()))
        else {
            return false;
        };
        overloads.iter().any(|overload| match overload {
            Some(expected) => expected == descriptor,
            None => true,
        })
    }

    /// Index of the argument returned as a fallback, if any.
    pub(crate) fn fallback_argument(&self, owner: &str, name: &str) -> Option<usize> {
        self.fallbacks
            .get(&(owner.to_string(), name.to_string()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_families_have_unique_names() {
        let families = all_families();
        assert!(!families.is_empty(), "At least one family must be registered");

        let mut names: Vec<_> = families.iter().map(|family| family.name).collect();
        let total = names.len();
        names.dedup();
        assert_eq!(names.len(), total, "Family names must be unique");
    }

    #[test]
    fn registered_catalog_knows_objects_predicates() {
        let catalog = LibraryCatalog::with_registered();
        assert_eq!(
            catalog.predicate("java/util/Objects", "isNull"),
            Some(PredicatePolarity::TrueWhenNull)
        );
        assert_eq!(
            catalog.predicate("java/util/Objects", "nonNull"),
            Some(PredicatePolarity::TrueWhenNotNull)
        );
        assert_eq!(catalog.predicate("java/util/Objects", "equals"), None);
    }

    #[test]
    fn known_nullable_respects_overload_restriction() {
        let catalog = LibraryCatalog::with_registered();
        assert!(catalog.is_known_nullable(
            "java/lang/System",
            "getProperty",
            "(Ljava/lang/String;)Ljava/lang/String;"
        ));
        assert!(!catalog.is_known_nullable(
            "java/lang/System",
            "getProperty",
            "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;"
        ));
        assert!(catalog.is_known_nullable(
            "java/util/Map",
            "get",
            "(Ljava/lang/Object;)Ljava/lang/Object;"
        ));
    }

    #[test]
    fn configured_entries_extend_the_catalog() {
        let mut catalog = LibraryCatalog::with_registered();
        catalog.add_predicate(&NullPredicate::owned(
            "com/acme/Checks".to_string(),
            "missing".to_string(),
            PredicatePolarity::TrueWhenNull,
        ));
        catalog.add_known_nullable(&KnownNullableReturn::owned(
            "com/acme/Cache".to_string(),
            "lookup".to_string(),
        ));
        assert!(catalog.predicate("com/acme/Checks", "missing").is_some());
        assert!(catalog.is_known_nullable("com/acme/Cache", "lookup", "()Ljava/lang/Object;"));
    }
}
