use crate::catalog::{CatalogFamily, KnownNullableReturn, NullFallback, NullPredicate};
use crate::catalog::PredicatePolarity::{TrueWhenNotNull, TrueWhenNull};

// Apache Commons "empty" checks treat null as empty, so they double as null tests.
const NULL_PREDICATES: &[NullPredicate] = &[
    NullPredicate::new("org/apache/commons/lang3/StringUtils", "isEmpty", TrueWhenNull),
    NullPredicate::new("org/apache/commons/lang3/StringUtils", "isBlank", TrueWhenNull),
    NullPredicate::new("org/apache/commons/lang3/StringUtils", "isNotEmpty", TrueWhenNotNull),
    NullPredicate::new("org/apache/commons/lang3/StringUtils", "isNotBlank", TrueWhenNotNull),
    NullPredicate::new("org/apache/commons/lang3/ObjectUtils", "isEmpty", TrueWhenNull),
    NullPredicate::new("org/apache/commons/lang3/ObjectUtils", "isNotEmpty", TrueWhenNotNull),
    NullPredicate::new("org/apache/commons/collections4/CollectionUtils", "isEmpty", TrueWhenNull),
    NullPredicate::new(
        "org/apache/commons/collections4/CollectionUtils",
        "isNotEmpty",
        TrueWhenNotNull,
    ),
];

const KNOWN_NULLABLE: &[KnownNullableReturn] = &[];

const NULL_FALLBACKS: &[NullFallback] = &[
    NullFallback::new("org/apache/commons/lang3/ObjectUtils", "defaultIfNull", 1),
    NullFallback::new("org/apache/commons/lang3/StringUtils", "defaultIfEmpty", 1),
];

crate::register_family!(CatalogFamily {
    name: "apache-commons",
    null_predicates: NULL_PREDICATES,
    known_nullable: KNOWN_NULLABLE,
    null_fallbacks: NULL_FALLBACKS,
});
