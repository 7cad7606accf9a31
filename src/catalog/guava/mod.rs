use crate::catalog::{
    CatalogFamily, KnownNullableReturn, NullFallback, NullPredicate, PredicatePolarity,
};

const NULL_PREDICATES: &[NullPredicate] = &[NullPredicate::new(
    "com/google/common/base/Strings",
    "isNullOrEmpty",
    PredicatePolarity::TrueWhenNull,
)];

const KNOWN_NULLABLE: &[KnownNullableReturn] = &[
    KnownNullableReturn::new("com/google/common/base/Strings", "emptyToNull"),
    KnownNullableReturn::new("com/google/common/base/Optional", "orNull"),
];

const NULL_FALLBACKS: &[NullFallback] = &[
    NullFallback::new("com/google/common/collect/Iterables", "getFirst", 1),
    NullFallback::new("com/google/common/collect/Iterables", "getLast", 1),
    NullFallback::new("com/google/common/collect/Iterables", "getOnlyElement", 1),
];

crate::register_family!(CatalogFamily {
    name: "guava",
    null_predicates: NULL_PREDICATES,
    known_nullable: KNOWN_NULLABLE,
    null_fallbacks: NULL_FALLBACKS,
});
