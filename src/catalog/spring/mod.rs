use crate::catalog::{CatalogFamily, KnownNullableReturn, NullFallback, NullPredicate};
use crate::catalog::PredicatePolarity::{TrueWhenNotNull, TrueWhenNull};

const NULL_PREDICATES: &[NullPredicate] = &[
    NullPredicate::new("org/springframework/util/StringUtils", "hasText", TrueWhenNotNull),
    NullPredicate::new("org/springframework/util/StringUtils", "hasLength", TrueWhenNotNull),
    NullPredicate::new("org/springframework/util/StringUtils", "isEmpty", TrueWhenNull),
    NullPredicate::new("org/springframework/util/ObjectUtils", "isEmpty", TrueWhenNull),
    NullPredicate::new("org/springframework/util/CollectionUtils", "isEmpty", TrueWhenNull),
];

const KNOWN_NULLABLE: &[KnownNullableReturn] = &[];

const NULL_FALLBACKS: &[NullFallback] = &[];

crate::register_family!(CatalogFamily {
    name: "spring",
    null_predicates: NULL_PREDICATES,
    known_nullable: KNOWN_NULLABLE,
    null_fallbacks: NULL_FALLBACKS,
});
