use crate::catalog::{
    CatalogFamily, KnownNullableReturn, NullFallback, NullPredicate, PredicatePolarity,
};

const NULL_PREDICATES: &[NullPredicate] = &[
    NullPredicate::new("java/util/Objects", "isNull", PredicatePolarity::TrueWhenNull),
    NullPredicate::new("java/util/Objects", "nonNull", PredicatePolarity::TrueWhenNotNull),
];

const KNOWN_NULLABLE: &[KnownNullableReturn] = &[
    KnownNullableReturn::new("java/util/Map", "get"),
    KnownNullableReturn::new("java/util/Map", "put"),
    KnownNullableReturn::new("java/util/Map", "remove"),
    KnownNullableReturn::new("java/util/HashMap", "get"),
    KnownNullableReturn::new("java/util/LinkedHashMap", "get"),
    KnownNullableReturn::new("java/util/TreeMap", "get"),
    KnownNullableReturn::new("java/util/concurrent/ConcurrentHashMap", "get"),
    KnownNullableReturn::new("java/util/Queue", "poll"),
    KnownNullableReturn::new("java/util/Queue", "peek"),
    KnownNullableReturn::new("java/util/Deque", "pollFirst"),
    KnownNullableReturn::new("java/util/Deque", "pollLast"),
    KnownNullableReturn::new("java/util/Deque", "peekFirst"),
    KnownNullableReturn::new("java/util/Deque", "peekLast"),
    KnownNullableReturn::new("java/util/ArrayDeque", "poll"),
    KnownNullableReturn::new("java/util/ArrayDeque", "peek"),
    KnownNullableReturn::new("java/util/NavigableMap", "lowerKey"),
    KnownNullableReturn::new("java/util/NavigableMap", "floorKey"),
    KnownNullableReturn::new("java/util/NavigableMap", "ceilingKey"),
    KnownNullableReturn::new("java/util/NavigableMap", "higherKey"),
    KnownNullableReturn::new("java/util/NavigableMap", "firstEntry"),
    KnownNullableReturn::new("java/util/NavigableMap", "lastEntry"),
    KnownNullableReturn::new("java/util/NavigableSet", "lower"),
    KnownNullableReturn::new("java/util/NavigableSet", "floor"),
    KnownNullableReturn::new("java/util/NavigableSet", "ceiling"),
    KnownNullableReturn::new("java/util/NavigableSet", "higher"),
    KnownNullableReturn::overload(
        "java/lang/System",
        "getProperty",
        "(Ljava/lang/String;)Ljava/lang/String;",
    ),
    KnownNullableReturn::overload(
        "java/lang/System",
        "getenv",
        "(Ljava/lang/String;)Ljava/lang/String;",
    ),
    KnownNullableReturn::new("java/lang/Class", "getResource"),
    KnownNullableReturn::new("java/lang/Class", "getResourceAsStream"),
    KnownNullableReturn::new("java/lang/ClassLoader", "getResource"),
    KnownNullableReturn::new("java/lang/ref/Reference", "get"),
    KnownNullableReturn::new("java/lang/ref/WeakReference", "get"),
    KnownNullableReturn::new("java/lang/ref/SoftReference", "get"),
];

const NULL_FALLBACKS: &[NullFallback] = &[
    NullFallback::new("java/util/Optional", "orElse", 0),
    NullFallback::new("java/util/Map", "getOrDefault", 1),
];

crate::register_family!(CatalogFamily {
    name: "java.util",
    null_predicates: NULL_PREDICATES,
    known_nullable: KNOWN_NULLABLE,
    null_fallbacks: NULL_FALLBACKS,
});
