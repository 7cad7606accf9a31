pub(crate) mod fixpoint;
pub(crate) mod parameters;
pub(crate) mod returns;
