// ============================================================================
// spark-reflux - Reactivity Module
// Equality functions used for distinct-until-changed filtering
// ============================================================================

pub mod equality;

pub use equality::{
    always_equals, always_equals_fn, by_field, default_equals_fn, equals, never_equals,
    never_equals_fn, safe_equals_f32, safe_equals_f64,
};
