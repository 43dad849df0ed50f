// ============================================================================
// spark-reflux - Core Module
// Fundamental types, constants, and the metadata context
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use context::{try_with_context, with_context, MetadataContext};
pub use types::{
    class_id, class_name, default_equals, EqualsFn, InstanceId, Member, ParamType, Signature,
};
