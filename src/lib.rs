// ============================================================================
// spark-reflux - Declarative State Bindings for Rust
// ============================================================================
//
// Objects declare which slices of a store they mirror and which methods
// handle which actions. attach/detach turn those declarations into live
// subscriptions for one instance at a time.
// ============================================================================

pub mod core;
pub mod error;
pub mod primitives;
pub mod reactivity;
pub mod registry;

mod macros;

// Re-export core items at crate root for ergonomic access
pub use crate::core::constants;
pub use crate::core::context::{try_with_context, with_context, MetadataContext};
pub use crate::core::types::{
    class_id, class_name, default_equals, EqualsFn, InstanceId, Member, ParamType, Signature,
};

pub use error::{BindError, Result};

// Re-export primitives at crate root
pub use primitives::bind::bind;
pub use primitives::instance::{Instance, WeakInstance};
pub use primitives::selector::{selector, Replay, SelectOptions, Selection, Selector};
pub use primitives::store::Store;
pub use primitives::subscription::Subscription;

// Re-export registries
pub use registry::actions::{
    action_registry, action_type_of, handlers_for, register_action, validate_action,
    ActionRegistry, ActionSpec,
};
pub use registry::bindings::{
    binding_registry, register_binding, Activation, AnyBinding, BindingRegistry, BindingSpec,
    BindingState, SharedRegistry,
};
pub use registry::class::{define, Class, ClassBuilder};
pub use registry::lifecycle::{
    attach, attach_scoped, binding_state, detach, is_destroyed, subscription_count, Attached,
};

// =============================================================================
// TESTS
// =============================================================================
