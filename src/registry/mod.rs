// ============================================================================
// spark-reflux - Registry Module
// Per-class binding and action registries, lifecycle, class definitions
// ============================================================================

pub mod actions;
pub mod bindings;
pub mod class;
pub mod lifecycle;

pub use actions::{
    action_registry, action_type_of, handlers_for, register_action, validate_action,
    ActionRegistry, ActionSpec,
};
pub use bindings::{
    binding_registry, register_binding, Activation, AnyBinding, BindingRegistry, BindingSpec,
    BindingState, SharedRegistry,
};
pub use class::{define, Class, ClassBuilder};
pub use lifecycle::{
    attach, attach_scoped, binding_state, detach, is_destroyed, subscription_count, Attached,
};
