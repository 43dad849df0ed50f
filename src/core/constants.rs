// ============================================================================
// spark-reflux - Constants
// Metadata slot names and action signature rules
// ============================================================================

// =============================================================================
// METADATA SLOTS
// =============================================================================

/// Slot holding a class's `BindingRegistry`.
pub const BINDINGS_SLOT: &str = "reflux:data-bindings";

/// Slot holding a class's `ActionRegistry`.
pub const ACTIONS_SLOT: &str = "reflux:actions";

// =============================================================================
// ACTION SIGNATURES
// =============================================================================

/// Minimum number of declared parameters for an action handler: `(state, action)`.
pub const MIN_ACTION_PARAMS: usize = 2;

/// Index of the parameter whose type names the handled action.
pub const ACTION_PARAM_INDEX: usize = 1;

/// Required-shape message carried by every signature violation.
pub const ACTION_SIGNATURE_HINT: &str = "#[action] must be applied to a method with two arguments. \
     e.g. fn reducer(&self, state: State, action: &SomeAction) -> State { }";

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_distinct() {
        assert_ne!(BINDINGS_SLOT, ACTIONS_SLOT);
    }

    #[test]
    fn action_param_is_inside_minimum_arity() {
        assert!(ACTION_PARAM_INDEX < MIN_ACTION_PARAMS);
    }

    #[test]
    fn hint_names_two_argument_shape() {
        assert!(ACTION_SIGNATURE_HINT.contains("two arguments"));
        assert!(ACTION_SIGNATURE_HINT.contains("state: State"));
    }
}
