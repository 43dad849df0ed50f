// ============================================================================
// spark-reflux - Action Registrar
//
// Records which method of a class handles which action type. The table is a
// side channel for an external dispatcher; registering a handler never changes
// how it behaves when called.
// ============================================================================
//
// A handler must declare at least `(state, action)`. The second parameter's
// type is the action type it claims. Fewer parameters is a programmer error
// caught at definition time.
// ============================================================================

use std::any::TypeId;
use std::cell::RefCell;

use tracing::{debug, warn};

use crate::core::constants::{ACTIONS_SLOT, ACTION_PARAM_INDEX, MIN_ACTION_PARAMS};
use crate::core::context::with_context;
use crate::core::types::{class_id, class_name, ParamType, Signature};
use crate::error::{BindError, Result};

// =============================================================================
// ACTION SPEC
// =============================================================================

/// One registered handler: `method_name` handles actions of `action_type`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActionSpec {
    pub method_name: &'static str,
    pub action_type: ParamType,
}

// =============================================================================
// ACTION REGISTRY
// =============================================================================

/// Per-class handler table, stored in the class's `ACTIONS_SLOT`.
///
/// Keyed by method name; re-registering a method overwrites its entry.
/// Two methods claiming the same action type are both kept.
#[derive(Clone, Debug, Default)]
pub struct ActionRegistry {
    handlers: Vec<ActionSpec>,
}

impl ActionRegistry {
    /// Action type handled by `method_name`.
    pub fn action_type(&self, method_name: &str) -> Option<ParamType> {
        self.handlers
            .iter()
            .find(|spec| spec.method_name == method_name)
            .map(|spec| spec.action_type)
    }

    /// Every method registered for the action type `action`.
    pub fn handlers_for(&self, action: TypeId) -> Vec<&'static str> {
        self.handlers
            .iter()
            .filter(|spec| spec.action_type.type_id() == action)
            .map(|spec| spec.method_name)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionSpec> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn record(&mut self, spec: ActionSpec) {
        match self
            .handlers
            .iter_mut()
            .find(|existing| existing.method_name == spec.method_name)
        {
            Some(existing) => *existing = spec,
            None => self.handlers.push(spec),
        }
    }
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Check a handler's declared parameters and build its spec.
pub fn validate_action<C: 'static>(method_name: &'static str, signature: &Signature) -> Result<ActionSpec> {
    let action_type = signature
        .param(ACTION_PARAM_INDEX)
        .filter(|_| signature.len() >= MIN_ACTION_PARAMS)
        .ok_or(BindError::SignatureViolation {
            class: class_name::<C>(),
            method: method_name,
            declared: signature.len(),
        })?;

    Ok(ActionSpec {
        method_name,
        action_type,
    })
}

/// Store a validated spec in `C`'s action registry.
pub(crate) fn record_action<C: 'static>(spec: ActionSpec) {
    let class = class_name::<C>();
    let registry = with_context(|ctx| {
        ctx.get_or_define_metadata(class_id::<C>(), ACTIONS_SLOT, || RefCell::new(ActionRegistry::default()))
    });

    let mut registry = registry.borrow_mut();
    let rivals: Vec<&'static str> = registry
        .handlers_for(spec.action_type.type_id())
        .into_iter()
        .filter(|method| *method != spec.method_name)
        .collect();
    if !rivals.is_empty() {
        warn!(
            class,
            method = spec.method_name,
            action = %spec.action_type,
            ?rivals,
            "action type already handled by another method"
        );
    }

    registry.record(spec);
    debug!(class, method = spec.method_name, action = %spec.action_type, "registered action handler");
}

/// Register `handler` as `C`'s handler `method_name`.
///
/// `signature` lists the declared parameters (receiver excluded); the second
/// one names the handled action type. The handler comes back unchanged.
///
/// # Example
///
/// ```
/// use spark_reflux::{action_type_of, register_action, signature, BindError};
///
/// #[derive(Clone, Default)]
/// struct State { todos: Vec<String> }
/// struct AddTodo(String);
/// struct TodoStore;
///
/// impl TodoStore {
///     fn add_todo(&self, mut state: State, action: &AddTodo) -> State {
///         state.todos.push(action.0.clone());
///         state
///     }
/// }
///
/// let add = register_action::<TodoStore, _>(
///     "add_todo",
///     &signature![State, AddTodo],
///     TodoStore::add_todo,
/// )?;
///
/// let next = add(&TodoStore, State::default(), &AddTodo("milk".into()));
/// assert_eq!(next.todos, vec!["milk"]);
/// assert!(action_type_of::<TodoStore>("add_todo").unwrap().is::<AddTodo>());
/// # Ok::<(), BindError>(())
/// ```
pub fn register_action<C: 'static, H>(method_name: &'static str, signature: &Signature, handler: H) -> Result<H> {
    let spec = validate_action::<C>(method_name, signature)?;
    record_action::<C>(spec);
    Ok(handler)
}

// =============================================================================
// LOOKUP
// =============================================================================

/// Snapshot of `C`'s action registry, if any handler was registered.
pub fn action_registry<C: 'static>() -> Option<ActionRegistry> {
    with_context(|ctx| ctx.get_metadata::<RefCell<ActionRegistry>>(class_id::<C>(), ACTIONS_SLOT))
        .map(|registry| registry.borrow().clone())
}

/// Action type handled by `C::method_name`.
pub fn action_type_of<C: 'static>(method_name: &str) -> Option<ParamType> {
    action_registry::<C>().and_then(|registry| registry.action_type(method_name))
}

/// Methods of `C` registered for action type `A`.
pub fn handlers_for<C: 'static, A: ?Sized + 'static>() -> Vec<&'static str> {
    action_registry::<C>().map_or_else(Vec::new, |registry| registry.handlers_for(TypeId::of::<A>()))
}

// =============================================================================
// TESTS
// =============================================================================
