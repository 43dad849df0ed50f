// ============================================================================
// spark-reflux - Binding Registry
//
// Per-class record of declared bindings plus the live subscriptions of every
// attached instance of that class.
// ============================================================================
//
// Declarations are class-level and grow monotonically (a key registered twice
// is overwritten in place). Live subscriptions are per-instance, keyed by
// InstanceId, so attaching two objects of the same class never mixes their
// subscription lists.
//
// Invariant, per instance:
// - UNBOUND (no live entry)  => zero subscriptions
// - BOUND   (live entry)     => exactly one subscription per declared key
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::core::constants::BINDINGS_SLOT;
use crate::core::context::with_context;
use crate::core::types::{class_id, class_name, InstanceId, Member};
use crate::primitives::bind::bind;
use crate::primitives::instance::{Instance, WeakInstance};
use crate::primitives::selector::{Selection, Selector};
use crate::primitives::store::Store;
use crate::primitives::subscription::Subscription;
use crate::registry::lifecycle::attach;

// =============================================================================
// BINDING DECLARATIONS
// =============================================================================

/// Type-erased binding declaration for class `C`.
///
/// Erases the state and value types so one registry can hold bindings of
/// different shapes.
pub trait AnyBinding<C: 'static> {
    /// Property key this binding writes into
    fn key(&self) -> &'static str;

    /// Create one live subscription targeting `target`.
    fn bind(&self, target: &Instance<C>) -> Subscription;
}

/// A declared binding: `key` receives `selection`'s values through `member`.
pub struct BindingSpec<C: 'static, S: 'static, T: 'static> {
    key: &'static str,
    selection: Selection<S, T>,
    member: Member<C, T>,
}

impl<C: 'static, S: 'static, T: Clone + 'static> BindingSpec<C, S, T> {
    /// Declare a binding of `selector` over `store`, filtered by `PartialEq`.
    pub fn new(
        key: &'static str,
        store: &Store<S>,
        selector: &Selector<S, T>,
        member: Member<C, T>,
    ) -> Self
    where
        T: PartialEq,
    {
        Self::from_selection(key, store.select(selector), member)
    }

    /// Declare a binding over an already configured selection.
    pub fn from_selection(key: &'static str, selection: Selection<S, T>, member: Member<C, T>) -> Self {
        Self {
            key,
            selection,
            member,
        }
    }

    pub fn selector(&self) -> &Selector<S, T> {
        self.selection.selector()
    }

    pub fn member(&self) -> Member<C, T> {
        self.member
    }
}

impl<C: 'static, S: 'static, T: Clone + 'static> AnyBinding<C> for BindingSpec<C, S, T> {
    fn key(&self) -> &'static str {
        self.key
    }

    fn bind(&self, target: &Instance<C>) -> Subscription {
        bind(target, self.key, &self.selection, self.member)
    }
}

// =============================================================================
// ACTIVATION
// =============================================================================

/// When a newly registered binding starts delivering.
pub enum Activation<'a, C: 'static> {
    /// Only once an instance is attached.
    Deferred,
    /// Right away, on a shared object standing in for the class itself.
    Immediate(&'a Instance<C>),
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Lifecycle state of one instance against its class registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BindingState {
    /// No live subscriptions (never attached, or detached).
    Unbound,
    /// One live subscription per declared key.
    Bound,
}

/// Live subscriptions of one attached instance.
pub(crate) struct LiveBindings<C: 'static> {
    pub(crate) target: WeakInstance<C>,
    pub(crate) subscriptions: Vec<(&'static str, Subscription)>,
}

impl<C: 'static> LiveBindings<C> {
    pub(crate) fn new(target: WeakInstance<C>) -> Self {
        Self {
            target,
            subscriptions: Vec::new(),
        }
    }

    fn has_key(&self, key: &str) -> bool {
        self.subscriptions.iter().any(|(k, _)| *k == key)
    }
}

/// Per-class binding registry, stored in the class's `BINDINGS_SLOT`.
pub struct BindingRegistry<C: 'static> {
    /// Declarations in registration order
    selectors: Vec<Rc<dyn AnyBinding<C>>>,

    /// Live subscriptions by instance
    pub(crate) live: HashMap<InstanceId, LiveBindings<C>>,
}

impl<C: 'static> BindingRegistry<C> {
    pub(crate) fn new() -> Self {
        Self {
            selectors: Vec::new(),
            live: HashMap::new(),
        }
    }

    /// Declared keys in registration order
    pub fn selector_keys(&self) -> Vec<&'static str> {
        self.selectors.iter().map(|b| b.key()).collect()
    }

    pub fn selector_count(&self) -> usize {
        self.selectors.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.selectors.iter().any(|b| b.key() == key)
    }

    pub fn state(&self, id: InstanceId) -> BindingState {
        if self.live.contains_key(&id) {
            BindingState::Bound
        } else {
            BindingState::Unbound
        }
    }

    /// True when `id` has no live subscriptions.
    pub fn is_destroyed(&self, id: InstanceId) -> bool {
        self.state(id) == BindingState::Unbound
    }

    pub fn subscription_count(&self, id: InstanceId) -> usize {
        self.live.get(&id).map_or(0, |live| live.subscriptions.len())
    }

    /// Number of instances currently bound
    pub fn bound_instances(&self) -> usize {
        self.live.len()
    }

    /// Live subscriptions across every bound instance
    pub fn total_subscriptions(&self) -> usize {
        self.live.values().map(|live| live.subscriptions.len()).sum()
    }

    /// Snapshot of the declarations, for binding outside the registry borrow.
    pub(crate) fn declarations(&self) -> Vec<Rc<dyn AnyBinding<C>>> {
        self.selectors.clone()
    }

    /// Insert or overwrite a declaration. Returns the one it replaced.
    fn upsert(&mut self, binding: Rc<dyn AnyBinding<C>>) -> Option<Rc<dyn AnyBinding<C>>> {
        let key = binding.key();
        match self.selectors.iter_mut().find(|b| b.key() == key) {
            Some(slot) => Some(std::mem::replace(slot, binding)),
            None => {
                self.selectors.push(binding);
                None
            }
        }
    }
}

/// Shared handle to a class registry, as stored in the metadata table.
pub type SharedRegistry<C> = Rc<RefCell<BindingRegistry<C>>>;

/// The registry of class `C`, if any binding was ever registered for it.
pub fn binding_registry<C: 'static>() -> Option<SharedRegistry<C>> {
    with_context(|ctx| ctx.get_metadata::<RefCell<BindingRegistry<C>>>(class_id::<C>(), BINDINGS_SLOT))
}

fn registry_or_create<C: 'static>() -> SharedRegistry<C> {
    with_context(|ctx| {
        ctx.get_or_define_metadata(class_id::<C>(), BINDINGS_SLOT, || {
            RefCell::new(BindingRegistry::<C>::new())
        })
    })
}

/// Hand a fresh subscription to `id`'s live entry.
///
/// The subscription is released instead when the instance was detached in the
/// meantime, or when the key is already bound (a reentrant attach got there
/// first).
pub(crate) fn store_subscription<C: 'static>(
    registry: &RefCell<BindingRegistry<C>>,
    id: InstanceId,
    key: &'static str,
    subscription: Subscription,
) {
    let rejected = {
        let mut reg = registry.borrow_mut();
        match reg.live.get_mut(&id) {
            Some(live) if !live.has_key(key) => {
                live.subscriptions.push((key, subscription));
                None
            }
            _ => Some(subscription),
        }
    };
    if let Some(subscription) = rejected {
        subscription.unsubscribe();
    }
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Declare a binding on class `C`.
///
/// The declaration is stored in the class registry (created on first use).
/// Instances already bound pick the binding up immediately; an overwritten key
/// has its old subscription released first. With `Activation::Immediate`, the
/// given shared object is attached as part of registration.
///
/// # Example
///
/// ```
/// use spark_reflux::{
///     attach, binding_registry, register_binding, selector, Activation, BindingSpec, Instance,
///     Member, Store,
/// };
///
/// #[derive(Clone)]
/// struct AppState { count: i32 }
/// struct Counter { count: i32 }
///
/// let store = Store::new(AppState { count: 1 });
/// register_binding::<Counter>(
///     BindingSpec::new(
///         "count",
///         &store,
///         &selector(|s: &AppState| s.count),
///         Member::field(|c: &mut Counter| &mut c.count),
///     ),
///     Activation::Deferred,
/// );
///
/// let counter = Instance::new(Counter { count: 0 });
/// let registry = binding_registry::<Counter>().unwrap();
/// assert!(registry.borrow().is_destroyed(counter.id()));
///
/// attach(&counter);
/// assert_eq!(registry.borrow().subscription_count(counter.id()), 1);
/// assert_eq!(counter.borrow().count, 1);
/// ```
pub fn register_binding<C: 'static>(binding: impl AnyBinding<C> + 'static, activation: Activation<'_, C>) {
    register_shared(Rc::new(binding), activation);
}

pub(crate) fn register_shared<C: 'static>(binding: Rc<dyn AnyBinding<C>>, activation: Activation<'_, C>) {
    let class = class_name::<C>();
    let key = binding.key();
    let registry = registry_or_create::<C>();

    // Record the declaration; collect what must change on bound instances.
    let (released, targets) = {
        let mut reg = registry.borrow_mut();
        let replaced = reg.upsert(binding.clone()).is_some();

        let mut released = Vec::new();
        let mut targets = Vec::new();
        for (id, live) in reg.live.iter_mut() {
            if replaced {
                if let Some(pos) = live.subscriptions.iter().position(|(k, _)| *k == key) {
                    released.push(live.subscriptions.remove(pos).1);
                }
            }
            targets.push((*id, live.target.clone()));
        }
        (released, targets)
    };

    for subscription in released {
        subscription.unsubscribe();
    }

    let rebound = targets.len();
    for (id, weak) in targets {
        if let Some(target) = weak.upgrade() {
            let subscription = binding.bind(&target);
            store_subscription(&registry, id, key, subscription);
        }
    }

    debug!(class, key, rebound, "registered binding");

    if let Activation::Immediate(shared) = activation {
        attach(shared);
    }
}

// =============================================================================
// TESTS
// =============================================================================
