// ============================================================================
// spark-reflux - Lifecycle Controller
//
// attach/detach activate and tear down every declared binding of an
// instance. The object framework calls them at paired lifecycle points
// (mount/unmount, open/close, ...).
// ============================================================================
//
// State machine per (class, instance):
//
//     UNBOUND --attach--> BOUND --detach--> UNBOUND
//
// Both transitions are idempotent no-ops when already in the target state, so
// a double attach never duplicates subscriptions and a stray detach is safe.
// A class with no registry is valid: both calls are silent no-ops.
//
// Registry borrows are never held while a binding is created or released:
// creating one replays the current value into the object, which runs user
// code that may itself attach or detach.
// ============================================================================

use std::cell::RefCell;
use std::marker::PhantomData;

use tracing::{debug, trace, warn};

use crate::core::constants::BINDINGS_SLOT;
use crate::core::context::try_with_context;
use crate::core::types::{class_id, class_name, InstanceId};
use crate::primitives::instance::Instance;
use crate::registry::bindings::{
    binding_registry, store_subscription, BindingRegistry, BindingState, LiveBindings,
    SharedRegistry,
};

// =============================================================================
// ATTACH / DETACH
// =============================================================================

/// Activate every declared binding of `instance`.
///
/// Returns `true` if the instance went from UNBOUND to BOUND, `false` if it
/// was already bound or its class declares no bindings.
pub fn attach<C: 'static>(instance: &Instance<C>) -> bool {
    let class = class_name::<C>();
    let id = instance.id();

    let Some(registry) = binding_registry::<C>() else {
        trace!(class, instance = %id, "attach: class declares no bindings");
        return false;
    };

    // Mark BOUND before binding so a reentrant attach is absorbed.
    let declarations = {
        let mut reg = registry.borrow_mut();
        if reg.live.contains_key(&id) {
            trace!(class, instance = %id, "attach: already bound");
            return false;
        }
        reg.live.insert(id, LiveBindings::new(instance.downgrade()));
        reg.declarations()
    };

    for binding in &declarations {
        let subscription = binding.bind(instance);
        store_subscription(&registry, id, binding.key(), subscription);
    }

    debug!(
        class,
        instance = %id,
        subscriptions = registry.borrow().subscription_count(id),
        "attached"
    );
    true
}

/// Release every live binding of `instance`.
///
/// Returns `true` if the instance went from BOUND to UNBOUND, `false` if it
/// was not bound or its class declares no bindings.
pub fn detach<C: 'static>(instance: &Instance<C>) -> bool {
    let class = class_name::<C>();
    let id = instance.id();

    let Some(registry) = binding_registry::<C>() else {
        trace!(class, instance = %id, "detach: class declares no bindings");
        return false;
    };

    let Some(released) = release(&registry, id) else {
        trace!(class, instance = %id, "detach: not bound");
        return false;
    };

    debug!(class, instance = %id, released, "detached");
    true
}

/// Remove `id`'s live entry and release its subscriptions.
///
/// Returns the number released, or `None` if the instance was not bound.
fn release<C: 'static>(registry: &RefCell<BindingRegistry<C>>, id: InstanceId) -> Option<usize> {
    let live = registry.borrow_mut().live.remove(&id)?;
    let count = live.subscriptions.len();
    for (_, subscription) in live.subscriptions {
        subscription.unsubscribe();
    }
    Some(count)
}

/// Registry lookup usable from destructors.
///
/// The context may already be gone during thread teardown.
fn registry_during_teardown<C: 'static>() -> Option<SharedRegistry<C>> {
    try_with_context(|ctx| {
        ctx.get_metadata::<RefCell<BindingRegistry<C>>>(class_id::<C>(), BINDINGS_SLOT)
    })
    .flatten()
}

/// Release the bindings of an instance whose last handle just dropped.
pub(crate) fn release_instance<C: 'static>(id: InstanceId) {
    let Some(registry) = registry_during_teardown::<C>() else {
        return;
    };

    let live = match registry.try_borrow_mut() {
        Ok(mut reg) => reg.live.remove(&id),
        Err(_) => {
            warn!(class = class_name::<C>(), instance = %id, "registry busy, dropped instance not released");
            return;
        }
    };

    if let Some(live) = live {
        let released = live.subscriptions.len();
        drop(live);
        debug!(class = class_name::<C>(), instance = %id, released, "released dropped instance");
    }
}

// =============================================================================
// INSPECTION
// =============================================================================

/// Lifecycle state of `instance`.
pub fn binding_state<C: 'static>(instance: &Instance<C>) -> BindingState {
    binding_registry::<C>().map_or(BindingState::Unbound, |registry| {
        registry.borrow().state(instance.id())
    })
}

/// True when `instance` has no live subscriptions.
pub fn is_destroyed<C: 'static>(instance: &Instance<C>) -> bool {
    binding_state(instance) == BindingState::Unbound
}

/// Number of live subscriptions held for `instance`.
pub fn subscription_count<C: 'static>(instance: &Instance<C>) -> usize {
    binding_registry::<C>().map_or(0, |registry| {
        registry.borrow().subscription_count(instance.id())
    })
}

// =============================================================================
// SCOPED ATTACHMENT
// =============================================================================

/// Keeps an instance attached until dropped.
///
/// Only a guard whose attach performed the UNBOUND -> BOUND transition
/// detaches on drop; an instance that was already bound stays bound.
///
/// ```
/// use spark_reflux::{attach_scoped, is_destroyed, Instance};
///
/// struct Plain;
/// let plain = Instance::new(Plain);
/// {
///     let guard = attach_scoped(&plain);
///     assert!(!guard.newly_attached()); // no bindings declared for Plain
/// }
/// assert!(is_destroyed(&plain));
/// ```
#[must_use = "dropping the guard detaches immediately"]
pub struct Attached<C: 'static> {
    id: InstanceId,
    newly_attached: bool,
    _class: PhantomData<fn() -> C>,
}

impl<C: 'static> Attached<C> {
    /// Whether this guard's attach performed the UNBOUND -> BOUND transition.
    pub fn newly_attached(&self) -> bool {
        self.newly_attached
    }

    pub fn instance_id(&self) -> InstanceId {
        self.id
    }
}

impl<C: 'static> Drop for Attached<C> {
    fn drop(&mut self) {
        if !self.newly_attached {
            return;
        }
        let Some(registry) = registry_during_teardown::<C>() else {
            return;
        };
        if let Some(released) = release(&registry, self.id) {
            debug!(class = class_name::<C>(), instance = %self.id, released, "detached on scope exit");
        }
    }
}

/// Attach `instance` and detach it again when the guard drops.
pub fn attach_scoped<C: 'static>(instance: &Instance<C>) -> Attached<C> {
    Attached {
        id: instance.id(),
        newly_attached: attach(instance),
        _class: PhantomData,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Member;
    use crate::primitives::selector::selector;
    use crate::primitives::store::Store;
    use crate::registry::bindings::{register_binding, Activation, BindingSpec};

    #[derive(Clone, Debug, PartialEq)]
    struct AppState {
        count: i32,
        name: String,
    }

    fn app() -> Store<AppState> {
        Store::new(AppState {
            count: 0,
            name: "x".into(),
        })
    }

    #[derive(Default)]
    struct Card {
        count: i32,
        name: String,
    }

    fn declare_card(store: &Store<AppState>) {
        register_binding::<Card>(
            BindingSpec::new(
                "count",
                store,
                &selector(|s: &AppState| s.count),
                Member::field(|c: &mut Card| &mut c.count),
            ),
            Activation::Deferred,
        );
        register_binding::<Card>(
            BindingSpec::new(
                "name",
                store,
                &selector(|s: &AppState| s.name.clone()),
                Member::field(|c: &mut Card| &mut c.name),
            ),
            Activation::Deferred,
        );
    }

    #[test]
    fn attach_creates_one_subscription_per_key() {
        let store = app();
        declare_card(&store);
        let card = Instance::new(Card::default());

        assert!(attach(&card));
        assert_eq!(subscription_count(&card), 2);
        assert_eq!(binding_state(&card), BindingState::Bound);
        assert_eq!(store.observer_count(), 2);
    }

    #[test]
    fn double_attach_is_idempotent() {
        let store = app();
        declare_card(&store);
        let card = Instance::new(Card::default());

        assert!(attach(&card));
        assert!(!attach(&card));
        assert_eq!(subscription_count(&card), 2);
        assert_eq!(store.observer_count(), 2);
    }

    #[test]
    fn detach_without_attach_is_noop() {
        let store = app();
        declare_card(&store);
        let card = Instance::new(Card::default());

        assert!(!detach(&card));
        assert!(!detach(&card));
        assert!(is_destroyed(&card));
    }

    #[test]
    fn detach_then_reattach_restores_bindings() {
        let store = app();
        declare_card(&store);
        let card = Instance::new(Card::default());

        attach(&card);
        assert!(detach(&card));
        assert_eq!(subscription_count(&card), 0);
        assert_eq!(store.observer_count(), 0);

        store.update(|s| s.count = 3);
        assert_eq!(card.borrow().count, 0);

        assert!(attach(&card));
        assert_eq!(subscription_count(&card), 2);
        assert_eq!(card.borrow().count, 3);
    }

    #[test]
    fn instances_do_not_share_subscriptions() {
        let store = app();
        declare_card(&store);
        let a = Instance::new(Card::default());
        let b = Instance::new(Card::default());

        attach(&a);
        attach(&b);
        detach(&a);

        assert_eq!(subscription_count(&a), 0);
        assert_eq!(subscription_count(&b), 2);

        store.update(|s| s.count = 8);
        assert_eq!(a.borrow().count, 0);
        assert_eq!(b.borrow().count, 8);
    }

    #[test]
    fn class_without_bindings_is_silent() {
        struct Bare;
        let bare = Instance::new(Bare);

        assert!(!attach(&bare));
        assert!(!detach(&bare));
        assert_eq!(binding_state(&bare), BindingState::Unbound);
        assert_eq!(subscription_count(&bare), 0);
    }

    #[test]
    fn dropping_last_handle_releases_bindings() {
        let store = app();
        declare_card(&store);
        let card = Instance::new(Card::default());
        let id = card.id();
        attach(&card);

        drop(card);

        let registry = binding_registry::<Card>().expect("registry");
        assert_eq!(registry.borrow().subscription_count(id), 0);
        assert_eq!(registry.borrow().bound_instances(), 0);
        assert_eq!(store.observer_count(), 0);
    }

    #[test]
    fn scoped_attach_detaches_on_drop() {
        let store = app();
        declare_card(&store);
        let card = Instance::new(Card::default());

        {
            let guard = attach_scoped(&card);
            assert!(guard.newly_attached());
            assert_eq!(guard.instance_id(), card.id());
            assert_eq!(subscription_count(&card), 2);
        }

        assert!(is_destroyed(&card));
        assert_eq!(store.observer_count(), 0);
    }

    #[test]
    fn delivery_may_detach_another_instance() {
        #[derive(Default)]
        struct Follower {
            count: i32,
        }

        struct Leader {
            follower: Instance<Follower>,
        }

        impl Leader {
            fn on_count(&mut self, count: i32) {
                if count > 0 {
                    detach(&self.follower);
                }
            }
        }

        let store = app();
        register_binding::<Leader>(
            BindingSpec::new(
                "count",
                &store,
                &selector(|s: &AppState| s.count),
                Member::method(Leader::on_count),
            ),
            Activation::Deferred,
        );
        register_binding::<Follower>(
            BindingSpec::new(
                "count",
                &store,
                &selector(|s: &AppState| s.count),
                Member::field(|f: &mut Follower| &mut f.count),
            ),
            Activation::Deferred,
        );

        let follower = Instance::new(Follower::default());
        let leader = Instance::new(Leader {
            follower: follower.clone(),
        });
        attach(&leader);
        attach(&follower);

        // The leader is notified first and releases the follower mid-emission.
        store.update(|s| s.count = 1);

        assert!(is_destroyed(&follower));
        assert_eq!(follower.borrow().count, 0);
        assert_eq!(subscription_count(&leader), 1);
    }

    #[test]
    fn attach_while_borrowed_delivers_on_next_write() {
        let store = Store::new(AppState {
            count: 7,
            name: "x".into(),
        });
        declare_card(&store);
        let card = Instance::new(Card::default());

        // Replay finds the card borrowed and is refused.
        card.with_mut(|_| attach(&card));
        assert_eq!(card.borrow().count, 0);
        assert_eq!(binding_state(&card), BindingState::Bound);

        // Same count, written again: still pending, so it lands now.
        store.update(|s| s.count = 7);
        assert_eq!(card.borrow().count, 7);
        assert_eq!(card.borrow().name, "x");
    }

    #[test]
    fn scoped_guard_keeps_existing_attachment() {
        let store = app();
        declare_card(&store);
        let card = Instance::new(Card::default());
        assert!(attach(&card));

        {
            let guard = attach_scoped(&card);
            assert!(!guard.newly_attached());
        }

        assert_eq!(binding_state(&card), BindingState::Bound);
        store.update(|s| s.count = 2);
        assert_eq!(card.borrow().count, 2);
    }
}
