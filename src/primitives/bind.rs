// ============================================================================
// spark-reflux - Binder
// Links a selection's emitted values to a member of a target object
// ============================================================================
//
// A binding is a one-way pipe: state -> selector -> member. Each emitted
// value is either assigned to a field or passed to a setter method, depending
// on the Member variant. The returned Subscription is the only way to stop it.
// ============================================================================

use tracing::{trace, warn};

use crate::core::types::{class_name, Member};
use crate::primitives::instance::Instance;
use crate::primitives::selector::Selection;
use crate::primitives::subscription::Subscription;

/// Bind `selection` into `member` of `target`.
///
/// The subscription holds the target weakly: once the object is gone,
/// deliveries become no-ops. A delivery that finds the target already
/// borrowed (a reentrant write from inside the object) is skipped, and the
/// value stays pending until a later write offers it again.
///
/// # Example
///
/// ```
/// use spark_reflux::{bind, selector, Instance, Member, Store};
///
/// #[derive(Clone)]
/// struct AppState { count: i32 }
/// struct Counter { count: i32 }
///
/// let store = Store::new(AppState { count: 1 });
/// let counter = Instance::new(Counter { count: 0 });
///
/// let sub = bind(
///     &counter,
///     "count",
///     &store.select(&selector(|s: &AppState| s.count)),
///     Member::field(|c: &mut Counter| &mut c.count),
/// );
/// assert_eq!(counter.borrow().count, 1);
///
/// store.set(AppState { count: 5 });
/// assert_eq!(counter.borrow().count, 5);
///
/// sub.unsubscribe();
/// store.set(AppState { count: 6 });
/// assert_eq!(counter.borrow().count, 5);
/// ```
pub fn bind<C, S, T>(
    target: &Instance<C>,
    key: &'static str,
    selection: &Selection<S, T>,
    member: Member<C, T>,
) -> Subscription
where
    C: 'static,
    S: 'static,
    T: Clone + 'static,
{
    let class = class_name::<C>();
    let id = target.id();
    let weak = target.downgrade();

    trace!(class, key, instance = %id, callable = member.is_callable(), "binding member");

    selection.subscribe_confirmed(move |value| {
        let Some(target) = weak.upgrade() else {
            trace!(class, key, instance = %id, "target dropped, delivery skipped");
            return true;
        };
        match target.try_borrow_mut() {
            Ok(mut object) => {
                member.deliver(&mut object, value);
                true
            }
            Err(_) => {
                warn!(class, key, instance = %id, "target is borrowed, delivery deferred");
                false
            }
        }
    })
}

// =============================================================================
// TESTS
// =============================================================================
