// ============================================================================
// spark-reflux - Store
// The observable state container bindings project from
// ============================================================================
//
// A Store holds the current state snapshot and emits it to every observer on
// each write. Distinct filtering happens per Selection, not here: the store
// always emits, each selection decides whether its slice changed.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::core::types::EqualsFn;
use crate::primitives::selector::{Replay, SelectOptions, Selection, Selector};
use crate::primitives::subscription::Subscription;

/// Observer callback invoked with each state snapshot
type NotifyFn<S> = Rc<dyn Fn(&S)>;

/// One registered observer
struct Observer<S> {
    id: u64,
    active: Rc<Cell<bool>>,
    notify: NotifyFn<S>,
}

/// Internal store storage
struct StoreInner<S> {
    /// Current snapshot. Held as `Rc` so emission never keeps a borrow open.
    state: RefCell<Rc<S>>,

    /// Incremented on every write
    version: Cell<u64>,

    /// Observers in registration order
    observers: RefCell<Vec<Observer<S>>>,

    /// Next observer id
    next_observer: Cell<u64>,
}

// =============================================================================
// STORE<S> - The public store handle
// =============================================================================

/// An observable state container.
///
/// Cloning a `Store` creates a new handle to the **same** state.
///
/// # Example
///
/// ```
/// use spark_reflux::Store;
///
/// let store = Store::new(0);
/// assert_eq!(store.get(), 0);
///
/// store.set(5);
/// assert_eq!(store.get(), 5);
/// assert_eq!(store.version(), 1);
/// ```
pub struct Store<S> {
    inner: Rc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: 'static> Store<S> {
    /// Create a store holding `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(initial)),
                version: Cell::new(0),
                observers: RefCell::new(Vec::new()),
                next_observer: Cell::new(1),
            }),
        }
    }

    /// Get the current state (cloning).
    pub fn get(&self) -> S
    where
        S: Clone,
    {
        (*self.snapshot()).clone()
    }

    /// Get a shared handle to the current snapshot.
    pub fn snapshot(&self) -> Rc<S> {
        self.inner.state.borrow().clone()
    }

    /// Access the current state with a closure (avoids cloning).
    ///
    /// The closure may write to the store; it sees the snapshot taken on entry.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let snapshot = self.snapshot();
        f(&snapshot)
    }

    /// Replace the state and emit it to every observer.
    pub fn set(&self, state: S) {
        *self.inner.state.borrow_mut() = Rc::new(state);
        self.inner.version.set(self.inner.version.get() + 1);
        self.emit();
    }

    /// Derive the next state from a copy of the current one and emit it.
    ///
    /// ```
    /// use spark_reflux::Store;
    ///
    /// let store = Store::new(vec![1, 2]);
    /// store.update(|items| items.push(3));
    /// assert_eq!(store.get(), vec![1, 2, 3]);
    /// ```
    pub fn update(&self, f: impl FnOnce(&mut S))
    where
        S: Clone,
    {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Number of writes since creation.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.inner
            .observers
            .borrow()
            .iter()
            .filter(|o| o.active.get())
            .count()
    }

    /// Register a raw observer of whole-state snapshots.
    ///
    /// With `replay` set, the current snapshot is delivered before returning.
    pub fn observe(&self, replay: bool, notify: impl Fn(&S) + 'static) -> Subscription {
        let id = self.inner.next_observer.get();
        self.inner.next_observer.set(id + 1);

        let active = Rc::new(Cell::new(true));
        let notify: NotifyFn<S> = Rc::new(notify);
        self.inner.observers.borrow_mut().push(Observer {
            id,
            active: active.clone(),
            notify: notify.clone(),
        });

        let weak: Weak<StoreInner<S>> = Rc::downgrade(&self.inner);
        let subscription = Subscription::new(active.clone(), move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.borrow_mut().retain(|o| o.id != id);
            }
        });

        if replay && active.get() {
            let snapshot = self.snapshot();
            notify(&snapshot);
        }

        subscription
    }

    /// Project the state through `selector`, emitting only when the projected
    /// value changes.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_reflux::{selector, Store};
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    ///
    /// #[derive(Clone)]
    /// struct AppState { count: i32, name: &'static str }
    ///
    /// let store = Store::new(AppState { count: 0, name: "a" });
    /// let count = selector(|s: &AppState| s.count);
    ///
    /// let seen = Rc::new(RefCell::new(Vec::new()));
    /// let _sub = store.select(&count).subscribe({
    ///     let seen = seen.clone();
    ///     move |v| seen.borrow_mut().push(v)
    /// });
    ///
    /// store.update(|s| s.name = "b"); // count unchanged: filtered
    /// store.update(|s| s.count = 2);
    /// assert_eq!(*seen.borrow(), vec![0, 2]);
    /// ```
    pub fn select<T>(&self, selector: &Selector<S, T>) -> Selection<S, T>
    where
        T: PartialEq + 'static,
    {
        self.select_with(selector, SelectOptions::default())
    }

    /// Project the state with explicit filtering and replay options.
    pub fn select_with<T>(&self, selector: &Selector<S, T>, options: SelectOptions<T>) -> Selection<S, T>
    where
        T: 'static,
    {
        Selection::new(self.clone(), selector.clone(), options)
    }

    /// Shorthand for `select_with` using a custom equality and latest-value replay.
    pub fn select_with_equals<T>(&self, selector: &Selector<S, T>, equals: EqualsFn<T>) -> Selection<S, T>
    where
        T: 'static,
    {
        self.select_with(
            selector,
            SelectOptions {
                equals,
                replay: Replay::Latest,
            },
        )
    }

    /// Like `select_with_equals`, but the equality may be any closure, such as
    /// one built by [`by_field`](crate::reactivity::equality::by_field).
    pub fn select_by<T>(
        &self,
        selector: &Selector<S, T>,
        equals: impl Fn(&T, &T) -> bool + 'static,
    ) -> Selection<S, T>
    where
        T: 'static,
    {
        Selection::with_equals(self.clone(), selector.clone(), equals, Replay::Latest)
    }

    /// Whether two handles point at the same store.
    pub fn ptr_eq(&self, other: &Store<S>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn emit(&self) {
        let snapshot = self.snapshot();
        let version = self.version();

        // Collect first: observers may subscribe or release while we deliver.
        let observers: Vec<(Rc<Cell<bool>>, NotifyFn<S>)> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|o| (o.active.clone(), o.notify.clone()))
            .collect();

        trace!(version, observers = observers.len(), "store emit");

        for (active, notify) in observers {
            // A write from an observer emitted the newer state to everyone;
            // the rest of this snapshot is stale.
            if self.inner.version.get() != version {
                trace!(version, current = self.version(), "store emit superseded");
                return;
            }
            // A release earlier in this loop must suppress later deliveries.
            if active.get() {
                notify(&snapshot);
            }
        }
    }
}

impl<S: std::fmt::Debug + 'static> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.snapshot())
            .field("version", &self.version())
            .field("observers", &self.observer_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Member;
    use crate::primitives::bind::bind;
    use crate::primitives::instance::Instance;
    use crate::primitives::selector::selector;

    #[test]
    fn set_bumps_version_and_emits() {
        let store = Store::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = store.observe(false, {
            let seen = seen.clone();
            move |v: &i32| seen.borrow_mut().push(*v)
        });

        store.set(2);
        store.set(2);

        assert_eq!(store.version(), 2);
        assert_eq!(*seen.borrow(), vec![2, 2]);
    }

    #[test]
    fn observe_with_replay_delivers_current() {
        let store = Store::new(String::from("hello"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = store.observe(true, {
            let seen = seen.clone();
            move |v: &String| seen.borrow_mut().push(v.clone())
        });

        assert_eq!(*seen.borrow(), vec!["hello".to_string()]);
    }

    #[test]
    fn unsubscribe_removes_observer() {
        let store = Store::new(0);
        let sub = store.observe(false, |_| {});
        assert_eq!(store.observer_count(), 1);

        sub.unsubscribe();
        assert_eq!(store.observer_count(), 0);
        assert_eq!(store.inner.observers.borrow().len(), 0);
    }

    #[test]
    fn release_during_emission_suppresses_later_observer() {
        let store = Store::new(0);
        let second_runs = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        // First observer releases the second one mid-emission.
        let _killer = store.observe(false, {
            let victim = victim.clone();
            move |_| {
                if let Some(sub) = victim.borrow_mut().take() {
                    sub.unsubscribe();
                }
            }
        });
        let second = store.observe(false, {
            let second_runs = second_runs.clone();
            move |_| second_runs.set(second_runs.get() + 1)
        });
        *victim.borrow_mut() = Some(second);

        store.set(1);
        assert_eq!(second_runs.get(), 0);

        store.set(2);
        assert_eq!(second_runs.get(), 0);
    }

    #[test]
    fn reentrant_write_does_not_panic() {
        let store = Store::new(0);
        let _sub = store.observe(false, {
            let store = store.clone();
            move |v: &i32| {
                if *v == 1 {
                    store.set(2);
                }
            }
        });

        store.set(1);
        assert_eq!(store.get(), 2);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn write_back_supersedes_stale_snapshot() {
        #[derive(Clone, Debug, PartialEq)]
        struct Reading {
            raw: i32,
        }

        #[derive(Default)]
        struct Mirror {
            raw: i32,
        }

        let store = Store::new(Reading { raw: 0 });

        // Clamps out-of-range writes; registered before everything else.
        let _clamp = store.observe(false, {
            let store = store.clone();
            move |r: &Reading| {
                if r.raw > 10 {
                    store.update(|r| r.raw = 10);
                }
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _log = store.observe(false, {
            let seen = seen.clone();
            move |r: &Reading| seen.borrow_mut().push(r.raw)
        });
        let mirror = Instance::new(Mirror::default());
        let _bound = bind(
            &mirror,
            "raw",
            &store.select(&selector(|r: &Reading| r.raw)),
            Member::field(|m: &mut Mirror| &mut m.raw),
        );

        store.update(|r| r.raw = 50);

        assert_eq!(store.get().raw, 10);
        assert_eq!(*seen.borrow(), vec![10]);
        assert_eq!(mirror.borrow().raw, 10);
    }

    #[test]
    fn update_clones_and_emits() {
        let store = Store::new(vec![1]);
        let emits = Rc::new(Cell::new(0));
        let _sub = store.observe(false, {
            let emits = emits.clone();
            move |_| emits.set(emits.get() + 1)
        });

        store.update(|v| v.push(2));
        assert_eq!(store.get(), vec![1, 2]);
        assert_eq!(emits.get(), 1);
    }

    #[test]
    fn handles_share_state() {
        let a = Store::new(1);
        let b = a.clone();
        b.set(9);
        assert_eq!(a.get(), 9);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Store::new(9)));
    }
}
