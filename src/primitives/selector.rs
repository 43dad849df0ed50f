// ============================================================================
// spark-reflux - Selectors and Selections
//
// A Selector is a pure projection from the state snapshot to a derived value.
// A Selection applies one to a Store and yields a lazy, filtered stream: the
// projection only runs once someone subscribes, and a value is only forwarded
// when it differs from the previous one.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::types::{default_equals, EqualsFn};
use crate::primitives::store::Store;
use crate::primitives::subscription::Subscription;

// =============================================================================
// SELECTOR
// =============================================================================

/// A pure projection `&S -> T`.
///
/// Selectors are identified by reference: two clones of the same selector are
/// the same selector, two separately created closures never are.
pub struct Selector<S, T> {
    project: Rc<dyn Fn(&S) -> T>,
}

impl<S, T> Clone for Selector<S, T> {
    fn clone(&self) -> Self {
        Self {
            project: self.project.clone(),
        }
    }
}

impl<S, T> Selector<S, T> {
    /// Wrap a projection function.
    pub fn new(project: impl Fn(&S) -> T + 'static) -> Self {
        Self {
            project: Rc::new(project),
        }
    }

    /// Apply the projection to a state snapshot.
    pub fn project(&self, state: &S) -> T {
        (self.project)(state)
    }

    /// Whether both handles are the same selector.
    pub fn ptr_eq(&self, other: &Selector<S, T>) -> bool {
        Rc::ptr_eq(&self.project, &other.project)
    }
}

impl<S, T> std::fmt::Debug for Selector<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("ptr", &Rc::as_ptr(&self.project).cast::<()>())
            .finish()
    }
}

/// Create a selector.
///
/// # Example
///
/// ```
/// use spark_reflux::selector;
///
/// struct AppState { count: i32 }
///
/// let count = selector(|s: &AppState| s.count);
/// assert_eq!(count.project(&AppState { count: 3 }), 3);
/// ```
pub fn selector<S, T>(project: impl Fn(&S) -> T + 'static) -> Selector<S, T> {
    Selector::new(project)
}

// =============================================================================
// OPTIONS
// =============================================================================

/// What a fresh subscription sees before the next state write.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Replay {
    /// Deliver the current projection immediately on subscribe.
    #[default]
    Latest,
    /// Deliver only values produced by later writes.
    None,
}

/// Filtering and replay behaviour of a selection.
pub struct SelectOptions<T> {
    /// Two consecutive projections equal under this function are collapsed.
    pub equals: EqualsFn<T>,
    pub replay: Replay,
}

// Manual impls: derives would demand `T: Clone`/`T: Debug` for a fn pointer.
impl<T> Clone for SelectOptions<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SelectOptions<T> {}

impl<T> std::fmt::Debug for SelectOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectOptions")
            .field("replay", &self.replay)
            .finish_non_exhaustive()
    }
}

impl<T: PartialEq> Default for SelectOptions<T> {
    fn default() -> Self {
        Self {
            equals: default_equals,
            replay: Replay::Latest,
        }
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// A selector applied to a store.
pub struct Selection<S, T> {
    store: Store<S>,
    selector: Selector<S, T>,
    equals: Rc<dyn Fn(&T, &T) -> bool>,
    replay: Replay,
}

impl<S, T> Clone for Selection<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            selector: self.selector.clone(),
            equals: self.equals.clone(),
            replay: self.replay,
        }
    }
}

impl<S: 'static, T: 'static> Selection<S, T> {
    pub(crate) fn new(store: Store<S>, selector: Selector<S, T>, options: SelectOptions<T>) -> Self {
        let equals = options.equals;
        Self::with_equals(store, selector, move |a, b| equals(a, b), options.replay)
    }

    pub(crate) fn with_equals(
        store: Store<S>,
        selector: Selector<S, T>,
        equals: impl Fn(&T, &T) -> bool + 'static,
        replay: Replay,
    ) -> Self {
        Self {
            store,
            selector,
            equals: Rc::new(equals),
            replay,
        }
    }

    /// The selector this selection projects with.
    pub fn selector(&self) -> &Selector<S, T> {
        &self.selector
    }

    /// The store this selection reads from.
    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn replay(&self) -> Replay {
        self.replay
    }

    /// Current projected value.
    pub fn get(&self) -> T {
        self.store.with(|state| self.selector.project(state))
    }

    /// Receive every distinct projected value until the subscription is released.
    pub fn subscribe(&self, on_next: impl Fn(T) + 'static) -> Subscription
    where
        T: Clone,
    {
        self.subscribe_confirmed(move |value| {
            on_next(value);
            true
        })
    }

    /// Like [`subscribe`](Self::subscribe), but `on_next` reports whether it
    /// took the value. A refused value does not become the baseline, so the
    /// same value is offered again on the next write.
    pub(crate) fn subscribe_confirmed(&self, on_next: impl Fn(T) -> bool + 'static) -> Subscription
    where
        T: Clone,
    {
        let selector = self.selector.clone();
        let equals = self.equals.clone();

        // Without replay, the current projection is the baseline to diff against.
        let seed = match self.replay {
            Replay::Latest => None,
            Replay::None => Some(self.get()),
        };
        let last: RefCell<Option<T>> = RefCell::new(seed);
        // Bumped per forwarded value; a nested delivery moves it past ours.
        let generation = Cell::new(0u64);

        self.store.observe(self.replay == Replay::Latest, move |state| {
            let next = selector.project(state);
            let previous = {
                let mut last = last.borrow_mut();
                if last.as_ref().is_some_and(|prev| equals(prev, &next)) {
                    return;
                }
                last.replace(next.clone())
            };
            let epoch = generation.get() + 1;
            generation.set(epoch);

            if !on_next(next) && generation.get() == epoch {
                *last.borrow_mut() = previous;
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
