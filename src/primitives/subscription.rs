// ============================================================================
// spark-reflux - Subscription Handles
// Releasable tokens linking an observer to a store
// ============================================================================
//
// A Subscription is owned by exactly one party at a time. `unsubscribe`
// consumes it, so releasing twice is impossible; dropping an unreleased
// handle releases it as well.
//
// Each handle shares an `active` flag with the observer entry inside the
// store. The store checks the flag right before every delivery, so a release
// performed mid-emission suppresses every delivery ordered after it.
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Teardown run once when a subscription is released
pub type TeardownFn = Box<dyn FnOnce()>;

/// A releasable link between an observer and its source.
pub struct Subscription {
    /// Shared with the observer entry; false once released
    active: Rc<Cell<bool>>,

    /// Unlinks the observer from its source
    teardown: Option<TeardownFn>,
}

impl Subscription {
    /// Create a handle around a shared active flag and its teardown.
    pub(crate) fn new(active: Rc<Cell<bool>>, teardown: impl FnOnce() + 'static) -> Self {
        Self {
            active,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A handle that was never linked to anything.
    pub fn closed() -> Self {
        Self {
            active: Rc::new(Cell::new(false)),
            teardown: None,
        }
    }

    /// Stop further delivery and unlink from the source.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Whether this handle has stopped delivering.
    pub fn is_closed(&self) -> bool {
        !self.active.get()
    }

    fn release(&mut self) {
        // Flip the flag before unlinking so in-flight emissions skip us.
        self.active.set(false);
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribe_runs_teardown_once() {
        let runs = Rc::new(Cell::new(0));
        let active = Rc::new(Cell::new(true));
        let sub = Subscription::new(active.clone(), {
            let runs = runs.clone();
            move || runs.set(runs.get() + 1)
        });

        assert!(!sub.is_closed());
        sub.unsubscribe();

        assert_eq!(runs.get(), 1);
        assert!(!active.get());
    }

    #[test]
    fn drop_releases() {
        let runs = Rc::new(Cell::new(0));
        let active = Rc::new(Cell::new(true));
        {
            let _sub = Subscription::new(active.clone(), {
                let runs = runs.clone();
                move || runs.set(runs.get() + 1)
            });
        }

        assert_eq!(runs.get(), 1);
        assert!(!active.get());
    }

    #[test]
    fn closed_handle_is_inert() {
        let sub = Subscription::closed();
        assert!(sub.is_closed());
        sub.unsubscribe();
    }
}
