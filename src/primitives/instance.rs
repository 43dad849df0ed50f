// ============================================================================
// spark-reflux - Instances
// Shared, identity-carrying handles to bindable objects
// ============================================================================
//
// Bindings write into objects from store callbacks, so the object must be
// reachable from outside its owner: an Instance is an `Rc<RefCell<C>>` plus a
// stable InstanceId the registries key live subscriptions by.
//
// When the last handle drops, any bindings still live for it are released.
// ============================================================================

use std::cell::{BorrowMutError, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::core::context::with_context;
use crate::core::types::InstanceId;
use crate::registry::lifecycle::release_instance;

struct InstanceInner<C: 'static> {
    id: InstanceId,
    value: RefCell<C>,
}

impl<C: 'static> Drop for InstanceInner<C> {
    fn drop(&mut self) {
        release_instance::<C>(self.id);
    }
}

// =============================================================================
// INSTANCE<C>
// =============================================================================

/// A live object that bindings can target.
///
/// Cloning an `Instance` creates a new handle to the **same** object.
///
/// # Example
///
/// ```
/// use spark_reflux::Instance;
///
/// struct Counter { count: i32 }
///
/// let counter = Instance::new(Counter { count: 0 });
/// counter.borrow_mut().count = 2;
/// assert_eq!(counter.with(|c| c.count), 2);
/// ```
pub struct Instance<C: 'static> {
    inner: Rc<InstanceInner<C>>,
}

impl<C: 'static> Clone for Instance<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: 'static> Instance<C> {
    /// Wrap `value`, allocating a fresh identity.
    pub fn new(value: C) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                id: with_context(|ctx| ctx.next_instance_id()),
                value: RefCell::new(value),
            }),
        }
    }

    /// Identity of this object
    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn borrow(&self) -> Ref<'_, C> {
        self.inner.value.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, C> {
        self.inner.value.borrow_mut()
    }

    /// Mutably borrow, failing instead of panicking if already borrowed.
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, C>, BorrowMutError> {
        self.inner.value.try_borrow_mut()
    }

    /// Access the object with a closure.
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Mutate the object with a closure.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.inner.value.borrow_mut())
    }

    /// Create a weak handle that does not keep the object alive.
    pub fn downgrade(&self) -> WeakInstance<C> {
        WeakInstance {
            id: self.inner.id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles point at the same object.
    pub fn ptr_eq(&self, other: &Instance<C>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of strong handles to this object.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl<C: std::fmt::Debug + 'static> std::fmt::Debug for Instance<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.inner.id)
            .field("value", &self.inner.value)
            .finish()
    }
}

// =============================================================================
// WEAK INSTANCE
// =============================================================================

/// A non-owning handle to an `Instance`.
pub struct WeakInstance<C: 'static> {
    id: InstanceId,
    inner: Weak<InstanceInner<C>>,
}

impl<C: 'static> Clone for WeakInstance<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: self.inner.clone(),
        }
    }
}

impl<C: 'static> WeakInstance<C> {
    /// Identity of the referenced object (valid even after it dropped).
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Recover a strong handle if the object is still alive.
    pub fn upgrade(&self) -> Option<Instance<C>> {
        self.inner.upgrade().map(|inner| Instance { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

// =============================================================================
// TESTS
// =============================================================================
