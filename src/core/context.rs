// ============================================================================
// spark-reflux - Metadata Context
// Thread-local slot table standing in for per-class reflection metadata
// ============================================================================

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::types::InstanceId;

/// Key of one metadata slot: the owning class plus the slot name.
type SlotKey = (TypeId, &'static str);

// =============================================================================
// METADATA CONTEXT
// =============================================================================

/// Thread-local context holding every class's metadata slots.
///
/// Registries are stored as `Rc<T>` so callers can clone a handle out of the
/// table and release the table borrow before running user code.
pub struct MetadataContext {
    /// Named slots per class
    slots: RefCell<HashMap<SlotKey, Rc<dyn Any>>>,

    /// Next instance id to hand out
    next_instance: Cell<u64>,
}

impl MetadataContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(HashMap::new()),
            next_instance: Cell::new(1),
        }
    }

    // =========================================================================
    // SLOTS
    // =========================================================================

    /// Read a slot, downcasting to `M`.
    ///
    /// Returns `None` when the slot is empty or holds a different type.
    pub fn get_metadata<M: Any>(&self, class: TypeId, slot: &'static str) -> Option<Rc<M>> {
        let value = self.slots.borrow().get(&(class, slot)).cloned()?;
        value.downcast::<M>().ok()
    }

    /// Write a slot, replacing any previous value.
    pub fn define_metadata<M: Any>(&self, class: TypeId, slot: &'static str, value: Rc<M>) {
        self.slots.borrow_mut().insert((class, slot), value);
    }

    /// Check whether a slot is populated
    pub fn has_metadata(&self, class: TypeId, slot: &'static str) -> bool {
        self.slots.borrow().contains_key(&(class, slot))
    }

    /// Read a slot, creating it with `init` if it is empty.
    pub fn get_or_define_metadata<M: Any>(
        &self,
        class: TypeId,
        slot: &'static str,
        init: impl FnOnce() -> M,
    ) -> Rc<M> {
        if let Some(existing) = self.get_metadata::<M>(class, slot) {
            return existing;
        }
        let created = Rc::new(init());
        self.define_metadata(class, slot, created.clone());
        created
    }

    /// Drop every slot owned by `class`. Returns the number of slots removed.
    ///
    /// Live subscriptions held by a removed registry are released when the
    /// last handle to it goes away.
    pub fn forget_class(&self, class: TypeId) -> usize {
        let removed: Vec<Rc<dyn Any>> = {
            let mut slots = self.slots.borrow_mut();
            let keys: Vec<SlotKey> = slots.keys().filter(|(c, _)| *c == class).copied().collect();
            keys.iter().filter_map(|key| slots.remove(key)).collect()
        };
        // Dropped outside the borrow: releasing subscriptions may re-enter.
        let count = removed.len();
        drop(removed);
        count
    }

    /// Number of populated slots across all classes
    pub fn slot_count(&self) -> usize {
        self.slots.borrow().len()
    }

    // =========================================================================
    // INSTANCE IDS
    // =========================================================================

    /// Allocate a fresh instance id
    pub fn next_instance_id(&self) -> InstanceId {
        let id = self.next_instance.get();
        self.next_instance.set(id + 1);
        InstanceId(id)
    }
}

impl Default for MetadataContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL INSTANCE
// =============================================================================

thread_local! {
    static CONTEXT: MetadataContext = MetadataContext::new();
}

/// Access the thread-local metadata context
pub fn with_context<R>(f: impl FnOnce(&MetadataContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Access the context if it is still alive.
///
/// Returns `None` during thread teardown, when destructors run after the
/// thread-local has been destroyed.
pub fn try_with_context<R>(f: impl FnOnce(&MetadataContext) -> R) -> Option<R> {
    CONTEXT.try_with(f).ok()
}

// =============================================================================
// TESTS
// =============================================================================
