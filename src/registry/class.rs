// ============================================================================
// spark-reflux - Class Definitions
// Declare a class's bindings and action handlers in one place
// ============================================================================
//
// define::<C>() collects declarations and registers them together on finish().
// Action signatures are checked before anything is registered, so a class with
// a malformed handler leaves no partial registry behind.
// ============================================================================

use std::marker::PhantomData;
use std::rc::Rc;

use crate::core::types::{class_name, Member, ParamType, Signature};
use crate::error::Result;
use crate::primitives::instance::Instance;
use crate::primitives::selector::Selector;
use crate::primitives::store::Store;
use crate::registry::actions::{self, record_action, validate_action, ActionRegistry};
use crate::registry::bindings::{
    binding_registry, register_shared, Activation, AnyBinding, BindingSpec, BindingState,
    SharedRegistry,
};
use crate::registry::lifecycle::{self, attach, Attached};

// =============================================================================
// BUILDER
// =============================================================================

/// Pending declarations for class `C`.
pub struct ClassBuilder<C: 'static> {
    bindings: Vec<Rc<dyn AnyBinding<C>>>,
    actions: Vec<(&'static str, Signature)>,
    shared: Option<Instance<C>>,
}

/// Start declaring class `C`.
///
/// # Example
///
/// ```
/// use spark_reflux::{define, selector, signature, Instance, Member, Store};
///
/// #[derive(Clone)]
/// struct AppState { count: i32 }
/// struct Increment;
///
/// #[derive(Default)]
/// struct Counter { count: i32 }
///
/// let store = Store::new(AppState { count: 5 });
/// let class = define::<Counter>()
///     .bind("count", &store, &selector(|s: &AppState| s.count), Member::field(|c: &mut Counter| &mut c.count))
///     .action("increment", signature![AppState, Increment])
///     .finish()?;
///
/// let counter = Instance::new(Counter::default());
/// class.attach(&counter);
/// assert_eq!(counter.borrow().count, 5);
/// assert!(class.action_type("increment").unwrap().is::<Increment>());
/// # Ok::<(), spark_reflux::BindError>(())
/// ```
pub fn define<C: 'static>() -> ClassBuilder<C> {
    ClassBuilder {
        bindings: Vec::new(),
        actions: Vec::new(),
        shared: None,
    }
}

impl<C: 'static> ClassBuilder<C> {
    /// Bind `key` to `selector` over `store`.
    pub fn bind<S: 'static, T: Clone + PartialEq + 'static>(
        self,
        key: &'static str,
        store: &Store<S>,
        selector: &Selector<S, T>,
        member: Member<C, T>,
    ) -> Self {
        self.bind_spec(BindingSpec::new(key, store, selector, member))
    }

    /// Add a prepared binding declaration.
    pub fn bind_spec(mut self, binding: impl AnyBinding<C> + 'static) -> Self {
        self.bindings.push(Rc::new(binding));
        self
    }

    /// Declare `method_name` as an action handler with the given parameters.
    pub fn action(mut self, method_name: &'static str, signature: Signature) -> Self {
        self.actions.push((method_name, signature));
        self
    }

    /// Attach `shared` as soon as the class is registered.
    pub fn activate(mut self, shared: &Instance<C>) -> Self {
        self.shared = Some(shared.clone());
        self
    }

    /// Register everything declared so far.
    pub fn finish(self) -> Result<Class<C>> {
        let specs = self
            .actions
            .iter()
            .map(|(method, signature)| validate_action::<C>(*method, signature))
            .collect::<Result<Vec<_>>>()?;

        for spec in specs {
            record_action::<C>(spec);
        }
        for binding in self.bindings {
            register_shared(binding, Activation::Deferred);
        }
        if let Some(shared) = &self.shared {
            attach(shared);
        }

        Ok(Class {
            _class: PhantomData,
        })
    }
}

// =============================================================================
// CLASS HANDLE
// =============================================================================

/// Typed access to a registered class's lifecycle and metadata.
pub struct Class<C: 'static> {
    _class: PhantomData<fn() -> C>,
}

impl<C: 'static> Clone for Class<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: 'static> Copy for Class<C> {}

impl<C: 'static> std::fmt::Debug for Class<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Class").field(&self.name()).finish()
    }
}

impl<C: 'static> Class<C> {
    pub fn name(&self) -> &'static str {
        class_name::<C>()
    }

    pub fn attach(&self, instance: &Instance<C>) -> bool {
        attach(instance)
    }

    pub fn detach(&self, instance: &Instance<C>) -> bool {
        lifecycle::detach(instance)
    }

    pub fn attach_scoped(&self, instance: &Instance<C>) -> Attached<C> {
        lifecycle::attach_scoped(instance)
    }

    pub fn binding_state(&self, instance: &Instance<C>) -> BindingState {
        lifecycle::binding_state(instance)
    }

    pub fn is_destroyed(&self, instance: &Instance<C>) -> bool {
        lifecycle::is_destroyed(instance)
    }

    pub fn subscription_count(&self, instance: &Instance<C>) -> usize {
        lifecycle::subscription_count(instance)
    }

    pub fn action_type(&self, method_name: &str) -> Option<ParamType> {
        actions::action_type_of::<C>(method_name)
    }

    /// Methods registered for action type `A`.
    pub fn handlers_for<A: ?Sized + 'static>(&self) -> Vec<&'static str> {
        actions::handlers_for::<C, A>()
    }

    pub fn bindings(&self) -> Option<SharedRegistry<C>> {
        binding_registry::<C>()
    }

    pub fn actions(&self) -> Option<ActionRegistry> {
        actions::action_registry::<C>()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BindError;
    use crate::primitives::selector::selector;
    use crate::signature;

    #[derive(Clone, Debug, PartialEq)]
    struct Todos {
        items: Vec<String>,
        filter: String,
    }

    struct AddTodo;
    struct SetFilter;

    fn todos() -> Store<Todos> {
        Store::new(Todos {
            items: vec!["milk".into()],
            filter: "all".into(),
        })
    }

    #[test]
    fn finish_registers_bindings_and_actions() {
        #[derive(Default)]
        struct List {
            items: Vec<String>,
            filter: String,
        }

        let store = todos();
        let class = define::<List>()
            .bind(
                "items",
                &store,
                &selector(|s: &Todos| s.items.clone()),
                Member::field(|l: &mut List| &mut l.items),
            )
            .bind(
                "filter",
                &store,
                &selector(|s: &Todos| s.filter.clone()),
                Member::field(|l: &mut List| &mut l.filter),
            )
            .action("add", signature![Todos, AddTodo])
            .action("set_filter", signature![Todos, SetFilter])
            .finish()
            .expect("well-formed class");

        let list = Instance::new(List::default());
        assert!(class.is_destroyed(&list));

        assert!(class.attach(&list));
        assert_eq!(class.subscription_count(&list), 2);
        assert_eq!(list.borrow().items, vec!["milk"]);
        assert_eq!(list.borrow().filter, "all");

        assert!(class.action_type("set_filter").expect("recorded").is::<SetFilter>());
        assert_eq!(class.handlers_for::<AddTodo>(), vec!["add"]);
        assert_eq!(class.actions().map(|a| a.len()), Some(2));

        assert!(class.detach(&list));
        assert_eq!(class.binding_state(&list), BindingState::Unbound);
    }

    #[test]
    fn malformed_action_registers_nothing() {
        #[derive(Default)]
        struct Broken {
            filter: String,
        }

        let store = todos();
        let err = define::<Broken>()
            .bind(
                "filter",
                &store,
                &selector(|s: &Todos| s.filter.clone()),
                Member::field(|b: &mut Broken| &mut b.filter),
            )
            .action("ok", signature![Todos, AddTodo])
            .action("bad", signature![Todos])
            .finish()
            .expect_err("one-parameter handler");

        assert!(matches!(
            err,
            BindError::SignatureViolation { method: "bad", declared: 1, .. }
        ));
        assert!(binding_registry::<Broken>().is_none());
        assert!(actions::action_registry::<Broken>().is_none());
    }

    #[test]
    fn activate_attaches_shared_instance() {
        #[derive(Default)]
        struct Toolbar {
            filter: String,
        }

        let store = todos();
        let shared = Instance::new(Toolbar::default());
        let class = define::<Toolbar>()
            .bind(
                "filter",
                &store,
                &selector(|s: &Todos| s.filter.clone()),
                Member::field(|t: &mut Toolbar| &mut t.filter),
            )
            .activate(&shared)
            .finish()
            .expect("well-formed class");

        assert_eq!(class.binding_state(&shared), BindingState::Bound);
        store.update(|s| s.filter = "done".into());
        assert_eq!(shared.borrow().filter, "done");
    }

    #[test]
    fn scoped_attach_through_class() {
        #[derive(Default)]
        struct Footer {
            total: usize,
        }

        let store = todos();
        let class = define::<Footer>()
            .bind(
                "total",
                &store,
                &selector(|s: &Todos| s.items.len()),
                Member::field(|f: &mut Footer| &mut f.total),
            )
            .finish()
            .expect("well-formed class");

        let footer = Instance::new(Footer::default());
        {
            let _guard = class.attach_scoped(&footer);
            store.update(|s| s.items.push("eggs".into()));
            assert_eq!(footer.borrow().total, 2);
        }

        store.update(|s| s.items.push("tea".into()));
        assert_eq!(footer.borrow().total, 2);
        assert!(class.is_destroyed(&footer));
    }

    #[test]
    fn class_handle_is_copy_and_named() {
        struct Named;
        let class = define::<Named>().finish().expect("empty class");
        let copy = class;
        assert!(class.name().ends_with("Named"));
        assert_eq!(copy.name(), class.name());
        assert!(class.bindings().is_none());
    }
}
