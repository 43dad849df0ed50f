// ============================================================================
// spark-reflux - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// Handy for store handles captured by delivery callbacks.
///
/// # Usage
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spark_reflux::{cloned, selector, Store};
///
/// let store = Store::new(1);
/// let seen = Rc::new(Cell::new(0));
///
/// let _sub = store
///     .select(&selector(|n: &i32| *n))
///     .subscribe(cloned!(seen => move |n| seen.set(n)));
///
/// store.set(4);
/// assert_eq!(seen.get(), 4);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Build a [`Signature`](crate::Signature) from a list of parameter types.
///
/// The receiver is not listed: `fn reduce(&self, s: State, a: &Add)` is
/// `signature![State, Add]`.
///
/// # Usage
///
/// ```rust
/// use spark_reflux::signature;
///
/// struct State;
/// struct Add;
///
/// let sig = signature![State, Add];
/// assert_eq!(sig.len(), 2);
/// assert!(sig.param(1).unwrap().is::<Add>());
/// assert!(signature![].is_empty());
/// ```
#[macro_export]
macro_rules! signature {
    () => {
        $crate::Signature::default()
    };
    ($($ty:ty),+ $(,)?) => {
        $crate::Signature::new(vec![$( $crate::ParamType::of::<$ty>() ),+])
    };
}

/// Field member for `Class.field`, i.e. `Member::field(|c| &mut c.field)`.
///
/// # Usage
///
/// ```rust
/// use spark_reflux::{bind_field, Member};
///
/// struct Badge { count: i32 }
///
/// let member: Member<Badge, i32> = bind_field!(Badge, count);
/// let mut badge = Badge { count: 0 };
/// member.deliver(&mut badge, 3);
/// assert_eq!(badge.count, 3);
/// ```
#[macro_export]
macro_rules! bind_field {
    ($class:ty, $field:ident) => {
        $crate::Member::field(|target: &mut $class| &mut target.$field)
    };
}
