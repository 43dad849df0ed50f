// ============================================================================
// spark-reflux - Equality Functions
// Distinct-filter predicates for selections
// ============================================================================
//
// A selection only emits when its projected value differs from the previous
// emission. These functions decide what "differs" means.
// ============================================================================

use crate::core::types::EqualsFn;

// =============================================================================
// STRICT EQUALITY (Default)
// =============================================================================

/// Default strict equality using PartialEq.
/// This is the default for `Store::select`.
///
/// # Example
/// ```
/// use spark_reflux::reactivity::equality::equals;
///
/// assert!(equals(&42, &42));
/// assert!(!equals(&42, &43));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// SAFE EQUALITY (Handles NaN)
// =============================================================================

/// Safe equality for f64 values.
/// NaN == NaN returns true, so a NaN projection does not re-emit forever.
///
/// # Example
/// ```
/// use spark_reflux::reactivity::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(&1.0, &1.0));
/// assert!(!safe_equals_f64(&1.0, &2.0));
/// assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
/// ```
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

/// Safe equality for f32 values.
pub fn safe_equals_f32(a: &f32, b: &f32) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

// =============================================================================
// FACTORY FUNCTIONS
// =============================================================================

/// Never equal - every state emission is forwarded, even when the projected
/// value did not change.
///
/// # Example
/// ```
/// use spark_reflux::reactivity::equality::never_equals;
///
/// assert!(!never_equals(&42, &42));
/// ```
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

/// Always equal - only the replayed value is delivered, never an update.
pub fn always_equals<T>(_a: &T, _b: &T) -> bool {
    true
}

/// Compare two values by a projected key.
///
/// The result captures `field_fn`, so it is not an [`EqualsFn`]; hand it to
/// [`Store::select_by`](crate::Store::select_by).
///
/// # Example
/// ```
/// use spark_reflux::reactivity::equality::by_field;
///
/// struct User { id: u32, name: String }
///
/// let same_user = by_field(|u: &User| u.id);
/// let a = User { id: 1, name: "Alice".into() };
/// let b = User { id: 1, name: "Alicia".into() };
/// assert!(same_user(&a, &b));
/// ```
pub fn by_field<T, F, R>(field_fn: F) -> impl Fn(&T, &T) -> bool
where
    F: Fn(&T) -> R,
    R: PartialEq,
{
    move |a, b| field_fn(a) == field_fn(b)
}

// =============================================================================
// EQUALITY FUNCTION CONSTRUCTORS (for EqualsFn<T>)
// =============================================================================

/// Get the default equality function for a type.
pub fn default_equals_fn<T: PartialEq + 'static>() -> EqualsFn<T> {
    equals
}

/// Get the never-equals function for a type.
pub fn never_equals_fn<T: 'static>() -> EqualsFn<T> {
    never_equals
}

/// Get the always-equals function for a type.
pub fn always_equals_fn<T: 'static>() -> EqualsFn<T> {
    always_equals
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals() {
        assert!(equals(&42, &42));
        assert!(!equals(&42, &43));
        assert!(equals(&"hello", &"hello"));
    }

    #[test]
    fn test_safe_equals_nan() {
        assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
        assert!(!safe_equals_f64(&f64::NAN, &1.0));
        assert!(!safe_equals_f64(&1.0, &f64::NAN));
        assert!(safe_equals_f32(&f32::NAN, &f32::NAN));
        assert!(!safe_equals_f32(&f32::NAN, &1.0));
    }

    #[test]
    fn test_safe_equals_regular_values() {
        assert!(safe_equals_f64(&-0.0, &0.0));
        assert!(!safe_equals_f64(&f64::INFINITY, &f64::NEG_INFINITY));
        assert!(safe_equals_f32(&2.5, &2.5));
    }

    #[test]
    fn test_never_and_always() {
        assert!(!never_equals(&"same", &"same"));
        assert!(always_equals(&1, &2));
    }

    #[test]
    fn test_by_field() {
        #[derive(Clone)]
        struct Todo {
            id: u32,
            done: bool,
        }

        let eq_by_id = by_field(|t: &Todo| t.id);
        let open = Todo { id: 1, done: false };
        let closed = Todo { id: 1, done: true };
        let other = Todo { id: 2, done: false };

        assert!(eq_by_id(&open, &closed));
        assert!(!eq_by_id(&open, &other));
        assert_ne!(open.done, closed.done);
    }

    #[test]
    fn test_equality_fn_constructors() {
        let eq: EqualsFn<i32> = default_equals_fn();
        assert!(eq(&42, &42));

        let never: EqualsFn<i32> = never_equals_fn();
        assert!(!never(&42, &42));

        let always: EqualsFn<i32> = always_equals_fn();
        assert!(always(&42, &43));
    }
}
