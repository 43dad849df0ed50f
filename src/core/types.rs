// ============================================================================
// spark-reflux - Type Definitions
// Identity, member and signature types shared by the binding machinery
// ============================================================================

use std::any::{type_name, TypeId};
use std::fmt;

// =============================================================================
// IDENTITY
// =============================================================================

/// Identity of a live object, allocated once per `Instance`.
///
/// Live subscriptions are keyed by this id rather than by class, so two
/// instances of the same class never share a subscription list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) u64);

impl InstanceId {
    /// Raw numeric value (useful for logging).
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a class (a Rust type) in the metadata table.
pub fn class_id<C: 'static>() -> TypeId {
    TypeId::of::<C>()
}

/// Human-readable class name for logs and errors.
pub fn class_name<C: ?Sized>() -> &'static str {
    type_name::<C>()
}

// =============================================================================
// EQUALITY
// =============================================================================

/// Equality function type used for distinct filtering of projected values.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// MEMBER - WHERE A PROJECTED VALUE LANDS
// =============================================================================

/// The member of a target object a binding writes into.
///
/// A `Field` is assigned directly; a `Method` is callable and receives the
/// emitted value as its sole argument.
pub enum Member<C, T> {
    /// Plain data member, assigned on every emission.
    Field(fn(&mut C) -> &mut T),
    /// Setter-style method, invoked on every emission.
    Method(fn(&mut C, T)),
}

impl<C, T> Member<C, T> {
    /// Bind into a field.
    ///
    /// ```
    /// use spark_reflux::Member;
    ///
    /// struct Counter { count: i32 }
    /// let member = Member::field(|c: &mut Counter| &mut c.count);
    /// assert!(!member.is_callable());
    /// ```
    pub fn field(project: fn(&mut C) -> &mut T) -> Self {
        Member::Field(project)
    }

    /// Bind into a setter method.
    pub fn method(setter: fn(&mut C, T)) -> Self {
        Member::Method(setter)
    }

    /// Whether this member is invoked rather than assigned.
    pub fn is_callable(&self) -> bool {
        matches!(self, Member::Method(_))
    }

    /// Deliver one value into the target.
    pub fn deliver(&self, target: &mut C, value: T) {
        match self {
            Member::Method(setter) => setter(target, value),
            Member::Field(project) => *project(target) = value,
        }
    }
}

impl<C, T> Clone for Member<C, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, T> Copy for Member<C, T> {}

impl<C, T> fmt::Debug for Member<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Field(_) => f.write_str("Member::Field"),
            Member::Method(_) => f.write_str("Member::Method"),
        }
    }
}

// =============================================================================
// DECLARED PARAMETERS
// =============================================================================

/// A declared parameter type, as seen by the action registrar.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamType {
    name: &'static str,
    id: TypeId,
}

impl ParamType {
    /// Describe type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// Fully-qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Whether this describes type `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The ordered parameter list a handler declares (receiver excluded).
///
/// Usually built with the [`signature!`](crate::signature) macro.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ParamType>,
}

impl Signature {
    pub fn new(params: Vec<ParamType>) -> Self {
        Self { params }
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Declared type at `index`, if any.
    pub fn param(&self, index: usize) -> Option<ParamType> {
        self.params.get(index).copied()
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }
}

// =============================================================================
// TESTS
// =============================================================================
