// ============================================================================
// spark-reflux - Primitives Module
// Store, selectors, subscriptions, instances, and the binder
// ============================================================================

pub mod bind;
pub mod instance;
pub mod selector;
pub mod store;
pub mod subscription;

// Re-export for convenience
pub use bind::bind;
pub use instance::{Instance, WeakInstance};
pub use selector::{selector, Replay, SelectOptions, Selection, Selector};
pub use store::Store;
pub use subscription::{Subscription, TeardownFn};
