// ============================================================================
// spark-reflux - Errors
// Definition-time failures raised while declaring a class
// ============================================================================

use crate::core::constants::ACTION_SIGNATURE_HINT;

/// Errors raised while registering bindings or action handlers.
///
/// Lifecycle operations (`attach`/`detach`) and value delivery never fail;
/// only class definition can.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// An action handler declares fewer than two parameters.
    #[error("{hint} (`{class}::{method}` declares {declared} parameter(s))", hint = ACTION_SIGNATURE_HINT)]
    SignatureViolation {
        /// Class the handler was declared on.
        class: &'static str,
        /// Handler method name.
        method: &'static str,
        /// Number of declared parameters.
        declared: usize,
    },
}

/// Result alias for registration calls.
pub type Result<T> = std::result::Result<T, BindError>;
