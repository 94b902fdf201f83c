// ============================================================================
// spark-rx - Core Module
// Flags, shared types, errors and the thread-local instance context
// ============================================================================

pub mod constants;
pub mod context;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use context::{current_instance, with_context, with_current_instance, RxContext};
pub use error::{Result, RxError};
pub use types::{CompleteFn, ErrorFn, NextFn, StreamError, Unsubscribable};
