// ============================================================================
// spark-rx - Primitives Module
// Building blocks: reactive cell, lifecycle scope, aggregate, composition API
// ============================================================================

pub mod aggregate;
pub mod cell;
pub mod composition;
pub mod scope;

// Re-export for convenience
pub use aggregate::DisposableAggregate;
pub use cell::{create_ref, watch_as_observable, Change, ReadonlyRef, Ref};
pub use composition::{
    rx_init_subject_callback, subscribe_to, use_observable, use_observable_or, use_subscription,
    SubjectCallback,
};
pub use scope::{get_current_scope, lifecycle_scope, on_before_unmount, LifecycleScope, UnmountFn};
