// ============================================================================
// spark-rx - Reactive Stream Bindings for Components
// ============================================================================
//
// Binds push-based streams to component state. A component declares streams;
// their latest values land in instance properties (or reactive cells) and
// every subscription is released exactly once when the instance unmounts.
//
// Layers, leaves first:
// - stream:     the Observable contract (Stream, Subject, Subscription)
// - primitives: reactive cell, lifecycle scope, disposable aggregate and
//               the composition API (use_observable, use_subscription, ...)
// - component:  instances, typed options, lifecycle mixin, forced refresh
// - plugin:     explicit installation on a host
// ============================================================================

#[macro_use]
mod macros;

pub mod component;
pub mod core;
pub mod plugin;
pub mod primitives;
pub mod stream;

// Re-export core items at crate root for ergonomic access
pub use core::constants;
pub use core::context::{current_instance, with_context, with_current_instance, RxContext};
pub use core::error::{InvalidReason, Result, RxError};
pub use core::types::{CompleteFn, ErrorFn, NextFn, StreamError, Unsubscribable};

// Stream contract
pub use stream::{
    empty, never, of, throw_error, Observable, Observer, Stream, Subject, Subscriber, Subscription,
    Teardown,
};

// Primitives and the composition API
pub use primitives::aggregate::DisposableAggregate;
pub use primitives::cell::{create_ref, watch_as_observable, Change, ReadonlyRef, Ref};
pub use primitives::composition::{
    rx_init_subject_callback, subscribe_to, use_observable, use_observable_or, use_subscription,
    SubjectCallback,
};
pub use primitives::scope::{
    get_current_scope, lifecycle_scope, on_before_unmount, LifecycleScope, UnmountFn,
};

// Components
pub use component::bindings::{Binding, BindingSet, Checked, Declared, ErasedObservable};
pub use component::host::App;
pub use component::instance::{
    ComponentInstance, Diagnostic, HostUpdater, InstanceId, LifecycleState, RenderKey, RenderNode,
    WeakInstance,
};
pub use component::lifecycle::{LifecycleHooks, RxMixin};
pub use component::options::{
    merge_subscriptions, DomStream, MethodStream, RxOptions, Subscriptions, SubscriptionsFactory,
};
pub use component::refresh::{force_refresh, RefreshOutcome, RefreshTarget};

// Plugin
pub use plugin::{install, MergeStrategy, PluginHost, RxPlugin};

// =============================================================================
// TESTS
// =============================================================================
