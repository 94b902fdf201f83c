// ============================================================================
// spark-rx - Component Module
// Instances, stream declarations, lifecycle wiring and the host driver
// ============================================================================

pub mod bindings;
pub mod host;
pub mod instance;
pub mod lifecycle;
pub mod options;
pub mod refresh;

pub use bindings::{Binding, BindingSet, Checked, Declared, ErasedObservable};
pub use host::App;
pub use instance::{
    ComponentInstance, Diagnostic, HostUpdater, InstanceId, LifecycleState, RenderKey, RenderNode,
    WeakInstance,
};
pub use lifecycle::{LifecycleHooks, RxMixin};
pub use options::{merge_subscriptions, DomStream, MethodStream, RxOptions, Subscriptions, SubscriptionsFactory};
pub use refresh::{force_refresh, RefreshOutcome, RefreshTarget};
