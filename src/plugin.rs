// ============================================================================
// spark-rx - Plugin
// Explicit registration with a host
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::component::lifecycle::{LifecycleHooks, RxMixin};
use crate::component::options::{merge_subscriptions, Subscriptions};
use crate::core::constants::SUBSCRIPTIONS_OPTION;

/// How two values of one option are combined when a child extends a parent.
pub type MergeStrategy = fn(Option<&Subscriptions>, Option<&Subscriptions>) -> Option<Subscriptions>;

/// The registry a host exposes to plugins.
pub trait PluginHost {
    fn register_mixin(&mut self, mixin: Rc<dyn LifecycleHooks>);

    fn register_merge_strategy(&mut self, option: &'static str, strategy: MergeStrategy);
}

/// Proof of installation on one host.
pub struct RxPlugin {
    mixin: Rc<RxMixin>,
}

impl RxPlugin {
    /// The mixin registered with the host.
    pub fn mixin(&self) -> Rc<RxMixin> {
        self.mixin.clone()
    }
}

impl fmt::Debug for RxPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RxPlugin").finish_non_exhaustive()
    }
}

/// Register the stream binding mixin and the `subscriptions` merge strategy.
///
/// Call once per host during bootstrap.
///
/// # Example
///
/// ```
/// use spark_rx::{install, App};
///
/// let mut app = App::new();
/// let _rx = install(&mut app);
/// assert_eq!(app.mixin_count(), 1);
/// ```
pub fn install(host: &mut impl PluginHost) -> RxPlugin {
    let mixin = Rc::new(RxMixin::new());
    host.register_mixin(mixin.clone());
    host.register_merge_strategy(SUBSCRIPTIONS_OPTION, merge_subscriptions);
    tracing::debug!("stream bindings installed");
    RxPlugin { mixin }
}
