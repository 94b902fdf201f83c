// ============================================================================
// spark-rx - Host Driver
// A minimal host: plugin registry plus instance lifecycle driving
// ============================================================================
//
// create_instance -> (setup) -> mixins' created -> CREATED
// mount           -> render tree + updater       -> ACTIVE
// unmount         -> mixins' before_unmount, scope stopped -> TORN_DOWN
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::component::instance::{ComponentInstance, RenderNode};
use crate::component::lifecycle::LifecycleHooks;
use crate::component::options::RxOptions;
use crate::core::constants::*;
use crate::core::context::with_current_instance;
use crate::core::error::Result;
use crate::plugin::{MergeStrategy, PluginHost};

/// Drives component instances through their lifecycle.
///
/// # Example
///
/// ```
/// use spark_rx::{bindings, install, App, RxOptions, Subject};
///
/// let mut app = App::new();
/// install(&mut app);
///
/// let ticks = Subject::new();
/// let options = RxOptions::new().subscriptions(bindings! { "tick" => ticks.clone() });
/// let clock = app.create_instance("Clock", &options);
///
/// ticks.next(1_u64);
/// assert_eq!(clock.get::<u64>("tick"), Some(1));
///
/// app.unmount(&clock);
/// ticks.next(2);
/// assert_eq!(clock.get::<u64>("tick"), Some(1));
/// ```
#[derive(Default)]
pub struct App {
    mixins: Vec<Rc<dyn LifecycleHooks>>,
    merge_strategies: HashMap<&'static str, MergeStrategy>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mixin_count(&self) -> usize {
        self.mixins.len()
    }

    /// Combine parent and child options, using any registered strategy for
    /// `subscriptions`.
    pub fn merge_options(&self, parent: &RxOptions, child: &RxOptions) -> RxOptions {
        let mut merged = RxOptions::merge(parent, child);
        if let Some(strategy) = self.merge_strategies.get(SUBSCRIPTIONS_OPTION) {
            merged.replace_subscriptions(strategy(parent.subscriptions_option(), child.subscriptions_option()));
        }
        merged
    }

    /// Create an instance and run every mixin's `created` hook.
    pub fn create_instance(&self, name: impl Into<String>, options: &RxOptions) -> ComponentInstance {
        self.create_instance_with(name, options, |_| {})
    }

    /// Like [`create_instance`](Self::create_instance), running `setup` first
    /// with the instance's lifecycle scope active.
    pub fn create_instance_with(
        &self,
        name: impl Into<String>,
        options: &RxOptions,
        setup: impl FnOnce(&ComponentInstance),
    ) -> ComponentInstance {
        let instance = ComponentInstance::new(name);
        instance.attach_vnode(RenderNode::new());

        instance.setup(|| {
            setup(&instance);
            for mixin in &self.mixins {
                mixin.created(&instance, options);
            }
        });

        instance.set_lifecycle(CREATED);
        tracing::debug!(component = %instance.name(), instance = %instance.id(), "created");
        instance
    }

    /// Give the instance a render tree and the host's primary refresh.
    pub fn mount(&self, instance: &ComponentInstance, updater: impl Fn() -> Result<()> + 'static) {
        if instance.has_flag(TORN_DOWN) {
            tracing::warn!(component = %instance.name(), instance = %instance.id(), "mount() after unmount; ignored");
            return;
        }
        instance.attach_render(RenderNode::new(), Rc::new(updater));
        instance.set_lifecycle(CREATED | ACTIVE);
        tracing::debug!(component = %instance.name(), instance = %instance.id(), "mounted");
    }

    /// Run every mixin's `before_unmount`, then stop the instance scope.
    /// Repeated calls do nothing.
    pub fn unmount(&self, instance: &ComponentInstance) {
        if instance.has_flag(TORN_DOWN) {
            return;
        }

        with_current_instance(instance, || {
            for mixin in &self.mixins {
                mixin.before_unmount(instance);
            }
        });
        instance.scope().stop();
        instance.detach_updater();
        instance.set_lifecycle(TORN_DOWN);
        tracing::debug!(component = %instance.name(), instance = %instance.id(), "unmounted");
    }
}

impl PluginHost for App {
    fn register_mixin(&mut self, mixin: Rc<dyn LifecycleHooks>) {
        self.mixins.push(mixin);
    }

    fn register_merge_strategy(&mut self, option: &'static str, strategy: MergeStrategy) {
        self.merge_strategies.insert(option, strategy);
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("mixins", &self.mixins.len())
            .field("merge_strategies", &self.merge_strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
