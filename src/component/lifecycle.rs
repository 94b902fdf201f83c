// ============================================================================
// spark-rx - Lifecycle Integration
// Wire declared streams on `created`, release them on `before_unmount`
// ============================================================================
//
// created:
//   1. each dom stream property gets a new Subject
//   2. each observable method gets its forwarding method and stream property
//   3. subscriptions are resolved (factory called with the instance)
//   4. the instance aggregate is created
//   5. each entry: property set undefined, declaration recorded, then either
//      bound (valid) or reported and skipped (invalid)
//
// before_unmount: dispose the aggregate, if any. Safe to repeat.
// ============================================================================

use crate::component::bindings::Checked;
use crate::component::instance::ComponentInstance;
use crate::component::options::RxOptions;
use crate::core::constants::*;
use crate::core::error::RxError;

/// Hooks a host calls at fixed points of every instance's life.
pub trait LifecycleHooks {
    fn created(&self, instance: &ComponentInstance, options: &RxOptions);

    fn before_unmount(&self, instance: &ComponentInstance);
}

/// The stream binding mixin.
#[derive(Debug, Default, Clone, Copy)]
pub struct RxMixin;

impl RxMixin {
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleHooks for RxMixin {
    fn created(&self, instance: &ComponentInstance, options: &RxOptions) {
        if instance.has_flag(CREATED | ACTIVE | TORN_DOWN) {
            tracing::warn!(component = %instance.name(), instance = %instance.id(), "created() called twice; ignored");
            return;
        }

        for dom_stream in options.dom_streams() {
            dom_stream.install(instance);
        }

        for method in options.method_streams() {
            method.install(instance);
        }

        if let Some(subscriptions) = options.subscriptions_option() {
            let set = subscriptions.resolve(instance);
            let aggregate = instance.ensure_aggregate();

            for binding in set.iter() {
                instance.set_undefined(&binding.key);
                instance.record_observable(&binding.key, binding.declared.clone());

                match &binding.checked {
                    Checked::Valid(observable) => {
                        aggregate.add(observable.bind_into(instance, &binding.key));
                    }
                    Checked::Invalid(reason) => {
                        let error = RxError::InvalidObservable {
                            key: binding.key.clone(),
                            reason: reason.clone(),
                        };
                        tracing::warn!(component = %instance.name(), instance = %instance.id(), key = %binding.key, "{error}");
                        instance.report(&binding.key, error);
                    }
                }
            }

            tracing::debug!(
                component = %instance.name(),
                instance = %instance.id(),
                bound = aggregate.len(),
                declared = set.len(),
                "subscriptions wired"
            );
        }

        instance.set_lifecycle(CREATED);
    }

    fn before_unmount(&self, instance: &ComponentInstance) {
        if let Some(aggregate) = instance.aggregate() {
            if !aggregate.is_disposed() {
                tracing::debug!(component = %instance.name(), instance = %instance.id(), members = aggregate.len(), "releasing subscriptions");
            }
            aggregate.dispose_all();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
