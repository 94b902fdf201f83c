// ============================================================================
// spark-rx - Instance Context
// Thread-local stack of the component instances whose hooks are running
// ============================================================================

use std::cell::RefCell;

use crate::component::instance::{ComponentInstance, WeakInstance};

// =============================================================================
// RX CONTEXT
// =============================================================================

/// Thread-local state for the binding layer.
///
/// Holds the stack of instances whose lifecycle hooks are currently
/// executing. The top of the stack is the "current instance" the
/// forced-refresh fallback consults first.
pub struct RxContext {
    /// Instances whose hooks are running, innermost last
    instance_stack: RefCell<Vec<WeakInstance>>,
}

impl RxContext {
    pub fn new() -> Self {
        Self {
            instance_stack: RefCell::new(Vec::new()),
        }
    }

    pub fn push_instance(&self, instance: WeakInstance) {
        self.instance_stack.borrow_mut().push(instance);
    }

    pub fn pop_instance(&self) -> Option<WeakInstance> {
        self.instance_stack.borrow_mut().pop()
    }

    /// The innermost live instance, if any.
    pub fn current_instance(&self) -> Option<ComponentInstance> {
        self.instance_stack.borrow().last().and_then(|w| w.upgrade())
    }

    pub fn depth(&self) -> usize {
        self.instance_stack.borrow().len()
    }
}

impl Default for RxContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: RxContext = RxContext::new();
}

/// Access the thread-local context.
pub fn with_context<R>(f: impl FnOnce(&RxContext) -> R) -> R {
    CONTEXT.with(f)
}

/// The instance whose hook is currently running, if any.
pub fn current_instance() -> Option<ComponentInstance> {
    with_context(|ctx| ctx.current_instance())
}

/// Pops the instance stack even if the hook panics.
struct InstanceGuard;

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        with_context(|ctx| {
            ctx.pop_instance();
        });
    }
}

/// Run `f` with `instance` as the current instance.
pub fn with_current_instance<R>(instance: &ComponentInstance, f: impl FnOnce() -> R) -> R {
    with_context(|ctx| ctx.push_instance(instance.downgrade()));
    let _guard = InstanceGuard;
    f()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_current_instance_by_default() {
        assert!(current_instance().is_none());
        assert_eq!(with_context(|ctx| ctx.depth()), 0);
    }

    #[test]
    fn nested_instances_restore_outer() {
        let outer = ComponentInstance::new("Outer");
        let inner = ComponentInstance::new("Inner");

        with_current_instance(&outer, || {
            assert_eq!(current_instance().map(|i| i.id()), Some(outer.id()));

            with_current_instance(&inner, || {
                assert_eq!(current_instance().map(|i| i.id()), Some(inner.id()));
            });

            assert_eq!(current_instance().map(|i| i.id()), Some(outer.id()));
        });

        assert!(current_instance().is_none());
    }

    #[test]
    fn stack_unwinds_on_panic() {
        let instance = ComponentInstance::new("Panicky");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_current_instance(&instance, || panic!("hook failed"));
        }));

        assert!(result.is_err());
        assert!(current_instance().is_none());
    }
}
