// ============================================================================
// spark-rx - Lifecycle Scope
//
// The "before unmount" hook for code that runs outside a component's
// declarative options: composition-style setup functions.
// ============================================================================
//
// A LifecycleScope collects before-unmount cleanups registered while it is
// active. Stopping the scope runs them in reverse order, isolating panics,
// then stops child scopes. Every component instance owns one; standalone
// bindings (use_subscription, use_observable) register their release here.
//
// Key features:
// - run(fn) - Execute function with this scope active
// - stop() - Run cleanups, stop children (idempotent)
// - Nested scopes (child scopes auto-stopped with parent)
// - Detached scopes (opt out of parent collection)
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

// =============================================================================
// THREAD-LOCAL SCOPE STATE
// =============================================================================

thread_local! {
    /// Currently active scope (if any)
    static ACTIVE_SCOPE: RefCell<Option<Rc<LifecycleScopeInner>>> = const { RefCell::new(None) };
}

fn get_active_scope() -> Option<Rc<LifecycleScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.borrow().clone())
}

/// Set the active scope, returning the previous one
fn set_active_scope(scope: Option<Rc<LifecycleScopeInner>>) -> Option<Rc<LifecycleScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.replace(scope))
}

/// Restores the previous active scope, also on unwind.
struct RestoreScope(Option<Option<Rc<LifecycleScopeInner>>>);

impl Drop for RestoreScope {
    fn drop(&mut self) {
        if let Some(prev) = self.0.take() {
            set_active_scope(prev);
        }
    }
}

// =============================================================================
// CLEANUP TYPE
// =============================================================================

/// Cleanup run when the owning scope unmounts
pub type UnmountFn = Box<dyn FnOnce()>;

// =============================================================================
// LIFECYCLE SCOPE INNER
// =============================================================================

pub struct LifecycleScopeInner {
    /// Whether the scope is still active (not stopped)
    active: Cell<bool>,

    /// Cleanups to run on stop
    cleanups: RefCell<Vec<UnmountFn>>,

    /// Parent scope (for nested scopes)
    parent: RefCell<Option<Weak<LifecycleScopeInner>>>,

    /// Child scopes
    scopes: RefCell<Vec<Rc<LifecycleScopeInner>>>,

    /// Self-reference for returning from run()
    self_weak: RefCell<Weak<LifecycleScopeInner>>,
}

impl LifecycleScopeInner {
    fn new(detached: bool) -> Rc<Self> {
        let parent = if detached { None } else { get_active_scope() };

        let scope = Rc::new(Self {
            active: Cell::new(true),
            cleanups: RefCell::new(Vec::new()),
            parent: RefCell::new(parent.as_ref().map(Rc::downgrade)),
            scopes: RefCell::new(Vec::new()),
            self_weak: RefCell::new(Weak::new()),
        });

        *scope.self_weak.borrow_mut() = Rc::downgrade(&scope);

        if let Some(ref parent_scope) = parent {
            parent_scope.scopes.borrow_mut().push(scope.clone());
        }

        scope
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn run<R, F: FnOnce() -> R>(&self, f: F) -> Option<R> {
        if !self.active.get() {
            return None;
        }

        let self_rc = self.self_weak.borrow().upgrade()?;

        let _restore = RestoreScope(Some(set_active_scope(Some(self_rc))));
        Some(f())
    }

    pub fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }

        // Reverse order for proper nesting; a panicking cleanup never blocks the rest
        let cleanups: Vec<_> = self.cleanups.borrow_mut().drain(..).collect();
        let mut faults = 0usize;
        for cleanup in cleanups.into_iter().rev() {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(cleanup)).is_err() {
                faults += 1;
            }
        }
        if faults > 0 {
            tracing::warn!(faults, "before-unmount cleanup panicked");
        }

        let child_scopes: Vec<_> = self.scopes.borrow_mut().drain(..).collect();
        for child in child_scopes {
            child.stop();
        }

        if let Some(parent) = self.parent.borrow().as_ref().and_then(|w| w.upgrade()) {
            if let Some(self_rc) = self.self_weak.borrow().upgrade() {
                parent.scopes.borrow_mut().retain(|s| !Rc::ptr_eq(s, &self_rc));
            }
        }
    }

    pub fn add_cleanup(&self, cleanup: UnmountFn) {
        if self.active.get() {
            self.cleanups.borrow_mut().push(cleanup);
        } else {
            // Already unmounted: release right away
            cleanup();
        }
    }

    fn cleanup_count(&self) -> usize {
        self.cleanups.borrow().len()
    }
}

impl Drop for LifecycleScopeInner {
    fn drop(&mut self) {
        if self.active.get() {
            self.stop();
        }
    }
}

// =============================================================================
// LIFECYCLE SCOPE (Public wrapper)
// =============================================================================

/// A scope whose stop is the "before unmount" moment for everything
/// registered inside it.
///
/// # Example
///
/// ```
/// use spark_rx::{lifecycle_scope, on_before_unmount};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let released = Rc::new(Cell::new(false));
/// let scope = lifecycle_scope(false);
///
/// let flag = released.clone();
/// scope.run(|| on_before_unmount(move || flag.set(true)));
///
/// scope.stop();
/// assert!(released.get());
/// ```
#[derive(Clone)]
pub struct LifecycleScope {
    inner: Rc<LifecycleScopeInner>,
}

impl LifecycleScope {
    fn from_inner(inner: Rc<LifecycleScopeInner>) -> Self {
        Self { inner }
    }

    /// Whether the scope is still active (not stopped)
    pub fn active(&self) -> bool {
        self.inner.is_active()
    }

    /// Run a function within this scope.
    ///
    /// Returns None if the scope has been stopped.
    pub fn run<R, F: FnOnce() -> R>(&self, f: F) -> Option<R> {
        self.inner.run(f)
    }

    /// Run all cleanups (reverse order) and stop child scopes.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Register a cleanup on this scope directly.
    pub fn on_before_unmount(&self, f: impl FnOnce() + 'static) {
        self.inner.add_cleanup(Box::new(f));
    }

    /// Number of cleanups waiting for unmount.
    pub fn cleanup_count(&self) -> usize {
        self.inner.cleanup_count()
    }

    pub fn ptr_eq(&self, other: &LifecycleScope) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Drop for LifecycleScope {
    fn drop(&mut self) {
        // Auto-stop if this is the last strong reference
        if Rc::strong_count(&self.inner) == 1 {
            self.inner.stop();
        }
    }
}

impl std::fmt::Debug for LifecycleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleScope")
            .field("active", &self.active())
            .field("cleanups", &self.cleanup_count())
            .finish()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create a lifecycle scope.
///
/// * `detached` - If true, the scope is not collected by the active parent
pub fn lifecycle_scope(detached: bool) -> LifecycleScope {
    LifecycleScope::from_inner(LifecycleScopeInner::new(detached))
}

/// The currently active scope, if any.
pub fn get_current_scope() -> Option<LifecycleScope> {
    get_active_scope().map(LifecycleScope::from_inner)
}

/// Register a cleanup with the active scope.
///
/// Returns false (and logs a warning) outside of any scope; the caller then
/// owns the release.
pub fn on_before_unmount<F: FnOnce() + 'static>(f: F) -> bool {
    match get_active_scope() {
        Some(scope) => {
            scope.add_cleanup(Box::new(f));
            true
        }
        None => {
            tracing::warn!("on_before_unmount() called outside of a lifecycle scope");
            false
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
