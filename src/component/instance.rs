// ============================================================================
// spark-rx - Component Instance
// The host-side handle bindings write into
// ============================================================================
//
// An instance is a bag of dynamically typed properties plus the lifecycle
// state the binding layer needs: the subscription aggregate, the registry of
// declared observables, a method table, diagnostics, and the render handles
// the forced-refresh fallback can re-key.
//
// Bindings hold a WeakInstance so an instance is never kept alive by its own
// subscriptions.
// ============================================================================

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::component::bindings::Declared;
use crate::core::constants::*;
use crate::core::context::with_current_instance;
use crate::core::error::{Result, RxError};
use crate::primitives::aggregate::DisposableAggregate;
use crate::primitives::scope::{lifecycle_scope, LifecycleScope};
use crate::stream::{Observable, Observer, Subscription};

// =============================================================================
// IDENTITY
// =============================================================================

/// Process-unique instance identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        InstanceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Created,
    Active,
    TornDown,
}

// =============================================================================
// RENDER HANDLES
// =============================================================================

/// Render-identity token. A fresh key forces the host to rebuild the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey(Uuid);

impl RenderKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RenderKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A node of the host's render tree, as far as keying goes.
///
/// Cloning shares the node.
#[derive(Debug, Clone, Default)]
pub struct RenderNode {
    key: Rc<Cell<Option<RenderKey>>>,
}

impl RenderNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<RenderKey> {
        self.key.get()
    }

    pub fn set_key(&self, key: RenderKey) {
        self.key.set(Some(key));
    }
}

/// The host's primary refresh. An `Err` or a panic makes the caller fall
/// back to re-keying.
pub type HostUpdater = Rc<dyn Fn() -> Result<()>>;

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// A non-fatal problem found while wiring an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub component: String,
    pub instance: InstanceId,
    pub key: String,
    pub error: RxError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.component, self.instance, self.error)
    }
}

// =============================================================================
// INSTANCE INNER
// =============================================================================

type MethodFn<A> = Rc<dyn Fn(&ComponentInstance, A)>;

struct InstanceInner {
    id: InstanceId,
    name: String,
    flags: Cell<u32>,

    /// `None` marks a declared but undefined property
    properties: RefCell<HashMap<String, Option<Rc<dyn Any>>>>,

    /// Every declared binding, valid or not, in declaration order
    observables: RefCell<Vec<(String, Declared)>>,

    /// Values are `MethodFn<A>` for the argument type the method was defined with
    methods: RefCell<HashMap<String, Rc<dyn Any>>>,

    aggregate: RefCell<Option<DisposableAggregate>>,
    diagnostics: RefCell<Vec<Diagnostic>>,

    vnode: RefCell<Option<RenderNode>>,
    sub_tree: RefCell<Option<RenderNode>>,
    updater: RefCell<Option<HostUpdater>>,
    update_count: Cell<u64>,

    scope: LifecycleScope,
}

// =============================================================================
// COMPONENT INSTANCE
// =============================================================================

/// Shared handle to one component instance.
///
/// # Example
///
/// ```
/// use spark_rx::ComponentInstance;
///
/// let instance = ComponentInstance::new("Counter");
/// instance.set_property("count", 3);
/// assert_eq!(instance.get::<i32>("count"), Some(3));
/// assert!(!instance.is_undefined("count"));
/// ```
#[derive(Clone)]
pub struct ComponentInstance {
    inner: Rc<InstanceInner>,
}

impl ComponentInstance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                id: InstanceId::next(),
                name: name.into(),
                flags: Cell::new(UNINITIALIZED),
                properties: RefCell::new(HashMap::new()),
                observables: RefCell::new(Vec::new()),
                methods: RefCell::new(HashMap::new()),
                aggregate: RefCell::new(None),
                diagnostics: RefCell::new(Vec::new()),
                vnode: RefCell::new(None),
                sub_tree: RefCell::new(None),
                updater: RefCell::new(None),
                update_count: Cell::new(0),
                scope: lifecycle_scope(true),
            }),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &ComponentInstance) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Lifecycle state
    // -------------------------------------------------------------------------

    pub fn state(&self) -> LifecycleState {
        let flags = self.inner.flags.get();
        if flags & TORN_DOWN != 0 {
            LifecycleState::TornDown
        } else if flags & ACTIVE != 0 {
            LifecycleState::Active
        } else if flags & CREATED != 0 {
            LifecycleState::Created
        } else {
            LifecycleState::Uninitialized
        }
    }

    pub(crate) fn has_flag(&self, flag: u32) -> bool {
        self.inner.flags.get() & flag != 0
    }

    /// Replace the lifecycle bits, keeping any others.
    pub(crate) fn set_lifecycle(&self, state: u32) {
        let flags = self.inner.flags.get();
        self.inner.flags.set((flags & LIFECYCLE_MASK) | state);
    }

    /// The scope standalone bindings opened during `setup` register with.
    pub fn scope(&self) -> &LifecycleScope {
        &self.inner.scope
    }

    /// Run a setup function with this instance current and its scope active.
    ///
    /// Returns `None` once the instance is torn down.
    pub fn setup<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        with_current_instance(self, || self.inner.scope.run(f))
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    /// Clone a property out, if it is defined and of type `T`.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let value = self.inner.properties.borrow().get(key).cloned().flatten()?;
        value.downcast_ref::<T>().cloned()
    }

    pub fn set_property<T: 'static>(&self, key: &str, value: T) {
        self.set_erased(key, Rc::new(value));
    }

    pub(crate) fn set_erased(&self, key: &str, value: Rc<dyn Any>) {
        self.inner
            .properties
            .borrow_mut()
            .insert(key.to_string(), Some(value));
    }

    /// Declare `key` with no value.
    pub fn set_undefined(&self, key: &str) {
        self.inner.properties.borrow_mut().insert(key.to_string(), None);
    }

    /// Declared but never assigned.
    pub fn is_undefined(&self, key: &str) -> bool {
        matches!(self.inner.properties.borrow().get(key), Some(None))
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.inner.properties.borrow().contains_key(key)
    }

    // -------------------------------------------------------------------------
    // Declared observables
    // -------------------------------------------------------------------------

    pub(crate) fn record_observable(&self, key: &str, declared: Declared) {
        let mut observables = self.inner.observables.borrow_mut();
        observables.retain(|(k, _)| k != key);
        observables.push((key.to_string(), declared));
    }

    /// The value declared for `key` in `subscriptions`, valid or not.
    pub fn declared_observable(&self, key: &str) -> Option<Declared> {
        self.inner
            .observables
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, d)| d.clone())
    }

    /// Declared keys in declaration order.
    pub fn observable_keys(&self) -> Vec<String> {
        self.inner
            .observables
            .borrow()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Methods
    // -------------------------------------------------------------------------

    /// Define (or replace) a method taking `A`.
    pub fn define_method<A: 'static>(&self, name: &str, f: impl Fn(&ComponentInstance, A) + 'static) {
        let method: MethodFn<A> = Rc::new(f);
        self.inner
            .methods
            .borrow_mut()
            .insert(name.to_string(), Rc::new(method));
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.inner.methods.borrow().contains_key(name)
    }

    /// Invoke a method by name.
    ///
    /// # Errors
    ///
    /// `MethodNotFound` if no such method exists, `MethodSignature` if it was
    /// defined for a different argument type.
    pub fn call<A: 'static>(&self, name: &str, args: A) -> Result<()> {
        let entry = self
            .inner
            .methods
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RxError::MethodNotFound {
                name: name.to_string(),
            })?;
        let method = entry
            .downcast_ref::<MethodFn<A>>()
            .cloned()
            .ok_or_else(|| RxError::MethodSignature {
                name: name.to_string(),
                expected: type_name::<A>(),
            })?;
        method(self, args);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// The aggregate, if bindings or `subscribe_to` created one.
    pub fn aggregate(&self) -> Option<DisposableAggregate> {
        self.inner.aggregate.borrow().clone()
    }

    pub(crate) fn ensure_aggregate(&self) -> DisposableAggregate {
        self.inner
            .aggregate
            .borrow_mut()
            .get_or_insert_with(DisposableAggregate::new)
            .clone()
    }

    /// Subscribe and release with this instance's other bindings on unmount.
    ///
    /// After teardown nothing is subscribed and a closed subscription is
    /// returned.
    pub fn subscribe_to<T: 'static>(&self, observable: &impl Observable<T>, observer: Observer<T>) -> Subscription {
        if self.has_flag(TORN_DOWN) {
            tracing::warn!(component = %self.name(), instance = %self.id(), "subscribe_to() on a torn-down instance");
            return Subscription::closed();
        }
        let subscription = observable.subscribe(observer);
        self.ensure_aggregate().add(subscription.clone());
        subscription
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    pub(crate) fn report(&self, key: &str, error: RxError) {
        self.inner.diagnostics.borrow_mut().push(Diagnostic {
            component: self.name().to_string(),
            instance: self.id(),
            key: key.to_string(),
            error,
        });
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.diagnostics.borrow().clone()
    }

    // -------------------------------------------------------------------------
    // Render tree
    // -------------------------------------------------------------------------

    /// The node representing this instance in its parent's tree.
    pub fn vnode(&self) -> Option<RenderNode> {
        self.inner.vnode.borrow().clone()
    }

    pub(crate) fn attach_vnode(&self, vnode: RenderNode) {
        *self.inner.vnode.borrow_mut() = Some(vnode);
    }

    /// The root of this instance's rendered output, once mounted.
    pub fn sub_tree(&self) -> Option<RenderNode> {
        self.inner.sub_tree.borrow().clone()
    }

    pub(crate) fn attach_render(&self, sub_tree: RenderNode, updater: HostUpdater) {
        *self.inner.sub_tree.borrow_mut() = Some(sub_tree);
        *self.inner.updater.borrow_mut() = Some(updater);
    }

    pub(crate) fn detach_updater(&self) {
        self.inner.updater.borrow_mut().take();
    }

    /// Whether the host's primary refresh can be attempted.
    pub fn is_render_ready(&self) -> bool {
        self.has_flag(ACTIVE) && self.inner.updater.borrow().is_some()
    }

    pub(crate) fn updater(&self) -> Option<HostUpdater> {
        self.inner.updater.borrow().clone()
    }

    pub(crate) fn bump_update_count(&self) {
        self.inner.update_count.set(self.inner.update_count.get() + 1);
    }

    /// Successful primary refreshes so far.
    pub fn update_count(&self) -> u64 {
        self.inner.update_count.get()
    }
}

impl PartialEq for ComponentInstance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// WEAK INSTANCE
// =============================================================================

/// Non-owning handle, held by binding callbacks.
#[derive(Clone)]
pub struct WeakInstance {
    inner: Weak<InstanceInner>,
}

impl WeakInstance {
    pub fn upgrade(&self) -> Option<ComponentInstance> {
        self.inner.upgrade().map(|inner| ComponentInstance { inner })
    }
}

impl fmt::Debug for WeakInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakInstance")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::current_instance;
    use crate::primitives::scope::get_current_scope;
    use crate::stream::{of, Subject};

    #[test]
    fn ids_are_unique() {
        let a = ComponentInstance::new("A");
        let b = ComponentInstance::new("A");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let here = ComponentInstance::new("Main").id();
        let there = std::thread::spawn(|| ComponentInstance::new("Worker").id())
            .join()
            .unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn property_states() {
        let instance = ComponentInstance::new("Props");
        assert!(!instance.has_property("count"));

        instance.set_undefined("count");
        assert!(instance.has_property("count"));
        assert!(instance.is_undefined("count"));
        assert_eq!(instance.get::<i32>("count"), None);

        instance.set_property("count", 4);
        assert_eq!(instance.get::<i32>("count"), Some(4));
        assert_eq!(instance.get::<String>("count"), None, "wrong type reads as absent");
    }

    #[test]
    fn call_reports_missing_and_mistyped_methods() {
        let instance = ComponentInstance::new("Methods");
        let total = Rc::new(Cell::new(0));
        let sink = total.clone();
        instance.define_method("add", move |_, n: i32| sink.set(sink.get() + n));

        assert_eq!(instance.call("add", 2), Ok(()));
        assert_eq!(total.get(), 2);
        assert_eq!(
            instance.call("nope", 1),
            Err(RxError::MethodNotFound { name: "nope".into() })
        );
        assert!(matches!(
            instance.call("add", "two"),
            Err(RxError::MethodSignature { .. })
        ));
    }

    #[test]
    fn subscribe_to_creates_aggregate_lazily() {
        let instance = ComponentInstance::new("Lazy");
        assert!(instance.aggregate().is_none());

        let subject = Subject::<i32>::new();
        instance.subscribe_to(&subject, Observer::new());
        let aggregate = instance.aggregate().expect("created on first use");
        assert_eq!(aggregate.len(), 1);

        aggregate.dispose_all();
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn subscribe_to_after_teardown_closes_immediately() {
        let instance = ComponentInstance::new("Late");
        instance.set_lifecycle(TORN_DOWN);
        let subject = Subject::<i32>::new();
        let sub = instance.subscribe_to(&subject, Observer::new());
        assert!(sub.is_closed());
        assert_eq!(subject.observer_count(), 0);

        // Synchronous sources must not deliver either
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        let sub = instance.subscribe_to(&of([1, 2, 3]), Observer::new().on_next(move |v| sink.borrow_mut().push(v)));
        assert!(sub.is_closed());
        assert!(received.borrow().is_empty());
        assert!(instance.aggregate().is_none());
    }

    #[test]
    fn setup_makes_instance_and_scope_current() {
        let instance = ComponentInstance::new("Setup");
        let seen = instance
            .setup(|| {
                let scope_matches = get_current_scope().is_some_and(|s| s.ptr_eq(instance.scope()));
                (current_instance().map(|i| i.id()), scope_matches)
            })
            .unwrap();
        assert_eq!(seen, (Some(instance.id()), true));
    }

    #[test]
    fn lifecycle_bits_replace_each_other() {
        let instance = ComponentInstance::new("States");
        assert_eq!(instance.state(), LifecycleState::Uninitialized);
        instance.set_lifecycle(CREATED);
        assert_eq!(instance.state(), LifecycleState::Created);
        instance.set_lifecycle(CREATED | ACTIVE);
        assert_eq!(instance.state(), LifecycleState::Active);
        instance.set_lifecycle(TORN_DOWN);
        assert_eq!(instance.state(), LifecycleState::TornDown);
    }

    #[test]
    fn weak_handle_does_not_keep_instance_alive() {
        let instance = ComponentInstance::new("Weak");
        let weak = instance.downgrade();
        assert!(weak.upgrade().is_some());
        drop(instance);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn render_keys_are_fresh() {
        let node = RenderNode::new();
        assert_eq!(node.key(), None);
        let first = RenderKey::new();
        node.set_key(first);
        node.set_key(RenderKey::new());
        assert_ne!(node.key(), Some(first));
    }
}
