// ============================================================================
// spark-rx - Component Options
// Typed declaration of a component's streams
// ============================================================================
//
// Three optional fields:
// - dom_streams:        properties that each hold a fresh Subject
// - observable_methods: methods whose calls are also published as a stream
// - subscriptions:      property -> stream bindings (static or per instance)
//
// Merging a parent (mixin) with a child takes each field from the child when
// it is set, otherwise from the parent.
// ============================================================================

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use crate::component::bindings::BindingSet;
use crate::component::instance::ComponentInstance;
use crate::core::constants::OBSERVABLE_METHOD_SUFFIX;
use crate::stream::Subject;

// =============================================================================
// DOM STREAMS
// =============================================================================

/// A property initialized with a new `Subject` per instance.
#[derive(Clone)]
pub struct DomStream {
    name: String,
    item_type: &'static str,
    make: Rc<dyn Fn() -> Rc<dyn Any>>,
}

impl DomStream {
    pub fn new<T: Clone + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item_type: type_name::<T>(),
            make: Rc::new(|| Rc::new(Subject::<T>::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn install(&self, instance: &ComponentInstance) {
        instance.set_erased(&self.name, (self.make)());
    }
}

impl fmt::Debug for DomStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomStream")
            .field("name", &self.name)
            .field("item_type", &self.item_type)
            .finish()
    }
}

// =============================================================================
// OBSERVABLE METHODS
// =============================================================================

/// A method `method` whose call arguments are published on the stream held
/// by property `property`.
#[derive(Clone)]
pub struct MethodStream {
    method: String,
    property: String,
    install: Rc<dyn Fn(&ComponentInstance, &str, &str)>,
}

impl MethodStream {
    /// Property named after the method plus `$`.
    pub fn new<A: Clone + 'static>(method: impl Into<String>) -> Self {
        let method = method.into();
        let property = format!("{method}{OBSERVABLE_METHOD_SUFFIX}");
        Self::renamed::<A>(method, property)
    }

    pub fn renamed<A: Clone + 'static>(method: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            property: property.into(),
            install: Rc::new(install_method_stream::<A>),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub(crate) fn install(&self, instance: &ComponentInstance) {
        (self.install)(instance, &self.method, &self.property);
    }
}

/// Define `method` to forward its argument into a subject, and expose that
/// subject as a stream on `property`.
fn install_method_stream<A: Clone + 'static>(instance: &ComponentInstance, method: &str, property: &str) {
    if instance.has_method(method) {
        tracing::warn!(
            component = %instance.name(),
            instance = %instance.id(),
            method,
            "method already defined; replaced by its observable method"
        );
    }

    let calls = Subject::<A>::new();
    let sink = calls.clone();
    instance.define_method(method, move |_, args: A| sink.next(args));
    instance.set_property(property, calls.as_stream());
}

impl fmt::Debug for MethodStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodStream")
            .field("method", &self.method)
            .field("property", &self.property)
            .finish()
    }
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

/// Per-instance binding factory.
pub type SubscriptionsFactory = Rc<dyn Fn(&ComponentInstance) -> BindingSet>;

#[derive(Clone)]
pub enum Subscriptions {
    Static(BindingSet),
    Factory(SubscriptionsFactory),
}

impl Subscriptions {
    /// The bindings for `instance`. A factory runs once per call.
    pub fn resolve(&self, instance: &ComponentInstance) -> BindingSet {
        match self {
            Subscriptions::Static(set) => set.clone(),
            Subscriptions::Factory(factory) => factory(instance),
        }
    }
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscriptions::Static(set) => f.debug_tuple("Static").field(set).finish(),
            Subscriptions::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Merge strategy for `subscriptions`: the child's value wins when present.
pub fn merge_subscriptions(parent: Option<&Subscriptions>, child: Option<&Subscriptions>) -> Option<Subscriptions> {
    child.or(parent).cloned()
}

// =============================================================================
// RX OPTIONS
// =============================================================================

/// Stream declarations of one component.
///
/// # Example
///
/// ```
/// use spark_rx::{bindings, of, RxOptions};
///
/// let options = RxOptions::new()
///     .dom_stream::<u32>("clicks$")
///     .observable_method::<String>("search")
///     .subscriptions(bindings! { "count" => of([0]) });
///
/// assert_eq!(options.dom_streams().len(), 1);
/// assert_eq!(options.method_streams()[0].property(), "search$");
/// assert!(options.has_subscriptions());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RxOptions {
    dom_streams: Option<Vec<DomStream>>,
    observable_methods: Option<Vec<MethodStream>>,
    subscriptions: Option<Subscriptions>,
}

impl RxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dom_stream<T: Clone + 'static>(mut self, name: impl Into<String>) -> Self {
        self.dom_streams
            .get_or_insert_with(Vec::new)
            .push(DomStream::new::<T>(name));
        self
    }

    /// List form: property `method$`.
    pub fn observable_method<A: Clone + 'static>(mut self, method: impl Into<String>) -> Self {
        self.observable_methods
            .get_or_insert_with(Vec::new)
            .push(MethodStream::new::<A>(method));
        self
    }

    /// Rename form: explicit property name.
    pub fn observable_method_as<A: Clone + 'static>(
        mut self,
        method: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        self.observable_methods
            .get_or_insert_with(Vec::new)
            .push(MethodStream::renamed::<A>(method, property));
        self
    }

    pub fn subscriptions(mut self, set: BindingSet) -> Self {
        self.subscriptions = Some(Subscriptions::Static(set));
        self
    }

    /// Bindings built per instance, when the instance is created.
    pub fn subscriptions_with(mut self, factory: impl Fn(&ComponentInstance) -> BindingSet + 'static) -> Self {
        self.subscriptions = Some(Subscriptions::Factory(Rc::new(factory)));
        self
    }

    pub fn dom_streams(&self) -> &[DomStream] {
        self.dom_streams.as_deref().unwrap_or_default()
    }

    pub fn method_streams(&self) -> &[MethodStream] {
        self.observable_methods.as_deref().unwrap_or_default()
    }

    pub fn subscriptions_option(&self) -> Option<&Subscriptions> {
        self.subscriptions.as_ref()
    }

    pub(crate) fn replace_subscriptions(&mut self, subscriptions: Option<Subscriptions>) {
        self.subscriptions = subscriptions;
    }

    pub fn has_subscriptions(&self) -> bool {
        self.subscriptions.is_some()
    }

    /// Combine a parent (mixin) with a child, field by field.
    pub fn merge(parent: &RxOptions, child: &RxOptions) -> RxOptions {
        RxOptions {
            dom_streams: child.dom_streams.clone().or_else(|| parent.dom_streams.clone()),
            observable_methods: child
                .observable_methods
                .clone()
                .or_else(|| parent.observable_methods.clone()),
            subscriptions: merge_subscriptions(parent.subscriptions.as_ref(), child.subscriptions.as_ref()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{of, Observable, Stream};
    use std::cell::RefCell;

    #[test]
    fn dom_stream_installs_a_fresh_subject_per_instance() {
        let options = RxOptions::new().dom_stream::<i32>("clicks$");
        let a = ComponentInstance::new("A");
        let b = ComponentInstance::new("B");
        for instance in [&a, &b] {
            options.dom_streams()[0].install(instance);
        }

        let subject_a = a.get::<Subject<i32>>("clicks$").unwrap();
        let subject_b = b.get::<Subject<i32>>("clicks$").unwrap();
        let _sub = subject_a.subscribe_next(|_| {});
        assert_eq!(subject_a.observer_count(), 1);
        assert_eq!(subject_b.observer_count(), 0);
    }

    #[test]
    fn method_stream_publishes_call_arguments() {
        let instance = ComponentInstance::new("Search");
        MethodStream::new::<String>("search").install(&instance);

        let calls = instance.get::<Stream<String>>("search$").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = calls.subscribe_next(move |q| sink.borrow_mut().push(q));

        instance.call("search", "rust".to_string()).unwrap();
        instance.call("search", "rx".to_string()).unwrap();
        assert_eq!(*seen.borrow(), vec!["rust".to_string(), "rx".to_string()]);
    }

    #[test]
    fn renamed_method_stream_uses_given_property() {
        let instance = ComponentInstance::new("Renamed");
        MethodStream::renamed::<u8>("bump", "bumps").install(&instance);
        assert!(instance.get::<Stream<u8>>("bumps").is_some());
        assert!(!instance.has_property("bump$"));
    }

    #[test]
    fn method_stream_replaces_existing_method() {
        let instance = ComponentInstance::new("Clash");
        let old_called = Rc::new(RefCell::new(false));
        let flag = old_called.clone();
        instance.define_method("go", move |_, _: ()| *flag.borrow_mut() = true);

        MethodStream::new::<()>("go").install(&instance);
        instance.call("go", ()).unwrap();
        assert!(!*old_called.borrow());
    }

    #[test]
    fn merge_prefers_child_per_field() {
        let parent = RxOptions::new()
            .dom_stream::<i32>("parent$")
            .subscriptions(BindingSet::new().stream("p", of([1])));
        let child = RxOptions::new().observable_method::<i32>("child");

        let merged = RxOptions::merge(&parent, &child);
        assert_eq!(merged.dom_streams()[0].name(), "parent$");
        assert_eq!(merged.method_streams()[0].method(), "child");
        let set = merged.subscriptions_option().unwrap().resolve(&ComponentInstance::new("M"));
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["p"]);

        let child = child.subscriptions(BindingSet::new().stream("c", of([2])));
        let merged = RxOptions::merge(&parent, &child);
        let set = merged.subscriptions_option().unwrap().resolve(&ComponentInstance::new("M"));
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn merge_subscriptions_falls_back_to_parent() {
        let parent = Subscriptions::Static(BindingSet::new().null("x"));
        assert!(merge_subscriptions(None, None).is_none());
        assert!(matches!(merge_subscriptions(Some(&parent), None), Some(Subscriptions::Static(_))));
    }

    #[test]
    fn factory_sees_the_instance() {
        let options = RxOptions::new().subscriptions_with(|instance| {
            BindingSet::new().stream(format!("{}_ticks", instance.name()), of([1]))
        });
        let instance = ComponentInstance::new("Clock");
        let set = options.subscriptions_option().unwrap().resolve(&instance);
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["Clock_ticks"]);
    }
}
