// ============================================================================
// spark-rx - Binding Declarations
// The `subscriptions` set: property name -> declared stream
// ============================================================================
//
// Entries are classified when they are inserted, not when they are bound.
// A value that is not observable is kept (so the instance can record what
// was declared) but marked Invalid with the reason.
// ============================================================================

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use crate::component::instance::ComponentInstance;
use crate::component::refresh::force_refresh;
use crate::core::error::InvalidReason;
use crate::stream::{Observable, Observer, Stream, Subject, Subscription};

// =============================================================================
// ERASED OBSERVABLE
// =============================================================================

/// An observable whose item type is hidden behind the instance property it
/// writes to.
pub trait ErasedObservable {
    /// Subscribe so that each value is stored as property `key` and the
    /// instance view is refreshed. A stream error panics.
    fn bind_into(&self, instance: &ComponentInstance, key: &str) -> Subscription;

    /// Name of the item type, for diagnostics.
    fn item_type(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

fn bind_property<T: 'static>(
    observable: &impl Observable<T>,
    instance: &ComponentInstance,
    key: &str,
) -> Subscription {
    let target = instance.downgrade();
    let property = key.to_string();
    let component = instance.name().to_string();
    let failed_key = property.clone();

    observable.subscribe(
        Observer::new()
            .on_next(move |value: T| {
                // A dropped instance has nothing left to update
                if let Some(instance) = target.upgrade() {
                    instance.set_property(&property, value);
                    force_refresh(&instance);
                }
            })
            .on_error(move |err| {
                panic!("stream error in subscription \"{failed_key}\" of {component}: {err}")
            }),
    )
}

impl<T: 'static> ErasedObservable for Stream<T> {
    fn bind_into(&self, instance: &ComponentInstance, key: &str) -> Subscription {
        bind_property(self, instance, key)
    }

    fn item_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Clone + 'static> ErasedObservable for Subject<T> {
    fn bind_into(&self, instance: &ComponentInstance, key: &str) -> Subscription {
        bind_property(self, instance, key)
    }

    fn item_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// DECLARED / CHECKED
// =============================================================================

/// What a `subscriptions` entry was declared as.
#[derive(Clone)]
pub enum Declared {
    Observable(Rc<dyn ErasedObservable>),
    /// Anything that is not a stream
    Value {
        type_name: &'static str,
        value: Rc<dyn Any>,
    },
    Null,
}

/// Classification of a declared entry.
#[derive(Clone)]
pub enum Checked {
    Valid(Rc<dyn ErasedObservable>),
    Invalid(InvalidReason),
}

impl Checked {
    pub fn is_valid(&self) -> bool {
        matches!(self, Checked::Valid(_))
    }
}

impl Declared {
    pub fn check(&self) -> Checked {
        match self {
            Declared::Observable(observable) => Checked::Valid(observable.clone()),
            Declared::Value { type_name, .. } => Checked::Invalid(InvalidReason::NotObservable { type_name }),
            Declared::Null => Checked::Invalid(InvalidReason::Null),
        }
    }

    /// Downcast a declared stream back to its concrete type.
    pub fn downcast<O: Clone + 'static>(&self) -> Option<O> {
        match self {
            Declared::Observable(observable) => observable.as_any().downcast_ref::<O>().cloned(),
            Declared::Value { value, .. } => value.downcast_ref::<O>().cloned(),
            Declared::Null => None,
        }
    }
}

impl fmt::Debug for Declared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declared::Observable(observable) => f.debug_tuple("Observable").field(&observable.item_type()).finish(),
            Declared::Value { type_name, .. } => f.debug_tuple("Value").field(type_name).finish(),
            Declared::Null => f.write_str("Null"),
        }
    }
}

impl fmt::Debug for Checked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checked::Valid(observable) => f.debug_tuple("Valid").field(&observable.item_type()).finish(),
            Checked::Invalid(reason) => f.debug_tuple("Invalid").field(reason).finish(),
        }
    }
}

// =============================================================================
// BINDING SET
// =============================================================================

/// One declared entry.
#[derive(Debug, Clone)]
pub struct Binding {
    pub key: String,
    pub declared: Declared,
    pub checked: Checked,
}

/// Ordered property name -> declaration mapping.
///
/// Inserting an existing key replaces that entry in place.
///
/// # Example
///
/// ```
/// use spark_rx::{of, BindingSet};
///
/// let set = BindingSet::new()
///     .stream("count", of([1, 2, 3]))
///     .value("label", "not a stream")
///     .null("missing");
///
/// assert_eq!(set.len(), 3);
/// assert!(set.get("count").unwrap().checked.is_valid());
/// assert!(!set.get("label").unwrap().checked.is_valid());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    entries: Vec<Binding>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(mut self, key: impl Into<String>, observable: impl ErasedObservable + 'static) -> Self {
        self.insert(key, Declared::Observable(Rc::new(observable)));
        self
    }

    /// Declare a plain value. Always classified invalid.
    pub fn value<V: Any>(mut self, key: impl Into<String>, value: V) -> Self {
        self.insert(
            key,
            Declared::Value {
                type_name: type_name::<V>(),
                value: Rc::new(value),
            },
        );
        self
    }

    pub fn null(mut self, key: impl Into<String>) -> Self {
        self.insert(key, Declared::Null);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, declared: Declared) {
        let key = key.into();
        let binding = Binding {
            checked: declared.check(),
            key,
            declared,
        };
        match self.entries.iter_mut().find(|b| b.key == binding.key) {
            Some(existing) => *existing = binding,
            None => self.entries.push(binding),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Binding> {
        self.entries.iter().find(|b| b.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|b| b.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::of;

    #[test]
    fn classification_happens_on_insert() {
        let set = BindingSet::new()
            .stream("ok", of([1]))
            .value("plain", 42_u8)
            .null("nothing");

        assert!(matches!(set.get("ok").unwrap().checked, Checked::Valid(_)));
        assert!(matches!(
            set.get("plain").unwrap().checked,
            Checked::Invalid(InvalidReason::NotObservable { type_name: "u8" })
        ));
        assert!(matches!(
            set.get("nothing").unwrap().checked,
            Checked::Invalid(InvalidReason::Null)
        ));
    }

    #[test]
    fn reinserting_a_key_replaces_in_place() {
        let set = BindingSet::new()
            .stream("a", of([1]))
            .stream("b", of([2]))
            .null("a");

        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(!set.get("a").unwrap().checked.is_valid());
    }

    #[test]
    fn downcast_recovers_the_stream() {
        let stream = of([1, 2]);
        let set = BindingSet::new().stream("s", stream.clone());
        let back: Stream<i32> = set.get("s").unwrap().declared.downcast().unwrap();
        assert!(back.ptr_eq(&stream));
    }

    #[test]
    fn bind_into_writes_property() {
        let instance = ComponentInstance::new("Bind");
        let subject = Subject::new();
        let sub = subject.bind_into(&instance, "status");

        subject.next("ready");
        assert_eq!(instance.get::<&str>("status"), Some("ready"));

        sub.unsubscribe();
        subject.next("late");
        assert_eq!(instance.get::<&str>("status"), Some("ready"));
    }

    #[test]
    fn binding_does_not_keep_instance_alive() {
        let subject = Subject::<i32>::new();
        let instance = ComponentInstance::new("Dropped");
        let weak = instance.downgrade();
        let _sub = subject.bind_into(&instance, "value");

        drop(instance);
        assert!(weak.upgrade().is_none());
        subject.next(1);
    }
}
