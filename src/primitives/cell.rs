// ============================================================================
// spark-rx - Reactive Cell
// The ref primitive that bindings write into and the host reads from
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::stream::{Stream, Subscription, Teardown};

/// Watcher callback: `(new_value, old_value)`
type WatchFn<T> = Rc<dyn Fn(&T, &T)>;

struct RefInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    watchers: RefCell<Vec<(u64, WatchFn<T>)>>,
    next_watcher: Cell<u64>,
}

impl<T: Clone + PartialEq + 'static> RefInner<T> {
    fn set(&self, value: T) -> bool {
        let old = {
            let mut current = self.value.borrow_mut();
            if *current == value {
                return false;
            }
            std::mem::replace(&mut *current, value)
        };
        self.version.set(self.version.get() + 1);
        self.notify(&old);
        true
    }

    /// Call watchers outside any borrow; watchers may write back.
    fn notify(&self, old: &T) {
        let watchers: Vec<WatchFn<T>> = self
            .watchers
            .borrow()
            .iter()
            .map(|(_, w)| w.clone())
            .collect();
        if watchers.is_empty() {
            return;
        }
        let new = self.value.borrow().clone();
        for watcher in watchers {
            watcher(&new, old);
        }
    }

    fn watch(self: &Rc<Self>, f: impl Fn(&T, &T) + 'static) -> Subscription {
        let id = self.next_watcher.get();
        self.next_watcher.set(id + 1);
        self.watchers.borrow_mut().push((id, Rc::new(f)));

        let weak = Rc::downgrade(self);
        Subscription::from_fn(move || {
            if let Some(inner) = weak.upgrade() {
                inner.watchers.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }
}

// =============================================================================
// REF<T> - writable cell
// =============================================================================

/// A mutable reactive cell.
///
/// Setting a value equal to the current one is a no-op. Every change bumps
/// the version and notifies watchers with the new and old value.
///
/// # Example
///
/// ```
/// use spark_rx::create_ref;
///
/// let count = create_ref(0);
/// assert_eq!(count.get(), 0);
///
/// assert!(count.set(5));
/// assert!(!count.set(5));
/// assert_eq!(count.version(), 1);
/// ```
pub struct Ref<T> {
    inner: Rc<RefInner<T>>,
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Ref<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                watchers: RefCell::new(Vec::new()),
                next_watcher: Cell::new(0),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Access the value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Returns true if the value changed.
    pub fn set(&self, value: T) -> bool {
        self.inner.set(value)
    }

    /// Modify a copy of the value and store it back.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Call `f(new, old)` on every change until the subscription closes.
    pub fn watch(&self, f: impl Fn(&T, &T) + 'static) -> Subscription {
        self.inner.watch(f)
    }

    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }

    /// A read-only view sharing this cell.
    pub fn readonly(&self) -> ReadonlyRef<T> {
        ReadonlyRef {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("value", &self.get())
            .field("version", &self.version())
            .finish()
    }
}

// =============================================================================
// READONLY REF<T> - the handle bindings hand out
// =============================================================================

/// A read-only view of a [`Ref`].
///
/// Returned by `use_observable` so the binding's `next` callback stays the
/// only writer of the cell.
pub struct ReadonlyRef<T> {
    inner: Rc<RefInner<T>>,
}

impl<T> Clone for ReadonlyRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> ReadonlyRef<T> {
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    pub fn watch(&self, f: impl Fn(&T, &T) + 'static) -> Subscription {
        self.inner.watch(f)
    }
}

impl<T: Clone + PartialEq + 'static> From<&Ref<T>> for ReadonlyRef<T> {
    fn from(cell: &Ref<T>) -> Self {
        cell.readonly()
    }
}

impl<T> From<&ReadonlyRef<T>> for ReadonlyRef<T> {
    fn from(cell: &ReadonlyRef<T>) -> Self {
        cell.clone()
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for ReadonlyRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadonlyRef")
            .field("value", &self.get())
            .field("version", &self.version())
            .finish()
    }
}

// =============================================================================
// CREATION / BRIDGING
// =============================================================================

/// Create a reactive cell.
pub fn create_ref<T: Clone + PartialEq + 'static>(value: T) -> Ref<T> {
    Ref::new(value)
}

/// One observed change of a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<T> {
    pub new_value: T,
    pub old_value: T,
}

/// Turn a cell's changes into a stream.
///
/// Each subscription installs its own watcher; unsubscribing removes it.
///
/// # Example
///
/// ```
/// use spark_rx::{create_ref, watch_as_observable, Observable};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let name = create_ref(String::from("a"));
/// let changes = Rc::new(RefCell::new(Vec::new()));
/// let sink = changes.clone();
/// let sub = watch_as_observable(&name)
///     .subscribe_next(move |c| sink.borrow_mut().push((c.old_value, c.new_value)));
///
/// name.set("b".into());
/// sub.unsubscribe();
/// name.set("c".into());
///
/// assert_eq!(*changes.borrow(), vec![("a".to_string(), "b".to_string())]);
/// ```
pub fn watch_as_observable<T: Clone + PartialEq + 'static>(
    source: impl Into<ReadonlyRef<T>>,
) -> Stream<Change<T>> {
    let source: ReadonlyRef<T> = source.into();
    Stream::new(move |subscriber| {
        let watcher = source.watch(move |new, old| {
            subscriber.next(Change {
                new_value: new.clone(),
                old_value: old.clone(),
            });
        });
        Teardown::from(watcher)
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Observable;

    #[test]
    fn set_reports_change() {
        let cell = create_ref(1);
        assert!(cell.set(2));
        assert!(!cell.set(2));
        assert_eq!(cell.get(), 2);
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn update_in_place() {
        let items = create_ref(vec![1, 2]);
        items.update(|v| v.push(3));
        assert_eq!(items.get(), vec![1, 2, 3]);
        assert_eq!(items.with(|v| v.len()), 3);
    }

    #[test]
    fn watchers_receive_new_and_old() {
        let cell = create_ref(10);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let watch = cell.watch(move |new, old| seen_clone.borrow_mut().push((*new, *old)));

        cell.set(11);
        cell.set(11);
        cell.set(12);
        watch.unsubscribe();
        cell.set(13);

        assert_eq!(*seen.borrow(), vec![(11, 10), (12, 11)]);
        assert_eq!(cell.watcher_count(), 0);
    }

    #[test]
    fn watcher_may_write_back() {
        let cell = create_ref(0);
        let writer = cell.clone();
        let _watch = cell.watch(move |new, _| {
            if *new < 3 {
                writer.set(new + 1);
            }
        });

        cell.set(1);
        assert_eq!(cell.get(), 3);
    }

    #[test]
    fn readonly_view_tracks_writes() {
        let cell = create_ref("idle");
        let view = cell.readonly();
        cell.set("busy");
        assert_eq!(view.get(), "busy");
        assert_eq!(view.version(), 1);
    }

    #[test]
    fn watch_as_observable_emits_changes() {
        let cell = create_ref(0);
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = changes.clone();
        let sub = watch_as_observable(&cell).subscribe_next(move |c| sink.borrow_mut().push(c));

        cell.set(1);
        assert_eq!(
            *changes.borrow(),
            vec![Change {
                new_value: 1,
                old_value: 0
            }]
        );

        sub.unsubscribe();
        assert_eq!(cell.watcher_count(), 0);
    }
}
