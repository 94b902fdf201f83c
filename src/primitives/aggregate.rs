// ============================================================================
// spark-rx - Disposable Aggregate
// Group subscriptions for joint, exactly-once release
// ============================================================================
//
// One aggregate per component instance. dispose_all() releases every member
// once; a member whose unsubscribe panics is isolated so its siblings are
// still released. Members added after disposal are released on the spot.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::core::types::Unsubscribable;

struct AggregateInner {
    members: RefCell<Vec<Box<dyn Unsubscribable>>>,
    disposed: Cell<bool>,
}

impl AggregateInner {
    fn dispose_all(&self) {
        if self.disposed.replace(true) {
            return;
        }

        // Drain first: a member's teardown may add to or dispose this aggregate
        let members: Vec<_> = self.members.borrow_mut().drain(..).collect();
        let total = members.len();
        let faults = members.into_iter().filter(|m| !release(m.as_ref())).count();

        if faults > 0 {
            tracing::warn!(total, faults, "unsubscribe panicked during disposal; siblings were still released");
        } else {
            tracing::trace!(total, "disposed aggregate");
        }
    }
}

impl Drop for AggregateInner {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

/// Release one member, containing a panic. Returns false on fault.
fn release(member: &dyn Unsubscribable) -> bool {
    catch_unwind(AssertUnwindSafe(|| member.unsubscribe())).is_ok()
}

/// A composite cancellation handle.
///
/// Cloning shares the same aggregate. The last handle dropped disposes any
/// members still registered.
///
/// # Example
///
/// ```
/// use spark_rx::{DisposableAggregate, Observable, Subject};
///
/// let subject = Subject::<i32>::new();
/// let aggregate = DisposableAggregate::new();
/// aggregate.add(subject.subscribe_next(|_| {}));
/// aggregate.add(subject.subscribe_next(|_| {}));
/// assert_eq!(subject.observer_count(), 2);
///
/// aggregate.dispose_all();
/// aggregate.dispose_all(); // no-op
/// assert_eq!(subject.observer_count(), 0);
/// ```
#[derive(Clone)]
pub struct DisposableAggregate {
    inner: Rc<AggregateInner>,
}

impl DisposableAggregate {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(AggregateInner {
                members: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Register a member. After disposal the member is released immediately
    /// instead of being stored.
    pub fn add(&self, member: impl Unsubscribable) {
        if self.inner.disposed.get() {
            if !release(&member) {
                tracing::warn!("unsubscribe panicked while releasing a late member");
            }
            return;
        }
        self.inner.members.borrow_mut().push(Box::new(member));
    }

    /// Release every member exactly once. Safe when empty or already disposed.
    pub fn dispose_all(&self) {
        self.inner.dispose_all();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of members still registered.
    pub fn len(&self) -> usize {
        self.inner.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DisposableAggregate {
    fn default() -> Self {
        Self::new()
    }
}

impl Unsubscribable for DisposableAggregate {
    fn unsubscribe(&self) {
        self.dispose_all();
    }

    fn is_closed(&self) -> bool {
        self.is_disposed()
    }
}

impl fmt::Debug for DisposableAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableAggregate")
            .field("members", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Subscription;

    fn counting(counter: &Rc<Cell<u32>>) -> Subscription {
        let counter = counter.clone();
        Subscription::from_fn(move || counter.set(counter.get() + 1))
    }

    struct Exploding;

    impl Unsubscribable for Exploding {
        fn unsubscribe(&self) {
            panic!("unsubscribe exploded");
        }

        fn is_closed(&self) -> bool {
            false
        }
    }

    #[test]
    fn dispose_all_releases_each_member_once() {
        let released = Rc::new(Cell::new(0));
        let aggregate = DisposableAggregate::new();
        for _ in 0..5 {
            aggregate.add(counting(&released));
        }
        assert_eq!(aggregate.len(), 5);

        aggregate.dispose_all();
        aggregate.dispose_all();

        assert_eq!(released.get(), 5);
        assert!(aggregate.is_disposed());
        assert!(aggregate.is_empty());
    }

    #[test]
    fn dispose_empty_is_safe() {
        let aggregate = DisposableAggregate::new();
        aggregate.dispose_all();
        assert!(aggregate.is_disposed());
    }

    #[test]
    fn add_after_dispose_releases_immediately() {
        let released = Rc::new(Cell::new(0));
        let aggregate = DisposableAggregate::new();
        aggregate.dispose_all();

        aggregate.add(counting(&released));

        assert_eq!(released.get(), 1);
        assert!(aggregate.is_empty());
    }

    #[test]
    fn panicking_member_is_isolated() {
        let released = Rc::new(Cell::new(0));
        let aggregate = DisposableAggregate::new();
        aggregate.add(counting(&released));
        aggregate.add(Exploding);
        aggregate.add(counting(&released));

        aggregate.dispose_all();

        assert_eq!(released.get(), 2, "siblings of a faulting member are released");
        assert!(aggregate.is_disposed());
    }

    #[test]
    fn dropping_last_handle_disposes() {
        let released = Rc::new(Cell::new(0));
        {
            let aggregate = DisposableAggregate::new();
            aggregate.add(counting(&released));
            let _clone = aggregate.clone();
        }
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn member_teardown_may_touch_the_aggregate() {
        let aggregate = DisposableAggregate::new();
        let reentrant = aggregate.clone();
        aggregate.add(Subscription::from_fn(move || reentrant.dispose_all()));

        aggregate.dispose_all();
        assert!(aggregate.is_disposed());
    }
}
