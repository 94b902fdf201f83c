// ============================================================================
// spark-rx - Subscription
// Cancellable handle for an active observation
// ============================================================================
//
// A Subscription owns a list of teardowns. Closing it (explicitly through
// unsubscribe(), or implicitly when the stream errors or completes) runs
// every teardown exactly once. Teardowns added after close run immediately.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::core::constants::*;
use crate::core::types::Unsubscribable;

// =============================================================================
// TEARDOWN
// =============================================================================

/// Work to run when a subscription closes.
pub enum Teardown {
    /// Nothing to release
    Empty,
    /// Run a closure
    Fn(Box<dyn FnOnce()>),
    /// Unsubscribe a child subscription
    Subscription(Subscription),
}

impl Teardown {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Teardown::Fn(Box::new(f))
    }

    pub fn empty() -> Self {
        Teardown::Empty
    }

    fn run(self) {
        match self {
            Teardown::Empty => {}
            Teardown::Fn(f) => f(),
            Teardown::Subscription(sub) => sub.unsubscribe(),
        }
    }
}

impl From<Subscription> for Teardown {
    fn from(sub: Subscription) -> Self {
        Teardown::Subscription(sub)
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Teardown::Empty => f.write_str("Teardown::Empty"),
            Teardown::Fn(_) => f.write_str("Teardown::Fn"),
            Teardown::Subscription(sub) => f.debug_tuple("Teardown::Subscription").field(sub).finish(),
        }
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

struct SubscriptionInner {
    flags: Cell<u32>,
    teardowns: RefCell<Vec<Teardown>>,
}

/// Handle for an active observation.
///
/// Cloning shares the same handle. `unsubscribe()` is idempotent: the first
/// call closes the subscription and runs its teardowns, later calls do
/// nothing.
///
/// # Example
///
/// ```
/// use spark_rx::{Observable, Subject};
///
/// let subject = Subject::<i32>::new();
/// let sub = subject.subscribe_next(|v| println!("{v}"));
///
/// sub.unsubscribe();
/// sub.unsubscribe(); // no-op
/// assert!(sub.is_closed());
/// assert_eq!(subject.observer_count(), 0);
/// ```
#[derive(Clone)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Subscription {
    /// Create an open subscription with no teardowns.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                flags: Cell::new(OPEN),
                teardowns: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create an open subscription that runs `f` when closed.
    pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
        let sub = Self::new();
        sub.add(Teardown::new(f));
        sub
    }

    /// Create a subscription that is already closed.
    pub fn closed() -> Self {
        let sub = Self::new();
        sub.inner.flags.set(CLOSED);
        sub
    }

    pub fn is_closed(&self) -> bool {
        self.inner.flags.get() & CLOSED != 0
    }

    /// Whether the subscription was closed by an `error` notification.
    pub fn is_errored(&self) -> bool {
        self.inner.flags.get() & ERRORED != 0
    }

    /// Whether the subscription was closed by a `complete` notification.
    pub fn is_completed(&self) -> bool {
        self.inner.flags.get() & COMPLETED != 0
    }

    /// Register a teardown. Runs it immediately if already closed.
    pub fn add(&self, teardown: impl Into<Teardown>) {
        let teardown = teardown.into();
        if let Teardown::Subscription(ref child) = teardown {
            if Rc::ptr_eq(&child.inner, &self.inner) {
                return;
            }
        }
        if self.is_closed() {
            teardown.run();
        } else {
            self.inner.teardowns.borrow_mut().push(teardown);
        }
    }

    /// Close the subscription and run its teardowns.
    pub fn unsubscribe(&self) {
        if self.close(0) {
            self.run_teardowns();
        }
    }

    /// Number of pending teardowns.
    pub fn teardown_count(&self) -> usize {
        self.inner.teardowns.borrow().len()
    }

    /// Mark closed with an extra terminal flag. Returns false if the
    /// subscription was already closed.
    pub(crate) fn close(&self, terminal: u32) -> bool {
        let flags = self.inner.flags.get();
        if flags & CLOSED != 0 {
            return false;
        }
        self.inner.flags.set((flags & !OPEN) | CLOSED | terminal);
        true
    }

    /// Drain and run teardowns outside the borrow (teardowns may re-enter).
    pub(crate) fn run_teardowns(&self) {
        let teardowns: Vec<Teardown> = self.inner.teardowns.borrow_mut().drain(..).collect();
        for teardown in teardowns {
            teardown.run();
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Unsubscribable for Subscription {
    fn unsubscribe(&self) {
        Subscription::unsubscribe(self);
    }

    fn is_closed(&self) -> bool {
        Subscription::is_closed(self)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .field("teardowns", &self.teardown_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribe_runs_teardowns_once() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let sub = Subscription::from_fn(move || runs_clone.set(runs_clone.get() + 1));

        sub.unsubscribe();
        sub.unsubscribe();
        sub.clone().unsubscribe();

        assert_eq!(runs.get(), 1);
        assert!(sub.is_closed());
        assert!(!sub.is_errored());
    }

    #[test]
    fn add_after_close_runs_immediately() {
        let sub = Subscription::new();
        sub.unsubscribe();

        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        sub.add(Teardown::new(move || ran_clone.set(true)));

        assert!(ran.get());
        assert_eq!(sub.teardown_count(), 0);
    }

    #[test]
    fn child_subscription_closed_with_parent() {
        let parent = Subscription::new();
        let child = Subscription::new();
        parent.add(child.clone());

        parent.unsubscribe();
        assert!(child.is_closed());
    }

    #[test]
    fn adding_self_is_ignored() {
        let sub = Subscription::new();
        sub.add(sub.clone());
        assert_eq!(sub.teardown_count(), 0);
        sub.unsubscribe();
    }

    #[test]
    fn closed_constructor() {
        let sub = Subscription::closed();
        assert!(sub.is_closed());

        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        sub.add(Teardown::new(move || ran_clone.set(true)));
        assert!(ran.get());
    }

    #[test]
    fn as_unsubscribable_trait_object() {
        let items: Vec<Box<dyn Unsubscribable>> =
            vec![Box::new(Subscription::new()), Box::new(Subscription::new())];

        for item in &items {
            item.unsubscribe();
        }
        assert!(items.iter().all(|i| i.is_closed()));
    }
}
