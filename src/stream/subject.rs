// ============================================================================
// spark-rx - Subject
// A multicast observable that is also an imperative push target
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::core::constants::*;
use crate::core::types::StreamError;
use crate::stream::observable::{Observable, Observer, Stream, Subscriber};
use crate::stream::subscription::{Subscription, Teardown};

struct SubjectInner<T> {
    observers: RefCell<Vec<(u64, Subscriber<T>)>>,
    next_id: Cell<u64>,
    flags: Cell<u32>,
    thrown: RefCell<Option<StreamError>>,
}

/// Pushes values to its current subscribers.
///
/// There is no buffering: a late subscriber misses everything emitted before
/// it subscribed. After `error` or `complete`, new subscribers receive the
/// terminal notification immediately.
///
/// # Example
///
/// ```
/// use spark_rx::{Observable, Subject};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let clicks = Subject::new();
/// let last = Rc::new(Cell::new(0));
/// let last_clone = last.clone();
/// let _sub = clicks.subscribe_next(move |v| last_clone.set(v));
///
/// clicks.next(5);
/// assert_eq!(last.get(), 5);
/// ```
pub struct Subject<T> {
    inner: Rc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.inner.observers.borrow().len())
            .field("stopped", &(self.inner.flags.get() & CLOSED != 0))
            .finish()
    }
}

impl<T: Clone + 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SubjectInner {
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                flags: Cell::new(OPEN),
                thrown: RefCell::new(None),
            }),
        }
    }

    /// Push a value to every current subscriber.
    pub fn next(&self, value: T) {
        if self.is_stopped() {
            return;
        }
        // Snapshot so subscribers may (un)subscribe while being notified
        for subscriber in self.snapshot() {
            subscriber.next(value.clone());
        }
    }

    /// Error every current subscriber and stop.
    pub fn error(&self, err: StreamError) {
        if self.is_stopped() {
            return;
        }
        self.inner.flags.set(CLOSED | ERRORED);
        *self.inner.thrown.borrow_mut() = Some(err.clone());
        deliver_terminal(self.drain(), |subscriber| subscriber.error(err.clone()));
    }

    /// Complete every current subscriber and stop.
    pub fn complete(&self) {
        if self.is_stopped() {
            return;
        }
        self.inner.flags.set(CLOSED | COMPLETED);
        deliver_terminal(self.drain(), |subscriber| subscriber.complete());
    }

    /// Whether `error` or `complete` has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.flags.get() & CLOSED != 0
    }

    /// Number of live subscribers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// A cold view of this subject, for composing with operators.
    pub fn as_stream(&self) -> Stream<T> {
        let subject = self.clone();
        Stream::new(move |subscriber| {
            subject.attach(subscriber);
            Teardown::empty()
        })
    }

    fn snapshot(&self) -> Vec<Subscriber<T>> {
        self.inner
            .observers
            .borrow()
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    fn drain(&self) -> Vec<Subscriber<T>> {
        self.inner
            .observers
            .borrow_mut()
            .drain(..)
            .map(|(_, s)| s)
            .collect()
    }

    fn attach(&self, subscriber: Subscriber<T>) {
        let flags = self.inner.flags.get();
        if flags & ERRORED != 0 {
            let thrown = self.inner.thrown.borrow().clone();
            if let Some(err) = thrown {
                subscriber.error(err);
            }
            return;
        }
        if flags & COMPLETED != 0 {
            subscriber.complete();
            return;
        }

        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, subscriber.clone()));

        let weak = Rc::downgrade(&self.inner);
        subscriber.subscription().add(Teardown::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.borrow_mut().retain(|(i, _)| *i != id);
            }
        }));
    }
}

/// Notify every drained subscriber even if one callback panics. The first
/// panic is resumed once all of them are closed.
fn deliver_terminal<T>(subscribers: Vec<Subscriber<T>>, notify: impl Fn(&Subscriber<T>)) {
    let mut first_panic = None;
    for subscriber in &subscribers {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| notify(subscriber))) {
            first_panic.get_or_insert(payload);
        }
    }
    if let Some(payload) = first_panic {
        resume_unwind(payload);
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Observable<T> for Subject<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let subscriber = Subscriber::new(observer);
        self.attach(subscriber.clone());
        subscriber.subscription().clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multicasts_to_all_subscribers() {
        let subject = Subject::<i32>::new();
        let a = Rc::new(RefCell::new(Vec::new()));
        let b = Rc::new(RefCell::new(Vec::new()));
        let a_clone = a.clone();
        let b_clone = b.clone();

        let _sa = subject.subscribe_next(move |v| a_clone.borrow_mut().push(v));
        let _sb = subject.subscribe_next(move |v| b_clone.borrow_mut().push(v));

        subject.next(1);
        subject.next(2);

        assert_eq!(*a.borrow(), vec![1, 2]);
        assert_eq!(*b.borrow(), vec![1, 2]);
    }

    #[test]
    fn late_subscriber_misses_past_values() {
        let subject = Subject::new();
        subject.next(1);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = subject.subscribe_next(move |v| seen_clone.borrow_mut().push(v));

        subject.next(2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn unsubscribe_removes_observer() {
        let subject = Subject::<i32>::new();
        let sub = subject.subscribe_next(|_| {});
        assert_eq!(subject.observer_count(), 1);

        sub.unsubscribe();
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn unsubscribe_during_emission_stops_later_delivery() {
        let subject = Subject::<i32>::new();
        let second_seen = Rc::new(Cell::new(0));

        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim_clone = victim.clone();
        let _first = subject.subscribe_next(move |_| {
            if let Some(sub) = victim_clone.borrow().as_ref() {
                sub.unsubscribe();
            }
        });
        let second_clone = second_seen.clone();
        let second = subject.subscribe_next(move |v| second_clone.set(v));
        *victim.borrow_mut() = Some(second);

        subject.next(7);
        assert_eq!(second_seen.get(), 0, "unsubscribed before its turn");
    }

    #[test]
    fn reentrant_next_is_allowed() {
        let subject = Subject::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_subject = subject.clone();
        let seen_clone = seen.clone();
        let _sub = subject.subscribe_next(move |v: i32| {
            seen_clone.borrow_mut().push(v);
            if v < 3 {
                inner_subject.next(v + 1);
            }
        });

        subject.next(1);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn complete_notifies_and_late_subscribers_complete_immediately() {
        let subject = Subject::<i32>::new();
        let done = Rc::new(Cell::new(0));
        let done_clone = done.clone();
        subject.subscribe(Observer::new().on_complete(move || done_clone.set(done_clone.get() + 1)));

        subject.complete();
        assert_eq!(done.get(), 1);
        assert!(subject.is_stopped());
        assert_eq!(subject.observer_count(), 0);

        let done_clone = done.clone();
        let late = subject.subscribe(Observer::new().on_complete(move || done_clone.set(done_clone.get() + 1)));
        assert_eq!(done.get(), 2);
        assert!(late.is_closed());

        subject.next(1);
    }

    #[test]
    fn error_reaches_subscribers() {
        let subject = Subject::<i32>::new();
        let caught = Rc::new(RefCell::new(String::new()));
        let caught_clone = caught.clone();
        subject.subscribe(Observer::new().on_error(move |e| *caught_clone.borrow_mut() = e.to_string()));

        subject.error(StreamError::new("bad input"));
        assert_eq!(*caught.borrow(), "bad input");
    }

    #[test]
    fn panicking_error_callback_does_not_strand_later_subscribers() {
        let subject = Subject::<i32>::new();
        let first = subject.subscribe(Observer::new().on_next(|_| {}));
        let caught = Rc::new(Cell::new(false));
        let caught_clone = caught.clone();
        let second = subject.subscribe(Observer::new().on_error(move |_| caught_clone.set(true)));

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| subject.error("boom".into())));

        assert!(outcome.is_err(), "the unhandled error still surfaces");
        assert!(caught.get());
        assert!(first.is_closed());
        assert!(second.is_closed());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn panicking_complete_callback_does_not_strand_later_subscribers() {
        let subject = Subject::<i32>::new();
        let first = subject.subscribe(Observer::new().on_complete(|| panic!("complete handler failed")));
        let done = Rc::new(Cell::new(false));
        let done_clone = done.clone();
        let second = subject.subscribe(Observer::new().on_complete(move || done_clone.set(true)));

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| subject.complete()));

        assert!(outcome.is_err());
        assert!(done.get());
        assert!(first.is_closed());
        assert!(second.is_closed());
    }

    #[test]
    fn as_stream_shares_the_subject() {
        let subject = Subject::new();
        let stream = subject.as_stream();
        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let sub = stream.subscribe_next(move |v| seen_clone.set(v));

        subject.next(9);
        assert_eq!(seen.get(), 9);

        sub.unsubscribe();
        assert_eq!(subject.observer_count(), 0);
    }
}
