// ============================================================================
// spark-rx - Observable Contract
// Observer callbacks, the Observable trait and the cold Stream handle
// ============================================================================
//
// Contract:
// - subscribe() returns a Subscription; synchronous emissions happen before
//   it returns
// - after error or complete, no further next is delivered
// - after unsubscribe() returns, no further next is delivered
// - an error with no error callback is an unhandled fault and panics
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::constants::*;
use crate::core::types::{CompleteFn, ErrorFn, NextFn, StreamError};
use crate::stream::subscription::{Subscription, Teardown};

// =============================================================================
// OBSERVER
// =============================================================================

/// Up to three callbacks receiving a stream's notifications.
///
/// # Example
///
/// ```
/// use spark_rx::Observer;
///
/// let observer = Observer::<i32>::new()
///     .on_next(|v| println!("value {v}"))
///     .on_error(|e| eprintln!("failed: {e}"))
///     .on_complete(|| println!("done"));
/// # let _ = observer;
/// ```
pub struct Observer<T> {
    pub(crate) next: Option<NextFn<T>>,
    pub(crate) error: Option<ErrorFn>,
    pub(crate) complete: Option<CompleteFn>,
}

impl<T> Observer<T> {
    /// An observer with no callbacks.
    pub fn new() -> Self {
        Self {
            next: None,
            error: None,
            complete: None,
        }
    }

    /// Build from optional, already shared callbacks.
    pub fn from_parts(
        next: Option<NextFn<T>>,
        error: Option<ErrorFn>,
        complete: Option<CompleteFn>,
    ) -> Self {
        Self {
            next,
            error,
            complete,
        }
    }

    pub fn on_next(mut self, f: impl Fn(T) + 'static) -> Self {
        self.next = Some(Rc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(StreamError) + 'static) -> Self {
        self.error = Some(Rc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn() + 'static) -> Self {
        self.complete = Some(Rc::new(f));
        self
    }

    /// Whether an error callback was supplied.
    pub fn handles_errors(&self) -> bool {
        self.error.is_some()
    }
}

impl<T> Default for Observer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            next: self.next.clone(),
            error: self.error.clone(),
            complete: self.complete.clone(),
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("next", &self.next.is_some())
            .field("error", &self.error.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

// =============================================================================
// SUBSCRIBER
// =============================================================================

/// The producer-side view of one subscription: an observer guarded by the
/// subscription's closed state.
pub struct Subscriber<T> {
    observer: Rc<Observer<T>>,
    subscription: Subscription,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            observer: self.observer.clone(),
            subscription: self.subscription.clone(),
        }
    }
}

impl<T> Subscriber<T> {
    pub fn new(observer: Observer<T>) -> Self {
        Self {
            observer: Rc::new(observer),
            subscription: Subscription::new(),
        }
    }

    /// Deliver a value. Ignored once closed.
    pub fn next(&self, value: T) {
        if self.subscription.is_closed() {
            return;
        }
        if let Some(next) = self.observer.next.clone() {
            next(value);
        }
    }

    /// Deliver an error and close.
    ///
    /// Teardowns run before the callback. Without an error callback this
    /// panics, surfacing the fault to the host runtime.
    pub fn error(&self, err: StreamError) {
        if !self.subscription.close(ERRORED) {
            return;
        }
        let callback = self.observer.error.clone();
        self.subscription.run_teardowns();
        match callback {
            Some(callback) => callback(err),
            None => panic!("unhandled stream error: {err}"),
        }
    }

    /// Deliver completion and close.
    pub fn complete(&self) {
        if !self.subscription.close(COMPLETED) {
            return;
        }
        let callback = self.observer.complete.clone();
        self.subscription.run_teardowns();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

// =============================================================================
// OBSERVABLE TRAIT
// =============================================================================

/// A push source of values.
pub trait Observable<T> {
    /// Start observing. Synchronous emissions are delivered before return.
    fn subscribe(&self, observer: Observer<T>) -> Subscription;

    /// Shorthand for subscribing with only a `next` callback.
    fn subscribe_next(&self, f: impl Fn(T) + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe(Observer::new().on_next(f))
    }
}

// =============================================================================
// STREAM
// =============================================================================

type Producer<T> = Rc<dyn Fn(Subscriber<T>) -> Teardown>;

/// A cold observable: the producer runs once per subscription.
///
/// Cloning shares the producer, not any emitted state.
///
/// # Example
///
/// ```
/// use spark_rx::{Observable, Stream, Teardown};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let numbers = Stream::new(|subscriber| {
///     subscriber.next(1);
///     subscriber.next(2);
///     subscriber.complete();
///     Teardown::empty()
/// });
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let seen_clone = seen.clone();
/// numbers.subscribe_next(move |v| seen_clone.borrow_mut().push(v));
///
/// assert_eq!(*seen.borrow(), vec![1, 2]);
/// ```
pub struct Stream<T> {
    producer: Producer<T>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer.clone(),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("item", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: 'static> Stream<T> {
    pub fn new(producer: impl Fn(Subscriber<T>) -> Teardown + 'static) -> Self {
        Self {
            producer: Rc::new(producer),
        }
    }

    /// Whether two handles share the same producer.
    pub fn ptr_eq(&self, other: &Stream<T>) -> bool {
        Rc::ptr_eq(&self.producer, &other.producer)
    }
}

impl<T: 'static> Observable<T> for Stream<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let subscriber = Subscriber::new(observer);
        let teardown = (self.producer)(subscriber.clone());
        subscriber.subscription().add(teardown);
        subscriber.subscription().clone()
    }
}

// =============================================================================
// SOURCES
// =============================================================================

/// Emit each value synchronously, then complete.
pub fn of<T: Clone + 'static>(values: impl IntoIterator<Item = T>) -> Stream<T> {
    let values: Rc<[T]> = values.into_iter().collect();
    Stream::new(move |subscriber| {
        for value in values.iter() {
            if subscriber.is_closed() {
                break;
            }
            subscriber.next(value.clone());
        }
        subscriber.complete();
        Teardown::empty()
    })
}

/// Complete immediately without emitting.
pub fn empty<T: 'static>() -> Stream<T> {
    Stream::new(|subscriber| {
        subscriber.complete();
        Teardown::empty()
    })
}

/// Never emit, never terminate.
pub fn never<T: 'static>() -> Stream<T> {
    Stream::new(|_| Teardown::empty())
}

/// Error immediately on subscribe.
pub fn throw_error<T: 'static>(err: impl Into<StreamError>) -> Stream<T> {
    let err = err.into();
    Stream::new(move |subscriber| {
        subscriber.error(err.clone());
        Teardown::empty()
    })
}

// =============================================================================
// TESTS
// =============================================================================
