// ============================================================================
// spark-rx - Composition API
// Stream bindings for setup functions: subscribe, materialize, emit
// ============================================================================
//
// Every subscription opened here is released no later than the before-unmount
// of the lifecycle scope that opened it.
//
// setup example:
//
//     let SubjectCallback { subject: plus, callback: on_plus } = rx_init_subject_callback();
//     let count = use_observable_or(
//         &plus.as_stream().map(|_| 1).scan(0, |t, c| t + c).start_with(0),
//         0,
//     );
//     // render reads count.get(); a click handler calls on_plus(())
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::primitives::cell::{Ref, ReadonlyRef};
use crate::primitives::scope::on_before_unmount;
use crate::stream::{Observable, Observer, Subject, Subscription};

// =============================================================================
// SUBSCRIPTION BINDER
// =============================================================================

/// Subscribe and tie the release to the active lifecycle scope.
///
/// The subscription is opened immediately; synchronous emissions reach
/// `observer` before this returns. Without an error callback a stream
/// error panics. Outside of any scope a warning is logged and the caller
/// owns the returned subscription.
pub fn subscribe_to<T: 'static>(observable: &impl Observable<T>, observer: Observer<T>) -> Subscription {
    let subscription = observable.subscribe(observer);
    if !subscription.is_closed() {
        let release = subscription.clone();
        on_before_unmount(move || release.unsubscribe());
    }
    subscription
}

/// Subscribe for side effects only, released on unmount.
///
/// # Example
///
/// ```
/// use spark_rx::{lifecycle_scope, use_subscription, Observer, Subject};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let ticks = Subject::new();
/// let total = Rc::new(Cell::new(0));
/// let scope = lifecycle_scope(false);
///
/// let sink = total.clone();
/// scope.run(|| use_subscription(&ticks, Observer::new().on_next(move |n: i32| sink.set(sink.get() + n))));
///
/// ticks.next(2);
/// scope.stop();
/// ticks.next(3);
/// assert_eq!(total.get(), 2);
/// ```
pub fn use_subscription<T: 'static>(observable: &impl Observable<T>, observer: Observer<T>) -> Subscription {
    subscribe_to(observable, observer)
}

// =============================================================================
// REACTIVE CELL ADAPTER
// =============================================================================

/// Materialize a stream into a read-only cell.
///
/// The cell holds `default` until the first emission, then the latest
/// value. A stream error panics: stream errors in a UI binding are
/// programmer errors.
///
/// # Example
///
/// ```
/// use spark_rx::{lifecycle_scope, use_observable, Subject};
///
/// let status = Subject::new();
/// let scope = lifecycle_scope(false);
/// let cell = scope.run(|| use_observable(&status, Some("idle"))).unwrap();
///
/// assert_eq!(cell.get(), Some("idle"));
/// status.next("loading");
/// assert_eq!(cell.get(), Some("loading"));
/// ```
pub fn use_observable<T>(observable: &impl Observable<T>, default: Option<T>) -> ReadonlyRef<Option<T>>
where
    T: Clone + PartialEq + 'static,
{
    let cell = Ref::new(default);
    let writer = cell.clone();
    subscribe_to(
        observable,
        Observer::new()
            .on_next(move |value| {
                writer.set(Some(value));
            })
            .on_error(|err| panic!("stream error in use_observable: {err}")),
    );
    cell.readonly()
}

/// Like [`use_observable`] with a non-optional seed.
pub fn use_observable_or<T>(observable: &impl Observable<T>, default: T) -> ReadonlyRef<T>
where
    T: Clone + PartialEq + 'static,
{
    let cell = Ref::new(default);
    let writer = cell.clone();
    subscribe_to(
        observable,
        Observer::new()
            .on_next(move |value| {
                writer.set(value);
            })
            .on_error(|err| panic!("stream error in use_observable: {err}")),
    );
    cell.readonly()
}

// =============================================================================
// EVENT-SUBJECT FACTORY
// =============================================================================

/// A subject and the plain callback that feeds it.
pub struct SubjectCallback<T> {
    pub subject: Subject<T>,
    pub callback: Rc<dyn Fn(T)>,
}

impl<T: Clone + 'static> SubjectCallback<T> {
    /// Same as calling `callback`.
    pub fn emit(&self, event: T) {
        (self.callback)(event);
    }
}

impl<T> fmt::Debug for SubjectCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectCallback")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Pair a fresh subject with a callback that forwards into `subject.next`.
///
/// Delivery is synchronous: subscribers see the value before the callback
/// returns.
pub fn rx_init_subject_callback<T: Clone + 'static>() -> SubjectCallback<T> {
    let subject = Subject::new();
    let target = subject.clone();
    SubjectCallback {
        subject,
        callback: Rc::new(move |event| target.next(event)),
    }
}

// =============================================================================
// TESTS
// =============================================================================
