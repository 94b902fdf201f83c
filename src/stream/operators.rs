// ============================================================================
// spark-rx - Operators
// The handful of transforms needed to compose bindings
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::stream::observable::{Observable, Observer, Stream, Subscriber};
use crate::stream::subscription::Teardown;

/// Observer that forwards `error` and `complete` to `downstream`.
fn forwarding<T, U: 'static>(downstream: &Subscriber<U>) -> Observer<T> {
    let on_error = downstream.clone();
    let on_complete = downstream.clone();
    Observer::new()
        .on_error(move |e| on_error.error(e))
        .on_complete(move || on_complete.complete())
}

impl<T: 'static> Stream<T> {
    /// Subscribe upstream with an observer built for each downstream
    /// subscriber. Unsubscribing downstream unsubscribes upstream.
    fn lift<U: 'static>(&self, operate: impl Fn(&Subscriber<U>) -> Observer<T> + 'static) -> Stream<U> {
        let source = self.clone();
        Stream::new(move |subscriber: Subscriber<U>| {
            let observer = operate(&subscriber);
            Teardown::from(source.subscribe(observer))
        })
    }

    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Stream<U> {
        let f = Rc::new(f);
        self.lift(move |downstream| {
            let f = f.clone();
            let out = downstream.clone();
            forwarding(downstream).on_next(move |v| out.next(f(v)))
        })
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        let predicate = Rc::new(predicate);
        self.lift(move |downstream| {
            let predicate = predicate.clone();
            let out = downstream.clone();
            forwarding(downstream).on_next(move |v| {
                if predicate(&v) {
                    out.next(v);
                }
            })
        })
    }

    /// Running accumulation, emitting every intermediate state.
    pub fn scan<A: Clone + 'static>(&self, seed: A, f: impl Fn(A, T) -> A + 'static) -> Stream<A> {
        let f = Rc::new(f);
        self.lift(move |downstream| {
            let f = f.clone();
            let acc = RefCell::new(seed.clone());
            let out = downstream.clone();
            forwarding(downstream).on_next(move |v| {
                let next = f(acc.borrow().clone(), v);
                *acc.borrow_mut() = next.clone();
                out.next(next);
            })
        })
    }

    /// Emit the first `count` values, then complete.
    pub fn take(&self, count: usize) -> Stream<T> {
        if count == 0 {
            return crate::stream::observable::empty();
        }
        self.lift(move |downstream| {
            let seen = Cell::new(0usize);
            let out = downstream.clone();
            forwarding(downstream).on_next(move |v| {
                let n = seen.get() + 1;
                seen.set(n);
                out.next(v);
                if n >= count {
                    out.complete();
                }
            })
        })
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Emit `value` synchronously on subscribe, then mirror the source.
    pub fn start_with(&self, value: T) -> Stream<T> {
        let source = self.clone();
        Stream::new(move |subscriber: Subscriber<T>| {
            subscriber.next(value.clone());
            if subscriber.is_closed() {
                return Teardown::empty();
            }
            let out = subscriber.clone();
            let observer = forwarding(&subscriber).on_next(move |v| out.next(v));
            Teardown::from(source.subscribe(observer))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
