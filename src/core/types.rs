// ============================================================================
// spark-rx - Type Definitions
// Type-erased traits and callback aliases shared by streams and bindings
// ============================================================================

use std::any::Any;
use std::rc::Rc;

use thiserror::Error;

// =============================================================================
// TYPE-ERASED TRAITS
// =============================================================================
//
// A disposable aggregate stores subscriptions of every value type side by
// side. Disposal never needs T, so subscriptions are stored as
// Box<dyn Unsubscribable>.
// =============================================================================

/// Anything that can release an upstream resource.
///
/// `unsubscribe` must be idempotent: every call after the first has no effect.
pub trait Unsubscribable: Any {
    /// Release the resource.
    fn unsubscribe(&self);

    /// Whether the resource has already been released.
    fn is_closed(&self) -> bool;
}

// =============================================================================
// CALLBACK ALIASES
// =============================================================================

/// `next` callback. `Fn` so it can be invoked re-entrantly.
pub type NextFn<T> = Rc<dyn Fn(T)>;

/// `error` callback
pub type ErrorFn = Rc<dyn Fn(StreamError)>;

/// `complete` callback
pub type CompleteFn = Rc<dyn Fn()>;

// =============================================================================
// STREAM ERROR
// =============================================================================

/// Error value carried by a stream's `error` channel.
///
/// Cheap to clone so a subject can deliver the same error to every
/// subscriber.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StreamError {
    message: Rc<str>,
}

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Rc::from(message.into()),
        }
    }

    /// Wrap any displayable error.
    pub fn from_error(err: &dyn std::error::Error) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl PartialEq for StreamError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl From<&str> for StreamError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for StreamError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

// =============================================================================
// TESTS
// =============================================================================
