// ============================================================================
// spark-rx - Stream Module
// The Observable contract: observers, subscriptions, subjects, operators
// ============================================================================

pub mod observable;
pub mod operators;
pub mod subject;
pub mod subscription;

pub use observable::{empty, never, of, throw_error, Observable, Observer, Stream, Subscriber};
pub use subject::Subject;
pub use subscription::{Subscription, Teardown};
