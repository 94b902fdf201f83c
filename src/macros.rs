// ============================================================================
// spark-rx - Ergonomic Macros
// ============================================================================

/// Clone handles into a move closure.
///
/// Streams, subjects and cells are `Rc` handles; a callback that outlives
/// the current scope needs its own clone of each.
///
/// # Usage
///
/// ```rust
/// use spark_rx::{cloned, create_ref, Observable, Subject};
///
/// let clicks = Subject::new();
/// let total = create_ref(0);
///
/// let _sub = clicks.subscribe_next(cloned!(total => move |n: i32| {
///     total.update(|t| *t += n);
/// }));
///
/// clicks.next(2);
/// assert_eq!(total.get(), 2);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Build a [`BindingSet`](crate::BindingSet) from `key => stream` pairs.
///
/// # Usage
///
/// ```rust
/// use spark_rx::{bindings, of, Subject};
///
/// let plus = Subject::<()>::new();
/// let set = bindings! {
///     "count" => plus.as_stream().map(|_| 1).scan(0, |t, c| t + c).start_with(0),
///     "greeting" => of(["hello"]),
/// };
/// assert_eq!(set.len(), 2);
/// ```
#[macro_export]
macro_rules! bindings {
    () => {
        $crate::BindingSet::new()
    };
    ($($key:expr => $stream:expr),+ $(,)?) => {
        $crate::BindingSet::new()$(.stream($key, $stream))+
    };
}
