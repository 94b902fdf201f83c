use proptest::prelude::*;
use spark_rx::{
    bindings, install, lifecycle_scope, use_observable, App, DisposableAggregate, RxOptions,
    Subject, Subscription,
};
use std::cell::Cell;
use std::rc::Rc;

fn app() -> App {
    let mut app = App::new();
    install(&mut app);
    app
}

proptest! {
    #[test]
    fn property_holds_the_most_recent_emission(values in prop::collection::vec(any::<i64>(), 0..64)) {
        let app = app();
        let source = Subject::<i64>::new();
        let instance = app.create_instance("Latest", &RxOptions::new().subscriptions(bindings! { "v" => source.clone() }));

        prop_assert!(instance.is_undefined("v"));
        for value in &values {
            source.next(*value);
            prop_assert_eq!(instance.get::<i64>("v"), Some(*value));
        }
        prop_assert_eq!(instance.get::<i64>("v"), values.last().copied());

        app.unmount(&instance);
        source.next(i64::MIN);
        prop_assert_eq!(instance.get::<i64>("v"), values.last().copied());
    }

    #[test]
    fn use_observable_tracks_the_latest_value(
        default in any::<Option<u16>>(),
        values in prop::collection::vec(any::<u16>(), 0..32),
    ) {
        let source = Subject::<u16>::new();
        let scope = lifecycle_scope(false);
        let cell = scope.run(|| use_observable(&source, default)).unwrap();

        for value in &values {
            source.next(*value);
        }
        let expected = values.last().copied().or(default);
        prop_assert_eq!(cell.get(), expected);

        scope.stop();
        prop_assert_eq!(source.observer_count(), 0);
    }

    #[test]
    fn dispose_all_releases_each_member_exactly_once(members in 0usize..40, disposals in 1usize..4) {
        let released = Rc::new(Cell::new(0usize));
        let aggregate = DisposableAggregate::new();
        for _ in 0..members {
            let released = released.clone();
            aggregate.add(Subscription::from_fn(move || released.set(released.get() + 1)));
        }

        for _ in 0..disposals {
            aggregate.dispose_all();
        }
        prop_assert_eq!(released.get(), members);
    }
}
