/// Property-based tests for resolution
///
/// Identity and isolation must hold for any mix of contexts and access
/// orders, not just the hand-written cases.

use ferrous_scope::{Application, Component, PoolError};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug)]
struct Payload {
    value: String,
}

#[derive(Debug)]
struct Tally(u64);

proptest! {
    #[test]
    fn pooled_identity_holds_per_context(
        value in "\\PC{0,40}",
        accesses in prop::collection::vec(0usize..4, 1..40),
    ) {
        let stored = value.clone();
        let mut builder = Application::builder();
        builder.bind_service(move || Payload { value: stored.clone() });
        let app = builder.build().unwrap();

        let scopes: Vec<_> = (0..4).map(|_| app.open_scope()).collect();
        let mut first: Vec<Option<Arc<Payload>>> = vec![None; 4];

        for index in accesses {
            let resolved = scopes[index].service::<Payload>();
            prop_assert_eq!(&resolved.value, &value);
            match &first[index] {
                Some(seen) => prop_assert!(Arc::ptr_eq(seen, &resolved)),
                None => first[index] = Some(resolved),
            }
        }

        let distinct: Vec<&Arc<Payload>> = first.iter().flatten().collect();
        for (i, a) in distinct.iter().enumerate() {
            for b in distinct.iter().skip(i + 1) {
                prop_assert!(!Arc::ptr_eq(a, b));
            }
        }
    }
}

proptest! {
    #[test]
    fn single_components_are_shared_everywhere(seed in any::<u64>(), contexts in 1usize..12) {
        let mut builder = Application::builder();
        builder.bind_component(Component::single(Tally(seed)));
        let app = builder.build().unwrap();

        let resolved: Vec<Arc<Tally>> = (0..contexts)
            .map(|_| app.scoped(|ctx| ctx.component::<Tally>()))
            .collect();
        for tally in &resolved {
            prop_assert!(Arc::ptr_eq(tally, &resolved[0]));
            prop_assert_eq!(tally.0, seed);
        }
    }
}

proptest! {
    #[test]
    fn resolution_matches_registration(register in any::<bool>()) {
        let mut builder = Application::builder();
        if register {
            builder.bind_repository(|| Tally(7));
        }
        let app = builder.build().unwrap();
        let result = app.scoped(|ctx| ctx.try_repository::<Tally>());

        if register {
            prop_assert_eq!(result.unwrap().0, 7);
        } else {
            let is_not_bound = matches!(result, Err(PoolError::NotBound { .. }));
            prop_assert!(is_not_bound);
        }
    }
}

proptest! {
    #[test]
    fn last_binding_wins(values in prop::collection::vec(any::<u64>(), 1..10)) {
        let mut builder = Application::builder();
        for value in values.clone() {
            builder.bind_service(move || Tally(value));
        }
        let app = builder.build().unwrap();
        let resolved = app.scoped(|ctx| ctx.service::<Tally>().0);
        prop_assert_eq!(Some(&resolved), values.last());
        prop_assert_eq!(app.bindings().len(), 1);
    }
}
