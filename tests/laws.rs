//! Property-based tests for the composition laws of transducer graphs.

use proptest::prelude::*;
use millrace::reducer::collect;
use millrace::{bind, compose, identity, invoke, lift, CancelToken, Sum, Transducer};

fn run(t: &Transducer<i32, i32>, input: i32) -> Vec<i32> {
    invoke(t, input, Vec::new(), collect(), CancelToken::new())
        .value()
        .unwrap_or_default()
}

proptest! {
    #[test]
    fn prop_compose_is_associative(input in any::<i32>()) {
        let f = || lift(|x: i32| x.wrapping_add(1));
        let g = || lift(|x: i32| x.wrapping_mul(3));
        let h = || lift(|x: i32| x.wrapping_sub(7));

        let left = compose(compose(f(), g()), h());
        let right = compose(f(), compose(g(), h()));

        prop_assert_eq!(run(&left, input), run(&right, input));
    }

    #[test]
    fn prop_identity_is_neutral_for_compose(input in any::<i32>()) {
        let f = || lift(|x: i32| x.wrapping_mul(5));

        let plain = f();
        let left = compose(identity(), f());
        let right = compose(f(), identity());

        let expected = run(&plain, input);
        prop_assert_eq!(run(&left, input), expected.clone());
        prop_assert_eq!(run(&right, input), expected);
    }

    #[test]
    fn prop_map_fusion(input in any::<i32>()) {
        let mapped_twice = lift(|x: i32| x).map(|x| x.wrapping_add(2)).map(|x| x.wrapping_mul(3));
        let mapped_once = lift(|x: i32| x).map(|x| x.wrapping_add(2).wrapping_mul(3));

        prop_assert_eq!(run(&mapped_twice, input), run(&mapped_once, input));
    }

    #[test]
    fn prop_filter_commutes_with_itself(input in any::<i32>()) {
        let even_then_positive = identity::<i32>().filter(|x| x % 2 == 0).filter(|x| *x > 0);
        let positive_then_even = identity::<i32>().filter(|x| *x > 0).filter(|x| x % 2 == 0);

        prop_assert_eq!(run(&even_then_positive, input), run(&positive_then_even, input));
    }

    #[test]
    fn prop_bind_left_identity(input in -1000i32..1000) {
        // bind over a pure producer equals applying the continuation directly.
        let cont = |y: i32| lift(move |x: i32| x.wrapping_add(y));
        let via_bind = bind(lift(|x: i32| x.wrapping_mul(2)), cont);
        let direct = lift(|x: i32| x.wrapping_add(x.wrapping_mul(2)));

        prop_assert_eq!(run(&via_bind, input), run(&direct, input));
    }

    #[test]
    fn prop_sum_left_is_inert(input in any::<i32>()) {
        // A Left survives any number of Right-channel transformations.
        let t: Transducer<i32, Sum<String, i32>> = lift(|_: i32| Sum::Left("oops".to_string()))
            .map_right(|x: i32| x + 1)
            .filter_sum(|_| false)
            .map_right(|x: i32| x * 2);

        let out = invoke(&t, input, Vec::new(), collect(), CancelToken::new())
            .value()
            .unwrap_or_default();
        prop_assert_eq!(out, vec![Sum::Left("oops".to_string())]);
    }
}
