//! Integration tests for the schedule-driven control combinators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use millrace::reducer::collect;
use millrace::testing::{flaky, Probe};
use millrace::{
    choice, emit_each, fail, invoke, invoke1, lift, lift_result, memo, retry_sum, zip, CancelToken,
    Error, Schedule, Sum, Transducer,
};

#[test]
fn retry_makes_exactly_the_scheduled_attempts() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let observed = attempts.clone();
    let always_failing = lift_result(move |_: i32| -> Result<i32, Error> {
        observed.fetch_add(1, Ordering::SeqCst);
        Err(Error::message("down"))
    });

    let out = invoke1(&always_failing.retry(Schedule::attempts(3)), 1, CancelToken::new());
    assert!(out.is_fail());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn retry_succeeds_once_the_stage_recovers() {
    let t = flaky::<i32>(2).retry(Schedule::attempts(5));
    assert_eq!(invoke1(&t, 9, CancelToken::new()).value(), Some(9));
}

#[test]
fn retry_while_stops_on_non_matching_error() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let observed = attempts.clone();
    let failing = lift_result(move |_: i32| -> Result<i32, Error> {
        observed.fetch_add(1, Ordering::SeqCst);
        Err(Error::message("fatal"))
    });

    let t = failing.retry_while(Schedule::attempts(10), |e| e != &Error::message("fatal"));
    assert!(invoke1(&t, 1, CancelToken::new()).is_fail());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn repeat_reruns_and_yields_the_final_value() {
    let runs = Arc::new(AtomicUsize::new(0));
    let observed = runs.clone();
    let counting = lift(move |x: i32| {
        observed.fetch_add(1, Ordering::SeqCst);
        x
    });

    // attempts(4) = one initial run plus three scheduled re-runs.
    let out = invoke1(&counting.repeat(Schedule::attempts(4)), 5, CancelToken::new());
    assert_eq!(out.value(), Some(5));
    assert_eq!(runs.load(Ordering::SeqCst), 4);
}

#[test]
fn repeat_until_stops_at_the_predicate() {
    let runs = Arc::new(AtomicUsize::new(0));
    let observed = runs.clone();
    let counting = lift(move |_: i32| observed.fetch_add(1, Ordering::SeqCst) as i32);

    let t = counting.repeat_until(Schedule::forever(), |v| *v >= 2);
    assert_eq!(invoke1(&t, 0, CancelToken::new()).value(), Some(2));
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[test]
fn choice_takes_the_first_right_and_skips_the_rest() {
    let probe = Probe::new();
    let alternatives: Vec<Transducer<i32, Sum<String, i32>>> = vec![
        lift(|_: i32| Sum::Left("a".to_string())),
        lift(|_: i32| Sum::Right(42)),
        probe.tap::<i32>().map(|_| Sum::Left("b".to_string())),
    ];

    let out = invoke1(&choice(alternatives), 0, CancelToken::new());
    assert_eq!(out.value(), Some(Sum::Right(42)));
    assert_eq!(probe.calls(), 0);
}

#[test]
fn choice_of_all_lefts_completes_with_the_last_left() {
    let alternatives: Vec<Transducer<i32, Sum<String, i32>>> = vec![
        lift(|_: i32| Sum::Left("first".to_string())),
        lift(|_: i32| Sum::Left("last".to_string())),
    ];

    let out = invoke1(&choice(alternatives), 0, CancelToken::new());
    assert_eq!(out.value(), Some(Sum::Left("last".to_string())));
}

#[test]
fn choice_of_nothing_is_none() {
    let out = invoke1(
        &choice(Vec::<Transducer<i32, Sum<String, i32>>>::new()),
        0,
        CancelToken::new(),
    );
    assert!(out.is_none());
}

#[test]
fn choice_propagates_failure_immediately() {
    let alternatives: Vec<Transducer<i32, Sum<String, i32>>> = vec![
        fail("broken alternative"),
        lift(|_: i32| Sum::Right(1)),
    ];

    assert!(invoke1(&choice(alternatives), 0, CancelToken::new()).is_fail());
}

#[test]
fn retry_sum_reruns_on_left_then_forwards_it() {
    let runs = Arc::new(AtomicUsize::new(0));
    let observed = runs.clone();
    let always_left: Transducer<i32, Sum<String, i32>> = lift(move |_: i32| {
        observed.fetch_add(1, Ordering::SeqCst);
        Sum::Left("still left".to_string())
    });

    let out = invoke1(&retry_sum(Schedule::attempts(3), always_left), 0, CancelToken::new());
    assert_eq!(out.value(), Some(Sum::Left("still left".to_string())));
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[test]
fn retry_sum_converges_to_right() {
    let runs = Arc::new(AtomicUsize::new(0));
    let observed = runs.clone();
    let eventually_right: Transducer<i32, Sum<String, i32>> = lift(move |x: i32| {
        if observed.fetch_add(1, Ordering::SeqCst) < 1 {
            Sum::Left("warming up".to_string())
        } else {
            Sum::Right(x)
        }
    });

    let out = invoke1(&retry_sum(Schedule::attempts(5), eventually_right), 8, CancelToken::new());
    assert_eq!(out.value(), Some(Sum::Right(8)));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn fold_while_boundary_includes_the_triggering_value() {
    // 3, then 7, still under 10; 5 carries the sum to 12, which is emitted
    // with the triggering value included; the trailing 1 restarts a fold
    // that never fires.
    let sum_under_ten = emit_each::<Vec<i32>, i32>().fold_while(
        Schedule::forever(),
        0i32,
        |s, v| s + v,
        |s, _| *s < 10,
    );

    let out = invoke(
        &sum_under_ten,
        vec![3, 4, 5, 1],
        Vec::new(),
        collect(),
        CancelToken::new(),
    );
    assert_eq!(out.value(), Some(vec![12]));
}

#[test]
fn fold_while_accumulator_resets_after_emission() {
    let sum_under_five = emit_each::<Vec<i32>, i32>().fold_while(
        Schedule::forever(),
        0i32,
        |s, v| s + v,
        |s, _| *s < 5,
    );

    let out = invoke(
        &sum_under_five,
        vec![2, 4, 3, 3, 1],
        Vec::new(),
        collect(),
        CancelToken::new(),
    );
    // 2+4=6 fires; reset; 3+3=6 fires; reset; 1 never fires.
    assert_eq!(out.value(), Some(vec![6, 6]));
}

#[test]
fn fold_until_fires_once_the_predicate_starts_holding() {
    let batch_of_three = emit_each::<Vec<i32>, i32>().fold_until(
        Schedule::forever(),
        Vec::new(),
        |mut acc: Vec<i32>, v| {
            acc.push(v);
            acc
        },
        |acc, _| acc.len() >= 3,
    );

    let out = invoke(
        &batch_of_three,
        vec![1, 2, 3, 4, 5, 6, 7],
        Vec::new(),
        collect(),
        CancelToken::new(),
    );
    assert_eq!(out.value(), Some(vec![vec![1, 2, 3], vec![4, 5, 6]]));
}

#[test]
fn fold_emission_budget_completes_the_run() {
    let one_batch_only = emit_each::<Vec<i32>, i32>().fold_until(
        Schedule::attempts(1),
        0i32,
        |s, v| s + v,
        |_, _| true,
    );

    let out = invoke(
        &one_batch_only,
        vec![10, 20, 30],
        Vec::new(),
        collect(),
        CancelToken::new(),
    );
    // First value emits and exhausts the budget; the run completes.
    assert_eq!(out.value(), Some(vec![10]));
}

#[test]
fn zip_pairs_elementwise_and_drops_surplus() {
    let evens = emit_each::<Vec<i32>, i32>().filter(|v| v % 2 == 0);
    let all = emit_each::<Vec<i32>, i32>();
    let paired = zip(all, evens);

    let out = invoke(
        &paired,
        vec![1, 2, 3, 4],
        Vec::new(),
        collect(),
        CancelToken::new(),
    );
    assert_eq!(out.value(), Some(vec![(1, 2), (2, 4)]));
}

#[test]
fn memo_replays_without_reevaluating() {
    let probe = Probe::new();
    let expensive = memo(probe.tap::<i32>().map(|x| x * 2));

    assert_eq!(invoke1(&expensive, 3, CancelToken::new()).value(), Some(6));
    assert_eq!(invoke1(&expensive, 3, CancelToken::new()).value(), Some(6));
    assert_eq!(probe.calls(), 1);

    // A different input misses and re-runs.
    assert_eq!(invoke1(&expensive, 4, CancelToken::new()).value(), Some(8));
    assert_eq!(probe.calls(), 2);
}

#[test]
fn memo_caches_only_the_latest_input() {
    let probe = Probe::new();
    let expensive = memo(probe.tap::<i32>());

    invoke1(&expensive, 1, CancelToken::new());
    invoke1(&expensive, 2, CancelToken::new());
    invoke1(&expensive, 1, CancelToken::new());
    assert_eq!(probe.calls(), 3);
}
