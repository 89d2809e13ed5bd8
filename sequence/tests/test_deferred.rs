/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use sequence::{
    deferred::{defer, DeferredSequence},
    generate::range,
    Sequence, SequenceError, SequenceExt,
};
use test_utils::{init_logging, Counter};

fn counting_factory(counter: &Counter) -> impl FnMut(&i64) -> Result<Vec<i64>, SequenceError> {
    let counter = counter.clone();
    move |max: &i64| {
        counter.increment();
        Ok((1..=*max).collect())
    }
}

#[test]
fn every_drain_rebuilds_the_source() {
    init_logging();
    let counter = Counter::new();
    let mut deferred = DeferredSequence::new(counting_factory(&counter), 3);

    let mut output = String::new();
    for _ in 0..5 {
        output.push_str(&deferred.implode("").unwrap());
    }

    assert_eq!(counter.get(), 5);
    assert_eq!(deferred.materializations(), 5);
    assert_eq!(output, "123123123123123");
}

#[test]
fn construction_is_lazy() {
    init_logging();
    let counter = Counter::new();
    let deferred = DeferredSequence::new(counting_factory(&counter), 3);
    assert_eq!(counter.get(), 0);
    assert!(!deferred.is_materialized());
}

#[test]
fn manual_drain_then_resets_invoke_the_factory_once_more_per_reset() {
    init_logging();
    let counter = Counter::new();
    let mut deferred = DeferredSequence::new(counting_factory(&counter), 2);

    let resets = 3;
    for _ in 0..=resets {
        let mut drained = Vec::new();
        while let Some(value) = deferred.current_value().unwrap().copied() {
            drained.push(value);
            deferred.advance().unwrap();
        }
        assert_eq!(drained, vec![1, 2]);
        assert!(!deferred.has_current().unwrap());
        deferred.reset().unwrap();
    }

    assert_eq!(counter.get(), resets + 1);
}

#[test]
fn instances_sharing_a_factory_are_independent() {
    init_logging();
    let first_counter = Counter::new();
    let second_counter = Counter::new();
    let mut first = DeferredSequence::new(counting_factory(&first_counter), 4);
    let mut second = DeferredSequence::new(counting_factory(&second_counter), 4);

    assert_eq!(first.to_vec().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(first.to_vec().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(first_counter.get(), 2);
    assert_eq!(second_counter.get(), 0);

    assert_eq!(second.current_value().unwrap(), Some(&1));
    assert_eq!(second_counter.get(), 1);
    assert_eq!(first.materializations(), 2);
}

#[test]
fn factory_arguments_are_passed_through() {
    init_logging();
    let mut deferred = DeferredSequence::new(|&(start, end): &(i64, i64)| range(start, end, 1), (3, 5));
    assert_eq!(deferred.arguments(), &(3, 5));
    assert_eq!(deferred.to_vec().unwrap(), vec![3, 4, 5]);
}

#[test]
fn factory_failure_propagates_and_is_retried() {
    init_logging();
    let counter = Counter::new();
    let attempts = counter.clone();
    let mut deferred = defer(move || {
        attempts.increment();
        range(1, 3, if attempts.get() == 1 { 0 } else { 1 })
    });

    assert!(matches!(deferred.to_vec(), Err(SequenceError::InvalidArgument { operation: "range", .. })));
    assert!(!deferred.is_materialized());
    assert_eq!(deferred.to_vec().unwrap(), vec![1, 2, 3]);
    assert_eq!(counter.get(), 2);
}
