/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::rc::Rc;

use error::CodedError;
use options::ReplayOptions;
use sequence::{
    generate::range,
    normalize::{from_iter, from_pairs, from_results},
    pipe::{self, op},
    rewindable::Rewindable,
    Sequence, SequenceError, SequenceExt,
};
use test_utils::{failing_at, init_logging, Counter};

#[test]
fn partial_drain_then_reset_completes_the_cache() {
    init_logging();
    let mut rewindable = from_iter([10, 20, 30]).rewindable();

    assert_eq!(rewindable.current_value().unwrap(), Some(&10));
    rewindable.advance().unwrap();
    rewindable.reset().unwrap();

    assert!(rewindable.is_replaying());
    assert_eq!(rewindable.to_vec().unwrap(), vec![10, 20, 30]);
}

#[test]
fn replays_are_identical() {
    init_logging();
    let mut rewindable = from_pairs([("a", 1), ("b", 2), ("c", 3)]).rewindable();
    let first = rewindable.to_pairs().unwrap();
    let second = rewindable.to_pairs().unwrap();
    assert_eq!(first, vec![("a", 1), ("b", 2), ("c", 3)]);
    assert_eq!(first, second);
}

#[test]
fn source_is_pulled_once_across_replays() {
    init_logging();
    let pulls = Counter::new();
    let observed = pulls.clone();
    let mut rewindable = from_iter(1..=4).tap(move |_, _| observed.increment()).rewindable();

    for _ in 0..3 {
        assert_eq!(rewindable.reduce(0, |sum, value| sum + value).unwrap(), 10);
    }
    assert_eq!(pulls.get(), 4);
}

#[test]
fn full_drain_leaves_no_current_element() {
    init_logging();
    let mut rewindable = range(1, 5, 1).unwrap().rewindable();
    for _ in 0..5 {
        assert!(rewindable.has_current().unwrap());
        rewindable.advance().unwrap();
    }
    assert!(!rewindable.has_current().unwrap());
    rewindable.advance().unwrap();
    assert!(!rewindable.has_current().unwrap());
}

#[test]
fn seek_matches_draining_to_the_same_offset() {
    init_logging();
    let mut rewindable = range(1, 5, 1).unwrap().rewindable();
    rewindable.seek(2).unwrap();
    assert_eq!(rewindable.current().unwrap(), Some((&2, &3)));

    let mut fresh = range(1, 5, 1).unwrap().rewindable();
    fresh.advance().unwrap();
    fresh.advance().unwrap();
    assert_eq!(fresh.current_value().unwrap(), Some(&3));
}

#[test]
fn seek_past_the_end_fails() {
    init_logging();
    let mut rewindable = range(1, 5, 1).unwrap().rewindable();
    let error = rewindable.seek(5).unwrap_err();
    assert!(matches!(error, SequenceError::SeekOutOfBounds { position: 5, length: 5 }));
    assert_eq!(error.code(), "SEQ6");
}

#[test]
fn count_keeps_the_cursor_in_place() {
    init_logging();
    let mut rewindable = from_iter(["x", "y", "z"]).rewindable();
    rewindable.advance().unwrap();
    assert_eq!(rewindable.count().unwrap(), 3);
    assert_eq!(rewindable.position(), 1);
    assert_eq!(rewindable.current_value().unwrap(), Some(&"y"));
}

#[test]
fn sort_keeps_keys_with_their_values() {
    init_logging();
    let mut rewindable = Rewindable::new(from_pairs([(0, 5), (1, 3), (2, 4)]));
    rewindable.sort().unwrap();
    assert_eq!(rewindable.to_pairs().unwrap(), vec![(1, 3), (2, 4), (0, 5)]);
}

#[test]
fn sort_by_is_stable() {
    init_logging();
    let mut rewindable = from_iter([(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')]).rewindable();
    rewindable.sort_by(|left, right| left.0.cmp(&right.0)).unwrap();
    let order: String = rewindable.to_vec().unwrap().into_iter().map(|(_, letter)| letter).collect();
    assert_eq!(order, "bdac");
}

#[test]
fn shared_cursors_see_the_same_cache_until_one_sorts() {
    init_logging();
    let mut original = from_iter([3, 1, 2]).rewindable_with(&ReplayOptions { initial_cache_capacity: 2 });
    let mut shared = original.share().unwrap();

    shared.sort().unwrap();
    assert_eq!(shared.to_vec().unwrap(), vec![1, 2, 3]);
    assert_eq!(original.to_vec().unwrap(), vec![3, 1, 2]);
}

#[test]
fn one_shot_source_cannot_rewind_without_a_cache() {
    init_logging();
    let mut one_shot = from_iter([1, 2]);
    assert_eq!(one_shot.to_vec().unwrap(), vec![1, 2]);
    let error = one_shot.to_vec().unwrap_err();
    assert!(matches!(error, SequenceError::CannotRewind { kind: "iterator" }));
}

#[test]
fn failed_drain_poisons_later_operations() {
    init_logging();
    let mut rewindable = from_results(failing_at(vec![1, 2, 3, 4], 2)).rewindable();
    assert_eq!(rewindable.current_value().unwrap(), Some(&1));

    let drain_error = rewindable.reset().unwrap_err();
    assert!(matches!(drain_error, SequenceError::SourceFailure { .. }));

    for error in [
        rewindable.count().unwrap_err(),
        rewindable.seek(0).unwrap_err(),
        rewindable.sort().unwrap_err(),
        rewindable.reset().unwrap_err(),
        rewindable.advance().unwrap_err(),
    ] {
        assert!(matches!(error, SequenceError::PreconditionViolation { .. }));
        assert_eq!(error.code(), "SEQ3");
        assert_eq!(error.root_source_coded_error().code(), "SEQ4");
    }
    assert!(rewindable.current().is_err());
}

#[test]
fn failure_during_first_pass_propagates_without_poisoning() {
    init_logging();
    let mut rewindable = from_results(failing_at(vec![1, 2, 3], 1)).rewindable();
    assert_eq!(rewindable.current_value().unwrap(), Some(&1));
    let error = rewindable.advance().unwrap_err();
    assert!(matches!(error, SequenceError::SourceFailure { .. }));
    assert!(!rewindable.is_replaying());
}

#[test]
fn rewrapping_a_finished_cursor_shares_its_cache() {
    init_logging();
    let mut finished = from_iter(["p", "q", "r"]).rewindable();
    assert_eq!(finished.count().unwrap(), 3);
    let cache = finished.replay_cache().unwrap();

    let mut wrapped = finished.share().unwrap().boxed().rewindable();
    assert!(wrapped.is_replaying());
    assert!(Rc::ptr_eq(&wrapped.replay_cache().unwrap(), &cache));
    assert_eq!(wrapped.to_vec().unwrap(), vec!["p", "q", "r"]);

    let mut piped = pipe::pipe(finished, [op::rewindable()]).unwrap();
    assert!(Rc::ptr_eq(&piped.replay_cache().unwrap(), &cache));
    assert_eq!(piped.to_pairs().unwrap(), vec![(0, "p"), (1, "q"), (2, "r")]);
}

#[test]
fn adopted_cache_starts_at_the_first_element() {
    init_logging();
    let mut finished = from_iter([7, 8, 9]).rewindable();
    finished.seek(2).unwrap();
    let mut adopted = Rewindable::new(finished);
    assert_eq!(adopted.position(), 0);
    assert_eq!(adopted.current_value().unwrap(), Some(&7));
}
