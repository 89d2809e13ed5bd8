/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fs::File,
    io::{self, Read, Write},
};

use options::StreamOptions;
use sequence::{
    generate::{empty, explode, just, lines, lines_with_options, range, repeat, repeat_for_keys},
    normalize::IntoSequence,
    Sequence, SequenceError, SequenceExt,
};
use test_utils::{create_tmp_dir, init_logging};

#[test]
fn ranges_are_inclusive_in_both_directions() {
    init_logging();
    assert_eq!(range(1, 5, 1).unwrap().to_vec().unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(range(0, 10, 4).unwrap().to_vec().unwrap(), vec![0, 4, 8]);
    assert_eq!(range(5, 1, 2).unwrap().to_vec().unwrap(), vec![5, 3, 1]);
    assert_eq!(range(3, 3, 1).unwrap().to_pairs().unwrap(), vec![(0, 3)]);
    assert_eq!(range(i64::MAX - 1, i64::MAX, 5).unwrap().count().unwrap(), 1);
}

#[test]
fn range_rejects_non_positive_steps() {
    init_logging();
    assert!(matches!(range(1, 5, 0), Err(SequenceError::InvalidArgument { operation: "range", .. })));
    assert!(matches!(range(1, 5, -1), Err(SequenceError::InvalidArgument { .. })));
}

#[test]
fn repeat_generators() {
    init_logging();
    assert_eq!(repeat("a", Some(3)).implode("").unwrap(), "aaa");
    assert_eq!(repeat(1, Some(0)).count().unwrap(), 0);
    assert_eq!(repeat(7, None).take(2).to_vec().unwrap(), vec![7, 7]);
    assert_eq!(
        repeat_for_keys(vec!["x", "y"].into_sequence(), false).to_pairs().unwrap(),
        vec![("x", false), ("y", false)]
    );
    assert_eq!(just(9).to_pairs().unwrap(), vec![(0, 9)]);
    assert_eq!(empty::<usize, i32>().to_vec().unwrap(), Vec::<i32>::new());
}

#[test]
fn explode_keeps_empty_pieces() {
    init_logging();
    assert_eq!(explode("a,b,,c", ",").unwrap().to_vec().unwrap(), vec!["a", "b", "", "c"]);
    assert_eq!(explode("one::two::", "::").unwrap().to_vec().unwrap(), vec!["one", "two", ""]);
    assert_eq!(explode("", ",").unwrap().count().unwrap(), 1);
    assert!(matches!(explode("abc", ""), Err(SequenceError::InvalidArgument { operation: "explode", .. })));
}

#[test]
fn lines_are_read_lazily_and_released() {
    init_logging();
    let directory = create_tmp_dir();
    let path = directory.path().join("input.txt");
    File::create(&path).unwrap().write_all(b"first\r\nsecond\n\nlast").unwrap();

    let mut lines = lines_with_options(File::open(&path).unwrap(), &StreamOptions { buffer_length: 4 });
    assert!(!lines.is_released());
    assert_eq!(lines.current_value().unwrap().map(String::as_str), Some("first"));

    let mut collected = Vec::new();
    while let Some(line) = lines.current_value().unwrap().cloned() {
        collected.push(line);
        lines.advance().unwrap();
    }
    assert_eq!(collected, vec!["first", "second", "", "last"]);
    assert!(lines.is_released());
    assert!(matches!(lines.reset(), Err(SequenceError::CannotRewind { kind: "lines" })));
}

#[test]
fn rewindable_lines_can_be_replayed() {
    init_logging();
    let mut replayable = lines("alpha\nbeta\n".as_bytes()).rewindable();
    assert_eq!(replayable.to_vec().unwrap(), vec!["alpha", "beta"]);
    assert_eq!(replayable.to_vec().unwrap(), vec!["alpha", "beta"]);
}

struct BrokenReader;

impl Read for BrokenReader {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
    }
}

#[test]
fn read_failures_release_the_reader() {
    init_logging();
    let mut lines = lines(BrokenReader);
    let error = lines.current().unwrap_err();
    assert!(matches!(error, SequenceError::Io { operation: "lines", .. }));
    assert!(lines.is_released());
}
