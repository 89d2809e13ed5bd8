/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    io::{BufRead, BufReader, Read},
    marker::PhantomData,
};

use options::StreamOptions;
use tracing::{event, Level};

use crate::{error::SequenceError, normalize::VecSequence, Sequence};

/// Inclusive arithmetic progression keyed by position. Counts down when `start > end`.
#[derive(Debug, Clone)]
pub struct Range {
    start: i64,
    end: i64,
    step: i64,
    value: Option<i64>,
    position: usize,
}

pub fn range(start: i64, end: i64, step: i64) -> Result<Range, SequenceError> {
    if step <= 0 {
        return Err(SequenceError::invalid_argument("range", format!("the step must be positive, got {step}")));
    }
    Ok(Range { start, end, step, value: Some(start), position: 0 })
}

impl Range {
    fn next_value(&self, value: i64) -> Option<i64> {
        if self.start <= self.end {
            value.checked_add(self.step).filter(|next| *next <= self.end)
        } else {
            value.checked_sub(self.step).filter(|next| *next >= self.end)
        }
    }
}

impl Sequence for Range {
    type Key = usize;
    type Value = i64;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.value = Some(self.start);
        self.position = 0;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if let Some(value) = self.value {
            self.value = self.next_value(value);
            self.position += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &i64)>, SequenceError> {
        Ok(self.value.as_ref().map(|value| (&self.position, value)))
    }
}

/// The same value `times` times, or forever when `times` is `None`.
#[derive(Debug, Clone)]
pub struct Repeat<V> {
    value: V,
    times: Option<usize>,
    position: usize,
}

pub fn repeat<V>(value: V, times: Option<usize>) -> Repeat<V> {
    Repeat { value, times, position: 0 }
}

impl<V> Repeat<V> {
    fn exhausted(&self) -> bool {
        self.times.is_some_and(|times| self.position >= times)
    }
}

impl<V> Sequence for Repeat<V> {
    type Key = usize;
    type Value = V;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if !self.exhausted() {
            self.position += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &V)>, SequenceError> {
        if self.exhausted() {
            return Ok(None);
        }
        Ok(Some((&self.position, &self.value)))
    }
}

/// One entry per value of `keys`, each mapping that key to the same value.
pub struct RepeatForKeys<S, V> {
    keys: S,
    value: V,
}

pub fn repeat_for_keys<S: Sequence, V>(keys: S, value: V) -> RepeatForKeys<S, V> {
    RepeatForKeys { keys, value }
}

impl<S: Sequence, V> Sequence for RepeatForKeys<S, V> {
    type Key = S::Value;
    type Value = V;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.keys.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.keys.advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Value, &V)>, SequenceError> {
        let value = &self.value;
        Ok(self.keys.current()?.map(|(_, key)| (key, value)))
    }
}

pub struct Empty<K, V> {
    _phantom: PhantomData<fn() -> (K, V)>,
}

pub fn empty<K, V>() -> Empty<K, V> {
    Empty { _phantom: PhantomData }
}

impl<K, V> Sequence for Empty<K, V> {
    type Key = K;
    type Value = V;

    fn reset(&mut self) -> Result<(), SequenceError> {
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&K, &V)>, SequenceError> {
        Ok(None)
    }
}

pub fn just<V>(value: V) -> VecSequence<V> {
    VecSequence::new(vec![value])
}

/// Splits text on a delimiter lazily, keeping empty pieces.
#[derive(Debug, Clone)]
pub struct Explode {
    text: String,
    delimiter: String,
    offset: Option<usize>,
    piece: Option<String>,
    position: usize,
}

pub fn explode(text: impl Into<String>, delimiter: impl Into<String>) -> Result<Explode, SequenceError> {
    let delimiter = delimiter.into();
    if delimiter.is_empty() {
        return Err(SequenceError::invalid_argument("explode", "the delimiter must not be empty"));
    }
    Ok(Explode { text: text.into(), delimiter, offset: Some(0), piece: None, position: 0 })
}

impl Explode {
    fn piece_end(&self, offset: usize) -> usize {
        self.text[offset..].find(&self.delimiter).map_or(self.text.len(), |found| offset + found)
    }
}

impl Sequence for Explode {
    type Key = usize;
    type Value = String;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.offset = Some(0);
        self.piece = None;
        self.position = 0;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        let Some(offset) = self.offset else {
            return Ok(());
        };
        let end = self.piece_end(offset);
        self.offset = if end < self.text.len() { Some(end + self.delimiter.len()) } else { None };
        self.piece = None;
        self.position += 1;
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &String)>, SequenceError> {
        let Some(offset) = self.offset else {
            return Ok(None);
        };
        if self.piece.is_none() {
            self.piece = Some(self.text[offset..self.piece_end(offset)].to_owned());
        }
        Ok(self.piece.as_ref().map(|piece| (&self.position, piece)))
    }
}

/// Lines of a reader, without their terminators.
///
/// The reader is dropped as soon as the last line has been read or a read
/// fails, rather than when the sequence itself is dropped. Reading is
/// one-shot: rewinding after the first advance fails with `CannotRewind`.
pub struct Lines<R> {
    reader: Option<R>,
    line: Option<String>,
    started: bool,
    position: usize,
    buffer_length: usize,
}

pub fn lines<R: Read>(reader: R) -> Lines<BufReader<R>> {
    lines_with_options(reader, &StreamOptions::default())
}

pub fn lines_with_options<R: Read>(reader: R, options: &StreamOptions) -> Lines<BufReader<R>> {
    Lines::from_buffered(BufReader::with_capacity(options.buffer_length, reader), options)
}

impl<R: BufRead> Lines<R> {
    pub fn from_buffered(reader: R, options: &StreamOptions) -> Self {
        Self { reader: Some(reader), line: None, started: false, position: 0, buffer_length: options.buffer_length }
    }

    pub fn is_released(&self) -> bool {
        self.reader.is_none()
    }

    fn read_line(&mut self) -> Result<(), SequenceError> {
        self.started = true;
        self.line = None;
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };
        let mut line = String::with_capacity(self.buffer_length.min(256));
        match reader.read_line(&mut line) {
            Ok(0) => {
                event!(Level::TRACE, lines = self.position, "reader exhausted and released");
                self.reader = None;
            }
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                self.line = Some(line);
            }
            Err(error) => {
                self.reader = None;
                return Err(SequenceError::io("lines", error));
            }
        }
        Ok(())
    }
}

impl<R: BufRead> Sequence for Lines<R> {
    type Key = usize;
    type Value = String;

    fn reset(&mut self) -> Result<(), SequenceError> {
        if self.position > 0 {
            return Err(SequenceError::CannotRewind { kind: "lines" });
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if !self.started {
            self.read_line()?;
        }
        if self.line.is_some() {
            self.position += 1;
            self.read_line()?;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &String)>, SequenceError> {
        if !self.started {
            self.read_line()?;
        }
        Ok(self.line.as_ref().map(|line| (&self.position, line)))
    }
}
