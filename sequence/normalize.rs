/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    collections::{BTreeMap, VecDeque},
    error::Error,
    iter::Enumerate,
};

use crate::{error::SequenceError, Sequence};

/// Anything that can be viewed as a sequence. Sequences convert to themselves.
///
/// Plain iterators are one-shot, so they are not converted implicitly; wrap
/// them with [`from_iter`], [`from_pairs`] or [`from_results`] instead.
pub trait IntoSequence {
    type IntoSeq: Sequence;

    fn into_sequence(self) -> Self::IntoSeq;
}

impl<S: Sequence> IntoSequence for S {
    type IntoSeq = S;

    fn into_sequence(self) -> S {
        self
    }
}

impl<T> IntoSequence for Vec<T> {
    type IntoSeq = VecSequence<T>;

    fn into_sequence(self) -> VecSequence<T> {
        VecSequence::new(self)
    }
}

impl<T, const N: usize> IntoSequence for [T; N] {
    type IntoSeq = VecSequence<T>;

    fn into_sequence(self) -> VecSequence<T> {
        VecSequence::new(Vec::from(self))
    }
}

impl<T> IntoSequence for VecDeque<T> {
    type IntoSeq = VecSequence<T>;

    fn into_sequence(self) -> VecSequence<T> {
        VecSequence::new(Vec::from(self))
    }
}

impl<K, V> IntoSequence for BTreeMap<K, V> {
    type IntoSeq = PairSequence<K, V>;

    fn into_sequence(self) -> PairSequence<K, V> {
        PairSequence::new(self.into_iter().collect())
    }
}

pub fn normalize<I: IntoSequence>(source: I) -> I::IntoSeq {
    source.into_sequence()
}

/// Owned values keyed by position. Fully rewindable.
#[derive(Debug, Clone)]
pub struct VecSequence<T> {
    items: Vec<T>,
    position: usize,
}

impl<T> VecSequence<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, position: 0 }
    }
}

impl<T> Sequence for VecSequence<T> {
    type Key = usize;
    type Value = T;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.position < self.items.len() {
            self.position += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &T)>, SequenceError> {
        Ok(self.items.get(self.position).map(|item| (&self.position, item)))
    }
}

/// Owned `(key, value)` entries in their given order. Fully rewindable.
#[derive(Debug, Clone)]
pub struct PairSequence<K, V> {
    entries: Vec<(K, V)>,
    position: usize,
}

impl<K, V> PairSequence<K, V> {
    pub fn new(entries: Vec<(K, V)>) -> Self {
        Self { entries, position: 0 }
    }
}

impl<K, V> Sequence for PairSequence<K, V> {
    type Key = K;
    type Value = V;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.position < self.entries.len() {
            self.position += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&K, &V)>, SequenceError> {
        Ok(self.entries.get(self.position).map(|(key, value)| (key, value)))
    }
}

/// A one-shot source over an iterator of fallible entries.
///
/// It pulls one item ahead of the consumer at most. Rewinding is only allowed
/// before the first advance; afterwards `reset` fails with `CannotRewind`.
/// A failed pull is sticky: every later call returns the same error.
pub struct IterSequence<I, K, V> {
    iter: I,
    entry: Option<(K, V)>,
    failure: Option<SequenceError>,
    started: bool,
    position: usize,
}

impl<I, K, V> IterSequence<I, K, V>
where
    I: Iterator<Item = Result<(K, V), SequenceError>>,
{
    pub fn new(iter: I) -> Self {
        Self { iter, entry: None, failure: None, started: false, position: 0 }
    }

    fn pull(&mut self) -> Result<(), SequenceError> {
        self.started = true;
        match self.iter.next() {
            None => self.entry = None,
            Some(Ok(entry)) => self.entry = Some(entry),
            Some(Err(error)) => {
                self.entry = None;
                self.failure = Some(error.clone());
                return Err(error);
            }
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), SequenceError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if !self.started {
            self.pull()?;
        }
        Ok(())
    }
}

impl<I, K, V> Sequence for IterSequence<I, K, V>
where
    I: Iterator<Item = Result<(K, V), SequenceError>>,
{
    type Key = K;
    type Value = V;

    fn reset(&mut self) -> Result<(), SequenceError> {
        if self.position > 0 {
            return Err(SequenceError::CannotRewind { kind: "iterator" });
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.start()?;
        if self.entry.is_some() {
            self.position += 1;
            self.pull()?;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&K, &V)>, SequenceError> {
        self.start()?;
        Ok(self.entry.as_ref().map(|(key, value)| (key, value)))
    }
}

/// Items of an iterator paired with their position.
pub struct Positioned<I> {
    iter: Enumerate<I>,
}

impl<I: Iterator> Iterator for Positioned<I> {
    type Item = Result<(usize, I::Item), SequenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(Ok)
    }
}

pub type FromIter<I> = IterSequence<Positioned<I>, usize, <I as Iterator>::Item>;

pub fn from_iter<I: IntoIterator>(iter: I) -> FromIter<I::IntoIter> {
    IterSequence::new(Positioned { iter: iter.into_iter().enumerate() })
}

pub fn from_pairs<I, K, V>(iter: I) -> IterSequence<impl Iterator<Item = Result<(K, V), SequenceError>>, K, V>
where
    I: IntoIterator<Item = (K, V)>,
{
    IterSequence::new(iter.into_iter().map(Ok))
}

/// Failed items surface as `SourceFailure` at the position they occur.
pub fn from_results<I, T, E>(iter: I) -> IterSequence<impl Iterator<Item = Result<(usize, T), SequenceError>>, usize, T>
where
    I: IntoIterator<Item = Result<T, E>>,
    E: Error + Send + Sync + 'static,
{
    IterSequence::new(
        iter.into_iter()
            .enumerate()
            .map(|(position, item)| item.map(|value| (position, value)).map_err(SequenceError::source_failure)),
    )
}

pub fn from_fn<T, F>(generator: F) -> IterSequence<impl Iterator<Item = Result<(usize, T), SequenceError>>, usize, T>
where
    F: FnMut() -> Option<T>,
{
    from_iter(std::iter::from_fn(generator))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{from_iter, normalize, IntoSequence};
    use crate::{error::SequenceError, Sequence, SequenceExt};

    #[test]
    fn vectors_are_keyed_by_position_and_rewindable() {
        let mut sequence = vec!["a", "b"].into_sequence();
        assert_eq!(sequence.to_pairs().unwrap(), vec![(0, "a"), (1, "b")]);
        assert_eq!(sequence.to_pairs().unwrap(), vec![(0, "a"), (1, "b")]);
    }

    #[test]
    fn maps_keep_their_keys() {
        let map = BTreeMap::from([("x", 1), ("y", 2)]);
        assert_eq!(normalize(map).to_pairs().unwrap(), vec![("x", 1), ("y", 2)]);
    }

    #[test]
    fn sequences_normalize_to_themselves() {
        let mut sequence = normalize(normalize([1, 2, 3]));
        sequence.advance().unwrap();
        assert_eq!(sequence.current().unwrap(), Some((&1, &2)));
    }

    #[test]
    fn iterators_rewind_only_before_advancing() {
        let mut sequence = from_iter(1..=3);
        assert_eq!(sequence.current_value().unwrap(), Some(&1));
        sequence.reset().unwrap();
        sequence.advance().unwrap();
        assert!(matches!(sequence.reset(), Err(SequenceError::CannotRewind { .. })));
    }
}
