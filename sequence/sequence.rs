/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

#![deny(unused_must_use)]

//! Lazy keyed sequences.
//!
//! A [`Sequence`] is a resettable cursor over `(key, value)` pairs. Adaptors in
//! [`SequenceExt`] wrap a source without pulling from it, so work only happens
//! when a terminal operation or the caller drives the cursor. Elements are
//! borrowed from the cursor, not handed out, which lets adaptors like
//! [`SequenceExt::flip`] and [`SequenceExt::keys`] avoid cloning.

use std::{
    collections::BTreeMap,
    fmt::Display,
    hash::Hash,
    io::{self, Cursor, Write},
    ops::ControlFlow,
    rc::Rc,
};

use itertools::Itertools;
use options::ReplayOptions;

pub use crate::error::SequenceError;
use crate::{
    adaptors::{
        Chain, Chunk, Debounce, Distinct, DropWhile, Filter, FlatMap, Flatten, Flip, Interpose, Keys, Map, MapKeys,
        Replay, Scan, Slice, TakeWhile, Tap, Validate, Values, Zip,
    },
    combine::Partition,
    flatten::{FlattenNested, Folded, Leaves, MapLeaves, Nested},
    func::{FieldEquals, Lookup, Pluck, Truthy},
    higher_order::{EntryFn, KeyFn, ValueFn},
    normalize::IntoSequence,
    reshape::{FromKeyPairs, KeyPairs, RemoveNulls, ReplaceKeys, ReplaceValues},
    rewindable::Rewindable,
};

pub mod adaptors;
pub mod collection;
pub mod combine;
pub mod deferred;
pub mod error;
pub mod flatten;
pub mod func;
pub mod generate;
pub mod higher_order;
pub mod normalize;
pub mod pipe;
pub mod reshape;
pub mod rewindable;

pub trait Sequence {
    type Key;
    type Value;

    /// Returns the cursor to the first element. A fresh cursor is already there.
    fn reset(&mut self) -> Result<(), SequenceError>;

    /// Moves past the current element. Has no effect once the sequence is exhausted.
    fn advance(&mut self) -> Result<(), SequenceError>;

    /// The element under the cursor, or `None` when exhausted.
    fn current(&mut self) -> Result<Option<(&Self::Key, &Self::Value)>, SequenceError>;

    fn has_current(&mut self) -> Result<bool, SequenceError> {
        Ok(self.current()?.is_some())
    }

    fn current_key(&mut self) -> Result<Option<&Self::Key>, SequenceError> {
        Ok(self.current()?.map(|(key, _)| key))
    }

    fn current_value(&mut self) -> Result<Option<&Self::Value>, SequenceError> {
        Ok(self.current()?.map(|(_, value)| value))
    }

    /// The complete replay cache behind this cursor, when it already holds one.
    /// [`Rewindable`] adopts it instead of caching the same elements again.
    fn replay_cache(&self) -> Option<Rc<Vec<(Self::Key, Self::Value)>>> {
        None
    }
}

pub type BoxedSequence<K, V> = Box<dyn Sequence<Key = K, Value = V>>;

impl<S: Sequence + ?Sized> Sequence for Box<S> {
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        (**self).reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        (**self).advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        (**self).current()
    }

    fn replay_cache(&self) -> Option<Rc<Vec<(S::Key, S::Value)>>> {
        (**self).replay_cache()
    }
}

impl<S: Sequence + ?Sized> Sequence for &mut S {
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        (**self).reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        (**self).advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        (**self).current()
    }

    fn replay_cache(&self) -> Option<Rc<Vec<(S::Key, S::Value)>>> {
        (**self).replay_cache()
    }
}

/// Adaptors build new lazy cursors and never touch the source. Terminals
/// reset the cursor first and then drive it to completion (or to the first
/// match), propagating any failure from the chain.
pub trait SequenceExt: Sequence + Sized {
    fn map<U, F>(self, mapper: F) -> Map<Self, ValueFn<F>, U>
    where
        F: FnMut(&Self::Value) -> U,
    {
        Map::new(self, ValueFn(mapper))
    }

    fn map_with_keys<U, F>(self, mapper: F) -> Map<Self, EntryFn<F>, U>
    where
        F: FnMut(&Self::Key, &Self::Value) -> U,
    {
        Map::new(self, EntryFn(mapper))
    }

    fn map_keys<J, F>(self, mapper: F) -> MapKeys<Self, KeyFn<F>, J>
    where
        F: FnMut(&Self::Key) -> J,
    {
        MapKeys::new(self, KeyFn(mapper))
    }

    /// Derives each element's key from its value.
    fn reindex<J, F>(self, key_of: F) -> MapKeys<Self, ValueFn<F>, J>
    where
        F: FnMut(&Self::Value) -> J,
    {
        MapKeys::new(self, ValueFn(key_of))
    }

    /// The value stored under `key` in each element, or `None` where it is absent.
    fn pluck<Q, U>(self, key: Q) -> Map<Self, Pluck<Q>, Option<U>>
    where
        Self::Value: Lookup<Q, Output = U>,
        U: Clone,
    {
        Map::new(self, Pluck(key))
    }

    fn to_key_pairs(self) -> KeyPairs<Self>
    where
        Self::Key: Clone,
        Self::Value: Clone,
    {
        KeyPairs::new(self)
    }

    fn from_key_pairs<K, V>(self) -> FromKeyPairs<Self>
    where
        Self: Sequence<Value = (K, V)>,
    {
        FromKeyPairs::new(self)
    }

    fn replace_keys<I: IntoSequence>(self, keys: I) -> ReplaceKeys<Self, I::IntoSeq> {
        ReplaceKeys::new(self, keys.into_sequence())
    }

    fn replace_values<I: IntoSequence>(self, values: I) -> ReplaceValues<Self, I::IntoSeq> {
        ReplaceValues::new(self, values.into_sequence())
    }

    fn keys(self) -> Keys<Self> {
        Keys::new(self)
    }

    fn values(self) -> Values<Self> {
        Values::new(self)
    }

    fn flip(self) -> Flip<Self> {
        Flip::new(self)
    }

    fn filter<F>(self, predicate: F) -> Filter<Self, ValueFn<F>>
    where
        F: FnMut(&Self::Value) -> bool,
    {
        Filter::new(self, ValueFn(predicate))
    }

    fn filter_keys<F>(self, predicate: F) -> Filter<Self, KeyFn<F>>
    where
        F: FnMut(&Self::Key) -> bool,
    {
        Filter::new(self, KeyFn(predicate))
    }

    fn filter_with_keys<F>(self, predicate: F) -> Filter<Self, EntryFn<F>>
    where
        F: FnMut(&Self::Key, &Self::Value) -> bool,
    {
        Filter::new(self, EntryFn(predicate))
    }

    /// Keeps the elements whose `key` is present and holds `expected`.
    fn filter_where<Q, U>(self, key: Q, expected: U) -> Filter<Self, FieldEquals<Q, U>>
    where
        Self::Value: Lookup<Q, Output = U>,
        U: PartialEq,
    {
        Filter::new(self, FieldEquals { key, expected })
    }

    fn remove_nulls<T>(self) -> RemoveNulls<Self>
    where
        Self: Sequence<Value = Option<T>>,
    {
        RemoveNulls::new(self)
    }

    /// Drops every value that is not [`Truthy`].
    fn remove_empty(self) -> Filter<Self, ValueFn<fn(&Self::Value) -> bool>>
    where
        Self::Value: Truthy,
    {
        Filter::new(self, ValueFn(<Self::Value as Truthy>::is_truthy as fn(&Self::Value) -> bool))
    }

    fn take_while<F>(self, predicate: F) -> TakeWhile<Self, ValueFn<F>>
    where
        F: FnMut(&Self::Value) -> bool,
    {
        TakeWhile::new(self, ValueFn(predicate))
    }

    fn drop_while<F>(self, predicate: F) -> DropWhile<Self, ValueFn<F>>
    where
        F: FnMut(&Self::Value) -> bool,
    {
        DropWhile::new(self, ValueFn(predicate))
    }

    fn slice(self, offset: usize, length: Option<usize>) -> Slice<Self> {
        Slice::new(self, offset, length)
    }

    fn take(self, count: usize) -> Slice<Self> {
        Slice::new(self, 0, Some(count))
    }

    fn skip(self, count: usize) -> Slice<Self> {
        Slice::new(self, count, None)
    }

    fn debounce(self) -> Debounce<Self>
    where
        Self::Value: Clone + PartialEq,
    {
        Debounce::new(self)
    }

    fn distinct(self) -> Distinct<Self>
    where
        Self::Value: Clone + Hash + Eq,
    {
        Distinct::new(self)
    }

    /// [`distinct`](Self::distinct) for values that are only `PartialEq`. Each
    /// element is compared against every value yielded before it.
    fn distinct_by_equality(self) -> Distinct<Self, Vec<Self::Value>>
    where
        Self::Value: Clone + PartialEq,
    {
        Distinct::new(self)
    }

    fn partition(self, count: usize) -> Result<Partition<Self>, SequenceError>
    where
        Self::Value: Clone,
    {
        Partition::new(self, count)
    }

    fn chunk(self, size: usize) -> Result<Chunk<Self>, SequenceError>
    where
        Self::Value: Clone,
    {
        Chunk::new(self, size)
    }

    fn zip<I: IntoSequence>(self, other: I) -> Zip<Self, I::IntoSeq> {
        Zip::new(self, other.into_sequence())
    }

    fn chain<I>(self, other: I) -> Chain<Self, I::IntoSeq>
    where
        I: IntoSequence,
        I::IntoSeq: Sequence<Key = Self::Key, Value = Self::Value>,
    {
        Chain::new(self, other.into_sequence())
    }

    fn scan<A, F>(self, initial: A, reducer: F) -> Scan<Self, A, F>
    where
        A: Clone,
        F: FnMut(&A, &Self::Value) -> A,
    {
        Scan::new(self, initial, reducer)
    }

    /// Expands every value one level; each value must itself be sequence-like.
    fn flatten(self) -> Flatten<Self>
    where
        Self::Value: IntoSequence + Clone,
    {
        FlatMap::new(self, ValueFn(<Self::Value as Clone>::clone as fn(&Self::Value) -> Self::Value))
    }

    fn flat_map<J, F>(self, expand: F) -> FlatMap<Self, ValueFn<F>, J>
    where
        J: IntoSequence,
        F: FnMut(&Self::Value) -> J,
    {
        FlatMap::new(self, ValueFn(expand))
    }

    fn flatten_nested<T>(self, levels: usize) -> FlattenNested<Self, T>
    where
        Self: Sequence<Value = Nested<T>>,
        T: Clone,
    {
        FlattenNested::new(self, levels)
    }

    fn leaves<T>(self) -> Leaves<Self, T>
    where
        Self: Sequence<Value = Nested<T>>,
        T: Clone,
    {
        Leaves::new(self)
    }

    /// Maps every leaf of nested values, keeping their shape.
    fn map_recursive<T, U, F>(self, mapper: F) -> Map<Self, MapLeaves<F>, Nested<U>>
    where
        Self: Sequence<Value = Nested<T>>,
        F: FnMut(&T) -> U,
    {
        Map::new(self, MapLeaves(mapper))
    }

    fn interpose(self, separator: Self::Value) -> Interpose<Self, Self::Value> {
        Interpose::new(self, separator)
    }

    fn tap<F>(self, effect: F) -> Tap<Self, F>
    where
        F: FnMut(&Self::Key, &Self::Value),
    {
        Tap::new(self, effect)
    }

    fn validate<F>(self, predicate: F) -> Validate<Self, F>
    where
        F: FnMut(&Self::Value) -> bool,
    {
        Validate::new(self, predicate)
    }

    /// Repeats the elements `times` times, or without end for `None`. The source is pulled once.
    fn replay(self, times: Option<usize>) -> Replay<Self>
    where
        Self::Key: Clone,
        Self::Value: Clone,
    {
        Replay::new(Rewindable::new(self), times)
    }

    fn rewindable(self) -> Rewindable<Self>
    where
        Self::Key: Clone,
        Self::Value: Clone,
    {
        Rewindable::new(self)
    }

    fn rewindable_with(self, options: &ReplayOptions) -> Rewindable<Self>
    where
        Self::Key: Clone,
        Self::Value: Clone,
    {
        Rewindable::with_options(self, options)
    }

    fn boxed(self) -> BoxedSequence<Self::Key, Self::Value>
    where
        Self: 'static,
    {
        Box::new(self)
    }

    /// Adapts the cursor, from its current position, into a standard iterator of owned entries.
    fn into_entries(self) -> IntoIter<Self> {
        IntoIter::new(self)
    }

    fn for_each_entry<F>(&mut self, mut visit: F) -> Result<(), SequenceError>
    where
        F: FnMut(&Self::Key, &Self::Value) -> ControlFlow<()>,
    {
        self.reset()?;
        loop {
            let Some((key, value)) = self.current()? else {
                break;
            };
            if visit(key, value).is_break() {
                break;
            }
            self.advance()?;
        }
        Ok(())
    }

    fn apply<F>(&mut self, mut effect: F) -> Result<(), SequenceError>
    where
        F: FnMut(&Self::Key, &Self::Value),
    {
        self.for_each_entry(|key, value| {
            effect(key, value);
            ControlFlow::Continue(())
        })
    }

    /// Visits every leaf of nested values in depth-first order.
    fn apply_recursive<T, F>(&mut self, mut effect: F) -> Result<(), SequenceError>
    where
        Self: Sequence<Value = Nested<T>>,
        F: FnMut(&T),
    {
        self.apply(|_, value| value.iter_leaves().for_each(&mut effect))
    }

    fn to_vec(&mut self) -> Result<Vec<Self::Value>, SequenceError>
    where
        Self::Value: Clone,
    {
        let mut values = Vec::new();
        self.apply(|_, value| values.push(value.clone()))?;
        Ok(values)
    }

    fn to_pairs(&mut self) -> Result<Vec<(Self::Key, Self::Value)>, SequenceError>
    where
        Self::Key: Clone,
        Self::Value: Clone,
    {
        let mut pairs = Vec::new();
        self.apply(|key, value| pairs.push((key.clone(), value.clone())))?;
        Ok(pairs)
    }

    /// Collects into a map; a repeated key keeps its last value.
    fn to_map(&mut self) -> Result<BTreeMap<Self::Key, Self::Value>, SequenceError>
    where
        Self::Key: Clone + Ord,
        Self::Value: Clone,
    {
        let mut map = BTreeMap::new();
        self.apply(|key, value| {
            map.insert(key.clone(), value.clone());
        })?;
        Ok(map)
    }

    fn reduce<A, F>(&mut self, initial: A, mut reducer: F) -> Result<A, SequenceError>
    where
        F: FnMut(A, &Self::Value) -> A,
    {
        self.reset()?;
        let mut accumulator = initial;
        loop {
            let Some((_, value)) = self.current()? else {
                break;
            };
            accumulator = reducer(accumulator, value);
            self.advance()?;
        }
        Ok(accumulator)
    }

    /// Reduces nested values. A branch is first reduced on its own, starting again
    /// from `initial`, and its result reaches `reducer` as [`Folded::Branch`].
    fn reduce_recursive<T, A, F>(&mut self, initial: A, mut reducer: F) -> Result<A, SequenceError>
    where
        Self: Sequence<Value = Nested<T>>,
        A: Clone,
        F: FnMut(A, Folded<'_, T, A>) -> A,
    {
        self.reduce(initial.clone(), |accumulator, value| {
            let folded = match value {
                Nested::Leaf(leaf) => Folded::Leaf(leaf),
                Nested::Branch(children) => Folded::Branch(Nested::fold_children(children, &initial, &mut reducer)),
            };
            reducer(accumulator, folded)
        })
    }

    fn count(&mut self) -> Result<usize, SequenceError> {
        self.reduce(0, |count, _| count + 1)
    }

    fn first(&mut self) -> Result<Option<Self::Value>, SequenceError>
    where
        Self::Value: Clone,
    {
        self.reset()?;
        Ok(self.current_value()?.cloned())
    }

    fn last(&mut self) -> Result<Option<Self::Value>, SequenceError>
    where
        Self::Value: Clone,
    {
        let mut last = None;
        self.apply(|_, value| last = Some(value.clone()))?;
        Ok(last)
    }

    fn search<F>(&mut self, mut predicate: F) -> Result<Option<Self::Value>, SequenceError>
    where
        Self::Value: Clone,
        F: FnMut(&Self::Value) -> bool,
    {
        let mut found = None;
        self.for_each_entry(|_, value| {
            if predicate(value) {
                found = Some(value.clone());
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        Ok(found)
    }

    fn any<F>(&mut self, mut predicate: F) -> Result<bool, SequenceError>
    where
        F: FnMut(&Self::Value) -> bool,
    {
        let mut any = false;
        self.for_each_entry(|_, value| {
            any = predicate(value);
            if any {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        Ok(any)
    }

    fn all<F>(&mut self, mut predicate: F) -> Result<bool, SequenceError>
    where
        F: FnMut(&Self::Value) -> bool,
    {
        let mut all = true;
        self.for_each_entry(|_, value| {
            all = predicate(value);
            if all {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        })?;
        Ok(all)
    }

    fn implode(&mut self, separator: &str) -> Result<String, SequenceError>
    where
        Self::Value: Display,
    {
        let mut parts = Vec::new();
        self.apply(|_, value| parts.push(value.to_string()))?;
        Ok(parts.iter().join(separator))
    }

    /// Writes one value per line and returns the number of lines written.
    fn stream_to<W: Write>(&mut self, writer: &mut W) -> Result<usize, SequenceError>
    where
        Self::Value: Display,
    {
        let mut written = 0;
        let mut failure = None;
        self.for_each_entry(|_, value| match writeln!(writer, "{value}") {
            Ok(()) => {
                written += 1;
                ControlFlow::Continue(())
            }
            Err(error) => {
                failure = Some(error);
                ControlFlow::Break(())
            }
        })?;
        match failure {
            Some(error) => Err(SequenceError::io("stream_to", error)),
            None => writer.flush().map(|()| written).map_err(|error| SequenceError::io("stream_to", error)),
        }
    }

    /// Writes one value per line to standard output.
    fn print(&mut self) -> Result<usize, SequenceError>
    where
        Self::Value: Display,
    {
        self.stream_to(&mut io::stdout().lock())
    }

    /// The values, one per line, in an in-memory buffer positioned at its start.
    fn to_stream(&mut self) -> Result<Cursor<Vec<u8>>, SequenceError>
    where
        Self::Value: Display,
    {
        let mut buffer = Vec::new();
        self.stream_to(&mut buffer)?;
        Ok(Cursor::new(buffer))
    }
}

impl<S: Sequence> SequenceExt for S {}

/// Iterator over owned entries. It stops after yielding the first error.
pub struct IntoIter<S> {
    sequence: S,
    started: bool,
    failed: bool,
}

impl<S> IntoIter<S> {
    fn new(sequence: S) -> Self {
        Self { sequence, started: false, failed: false }
    }
}

impl<S> Iterator for IntoIter<S>
where
    S: Sequence,
    S::Key: Clone,
    S::Value: Clone,
{
    type Item = Result<(S::Key, S::Value), SequenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.started {
            if let Err(error) = self.sequence.advance() {
                self.failed = true;
                return Some(Err(error));
            }
        }
        self.started = true;
        match self.sequence.current() {
            Ok(Some((key, value))) => Some(Ok((key.clone(), value.clone()))),
            Ok(None) => None,
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}
