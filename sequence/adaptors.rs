/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{collections::HashSet, fmt::Debug, hash::Hash};

use crate::{
    error::SequenceError,
    higher_order::{PairFn, ValueFn},
    normalize::IntoSequence,
    rewindable::Rewindable,
    Sequence,
};

pub struct Map<S, F, U> {
    source: S,
    mapper: F,
    mapped: Option<U>,
}

impl<S, F, U> Map<S, F, U> {
    pub(crate) fn new(source: S, mapper: F) -> Self {
        Self { source, mapper, mapped: None }
    }
}

impl<S, F, U> Sequence for Map<S, F, U>
where
    S: Sequence,
    F: PairFn<S::Key, S::Value, U>,
{
    type Key = S::Key;
    type Value = U;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.mapped = None;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.mapped = None;
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &U)>, SequenceError> {
        let Some((key, value)) = self.source.current()? else {
            return Ok(None);
        };
        let mapper = &mut self.mapper;
        let mapped = self.mapped.get_or_insert_with(|| mapper.call(key, value));
        Ok(Some((key, mapped)))
    }
}

pub struct MapKeys<S, F, J> {
    source: S,
    mapper: F,
    mapped: Option<J>,
}

impl<S, F, J> MapKeys<S, F, J> {
    pub(crate) fn new(source: S, mapper: F) -> Self {
        Self { source, mapper, mapped: None }
    }
}

impl<S, F, J> Sequence for MapKeys<S, F, J>
where
    S: Sequence,
    F: PairFn<S::Key, S::Value, J>,
{
    type Key = J;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.mapped = None;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.mapped = None;
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&J, &S::Value)>, SequenceError> {
        let Some((key, value)) = self.source.current()? else {
            return Ok(None);
        };
        let mapper = &mut self.mapper;
        let mapped = self.mapped.get_or_insert_with(|| mapper.call(key, value));
        Ok(Some((mapped, value)))
    }
}

/// Re-keys the source by position and yields its keys as values.
pub struct Keys<S> {
    source: S,
    position: usize,
}

impl<S> Keys<S> {
    pub(crate) fn new(source: S) -> Self {
        Self { source, position: 0 }
    }
}

impl<S: Sequence> Sequence for Keys<S> {
    type Key = usize;
    type Value = S::Key;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.source.has_current()? {
            self.position += 1;
        }
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&usize, &S::Key)>, SequenceError> {
        let position = &self.position;
        Ok(self.source.current()?.map(|(key, _)| (position, key)))
    }
}

/// Re-keys the source by position.
pub struct Values<S> {
    source: S,
    position: usize,
}

impl<S> Values<S> {
    pub(crate) fn new(source: S) -> Self {
        Self { source, position: 0 }
    }
}

impl<S: Sequence> Sequence for Values<S> {
    type Key = usize;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.source.has_current()? {
            self.position += 1;
        }
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&usize, &S::Value)>, SequenceError> {
        let position = &self.position;
        Ok(self.source.current()?.map(|(_, value)| (position, value)))
    }
}

pub struct Flip<S> {
    source: S,
}

impl<S> Flip<S> {
    pub(crate) fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: Sequence> Sequence for Flip<S> {
    type Key = S::Value;
    type Value = S::Key;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Value, &S::Key)>, SequenceError> {
        Ok(self.source.current()?.map(|(key, value)| (value, key)))
    }
}

pub struct Filter<S, P> {
    source: S,
    predicate: P,
    settled: bool,
}

impl<S, P> Filter<S, P> {
    pub(crate) fn new(source: S, predicate: P) -> Self {
        Self { source, predicate, settled: false }
    }
}

impl<S, P> Filter<S, P>
where
    S: Sequence,
    P: PairFn<S::Key, S::Value, bool>,
{
    fn settle(&mut self) -> Result<(), SequenceError> {
        while !self.settled {
            let accepted = match self.source.current()? {
                None => true,
                Some((key, value)) => self.predicate.call(key, value),
            };
            if accepted {
                self.settled = true;
            } else {
                self.source.advance()?;
            }
        }
        Ok(())
    }
}

impl<S, P> Sequence for Filter<S, P>
where
    S: Sequence,
    P: PairFn<S::Key, S::Value, bool>,
{
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.settled = false;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.settle()?;
        self.source.advance()?;
        self.settled = false;
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        self.settle()?;
        self.source.current()
    }
}

/// Ends the sequence at the first element failing the predicate. Later elements are never pulled.
pub struct TakeWhile<S, P> {
    source: S,
    predicate: P,
    checked: bool,
    done: bool,
}

impl<S, P> TakeWhile<S, P> {
    pub(crate) fn new(source: S, predicate: P) -> Self {
        Self { source, predicate, checked: false, done: false }
    }
}

impl<S, P> TakeWhile<S, P>
where
    S: Sequence,
    P: PairFn<S::Key, S::Value, bool>,
{
    fn check(&mut self) -> Result<(), SequenceError> {
        if !self.checked && !self.done {
            let stop = match self.source.current()? {
                None => false,
                Some((key, value)) => !self.predicate.call(key, value),
            };
            self.done = stop;
            self.checked = true;
        }
        Ok(())
    }
}

impl<S, P> Sequence for TakeWhile<S, P>
where
    S: Sequence,
    P: PairFn<S::Key, S::Value, bool>,
{
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.checked = false;
        self.done = false;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.check()?;
        if self.done {
            return Ok(());
        }
        self.checked = false;
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        self.check()?;
        if self.done {
            return Ok(None);
        }
        self.source.current()
    }
}

pub struct DropWhile<S, P> {
    source: S,
    predicate: P,
    dropped: bool,
}

impl<S, P> DropWhile<S, P> {
    pub(crate) fn new(source: S, predicate: P) -> Self {
        Self { source, predicate, dropped: false }
    }
}

impl<S, P> DropWhile<S, P>
where
    S: Sequence,
    P: PairFn<S::Key, S::Value, bool>,
{
    fn skip_prefix(&mut self) -> Result<(), SequenceError> {
        while !self.dropped {
            let dropping = match self.source.current()? {
                None => false,
                Some((key, value)) => self.predicate.call(key, value),
            };
            if dropping {
                self.source.advance()?;
            } else {
                self.dropped = true;
            }
        }
        Ok(())
    }
}

impl<S, P> Sequence for DropWhile<S, P>
where
    S: Sequence,
    P: PairFn<S::Key, S::Value, bool>,
{
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.dropped = false;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.skip_prefix()?;
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        self.skip_prefix()?;
        self.source.current()
    }
}

/// Skips `offset` elements, then yields at most `length` more. Never pulls past the window.
pub struct Slice<S> {
    source: S,
    offset: usize,
    length: Option<usize>,
    position: usize,
}

impl<S> Slice<S> {
    pub(crate) fn new(source: S, offset: usize, length: Option<usize>) -> Self {
        Self { source, offset, length, position: 0 }
    }
}

impl<S: Sequence> Slice<S> {
    fn skip_prefix(&mut self) -> Result<(), SequenceError> {
        while self.position < self.offset {
            if !self.source.has_current()? {
                break;
            }
            self.source.advance()?;
            self.position += 1;
        }
        Ok(())
    }

    fn within_window(&self) -> bool {
        self.position >= self.offset
            && self.length.map_or(true, |length| self.position - self.offset < length)
    }
}

impl<S: Sequence> Sequence for Slice<S> {
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.skip_prefix()?;
        if self.within_window() && self.source.has_current()? {
            self.source.advance()?;
            self.position += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        self.skip_prefix()?;
        if !self.within_window() {
            return Ok(None);
        }
        self.source.current()
    }
}

/// Drops elements whose value equals the value of the element just before them.
pub struct Debounce<S: Sequence> {
    source: S,
    previous: Option<S::Value>,
    settled: bool,
}

impl<S: Sequence> Debounce<S> {
    pub(crate) fn new(source: S) -> Self {
        Self { source, previous: None, settled: false }
    }
}

impl<S> Debounce<S>
where
    S: Sequence,
    S::Value: Clone + PartialEq,
{
    fn settle(&mut self) -> Result<(), SequenceError> {
        while !self.settled {
            let repeated = match (self.source.current()?, &self.previous) {
                (Some((_, value)), Some(previous)) => value == previous,
                _ => false,
            };
            if repeated {
                self.source.advance()?;
            } else {
                self.settled = true;
            }
        }
        Ok(())
    }
}

impl<S> Sequence for Debounce<S>
where
    S: Sequence,
    S::Value: Clone + PartialEq,
{
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.previous = None;
        self.settled = false;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.settle()?;
        let Some((_, value)) = self.source.current()? else {
            return Ok(());
        };
        self.previous = Some(value.clone());
        self.source.advance()?;
        self.settled = false;
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        self.settle()?;
        self.source.current()
    }
}

/// Remembers the values a [`Distinct`] stage has already yielded.
pub trait SeenValues<V> {
    fn contains(&self, value: &V) -> bool;

    fn insert(&mut self, value: V);

    fn clear(&mut self);
}

impl<V: Hash + Eq> SeenValues<V> for HashSet<V> {
    fn contains(&self, value: &V) -> bool {
        HashSet::contains(self, value)
    }

    fn insert(&mut self, value: V) {
        HashSet::insert(self, value);
    }

    fn clear(&mut self) {
        HashSet::clear(self)
    }
}

/// Linear scan for values that only support equality, such as floats.
impl<V: PartialEq> SeenValues<V> for Vec<V> {
    fn contains(&self, value: &V) -> bool {
        self.as_slice().contains(value)
    }

    fn insert(&mut self, value: V) {
        self.push(value)
    }

    fn clear(&mut self) {
        Vec::clear(self)
    }
}

/// Drops elements whose value was already yielded.
pub struct Distinct<S: Sequence, Seen = HashSet<<S as Sequence>::Value>> {
    source: S,
    seen: Seen,
    settled: bool,
}

impl<S: Sequence, Seen: Default> Distinct<S, Seen> {
    pub(crate) fn new(source: S) -> Self {
        Self { source, seen: Seen::default(), settled: false }
    }
}

impl<S, Seen> Distinct<S, Seen>
where
    S: Sequence,
    S::Value: Clone,
    Seen: SeenValues<S::Value>,
{
    fn settle(&mut self) -> Result<(), SequenceError> {
        while !self.settled {
            let seen = match self.source.current()? {
                None => false,
                Some((_, value)) => self.seen.contains(value),
            };
            if seen {
                self.source.advance()?;
            } else {
                self.settled = true;
            }
        }
        Ok(())
    }
}

impl<S, Seen> Sequence for Distinct<S, Seen>
where
    S: Sequence,
    S::Value: Clone,
    Seen: SeenValues<S::Value>,
{
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.seen.clear();
        self.settled = false;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.settle()?;
        let Some((_, value)) = self.source.current()? else {
            return Ok(());
        };
        self.seen.insert(value.clone());
        self.source.advance()?;
        self.settled = false;
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        self.settle()?;
        self.source.current()
    }
}

enum ChunkSlot<V> {
    Unfilled,
    Filled(Vec<V>),
    Exhausted,
}

/// Groups consecutive values into vectors of `size`; the final chunk may be shorter.
pub struct Chunk<S: Sequence> {
    source: S,
    size: usize,
    index: usize,
    slot: ChunkSlot<S::Value>,
}

impl<S: Sequence> Chunk<S> {
    pub(crate) fn new(source: S, size: usize) -> Result<Self, SequenceError> {
        if size == 0 {
            return Err(SequenceError::invalid_argument("chunk", "the chunk size must be at least 1"));
        }
        Ok(Self { source, size, index: 0, slot: ChunkSlot::Unfilled })
    }
}

impl<S> Chunk<S>
where
    S: Sequence,
    S::Value: Clone,
{
    fn fill(&mut self) -> Result<(), SequenceError> {
        if !matches!(self.slot, ChunkSlot::Unfilled) {
            return Ok(());
        }
        let mut chunk = Vec::with_capacity(self.size);
        while chunk.len() < self.size {
            let Some((_, value)) = self.source.current()? else {
                break;
            };
            chunk.push(value.clone());
            self.source.advance()?;
        }
        self.slot = if chunk.is_empty() { ChunkSlot::Exhausted } else { ChunkSlot::Filled(chunk) };
        Ok(())
    }
}

impl<S> Sequence for Chunk<S>
where
    S: Sequence,
    S::Value: Clone,
{
    type Key = usize;
    type Value = Vec<S::Value>;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.index = 0;
        self.slot = ChunkSlot::Unfilled;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.fill()?;
        if let ChunkSlot::Filled(_) = self.slot {
            self.slot = ChunkSlot::Unfilled;
            self.index += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &Vec<S::Value>)>, SequenceError> {
        self.fill()?;
        match &self.slot {
            ChunkSlot::Filled(chunk) => Ok(Some((&self.index, chunk))),
            ChunkSlot::Unfilled | ChunkSlot::Exhausted => Ok(None),
        }
    }
}

/// Pairs values positionally and ends with the shorter side.
pub struct Zip<A: Sequence, B: Sequence> {
    left: A,
    right: B,
    position: usize,
    pair: Option<(A::Value, B::Value)>,
}

impl<A: Sequence, B: Sequence> Zip<A, B> {
    pub(crate) fn new(left: A, right: B) -> Self {
        Self { left, right, position: 0, pair: None }
    }
}

impl<A, B> Zip<A, B>
where
    A: Sequence,
    B: Sequence,
    A::Value: Clone,
    B::Value: Clone,
{
    fn load(&mut self) -> Result<(), SequenceError> {
        if self.pair.is_none() {
            self.pair = match (self.left.current()?, self.right.current()?) {
                (Some((_, left)), Some((_, right))) => Some((left.clone(), right.clone())),
                _ => None,
            };
        }
        Ok(())
    }
}

impl<A, B> Sequence for Zip<A, B>
where
    A: Sequence,
    B: Sequence,
    A::Value: Clone,
    B::Value: Clone,
{
    type Key = usize;
    type Value = (A::Value, B::Value);

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        self.pair = None;
        self.left.reset()?;
        self.right.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.load()?;
        if self.pair.take().is_some() {
            self.left.advance()?;
            self.right.advance()?;
            self.position += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &(A::Value, B::Value))>, SequenceError> {
        self.load()?;
        Ok(self.pair.as_ref().map(|pair| (&self.position, pair)))
    }
}

pub struct Chain<A, B> {
    first: A,
    second: B,
    on_second: bool,
}

impl<A, B> Chain<A, B> {
    pub(crate) fn new(first: A, second: B) -> Self {
        Self { first, second, on_second: false }
    }
}

impl<A, B> Sequence for Chain<A, B>
where
    A: Sequence,
    B: Sequence<Key = A::Key, Value = A::Value>,
{
    type Key = A::Key;
    type Value = A::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.on_second = false;
        self.first.reset()?;
        self.second.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if !self.on_second {
            if self.first.has_current()? {
                return self.first.advance();
            }
            self.on_second = true;
        }
        self.second.advance()
    }

    fn current(&mut self) -> Result<Option<(&A::Key, &A::Value)>, SequenceError> {
        if !self.on_second {
            if self.first.has_current()? {
                return self.first.current();
            }
            self.on_second = true;
        }
        self.second.current()
    }
}

/// Running fold: each element's value becomes the accumulator after folding that element in.
pub struct Scan<S, A, F> {
    source: S,
    initial: A,
    accumulator: A,
    reducer: F,
    applied: bool,
}

impl<S, A: Clone, F> Scan<S, A, F> {
    pub(crate) fn new(source: S, initial: A, reducer: F) -> Self {
        Self { source, accumulator: initial.clone(), initial, reducer, applied: false }
    }
}

impl<S, A, F> Scan<S, A, F>
where
    S: Sequence,
    A: Clone,
    F: FnMut(&A, &S::Value) -> A,
{
    fn apply(&mut self) -> Result<(), SequenceError> {
        if self.applied {
            return Ok(());
        }
        if let Some((_, value)) = self.source.current()? {
            self.accumulator = (self.reducer)(&self.accumulator, value);
            self.applied = true;
        }
        Ok(())
    }
}

impl<S, A, F> Sequence for Scan<S, A, F>
where
    S: Sequence,
    A: Clone,
    F: FnMut(&A, &S::Value) -> A,
{
    type Key = S::Key;
    type Value = A;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.accumulator = self.initial.clone();
        self.applied = false;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.apply()?;
        if self.applied {
            self.source.advance()?;
            self.applied = false;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &A)>, SequenceError> {
        self.apply()?;
        let accumulator = &self.accumulator;
        Ok(self.source.current()?.map(|(key, _)| (key, accumulator)))
    }
}

/// Expands each element into a child sequence and yields the children's elements under their own keys.
pub struct FlatMap<S, F, J: IntoSequence> {
    source: S,
    expand: F,
    child: Option<J::IntoSeq>,
}

impl<S, F, J: IntoSequence> FlatMap<S, F, J> {
    pub(crate) fn new(source: S, expand: F) -> Self {
        Self { source, expand, child: None }
    }
}

impl<S, F, J> FlatMap<S, F, J>
where
    S: Sequence,
    F: PairFn<S::Key, S::Value, J>,
    J: IntoSequence,
{
    fn settle(&mut self) -> Result<bool, SequenceError> {
        loop {
            if let Some(child) = self.child.as_mut() {
                if child.has_current()? {
                    return Ok(true);
                }
                self.child = None;
                self.source.advance()?;
            }
            let child = match self.source.current()? {
                None => return Ok(false),
                Some((key, value)) => self.expand.call(key, value).into_sequence(),
            };
            self.child = Some(child);
        }
    }
}

impl<S, F, J> Sequence for FlatMap<S, F, J>
where
    S: Sequence,
    F: PairFn<S::Key, S::Value, J>,
    J: IntoSequence,
{
    type Key = <J::IntoSeq as Sequence>::Key;
    type Value = <J::IntoSeq as Sequence>::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.child = None;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        match self.settle()? {
            true => match self.child.as_mut() {
                Some(child) => child.advance(),
                None => Ok(()),
            },
            false => Ok(()),
        }
    }

    fn current(&mut self) -> Result<Option<(&Self::Key, &Self::Value)>, SequenceError> {
        if !self.settle()? {
            return Ok(None);
        }
        match self.child.as_mut() {
            Some(child) => child.current(),
            None => Ok(None),
        }
    }
}

pub type Flatten<S> = FlatMap<
    S,
    ValueFn<fn(&<S as Sequence>::Value) -> <S as Sequence>::Value>,
    <S as Sequence>::Value,
>;

/// Yields a separator between consecutive elements, keyed by output position.
pub struct Interpose<S, V> {
    source: S,
    separator: V,
    position: usize,
    on_separator: bool,
}

impl<S, V> Interpose<S, V> {
    pub(crate) fn new(source: S, separator: V) -> Self {
        Self { source, separator, position: 0, on_separator: false }
    }
}

impl<S: Sequence> Sequence for Interpose<S, S::Value> {
    type Key = usize;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        self.on_separator = false;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.on_separator {
            self.on_separator = false;
        } else {
            if !self.source.has_current()? {
                return Ok(());
            }
            self.source.advance()?;
            self.on_separator = self.source.has_current()?;
        }
        self.position += 1;
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &S::Value)>, SequenceError> {
        if self.on_separator {
            return Ok(Some((&self.position, &self.separator)));
        }
        let position = &self.position;
        Ok(self.source.current()?.map(|(_, value)| (position, value)))
    }
}

/// Runs a side effect once for each element the first time that element is observed.
pub struct Tap<S, F> {
    source: S,
    effect: F,
    tapped: bool,
}

impl<S, F> Tap<S, F> {
    pub(crate) fn new(source: S, effect: F) -> Self {
        Self { source, effect, tapped: false }
    }
}

impl<S, F> Sequence for Tap<S, F>
where
    S: Sequence,
    F: FnMut(&S::Key, &S::Value),
{
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.tapped = false;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.current()?;
        self.tapped = false;
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        let Some((key, value)) = self.source.current()? else {
            return Ok(None);
        };
        if !self.tapped {
            (self.effect)(key, value);
            self.tapped = true;
        }
        Ok(Some((key, value)))
    }
}

/// Fails with `ValidationFailed` naming the key of the first element rejected by the predicate.
pub struct Validate<S, P> {
    source: S,
    predicate: P,
    checked: bool,
}

impl<S, P> Validate<S, P> {
    pub(crate) fn new(source: S, predicate: P) -> Self {
        Self { source, predicate, checked: false }
    }
}

impl<S, P> Sequence for Validate<S, P>
where
    S: Sequence,
    S::Key: Debug,
    P: FnMut(&S::Value) -> bool,
{
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.checked = false;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.current()?;
        self.checked = false;
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        let Some((key, value)) = self.source.current()? else {
            return Ok(None);
        };
        if !self.checked {
            if !(self.predicate)(value) {
                return Err(SequenceError::ValidationFailed { key: format!("{key:?}") });
            }
            self.checked = true;
        }
        Ok(Some((key, value)))
    }
}

/// Replays the elements of a source `times` times, or forever when `times` is `None`.
pub struct Replay<S: Sequence> {
    inner: Rewindable<S>,
    times: Option<usize>,
    round: usize,
}

impl<S: Sequence> Replay<S> {
    pub(crate) fn new(inner: Rewindable<S>, times: Option<usize>) -> Self {
        Self { inner, times, round: 0 }
    }
}

impl<S> Replay<S>
where
    S: Sequence,
    S::Key: Clone,
    S::Value: Clone,
{
    fn settle(&mut self) -> Result<bool, SequenceError> {
        if self.times == Some(0) {
            return Ok(false);
        }
        if self.inner.has_current()? {
            return Ok(true);
        }
        if self.times.is_some_and(|times| self.round + 1 >= times) {
            return Ok(false);
        }
        self.inner.reset()?;
        self.round += 1;
        self.inner.has_current()
    }
}

impl<S> Sequence for Replay<S>
where
    S: Sequence,
    S::Key: Clone,
    S::Value: Clone,
{
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.round = 0;
        self.inner.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.settle()? {
            self.inner.advance()?;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        if !self.settle()? {
            return Ok(None);
        }
        self.inner.current()
    }
}
