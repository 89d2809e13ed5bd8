/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    collections::BTreeMap,
    fmt,
    hash::Hash,
    io::{Cursor, Write},
    sync::atomic::{AtomicU64, Ordering},
};

use logger::result::ResultExt;
use options::CollectionOptions;
use resource::constants::sequence::DEFAULT_IMPLODE_SEPARATOR;
use tracing::{event, Level};

use crate::{
    adaptors::{
        Chain, Chunk, Debounce, Distinct, DropWhile, Filter, FlatMap, Flatten, Flip, Interpose, Keys, Map, MapKeys,
        Replay, Scan, Slice, TakeWhile, Tap, Validate, Values, Zip,
    },
    combine::Partition,
    deferred::DeferredSequence,
    error::SequenceError,
    flatten::{FlattenNested, Folded, Leaves, MapLeaves, Nested},
    func::{FieldEquals, Lookup, Pluck, Truthy},
    generate::{self, Empty, Range, Repeat},
    higher_order::{EntryFn, KeyFn, ValueFn},
    normalize::{from_iter, FromIter, IntoSequence},
    pipe::{self, Operation},
    reshape::{FromKeyPairs, KeyPairs, RemoveNulls, ReplaceKeys, ReplaceValues},
    rewindable::Rewindable,
    BoxedSequence, IntoIter, Sequence, SequenceExt,
};

static NEXT_COLLECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(u64);

impl CollectionId {
    fn next() -> Self {
        Self(NEXT_COLLECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collection#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Fresh,
    Iterating,
    Consumed { by: &'static str },
}

/// The consumed collection a derived one was built from.
#[derive(Debug, Clone)]
struct ConsumedAncestor {
    collection: String,
    consumed_by: &'static str,
}

/// A fluent, single-use view over a sequence.
///
/// Transformations take the collection by value and return a new, fresh
/// collection wrapping the derived cursor. Terminal operations take it by
/// reference and consume it: the first terminal (or the first step of manual
/// iteration) claims the collection, and any later attempt to traverse it
/// fails with `AlreadyConsumed`. A collection derived from one that was
/// already consumed fails on its first traversal in the same way.
pub struct Collection<S> {
    inner: S,
    id: CollectionId,
    label: Option<String>,
    state: CollectionState,
    inherited: Option<ConsumedAncestor>,
}

impl<S: Sequence> Collection<S> {
    pub fn new<I: IntoSequence<IntoSeq = S>>(source: I) -> Self {
        Self::with_options(source, &CollectionOptions::default())
    }

    pub fn with_options<I: IntoSequence<IntoSeq = S>>(source: I, options: &CollectionOptions) -> Self {
        Self {
            inner: source.into_sequence(),
            id: CollectionId::next(),
            label: options.label.clone(),
            state: CollectionState::Fresh,
            inherited: None,
        }
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn state(&self) -> CollectionState {
        self.state
    }

    pub fn is_consumed(&self) -> bool {
        self.state != CollectionState::Fresh || self.inherited.is_some()
    }

    fn name(&self) -> String {
        match &self.label {
            Some(label) => format!("{label} ({})", self.id),
            None => self.id.to_string(),
        }
    }

    fn consumed(&self, operation: &'static str, consumed_by: &'static str) -> SequenceError {
        SequenceError::AlreadyConsumed { collection: self.name(), operation, consumed_by }
    }

    fn check_ancestor(&self, operation: &'static str) -> Result<(), SequenceError> {
        match &self.inherited {
            Some(ConsumedAncestor { collection, consumed_by }) => Err(SequenceError::AlreadyConsumed {
                collection: collection.clone(),
                operation,
                consumed_by: *consumed_by,
            }),
            None => Ok(()),
        }
    }

    fn claim(&mut self, operation: &'static str) -> Result<(), SequenceError> {
        self.check_ancestor(operation)?;
        match self.state {
            CollectionState::Fresh => {
                event!(Level::TRACE, collection = %self.id, operation, "collection consumed");
                self.state = CollectionState::Consumed { by: operation };
                Ok(())
            }
            CollectionState::Iterating => Err(self.consumed(operation, "iteration")),
            CollectionState::Consumed { by } => Err(self.consumed(operation, by)),
        }
    }

    fn terminal<T>(
        &mut self,
        operation: &'static str,
        run: impl FnOnce(&mut S) -> Result<T, SequenceError>,
    ) -> Result<T, SequenceError> {
        self.claim(operation).and_then(|()| run(&mut self.inner)).log_failure(operation)
    }

    fn derive<T>(self, operation: &'static str, build: impl FnOnce(S) -> T) -> Collection<T> {
        let consumed_by = match self.state {
            CollectionState::Fresh => None,
            CollectionState::Iterating => Some("iteration"),
            CollectionState::Consumed { by } => Some(by),
        };
        let inherited = match consumed_by {
            Some(consumed_by) => {
                event!(Level::TRACE, collection = %self.id, operation, consumed_by, "deriving from a consumed collection");
                Some(ConsumedAncestor { collection: self.name(), consumed_by })
            }
            None => self.inherited,
        };
        Collection {
            inner: build(self.inner),
            id: CollectionId::next(),
            label: self.label,
            state: CollectionState::Fresh,
            inherited,
        }
    }

    fn try_derive<T>(
        self,
        operation: &'static str,
        build: impl FnOnce(S) -> Result<T, SequenceError>,
    ) -> Result<Collection<T>, SequenceError> {
        let Collection { inner, id, label, state, inherited } = self.derive(operation, build);
        Ok(Collection { inner: inner.log_failure(operation)?, id, label, state, inherited })
    }

    pub fn map<U, F>(self, mapper: F) -> Collection<Map<S, ValueFn<F>, U>>
    where
        F: FnMut(&S::Value) -> U,
    {
        self.derive("map", |inner| inner.map(mapper))
    }

    pub fn map_with_keys<U, F>(self, mapper: F) -> Collection<Map<S, EntryFn<F>, U>>
    where
        F: FnMut(&S::Key, &S::Value) -> U,
    {
        self.derive("map_with_keys", |inner| inner.map_with_keys(mapper))
    }

    pub fn map_keys<J, F>(self, mapper: F) -> Collection<MapKeys<S, KeyFn<F>, J>>
    where
        F: FnMut(&S::Key) -> J,
    {
        self.derive("map_keys", |inner| inner.map_keys(mapper))
    }

    pub fn reindex<J, F>(self, key_of: F) -> Collection<MapKeys<S, ValueFn<F>, J>>
    where
        F: FnMut(&S::Value) -> J,
    {
        self.derive("reindex", |inner| inner.reindex(key_of))
    }

    pub fn keys(self) -> Collection<Keys<S>> {
        self.derive("keys", SequenceExt::keys)
    }

    pub fn values(self) -> Collection<Values<S>> {
        self.derive("values", SequenceExt::values)
    }

    pub fn flip(self) -> Collection<Flip<S>> {
        self.derive("flip", SequenceExt::flip)
    }

    pub fn filter<F>(self, predicate: F) -> Collection<Filter<S, ValueFn<F>>>
    where
        F: FnMut(&S::Value) -> bool,
    {
        self.derive("filter", |inner| inner.filter(predicate))
    }

    pub fn filter_keys<F>(self, predicate: F) -> Collection<Filter<S, KeyFn<F>>>
    where
        F: FnMut(&S::Key) -> bool,
    {
        self.derive("filter_keys", |inner| inner.filter_keys(predicate))
    }

    pub fn filter_with_keys<F>(self, predicate: F) -> Collection<Filter<S, EntryFn<F>>>
    where
        F: FnMut(&S::Key, &S::Value) -> bool,
    {
        self.derive("filter_with_keys", |inner| inner.filter_with_keys(predicate))
    }

    pub fn take_while<F>(self, predicate: F) -> Collection<TakeWhile<S, ValueFn<F>>>
    where
        F: FnMut(&S::Value) -> bool,
    {
        self.derive("take_while", |inner| inner.take_while(predicate))
    }

    pub fn drop_while<F>(self, predicate: F) -> Collection<DropWhile<S, ValueFn<F>>>
    where
        F: FnMut(&S::Value) -> bool,
    {
        self.derive("drop_while", |inner| inner.drop_while(predicate))
    }

    pub fn slice(self, offset: usize, length: Option<usize>) -> Collection<Slice<S>> {
        self.derive("slice", |inner| inner.slice(offset, length))
    }

    pub fn take(self, count: usize) -> Collection<Slice<S>> {
        self.derive("take", |inner| inner.take(count))
    }

    pub fn skip(self, count: usize) -> Collection<Slice<S>> {
        self.derive("skip", |inner| inner.skip(count))
    }

    pub fn debounce(self) -> Collection<Debounce<S>>
    where
        S::Value: Clone + PartialEq,
    {
        self.derive("debounce", SequenceExt::debounce)
    }

    pub fn distinct(self) -> Collection<Distinct<S>>
    where
        S::Value: Clone + Hash + Eq,
    {
        self.derive("distinct", SequenceExt::distinct)
    }

    pub fn distinct_by_equality(self) -> Collection<Distinct<S, Vec<S::Value>>>
    where
        S::Value: Clone + PartialEq,
    {
        self.derive("distinct_by_equality", SequenceExt::distinct_by_equality)
    }

    pub fn pluck<Q, U>(self, key: Q) -> Collection<Map<S, Pluck<Q>, Option<U>>>
    where
        S::Value: Lookup<Q, Output = U>,
        U: Clone,
    {
        self.derive("pluck", |inner| inner.pluck(key))
    }

    pub fn filter_where<Q, U>(self, key: Q, expected: U) -> Collection<Filter<S, FieldEquals<Q, U>>>
    where
        S::Value: Lookup<Q, Output = U>,
        U: PartialEq,
    {
        self.derive("filter_where", |inner| inner.filter_where(key, expected))
    }

    pub fn remove_nulls<T>(self) -> Collection<RemoveNulls<S>>
    where
        S: Sequence<Value = Option<T>>,
    {
        self.derive("remove_nulls", SequenceExt::remove_nulls::<T>)
    }

    pub fn remove_empty(self) -> Collection<Filter<S, ValueFn<fn(&S::Value) -> bool>>>
    where
        S::Value: Truthy,
    {
        self.derive("remove_empty", SequenceExt::remove_empty)
    }

    pub fn to_key_pairs(self) -> Collection<KeyPairs<S>>
    where
        S::Key: Clone,
        S::Value: Clone,
    {
        self.derive("to_key_pairs", SequenceExt::to_key_pairs)
    }

    pub fn from_key_pairs<K, V>(self) -> Collection<FromKeyPairs<S>>
    where
        S: Sequence<Value = (K, V)>,
    {
        self.derive("from_key_pairs", SequenceExt::from_key_pairs::<K, V>)
    }

    pub fn replace_keys<I: IntoSequence>(self, keys: I) -> Collection<ReplaceKeys<S, I::IntoSeq>> {
        self.derive("replace_keys", |inner| inner.replace_keys(keys))
    }

    pub fn replace_values<I: IntoSequence>(self, values: I) -> Collection<ReplaceValues<S, I::IntoSeq>> {
        self.derive("replace_values", |inner| inner.replace_values(values))
    }

    pub fn partition(self, count: usize) -> Result<Collection<Partition<S>>, SequenceError>
    where
        S::Value: Clone,
    {
        self.try_derive("partition", |inner| inner.partition(count))
    }

    pub fn chunk(self, size: usize) -> Result<Collection<Chunk<S>>, SequenceError>
    where
        S::Value: Clone,
    {
        self.try_derive("chunk", |inner| inner.chunk(size))
    }

    pub fn zip<I: IntoSequence>(self, other: I) -> Collection<Zip<S, I::IntoSeq>> {
        self.derive("zip", |inner| inner.zip(other))
    }

    pub fn chain<I>(self, other: I) -> Collection<Chain<S, I::IntoSeq>>
    where
        I: IntoSequence,
        I::IntoSeq: Sequence<Key = S::Key, Value = S::Value>,
    {
        self.derive("chain", |inner| inner.chain(other))
    }

    pub fn scan<A, F>(self, initial: A, reducer: F) -> Collection<Scan<S, A, F>>
    where
        A: Clone,
        F: FnMut(&A, &S::Value) -> A,
    {
        self.derive("scan", |inner| inner.scan(initial, reducer))
    }

    pub fn flatten(self) -> Collection<Flatten<S>>
    where
        S::Value: IntoSequence + Clone,
    {
        self.derive("flatten", SequenceExt::flatten)
    }

    pub fn flat_map<J, F>(self, expand: F) -> Collection<FlatMap<S, ValueFn<F>, J>>
    where
        J: IntoSequence,
        F: FnMut(&S::Value) -> J,
    {
        self.derive("flat_map", |inner| inner.flat_map(expand))
    }

    pub fn flatten_nested<T>(self, levels: usize) -> Collection<FlattenNested<S, T>>
    where
        S: Sequence<Value = Nested<T>>,
        T: Clone,
    {
        self.derive("flatten_nested", |inner| inner.flatten_nested(levels))
    }

    pub fn leaves<T>(self) -> Collection<Leaves<S, T>>
    where
        S: Sequence<Value = Nested<T>>,
        T: Clone,
    {
        self.derive("leaves", SequenceExt::leaves)
    }

    pub fn map_recursive<T, U, F>(self, mapper: F) -> Collection<Map<S, MapLeaves<F>, Nested<U>>>
    where
        S: Sequence<Value = Nested<T>>,
        F: FnMut(&T) -> U,
    {
        self.derive("map_recursive", |inner| inner.map_recursive(mapper))
    }

    pub fn interpose(self, separator: S::Value) -> Collection<Interpose<S, S::Value>> {
        self.derive("interpose", |inner| inner.interpose(separator))
    }

    pub fn tap<F>(self, effect: F) -> Collection<Tap<S, F>>
    where
        F: FnMut(&S::Key, &S::Value),
    {
        self.derive("tap", |inner| inner.tap(effect))
    }

    pub fn validate<F>(self, predicate: F) -> Collection<Validate<S, F>>
    where
        F: FnMut(&S::Value) -> bool,
    {
        self.derive("validate", |inner| inner.validate(predicate))
    }

    pub fn replay(self, times: Option<usize>) -> Collection<Replay<S>>
    where
        S::Key: Clone,
        S::Value: Clone,
    {
        self.derive("replay", |inner| inner.replay(times))
    }

    pub fn pipe<O>(self, operations: O) -> Result<Collection<BoxedSequence<S::Key, S::Value>>, SequenceError>
    where
        S: 'static,
        S::Key: 'static,
        S::Value: 'static,
        O: IntoIterator<Item = Operation<S::Key, S::Value>>,
    {
        self.try_derive("pipe", |inner| pipe::pipe(inner, operations))
    }

    /// Hands the underlying cursor over to a replay cache, consuming the collection.
    pub fn rewindable(mut self) -> Result<Rewindable<S>, SequenceError>
    where
        S::Key: Clone,
        S::Value: Clone,
    {
        self.claim("rewindable").log_failure("rewindable")?;
        Ok(Rewindable::new(self.inner))
    }

    pub fn apply<F>(&mut self, effect: F) -> Result<(), SequenceError>
    where
        F: FnMut(&S::Key, &S::Value),
    {
        self.terminal("apply", |inner| inner.apply(effect))
    }

    pub fn apply_recursive<T, F>(&mut self, effect: F) -> Result<(), SequenceError>
    where
        S: Sequence<Value = Nested<T>>,
        F: FnMut(&T),
    {
        self.terminal("apply_recursive", |inner| inner.apply_recursive(effect))
    }

    pub fn to_vec(&mut self) -> Result<Vec<S::Value>, SequenceError>
    where
        S::Value: Clone,
    {
        self.terminal("to_vec", SequenceExt::to_vec)
    }

    pub fn to_pairs(&mut self) -> Result<Vec<(S::Key, S::Value)>, SequenceError>
    where
        S::Key: Clone,
        S::Value: Clone,
    {
        self.terminal("to_pairs", SequenceExt::to_pairs)
    }

    pub fn to_map(&mut self) -> Result<BTreeMap<S::Key, S::Value>, SequenceError>
    where
        S::Key: Clone + Ord,
        S::Value: Clone,
    {
        self.terminal("to_map", SequenceExt::to_map)
    }

    pub fn reduce<A, F>(&mut self, initial: A, reducer: F) -> Result<A, SequenceError>
    where
        F: FnMut(A, &S::Value) -> A,
    {
        self.terminal("reduce", |inner| inner.reduce(initial, reducer))
    }

    pub fn reduce_recursive<T, A, F>(&mut self, initial: A, reducer: F) -> Result<A, SequenceError>
    where
        S: Sequence<Value = Nested<T>>,
        A: Clone,
        F: FnMut(A, Folded<'_, T, A>) -> A,
    {
        self.terminal("reduce_recursive", |inner| inner.reduce_recursive(initial, reducer))
    }

    pub fn count(&mut self) -> Result<usize, SequenceError> {
        self.terminal("count", SequenceExt::count)
    }

    pub fn first(&mut self) -> Result<Option<S::Value>, SequenceError>
    where
        S::Value: Clone,
    {
        self.terminal("first", SequenceExt::first)
    }

    pub fn last(&mut self) -> Result<Option<S::Value>, SequenceError>
    where
        S::Value: Clone,
    {
        self.terminal("last", SequenceExt::last)
    }

    pub fn search<F>(&mut self, predicate: F) -> Result<Option<S::Value>, SequenceError>
    where
        S::Value: Clone,
        F: FnMut(&S::Value) -> bool,
    {
        self.terminal("search", |inner| inner.search(predicate))
    }

    pub fn any<F>(&mut self, predicate: F) -> Result<bool, SequenceError>
    where
        F: FnMut(&S::Value) -> bool,
    {
        self.terminal("any", |inner| inner.any(predicate))
    }

    pub fn all<F>(&mut self, predicate: F) -> Result<bool, SequenceError>
    where
        F: FnMut(&S::Value) -> bool,
    {
        self.terminal("all", |inner| inner.all(predicate))
    }

    /// Joins the values' text; without a separator they are concatenated.
    pub fn implode(&mut self, separator: Option<&str>) -> Result<String, SequenceError>
    where
        S::Value: fmt::Display,
    {
        let separator = separator.unwrap_or(DEFAULT_IMPLODE_SEPARATOR);
        self.terminal("implode", |inner| inner.implode(separator))
    }

    pub fn stream_to<W: Write>(&mut self, writer: &mut W) -> Result<usize, SequenceError>
    where
        S::Value: fmt::Display,
    {
        self.terminal("stream_to", |inner| inner.stream_to(writer))
    }

    pub fn print(&mut self) -> Result<usize, SequenceError>
    where
        S::Value: fmt::Display,
    {
        self.terminal("print", SequenceExt::print)
    }

    pub fn to_stream(&mut self) -> Result<Cursor<Vec<u8>>, SequenceError>
    where
        S::Value: fmt::Display,
    {
        self.terminal("to_stream", SequenceExt::to_stream)
    }

    fn begin_iteration(&mut self, operation: &'static str) -> Result<(), SequenceError> {
        self.check_ancestor(operation)?;
        match self.state {
            CollectionState::Fresh => {
                self.state = CollectionState::Iterating;
                Ok(())
            }
            CollectionState::Iterating => Ok(()),
            CollectionState::Consumed { by } => Err(self.consumed(operation, by)),
        }
    }
}

impl<T> Collection<FromIter<T>>
where
    T: Iterator,
{
    pub fn from_values<I: IntoIterator<IntoIter = T>>(values: I) -> Self {
        Self::new(from_iter(values))
    }
}

impl Collection<Range> {
    pub fn range(start: i64, end: i64, step: i64) -> Result<Self, SequenceError> {
        Ok(Self::new(generate::range(start, end, step)?))
    }
}

impl<V> Collection<Repeat<V>> {
    pub fn repeat(value: V, times: Option<usize>) -> Self {
        Self::new(generate::repeat(value, times))
    }
}

impl<K, V> Collection<Empty<K, V>> {
    pub fn empty() -> Self {
        Self::new(generate::empty())
    }
}

impl<F, A, I> Collection<DeferredSequence<F, A, I>>
where
    F: FnMut(&A) -> Result<I, SequenceError>,
    I: IntoSequence,
{
    pub fn deferred(factory: F, arguments: A) -> Self {
        Self::new(DeferredSequence::new(factory, arguments))
    }
}

/// Manual iteration claims the collection on the first protocol call; a
/// second traversal through `reset` is rejected.
impl<S: Sequence> Sequence for Collection<S> {
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        if self.state == CollectionState::Iterating {
            return Err(self.consumed("reset", "iteration")).log_failure("reset");
        }
        self.begin_iteration("reset").log_failure("reset")?;
        self.inner.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.begin_iteration("advance").log_failure("advance")?;
        self.inner.advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        self.begin_iteration("current").log_failure("current")?;
        self.inner.current()
    }
}

impl<S> IntoIterator for Collection<S>
where
    S: Sequence,
    S::Key: Clone,
    S::Value: Clone,
{
    type Item = Result<(S::Key, S::Value), SequenceError>;
    type IntoIter = IntoIter<Self>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<S> fmt::Debug for Collection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.state)
            .field("inherited_consumption", &self.inherited.is_some())
            .finish()
    }
}
