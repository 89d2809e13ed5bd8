/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Left-to-right composition of sequence stages.
//!
//! Type-changing stages compose statically with [`pipe!`]. Stages that keep the
//! key and value types can also be built at runtime as boxed [`Operation`]s
//! and collected into a [`Pipeline`].

use tracing::{event, Level};

use crate::{error::SequenceError, normalize::IntoSequence, BoxedSequence, Sequence};

pub type Operation<K, V> = Box<dyn FnOnce(BoxedSequence<K, V>) -> Result<BoxedSequence<K, V>, SequenceError>>;

/// Applies `operations` in order to the normalized `source`. With no
/// operations the result is the normalized source itself.
pub fn pipe<I, K, V, O>(source: I, operations: O) -> Result<BoxedSequence<K, V>, SequenceError>
where
    I: IntoSequence,
    I::IntoSeq: Sequence<Key = K, Value = V> + 'static,
    K: 'static,
    V: 'static,
    O: IntoIterator<Item = Operation<K, V>>,
{
    let source: BoxedSequence<K, V> = Box::new(source.into_sequence());
    compose(operations)(source)
}

/// One operation that runs each of `operations` in turn, stopping at the first failure.
pub fn compose<K, V, O>(operations: O) -> Operation<K, V>
where
    K: 'static,
    V: 'static,
    O: IntoIterator<Item = Operation<K, V>>,
{
    let operations: Vec<Operation<K, V>> = operations.into_iter().collect();
    Box::new(move |sequence| operations.into_iter().try_fold(sequence, |sequence, operation| operation(sequence)))
}

#[doc(hidden)]
pub fn apply<S, T>(source: S, stage: impl FnOnce(S) -> T) -> T {
    stage(source)
}

/// Threads a normalized source through each stage expression, left to right.
///
/// ```ignore
/// let total = pipe!([1, 2, 3, 4] => |s| s.filter(|v| v % 2 == 0), |s| s.map(|v| v * 10), |mut s| s.to_vec());
/// ```
#[macro_export]
macro_rules! pipe {
    ($source:expr $(=> $($stage:expr),+ $(,)?)?) => {{
        let sequence = $crate::normalize::normalize($source);
        $($(
            let sequence = $crate::pipe::apply(sequence, $stage);
        )+)?
        sequence
    }};
}

pub struct Pipeline<K, V> {
    operations: Vec<Operation<K, V>>,
}

impl<K: 'static, V: 'static> Pipeline<K, V> {
    pub fn new() -> Self {
        Self { operations: Vec::new() }
    }

    pub fn then(mut self, operation: Operation<K, V>) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn apply<I>(self, source: I) -> Result<BoxedSequence<K, V>, SequenceError>
    where
        I: IntoSequence,
        I::IntoSeq: Sequence<Key = K, Value = V> + 'static,
    {
        event!(Level::TRACE, stages = self.operations.len(), "applying pipeline");
        pipe(source, self.operations)
    }

    /// Applies the pipeline and runs `terminal` on the result.
    pub fn finish<I, T, F>(self, source: I, terminal: F) -> Result<T, SequenceError>
    where
        I: IntoSequence,
        I::IntoSeq: Sequence<Key = K, Value = V> + 'static,
        F: FnOnce(&mut BoxedSequence<K, V>) -> Result<T, SequenceError>,
    {
        let mut sequence = self.apply(source)?;
        terminal(&mut sequence)
    }

    pub fn into_operation(self) -> Operation<K, V> {
        compose(self.operations)
    }
}

impl<K: 'static, V: 'static> Default for Pipeline<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Ready-made operations for pipelines whose stages keep the key and value types.
pub mod op {
    use std::{fmt::Debug, hash::Hash};

    use super::Operation;
    use crate::{BoxedSequence, SequenceExt};

    fn boxed<K, V>(
        stage: impl FnOnce(BoxedSequence<K, V>) -> BoxedSequence<K, V> + 'static,
    ) -> Operation<K, V> {
        Box::new(move |sequence| Ok(stage(sequence)))
    }

    pub fn map<K: 'static, V: 'static, F>(mapper: F) -> Operation<K, V>
    where
        F: FnMut(&V) -> V + 'static,
    {
        boxed(|sequence| sequence.map(mapper).boxed())
    }

    pub fn filter<K: 'static, V: 'static, F>(predicate: F) -> Operation<K, V>
    where
        F: FnMut(&V) -> bool + 'static,
    {
        boxed(|sequence| sequence.filter(predicate).boxed())
    }

    pub fn filter_keys<K: 'static, V: 'static, F>(predicate: F) -> Operation<K, V>
    where
        F: FnMut(&K) -> bool + 'static,
    {
        boxed(|sequence| sequence.filter_keys(predicate).boxed())
    }

    pub fn take_while<K: 'static, V: 'static, F>(predicate: F) -> Operation<K, V>
    where
        F: FnMut(&V) -> bool + 'static,
    {
        boxed(|sequence| sequence.take_while(predicate).boxed())
    }

    pub fn drop_while<K: 'static, V: 'static, F>(predicate: F) -> Operation<K, V>
    where
        F: FnMut(&V) -> bool + 'static,
    {
        boxed(|sequence| sequence.drop_while(predicate).boxed())
    }

    pub fn take<K: 'static, V: 'static>(count: usize) -> Operation<K, V> {
        boxed(move |sequence| sequence.take(count).boxed())
    }

    pub fn skip<K: 'static, V: 'static>(count: usize) -> Operation<K, V> {
        boxed(move |sequence| sequence.skip(count).boxed())
    }

    pub fn slice<K: 'static, V: 'static>(offset: usize, length: Option<usize>) -> Operation<K, V> {
        boxed(move |sequence| sequence.slice(offset, length).boxed())
    }

    pub fn debounce<K: 'static, V: Clone + PartialEq + 'static>() -> Operation<K, V> {
        boxed(|sequence| sequence.debounce().boxed())
    }

    pub fn distinct<K: 'static, V: Clone + Hash + Eq + 'static>() -> Operation<K, V> {
        boxed(|sequence| sequence.distinct().boxed())
    }

    pub fn tap<K: 'static, V: 'static, F>(effect: F) -> Operation<K, V>
    where
        F: FnMut(&K, &V) + 'static,
    {
        boxed(|sequence| sequence.tap(effect).boxed())
    }

    pub fn validate<K: Debug + 'static, V: 'static, F>(predicate: F) -> Operation<K, V>
    where
        F: FnMut(&V) -> bool + 'static,
    {
        boxed(|sequence| sequence.validate(predicate).boxed())
    }

    pub fn chain<K: 'static, V: 'static>(other: BoxedSequence<K, V>) -> Operation<K, V> {
        boxed(|sequence| sequence.chain(other).boxed())
    }

    pub fn rewindable<K: Clone + 'static, V: Clone + 'static>() -> Operation<K, V> {
        boxed(|sequence| sequence.rewindable().boxed())
    }

    pub fn interpose<V: 'static>(separator: V) -> Operation<usize, V> {
        boxed(|sequence| sequence.interpose(separator).boxed())
    }
}
