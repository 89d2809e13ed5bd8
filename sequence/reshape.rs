/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Stages that move data between keys and values.

use crate::{error::SequenceError, Sequence};

/// Turns each element into a `(key, value)` value, keyed by position.
pub struct KeyPairs<S: Sequence> {
    source: S,
    position: usize,
    pair: Option<(S::Key, S::Value)>,
}

impl<S: Sequence> KeyPairs<S> {
    pub(crate) fn new(source: S) -> Self {
        Self { source, position: 0, pair: None }
    }
}

impl<S> KeyPairs<S>
where
    S: Sequence,
    S::Key: Clone,
    S::Value: Clone,
{
    fn load(&mut self) -> Result<(), SequenceError> {
        if self.pair.is_none() {
            self.pair = self.source.current()?.map(|(key, value)| (key.clone(), value.clone()));
        }
        Ok(())
    }
}

impl<S> Sequence for KeyPairs<S>
where
    S: Sequence,
    S::Key: Clone,
    S::Value: Clone,
{
    type Key = usize;
    type Value = (S::Key, S::Value);

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        self.pair = None;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.load()?;
        if self.pair.take().is_some() {
            self.source.advance()?;
            self.position += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &(S::Key, S::Value))>, SequenceError> {
        self.load()?;
        Ok(self.pair.as_ref().map(|pair| (&self.position, pair)))
    }
}

/// Splits `(key, value)` values back into elements. Borrows from the source's tuples.
pub struct FromKeyPairs<S> {
    source: S,
}

impl<S> FromKeyPairs<S> {
    pub(crate) fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S, K, V> Sequence for FromKeyPairs<S>
where
    S: Sequence<Value = (K, V)>,
{
    type Key = K;
    type Value = V;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&K, &V)>, SequenceError> {
        Ok(self.source.current()?.map(|(_, (key, value))| (key, value)))
    }
}

/// Drops `None` values and unwraps the rest.
pub struct RemoveNulls<S> {
    source: S,
}

impl<S> RemoveNulls<S> {
    pub(crate) fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S, T> RemoveNulls<S>
where
    S: Sequence<Value = Option<T>>,
{
    fn settle(&mut self) -> Result<(), SequenceError> {
        while let Some((_, None)) = self.source.current()? {
            self.source.advance()?;
        }
        Ok(())
    }
}

impl<S, T> Sequence for RemoveNulls<S>
where
    S: Sequence<Value = Option<T>>,
{
    type Key = S::Key;
    type Value = T;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.settle()?;
        self.source.advance()
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &T)>, SequenceError> {
        self.settle()?;
        Ok(self.source.current()?.and_then(|(key, value)| value.as_ref().map(|value| (key, value))))
    }
}

/// Keys taken from the values of a second sequence, stopping at the shorter one.
pub struct ReplaceKeys<S, K> {
    source: S,
    keys: K,
}

impl<S, K> ReplaceKeys<S, K> {
    pub(crate) fn new(source: S, keys: K) -> Self {
        Self { source, keys }
    }
}

impl<S: Sequence, K: Sequence> Sequence for ReplaceKeys<S, K> {
    type Key = K::Value;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.source.reset()?;
        self.keys.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.source.has_current()? && self.keys.has_current()? {
            self.source.advance()?;
            self.keys.advance()?;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&K::Value, &S::Value)>, SequenceError> {
        match (self.keys.current_value()?, self.source.current_value()?) {
            (Some(key), Some(value)) => Ok(Some((key, value))),
            _ => Ok(None),
        }
    }
}

/// Values taken from a second sequence, stopping at the shorter one. Keys are kept.
pub struct ReplaceValues<S, V> {
    source: S,
    values: V,
}

impl<S, V> ReplaceValues<S, V> {
    pub(crate) fn new(source: S, values: V) -> Self {
        Self { source, values }
    }
}

impl<S: Sequence, V: Sequence> Sequence for ReplaceValues<S, V> {
    type Key = S::Key;
    type Value = V::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.source.reset()?;
        self.values.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.source.has_current()? && self.values.has_current()? {
            self.source.advance()?;
            self.values.advance()?;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &V::Value)>, SequenceError> {
        match (self.source.current_key()?, self.values.current_value()?) {
            (Some(key), Some(value)) => Ok(Some((key, value))),
            _ => Ok(None),
        }
    }
}
