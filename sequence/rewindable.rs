/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{cmp::Ordering, mem, rc::Rc};

use error::CodedError;
use options::ReplayOptions;
use tracing::{event, Level};

use crate::{error::SequenceError, Sequence};

enum Phase<S: Sequence> {
    FirstPass { source: S, cache: Vec<(S::Key, S::Value)>, observed: bool },
    Replay { cache: Rc<Vec<(S::Key, S::Value)>> },
    Poisoned { error: SequenceError },
}

impl<S: Sequence> Phase<S> {
    fn name(&self) -> &'static str {
        match self {
            Phase::FirstPass { .. } => "first_pass",
            Phase::Replay { .. } => "replay",
            Phase::Poisoned { .. } => "poisoned",
        }
    }
}

/// Makes any source replayable by caching every element it yields.
///
/// Elements are pulled from the source only as the cursor reaches them. The
/// first operation that needs the whole sequence (a reset after observing
/// anything, `seek`, `count`, sorting or sharing) drains the rest of the
/// source into the cache and releases it. From then on all positioning is
/// served from the cache, which clones share until one of them sorts.
///
/// If that drain fails the wrapper is poisoned: the failing call returns the
/// source's error, and every later call fails with `PreconditionViolation`.
pub struct Rewindable<S: Sequence> {
    phase: Phase<S>,
    position: usize,
}

impl<S> Rewindable<S>
where
    S: Sequence,
    S::Key: Clone,
    S::Value: Clone,
{
    pub fn new(source: S) -> Self {
        Self::with_options(source, &ReplayOptions::default())
    }

    /// A source that already finished its own replay cache is not cached again:
    /// the new cursor shares that cache and starts at its first element.
    pub fn with_options(source: S, options: &ReplayOptions) -> Self {
        if let Some(cache) = source.replay_cache() {
            event!(Level::TRACE, entries = cache.len(), "adopting the replay cache of the wrapped sequence");
            return Self { phase: Phase::Replay { cache }, position: 0 };
        }
        let cache = Vec::with_capacity(options.initial_cache_capacity);
        Self { phase: Phase::FirstPass { source, cache, observed: false }, position: 0 }
    }

    /// Wrapping again would only add a second cache in front of this one.
    pub fn rewindable(self) -> Self {
        self
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_replaying(&self) -> bool {
        matches!(self.phase, Phase::Replay { .. })
    }

    pub fn seek(&mut self, position: usize) -> Result<(), SequenceError> {
        let length = self.drain("seek")?.len();
        if position >= length {
            return Err(SequenceError::SeekOutOfBounds { position, length });
        }
        self.position = position;
        Ok(())
    }

    /// Total number of elements. The cursor does not move.
    pub fn count(&mut self) -> Result<usize, SequenceError> {
        Ok(self.drain("count")?.len())
    }

    /// Stable sort by value; keys travel with their values. Rewinds to the first element.
    pub fn sort(&mut self) -> Result<(), SequenceError>
    where
        S::Value: Ord,
    {
        self.sort_by(Ord::cmp)
    }

    pub fn sort_by<F>(&mut self, mut compare: F) -> Result<(), SequenceError>
    where
        F: FnMut(&S::Value, &S::Value) -> Ordering,
    {
        self.drain("sort")?;
        if let Phase::Replay { cache } = &mut self.phase {
            Rc::make_mut(cache).sort_by(|(_, left), (_, right)| compare(left, right));
        }
        self.position = 0;
        Ok(())
    }

    /// A second cursor over the same cache, starting at the first element.
    pub fn share(&mut self) -> Result<Self, SequenceError> {
        let cache = Rc::clone(self.drain("share")?);
        Ok(Self { phase: Phase::Replay { cache }, position: 0 })
    }

    fn poisoned(operation: &'static str, error: &SequenceError) -> SequenceError {
        SequenceError::PreconditionViolation { operation, coded_source: Box::new(error.clone()) }
    }

    fn observe(&mut self, operation: &'static str) -> Result<(), SequenceError> {
        match &mut self.phase {
            Phase::FirstPass { source, cache, observed } => {
                *observed = true;
                if self.position == cache.len() {
                    if let Some((key, value)) = source.current()? {
                        cache.push((key.clone(), value.clone()));
                    }
                }
                Ok(())
            }
            Phase::Replay { .. } => Ok(()),
            Phase::Poisoned { error } => Err(Self::poisoned(operation, error)),
        }
    }

    fn drain(&mut self, operation: &'static str) -> Result<&Rc<Vec<(S::Key, S::Value)>>, SequenceError> {
        let drained = match &mut self.phase {
            Phase::FirstPass { source, cache, .. } => Self::drain_source(source, cache, self.position),
            Phase::Replay { .. } => Ok(()),
            Phase::Poisoned { error } => return Err(Self::poisoned(operation, error)),
        };
        if let Err(error) = drained {
            event!(
                Level::WARN,
                operation,
                code = error.code(),
                "replay cache poisoned by a failing source: {}",
                error.format_description()
            );
            self.phase = Phase::Poisoned { error: error.clone() };
            return Err(error);
        }
        if let Phase::FirstPass { .. } = self.phase {
            let previous = mem::replace(&mut self.phase, Phase::Replay { cache: Rc::new(Vec::new()) });
            if let Phase::FirstPass { cache, .. } = previous {
                event!(Level::DEBUG, operation, entries = cache.len(), "replay cache complete, source released");
                self.phase = Phase::Replay { cache: Rc::new(cache) };
            }
        }
        match &self.phase {
            Phase::Replay { cache } => Ok(cache),
            phase => Err(SequenceError::invalid_argument(operation, format!("unexpected phase {}", phase.name()))),
        }
    }

    fn drain_source(source: &mut S, cache: &mut Vec<(S::Key, S::Value)>, position: usize) -> Result<(), SequenceError> {
        let mut cursor = position;
        loop {
            if cursor == cache.len() {
                let Some((key, value)) = source.current()? else {
                    return Ok(());
                };
                cache.push((key.clone(), value.clone()));
            }
            source.advance()?;
            cursor += 1;
        }
    }
}

impl<S> Sequence for Rewindable<S>
where
    S: Sequence,
    S::Key: Clone,
    S::Value: Clone,
{
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        match &mut self.phase {
            Phase::FirstPass { source, observed: false, .. } => source.reset()?,
            Phase::FirstPass { .. } => {
                self.drain("reset")?;
            }
            Phase::Replay { .. } => (),
            Phase::Poisoned { error } => return Err(Self::poisoned("reset", error)),
        }
        self.position = 0;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.observe("advance")?;
        match &mut self.phase {
            Phase::FirstPass { source, cache, .. } => {
                if self.position < cache.len() {
                    source.advance()?;
                    self.position += 1;
                }
            }
            Phase::Replay { cache } => {
                if self.position < cache.len() {
                    self.position += 1;
                }
            }
            Phase::Poisoned { error } => return Err(Self::poisoned("advance", error)),
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        self.observe("current")?;
        let entry = match &self.phase {
            Phase::FirstPass { cache, .. } => cache.get(self.position),
            Phase::Replay { cache } => cache.get(self.position),
            Phase::Poisoned { error } => return Err(Self::poisoned("current", error)),
        };
        Ok(entry.map(|(key, value)| (key, value)))
    }

    fn replay_cache(&self) -> Option<Rc<Vec<(S::Key, S::Value)>>> {
        match &self.phase {
            Phase::Replay { cache } => Some(Rc::clone(cache)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Rewindable;
    use crate::{normalize::from_iter, Sequence, SequenceExt};

    #[test]
    fn first_pass_pulls_only_what_is_observed() {
        let mut pulled = 0;
        let mut rewindable = Rewindable::new(from_iter([1, 2, 3]).tap(|_, _| pulled += 1));
        assert_eq!(rewindable.current_value().unwrap(), Some(&1));
        rewindable.advance().unwrap();
        assert_eq!(rewindable.current_value().unwrap(), Some(&2));
        assert!(!rewindable.is_replaying());
        drop(rewindable);
        assert_eq!(pulled, 2);
    }

    #[test]
    fn wrapping_a_finished_cursor_adopts_its_cache() {
        let mut inner = Rewindable::new(from_iter([4, 5, 6]));
        assert_eq!(inner.count().unwrap(), 3);
        let mut outer = Rewindable::new(inner);
        assert!(outer.is_replaying());
        assert_eq!(outer.to_vec().unwrap(), vec![4, 5, 6]);
    }

    #[test]
    fn wrapping_an_unfinished_cursor_caches_lazily() {
        let outer = Rewindable::new(Rewindable::new(from_iter([1, 2])));
        assert!(!outer.is_replaying());
    }

    #[test]
    fn wrapping_twice_returns_the_same_cache() {
        let mut rewindable = from_iter([1, 2]).rewindable().rewindable();
        assert_eq!(rewindable.to_vec().unwrap(), vec![1, 2]);
        assert_eq!(rewindable.to_vec().unwrap(), vec![1, 2]);
    }
}
