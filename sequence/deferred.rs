/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use tracing::{event, Level};

use crate::{error::SequenceError, normalize::IntoSequence, Sequence};

/// Rebuilds its source from a factory on every full traversal.
///
/// Nothing runs at construction. The factory is called with the stored
/// arguments the first time an element is requested, and again after each
/// `reset`. Resetting a sequence that was never materialized does not call
/// the factory. A failing factory leaves the sequence unmaterialized, so the
/// next request calls it again.
pub struct DeferredSequence<F, A, I: IntoSequence> {
    factory: F,
    arguments: A,
    materialized: Option<I::IntoSeq>,
    materializations: usize,
}

impl<F, A, I> DeferredSequence<F, A, I>
where
    F: FnMut(&A) -> Result<I, SequenceError>,
    I: IntoSequence,
{
    pub fn new(factory: F, arguments: A) -> Self {
        Self { factory, arguments, materialized: None, materializations: 0 }
    }

    pub fn arguments(&self) -> &A {
        &self.arguments
    }

    /// Number of times the factory has produced a source.
    pub fn materializations(&self) -> usize {
        self.materializations
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized.is_some()
    }

    fn materialize(&mut self) -> Result<&mut I::IntoSeq, SequenceError> {
        let sequence = match self.materialized.take() {
            Some(sequence) => sequence,
            None => {
                let sequence = (self.factory)(&self.arguments)?.into_sequence();
                self.materializations += 1;
                event!(Level::TRACE, materializations = self.materializations, "materialized deferred sequence");
                sequence
            }
        };
        Ok(self.materialized.insert(sequence))
    }
}

impl<F, A, I> Sequence for DeferredSequence<F, A, I>
where
    F: FnMut(&A) -> Result<I, SequenceError>,
    I: IntoSequence,
{
    type Key = <I::IntoSeq as Sequence>::Key;
    type Value = <I::IntoSeq as Sequence>::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.materialized = None;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.materialize()?.advance()
    }

    fn current(&mut self) -> Result<Option<(&Self::Key, &Self::Value)>, SequenceError> {
        self.materialize()?.current()
    }
}

/// A deferred sequence whose factory takes no arguments.
pub fn defer<F, I>(mut factory: F) -> DeferredSequence<impl FnMut(&()) -> Result<I, SequenceError>, (), I>
where
    F: FnMut() -> Result<I, SequenceError>,
    I: IntoSequence,
{
    DeferredSequence::new(move |_: &()| factory(), ())
}

#[cfg(test)]
mod tests {
    use super::DeferredSequence;
    use crate::{error::SequenceError, Sequence, SequenceExt};

    #[test]
    fn reset_before_materializing_skips_the_factory() {
        let mut deferred = DeferredSequence::new(|count: &usize| Ok(vec![0; *count]), 3);
        deferred.reset().unwrap();
        assert_eq!(deferred.materializations(), 0);
        assert_eq!(deferred.count().unwrap(), 3);
        assert_eq!(deferred.materializations(), 1);
    }

    #[test]
    fn failing_factory_stays_unmaterialized() {
        let mut attempts = 0;
        let mut deferred = DeferredSequence::new(
            |_: &()| {
                attempts += 1;
                if attempts == 1 {
                    Err(SequenceError::invalid_argument("factory", "not ready"))
                } else {
                    Ok(vec![1])
                }
            },
            (),
        );
        assert!(deferred.to_vec().is_err());
        assert!(!deferred.is_materialized());
        assert_eq!(deferred.to_vec().unwrap(), vec![1]);
    }
}
