/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Stages that read from any number of sources of one type, and [`Partition`],
//! which deals a single source into several groups.

use crate::{error::SequenceError, normalize::IntoSequence, Sequence, SequenceExt};

/// Every source in turn, keys preserved.
pub struct Concat<S> {
    sources: Vec<S>,
    index: usize,
}

pub fn concat<I>(sources: I) -> Concat<<I::Item as IntoSequence>::IntoSeq>
where
    I: IntoIterator,
    I::Item: IntoSequence,
{
    Concat { sources: sources.into_iter().map(IntoSequence::into_sequence).collect(), index: 0 }
}

impl<S: Sequence> Concat<S> {
    fn settle(&mut self) -> Result<(), SequenceError> {
        while let Some(source) = self.sources.get_mut(self.index) {
            if source.has_current()? {
                break;
            }
            self.index += 1;
        }
        Ok(())
    }
}

impl<S: Sequence> Sequence for Concat<S> {
    type Key = S::Key;
    type Value = S::Value;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.index = 0;
        self.sources.iter_mut().try_for_each(Sequence::reset)
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.settle()?;
        match self.sources.get_mut(self.index) {
            Some(source) => source.advance(),
            None => Ok(()),
        }
    }

    fn current(&mut self) -> Result<Option<(&S::Key, &S::Value)>, SequenceError> {
        self.settle()?;
        match self.sources.get_mut(self.index) {
            Some(source) => source.current(),
            None => Ok(None),
        }
    }
}

/// Rows holding the current value of every source, keyed by row number. Ends as
/// soon as any source runs out; no sources means no rows.
pub struct ZipAll<S: Sequence> {
    sources: Vec<S>,
    position: usize,
    row: Option<Vec<S::Value>>,
}

pub fn zip_all<I>(sources: I) -> ZipAll<<I::Item as IntoSequence>::IntoSeq>
where
    I: IntoIterator,
    I::Item: IntoSequence,
{
    ZipAll { sources: sources.into_iter().map(IntoSequence::into_sequence).collect(), position: 0, row: None }
}

impl<S> ZipAll<S>
where
    S: Sequence,
    S::Value: Clone,
{
    fn load(&mut self) -> Result<(), SequenceError> {
        if self.row.is_some() || self.sources.is_empty() {
            return Ok(());
        }
        let mut row = Vec::with_capacity(self.sources.len());
        for source in &mut self.sources {
            match source.current_value()? {
                Some(value) => row.push(value.clone()),
                None => return Ok(()),
            }
        }
        self.row = Some(row);
        Ok(())
    }
}

impl<S> Sequence for ZipAll<S>
where
    S: Sequence,
    S::Value: Clone,
{
    type Key = usize;
    type Value = Vec<S::Value>;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.position = 0;
        self.row = None;
        self.sources.iter_mut().try_for_each(Sequence::reset)
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.load()?;
        if self.row.take().is_some() {
            self.sources.iter_mut().try_for_each(Sequence::advance)?;
            self.position += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &Vec<S::Value>)>, SequenceError> {
        self.load()?;
        Ok(self.row.as_ref().map(|row| (&self.position, row)))
    }
}

/// The last value of each source, one element per source keyed by its index.
/// An empty source contributes `None`. A source is drained only when the
/// cursor reaches it.
pub struct CombineLatest<S: Sequence> {
    sources: Vec<S>,
    index: usize,
    latest: Option<Option<S::Value>>,
}

pub fn combine_latest<I>(sources: I) -> CombineLatest<<I::Item as IntoSequence>::IntoSeq>
where
    I: IntoIterator,
    I::Item: IntoSequence,
{
    CombineLatest { sources: sources.into_iter().map(IntoSequence::into_sequence).collect(), index: 0, latest: None }
}

impl<S> Sequence for CombineLatest<S>
where
    S: Sequence,
    S::Value: Clone,
{
    type Key = usize;
    type Value = Option<S::Value>;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.index = 0;
        self.latest = None;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.index < self.sources.len() {
            self.index += 1;
            self.latest = None;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &Option<S::Value>)>, SequenceError> {
        if self.latest.is_none() {
            let Some(source) = self.sources.get_mut(self.index) else {
                return Ok(None);
            };
            self.latest = Some(source.last()?);
        }
        Ok(self.latest.as_ref().map(|latest| (&self.index, latest)))
    }
}

/// Deals values into `count` groups in turn, like cards: with three groups,
/// `[1, 2, 3, 4, 5, 6, 7]` becomes `[1, 4, 7]`, `[2, 5]`, `[3, 6]`. Groups that
/// receive nothing are not yielded. The source is read in full on first access.
pub struct Partition<S: Sequence> {
    source: S,
    count: usize,
    groups: Option<Vec<Vec<S::Value>>>,
    position: usize,
}

impl<S: Sequence> Partition<S> {
    pub(crate) fn new(source: S, count: usize) -> Result<Self, SequenceError> {
        if count == 0 {
            return Err(SequenceError::invalid_argument("partition", "the number of partitions must be at least 1"));
        }
        Ok(Self { source, count, groups: None, position: 0 })
    }
}

impl<S> Partition<S>
where
    S: Sequence,
    S::Value: Clone,
{
    fn deal(&mut self) -> Result<(), SequenceError> {
        if self.groups.is_some() {
            return Ok(());
        }
        let mut groups: Vec<Vec<S::Value>> = Vec::new();
        let mut dealt = 0;
        while let Some(value) = self.source.current_value()? {
            match groups.get_mut(dealt % self.count) {
                Some(group) => group.push(value.clone()),
                None => groups.push(vec![value.clone()]),
            }
            self.source.advance()?;
            dealt += 1;
        }
        self.groups = Some(groups);
        Ok(())
    }
}

impl<S> Sequence for Partition<S>
where
    S: Sequence,
    S::Value: Clone,
{
    type Key = usize;
    type Value = Vec<S::Value>;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.groups = None;
        self.position = 0;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.deal()?;
        let dealt = self.groups.as_ref().map_or(0, Vec::len);
        if self.position < dealt {
            self.position += 1;
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &Vec<S::Value>)>, SequenceError> {
        self.deal()?;
        let group = self.groups.as_ref().and_then(|groups| groups.get(self.position));
        Ok(group.map(|group| (&self.position, group)))
    }
}

#[cfg(test)]
mod tests {
    use super::{combine_latest, concat, zip_all, Partition};
    use crate::{normalize::from_iter, Sequence, SequenceExt};

    #[test]
    fn concat_skips_empty_sources() {
        let mut joined = concat([vec![], vec![1, 2], vec![], vec![3]]);
        assert_eq!(joined.to_vec().unwrap(), vec![1, 2, 3]);
        assert_eq!(joined.to_pairs().unwrap(), vec![(0, 1), (1, 2), (0, 3)]);
    }

    #[test]
    fn zip_all_stops_at_the_shortest() {
        let mut rows = zip_all([vec![1, 2, 3], vec![4, 5], vec![6, 7, 8]]);
        assert_eq!(rows.to_vec().unwrap(), vec![vec![1, 4, 6], vec![2, 5, 7]]);
        assert!(zip_all(Vec::<Vec<i32>>::new()).to_vec().unwrap().is_empty());
    }

    #[test]
    fn combine_latest_drains_only_reached_sources() {
        let mut latest = combine_latest([from_iter(vec![1, 2]), from_iter(vec![]), from_iter(vec![3])]);
        assert_eq!(latest.current_value().unwrap(), Some(&Some(2)));
        latest.advance().unwrap();
        assert_eq!(latest.current_value().unwrap(), Some(&None));
    }

    #[test]
    fn partition_requires_a_group() {
        assert!(Partition::new(from_iter([1]), 0).is_err());
    }
}
