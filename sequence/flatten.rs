/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{error::SequenceError, higher_order::PairFn, Sequence};

/// A value that is either a leaf or an ordered group of further nested values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nested<T> {
    Leaf(T),
    Branch(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    pub fn leaf(value: T) -> Self {
        Self::Leaf(value)
    }

    pub fn branch(children: impl IntoIterator<Item = Nested<T>>) -> Self {
        Self::Branch(children.into_iter().collect())
    }

    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Self::Leaf(value) => Some(value),
            Self::Branch(_) => None,
        }
    }
}

impl<T> From<T> for Nested<T> {
    fn from(value: T) -> Self {
        Self::Leaf(value)
    }
}

impl<T> Nested<T> {
    /// The same shape with every leaf replaced by `mapper(leaf)`.
    pub fn map_leaves<U>(&self, mut mapper: impl FnMut(&T) -> U) -> Nested<U> {
        enum Step<'a, T> {
            Visit(&'a Nested<T>),
            Close(usize),
        }
        let mut steps = vec![Step::Visit(self)];
        let mut built: Vec<Nested<U>> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(Nested::Leaf(value)) => built.push(Nested::Leaf(mapper(value))),
                Step::Visit(Nested::Branch(children)) => {
                    steps.push(Step::Close(children.len()));
                    steps.extend(children.iter().rev().map(Step::Visit));
                }
                Step::Close(arity) => {
                    let children = built.split_off(built.len() - arity);
                    built.push(Nested::Branch(children));
                }
            }
        }
        built.pop().unwrap_or(Nested::Branch(Vec::new()))
    }

    /// Leaves in depth-first order.
    pub fn iter_leaves(&self) -> LeafIter<'_, T> {
        LeafIter { pending: vec![self] }
    }

    /// Reduces the children of a branch, each nested branch reduced on its own from
    /// `initial` first and then folded into its parent as [`Folded::Branch`].
    pub(crate) fn fold_children<A, F>(children: &[Nested<T>], initial: &A, reducer: &mut F) -> A
    where
        A: Clone,
        F: FnMut(A, Folded<'_, T, A>) -> A,
    {
        let mut frames = vec![(children.iter(), Some(initial.clone()))];
        loop {
            let next = match frames.last_mut() {
                Some((children, _)) => children.next(),
                None => return initial.clone(),
            };
            let folded = match next {
                Some(Nested::Branch(grandchildren)) => {
                    frames.push((grandchildren.iter(), Some(initial.clone())));
                    continue;
                }
                Some(Nested::Leaf(value)) => Folded::Leaf(value),
                None => match frames.pop() {
                    Some((_, Some(reduced))) if frames.is_empty() => return reduced,
                    Some((_, Some(reduced))) => Folded::Branch(reduced),
                    _ => return initial.clone(),
                },
            };
            if let Some((_, slot)) = frames.last_mut() {
                if let Some(accumulator) = slot.take() {
                    *slot = Some(reducer(accumulator, folded));
                }
            }
        }
    }
}

/// One input to a recursive reduction: a leaf, or the reduced value of a whole branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Folded<'a, T, A> {
    Leaf(&'a T),
    Branch(A),
}

pub struct LeafIter<'a, T> {
    pending: Vec<&'a Nested<T>>,
}

impl<'a, T> Iterator for LeafIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        while let Some(next) = self.pending.pop() {
            match next {
                Nested::Leaf(value) => return Some(value),
                Nested::Branch(children) => self.pending.extend(children.iter().rev()),
            }
        }
        None
    }
}

/// Mapper for `map_recursive`: applies the wrapped function to every leaf.
pub struct MapLeaves<F>(pub F);

impl<K, T, U, F> PairFn<K, Nested<T>, Nested<U>> for MapLeaves<F>
where
    F: FnMut(&T) -> U,
{
    fn call(&mut self, _: &K, value: &Nested<T>) -> Nested<U> {
        value.map_leaves(&mut self.0)
    }
}

struct Frame<T> {
    children: Vec<Nested<T>>,
    index: usize,
}

/// Flattens up to `levels` levels of branches, keyed by output position.
/// Branches below the limit are yielded as-is. Descent uses an explicit stack,
/// so arbitrarily deep values cannot overflow the call stack.
pub struct FlattenNested<S, T> {
    source: S,
    levels: usize,
    stack: Vec<Frame<T>>,
    position: usize,
}

impl<S, T> FlattenNested<S, T> {
    pub(crate) fn new(source: S, levels: usize) -> Self {
        Self { source, levels, stack: Vec::new(), position: 0 }
    }
}

impl<S, T> FlattenNested<S, T>
where
    S: Sequence<Value = Nested<T>>,
    T: Clone,
{
    fn settle(&mut self) -> Result<bool, SequenceError> {
        loop {
            let depth = self.stack.len();
            let descend = match self.stack.last_mut() {
                Some(frame) => match frame.children.get(frame.index) {
                    None => {
                        self.stack.pop();
                        if self.stack.is_empty() {
                            self.source.advance()?;
                        } else if let Some(parent) = self.stack.last_mut() {
                            parent.index += 1;
                        }
                        continue;
                    }
                    Some(Nested::Branch(children)) if depth < self.levels => children.clone(),
                    Some(_) => return Ok(true),
                },
                None => match self.source.current()? {
                    None => return Ok(false),
                    Some((_, Nested::Branch(children))) if self.levels > 0 => children.clone(),
                    Some(_) => return Ok(true),
                },
            };
            self.stack.push(Frame { children: descend, index: 0 });
        }
    }
}

impl<S, T> Sequence for FlattenNested<S, T>
where
    S: Sequence<Value = Nested<T>>,
    T: Clone,
{
    type Key = usize;
    type Value = Nested<T>;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.stack.clear();
        self.position = 0;
        self.source.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if !self.settle()? {
            return Ok(());
        }
        match self.stack.last_mut() {
            Some(frame) => frame.index += 1,
            None => self.source.advance()?,
        }
        self.position += 1;
        Ok(())
    }

    fn current(&mut self) -> Result<Option<(&usize, &Nested<T>)>, SequenceError> {
        if !self.settle()? {
            return Ok(None);
        }
        let position = &self.position;
        match self.stack.last() {
            Some(frame) => Ok(frame.children.get(frame.index).map(|child| (position, child))),
            None => Ok(self.source.current()?.map(|(_, value)| (position, value))),
        }
    }
}

/// Every leaf of arbitrarily nested values, in depth-first order.
pub struct Leaves<S, T> {
    inner: FlattenNested<S, T>,
}

impl<S, T> Leaves<S, T> {
    pub(crate) fn new(source: S) -> Self {
        Self { inner: FlattenNested::new(source, usize::MAX) }
    }
}

impl<S, T> Sequence for Leaves<S, T>
where
    S: Sequence<Value = Nested<T>>,
    T: Clone,
{
    type Key = usize;
    type Value = T;

    fn reset(&mut self) -> Result<(), SequenceError> {
        self.inner.reset()
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        self.inner.advance()
    }

    fn current(&mut self) -> Result<Option<(&usize, &T)>, SequenceError> {
        Ok(self.inner.current()?.and_then(|(position, value)| value.as_leaf().map(|leaf| (position, leaf))))
    }
}

#[cfg(test)]
mod tests {
    use super::{Folded, Nested};
    use crate::{normalize::IntoSequence, SequenceExt};

    fn sample() -> Vec<Nested<i32>> {
        vec![
            Nested::leaf(1),
            Nested::branch([Nested::leaf(2), Nested::branch([Nested::leaf(3), Nested::branch([Nested::leaf(4)])])]),
            Nested::branch([]),
            Nested::leaf(5),
        ]
    }

    #[test]
    fn one_level_keeps_deeper_branches() {
        let flattened = sample().into_sequence().flatten_nested(1).to_vec().unwrap();
        assert_eq!(
            flattened,
            vec![
                Nested::leaf(1),
                Nested::leaf(2),
                Nested::branch([Nested::leaf(3), Nested::branch([Nested::leaf(4)])]),
                Nested::leaf(5),
            ]
        );
    }

    #[test]
    fn zero_levels_is_identity() {
        let flattened = sample().into_sequence().flatten_nested(0).to_vec().unwrap();
        assert_eq!(flattened, sample());
    }

    #[test]
    fn map_leaves_keeps_the_shape() {
        let doubled = sample()[1].map_leaves(|value| value * 2);
        assert_eq!(
            doubled,
            Nested::branch([Nested::leaf(4), Nested::branch([Nested::leaf(6), Nested::branch([Nested::leaf(8)])])])
        );
        assert_eq!(Nested::<i32>::branch([]).map_leaves(|value| *value), Nested::branch([]));
    }

    #[test]
    fn leaf_iteration_is_depth_first() {
        let tree = Nested::branch(sample());
        assert_eq!(tree.iter_leaves().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn branches_fold_from_the_initial_value() {
        let counted = Nested::fold_children(&sample(), &0, &mut |count: usize, folded: Folded<'_, i32, usize>| match folded {
            Folded::Leaf(_) => count + 1,
            Folded::Branch(inner) => count + inner,
        });
        assert_eq!(counted, 5);
    }

    #[test]
    fn leaves_are_positionally_keyed() {
        let leaves = sample().into_sequence().leaves().to_pairs().unwrap();
        assert_eq!(leaves, vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]);
    }
}
