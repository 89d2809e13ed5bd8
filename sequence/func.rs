/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Small function builders for use as mappers and predicates.

use std::{
    borrow::Borrow,
    collections::{BTreeMap, HashMap},
    hash::Hash,
    ops::{Add, Div, Mul, Rem, Sub},
    str::FromStr,
};

use crate::{error::SequenceError, higher_order::PairFn};

pub trait Lookup<Q: ?Sized> {
    type Output;

    fn lookup(&self, key: &Q) -> Option<&Self::Output>;
}

impl<K, V, Q> Lookup<Q> for BTreeMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    fn lookup(&self, key: &Q) -> Option<&V> {
        self.get(key)
    }
}

impl<K, V, Q> Lookup<Q> for HashMap<K, V>
where
    K: Eq + Hash + Borrow<Q>,
    Q: Eq + Hash + ?Sized,
{
    type Output = V;

    fn lookup(&self, key: &Q) -> Option<&V> {
        self.get(key)
    }
}

impl<T> Lookup<usize> for Vec<T> {
    type Output = T;

    fn lookup(&self, index: &usize) -> Option<&T> {
        self.get(*index)
    }
}

/// Reads `key` from a container, falling back to `default` when it is absent.
pub fn index<C, Q>(key: Q, default: C::Output) -> impl Fn(&C) -> C::Output
where
    C: Lookup<Q>,
    C::Output: Clone,
{
    move |container| container.lookup(&key).cloned().unwrap_or_else(|| default.clone())
}

/// Mapper for `pluck`: the value stored under `key`, if any.
pub struct Pluck<Q>(pub Q);

impl<K, V, Q, U> PairFn<K, V, Option<U>> for Pluck<Q>
where
    V: Lookup<Q, Output = U>,
    U: Clone,
{
    fn call(&mut self, _: &K, value: &V) -> Option<U> {
        value.lookup(&self.0).cloned()
    }
}

/// Predicate for `filter_where`: true when `key` is present and holds `expected`.
pub struct FieldEquals<Q, U> {
    pub key: Q,
    pub expected: U,
}

impl<K, V, Q, U> PairFn<K, V, bool> for FieldEquals<Q, U>
where
    V: Lookup<Q, Output = U>,
    U: PartialEq,
{
    fn call(&mut self, _: &K, value: &V) -> bool {
        value.lookup(&self.key) == Some(&self.expected)
    }
}

/// Whether a value counts as present. Zero, `false`, `None`, NaN and empty text or
/// collections do not. Text is judged by length alone, so `"0"` is truthy.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

macro_rules! truthy_when_nonzero {
    ($($number:ty),* $(,)?) => {
        $(
            impl Truthy for $number {
                fn is_truthy(&self) -> bool {
                    *self != 0
                }
            }
        )*
    };
}

truthy_when_nonzero!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for [T] {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> Truthy for BTreeMap<K, V> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> Truthy for HashMap<K, V, S> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

pub fn truthy<T: Truthy + ?Sized>() -> impl Fn(&T) -> bool {
    |value| value.is_truthy()
}

pub fn falsey<T: Truthy + ?Sized>() -> impl Fn(&T) -> bool {
    |value| !value.is_truthy()
}

/// Lifts a value function to the `(key, value)` form, ignoring the key.
pub fn unary<K: ?Sized, V: ?Sized, R, F>(function: F) -> impl Fn(&K, &V) -> R
where
    F: Fn(&V) -> R,
{
    move |_, value| function(value)
}

pub trait Operand: Copy + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Div<Output = Self> + Rem<Output = Self> {}

impl<T> Operand for T where T: Copy + Add<Output = T> + Sub<Output = T> + Mul<Output = T> + Div<Output = T> + Rem<Output = T> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl Arithmetic {
    /// # Panics
    ///
    /// Integer division or remainder by zero panics, as the operators themselves do.
    pub fn apply<T: Operand>(self, left: T, right: T) -> T {
        match self {
            Self::Add => left + right,
            Self::Subtract => left - right,
            Self::Multiply => left * right,
            Self::Divide => left / right,
            Self::Remainder => left % right,
        }
    }
}

impl FromStr for Arithmetic {
    type Err = SequenceError;

    fn from_str(symbol: &str) -> Result<Self, SequenceError> {
        match symbol {
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Subtract),
            "*" => Ok(Self::Multiply),
            "/" => Ok(Self::Divide),
            "%" => Ok(Self::Remainder),
            _ => Err(SequenceError::invalid_argument("operator", format!("'{symbol}' is not an arithmetic operator"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl Comparison {
    pub fn apply<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        match self {
            Self::Less => left < right,
            Self::LessOrEqual => left <= right,
            Self::Greater => left > right,
            Self::GreaterOrEqual => left >= right,
            Self::Equal => left == right,
            Self::NotEqual => left != right,
        }
    }
}

impl FromStr for Comparison {
    type Err = SequenceError;

    fn from_str(symbol: &str) -> Result<Self, SequenceError> {
        match symbol {
            "<" => Ok(Self::Less),
            "<=" => Ok(Self::LessOrEqual),
            ">" => Ok(Self::Greater),
            ">=" => Ok(Self::GreaterOrEqual),
            "==" => Ok(Self::Equal),
            "!=" => Ok(Self::NotEqual),
            _ => Err(SequenceError::invalid_argument("comparison", format!("'{symbol}' is not a comparison operator"))),
        }
    }
}

/// `value <operator> right`, as a mapper.
pub fn operator<T: Operand>(operator: Arithmetic, right: T) -> impl Fn(&T) -> T {
    move |value| operator.apply(*value, right)
}

/// `accumulator <operator> value`, as a reducer for `reduce`.
pub fn operator_reducer<T: Operand>(operator: Arithmetic) -> impl Fn(T, &T) -> T {
    move |accumulator, value| operator.apply(accumulator, *value)
}

/// `value <comparison> right`, as a predicate.
pub fn comparison<T: PartialOrd>(comparison: Comparison, right: T) -> impl Fn(&T) -> bool {
    move |value| comparison.apply(value, &right)
}

pub fn not<T: ?Sized, F>(predicate: F) -> impl Fn(&T) -> bool
where
    F: Fn(&T) -> bool,
{
    move |value| !predicate(value)
}

pub fn even<T>() -> impl Fn(&T) -> bool
where
    T: Copy + Rem<Output = T> + PartialEq + From<u8>,
{
    |value| *value % T::from(2) == T::from(0)
}

/// True for odd values, negative ones included.
pub fn odd<T>() -> impl Fn(&T) -> bool
where
    T: Copy + Rem<Output = T> + PartialEq + From<u8>,
{
    not::<T, _>(even::<T>())
}

/// `second` applied to the result of `first`.
pub fn compose2<A: ?Sized, B, C, F, G>(first: F, second: G) -> impl Fn(&A) -> C
where
    F: Fn(&A) -> B,
    G: Fn(&B) -> C,
{
    move |value| second(&first(value))
}

/// Marks the argument left open by [`partial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hole;

/// An argument fixed by [`partial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound<T>(pub T);

pub trait Bind<A, B, R> {
    type Input;

    fn bind<F>(self, function: F) -> impl Fn(Self::Input) -> R
    where
        F: Fn(A, B) -> R;
}

impl<A, B: Clone, R> Bind<A, B, R> for (Hole, Bound<B>) {
    type Input = A;

    fn bind<F>(self, function: F) -> impl Fn(A) -> R
    where
        F: Fn(A, B) -> R,
    {
        let (Hole, Bound(right)) = self;
        move |left| function(left, right.clone())
    }
}

impl<A: Clone, B, R> Bind<A, B, R> for (Bound<A>, Hole) {
    type Input = B;

    fn bind<F>(self, function: F) -> impl Fn(B) -> R
    where
        F: Fn(A, B) -> R,
    {
        let (Bound(left), Hole) = self;
        move |right| function(left.clone(), right)
    }
}

/// Fixes one argument of a two-argument function, leaving the [`Hole`] open.
pub fn partial<Args, A, B, R, F>(arguments: Args, function: F) -> impl Fn(Args::Input) -> R
where
    Args: Bind<A, B, R>,
    F: Fn(A, B) -> R,
{
    arguments.bind(function)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{
        comparison, compose2, even, falsey, index, odd, operator, operator_reducer, partial, truthy, unary, Arithmetic,
        Bound, Comparison, Hole,
    };

    #[test]
    fn index_falls_back_to_default() {
        let age = index::<BTreeMap<&str, i64>, _>("age", 0);
        assert_eq!(age(&BTreeMap::from([("age", 42)])), 42);
        assert_eq!(age(&BTreeMap::from([("name", 7)])), 0);
    }

    #[test]
    fn parity_handles_negative_values() {
        assert!(even::<i64>()(&-4));
        assert!(odd::<i64>()(&-3));
        assert!(!odd::<i64>()(&0));
    }

    #[test]
    fn partial_fills_either_side() {
        let subtract_ten = partial((Hole, Bound(10)), |left: i64, right: i64| left - right);
        let ten_minus = partial((Bound(10), Hole), |left: i64, right: i64| left - right);
        assert_eq!(subtract_ten(3), -7);
        assert_eq!(ten_minus(3), 7);
    }

    #[test]
    fn compose_feeds_first_into_second() {
        let adult = compose2(index::<BTreeMap<&str, i64>, _>("age", 0), |age: &i64| *age >= 18);
        assert!(adult(&BTreeMap::from([("age", 30)])));
        assert!(!adult(&BTreeMap::new()));
    }

    #[test]
    fn truthiness_follows_emptiness() {
        assert!(truthy::<i32>()(&3));
        assert!(falsey::<i32>()(&0));
        assert!(falsey::<f64>()(&f64::NAN));
        assert!(falsey::<str>()(""));
        assert!(truthy::<str>()("0"));
        assert!(falsey::<Vec<u8>>()(&Vec::new()));
        assert!(falsey::<Option<i32>>()(&Some(0)));
        assert!(truthy::<Option<&str>>()(&Some("x")));
    }

    #[test]
    fn unary_ignores_the_key() {
        let length = unary(|text: &str| text.len());
        assert_eq!(length(&7usize, "four"), 4);
    }

    #[test]
    fn operators_parse_from_symbols() {
        let add_seven = operator("+".parse::<Arithmetic>().unwrap(), 7);
        assert_eq!(add_seven(&3), 10);
        assert_eq!([1, 2, 3, 4].iter().fold(1, operator_reducer(Arithmetic::Multiply)), 24);
        let at_least_two = comparison(">=".parse::<Comparison>().unwrap(), 2);
        assert!(at_least_two(&2));
        assert!(!at_least_two(&1));
        assert!("**".parse::<Arithmetic>().is_err());
        assert!("<>".parse::<Comparison>().is_err());
    }
}
