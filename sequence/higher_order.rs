/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Adapters that let one adaptor struct accept closures over the value, the key, or both.

pub trait PairFn<K, V, U> {
    fn call(&mut self, key: &K, value: &V) -> U;
}

pub struct ValueFn<F>(pub F);

impl<K, V, U, F> PairFn<K, V, U> for ValueFn<F>
where
    F: FnMut(&V) -> U,
{
    fn call(&mut self, _: &K, value: &V) -> U {
        (self.0)(value)
    }
}

pub struct KeyFn<F>(pub F);

impl<K, V, U, F> PairFn<K, V, U> for KeyFn<F>
where
    F: FnMut(&K) -> U,
{
    fn call(&mut self, key: &K, _: &V) -> U {
        (self.0)(key)
    }
}

pub struct EntryFn<F>(pub F);

impl<K, V, U, F> PairFn<K, V, U> for EntryFn<F>
where
    F: FnMut(&K, &V) -> U,
{
    fn call(&mut self, key: &K, value: &V) -> U {
        (self.0)(key, value)
    }
}
