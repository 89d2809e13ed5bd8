/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use sequence::{deferred::DeferredSequence, generate::range, normalize::from_iter, SequenceExt};

const ELEMENTS: i64 = 10_000;

fn replay_from_cache(c: &mut Criterion) {
    logger::initialise_logging().ok();
    let mut rewindable = from_iter(0..ELEMENTS).map(|value| value * 2).rewindable();
    rewindable.count().unwrap();

    let mut group = c.benchmark_group("rewindable");
    group.throughput(Throughput::Elements(ELEMENTS as u64));
    group.bench_function("replay_cached", |b| b.iter(|| rewindable.reduce(0i64, |sum, value| sum + value).unwrap()));
    group.finish();
}

fn regenerate_from_factory(c: &mut Criterion) {
    let mut deferred = DeferredSequence::new(|end: &i64| range(0, *end - 1, 1), ELEMENTS);

    let mut group = c.benchmark_group("rewindable");
    group.throughput(Throughput::Elements(ELEMENTS as u64));
    group.bench_function("regenerate_deferred", |b| {
        b.iter(|| deferred.reduce(0i64, |sum, value| sum + value * 2).unwrap())
    });
    group.finish();
}

fn first_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewindable");
    group.throughput(Throughput::Elements(ELEMENTS as u64));
    group.bench_function("first_pass_and_count", |b| {
        b.iter(|| from_iter(0..ELEMENTS).rewindable().count().unwrap())
    });
    group.finish();
}

criterion_group!(benches, replay_from_cache, regenerate_from_factory, first_pass);
criterion_main!(benches);
