//! Slot and group hot paths.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rgb_resource::{Fluid, GroupRole, Item, ResourceSlot, SlotGroup, units::BUCKET};
use rgb_transaction::Transaction;

fn slot_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot");
    let water = Fluid::parse("water").unwrap();
    let slot = ResourceSlot::<Fluid>::with_capacity(16 * BUCKET).unwrap();

    group.bench_function("simulate_insert", |b| {
        b.iter(|| black_box(slot.simulate_insert(&water, None, black_box(BUCKET))));
    });

    group.bench_function("insert_extract_commit", |b| {
        b.iter(|| {
            let mut tx = Transaction::open();
            slot.insert(&water, None, BUCKET, &mut tx);
            slot.extract(&water, None, BUCKET, &mut tx);
            tx.commit();
        });
    });

    group.bench_function("insert_abort", |b| {
        b.iter(|| {
            let mut tx = Transaction::open();
            black_box(slot.insert(&water, None, BUCKET, &mut tx));
            tx.abort();
        });
    });

    group.bench_function("insert_immediate", |b| {
        b.iter(|| {
            slot.insert_immediate(&water, None, BUCKET);
            slot.extract_immediate(&water, None, BUCKET);
        });
    });

    group.finish();
}

fn group_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("group");
    let iron = Item::parse("iron_ingot").unwrap();

    for size in [1_u64, 9, 27, 54] {
        group.throughput(Throughput::Elements(size));

        let slots = SlotGroup::builder(GroupRole::STORAGE)
            .slots((0..size).map(|_| ResourceSlot::with_capacity(64).unwrap()))
            .build()
            .unwrap();

        group.bench_with_input(BenchmarkId::new("fill_and_drain", size), &size, |b, &size| {
            b.iter(|| {
                let mut tx = Transaction::open();
                let inserted = slots.insert(&iron, None, size * 64, &mut tx);
                black_box(slots.extract(&iron, None, inserted, &mut tx));
                tx.commit();
            });
        });

        group.bench_with_input(BenchmarkId::new("insert_merging", size), &size, |b, &size| {
            b.iter(|| {
                let mut tx = Transaction::open();
                black_box(slots.insert_merging(&iron, None, size * 32, &mut tx));
                tx.abort();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, slot_benchmarks, group_benchmarks);
criterion_main!(benches);
