use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use tapledger_core::{InventoryItemId, LocationId, Uom};
use tapledger_infra::InMemoryLedgerStore;
use tapledger_ledger::{ConfidenceLevel, EventType, LedgerStore, NewEvent, TimeWindow};

fn seeded_ledger(events: usize) -> (InMemoryLedgerStore, InventoryItemId) {
    let ledger = InMemoryLedgerStore::new();
    let location_id = LocationId::new();
    let item_id = InventoryItemId::new();
    let base = Utc::now() - Duration::days(56);

    for i in 0..events {
        let delta = if i % 5 == 0 {
            Decimal::from(24)
        } else {
            Decimal::from(-1)
        };
        let event_type = if i % 5 == 0 {
            EventType::Receiving
        } else {
            EventType::PosSale
        };
        ledger
            .append(NewEvent::new(
                location_id,
                item_id,
                event_type,
                delta,
                Uom::Units,
                base + Duration::minutes(i as i64),
                ConfidenceLevel::Theoretical,
            ))
            .unwrap();
    }

    (ledger, item_id)
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_append");
    group.throughput(Throughput::Elements(1));

    group.bench_function("append_single", |b| {
        let ledger = InMemoryLedgerStore::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();
        b.iter(|| {
            ledger
                .append(black_box(NewEvent::new(
                    location_id,
                    item_id,
                    EventType::PosSale,
                    Decimal::from(-1),
                    Uom::Units,
                    Utc::now(),
                    ConfidenceLevel::Theoretical,
                )))
                .unwrap()
        });
    });

    group.finish();
}

fn bench_on_hand(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_on_hand");

    for size in [1_000usize, 10_000, 50_000] {
        let (ledger, item_id) = seeded_ledger(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                ledger
                    .sum_deltas(black_box(item_id), TimeWindow::as_of(Utc::now()))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_append, bench_on_hand);
criterion_main!(benches);
