use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use stockpile_infra::store::{InMemoryAuditTrail, InMemoryStockRecordStore, InMemoryTransactionLog};
use stockpile_infra::StockLedger;
use stockpile_inventory::{AuditActor, StockAdjustment, StockRecordDraft, TransactionType};

type BenchLedger =
    StockLedger<Arc<InMemoryStockRecordStore>, Arc<InMemoryTransactionLog>, Arc<InMemoryAuditTrail>>;

fn bench_ledger() -> BenchLedger {
    StockLedger::new(
        Arc::new(InMemoryStockRecordStore::new()),
        Arc::new(InMemoryTransactionLog::new()),
        Arc::new(InMemoryAuditTrail::new()),
    )
}

fn draft(sku: &str) -> StockRecordDraft {
    StockRecordDraft {
        sku: sku.to_string(),
        product_name: format!("Product {sku}"),
        quantity: 1_000_000,
        reorder_level: 10,
        unit_price: None,
        location: None,
        status: None,
    }
}

fn stock_in(quantity: i64) -> StockAdjustment {
    StockAdjustment {
        transaction_type: TransactionType::StockIn,
        quantity,
        reason: None,
        reference: None,
    }
}

/// Measures the full unit of work: read, CAS write, transaction append,
/// audit append (including both snapshot serializations).
fn bench_adjust_stock(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjust_stock");
    group.throughput(Throughput::Elements(1));

    let ledger = bench_ledger();
    let actor = AuditActor::default();
    let record = ledger.create_stock(draft("BENCH-1"), &actor).unwrap();

    group.bench_function("stock_in", |b| {
        b.iter(|| {
            ledger
                .adjust_stock(black_box(record.id), stock_in(1), &actor)
                .unwrap()
        })
    });

    group.finish();
}

/// Create throughput as the record store grows (SKU uniqueness scans).
fn bench_create_stock(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_stock");

    for preload in [10usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(preload), &preload, |b, &preload| {
            let ledger = bench_ledger();
            let actor = AuditActor::default();
            for i in 0..preload {
                ledger.create_stock(draft(&format!("PRE-{i}")), &actor).unwrap();
            }

            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                ledger
                    .create_stock(draft(&format!("NEW-{n}")), &actor)
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_adjust_stock, bench_create_stock);
criterion_main!(benches);
