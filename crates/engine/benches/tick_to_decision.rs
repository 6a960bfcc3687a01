//! Benchmarks for the tick-to-decision hot path.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use book::OrderBook;
use common::{Instrument, Px, Qty, Side, Ts};
use risk::{EmergencyHalt, Layer1Limits, Layer2Limits, RiskGate};
use ring::Spsc;
use strategy::{MarketMaker, Strategy, StrategyConfig, StrategyInput};

fn bench_book_add_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_book");
    let updates: Spsc<book::OrderBookUpdate, 4_096> = Spsc::new();

    group.bench_function("add_then_cancel", |b| {
        let mut book: OrderBook<1_024> = OrderBook::new(Instrument::Note10Y);
        let mut order_id = 1u64;
        b.iter(|| {
            let id = black_box(order_id);
            book.add(id, Side::Bid, Px::new(99.9), Qty::new(1_000_000.0), Ts(0), &updates).ok();
            book.cancel(id, Ts(0), &updates).ok();
            order_id += 1;
        });
    });

    group.bench_function("trade_against_resting_depth", |b| {
        let mut book: OrderBook<1_024> = OrderBook::new(Instrument::Note10Y);
        for i in 0..256u64 {
            book.add(i + 1, Side::Ask, Px::new(100.0 - (i % 8) as f64 * 0.01), Qty::new(1_000_000.0), Ts(0), &updates).ok();
        }
        b.iter(|| {
            black_box(book.trade(Px::new(100.0), Qty::new(500_000.0), Side::Bid, Ts(0), &updates));
        });
    });

    group.finish();
}

fn bench_strategy_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy");
    let risk = RiskGate::new(Layer1Limits::default(), Layer2Limits::default(), Arc::new(EmergencyHalt::new()));

    group.bench_function("market_maker_step", |b| {
        let mut mm = MarketMaker::new(Instrument::Note10Y, StrategyConfig::default());
        let input = StrategyInput {
            bid_price: Px::new(99.9),
            ask_price: Px::new(100.1),
            bid_size: Qty::new(5_000_000.0),
            ask_size: Qty::new(5_000_000.0),
            ts: Ts(0),
        };
        b.iter(|| {
            black_box(mm.step(black_box(&input), black_box(&risk)));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_book_add_cancel, bench_strategy_step);
criterion_main!(benches);
