//! Benchmarks for MBO → MBP reconstruction performance.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mbo_mbp_reconstructor::csv_codec::{format_mbp_line, parse_mbo_line, CsvFormat};
use mbo_mbp_reconstructor::{
    Action, MboEvent, MbpReconstructor, ReconstructorConfig, Side, PRICE_SCALE,
};

const TICK: i64 = PRICE_SCALE / 100;

/// Adds on both sides, every tenth add followed by a stitched trade
/// (Trade → Fill → Cancel) against the level it just created.
fn create_test_events(count: usize) -> Vec<MboEvent> {
    let mut events = Vec::with_capacity(count);
    let base_price: i64 = 100 * PRICE_SCALE;
    let mut i = 0usize;

    while events.len() < count {
        let order_id = (i + 1) as u64;
        let is_bid = i % 2 == 0;
        let offset = ((i % 10) as i64) * TICK;
        let (side, price) = if is_bid {
            (Side::Bid, base_price - offset)
        } else {
            (Side::Ask, base_price + TICK + offset)
        };
        let size = ((i % 100) + 1) as u32;

        events.push(MboEvent::new(order_id, Action::Add, side, price, size));

        if i % 10 == 9 {
            let trade_id = 1_000_000 + order_id;
            let aggressor = side.opposite();
            events.push(MboEvent::new(trade_id, Action::Trade, aggressor, price, 1));
            events.push(MboEvent::new(trade_id, Action::Fill, side, price, 1));
            events.push(MboEvent::new(order_id, Action::Cancel, aggressor, price, 1));
        }
        i += 1;
    }

    events.truncate(count);
    events
}

fn quiet_config() -> ReconstructorConfig {
    ReconstructorConfig::new()
        .with_logging(false)
        .with_progress_interval(0)
}

fn bench_reconstruction(c: &mut Criterion) {
    let events = create_test_events(10_000);

    let mut group = c.benchmark_group("reconstruction");
    group.throughput(Throughput::Elements(events.len() as u64));

    group.bench_function("process_events", |b| {
        b.iter(|| {
            let mut reconstructor = MbpReconstructor::with_config(quiet_config());
            for event in &events {
                let _ = black_box(reconstructor.process_event(event));
            }
            black_box(reconstructor.finish())
        })
    });

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let line = "2025-07-17T08:05:03.360842448Z,2025-07-17T08:05:03.360677248Z,160,2,1108,A,B,5.510000000,100,0,817593,130,165200,851012,ARL";

    let mut reconstructor = MbpReconstructor::with_config(quiet_config());
    let mut last = None;
    for event in create_test_events(200) {
        if let Some(snapshot) = reconstructor.process_event(&event) {
            last = Some(snapshot);
        }
    }
    let snapshot = match last {
        Some(snapshot) => snapshot,
        None => return,
    };
    let format = CsvFormat::default();

    let mut group = c.benchmark_group("codec");

    group.bench_function("parse_mbo_line", |b| {
        b.iter(|| black_box(parse_mbo_line(black_box(line), 2)))
    });

    group.bench_function("format_mbp_line", |b| {
        b.iter(|| black_box(format_mbp_line(black_box(&snapshot), 0, &format)))
    });

    group.bench_function("check_consistency", |b| {
        b.iter(|| black_box(snapshot.check_consistency()))
    });

    group.finish();
}

criterion_group!(benches, bench_reconstruction, bench_codec);
criterion_main!(benches);
