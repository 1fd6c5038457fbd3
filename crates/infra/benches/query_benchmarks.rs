use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, TimeZone, Utc};
use hooklog_core::{ManualClock, SequentialIds};
use hooklog_events::{EventRecord, Payload, codec};
use hooklog_infra::backend::{InMemoryKvClient, KvBackend};
use hooklog_infra::event_store::{self, EventStore, ListQuery, StoreLimits};
use serde_json::json;
use std::sync::Arc;

const CAP: usize = 2000;

/// A full log of webhook-shaped payloads, newest first.
fn capped_log() -> Vec<EventRecord> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    (0..CAP)
        .rev()
        .map(|i| {
            let kind = ["charge.succeeded", "invoice.paid", "customer.updated"][i % 3];
            let payload = Payload::from_value(json!({
                "type": kind,
                "data": {
                    "object": {
                        "id": format!("obj_{i:06}"),
                        "amount": i * 100,
                        "currency": "usd",
                        "metadata": { "order": format!("ORD-{i}") }
                    }
                }
            }))
            .unwrap();
            EventRecord::new(
                format!("evt-{i}").parse().unwrap(),
                start + Duration::milliseconds(i as i64),
                payload,
            )
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_filter");
    group.throughput(Throughput::Elements(CAP as u64));
    let log = capped_log();

    for search in ["", "invoice", "ORD-1999", "no-such-text"] {
        group.bench_with_input(BenchmarkId::new("search", if search.is_empty() { "<empty>" } else { search }), &search, |b, &search| {
            b.iter(|| black_box(event_store::filter(log.clone(), black_box(search), 300)));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(CAP as u64));
    let encoded: Vec<Vec<u8>> = capped_log().iter().map(|r| codec::encode(r).unwrap()).collect();

    group.bench_function("decode_lossy_full_log", |b| {
        b.iter(|| black_box(codec::decode_lossy(encoded.iter())));
    });

    group.finish();
}

fn bench_store_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_list");
    group.sample_size(50);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let store = EventStore::new(
        Arc::new(KvBackend::new(InMemoryKvClient::new(), "bench")),
        Arc::new(ManualClock::ticking(Utc::now(), Duration::microseconds(1))),
        Arc::new(SequentialIds::new("evt")),
        StoreLimits::default(),
    );
    runtime.block_on(async {
        for record in capped_log().into_iter().rev() {
            store.append(record.payload).await.unwrap();
        }
    });

    for search in ["", "charge"] {
        let query = ListQuery::new(search, Some(300));
        group.bench_with_input(BenchmarkId::new("kv_memory", if search.is_empty() { "<empty>" } else { search }), &query, |b, query| {
            b.iter(|| runtime.block_on(async { black_box(store.list(query).await.unwrap()) }));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter, bench_decode, bench_store_list);
criterion_main!(benches);
