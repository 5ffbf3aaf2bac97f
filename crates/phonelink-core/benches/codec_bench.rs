//! Criterion benchmarks for the sync frame codec.
//!
//! Measures decoding latency for each envelope kind plus the two discard
//! paths (invalid JSON, non-object top level).  The decoder sits on the
//! per-connection read path, so it must stay cheap relative to socket I/O.
//!
//! Run with:
//! ```bash
//! cargo bench --package phonelink-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phonelink_core::decode_frame;

// ── Frame fixtures ────────────────────────────────────────────────────────────

const NOTIFICATION_FRAME: &str = r#"{"type":"notification","data":{"title":"New mail","body":"Three unread messages","packageName":"com.example.mail","timestamp":"1722945600123"}}"#;

const SPARSE_NOTIFICATION_FRAME: &str = r#"{"type":"notification","data":{"title":"Bye"}}"#;

const DEVICE_INFO_FRAME: &str = r#"{"type":"device_info","data":{"battery":{"level":87}}}"#;

const SMS_SYNC_FRAME: &str = r#"{"type":"sms_sync","data":{"messages":[{"address":"+15551234","body":"hi","date":"d1"}]}}"#;

const UNKNOWN_KIND_FRAME: &str = r#"{"type":"wallpaper_sync","data":{"uri":"content://x"}}"#;

const INVALID_JSON_FRAME: &str = "not-json at all {{{";

const NON_OBJECT_FRAME: &str = r#"["notification","device_info"]"#;

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks `decode_frame` for every accepted envelope kind.
fn bench_decode_accepted(c: &mut Criterion) {
    let frames: &[(&str, &str)] = &[
        ("notification", NOTIFICATION_FRAME),
        ("notification_sparse", SPARSE_NOTIFICATION_FRAME),
        ("device_info", DEVICE_INFO_FRAME),
        ("sms_sync", SMS_SYNC_FRAME),
        ("unknown_kind", UNKNOWN_KIND_FRAME),
    ];

    let mut group = c.benchmark_group("decode_frame");
    for (name, frame) in frames {
        group.bench_with_input(BenchmarkId::new("frame", name), frame, |b, frame| {
            b.iter(|| decode_frame(black_box(frame)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Benchmarks the discard paths a misbehaving peer can exercise at line rate.
fn bench_decode_discarded(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame_discard");

    group.bench_function("invalid_json", |b| {
        b.iter(|| decode_frame(black_box(INVALID_JSON_FRAME)).expect_err("must be rejected"))
    });

    group.bench_function("non_object", |b| {
        b.iter(|| decode_frame(black_box(NON_OBJECT_FRAME)).expect_err("must be rejected"))
    });

    group.finish();
}

criterion_group!(benches, bench_decode_accepted, bench_decode_discarded);
criterion_main!(benches);
