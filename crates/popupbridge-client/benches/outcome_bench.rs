// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for return-URL translation and script rendering in
// the popupbridge-client crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use popupbridge_client::outcome::{decode_query, translate};
use popupbridge_core::types::ReturnOutcome;
use popupbridge_webview::script::message_script;
use url::Url;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Translate a typical success URL and render its notification script.
fn bench_translate_success(c: &mut Criterion) {
    let outcome = ReturnOutcome::Success {
        return_url: Url::parse(
            "myapp://popupbridgev1/checkout/complete?token=EC-7XK29&PayerID=QWERTY&status=approved#receipt",
        )
        .expect("valid url"),
    };

    c.bench_function("translate_success", |b| {
        b.iter(|| {
            let translation = translate(black_box(&outcome)).expect("bridge host");
            black_box(message_script(&translation.message));
        });
    });
}

/// Decode query strings with a growing number of parameters.
fn bench_decode_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_query");
    for count in [4usize, 32, 256] {
        let query = (0..count)
            .map(|i| format!("key{i}=value%20{i}+x"))
            .collect::<Vec<_>>()
            .join("&");
        group.bench_function(format!("{count} params"), |b| {
            b.iter(|| {
                let items = decode_query(black_box(&query)).expect("decodes");
                black_box(items);
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_translate_success, bench_decode_query);
criterion_main!(benches);
