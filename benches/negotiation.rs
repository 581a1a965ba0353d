use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use detectors::format::{FormatRegistry, FormatSelector};
use detectors::router::{RouteMeta, Router};
use detectors::value::ResultValue;
use http::Method;
use std::hint::black_box;
use std::sync::Arc;

fn selector() -> FormatSelector {
    FormatSelector::new(Arc::new(FormatRegistry::with_defaults()), Some("application/json"))
}

fn bench_select(c: &mut Criterion) {
    let s = selector();
    let mut group = c.benchmark_group("select");
    group.bench_function("token", |b| {
        b.iter(|| s.select(black_box(Some("csv")), None))
    });
    group.bench_function("accept_exact", |b| {
        b.iter(|| s.select(None, black_box(Some("application/xml"))))
    });
    group.bench_function("accept_browser", |b| {
        b.iter(|| {
            s.select(
                None,
                black_box(Some(
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )),
            )
        })
    });
    group.bench_function("default", |b| b.iter(|| s.select(None, black_box(None))));
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let s = selector();
    let value = ResultValue::byte_sequence((0..1000).map(|i| format!("element-{i}").into_bytes()));
    let mut group = c.benchmark_group("encode_1000");
    for token in ["js", "csv", "xml", "table", "dump"] {
        let encoder = s.select(Some(token), None).map(|sel| sel.encoder);
        let Ok(encoder) = encoder else { continue };
        group.bench_with_input(BenchmarkId::from_parameter(token), &value, |b, v| {
            b.iter(|| encoder.encode(black_box(v)))
        });
    }
    group.finish();
}

fn bench_route(c: &mut Criterion) {
    let prefixes = [
        "/redis/connection/{connectionId}",
        "/redis/connection/{connectionId}/db/{dbId}",
    ];
    let suffixes = [
        ("/list/{key}/length", "list_length"),
        ("/list/{key}/index/{index}", "list_index"),
        ("/list/{key}/index/{index}/string", "list_index_string"),
        ("/list/{key}/range", "list_range"),
        ("/list/{key}/range/string", "list_range_string"),
    ];
    let routes = prefixes
        .iter()
        .flat_map(|p| {
            suffixes
                .iter()
                .map(move |(s, h)| RouteMeta::new(Method::GET, &format!("{p}{s}"), h))
        })
        .collect();
    let router = Router::new("/api", routes);
    c.bench_function("route_with_suffix", |b| {
        b.iter(|| {
            router.route(
                Method::GET,
                black_box("/api/redis/connection/local/db/3/list/mykey/range/string.csv"),
            )
        })
    });
}

criterion_group!(benches, bench_select, bench_encode, bench_route);
criterion_main!(benches);
