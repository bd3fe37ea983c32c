//! IDS Performance Benchmarks
//!
//! Catalog evaluation runs once per parameter per request, so it dominates
//! scan cost. Compares the one-pass set matcher against sequential
//! evaluation and measures a full request scan.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use zentinel_agent_ids::{evaluate, rules, Monitor, RequestInput};

/// Generate realistic test payloads
fn generate_payloads() -> Vec<(&'static str, String)> {
    vec![
        ("benign_small", "john_doe".to_string()),
        ("benign_medium", generate_benign_medium()),
        ("benign_large", generate_benign_large()),
        ("sqli_simple", "' OR '1'='1".to_string()),
        ("sqli_union", "1 UNION SELECT * FROM users--".to_string()),
        ("xss_simple", "<script>alert(1)</script>".to_string()),
        ("xss_breakout", "\"><script>eval(window.name)</script>".to_string()),
        ("path_traversal", "../../etc/passwd".to_string()),
        ("cmd_injection", "; cat /etc/passwd".to_string()),
    ]
}

fn generate_benign_medium() -> String {
    // ~500 bytes of free text
    let mut s = String::with_capacity(600);
    while s.len() < 500 {
        s.push_str("Software developer with 10 years of experience in web development. ");
    }
    s
}

fn generate_benign_large() -> String {
    // ~2KB of JSON text submitted as one field
    let mut s = String::with_capacity(2048);
    s.push_str(r#"{"user":{"id":12345,"name":"John Doe","email":"john@example.com","settings":{"theme":"dark","language":"en-US"}}"#);
    while s.len() < 2000 {
        s.push_str(r#","extra_field":"value""#);
    }
    s
}

/// Benchmark catalog evaluation, set matcher vs sequential
fn benchmark_catalog_evaluation(c: &mut Criterion) {
    let catalog = rules::default_catalog().expect("Failed to build catalog");
    let payloads = generate_payloads();

    let mut group = c.benchmark_group("catalog_evaluation");

    for (name, payload) in &payloads {
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::new("set", name), payload, |b, input| {
            b.iter(|| catalog.evaluate(black_box(input)))
        });
        group.bench_with_input(BenchmarkId::new("sequential", name), payload, |b, input| {
            b.iter(|| evaluate(black_box(input), catalog.signatures()))
        });
    }

    group.finish();
}

/// Benchmark a full request scan
fn benchmark_request_scan(c: &mut Criterion) {
    let catalog = Arc::new(rules::default_catalog().expect("Failed to build catalog"));
    let monitor = Monitor::new(catalog);

    let benign = RequestInput::new()
        .with("GET", "q", "rust programming")
        .with("GET", "page", "2")
        .with("POST", "bio", generate_benign_medium())
        .with("COOKIE", "session", "a1b2c3d4e5f6g7h8i9j0");

    let attack = RequestInput::new()
        .with("GET", "q", "search")
        .with("GET", "user", "' OR 1=1--")
        .with("POST", "callback", "<script>alert(document.cookie)</script>")
        .with("POST", "file", "../../etc/passwd");

    let mut group = c.benchmark_group("request_scan");
    group.bench_function("benign", |b| b.iter(|| monitor.run(black_box(&benign))));
    group.bench_function("attack", |b| b.iter(|| monitor.run(black_box(&attack))));
    group.finish();
}

criterion_group!(benches, benchmark_catalog_evaluation, benchmark_request_scan);
criterion_main!(benches);
