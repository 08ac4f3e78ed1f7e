// In benches/ingest_bench.rs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use reddit_ingest::kernels::zstd::encode;
use reddit_ingest::{IngestConfig, Ingester, NullDiagnostics};

// --- MOCK ARCHIVE GENERATION ---

/// Builds NDJSON that looks like a subreddit dump, with multi-byte text so the
/// decoder's split-character path is exercised.
fn generate_posts(count: usize) -> String {
    let mut out = String::with_capacity(count * 160);
    for i in 0..count {
        out.push_str(&format!(
            "{{\"id\": \"t3_{i:x}\", \"author\": \"user{}\", \"created_utc\": {}, \"score\": {}, \
             \"title\": \"Post {i}\", \"selftext\": \"déjà vu ☕ {}\", \"subreddit\": \"rust\"}}\n",
            i % 97,
            1_500_000_000 + i as i64 * 60,
            i % 500,
            "lorem ipsum ".repeat(i % 13),
        ));
    }
    out
}

// --- Benchmark Suite ---

const BENCH_POSTS: usize = 20_000;

fn bench_block_sizes(c: &mut Criterion) {
    let text = generate_posts(BENCH_POSTS);
    let archive = encode(text.as_bytes(), 3).unwrap();

    let mut group = c.benchmark_group("Ingest Block Size Comparison");
    group.throughput(Throughput::Bytes(text.len() as u64));

    for block_size in [1 << 10, 1 << 14, 1 << 18, 1 << 27] {
        let ingester =
            Ingester::new(IngestConfig::default().with_read_block_size(block_size)).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &archive,
            |b, archive| {
                b.iter(|| {
                    let outcome = ingester
                        .ingest_reader(black_box(archive.as_slice()), "bench", &mut NullDiagnostics)
                        .unwrap();
                    black_box(outcome.table.len())
                })
            },
        );
    }
    group.finish();
}

fn bench_arrow_export(c: &mut Criterion) {
    let archive = encode(generate_posts(BENCH_POSTS).as_bytes(), 3).unwrap();
    let outcome = Ingester::default()
        .ingest_reader(archive.as_slice(), "bench", &mut NullDiagnostics)
        .unwrap();

    c.bench_function("Export RecordBatch", |b| {
        b.iter(|| black_box(outcome.table.to_record_batch(None).unwrap()))
    });
}

criterion_group!(benches, bench_block_sizes, bench_arrow_export);
criterion_main!(benches);
