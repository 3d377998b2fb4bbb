//! Search throughput: flat vs binary vs hnsw over synthetic labeled features.
//!
//! Usage: cargo bench -p retrieval-core --bench search_throughput

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retrieval_core::{Index, IndexKind, IndexOptions, Record, SearchRequest};

const RECORDS: usize = 50_000;
const DIM: usize = 256;
const LABELS: i32 = 100;
const QUERIES: usize = 200;
const TOP_K: usize = 20;

fn main() {
    println!("=== Search throughput: {RECORDS} records x {DIM}d, {LABELS} labels ===");

    let mut rng = StdRng::seed_from_u64(7);
    let records: Vec<Record> = (0..RECORDS)
        .map(|i| {
            let values = (0..DIM).map(|_| rng.gen_range(0.0f32..1.0)).collect();
            Record::new(format!("img_{i}.JPEG"), i as i32 % LABELS, values)
        })
        .collect();
    let queries: Vec<Vec<f32>> = (0..QUERIES)
        .map(|_| (0..DIM).map(|_| rng.gen_range(0.0f32..1.0)).collect())
        .collect();

    println!();
    println!("  index  | build (s) | unfiltered QPS | 5-label QPS");
    println!("  -------+-----------+----------------+------------");

    for kind in [IndexKind::Flat, IndexKind::Binary, IndexKind::Graph] {
        let index = Index::new(kind, IndexOptions::default()).expect("index options");

        let t0 = Instant::now();
        index
            .build_from_source(records.iter().cloned().map(Ok))
            .expect("build");
        index.finalize();
        let build = t0.elapsed().as_secs_f64();

        let t0 = Instant::now();
        for q in &queries {
            let resp = index
                .search(&SearchRequest::new(q.clone()).with_top_k(TOP_K))
                .expect("search");
            assert_eq!(resp.neighbors.len(), TOP_K);
        }
        let unfiltered = QUERIES as f64 / t0.elapsed().as_secs_f64();

        let t0 = Instant::now();
        for (i, q) in queries.iter().enumerate() {
            let labels = (0..5).map(|l| (i as i32 + l) % LABELS);
            let _ = index
                .search(&SearchRequest::new(q.clone()).with_top_k(TOP_K).with_labels(labels))
                .expect("search");
        }
        let filtered = QUERIES as f64 / t0.elapsed().as_secs_f64();

        println!(
            "  {:<6} | {:>9.2} | {:>14.1} | {:>11.1}",
            kind.as_str(),
            build,
            unfiltered,
            filtered
        );
    }

    println!();
    println!("=== Benchmark complete ===");
}
