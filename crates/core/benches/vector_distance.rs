//! Distance kernel benchmark: scalar baseline vs the detected vectorized kernel.
//!
//! Usage: cargo bench -p retrieval-core --bench vector_distance

use std::hint::black_box;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retrieval_core::distance::{kernel, scalar, DistanceKernel};

const PAIRS: usize = 1_000;
const ROUNDS: usize = 200;

fn random_vectors(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect()
}

fn time_kernel(name: &str, xs: &[Vec<f32>], ys: &[Vec<f32>], f: impl Fn(&[f32], &[f32]) -> f32) {
    let t0 = Instant::now();
    let mut acc = 0.0f32;
    for _ in 0..ROUNDS {
        for (x, y) in xs.iter().zip(ys) {
            acc += f(black_box(x.as_slice()), black_box(y.as_slice()));
        }
    }
    let elapsed = t0.elapsed();
    let calls = (ROUNDS * xs.len()) as f64;
    println!(
        "  {:<22} | {:>8.1} ns/call | checksum {:.3}",
        name,
        elapsed.as_nanos() as f64 / calls,
        acc
    );
}

fn main() {
    println!("=== Distance kernels ===");
    let detected: &DistanceKernel = kernel();
    println!("Detected kernel: {}", detected.name());

    let mut rng = StdRng::seed_from_u64(42);
    for dim in [128usize, 512, 2048, 2047] {
        println!();
        println!("dim = {dim}");
        let xs = random_vectors(&mut rng, PAIRS, dim);
        let ys = random_vectors(&mut rng, PAIRS, dim);

        time_kernel("cosine (scalar)", &xs, &ys, scalar::cosine_distance);
        time_kernel("cosine (detected)", &xs, &ys, |x, y| detected.cosine_distance(x, y));
        time_kernel("euclidean_sq (scalar)", &xs, &ys, scalar::euclidean_sq);
        time_kernel("euclidean_sq (detected)", &xs, &ys, |x, y| detected.euclidean_sq(x, y));
    }

    println!();
    println!("=== Benchmark complete ===");
}
