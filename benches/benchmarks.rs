//! Performance Benchmarks for Gravity-Well Attention
//!
//! Run with: cargo bench
//!
//! Benchmarks cover:
//! - Tensor operations (mass, elementwise add)
//! - Gravity-well attention across key-set sizes
//! - Tunneling access
//! - Spiral mask generation and convolution
//! - Temporal processor observation throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gravwell_attention::{
    gravity_well_attention, spiral_convolve, spiral_mask, tunneling_access, AttentionParams,
    SpiralKernelParams, TemporalConfig, TemporalProcessor, Tensor4D, TunnelingParams,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn random_tensor(dims: [usize; 4], seed: u64) -> Tensor4D<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut t = Tensor4D::zeros(dims);
    t.random_fill(-1.0, 1.0, &mut rng);
    t
}

// ═══════════════════════════════════════════════════════════════════════════
// TENSOR BENCHMARKS
// ═══════════════════════════════════════════════════════════════════════════

fn bench_mass(c: &mut Criterion) {
    let t = random_tensor([2, 8, 32, 32], 1);
    let mut group = c.benchmark_group("tensor");
    group.throughput(Throughput::Elements(t.len() as u64));
    group.bench_function("mass", |b| b.iter(|| black_box(&t).mass()));
    group.finish();
}

fn bench_elementwise_add(c: &mut Criterion) {
    let a = random_tensor([2, 8, 32, 32], 2);
    let b_t = random_tensor([2, 8, 32, 32], 3);
    c.bench_function("elementwise_add", |b| {
        b.iter(|| black_box(&a).elementwise_add(black_box(&b_t)).unwrap())
    });
}

// ═══════════════════════════════════════════════════════════════════════════
// ATTENTION BENCHMARKS
// ═══════════════════════════════════════════════════════════════════════════

fn bench_attention(c: &mut Criterion) {
    let query = random_tensor([1, 4, 16, 16], 10);
    let mut group = c.benchmark_group("gravity_well_attention");

    for n_keys in [2usize, 8, 32] {
        let pool: Vec<Tensor4D<f32>> = (0..n_keys)
            .map(|i| random_tensor([1, 4, 16, 16], 20 + i as u64))
            .collect();
        let refs: Vec<&Tensor4D<f32>> = pool.iter().collect();

        group.bench_with_input(BenchmarkId::from_parameter(n_keys), &refs, |b, refs| {
            b.iter(|| {
                gravity_well_attention(
                    black_box(&query),
                    refs,
                    refs,
                    &AttentionParams::default(),
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

// ═══════════════════════════════════════════════════════════════════════════
// TUNNELING BENCHMARKS
// ═══════════════════════════════════════════════════════════════════════════

fn bench_tunneling(c: &mut Criterion) {
    let input = random_tensor([2, 8, 32, 32], 30);
    let params = TunnelingParams {
        base_probability: 0.3,
        ..Default::default()
    };
    c.bench_function("tunneling_access", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(31);
            tunneling_access(black_box(&input), &params, &mut rng).unwrap()
        })
    });
}

// ═══════════════════════════════════════════════════════════════════════════
// SPIRAL BENCHMARKS
// ═══════════════════════════════════════════════════════════════════════════

fn bench_spiral_mask(c: &mut Criterion) {
    let params = SpiralKernelParams {
        kernel_size: 11,
        num_rotations: 2.0,
    };
    c.bench_function("spiral_mask_11x11", |b| {
        b.iter(|| spiral_mask(black_box(&params)).unwrap())
    });
}

fn bench_spiral_convolve(c: &mut Criterion) {
    let input = random_tensor([1, 4, 64, 64], 40);
    let params = SpiralKernelParams {
        kernel_size: 7,
        num_rotations: 2.0,
    };
    c.bench_function("spiral_convolve_64x64", |b| {
        b.iter(|| spiral_convolve(black_box(&input), &params, 1, 3).unwrap())
    });
}

// ═══════════════════════════════════════════════════════════════════════════
// TEMPORAL BENCHMARKS
// ═══════════════════════════════════════════════════════════════════════════

fn bench_temporal_observe(c: &mut Criterion) {
    let snapshots: Vec<Tensor4D<f32>> = (0..16)
        .map(|i| random_tensor([1, 4, 16, 16], 50 + i as u64))
        .collect();

    c.bench_function("temporal_observe_window8", |b| {
        b.iter(|| {
            let mut proc = TemporalProcessor::new(TemporalConfig {
                window_size: 8,
                stride: 1,
            })
            .unwrap();
            for snapshot in &snapshots {
                proc.observe(black_box(snapshot)).unwrap();
            }
        })
    });
}

criterion_group!(
    benches,
    bench_mass,
    bench_elementwise_add,
    bench_attention,
    bench_tunneling,
    bench_spiral_mask,
    bench_spiral_convolve,
    bench_temporal_observe
);
criterion_main!(benches);
