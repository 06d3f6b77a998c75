use blobtrack_rs::{emd_match, Blob, BlobTracker, Metric};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::ArrayView1;
use rand::prelude::*;
use rand_distr::Normal;
use rand_pcg::{Lcg64Xsh32, Pcg32};

/// Returns a vec of length n with a normal distribution
fn normal_vec(rng: &mut Lcg64Xsh32, n: usize) -> Vec<f32> {
    let normal = Normal::<f32>::new(0.0, 1.0).unwrap();
    (0..n).map(|_| normal.sample(rng)).collect()
}

fn euclidean(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    Metric::Euclidean.distance(a, b)
}

fn emd_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("emd_match");
    let mut rng = Pcg32::seed_from_u64(0);

    for n in [8, 32, 64] {
        let db_features = (0..n).map(|_| normal_vec(&mut rng, 32)).collect::<Vec<_>>();
        let query_features = (0..n).map(|_| normal_vec(&mut rng, 32)).collect::<Vec<_>>();
        let db_weights = (0..n).map(|_| rng.gen_range(0.1f32..1.0)).collect::<Vec<_>>();
        let query_weights = (0..n).map(|_| rng.gen_range(0.1f32..1.0)).collect::<Vec<_>>();

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                emd_match(
                    black_box(&db_weights),
                    black_box(&db_features),
                    black_box(&query_weights),
                    black_box(&query_features),
                    &euclidean,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn blob_tracking(c: &mut Criterion) {
    let mut rng = Pcg32::seed_from_u64(0);
    let frames = (0..100)
        .map(|t| {
            (0..50)
                .map(|i| {
                    Blob::from_tlwh(
                        (i * 40) as f32 + t as f32 + rng.gen_range(-1.0..1.0),
                        (i % 5 * 40) as f32 + rng.gen_range(-1.0..1.0),
                        10.0,
                        10.0,
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    c.bench_function("blob_tracker_100_frames_50_blobs", |b| {
        b.iter(|| {
            let mut tracker = BlobTracker::default();
            frames.iter().for_each(|blobs| {
                tracker.update(black_box(blobs.clone())).unwrap();
            });
        })
    });
}

criterion_group!(benches, emd_matching, blob_tracking);
criterion_main!(benches);
