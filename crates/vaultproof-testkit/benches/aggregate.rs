//! Proof and Merkle benchmarks.
//!
//! Run with: cargo bench -p vaultproof-testkit

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vaultproof_core::{merkle_root, verify_merkle_proof, Digest, MerkleTree};
use vaultproof_testkit::TestFixture;

fn bench_generate(c: &mut Criterion) {
    let fixture = TestFixture::new();
    let mut n = 0u64;
    c.bench_function("generate_proof", |b| {
        b.iter(|| {
            n += 1;
            black_box(fixture.make_proof(n));
        });
    });
}

fn bench_verify(c: &mut Criterion) {
    let fixture = TestFixture::new();
    let proof = fixture.make_proof(1);
    c.bench_function("verify_proof", |b| {
        b.iter(|| black_box(fixture.constructor.verify_proof(&proof)));
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let fixture = TestFixture::new();
    let mut group = c.benchmark_group("aggregate_proofs");

    for count in [1u64, 8, 64].iter() {
        let proofs = fixture.make_proofs(*count);
        group.throughput(Throughput::Elements(*count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &proofs, |b, proofs| {
            b.iter(|| black_box(fixture.constructor.aggregate_proofs(proofs.clone())));
        });
    }

    group.finish();
}

fn bench_merkle(c: &mut Criterion) {
    let mut group = c.benchmark_group("merkle");

    for count in [16u32, 256, 4096].iter() {
        let leaves: Vec<Digest> = (0..*count).map(|i| Digest::hash(&i.to_be_bytes())).collect();
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("root", count), &leaves, |b, leaves| {
            b.iter(|| black_box(merkle_root(leaves)));
        });

        let tree = MerkleTree::from_leaves(leaves.clone());
        let root = tree.root();
        let last = leaves.len() - 1;
        let path = tree.proof(last).unwrap_or_default();
        group.bench_with_input(BenchmarkId::new("verify_path", count), &path, |b, path| {
            b.iter(|| black_box(verify_merkle_proof(&leaves[last], path, &root)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate, bench_verify, bench_aggregate, bench_merkle);
criterion_main!(benches);
