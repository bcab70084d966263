use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use valence_council::core::{now, Hash256};
use valence_council::receipt::{verify_chain, HashMode, Proposal, Receipt, Vote};

fn receipt(members: usize, previous: Option<Hash256>) -> Receipt {
    let mut votes = BTreeMap::new();
    for i in 0..members {
        let scores: BTreeMap<String, f64> = ["joy", "mercy", "sustain"]
            .iter()
            .map(|c| (c.to_string(), 0.9 + (i % 10) as f64 / 100.0))
            .collect();
        votes.insert(format!("member-{}", i), Vote::from_scores(scores, false));
    }

    Receipt {
        timestamp: now(),
        fork_context: None,
        proposal: Proposal::new("Build a shared vertical farm"),
        votes,
        avg_valence: 0.945,
        has_veto: false,
        approved: false,
        previous_hash: previous,
        receipt_hash: Hash256::zero(),
    }
    .seal()
    .unwrap()
}

fn bench_seal(c: &mut Criterion) {
    let mut group = c.benchmark_group("receipt_seal");
    for members in [5, 50, 500] {
        let unsealed = receipt(members, Some(Hash256::zero()));
        group.bench_with_input(BenchmarkId::from_parameter(members), &unsealed, |b, r| {
            b.iter(|| black_box(r.compute_hash().unwrap()))
        });
    }
    group.finish();
}

fn bench_verify_chain(c: &mut Criterion) {
    let mut chain: Vec<Receipt> = Vec::new();
    for _ in 0..200 {
        let previous = HashMode::Chained.link_after(chain.last());
        chain.push(receipt(5, previous));
    }

    c.bench_function("verify_chain_200", |b| {
        b.iter(|| black_box(verify_chain(&chain).unwrap()))
    });
}

criterion_group!(benches, bench_seal, bench_verify_chain);
criterion_main!(benches);
