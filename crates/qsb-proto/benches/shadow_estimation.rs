use qsb_core::RngHandle;
use qsb_obs::Observable;
use qsb_proto::{draw_basis_choices, estimate_shadow, median_of_means, shadow_contributions};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;

fn shadow_bench(c: &mut Criterion) {
    let mut rng = RngHandle::from_seed(29);
    let bases = draw_basis_choices(20_000, 8, &mut rng);
    let outcomes: Vec<Vec<u8>> = (0..20_000)
        .map(|_| (0..8).map(|_| u8::from(rng.gen_bool(0.5))).collect())
        .collect();
    let outcome_rows: Vec<&[u8]> = outcomes.iter().map(Vec::as_slice).collect();
    let basis_rows: Vec<&[u8]> = bases.iter().map(Vec::as_slice).collect();
    let observable = Observable::parse("zxzi", "ZXZIIIII", 1.0).unwrap();

    c.bench_function("shadow_estimate_20k", |b| {
        b.iter(|| {
            let reduction = estimate_shadow(&outcome_rows, &basis_rows, &observable);
            black_box(reduction);
        });
    });
    c.bench_function("shadow_median_of_means_20k", |b| {
        b.iter(|| {
            let contributions = shadow_contributions(&outcome_rows, &basis_rows, &observable);
            black_box(median_of_means(contributions, 20));
        });
    });
}

criterion_group!(benches, shadow_bench);
criterion_main!(benches);
