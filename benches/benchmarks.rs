criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        assembling_transition_matrices,
        pruning_partials_nucleotide,
        pruning_partials_covarion,
        pruning_partials_amino,
        pruning_partials_codon,
        pruning_states_nucleotide,
        pruning_states_partials_nucleotide,
        evaluating_full_pass,
}

use phylocore::buffer::pool::Kind;
use phylocore::eigen::Eigen;
use phylocore::felsenstein::Felsenstein;
use phylocore::kernel::Kernel;
use phylocore::tree::Phylogeny;
use phylocore::Real;
use phylocore::StateIndex;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

const PATTERNS: usize = 256;
const CATEGORIES: usize = 4;

fn matrices(s: usize, rng: &mut SmallRng) -> Vec<Real> {
    (0..CATEGORIES * s * s).map(|_| rng.random()).collect()
}

fn partials(s: usize, rng: &mut SmallRng) -> Vec<Real> {
    (0..CATEGORIES * PATTERNS * s).map(|_| rng.random()).collect()
}

fn states(s: usize, rng: &mut SmallRng) -> Vec<StateIndex> {
    (0..PATTERNS)
        .map(|_| rng.random_range(0..s + 1) as StateIndex)
        .collect()
}

fn pruning_partials(c: &mut criterion::Criterion, s: usize, label: &str) {
    let ref mut rng = SmallRng::seed_from_u64(s as u64);
    let kernel = Kernel::new(s, PATTERNS, CATEGORIES);
    let (m1, m2) = (matrices(s, rng), matrices(s, rng));
    let (p1, p2) = (partials(s, rng), partials(s, rng));
    let ref mut out = vec![0.0; CATEGORIES * PATTERNS * s];
    c.bench_function(label, |b| {
        b.iter(|| kernel.partials_partials(&p1, &m1, &p2, &m2, out))
    });
}

fn pruning_partials_nucleotide(c: &mut criterion::Criterion) {
    pruning_partials(c, 4, "partials x partials, 4 states");
}

fn pruning_partials_covarion(c: &mut criterion::Criterion) {
    pruning_partials(c, 8, "partials x partials, 8 states");
}

fn pruning_partials_amino(c: &mut criterion::Criterion) {
    pruning_partials(c, 20, "partials x partials, 20 states");
}

fn pruning_partials_codon(c: &mut criterion::Criterion) {
    pruning_partials(c, 61, "partials x partials, 61 states (generic)");
}

fn pruning_states_nucleotide(c: &mut criterion::Criterion) {
    let s = 4;
    let ref mut rng = SmallRng::seed_from_u64(41);
    let kernel = Kernel::new(s, PATTERNS, CATEGORIES);
    let (m1, m2) = (matrices(s, rng), matrices(s, rng));
    let (x1, x2) = (states(s, rng), states(s, rng));
    let ref mut out = vec![0.0; CATEGORIES * PATTERNS * s];
    c.bench_function("states x states, 4 states", |b| {
        b.iter(|| kernel.states_states(&x1, &m1, &x2, &m2, out))
    });
}

fn pruning_states_partials_nucleotide(c: &mut criterion::Criterion) {
    let s = 4;
    let ref mut rng = SmallRng::seed_from_u64(43);
    let kernel = Kernel::new(s, PATTERNS, CATEGORIES);
    let (m1, m2) = (matrices(s, rng), matrices(s, rng));
    let x1 = states(s, rng);
    let p2 = partials(s, rng);
    let ref mut out = vec![0.0; CATEGORIES * PATTERNS * s];
    c.bench_function("states x partials, 4 states", |b| {
        b.iter(|| kernel.states_partials(&x1, &m1, &p2, &m2, out))
    });
}

fn assembling_transition_matrices(c: &mut criterion::Criterion) {
    let s = 4;
    let eigen = Eigen::equal_rates(s);
    let ref mut out = vec![0.0; s * s];
    let ref mut iexp = vec![0.0; s * s];
    c.bench_function("assemble one 4-state transition matrix", |b| {
        b.iter(|| eigen.transition(0.37, 1.0, out, iexp))
    });
}

fn evaluating_full_pass(c: &mut criterion::Criterion) {
    let s = 4;
    let ref mut rng = SmallRng::seed_from_u64(97);
    let tree = Phylogeny::grow(16, rng);
    let mut core = Felsenstein::new(s, PATTERNS, CATEGORIES, &tree.kinds(Kind::StateTip)).unwrap();
    core.set_eigen(Eigen::equal_rates(s));
    core.set_category_rates(&[0.2, 0.6, 1.2, 2.0]);
    for tip in 0..tree.tips() {
        let data = states(s, rng);
        core.set_tip_states(tip, &data);
    }
    let (nodes, lengths) = tree.lengths();
    let operations = tree.operations();
    let ref mut out = vec![0.0; PATTERNS];
    c.bench_function("full pass: matrices, pruning, likelihoods (16 taxa)", |b| {
        b.iter(|| {
            core.update_matrices(&nodes, &lengths);
            core.update_partials(&operations);
            core.log_likelihoods(tree.root(), out);
        })
    });
}
