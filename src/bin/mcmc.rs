//! Metropolis churn demo: a random tree and random tip data, thousands of
//! branch-length proposals against the likelihood core, store before every
//! proposal and restore on rejection. Finishes with a from-scratch replay
//! of the accepted state as a consistency check.

use anyhow::Result;
use clap::Parser;
use phylocore::buffer::pool::Kind;
use phylocore::eigen::Eigen;
use phylocore::felsenstein::Felsenstein;
use phylocore::tree::Phylogeny;
use phylocore::BranchLength;
use phylocore::LogLik;
use phylocore::Rate;
use phylocore::Real;
use phylocore::StateIndex;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

#[derive(Parser)]
#[command(about = "branch-length churn over a random tree")]
struct Args {
    #[arg(long, default_value_t = 16)]
    taxa: usize,
    #[arg(long, default_value_t = 256)]
    patterns: usize,
    #[arg(long, default_value_t = 4)]
    categories: usize,
    #[arg(long, default_value_t = 10_000)]
    iterations: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    logs();
    let args = Args::parse();
    let states = 4;
    let ref mut rng = SmallRng::seed_from_u64(args.seed);
    let mut tree = Phylogeny::grow(args.taxa, rng);
    let kinds = tree.kinds(Kind::StateTip);
    let mut core = Felsenstein::new(states, args.patterns, args.categories, &kinds)?;
    core.set_eigen(Eigen::equal_rates(states));
    core.set_category_rates(&spread(args.categories));
    let tips = (0..args.taxa)
        .map(|tip| {
            let data = (0..args.patterns)
                .map(|_| rng.random_range(0..states + 1) as StateIndex)
                .collect::<Vec<_>>();
            core.set_tip_states(tip, &data);
            data
        })
        .collect::<Vec<_>>();
    let (nodes, lengths) = tree.lengths();
    core.update_matrices(&nodes, &lengths);
    core.update_partials(&tree.operations());
    let ref mut site = vec![0.0; args.patterns];
    core.log_likelihoods(tree.root(), site);
    let mut loglik = total(site);
    log::info!("initial log likelihood {:.4}", loglik);

    let mut accepted = 0usize;
    for i in 1..=args.iterations {
        core.store();
        let n = rng.random_range(0..tree.nodes() - 1);
        let old = tree.length(n);
        let new = old * (0.5 + rng.random::<BranchLength>());
        tree.set_length(n, new);
        core.update_matrices(&[n], &[new]);
        core.update_partials(&tree.path_to_root(n));
        core.log_likelihoods(tree.root(), site);
        let proposed = total(site);
        // non-finite site likelihoods reject outright
        let accept = proposed.is_finite()
            && rng.random::<Real>().ln() < proposed - loglik;
        match accept {
            true => {
                loglik = proposed;
                accepted += 1;
            }
            false => {
                core.restore();
                tree.set_length(n, old);
            }
        }
        if i % 1000 == 0 {
            log::info!(
                "iteration {:>6}: log likelihood {:.4}, acceptance {:.3}",
                i,
                loglik,
                accepted as f64 / i as f64
            );
        }
    }

    // the live state must equal a clean evaluation of the accepted tree
    core.log_likelihoods(tree.root(), site);
    let mut fresh = Felsenstein::new(states, args.patterns, args.categories, &kinds)?;
    fresh.set_eigen(Eigen::equal_rates(states));
    fresh.set_category_rates(&spread(args.categories));
    for (tip, data) in tips.iter().enumerate() {
        fresh.set_tip_states(tip, data);
    }
    let (nodes, lengths) = tree.lengths();
    fresh.update_matrices(&nodes, &lengths);
    fresh.update_partials(&tree.operations());
    let ref mut replay = vec![0.0; args.patterns];
    fresh.log_likelihoods(tree.root(), replay);
    match site.iter().zip(replay.iter()).all(|(a, b)| a == b) {
        true => log::info!("replay check passed at {:.4}", total(replay)),
        false => log::error!("replay diverged from churned state"),
    }
    Ok(())
}

/// category rates (2l+1)/R: increasing, mean one
fn spread(categories: usize) -> Vec<Rate> {
    (0..categories)
        .map(|l| (2 * l + 1) as Rate / categories as Rate)
        .collect()
}

fn total(site: &[LogLik]) -> LogLik {
    site.iter().sum()
}

fn logs() {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::ConfigBuilder::new()
            .set_location_level(log::LevelFilter::Off)
            .set_target_level(log::LevelFilter::Off)
            .set_thread_level(log::LevelFilter::Off)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("initialize logger");
}
