//! Pool fixtures shared by the unit tests.
use crate::pool::{BloodType, Pool, PoolBuilder, VertexId};
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Beta;
use reservoir_sampling::unweighted::core::r as reservoir_sample;

pub(crate) fn init() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Every pair donates to every other pair with unit weight and no failures.
pub(crate) fn complete_pool(num_pairs: usize) -> Pool {
    let mut builder = PoolBuilder::with_capacity(num_pairs);
    let pairs: Vec<VertexId> = (0..num_pairs)
        .map(|_| builder.add_pair(BloodType::O, BloodType::A))
        .collect();
    for &source in pairs.iter() {
        for &target in pairs.iter().filter(|&&target| target != source) {
            builder.add_edge(source, target, 1., 0.).unwrap();
        }
    }
    builder.build()
}

/// Sparse random pool: altruists first, then pairs, each vertex donating to `out_degree`
/// distinct pairs picked by reservoir sampling.
pub(crate) fn random_pool(
    seed: u64,
    num_pairs: usize,
    num_altruists: usize,
    out_degree: usize,
) -> Pool {
    let mut filter_rng = ChaCha8Rng::seed_from_u64(seed);
    let mut val_rng = ChaCha8Rng::seed_from_u64(seed + 1);
    let weights = Uniform::from(1.0..3.0);
    let failures = Beta::new(2.0, 5.0).unwrap();

    let mut builder = PoolBuilder::with_capacity(num_pairs + num_altruists);
    let altruists: Vec<VertexId> = (0..num_altruists)
        .map(|_| builder.add_altruist(BloodType::O))
        .collect();
    let pairs: Vec<VertexId> = (0..num_pairs)
        .map(|_| builder.add_pair(BloodType::A, BloodType::B))
        .collect();

    for &source in altruists.iter().chain(pairs.iter()) {
        let mut targets = vec![VertexId(u32::MAX); out_degree.min(num_pairs)];
        if targets.is_empty() {
            continue;
        }
        reservoir_sample(
            pairs.iter().copied().filter(|&target| target != source),
            targets.as_mut_slice(),
            &mut filter_rng,
        );
        for target in targets.into_iter().filter(|t| t.0 != u32::MAX) {
            builder
                .add_edge(
                    source,
                    target,
                    weights.sample(&mut val_rng),
                    failures.sample(&mut val_rng),
                )
                .unwrap();
        }
    }
    builder.build()
}

mod tests {
    use super::random_pool;

    #[test]
    fn test_random_pool_without_out_edges() {
        let pool = random_pool(1, 5, 2, 0);
        assert_eq!(pool.pairs().len(), 5);
        // only the pair -> altruist closing edges remain
        assert_eq!(pool.num_edges(), 10);
        assert!(pool
            .pairs()
            .iter()
            .all(|&pair| pool.out_edges(pair).iter().all(|edge| edge.dummy)));
    }
}
