use super::{Packer, Selection};
use crate::membership::PackingInstance;
use crate::sampler::ChainSampler;
use crate::solution::Solution;
use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Packs chains only: one random walk per altruist, visited in random order, each walk avoiding
/// pairs already claimed by earlier chains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomWalkPacker {
    sampler: ChainSampler,
}

impl RandomWalkPacker {
    pub fn new(sampler: ChainSampler) -> Self {
        Self { sampler }
    }
}

impl Packer for RandomWalkPacker {
    fn pack<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        upper_bound: f64,
        rng: &mut R,
    ) -> Result<Solution, anyhow::Error> {
        let pool = instance.pool();
        let mut selection = Selection::new(pool.num_vertices());
        let mut altruists = pool.altruists().to_vec();
        altruists.shuffle(rng);

        for origin in altruists {
            if selection.reaches(upper_bound) {
                break;
            }
            let sampled = self.sampler.sample(
                pool,
                instance.membership(),
                origin,
                |vertex| !selection.is_claimed(vertex),
                rng,
            );
            if let Some(chain) = sampled {
                selection.try_accept(&chain);
            }
        }
        debug!(
            "random walk packer accepted {} chains, objective {}",
            selection.len(),
            selection.objective()
        );
        selection.into_solution()
    }
}

#[cfg(test)]
mod tests {
    use super::RandomWalkPacker;
    use crate::cycle::Weighting;
    use crate::membership::PackingInstance;
    use crate::packer::Packer;
    use crate::pool::{BloodType, PoolBuilder};
    use crate::sampler::{ChainSampler, ExtensionBias};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_competing_altruists_share_nothing() {
        // two altruists can both reach the same three pairs
        let mut builder = PoolBuilder::new();
        let altruists = [builder.add_altruist(BloodType::O), builder.add_altruist(BloodType::A)];
        let pairs: Vec<_> = (0..3)
            .map(|_| builder.add_pair(BloodType::A, BloodType::B))
            .collect();
        for &altruist in altruists.iter() {
            for &pair in pairs.iter() {
                builder.add_edge(altruist, pair, 1., 0.).unwrap();
            }
        }
        for &source in pairs.iter() {
            for &target in pairs.iter().filter(|&&t| t != source) {
                builder.add_edge(source, target, 1., 0.).unwrap();
            }
        }
        let pool = builder.build();
        let instance = PackingInstance::new(&pool, Vec::new());
        let packer = RandomWalkPacker::new(ChainSampler::new(
            3,
            ExtensionBias::Uniform,
            Weighting::Raw,
        ));
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for _ in 0..20 {
            let solution = packer.pack(&instance, f64::INFINITY, &mut rng).unwrap();
            assert!(solution.cycles.iter().all(|c| c.is_chain()));
            // the first walk takes every pair, leaving the second altruist nothing
            assert_eq!(solution.cycles.len(), 1);
            assert_eq!(solution.objective, 3.);
        }
    }
}
