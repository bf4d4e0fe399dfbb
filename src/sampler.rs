use crate::cycle::{discounted_chain_weight, Cycle, Weighting};
use crate::membership::CycleMembership;
use crate::pool::{Edge, Pool, VertexId};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

/// How the random walk picks the next pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionBias {
    Uniform,
    /// Weight each candidate by `total cycles / cycles containing it`, favouring pairs few
    /// enumerated cycles compete for. A vertex outside every cycle counts as a member of one.
    InverseMembership,
}

/// Builds one chain by a random walk from an altruist, for pools where enumerating every chain
/// is out of reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSampler {
    chain_cap: usize,
    bias: ExtensionBias,
    weighting: Weighting,
}

impl ChainSampler {
    pub fn new(chain_cap: usize, bias: ExtensionBias, weighting: Weighting) -> Self {
        Self {
            chain_cap,
            bias,
            weighting,
        }
    }

    #[inline]
    pub fn chain_cap(&self) -> usize {
        self.chain_cap
    }

    /// Walks from `origin` through pairs accepted by `available` until the cap or a dead end.
    ///
    /// Returns `None` when the walk cannot leave the altruist or when its tail has no edge back
    /// to `origin`.
    pub fn sample<R, F>(
        &self,
        pool: &Pool,
        membership: &CycleMembership,
        origin: VertexId,
        available: F,
        rng: &mut R,
    ) -> Option<Cycle>
    where
        R: Rng + ?Sized,
        F: Fn(VertexId) -> bool,
    {
        let mut path = vec![origin];
        let mut edges: Vec<&Edge> = Vec::with_capacity(self.chain_cap);
        let mut tail = origin;

        while edges.len() < self.chain_cap {
            let candidates: Vec<&Edge> = pool
                .out_edges(tail)
                .iter()
                .filter(|edge| {
                    !edge.dummy
                        && !pool.is_altruist(edge.target)
                        && !path.contains(&edge.target)
                        && available(edge.target)
                })
                .collect();
            let next = match self.pick(&candidates, membership, rng) {
                Some(edge) => edge,
                None => break,
            };
            trace!("walk {} -> {}", tail, next.target);
            tail = next.target;
            path.push(tail);
            edges.push(next);
        }

        if edges.is_empty() {
            return None;
        }
        let closing = pool.edge(tail, origin)?;
        let weight = match self.weighting {
            Weighting::Raw => edges.iter().map(|edge| edge.weight).sum(),
            Weighting::FailureDiscounted => {
                discounted_chain_weight(edges.iter().copied(), Some(closing))
            }
        };
        Some(Cycle::chain(path, weight))
    }

    fn pick<'e, R: Rng + ?Sized>(
        &self,
        candidates: &[&'e Edge],
        membership: &CycleMembership,
        rng: &mut R,
    ) -> Option<&'e Edge> {
        match self.bias {
            ExtensionBias::Uniform => candidates.choose(rng).copied(),
            ExtensionBias::InverseMembership => {
                if candidates.is_empty() {
                    return None;
                }
                let total = membership.num_cycles().max(1) as f64;
                let weights = candidates
                    .iter()
                    .map(|edge| total / membership.count(edge.target).max(1) as f64);
                // weights are strictly positive and finite, so construction cannot fail
                let index = WeightedIndex::new(weights).ok()?;
                Some(candidates[index.sample(rng)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChainSampler, ExtensionBias};
    use crate::cycle::{Cycle, Weighting};
    use crate::generator::CycleGenerator;
    use crate::membership::CycleMembership;
    use crate::pool::{BloodType, PoolBuilder, VertexId};
    use crate::testing::random_pool;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_walk_follows_path() {
        let mut builder = PoolBuilder::new();
        let altruist = builder.add_altruist(BloodType::O);
        let p = builder.add_pair(BloodType::A, BloodType::B);
        let q = builder.add_pair(BloodType::A, BloodType::B);
        let r = builder.add_pair(BloodType::A, BloodType::B);
        builder.add_edge(altruist, p, 1., 0.7).unwrap();
        builder.add_edge(p, q, 1., 0.7).unwrap();
        builder.add_edge(q, r, 1., 0.7).unwrap();
        let pool = builder.build();
        let membership = CycleMembership::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let sampler = ChainSampler::new(5, ExtensionBias::Uniform, Weighting::Raw);
        let chain = sampler
            .sample(&pool, &membership, altruist, |_| true, &mut rng)
            .unwrap();
        assert_eq!(chain.vertices(), [altruist, p, q, r]);
        assert_eq!(chain.weight(), 3.);

        let sampler = ChainSampler::new(2, ExtensionBias::Uniform, Weighting::FailureDiscounted);
        let chain = sampler
            .sample(&pool, &membership, altruist, |_| true, &mut rng)
            .unwrap();
        assert_eq!(chain.vertices(), [altruist, p, q]);
        assert!((chain.weight() - 0.39).abs() < 1e-9);

        // q is claimed elsewhere, so the walk stops at p
        let chain = sampler
            .sample(&pool, &membership, altruist, |v| v != q, &mut rng)
            .unwrap();
        assert_eq!(chain.vertices(), [altruist, p]);
        assert!(sampler
            .sample(&pool, &membership, altruist, |v| v != p, &mut rng)
            .is_none());
    }

    #[test]
    fn test_discards_unclosable_walks() {
        let mut builder = PoolBuilder::new().dummy_edges(false);
        let altruist = builder.add_altruist(BloodType::O);
        let p = builder.add_pair(BloodType::A, BloodType::B);
        builder.add_edge(altruist, p, 1., 0.).unwrap();
        let pool = builder.build();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let sampler = ChainSampler::new(3, ExtensionBias::Uniform, Weighting::Raw);
        assert!(sampler
            .sample(&pool, &CycleMembership::default(), altruist, |_| true, &mut rng)
            .is_none());
    }

    #[test]
    fn test_inverse_membership_prefers_uncontended_pairs() {
        // altruist -> {busy, quiet}; busy sits in many 2-cycles, quiet in one
        let mut builder = PoolBuilder::new();
        let altruist = builder.add_altruist(BloodType::O);
        let busy = builder.add_pair(BloodType::A, BloodType::B);
        let quiet = builder.add_pair(BloodType::A, BloodType::B);
        builder.add_edge(altruist, busy, 1., 0.).unwrap();
        builder.add_edge(altruist, quiet, 1., 0.).unwrap();
        let partners: Vec<VertexId> = (0..9)
            .map(|_| builder.add_pair(BloodType::O, BloodType::O))
            .collect();
        for &partner in partners.iter() {
            builder.add_edge(busy, partner, 1., 0.).unwrap();
            builder.add_edge(partner, busy, 1., 0.).unwrap();
        }
        builder.add_edge(quiet, partners[0], 1., 0.).unwrap();
        builder.add_edge(partners[0], quiet, 1., 0.).unwrap();
        let pool = builder.build();
        let cycles: Vec<Cycle> = CycleGenerator::new(2, 0, Weighting::Raw).generate(&pool);
        let membership = CycleMembership::build(&pool, &cycles);
        assert_eq!(membership.count(busy), 9);
        assert_eq!(membership.count(quiet), 1);

        let sampler = ChainSampler::new(1, ExtensionBias::InverseMembership, Weighting::Raw);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let quiet_picks = (0..2000)
            .filter_map(|_| sampler.sample(&pool, &membership, altruist, |_| true, &mut rng))
            .filter(|chain| chain.vertices()[1] == quiet)
            .count();
        // expected share 9 / 10
        assert!(quiet_picks > 1650 && quiet_picks < 1950, "{}", quiet_picks);
    }

    #[test]
    fn test_samples_are_simple_chains() {
        let pool = random_pool(9, 40, 4, 3);
        let membership =
            CycleMembership::build(&pool, &CycleGenerator::new(3, 0, Weighting::Raw).generate(&pool));
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for bias in [ExtensionBias::Uniform, ExtensionBias::InverseMembership] {
            let sampler = ChainSampler::new(4, bias, Weighting::FailureDiscounted);
            for &altruist in pool.altruists() {
                for _ in 0..20 {
                    let chain = sampler
                        .sample(&pool, &membership, altruist, |_| true, &mut rng)
                        .unwrap();
                    let vertices = chain.vertices();
                    assert_eq!(vertices[0], altruist);
                    assert!(vertices[1..].iter().all(|&v| !pool.is_altruist(v)));
                    let mut sorted = vertices.to_vec();
                    sorted.sort();
                    sorted.dedup();
                    assert_eq!(sorted.len(), vertices.len());
                    assert!(chain.len() >= 1 && chain.len() <= 4);
                }
            }
        }
    }
}
