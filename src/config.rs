use crate::cycle::Weighting;
use crate::error::MatchingError;
use crate::generator::CycleGenerator;
use crate::membership::PackingInstance;
use crate::packer::Packer;
use crate::pool::Pool;
use crate::sampler::{ChainSampler, ExtensionBias};
use crate::solution::Solution;
use crate::solver::GreedyPackingSolver;
use anyhow::{ensure, Result};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Parameters of one matching round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingConfig {
    /// longest cycle, in transplants
    pub cycle_cap: usize,
    /// longest chain, in transplants
    pub chain_cap: usize,
    pub weighting: Weighting,
    pub repetitions: usize,
    /// size of the shuffled blocks in LP guided scans
    pub block_size: usize,
    pub samples_per_altruist: usize,
    /// handed to exact solves, unbounded when `None`
    pub time_limit: Option<Duration>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            cycle_cap: Self::CYCLE_CAP,
            chain_cap: Self::CHAIN_CAP,
            weighting: Weighting::Raw,
            repetitions: 1,
            block_size: Self::BLOCK_SIZE,
            samples_per_altruist: Self::SAMPLES_PER_ALTRUIST,
            time_limit: None,
        }
    }
}

impl MatchingConfig {
    const CYCLE_CAP: usize = 3;
    const CHAIN_CAP: usize = 4;
    const BLOCK_SIZE: usize = 10;
    const SAMPLES_PER_ALTRUIST: usize = 5;

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        ensure!(
            self.repetitions >= 1,
            MatchingError::InvalidRepetitions(self.repetitions)
        );
        ensure!(
            self.block_size >= 1,
            MatchingError::InvalidBlockSize(self.block_size)
        );
        ensure!(
            self.samples_per_altruist >= 1,
            MatchingError::InvalidSampleCount(self.samples_per_altruist)
        );
        Ok(())
    }

    pub fn with_cycle_cap(mut self, cycle_cap: usize) -> Self {
        self.cycle_cap = cycle_cap;
        self
    }

    pub fn with_chain_cap(mut self, chain_cap: usize) -> Self {
        self.chain_cap = chain_cap;
        self
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_samples_per_altruist(mut self, samples_per_altruist: usize) -> Self {
        self.samples_per_altruist = samples_per_altruist;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    pub fn generator(&self) -> CycleGenerator {
        CycleGenerator::new(self.cycle_cap, self.chain_cap, self.weighting)
    }

    pub fn sampler(&self, bias: ExtensionBias) -> ChainSampler {
        ChainSampler::new(self.chain_cap, bias, self.weighting)
    }
}

/// Enumerates the cycles and chains of `pool`, builds a packer over them with `build_packer` and
/// keeps the best of `config.repetitions` packs.
pub fn match_pool<P, B, R>(
    pool: &Pool,
    config: &MatchingConfig,
    build_packer: B,
    upper_bound: f64,
    rng: &mut R,
) -> Result<Solution, anyhow::Error>
where
    P: Packer,
    B: FnOnce(&PackingInstance<'_>) -> Result<P, anyhow::Error>,
    R: Rng + ?Sized,
{
    config.validate()?;
    let instance = PackingInstance::generate(pool, &config.generator());
    debug!(
        "pool with {} pairs and {} altruists: {} candidates",
        pool.pairs().len(),
        pool.altruists().len(),
        instance.cycles().len()
    );
    let solver = GreedyPackingSolver::new(build_packer(&instance)?, config.repetitions)?;
    let solution = solver.solve(&instance, upper_bound, rng)?;
    info!(
        "matched {} transplants in {} cycles and chains, objective {}, {:?}",
        solution.num_transplants(),
        solution.cycles.len(),
        solution.objective,
        solution.elapsed
    );
    Ok(solution)
}
