use super::{LpGuidedPacker, Packer, Selection};
use crate::cycle::Cycle;
use crate::error::MatchingError;
use crate::membership::PackingInstance;
use crate::oracle::{ExactSolver, SolverFactory};
use crate::sampler::ChainSampler;
use crate::solution::Solution;
use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::debug;

/// What happens to the candidates once short cycles and sampled chains are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalPass {
    /// Short cycles by LP-guided greedy, then the best sampled chain per altruist in the residual.
    Greedy,
    /// Short cycles plus chains sampled from the whole pool go to an exact solve. The upper
    /// bound is not consulted.
    Exact,
}

/// Cycles first, chains second.
///
/// Each `pack` call opening an exact solve gets its own session from the factory, so the packer
/// can run in concurrent repetitions.
pub struct HybridPacker<'f, F> {
    short_cycles: Vec<usize>,
    lp: LpGuidedPacker,
    sampler: ChainSampler,
    samples_per_altruist: usize,
    final_pass: FinalPass,
    factory: &'f F,
    time_limit: Option<Duration>,
}

impl<'f, F: SolverFactory> HybridPacker<'f, F> {
    /// longest cycle packed in the first phase
    pub const MAX_CYCLE_LEN: usize = 3;

    /// Solves the LP relaxation over the short cycles of `instance` once, with a fresh session.
    pub fn new(
        instance: &PackingInstance<'_>,
        factory: &'f F,
        sampler: ChainSampler,
        samples_per_altruist: usize,
        block_size: usize,
        final_pass: FinalPass,
    ) -> Result<Self, anyhow::Error> {
        ensure!(
            samples_per_altruist > 0,
            MatchingError::InvalidSampleCount(samples_per_altruist)
        );
        let short_cycles: Vec<usize> = instance
            .cycles()
            .iter()
            .enumerate()
            .filter(|(_, cycle)| !cycle.is_chain() && cycle.len() <= Self::MAX_CYCLE_LEN)
            .map(|(position, _)| position)
            .collect();
        let short_instance = instance.restrict(|cycle| {
            !cycle.is_chain() && cycle.len() <= Self::MAX_CYCLE_LEN
        });
        let mut session = factory.open_session().map_err(MatchingError::from)?;
        let values = session
            .relax(&short_instance, None)
            .map_err(MatchingError::from)?;
        let lp =
            LpGuidedPacker::over_positions(instance, short_cycles.clone(), &values, block_size)?;
        debug!(
            "hybrid packer: {} short cycles ranked by relaxation",
            short_cycles.len()
        );
        Ok(Self {
            short_cycles,
            lp,
            sampler,
            samples_per_altruist,
            final_pass,
            factory,
            time_limit: None,
        })
    }

    /// Wall clock budget handed to each exact solve.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    fn pack_greedy<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        upper_bound: f64,
        rng: &mut R,
    ) -> Result<Solution, anyhow::Error> {
        let pool = instance.pool();
        let mut selection = Selection::new(pool.num_vertices());
        self.lp.accept_into(instance, &mut selection, upper_bound, rng)?;
        let num_cycles = selection.len();

        let mut altruists = pool.altruists().to_vec();
        altruists.shuffle(rng);
        for origin in altruists {
            if selection.reaches(upper_bound) {
                break;
            }
            let mut best: Option<Cycle> = None;
            for _ in 0..self.samples_per_altruist {
                let sampled = self.sampler.sample(
                    pool,
                    instance.membership(),
                    origin,
                    |vertex| !selection.is_claimed(vertex),
                    rng,
                );
                if let Some(chain) = sampled {
                    if best.as_ref().map_or(true, |b| chain.weight() > b.weight()) {
                        best = Some(chain);
                    }
                }
            }
            if let Some(chain) = best {
                selection.try_accept(&chain);
            }
        }
        debug!(
            "hybrid packer accepted {} cycles and {} chains, objective {}",
            num_cycles,
            selection.len() - num_cycles,
            selection.objective()
        );
        selection.into_solution()
    }

    fn pack_exact<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        rng: &mut R,
    ) -> Result<Solution, anyhow::Error> {
        let start = Instant::now();
        let pool = instance.pool();
        let mut candidates: Vec<Cycle> = self
            .short_cycles
            .iter()
            .map(|&position| instance.cycles()[position].clone())
            .collect();
        let num_cycles = candidates.len();
        for &origin in pool.altruists() {
            for _ in 0..self.samples_per_altruist {
                let sampled =
                    self.sampler
                        .sample(pool, instance.membership(), origin, |_| true, rng);
                if let Some(chain) = sampled {
                    if !candidates[num_cycles..].contains(&chain) {
                        candidates.push(chain);
                    }
                }
            }
        }
        debug!(
            "hybrid packer: exact pass over {} cycles and {} sampled chains",
            num_cycles,
            candidates.len() - num_cycles
        );

        let candidates = PackingInstance::new(pool, candidates);
        let mut session = self.factory.open_session().map_err(MatchingError::from)?;
        let mut solution = session
            .solve(&candidates, self.time_limit)
            .map_err(MatchingError::from)?;
        solution.verify_disjoint()?;
        solution.elapsed = start.elapsed();
        Ok(solution)
    }
}

impl<'f, F: SolverFactory> Packer for HybridPacker<'f, F> {
    fn pack<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        upper_bound: f64,
        rng: &mut R,
    ) -> Result<Solution, anyhow::Error> {
        match self.final_pass {
            FinalPass::Greedy => self.pack_greedy(instance, upper_bound, rng),
            FinalPass::Exact => self.pack_exact(instance, rng),
        }
    }
}
