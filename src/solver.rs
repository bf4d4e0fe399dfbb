use crate::error::MatchingError;
use crate::membership::PackingInstance;
use crate::packer::Packer;
use crate::solution::Solution;
use anyhow::{ensure, Result};
use rand::Rng;
use std::time::Instant;
use tracing::{debug, info};

/// Repeats a packer and keeps the best disjoint selection it draws.
#[derive(Debug, Clone)]
pub struct GreedyPackingSolver<P> {
    packer: P,
    repetitions: usize,
}

impl<P: Packer> GreedyPackingSolver<P> {
    pub fn new(packer: P, repetitions: usize) -> Result<Self, anyhow::Error> {
        ensure!(
            repetitions >= 1,
            MatchingError::InvalidRepetitions(repetitions)
        );
        Ok(Self {
            packer,
            repetitions,
        })
    }

    pub fn packer(&self) -> &P {
        &self.packer
    }

    pub fn repetitions(&self) -> usize {
        self.repetitions
    }

    /// Runs up to `repetitions` packs in sequence, returning early once the best objective
    /// reaches `upper_bound`.
    pub fn solve<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        upper_bound: f64,
        rng: &mut R,
    ) -> Result<Solution, anyhow::Error> {
        let start = Instant::now();
        let mut best: Option<Solution> = None;
        for repetition in 0..self.repetitions {
            let solution = self.packer.pack(instance, upper_bound, rng)?;
            debug!(
                "repetition {}: objective {}",
                repetition, solution.objective
            );
            if best
                .as_ref()
                .map_or(true, |b| solution.objective > b.objective)
            {
                best = Some(solution);
            }
            if best.as_ref().map_or(false, |b| b.reaches(upper_bound)) {
                info!(
                    "upper bound {} reached after {} repetitions",
                    upper_bound,
                    repetition + 1
                );
                break;
            }
        }
        let mut best = best.unwrap_or_else(Solution::empty);
        best.elapsed = start.elapsed();
        Ok(best)
    }

    /// Runs the repetitions on the rayon pool.
    ///
    /// Each repetition gets its own `ChaCha8Rng` seeded from `rng`, so results only depend on
    /// the seed and not on scheduling, except for which repetitions are skipped once the bound is
    /// reached.
    #[cfg(feature = "parallel")]
    pub fn solve_parallel<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        upper_bound: f64,
        rng: &mut R,
    ) -> Result<Solution, anyhow::Error>
    where
        P: Sync,
    {
        use rand::SeedableRng;
        use rand_chacha::ChaCha8Rng;
        use rayon::prelude::*;
        use std::sync::atomic::{AtomicBool, Ordering};

        let start = Instant::now();
        let seeds: Vec<u64> = (0..self.repetitions).map(|_| rng.gen()).collect();
        let reached = AtomicBool::new(false);
        let solutions = seeds
            .into_par_iter()
            .map(|seed| {
                if reached.load(Ordering::Relaxed) {
                    return Ok(None);
                }
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let solution = self.packer.pack(instance, upper_bound, &mut rng)?;
                debug!("seed {}: objective {}", seed, solution.objective);
                if solution.reaches(upper_bound) {
                    reached.store(true, Ordering::Relaxed);
                }
                Ok(Some(solution))
            })
            .collect::<Result<Vec<Option<Solution>>>>()?;

        let mut best = solutions
            .into_iter()
            .flatten()
            .fold(None, |best: Option<Solution>, solution| match best {
                Some(b) if b.objective >= solution.objective => Some(b),
                _ => Some(solution),
            })
            .unwrap_or_else(Solution::empty);
        if reached.load(Ordering::Relaxed) {
            info!("upper bound {} reached", upper_bound);
        }
        best.elapsed = start.elapsed();
        Ok(best)
    }
}
