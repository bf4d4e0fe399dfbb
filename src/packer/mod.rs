//! Randomized strategies that pick one vertex disjoint selection from a cycle list.
use crate::cycle::Cycle;
use crate::membership::PackingInstance;
use crate::pool::VertexId;
use crate::solution::Solution;
use anyhow::Result;
use rand::Rng;
use std::time::Instant;
use tracing::trace;

pub mod hybrid;
pub mod lp_guided;
pub mod random_walk;
pub mod uniform;

pub use hybrid::{FinalPass, HybridPacker};
pub use lp_guided::LpGuidedPacker;
pub use random_walk::RandomWalkPacker;
pub use uniform::{ShuffleOrder, ShufflePacker};

pub trait Packer {
    /// Draws one disjoint selection, stopping as soon as its objective reaches `upper_bound`.
    ///
    /// Reads `instance` only, so repeated calls with fresh random draws explore different
    /// selections of the same cycle list.
    fn pack<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        upper_bound: f64,
        rng: &mut R,
    ) -> Result<Solution, anyhow::Error>;
}

/// Running accumulator of a single `pack` call: claimed vertices plus the accepted cycles.
#[derive(Debug, Clone)]
pub struct Selection {
    claimed: Vec<bool>,
    cycles: Vec<Cycle>,
    objective: f64,
    started: Instant,
}

impl Selection {
    pub fn new(num_vertices: usize) -> Self {
        Selection {
            claimed: vec![false; num_vertices],
            cycles: Vec::new(),
            objective: 0.,
            started: Instant::now(),
        }
    }

    #[inline]
    pub fn is_claimed(&self, vertex: VertexId) -> bool {
        self.claimed[vertex.index()]
    }

    #[inline]
    pub fn is_free(&self, cycle: &Cycle) -> bool {
        cycle.vertices().iter().all(|&v| !self.is_claimed(v))
    }

    /// Accepts `cycle` when none of its vertices is claimed yet.
    pub fn try_accept(&mut self, cycle: &Cycle) -> bool {
        if !self.is_free(cycle) {
            trace!("skip {:?}", cycle.vertices());
            return false;
        }
        trace!("accept {:?} weight {}", cycle.vertices(), cycle.weight());
        cycle
            .vertices()
            .iter()
            .for_each(|&v| self.claimed[v.index()] = true);
        self.objective += cycle.weight();
        self.cycles.push(cycle.clone());
        true
    }

    #[inline]
    pub fn objective(&self) -> f64 {
        self.objective
    }

    #[inline]
    pub fn reaches(&self, upper_bound: f64) -> bool {
        self.objective + Solution::TOLERANCE >= upper_bound
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Freezes the selection, re-checking disjointness from scratch.
    pub fn into_solution(self) -> Result<Solution, anyhow::Error> {
        let solution = Solution::new(self.cycles, self.started.elapsed());
        solution.verify_disjoint()?;
        Ok(solution)
    }
}

/// Accepts `positions` of `instance` in order until the selection reaches `upper_bound`.
pub(crate) fn accept_in_order<I>(
    instance: &PackingInstance<'_>,
    positions: I,
    selection: &mut Selection,
    upper_bound: f64,
) where
    I: IntoIterator<Item = usize>,
{
    let cycles = instance.cycles();
    for position in positions {
        if selection.reaches(upper_bound) {
            break;
        }
        selection.try_accept(&cycles[position]);
    }
}
