use super::{accept_in_order, Packer, Selection};
use crate::error::MatchingError;
use crate::membership::PackingInstance;
use crate::oracle::ExactSolver;
use crate::solution::Solution;
use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Greedy scan in decreasing order of LP relaxation value.
///
/// The order is cut into blocks of `block_size` and each block is shuffled before scanning, so
/// the relaxation's global ranking is kept while ties and near-ties vary between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct LpGuidedPacker {
    // positions into the instance cycle list, best relaxation value first
    order: Vec<usize>,
    block_size: usize,
    num_cycles: usize,
}

impl LpGuidedPacker {
    pub const DEFAULT_BLOCK_SIZE: usize = 10;

    /// `values[i]` is the fractional value of `instance.cycles()[i]`.
    pub fn new(
        instance: &PackingInstance<'_>,
        values: &[f64],
        block_size: usize,
    ) -> Result<Self, anyhow::Error> {
        let positions = (0..instance.cycles().len()).collect();
        Self::over_positions(instance, positions, values, block_size)
    }

    /// Restricts the scan to `positions`; `values[k]` belongs to `positions[k]`.
    pub fn over_positions(
        instance: &PackingInstance<'_>,
        positions: Vec<usize>,
        values: &[f64],
        block_size: usize,
    ) -> Result<Self, anyhow::Error> {
        ensure!(block_size > 0, MatchingError::InvalidBlockSize(block_size));
        ensure!(
            positions.len() == values.len(),
            MatchingError::InstanceMismatch {
                expected: values.len(),
                actual: positions.len(),
            }
        );
        let num_cycles = instance.cycles().len();
        ensure!(
            positions.iter().all(|&position| position < num_cycles),
            "cycle position out of range for {} cycles",
            num_cycles
        );

        let mut ranked: Vec<(usize, f64)> =
            positions.into_iter().zip(values.iter().copied()).collect();
        // stable, so equal values keep list order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(Self {
            order: ranked.into_iter().map(|(position, _)| position).collect(),
            block_size,
            num_cycles,
        })
    }

    /// Solves the relaxation once with `session` and ranks the cycles by it.
    pub fn from_oracle<S: ExactSolver>(
        instance: &PackingInstance<'_>,
        session: &mut S,
        block_size: usize,
        time_limit: Option<Duration>,
    ) -> Result<Self, anyhow::Error> {
        let values = session
            .relax(instance, time_limit)
            .map_err(MatchingError::from)?;
        Self::new(instance, &values, block_size)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Runs the block-shuffled scan into an existing selection.
    pub(crate) fn accept_into<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        selection: &mut Selection,
        upper_bound: f64,
        rng: &mut R,
    ) -> Result<(), anyhow::Error> {
        ensure!(
            instance.cycles().len() == self.num_cycles,
            MatchingError::InstanceMismatch {
                expected: self.num_cycles,
                actual: instance.cycles().len(),
            }
        );
        let mut order = self.order.clone();
        for block in order.chunks_mut(self.block_size) {
            block.shuffle(rng);
        }
        accept_in_order(instance, order, selection, upper_bound);
        Ok(())
    }
}

impl Packer for LpGuidedPacker {
    fn pack<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        upper_bound: f64,
        rng: &mut R,
    ) -> Result<Solution, anyhow::Error> {
        let mut selection = Selection::new(instance.pool().num_vertices());
        self.accept_into(instance, &mut selection, upper_bound, rng)?;
        debug!(
            "LP guided packer accepted {} cycles, objective {}",
            selection.len(),
            selection.objective()
        );
        selection.into_solution()
    }
}
