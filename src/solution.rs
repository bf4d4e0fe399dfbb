use crate::cycle::Cycle;
use crate::error::MatchingError;
use anyhow::Result;
use std::collections::HashSet;
use std::time::Duration;

///
/// Selection of vertex disjoint cycles and chains
///
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// selected cycles and chains, no two of them share a vertex
    pub cycles: Vec<Cycle>,
    /// sum of the selected weights
    pub objective: f64,
    /// wall clock time spent producing the selection
    pub elapsed: Duration,
}

impl Solution {
    /// tolerance to deal with floating point accumulation when comparing against an upper bound
    pub const TOLERANCE: f64 = 1e-9;

    pub fn new(cycles: Vec<Cycle>, elapsed: Duration) -> Self {
        let objective = cycles.iter().map(Cycle::weight).sum();
        Solution {
            cycles,
            objective,
            elapsed,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Duration::default())
    }

    #[inline]
    pub fn reaches(&self, upper_bound: f64) -> bool {
        self.objective + Self::TOLERANCE >= upper_bound
    }

    pub fn num_transplants(&self) -> usize {
        self.cycles.iter().map(Cycle::len).sum()
    }

    /// Fails with [`MatchingError::NotDisjoint`] naming the first vertex found in two selections.
    pub fn verify_disjoint(&self) -> Result<(), anyhow::Error> {
        let mut seen = HashSet::new();
        for cycle in self.cycles.iter() {
            for &vertex in cycle.vertices() {
                if !seen.insert(vertex) {
                    return Err(MatchingError::NotDisjoint { vertex }.into());
                }
            }
        }
        Ok(())
    }
}
