use crate::cycle::Cycle;
use crate::generator::CycleGenerator;
use crate::pool::{Pool, VertexId};
use std::collections::BTreeMap;
use tracing::debug;

/// Inverted index from vertex to the positions of the cycles and chains containing it.
///
/// Built in a single pass over a fixed cycle list. A regenerated list needs a fresh index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CycleMembership {
    // positions are ascending for every vertex
    index: BTreeMap<VertexId, Vec<usize>>,
    num_cycles: usize,
}

impl CycleMembership {
    pub fn build(pool: &Pool, cycles: &[Cycle]) -> Self {
        let mut index: BTreeMap<VertexId, Vec<usize>> = BTreeMap::new();
        for (position, cycle) in cycles.iter().enumerate() {
            for &vertex in cycle.vertices() {
                debug_assert!(pool.vertex(vertex).is_some());
                index.entry(vertex).or_default().push(position);
            }
        }
        debug!(
            "membership index over {} cycles touches {} of {} vertices",
            cycles.len(),
            index.len(),
            pool.num_vertices()
        );
        CycleMembership {
            index,
            num_cycles: cycles.len(),
        }
    }

    pub fn cycles_of(&self, vertex: VertexId) -> &[usize] {
        self.index.get(&vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn count(&self, vertex: VertexId) -> usize {
        self.cycles_of(vertex).len()
    }

    /// Length of the cycle list the index was built from.
    #[inline]
    pub fn num_cycles(&self) -> usize {
        self.num_cycles
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.index.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VertexId, &[usize])> + '_ {
        self.index
            .iter()
            .map(|(&vertex, positions)| (vertex, positions.as_slice()))
    }
}

/// A pool snapshot together with a fixed cycle list and its membership index.
///
/// Everything a packer reads. Nothing here changes after construction, so a single instance can
/// be shared across concurrent repetitions.
#[derive(Debug, Clone)]
pub struct PackingInstance<'p> {
    pool: &'p Pool,
    cycles: Vec<Cycle>,
    membership: CycleMembership,
}

impl<'p> PackingInstance<'p> {
    pub fn new(pool: &'p Pool, cycles: Vec<Cycle>) -> Self {
        let membership = CycleMembership::build(pool, &cycles);
        Self {
            pool,
            cycles,
            membership,
        }
    }

    pub fn generate(pool: &'p Pool, generator: &CycleGenerator) -> Self {
        Self::new(pool, generator.generate(pool))
    }

    /// Instance over the cycles accepted by `keep`, with a freshly built membership index.
    pub fn restrict<F>(&self, mut keep: F) -> PackingInstance<'p>
    where
        F: FnMut(&Cycle) -> bool,
    {
        let cycles = self.cycles.iter().filter(|c| keep(c)).cloned().collect();
        PackingInstance::new(self.pool, cycles)
    }

    #[inline]
    pub fn pool(&self) -> &'p Pool {
        self.pool
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    #[inline]
    pub fn membership(&self) -> &CycleMembership {
        &self.membership
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}
