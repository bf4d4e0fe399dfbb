use super::{accept_in_order, Packer, Selection};
use crate::membership::PackingInstance;
use crate::solution::Solution;
use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleOrder {
    /// Random permutation of the whole cycle list.
    Cycles,
    /// Random permutation of the vertices, each followed by its incident cycles in random order.
    VertexFirst,
}

/// Shuffle-and-accept: scan a random order, taking every cycle whose vertices are still free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShufflePacker {
    order: ShuffleOrder,
}

impl Default for ShufflePacker {
    fn default() -> Self {
        Self::new(ShuffleOrder::Cycles)
    }
}

impl ShufflePacker {
    pub fn new(order: ShuffleOrder) -> Self {
        Self { order }
    }
}

impl Packer for ShufflePacker {
    fn pack<R: Rng + ?Sized>(
        &self,
        instance: &PackingInstance<'_>,
        upper_bound: f64,
        rng: &mut R,
    ) -> Result<Solution, anyhow::Error> {
        let mut selection = Selection::new(instance.pool().num_vertices());
        match self.order {
            ShuffleOrder::Cycles => {
                let mut positions: Vec<usize> = (0..instance.cycles().len()).collect();
                positions.shuffle(rng);
                accept_in_order(instance, positions, &mut selection, upper_bound);
            }
            ShuffleOrder::VertexFirst => {
                let membership = instance.membership();
                let mut vertices: Vec<_> = membership.vertices().collect();
                vertices.shuffle(rng);
                for vertex in vertices {
                    if selection.reaches(upper_bound) {
                        break;
                    }
                    if selection.is_claimed(vertex) {
                        continue;
                    }
                    let mut incident = membership.cycles_of(vertex).to_vec();
                    incident.shuffle(rng);
                    accept_in_order(instance, incident, &mut selection, upper_bound);
                }
            }
        }
        debug!(
            "shuffle packer ({:?}) accepted {} cycles, objective {}",
            self.order,
            selection.len(),
            selection.objective()
        );
        selection.into_solution()
    }
}
