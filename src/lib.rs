//! Cycle and chain packing for kidney paired donation pools.
//!
//! A [`Pool`] holds incompatible donor/patient pairs and altruistic donors joined by weighted
//! compatibility edges. [`CycleGenerator`] enumerates every exchange cycle and altruist chain up
//! to the length caps, [`CycleMembership`] indexes them by vertex, and a [`Packer`] draws a
//! vertex-disjoint selection. [`GreedyPackingSolver`] repeats a packer and keeps the best draw.
//!
//! ```
//! use kpd_packing::{match_pool, BloodType, MatchingConfig, PoolBuilder, ShufflePacker};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut builder = PoolBuilder::new();
//! let p = builder.add_pair(BloodType::A, BloodType::B);
//! let q = builder.add_pair(BloodType::B, BloodType::A);
//! builder.add_edge(p, q, 1., 0.1)?;
//! builder.add_edge(q, p, 1., 0.1)?;
//! let pool = builder.build();
//!
//! let config = MatchingConfig::default().with_repetitions(4);
//! let mut rng = ChaCha8Rng::seed_from_u64(0);
//! let solution = match_pool(&pool, &config, |_| Ok(ShufflePacker::default()), f64::INFINITY, &mut rng)?;
//! assert_eq!(solution.objective, 2.);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod cycle;
pub mod error;
pub mod generator;
pub mod membership;
pub mod oracle;
pub mod packer;
pub mod pool;
pub mod sampler;
pub mod solution;
pub mod solver;
#[cfg(test)]
mod testing;

pub use crate::config::{match_pool, MatchingConfig};
pub use crate::cycle::{Cycle, CycleKind, Weighting};
pub use crate::error::{MatchingError, SolverError};
pub use crate::generator::CycleGenerator;
pub use crate::membership::{CycleMembership, PackingInstance};
pub use crate::oracle::{BranchAndBound, ExactSolver, SolverFactory};
pub use crate::packer::{
    FinalPass, HybridPacker, LpGuidedPacker, Packer, RandomWalkPacker, ShuffleOrder,
    ShufflePacker,
};
pub use crate::pool::{BloodType, Edge, Pool, PoolBuilder, Vertex, VertexId, VertexKind};
pub use crate::sampler::{ChainSampler, ExtensionBias};
pub use crate::solution::Solution;
pub use crate::solver::GreedyPackingSolver;
