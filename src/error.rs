use crate::pool::VertexId;
use thiserror::Error;

/// Failures reported by an exact solver session.
///
/// These always surface to the caller wrapped in [`MatchingError::Solver`], an objective of
/// zero is never substituted for a failed solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("solver proved the model infeasible")]
    Infeasible,
    #[error("solver hit its time limit before proving optimality")]
    TimeLimit,
    #[error("solver does not support {0}")]
    Unsupported(&'static str),
    #[error("solver backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchingError {
    #[error("repetition count must be at least 1, got {0}")]
    InvalidRepetitions(usize),
    #[error("LP block size must be at least 1, got {0}")]
    InvalidBlockSize(usize),
    #[error("chain samples per altruist must be at least 1, got {0}")]
    InvalidSampleCount(usize),
    #[error("failure probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
    #[error("edge weight {0} is negative or not finite")]
    InvalidWeight(f64),
    #[error("vertex {0} is not part of the pool")]
    UnknownVertex(VertexId),
    #[error("edge {0} -> {1} is already present")]
    DuplicateEdge(VertexId, VertexId),
    #[error("self loop on vertex {0}")]
    SelfLoop(VertexId),
    #[error("a cycle or chain needs at least 2 vertices, got {0}")]
    TooShort(usize),
    #[error("vertex {0} appears twice")]
    RepeatedVertex(VertexId),
    #[error("altruist {0} can only root a chain")]
    UnexpectedAltruist(VertexId),
    #[error("chain root {0} is not an altruist")]
    InvalidChainRoot(VertexId),
    #[error("LP ordering covers {expected} cycles but the instance has {actual}")]
    InstanceMismatch { expected: usize, actual: usize },
    #[error("selection is not vertex disjoint: vertex {vertex} used twice")]
    NotDisjoint { vertex: VertexId },
    #[error(transparent)]
    Solver(#[from] SolverError),
}
