use crate::cycle::Cycle;
use crate::error::SolverError;
use crate::membership::PackingInstance;
use crate::solution::Solution;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Session with an exact integer/linear programming backend.
///
/// A session is never shared: concurrent callers each open their own through a
/// [`SolverFactory`].
pub trait ExactSolver {
    /// Optimal disjoint selection over the instance cycles.
    fn solve(
        &mut self,
        instance: &PackingInstance<'_>,
        time_limit: Option<Duration>,
    ) -> Result<Solution, SolverError>;

    /// Per-cycle values of the LP relaxation, indexed like `instance.cycles()`.
    fn relax(
        &mut self,
        instance: &PackingInstance<'_>,
        time_limit: Option<Duration>,
    ) -> Result<Vec<f64>, SolverError>;
}

/// Hands out independent solver sessions.
pub trait SolverFactory: Sync {
    type Session: ExactSolver;

    fn open_session(&self) -> Result<Self::Session, SolverError>;
}

/// Exhaustive branch and bound over the cycle list.
///
/// Only meant for small instances: it serves as a reference oracle and upper bound. The
/// relaxation it reports is the indicator vector of an integral optimum, which is a vertex of the
/// LP polytope and therefore a valid ordering signal.
#[derive(Debug, Clone)]
pub struct BranchAndBound {
    max_nodes: u64,
    pub nodes: u64,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self::new(Self::MAX_NODES)
    }
}

impl BranchAndBound {
    const MAX_NODES: u64 = 10_000_000;

    pub const fn new(max_nodes: u64) -> Self {
        Self {
            max_nodes,
            nodes: 0,
        }
    }

    fn search(
        &mut self,
        instance: &PackingInstance<'_>,
        time_limit: Option<Duration>,
    ) -> Result<Vec<usize>, SolverError> {
        let cycles = instance.cycles();
        let deadline = time_limit.map(|limit| Instant::now() + limit);
        let mut order: Vec<usize> = (0..cycles.len()).collect();
        order.sort_by(|&a, &b| cycles[b].weight().total_cmp(&cycles[a].weight()));
        // suffix[i]: total weight of order[i..]
        let mut suffix = vec![0.; order.len() + 1];
        for i in (0..order.len()).rev() {
            suffix[i] = suffix[i + 1] + cycles[order[i]].weight();
        }

        let mut state = SearchState {
            claimed: vec![false; instance.pool().num_vertices()],
            current: Vec::new(),
            best: Vec::new(),
            best_value: 0.,
        };
        self.nodes = 0;
        self.branch(cycles, &order, &suffix, &mut state, deadline)?;
        debug!(
            "branch and bound explored {} nodes, optimum {}",
            self.nodes, state.best_value
        );
        Ok(state.best)
    }

    fn branch(
        &mut self,
        cycles: &[Cycle],
        order: &[usize],
        suffix: &[f64],
        state: &mut SearchState,
        deadline: Option<Instant>,
    ) -> Result<(), SolverError> {
        // explicit stack: depth is bounded by the cycle count, which can be large
        let mut stack = vec![Step::Enter {
            depth: 0,
            value: 0.,
        }];
        while let Some(step) = stack.pop() {
            let (depth, value) = match step {
                Step::Enter { depth, value } => (depth, value),
                Step::Release(position) => {
                    state.current.pop();
                    cycles[position]
                        .vertices()
                        .iter()
                        .for_each(|v| state.claimed[v.index()] = false);
                    continue;
                }
            };
            self.nodes += 1;
            if self.nodes > self.max_nodes {
                return Err(SolverError::TimeLimit);
            }
            if let Some(deadline) = deadline {
                if self.nodes % 1024 == 0 && Instant::now() > deadline {
                    return Err(SolverError::TimeLimit);
                }
            }
            if value > state.best_value {
                trace!("incumbent {}", value);
                state.best_value = value;
                state.best = state.current.clone();
            }
            if depth == order.len() || value + suffix[depth] <= state.best_value {
                continue;
            }

            let position = order[depth];
            let cycle = &cycles[position];
            // popped last: the branch without this cycle
            stack.push(Step::Enter {
                depth: depth + 1,
                value,
            });
            if cycle.vertices().iter().all(|v| !state.claimed[v.index()]) {
                cycle
                    .vertices()
                    .iter()
                    .for_each(|v| state.claimed[v.index()] = true);
                state.current.push(position);
                stack.push(Step::Release(position));
                stack.push(Step::Enter {
                    depth: depth + 1,
                    value: value + cycle.weight(),
                });
            }
        }
        Ok(())
    }
}

enum Step {
    Enter { depth: usize, value: f64 },
    // undo the claim taken when entering the branch with this cycle
    Release(usize),
}

struct SearchState {
    claimed: Vec<bool>,
    current: Vec<usize>,
    best: Vec<usize>,
    best_value: f64,
}

impl ExactSolver for BranchAndBound {
    fn solve(
        &mut self,
        instance: &PackingInstance<'_>,
        time_limit: Option<Duration>,
    ) -> Result<Solution, SolverError> {
        let start = Instant::now();
        let selected = self.search(instance, time_limit)?;
        let cycles = selected
            .into_iter()
            .map(|position| instance.cycles()[position].clone())
            .collect();
        Ok(Solution::new(cycles, start.elapsed()))
    }

    fn relax(
        &mut self,
        instance: &PackingInstance<'_>,
        time_limit: Option<Duration>,
    ) -> Result<Vec<f64>, SolverError> {
        let selected = self.search(instance, time_limit)?;
        let mut values = vec![0.; instance.cycles().len()];
        selected
            .into_iter()
            .for_each(|position| values[position] = 1.);
        Ok(values)
    }
}

impl SolverFactory for BranchAndBound {
    type Session = BranchAndBound;

    fn open_session(&self) -> Result<Self::Session, SolverError> {
        Ok(BranchAndBound::new(self.max_nodes))
    }
}
