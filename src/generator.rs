use crate::cycle::{discounted_chain_weight, is_canonical_rotation, Cycle, Weighting};
use crate::pool::{Edge, Pool, VertexId};
use tracing::{debug, trace};

/// Enumerates every simple cycle of length `2..=cycle_cap` and every altruist-rooted chain of
/// length `1..=chain_cap` in a pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleGenerator {
    cycle_cap: usize,
    chain_cap: usize,
    weighting: Weighting,
}

impl CycleGenerator {
    pub fn new(cycle_cap: usize, chain_cap: usize, weighting: Weighting) -> Self {
        Self {
            cycle_cap,
            chain_cap,
            weighting,
        }
    }

    pub fn generate(&self, pool: &Pool) -> Vec<Cycle> {
        let mut out = self.generate_cycles(pool);
        let num_cycles = out.len();
        out.extend(self.generate_chains(pool));
        debug!(
            "generated {} cycles (cap {}) and {} chains (cap {})",
            num_cycles,
            self.cycle_cap,
            out.len() - num_cycles,
            self.chain_cap
        );
        out
    }

    pub fn generate_cycles(&self, pool: &Pool) -> Vec<Cycle> {
        let mut out = Vec::new();
        if self.cycle_cap < 2 {
            return out;
        }
        let mut search = Search::new(pool, &mut out);
        for &start in pool.pairs() {
            search.enter(start, None);
            search.extend_cycle(start, start, self.cycle_cap, 0.);
            search.leave();
        }
        out
    }

    pub fn generate_chains(&self, pool: &Pool) -> Vec<Cycle> {
        let mut out = Vec::new();
        if self.chain_cap < 1 {
            return out;
        }
        let mut search = Search::new(pool, &mut out);
        for &altruist in pool.altruists() {
            search.enter(altruist, None);
            search.extend_chain(altruist, altruist, self.chain_cap, self.weighting);
            search.leave();
        }
        out
    }
}

/// Depth-first search state shared by the cycle and chain enumerations.
struct Search<'p, 'o> {
    pool: &'p Pool,
    path: Vec<VertexId>,
    // edges[i] leads into path[i + 1]
    edges: Vec<&'p Edge>,
    on_path: Vec<bool>,
    out: &'o mut Vec<Cycle>,
}

impl<'p, 'o> Search<'p, 'o> {
    fn new(pool: &'p Pool, out: &'o mut Vec<Cycle>) -> Self {
        Self {
            pool,
            path: Vec::new(),
            edges: Vec::new(),
            on_path: vec![false; pool.num_vertices()],
            out,
        }
    }

    #[inline]
    fn enter(&mut self, vertex: VertexId, via: Option<&'p Edge>) {
        self.path.push(vertex);
        self.edges.extend(via);
        self.on_path[vertex.index()] = true;
    }

    #[inline]
    fn leave(&mut self) {
        if let Some(vertex) = self.path.pop() {
            self.on_path[vertex.index()] = false;
        }
        self.edges.truncate(self.path.len().saturating_sub(1));
    }

    fn extend_cycle(&mut self, start: VertexId, tail: VertexId, cap: usize, weight: f64) {
        let pool = self.pool;
        for edge in pool.out_edges(tail) {
            if edge.dummy {
                continue;
            }
            let next = edge.target;
            if next == start {
                if self.path.len() >= 2 && is_canonical_rotation(&self.path) {
                    trace!("cycle {:?}", self.path);
                    self.out
                        .push(Cycle::closed(self.path.clone(), weight + edge.weight));
                }
            } else if next > start
                && self.path.len() < cap
                && !self.on_path[next.index()]
                && !pool.is_altruist(next)
            {
                self.enter(next, Some(edge));
                self.extend_cycle(start, next, cap, weight + edge.weight);
                self.leave();
            }
        }
    }

    fn extend_chain(&mut self, origin: VertexId, tail: VertexId, cap: usize, weighting: Weighting) {
        let pool = self.pool;
        let under_cap = self.edges.len() < cap;
        let successors: Vec<&'p Edge> = if under_cap {
            pool.out_edges(tail)
                .iter()
                .filter(|edge| {
                    !edge.dummy
                        && !self.on_path[edge.target.index()]
                        && !pool.is_altruist(edge.target)
                })
                .collect()
        } else {
            Vec::new()
        };

        if !self.edges.is_empty() {
            let closing = pool.edge(tail, origin);
            if closing.is_some() || successors.is_empty() {
                self.emit_chain(closing, weighting);
            }
        }

        for edge in successors {
            self.enter(edge.target, Some(edge));
            self.extend_chain(origin, edge.target, cap, weighting);
            self.leave();
        }
    }

    fn emit_chain(&mut self, closing: Option<&'p Edge>, weighting: Weighting) {
        let weight = match weighting {
            Weighting::Raw => self.edges.iter().map(|edge| edge.weight).sum(),
            Weighting::FailureDiscounted => {
                discounted_chain_weight(self.edges.iter().copied(), closing)
            }
        };
        trace!("chain {:?} weight {}", self.path, weight);
        self.out.push(Cycle::chain(self.path.clone(), weight));
    }
}
