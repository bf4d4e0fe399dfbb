use crate::error::MatchingError;
use crate::pool::{Edge, Pool, VertexId};
use anyhow::{anyhow, ensure, Result};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleKind {
    /// Closed exchange among pairs, executed atomically.
    Cycle,
    /// Altruist-rooted path, executed edge by edge.
    Chain,
}

/// How chain weights are computed. Cycles always use the raw sum since they are all-or-nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    Raw,
    FailureDiscounted,
}

impl Default for Weighting {
    fn default() -> Self {
        Weighting::Raw
    }
}

///
/// A cycle or a chain of donations
///
/// For a cycle `vertices` lists the pairs in donation order, the last one donating back to the
/// first. For a chain `vertices[0]` is the altruist and the dummy closing edge is not stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    kind: CycleKind,
    vertices: Vec<VertexId>,
    weight: f64,
}

impl Cycle {
    pub(crate) fn closed(vertices: Vec<VertexId>, weight: f64) -> Self {
        debug_assert!(vertices.len() >= 2);
        Cycle {
            kind: CycleKind::Cycle,
            vertices,
            weight,
        }
    }

    pub(crate) fn chain(vertices: Vec<VertexId>, weight: f64) -> Self {
        debug_assert!(vertices.len() >= 2);
        Cycle {
            kind: CycleKind::Chain,
            vertices,
            weight,
        }
    }

    /// Builds a closed cycle over `vertices`, checking every donation exists in `pool`.
    ///
    /// Every vertex must be a distinct pair and the cycle needs at least two of them.
    pub fn from_cycle(pool: &Pool, vertices: Vec<VertexId>) -> Result<Self, anyhow::Error> {
        ensure!(vertices.len() >= 2, MatchingError::TooShort(vertices.len()));
        check_pairs(pool, &vertices)?;
        let weight = cycle_edges(&vertices)
            .map(|(source, target)| lookup(pool, source, target).map(|edge| edge.weight))
            .sum::<Result<f64>>()?;
        Ok(Self::closed(vertices, weight))
    }

    /// Builds a chain rooted at `vertices[0]`, checking every donation exists in `pool`.
    ///
    /// The root must be an altruist followed by at least one distinct pair.
    pub fn from_chain(
        pool: &Pool,
        vertices: Vec<VertexId>,
        weighting: Weighting,
    ) -> Result<Self, anyhow::Error> {
        ensure!(vertices.len() >= 2, MatchingError::TooShort(vertices.len()));
        let root = vertices[0];
        ensure!(
            pool.vertex(root).is_some(),
            MatchingError::UnknownVertex(root)
        );
        ensure!(
            pool.is_altruist(root),
            MatchingError::InvalidChainRoot(root)
        );
        check_pairs(pool, &vertices[1..])?;
        let edges = chain_edges(&vertices)
            .map(|(source, target)| lookup(pool, source, target))
            .collect::<Result<Vec<_>>>()?;
        let weight = match weighting {
            Weighting::Raw => edges.iter().map(|edge| edge.weight).sum(),
            Weighting::FailureDiscounted => {
                let closing = vertices
                    .last()
                    .and_then(|&tail| pool.edge(tail, vertices[0]));
                discounted_chain_weight(edges.iter().copied(), closing)
            }
        };
        Ok(Self::chain(vertices, weight))
    }

    #[inline]
    pub fn kind(&self) -> CycleKind {
        self.kind
    }

    #[inline]
    pub fn is_chain(&self) -> bool {
        self.kind == CycleKind::Chain
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    /// Number of transplants: the cycle length, or the number of edges in a chain.
    pub fn len(&self) -> usize {
        match self.kind {
            CycleKind::Cycle => self.vertices.len(),
            CycleKind::Chain => self.vertices.len() - 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Constituent donations in execution order.
    pub fn edges(&self) -> Box<dyn Iterator<Item = (VertexId, VertexId)> + '_> {
        match self.kind {
            CycleKind::Cycle => Box::new(cycle_edges(&self.vertices)),
            CycleKind::Chain => Box::new(chain_edges(&self.vertices)),
        }
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    pub fn shares_vertex(&self, other: &Cycle) -> bool {
        self.vertices.iter().any(|&v| other.contains(v))
    }
}

// pairs only, each once
fn check_pairs(pool: &Pool, vertices: &[VertexId]) -> Result<()> {
    let mut seen = HashSet::with_capacity(vertices.len());
    for &vertex in vertices {
        ensure!(
            pool.vertex(vertex).is_some(),
            MatchingError::UnknownVertex(vertex)
        );
        ensure!(
            !pool.is_altruist(vertex),
            MatchingError::UnexpectedAltruist(vertex)
        );
        ensure!(seen.insert(vertex), MatchingError::RepeatedVertex(vertex));
    }
    Ok(())
}

// dummy edges never count as donations
fn lookup(pool: &Pool, source: VertexId, target: VertexId) -> Result<&Edge> {
    pool.edge(source, target)
        .filter(|edge| !edge.dummy)
        .ok_or_else(|| anyhow!("pool has no edge {} -> {}", source, target))
}

fn cycle_edges(vertices: &[VertexId]) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
    vertices
        .iter()
        .zip(vertices.iter().cycle().skip(1))
        .map(|(&source, &target)| (source, target))
}

fn chain_edges(vertices: &[VertexId]) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
    vertices
        .windows(2)
        .map(|window| (window[0], window[1]))
}

/// True when `vertices` starts at its numerically smallest id.
///
/// Each simple cycle has exactly one rotation satisfying this, so the generator keeps a closed
/// walk only when it was discovered from that rotation.
#[inline]
pub fn is_canonical_rotation(vertices: &[VertexId]) -> bool {
    match vertices.split_first() {
        Some((first, rest)) => rest.iter().all(|v| v > first),
        None => false,
    }
}

/// Expected number of realized transplants for a chain executed edge by edge.
///
/// A failure on edge i keeps the weight banked by edges before it. `closing` is the edge from the
/// chain tail back to its altruist. Without it the chain never completes and the weight banked
/// by the final edge is not credited.
pub fn discounted_chain_weight<'e, I>(edges: I, closing: Option<&'e Edge>) -> f64
where
    I: IntoIterator<Item = &'e Edge>,
{
    let mut total = 0.;
    let mut success = 1.;
    let mut banked = 0.;
    for edge in edges.into_iter().chain(closing) {
        total += success * edge.failure_probability * banked;
        success *= 1. - edge.failure_probability;
        banked += edge.weight;
    }
    if closing.is_some() {
        total += success * banked;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::{discounted_chain_weight, is_canonical_rotation, Cycle, CycleKind, Weighting};
    use crate::error::MatchingError;
    use crate::pool::{BloodType, Edge, PoolBuilder, VertexId};

    const EPS: f64 = 1e-9;

    fn ids(raw: &[u32]) -> Vec<VertexId> {
        raw.iter().map(|&i| VertexId(i)).collect()
    }

    fn unit_edge(source: u32, target: u32, failure_probability: f64) -> Edge {
        Edge {
            source: VertexId(source),
            target: VertexId(target),
            weight: 1.,
            failure_probability,
            dummy: false,
        }
    }

    fn dummy_edge(source: u32, target: u32) -> Edge {
        Edge {
            source: VertexId(source),
            target: VertexId(target),
            weight: 0.,
            failure_probability: 0.,
            dummy: true,
        }
    }

    #[test]
    fn test_canonical_rotation() {
        assert!(is_canonical_rotation(&ids(&[1, 5, 3])));
        assert!(!is_canonical_rotation(&ids(&[5, 3, 1])));
        assert!(!is_canonical_rotation(&ids(&[3, 1, 5])));
        assert!(is_canonical_rotation(&ids(&[0, 1])));
        assert!(!is_canonical_rotation(&ids(&[1, 0])));
        assert!(!is_canonical_rotation(&ids(&[2, 2])));
        assert!(!is_canonical_rotation(&[]));
        // exactly one rotation of each cycle passes
        let cycle = ids(&[4, 7, 2, 9]);
        let passing = (0..cycle.len())
            .filter(|&shift| {
                let mut rotated = cycle.clone();
                rotated.rotate_left(shift);
                is_canonical_rotation(&rotated)
            })
            .count();
        assert_eq!(passing, 1);
    }

    // Chains of n edges counting the dummy closing edge, success probability 0.3 per real edge.
    #[test]
    fn test_discounted_chain_reference_values() {
        let f = 0.7;
        let two = [unit_edge(0, 1, f)];
        let closing = dummy_edge(1, 0);
        let weight = discounted_chain_weight(two.iter(), Some(&closing));
        assert!((weight - 0.3).abs() < EPS, "{}", weight);

        let three = [unit_edge(0, 1, f), unit_edge(1, 2, f)];
        let closing = dummy_edge(2, 0);
        let weight = discounted_chain_weight(three.iter(), Some(&closing));
        assert!((weight - (0.3 * 0.7 + 2. * 0.3 * 0.3)).abs() < EPS, "{}", weight);

        let four = [unit_edge(0, 1, f), unit_edge(1, 2, f), unit_edge(2, 3, f)];
        let closing = dummy_edge(3, 0);
        let weight = discounted_chain_weight(four.iter(), Some(&closing));
        let expected = 0.3 * 0.7 + 2. * 0.3 * 0.3 * 0.7 + 3. * 0.3 * 0.3 * 0.3;
        assert!((weight - expected).abs() < EPS, "{}", weight);
        assert!((weight - 0.417).abs() < 1e-3);
    }

    #[test]
    fn test_discounted_without_failures_is_raw() {
        let edges = [unit_edge(0, 1, 0.), unit_edge(1, 2, 0.), unit_edge(2, 3, 0.)];
        let closing = dummy_edge(3, 0);
        let weight = discounted_chain_weight(edges.iter(), Some(&closing));
        assert!((weight - 3.).abs() < EPS);
    }

    #[test]
    fn test_discounted_without_closing_edge_drops_completion() {
        let edges = [unit_edge(0, 1, 0.), unit_edge(1, 2, 0.)];
        assert_eq!(discounted_chain_weight(edges.iter(), None), 0.);
    }

    #[test]
    fn test_cycle_and_chain_from_pool() {
        let mut builder = PoolBuilder::new();
        let a = builder.add_altruist(BloodType::O);
        let p = builder.add_pair(BloodType::A, BloodType::O);
        let q = builder.add_pair(BloodType::O, BloodType::A);
        builder.add_edge(a, p, 2., 0.5).unwrap();
        builder.add_edge(p, q, 3., 0.5).unwrap();
        builder.add_edge(q, p, 4., 0.5).unwrap();
        let pool = builder.build();

        let cycle = Cycle::from_cycle(&pool, vec![p, q]).unwrap();
        assert_eq!(cycle.kind(), CycleKind::Cycle);
        assert_eq!(cycle.len(), 2);
        assert_eq!(cycle.weight(), 7.);
        assert_eq!(cycle.edges().collect::<Vec<_>>(), [(p, q), (q, p)]);

        let chain = Cycle::from_chain(&pool, vec![a, p, q], Weighting::Raw).unwrap();
        assert!(chain.is_chain());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.weight(), 5.);
        assert_eq!(chain.edges().collect::<Vec<_>>(), [(a, p), (p, q)]);

        // 0.5 * 0.5 * 2 for failing on the second edge plus 0.25 * 5 for completing
        let discounted =
            Cycle::from_chain(&pool, vec![a, p, q], Weighting::FailureDiscounted).unwrap();
        assert!((discounted.weight() - 1.75).abs() < EPS);

        assert!(cycle.shares_vertex(&chain));
    }

    #[test]
    fn test_constructors_reject_malformed() {
        let mut builder = PoolBuilder::new();
        let a = builder.add_altruist(BloodType::O);
        let p = builder.add_pair(BloodType::A, BloodType::O);
        let q = builder.add_pair(BloodType::O, BloodType::A);
        builder.add_edge(a, p, 2., 0.).unwrap();
        builder.add_edge(p, q, 3., 0.).unwrap();
        builder.add_edge(q, p, 4., 0.).unwrap();
        let pool = builder.build();
        let reason = |result: anyhow::Result<Cycle>| {
            result
                .unwrap_err()
                .downcast_ref::<MatchingError>()
                .cloned()
        };

        // a -> p exists and p -> a is the dummy edge
        assert_eq!(
            reason(Cycle::from_cycle(&pool, vec![a, p])),
            Some(MatchingError::UnexpectedAltruist(a))
        );
        assert_eq!(
            reason(Cycle::from_cycle(&pool, vec![p, q, p])),
            Some(MatchingError::RepeatedVertex(p))
        );
        assert_eq!(
            reason(Cycle::from_cycle(&pool, vec![p])),
            Some(MatchingError::TooShort(1))
        );
        assert_eq!(
            reason(Cycle::from_cycle(&pool, vec![p, VertexId(7)])),
            Some(MatchingError::UnknownVertex(VertexId(7)))
        );

        assert_eq!(
            reason(Cycle::from_chain(&pool, vec![p, q, p], Weighting::Raw)),
            Some(MatchingError::InvalidChainRoot(p))
        );
        assert_eq!(
            reason(Cycle::from_chain(&pool, vec![a, p, q, p], Weighting::Raw)),
            Some(MatchingError::RepeatedVertex(p))
        );
        assert_eq!(
            reason(Cycle::from_chain(&pool, vec![a], Weighting::Raw)),
            Some(MatchingError::TooShort(1))
        );
        // no donation a -> q
        assert!(Cycle::from_chain(&pool, vec![a, q], Weighting::Raw).is_err());
    }
}
