use crate::error::MatchingError;
use anyhow::{ensure, Result};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

/// Dense vertex identifier, assigned by [`PoolBuilder`] in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub u32);

impl VertexId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BloodType {
    O,
    A,
    B,
    AB,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VertexKind {
    /// Patient with a willing but incompatible donor.
    Pair {
        donor: BloodType,
        patient: BloodType,
        /// raw compatibility between the patient and their own donor
        compatible: bool,
        /// panel reactive antibody style score, carried through for reweighting policies
        sensitization: f64,
    },
    /// Non-directed donor.
    Altruist { donor: BloodType },
}

/// Pool vertex. Equality and ordering only look at the id.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: VertexId,
    pub kind: VertexKind,
}

impl Vertex {
    #[inline]
    pub fn is_altruist(&self) -> bool {
        matches!(self.kind, VertexKind::Altruist { .. })
    }

    pub fn donor_blood_type(&self) -> BloodType {
        match self.kind {
            VertexKind::Pair { donor, .. } | VertexKind::Altruist { donor } => donor,
        }
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vertex {}

impl PartialOrd for Vertex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Vertex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

/// Directed donation `source -> target`.
///
/// Dummy edges run from every pair back to every altruist with zero weight and zero failure
/// probability. They only mark that a chain may stop at its tail and never count as transplants.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub weight: f64,
    pub failure_probability: f64,
    pub dummy: bool,
}

/// Immutable snapshot of a matching round.
#[derive(Debug, Clone)]
pub struct Pool {
    vertices: Vec<Vertex>,
    pairs: Vec<VertexId>,
    altruists: Vec<VertexId>,
    // out_edges[v] sorted by target
    out_edges: Vec<Vec<Edge>>,
}

impl Pool {
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn pairs(&self) -> &[VertexId] {
        &self.pairs
    }

    pub fn altruists(&self) -> &[VertexId] {
        &self.altruists
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    #[inline]
    pub fn is_altruist(&self, id: VertexId) -> bool {
        self.vertices
            .get(id.index())
            .map_or(false, |vertex| vertex.is_altruist())
    }

    #[inline]
    pub fn out_edges(&self, id: VertexId) -> &[Edge] {
        self.out_edges
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edge(&self, source: VertexId, target: VertexId) -> Option<&Edge> {
        let edges = self.out_edges(source);
        edges
            .binary_search_by(|edge| edge.target.cmp(&target))
            .ok()
            .map(|idx| &edges[idx])
    }

    pub fn num_edges(&self) -> usize {
        self.out_edges.iter().map(Vec::len).sum()
    }
}

/// Collects vertices and edges and freezes them into a [`Pool`].
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    vertices: Vec<Vertex>,
    out_edges: Vec<Vec<Edge>>,
    dummy_edges: bool,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            out_edges: Vec::new(),
            dummy_edges: true,
        }
    }

    pub fn with_capacity(vertex_capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_capacity),
            out_edges: Vec::with_capacity(vertex_capacity),
            dummy_edges: true,
        }
    }

    /// Whether `build` inserts the pair -> altruist dummy edges. Enabled by default.
    pub fn dummy_edges(mut self, enabled: bool) -> Self {
        self.dummy_edges = enabled;
        self
    }

    fn push_vertex(&mut self, kind: VertexKind) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex { id, kind });
        self.out_edges.push(Vec::new());
        id
    }

    pub fn add_pair(&mut self, donor: BloodType, patient: BloodType) -> VertexId {
        self.add_pair_with(donor, patient, false, 0.0)
    }

    pub fn add_pair_with(
        &mut self,
        donor: BloodType,
        patient: BloodType,
        compatible: bool,
        sensitization: f64,
    ) -> VertexId {
        self.push_vertex(VertexKind::Pair {
            donor,
            patient,
            compatible,
            sensitization,
        })
    }

    pub fn add_altruist(&mut self, donor: BloodType) -> VertexId {
        self.push_vertex(VertexKind::Altruist { donor })
    }

    pub fn add_edge(
        &mut self,
        source: VertexId,
        target: VertexId,
        weight: f64,
        failure_probability: f64,
    ) -> Result<(), anyhow::Error> {
        ensure!(
            source.index() < self.vertices.len(),
            MatchingError::UnknownVertex(source)
        );
        ensure!(
            target.index() < self.vertices.len(),
            MatchingError::UnknownVertex(target)
        );
        ensure!(source != target, MatchingError::SelfLoop(source));
        ensure!(
            weight.is_finite() && weight >= 0.,
            MatchingError::InvalidWeight(weight)
        );
        ensure!(
            (0.0..=1.0).contains(&failure_probability),
            MatchingError::InvalidProbability(failure_probability)
        );
        ensure!(
            !self.vertices[target.index()].is_altruist(),
            "altruist {} cannot receive a donation",
            target
        );
        let edges = &mut self.out_edges[source.index()];
        ensure!(
            edges.iter().all(|edge| edge.target != target),
            MatchingError::DuplicateEdge(source, target)
        );
        edges.push(Edge {
            source,
            target,
            weight,
            failure_probability,
            dummy: false,
        });
        Ok(())
    }

    pub fn build(mut self) -> Pool {
        let (altruists, pairs): (Vec<VertexId>, Vec<VertexId>) = self
            .vertices
            .iter()
            .map(|vertex| vertex.id)
            .partition(|id| self.vertices[id.index()].is_altruist());

        if self.dummy_edges {
            for &pair in pairs.iter() {
                let edges = &mut self.out_edges[pair.index()];
                edges.extend(altruists.iter().map(|&altruist| Edge {
                    source: pair,
                    target: altruist,
                    weight: 0.,
                    failure_probability: 0.,
                    dummy: true,
                }));
            }
        }
        self.out_edges
            .iter_mut()
            .for_each(|edges| edges.sort_unstable_by_key(|edge| edge.target));

        debug!(
            "pool built: {} pairs, {} altruists",
            pairs.len(),
            altruists.len()
        );
        Pool {
            vertices: self.vertices,
            pairs,
            altruists,
            out_edges: self.out_edges,
        }
    }
}
