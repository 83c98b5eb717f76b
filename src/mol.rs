use std::collections::HashSet;

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::error::GraphError;

/// A molecular graph: atoms of type `A` joined by bonds of type `B`.
///
/// The same container carries both roles used by the matching engine. A
/// target is usually a `Mol<Atom, Bond>`; a query is either a plain molecule
/// or a `Mol<AtomExpr, BondExpr>` built by a pattern-language front end.
pub struct Mol<A, B> {
    graph: UnGraph<A, B>,
}

impl<A, B> Mol<A, B> {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
        }
    }

    /// Builds a molecule from an atom list and `(a, b, bond)` triples,
    /// rejecting dangling endpoints, self loops and duplicate bonds.
    pub fn from_parts(
        atoms: impl IntoIterator<Item = A>,
        bonds: impl IntoIterator<Item = (usize, usize, B)>,
    ) -> Result<Self, GraphError> {
        let mut mol = Self::new();
        for atom in atoms {
            mol.add_atom(atom);
        }
        let atom_count = mol.atom_count();
        let mut seen = HashSet::new();
        for (bond, (a, b, data)) in bonds.into_iter().enumerate() {
            for atom in [a, b] {
                if atom >= atom_count {
                    return Err(GraphError::DanglingBond {
                        bond,
                        atom,
                        atom_count,
                    });
                }
            }
            if a == b {
                return Err(GraphError::SelfLoop { bond, atom: a });
            }
            if !seen.insert((a.min(b), a.max(b))) {
                return Err(GraphError::DuplicateBond { bond, a, b });
            }
            mol.add_bond(NodeIndex::new(a), NodeIndex::new(b), data);
        }
        Ok(mol)
    }

    pub fn graph(&self) -> &UnGraph<A, B> {
        &self.graph
    }

    pub fn atom(&self, idx: NodeIndex) -> &A {
        &self.graph[idx]
    }

    pub fn atom_mut(&mut self, idx: NodeIndex) -> &mut A {
        &mut self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &B {
        &self.graph[idx]
    }

    pub fn bond_mut(&mut self, idx: EdgeIndex) -> &mut B {
        &mut self.graph[idx]
    }

    pub fn add_atom(&mut self, atom: A) -> NodeIndex {
        self.graph.add_node(atom)
    }

    /// Adds a bond between two existing atoms.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is out of range. Use
    /// [`from_parts`](Mol::from_parts) for unvalidated input.
    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: B) -> EdgeIndex {
        self.graph.add_edge(a, b, bond)
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges(idx).count()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn bonds_of(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edges(idx).map(|e| e.id())
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    /// The atom on the other end of `edge` from `atom`.
    pub fn other_atom(&self, edge: EdgeIndex, atom: NodeIndex) -> Option<NodeIndex> {
        let (a, b) = self.bond_endpoints(edge)?;
        Some(if a == atom { b } else { a })
    }
}

impl<A: Clone, B: Clone> Mol<A, B> {
    /// Returns a copy with atoms reordered so that `new_order[new] = old`.
    ///
    /// Bonds are re-added in their original order with endpoints translated.
    pub fn renumber(&self, new_order: &[usize]) -> Result<Self, GraphError> {
        let n = self.atom_count();
        validate_permutation(new_order, n)?;

        let mut new_mol = Mol::new();
        for &old_idx in new_order {
            new_mol.add_atom(self.atom(NodeIndex::new(old_idx)).clone());
        }

        let mut old_to_new = vec![0usize; n];
        for (new_idx, &old_idx) in new_order.iter().enumerate() {
            old_to_new[old_idx] = new_idx;
        }

        for edge in self.graph.edge_references() {
            new_mol.add_bond(
                NodeIndex::new(old_to_new[edge.source().index()]),
                NodeIndex::new(old_to_new[edge.target().index()]),
                edge.weight().clone(),
            );
        }
        Ok(new_mol)
    }
}

fn validate_permutation(order: &[usize], n: usize) -> Result<(), GraphError> {
    if order.len() != n {
        return Err(GraphError::InvalidPermutation {
            atom_count: n,
            reason: format!("expected {n} entries, got {}", order.len()),
        });
    }
    let mut seen = vec![false; n];
    for &idx in order {
        if idx >= n {
            return Err(GraphError::InvalidPermutation {
                atom_count: n,
                reason: format!("index {idx} out of range"),
            });
        }
        if seen[idx] {
            return Err(GraphError::InvalidPermutation {
                atom_count: n,
                reason: format!("index {idx} appears twice"),
            });
        }
        seen[idx] = true;
    }
    Ok(())
}

impl<A: Clone, B: Clone> Clone for Mol<A, B> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
        }
    }
}

impl<A, B> Default for Mol<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: PartialEq, B: PartialEq> PartialEq for Mol<A, B> {
    fn eq(&self, other: &Self) -> bool {
        if self.atom_count() != other.atom_count() || self.bond_count() != other.bond_count() {
            return false;
        }
        if self.atoms().any(|idx| self.atom(idx) != other.atom(idx)) {
            return false;
        }
        self.bonds().all(|idx| {
            self.bond(idx) == other.bond(idx)
                && self.bond_endpoints(idx) == other.bond_endpoints(idx)
        })
    }
}

impl<A: std::fmt::Debug, B: std::fmt::Debug> std::fmt::Debug for Mol<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mol")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .finish()
    }
}
