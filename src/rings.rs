use std::collections::VecDeque;

use petgraph::algo::connected_components;
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::mol::Mol;

/// Ring perception result: the smallest set of smallest rings plus a
/// per-bond ring flag.
///
/// Rings are stored as atom cycles normalised to start at their lowest atom
/// index, walking towards the smaller neighbour.
#[derive(Debug, Clone)]
pub struct RingInfo {
    rings: Vec<Vec<NodeIndex>>,
    ring_bonds: Vec<bool>,
}

impl RingInfo {
    /// Perceives the SSSR using Horton candidate cycles filtered for
    /// independence over GF(2).
    pub fn sssr<A, B>(mol: &Mol<A, B>) -> Self {
        let num_expected = Self::expected_ring_count(mol);
        let mut ring_bonds = vec![false; mol.bond_count()];
        if num_expected == 0 {
            return Self {
                rings: vec![],
                ring_bonds,
            };
        }

        let mut basis = CycleBasis::new(mol.bond_count());
        let mut rings = Vec::with_capacity(num_expected);
        for ring in horton_candidates(mol) {
            if rings.len() >= num_expected {
                break;
            }
            let edges = ring_edges(&ring, mol);
            if basis.insert(&edges) {
                for e in edges {
                    ring_bonds[e.index()] = true;
                }
                rings.push(normalize_ring(&ring));
            }
        }
        rings.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        Self { rings, ring_bonds }
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }

    pub fn is_ring_atom(&self, atom: NodeIndex) -> bool {
        self.rings.iter().any(|ring| ring.contains(&atom))
    }

    pub fn is_ring_bond(&self, bond: EdgeIndex) -> bool {
        self.ring_bonds.get(bond.index()).copied().unwrap_or(false)
    }

    pub fn atom_rings(&self, atom: NodeIndex) -> impl Iterator<Item = &Vec<NodeIndex>> + '_ {
        self.rings.iter().filter(move |ring| ring.contains(&atom))
    }

    /// Sorted, de-duplicated sizes of the SSSR rings containing `atom`.
    pub fn ring_sizes(&self, atom: NodeIndex) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.atom_rings(atom).map(|r| r.len()).collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    /// Cyclomatic number: `E - V + C`.
    pub fn expected_ring_count<A, B>(mol: &Mol<A, B>) -> usize {
        let v = mol.atom_count();
        let e = mol.bond_count();
        let c = connected_components(mol.graph());
        (e + c).saturating_sub(v)
    }
}

/// Length of the shortest cycle passing through `root`, if any.
///
/// Unlike an SSSR ring size this never depends on which of several equally
/// small rings a perception run happened to keep, so it is safe to use as a
/// numbering-independent invariant.
pub fn smallest_cycle_through<A, B>(mol: &Mol<A, B>, root: NodeIndex) -> Option<usize> {
    let n = mol.atom_count();
    let mut dist = vec![u32::MAX; n];
    let mut branch = vec![usize::MAX; n];
    dist[root.index()] = 0;

    let mut queue = VecDeque::new();
    for nb in mol.neighbors(root) {
        if dist[nb.index()] == u32::MAX {
            dist[nb.index()] = 1;
            branch[nb.index()] = nb.index();
            queue.push_back(nb);
        }
    }

    let mut best: Option<usize> = None;
    while let Some(cur) = queue.pop_front() {
        let d = dist[cur.index()];
        if best.is_some_and(|b| 2 * d as usize + 1 >= b) {
            break;
        }
        for nb in mol.neighbors(cur) {
            if nb == root {
                continue;
            }
            if dist[nb.index()] == u32::MAX {
                dist[nb.index()] = d + 1;
                branch[nb.index()] = branch[cur.index()];
                queue.push_back(nb);
            } else if branch[nb.index()] != branch[cur.index()] {
                let len = (d + dist[nb.index()] + 1) as usize;
                if best.is_none_or(|b| len < b) {
                    best = Some(len);
                }
            }
        }
    }
    best
}

/// Incremental GF(2) row-echelon basis over bond-incidence bit vectors.
struct CycleBasis {
    words: usize,
    rows: Vec<Vec<u64>>,
}

impl CycleBasis {
    fn new(num_edges: usize) -> Self {
        Self {
            words: num_edges.div_ceil(64),
            rows: Vec::new(),
        }
    }

    /// Adds the cycle if it is independent of the rows already present.
    fn insert(&mut self, edges: &[EdgeIndex]) -> bool {
        let mut v = vec![0u64; self.words];
        for e in edges {
            let i = e.index();
            v[i / 64] ^= 1u64 << (i % 64);
        }
        for row in &self.rows {
            if let Some(p) = leading_bit(row) {
                if v[p / 64] & (1u64 << (p % 64)) != 0 {
                    for (a, b) in v.iter_mut().zip(row) {
                        *a ^= *b;
                    }
                }
            }
        }
        if v.iter().all(|&w| w == 0) {
            return false;
        }
        self.rows.push(v);
        true
    }
}

fn leading_bit(bv: &[u64]) -> Option<usize> {
    bv.iter()
        .enumerate()
        .find(|(_, w)| **w != 0)
        .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
}

fn horton_candidates<A, B>(mol: &Mol<A, B>) -> Vec<Vec<NodeIndex>> {
    let n = mol.atom_count();
    let trees: Vec<BfsTree> = (0..n).map(|i| BfsTree::new(mol, NodeIndex::new(i))).collect();

    let mut candidates: Vec<Vec<NodeIndex>> = Vec::new();
    for edge in mol.bonds() {
        let Some((u, v)) = mol.bond_endpoints(edge) else {
            continue;
        };
        for tree in &trees {
            let (Some(path_u), Some(path_v)) = (tree.path_to(u), tree.path_to(v)) else {
                continue;
            };
            if path_u.len() + path_v.len() - 1 < 3 {
                continue;
            }
            if path_u[1..].iter().any(|x| path_v[1..].contains(x)) {
                continue;
            }
            let mut ring = path_u;
            ring.extend(path_v[1..].iter().rev());
            candidates.push(ring);
        }
    }

    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    candidates.dedup();
    candidates
}

/// Shortest-path tree rooted at one atom.
struct BfsTree {
    root: NodeIndex,
    pred: Vec<Option<NodeIndex>>,
    reached: Vec<bool>,
}

impl BfsTree {
    fn new<A, B>(mol: &Mol<A, B>, root: NodeIndex) -> Self {
        let n = mol.atom_count();
        let mut pred = vec![None; n];
        let mut reached = vec![false; n];
        reached[root.index()] = true;
        let mut queue = VecDeque::from([root]);
        while let Some(cur) = queue.pop_front() {
            for nb in mol.neighbors(cur) {
                if !reached[nb.index()] {
                    reached[nb.index()] = true;
                    pred[nb.index()] = Some(cur);
                    queue.push_back(nb);
                }
            }
        }
        Self {
            root,
            pred,
            reached,
        }
    }

    /// Path from the root to `dst`, both inclusive.
    fn path_to(&self, dst: NodeIndex) -> Option<Vec<NodeIndex>> {
        if !self.reached[dst.index()] {
            return None;
        }
        let mut path = vec![dst];
        let mut cur = dst;
        while cur != self.root {
            cur = self.pred[cur.index()]?;
            path.push(cur);
        }
        path.reverse();
        Some(path)
    }
}

fn ring_edges<A, B>(ring: &[NodeIndex], mol: &Mol<A, B>) -> Vec<EdgeIndex> {
    let len = ring.len();
    (0..len)
        .filter_map(|i| mol.bond_between(ring[i], ring[(i + 1) % len]))
        .collect()
}

fn normalize_ring(ring: &[NodeIndex]) -> Vec<NodeIndex> {
    let Some(min_pos) = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, idx)| idx)
        .map(|(i, _)| i)
    else {
        return vec![];
    };

    let len = ring.len();
    let mut normalized: Vec<NodeIndex> = (0..len).map(|i| ring[(min_pos + i) % len]).collect();
    if len > 2 && normalized[1] > normalized[len - 1] {
        normalized[1..].reverse();
    }
    normalized
}
