//! Canonical atom ordering by partition refinement.
//!
//! Atoms start in cells of equal structural invariants, ordered by those
//! invariants, and iterated neighbourhood comparison splits them further.
//! When refinement stalls with a tied cell left, each atom of that cell is
//! individualised in turn and the search recurses. Atoms that an
//! automorphism of the current partition maps onto each other lead to
//! identical subtrees, so only one per orbit is explored.
//! Every leaf is a discrete ordering; the one whose signature sorts
//! lowest wins.

use std::cmp::Ordering;
use std::fmt;

use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::{debug, instrument, trace};

use crate::bond::BondOrder;
use crate::element;
use crate::invariants::Invariants;
use crate::mol::Mol;
use crate::substruct::{Compat, Plan, SearchMode, Vf2};
use crate::traits::{
    HasAromaticity, HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount, HasIsotope,
};

/// Numbering-independent description of one atom.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct AtomKey {
    atomic_num: u8,
    formal_charge: i8,
    isotope: u16,
    hydrogen_count: u8,
    is_aromatic: bool,
    degree: usize,
    ring_bond_count: usize,
    smallest_ring: usize,
    singles: usize,
    doubles: usize,
    triples: usize,
    quadruples: usize,
    unset: usize,
    aromatic_bonds: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct BondKey {
    order: BondOrder,
    is_aromatic: bool,
}

impl BondKey {
    fn of<B: HasBondOrder + HasAromaticity>(bond: &B) -> Self {
        Self {
            order: bond.bond_order(),
            is_aromatic: bond.is_aromatic(),
        }
    }

    fn symbol(self) -> char {
        if self.is_aromatic {
            return ':';
        }
        match self.order {
            BondOrder::Single => '-',
            BondOrder::Double => '=',
            BondOrder::Triple => '#',
            BondOrder::Quadruple => '$',
            BondOrder::Unset => '~',
        }
    }
}

fn atom_keys<A, B>(mol: &Mol<A, B>, bond_keys: &[BondKey]) -> Vec<AtomKey>
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge + HasAromaticity + HasIsotope,
    B: HasBondOrder,
{
    let invariants = Invariants::compute(mol);
    mol.atoms()
        .map(|idx| {
            let atom = mol.atom(idx);
            let inv = invariants.atom(idx);
            let mut key = AtomKey {
                atomic_num: atom.atomic_num(),
                formal_charge: atom.formal_charge(),
                isotope: atom.isotope(),
                hydrogen_count: atom.hydrogen_count(),
                is_aromatic: atom.is_aromatic(),
                degree: inv.degree,
                ring_bond_count: inv.ring_bond_count,
                smallest_ring: inv.smallest_ring.unwrap_or(0),
                singles: 0,
                doubles: 0,
                triples: 0,
                quadruples: 0,
                unset: 0,
                aromatic_bonds: 0,
            };
            for edge in mol.bonds_of(idx) {
                let bond = bond_keys[edge.index()];
                let slot = if bond.is_aromatic {
                    &mut key.aromatic_bonds
                } else {
                    match bond.order {
                        BondOrder::Single => &mut key.singles,
                        BondOrder::Double => &mut key.doubles,
                        BondOrder::Triple => &mut key.triples,
                        BondOrder::Quadruple => &mut key.quadruples,
                        BondOrder::Unset => &mut key.unset,
                    }
                };
                *slot += 1;
            }
            key
        })
        .collect()
}

/// Dense ranks from sortable keys: atoms with equal keys share the position
/// of the first of them in sorted order.
fn ranks_by<K: Ord>(keys: &[K]) -> Vec<usize> {
    let n = keys.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    let mut ranks = vec![0usize; n];
    for w in 1..n {
        ranks[indices[w]] = if keys[indices[w]] == keys[indices[w - 1]] {
            ranks[indices[w - 1]]
        } else {
            w
        };
    }
    ranks
}

fn count_distinct(ranks: &[usize]) -> usize {
    let mut sorted: Vec<usize> = ranks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

/// Lowest-ranked cell with more than one atom, members in index order.
fn first_tied_cell(ranks: &[usize]) -> Option<Vec<NodeIndex>> {
    let mut counts = vec![0usize; ranks.len()];
    for &r in ranks {
        counts[r] += 1;
    }
    let rank = (0..counts.len()).find(|&r| counts[r] > 1)?;
    Some(
        (0..ranks.len())
            .filter(|&i| ranks[i] == rank)
            .map(NodeIndex::new)
            .collect(),
    )
}

/// Disjoint sets of atoms known to be interchangeable.
#[derive(Debug, Clone)]
struct OrbitSet {
    parent: Vec<usize>,
}

impl OrbitSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx != ry {
            self.parent[ry] = rx;
        }
    }

    fn same_orbit(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }
}

/// Automorphisms of one molecule that preserve a partition and send a given
/// atom to a given image.
struct PartitionCompat<'a> {
    ranks: &'a [usize],
    bond_keys: &'a [BondKey],
    pinned: (NodeIndex, NodeIndex),
}

impl Compat for PartitionCompat<'_> {
    fn atoms(&self, query: NodeIndex, target: NodeIndex) -> bool {
        self.ranks[query.index()] == self.ranks[target.index()]
            && (query != self.pinned.0 || target == self.pinned.1)
    }

    fn bonds(&self, query: EdgeIndex, target: EdgeIndex) -> bool {
        self.bond_keys[query.index()] == self.bond_keys[target.index()]
    }
}

/// Adjacency of a molecule written out in a candidate ordering.
///
/// Signatures compare atom keys position by position, then the sorted bond
/// list, so the lowest one is well defined for every molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature {
    atoms: Vec<AtomKey>,
    bonds: Vec<(usize, usize, BondKey)>,
}

impl Ord for Signature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.atoms
            .cmp(&other.atoms)
            .then_with(|| self.bonds.cmp(&other.bonds))
    }
}

impl PartialOrd for Signature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for atom in &self.atoms {
            f.write_str("[")?;
            if atom.isotope > 0 {
                write!(f, "{}", atom.isotope)?;
            }
            match element::symbol(atom.atomic_num) {
                Some(sym) if atom.is_aromatic => f.write_str(&sym.to_lowercase())?,
                Some(sym) => f.write_str(sym)?,
                None => write!(f, "#{}", atom.atomic_num)?,
            }
            if atom.hydrogen_count > 0 {
                write!(f, "H{}", atom.hydrogen_count)?;
            }
            match atom.formal_charge.cmp(&0) {
                Ordering::Greater => write!(f, "+{}", atom.formal_charge)?,
                Ordering::Less => write!(f, "{}", atom.formal_charge)?,
                Ordering::Equal => {}
            }
            f.write_str("]")?;
        }
        for (i, (a, b, bond)) in self.bonds.iter().enumerate() {
            f.write_str(if i == 0 { "|" } else { "," })?;
            write!(f, "{a}{}{b}", bond.symbol())?;
        }
        Ok(())
    }
}

struct Labeller<'m, A, B> {
    mol: &'m Mol<A, B>,
    bond_keys: Vec<BondKey>,
    best: Option<(Signature, Vec<usize>)>,
    leaves: usize,
}

impl<A, B> Labeller<'_, A, B> {
    /// Splits cells by neighbour ranks and bond types until the number of
    /// cells stops growing. Cells keep their relative order.
    fn refine(&self, ranks: &mut Vec<usize>) {
        let mut prev_distinct = count_distinct(ranks);
        loop {
            let keys: Vec<(usize, Vec<(usize, BondKey)>)> = self
                .mol
                .atoms()
                .map(|node| {
                    let mut around: Vec<(usize, BondKey)> = self
                        .mol
                        .bonds_of(node)
                        .filter_map(|e| {
                            let nb = self.mol.other_atom(e, node)?;
                            Some((ranks[nb.index()], self.bond_keys[e.index()]))
                        })
                        .collect();
                    around.sort_unstable();
                    (ranks[node.index()], around)
                })
                .collect();
            let new_ranks = ranks_by(&keys);
            let distinct = count_distinct(&new_ranks);
            if distinct <= prev_distinct {
                return;
            }
            *ranks = new_ranks;
            prev_distinct = distinct;
        }
    }

    fn automorphism(&self, ranks: &[usize], from: NodeIndex, to: NodeIndex) -> Option<Vec<usize>> {
        let plan = Plan::starting_at(self.mol, Some(from));
        let compat = PartitionCompat {
            ranks,
            bond_keys: &self.bond_keys,
            pinned: (from, to),
        };
        let mapping = Vf2::new(self.mol, self.mol, &plan, compat, SearchMode::Exact).next_mapping()?;
        Some(mapping.into_iter().map(|(_, t)| t.index()).collect())
    }

    /// One atom from each automorphism orbit of `cell`, in index order.
    fn orbit_representatives(&self, ranks: &[usize], cell: &[NodeIndex]) -> Vec<NodeIndex> {
        let mut orbits = OrbitSet::new(ranks.len());
        let mut reps: Vec<NodeIndex> = Vec::new();
        for &v in cell {
            if reps.iter().any(|r| orbits.same_orbit(r.index(), v.index())) {
                continue;
            }
            match reps.iter().find_map(|&r| self.automorphism(ranks, r, v)) {
                Some(sigma) => {
                    trace!(atom = v.index(), "pruned by automorphism");
                    for (i, &image) in sigma.iter().enumerate() {
                        orbits.union(i, image);
                    }
                }
                None => reps.push(v),
            }
        }
        reps
    }

    fn sorted_bonds(&self, positions: &[usize]) -> Vec<(usize, usize, BondKey)> {
        let mut bonds: Vec<(usize, usize, BondKey)> = self
            .mol
            .bonds()
            .filter_map(|e| {
                let (a, b) = self.mol.bond_endpoints(e)?;
                let (pa, pb) = (positions[a.index()], positions[b.index()]);
                Some((pa.min(pb), pa.max(pb), self.bond_keys[e.index()]))
            })
            .collect();
        bonds.sort_unstable();
        bonds
    }

    fn search(&mut self, ranks: Vec<usize>, keys: &[AtomKey]) {
        let Some(cell) = first_tied_cell(&ranks) else {
            self.leaf(ranks, keys);
            return;
        };
        let rank = ranks[cell[0].index()];
        for v in self.orbit_representatives(&ranks, &cell) {
            // v keeps the cell's rank, its cellmates move just behind it
            let mut trial = ranks.clone();
            for &w in &cell {
                if w != v {
                    trial[w.index()] = rank + 1;
                }
            }
            self.refine(&mut trial);
            self.search(trial, keys);
        }
    }

    fn leaf(&mut self, ranks: Vec<usize>, keys: &[AtomKey]) {
        self.leaves += 1;
        let positions = ranks_by(&ranks);
        let mut order: Vec<usize> = (0..positions.len()).collect();
        order.sort_by_key(|&i| positions[i]);
        let candidate = Signature {
            atoms: order.iter().map(|&i| keys[i].clone()).collect(),
            bonds: self.sorted_bonds(&positions),
        };
        let better = self
            .best
            .as_ref()
            .is_none_or(|(best, _)| candidate < *best);
        if better {
            self.best = Some((candidate, positions));
        }
    }
}

fn label<A, B>(mol: &Mol<A, B>) -> Option<(Signature, Vec<usize>)>
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge + HasAromaticity + HasIsotope,
    B: HasBondOrder + HasAromaticity,
{
    let bond_keys: Vec<BondKey> = mol.bonds().map(|e| BondKey::of(mol.bond(e))).collect();
    let keys = atom_keys(mol, &bond_keys);
    let mut labeller = Labeller {
        mol,
        bond_keys,
        best: None,
        leaves: 0,
    };
    let mut ranks = ranks_by(&keys);
    labeller.refine(&mut ranks);
    labeller.search(ranks, &keys);
    debug!(leaves = labeller.leaves, "canonical labelling complete");
    labeller.best
}

/// Canonical rank of every atom: `ranks[atom]` is the atom's position in
/// the canonical order.
///
/// Ranks form a permutation of `0..atom_count`. Molecules that differ only
/// in atom numbering receive orderings under which they become identical,
/// though a symmetric molecule may get any one of its equivalent orderings.
#[instrument(skip_all, fields(atoms = mol.atom_count(), bonds = mol.bond_count()))]
pub fn canonical_ordering<A, B>(mol: &Mol<A, B>) -> Vec<usize>
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge + HasAromaticity + HasIsotope,
    B: HasBondOrder + HasAromaticity,
{
    label(mol).map(|(_, ranks)| ranks).unwrap_or_default()
}

/// The molecule renumbered into canonical order, bonds added sorted by their
/// canonical endpoints.
///
/// Canonical forms are equal exactly when the molecules are isomorphic with
/// every atom property (element, charge, isotope, hydrogen count, aromatic
/// flag) and every bond order and aromatic flag preserved. This is finer
/// than [`is_isomorphic`](crate::is_isomorphic), which compares atoms by
/// element and bonds with the relaxed order matcher.
pub fn canonical_form<A, B>(mol: &Mol<A, B>) -> Mol<A, B>
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge + HasAromaticity + HasIsotope + Clone,
    B: HasBondOrder + HasAromaticity + Clone,
{
    let ranks = canonical_ordering(mol);
    let mut order: Vec<usize> = (0..ranks.len()).collect();
    order.sort_by_key(|&i| ranks[i]);

    let mut out = Mol::new();
    for &old in &order {
        out.add_atom(mol.atom(NodeIndex::new(old)).clone());
    }
    let mut bonds: Vec<(usize, usize, EdgeIndex)> = mol
        .bonds()
        .filter_map(|e| {
            let (a, b) = mol.bond_endpoints(e)?;
            let (ra, rb) = (ranks[a.index()], ranks[b.index()]);
            Some((ra.min(rb), ra.max(rb), e))
        })
        .collect();
    bonds.sort_unstable_by_key(|&(a, b, _)| (a, b));
    for (a, b, e) in bonds {
        out.add_bond(NodeIndex::new(a), NodeIndex::new(b), mol.bond(e).clone());
    }
    out
}

/// Textual canonical signature: bracketed atoms in canonical order followed
/// by the sorted bond list.
pub fn canonical_signature<A, B>(mol: &Mol<A, B>) -> String
where
    A: HasAtomicNum + HasHydrogenCount + HasFormalCharge + HasAromaticity + HasIsotope,
    B: HasBondOrder + HasAromaticity,
{
    label(mol)
        .map(|(signature, _)| signature.to_string())
        .unwrap_or_default()
}
