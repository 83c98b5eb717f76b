//! Per-atom structural invariants, computed once per target graph.
//!
//! The tables live beside the molecule rather than on its atoms, so one
//! `Mol` can serve any number of concurrent searches read-only.

use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::{debug, instrument};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::mol::Mol;
use crate::query::{AtomExpr, BondExpr};
use crate::rings::{smallest_cycle_through, RingInfo};
use crate::traits::{
    AtomLike, BondLike, HasAromaticity, HasAtomicNum, HasBondOrder, HasFormalCharge,
    HasHydrogenCount, HasIsotope,
};

/// Topological features of one atom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AtomInvariants {
    /// Number of explicit neighbours.
    pub degree: usize,
    /// Sum of bond orders plus implicit hydrogens.
    pub valence: usize,
    /// Number of incident bonds that lie on a ring.
    pub ring_bond_count: usize,
    /// Number of SSSR rings containing the atom.
    pub ring_count: usize,
    /// Sorted sizes of the SSSR rings containing the atom.
    pub ring_sizes: Vec<usize>,
    /// Shortest cycle through the atom.
    pub smallest_ring: Option<usize>,
    /// Degree plus implicit hydrogens.
    pub connectivity: usize,
    /// Implicit hydrogens plus explicit hydrogen neighbours.
    pub total_h_count: usize,
}

impl AtomInvariants {
    pub fn in_ring(&self) -> bool {
        self.ring_bond_count > 0
    }
}

/// Side table of [`AtomInvariants`] indexed by atom, plus ring flags per bond.
#[derive(Debug, Clone)]
pub struct Invariants {
    atoms: Vec<AtomInvariants>,
    ring_bonds: Vec<bool>,
    ring_info: RingInfo,
}

impl Invariants {
    #[instrument(skip_all, fields(atoms = mol.atom_count(), bonds = mol.bond_count()))]
    pub fn compute<A, B>(mol: &Mol<A, B>) -> Self
    where
        A: HasAtomicNum + HasHydrogenCount,
        B: HasBondOrder,
    {
        let ring_info = RingInfo::sssr(mol);
        let ring_bonds: Vec<bool> = mol.bonds().map(|b| ring_info.is_ring_bond(b)).collect();

        let atoms = mol
            .atoms()
            .map(|idx| {
                let atom = mol.atom(idx);
                let degree = mol.degree(idx);
                let implicit_h = usize::from(atom.hydrogen_count());
                let bond_orders: usize = mol
                    .bonds_of(idx)
                    .map(|b| usize::from(mol.bond(b).bond_order().numeric()))
                    .sum();
                let explicit_h = mol
                    .neighbors(idx)
                    .filter(|&nb| mol.atom(nb).atomic_num() == 1)
                    .count();
                let ring_bond_count = mol
                    .bonds_of(idx)
                    .filter(|b| ring_bonds[b.index()])
                    .count();
                AtomInvariants {
                    degree,
                    valence: bond_orders + implicit_h,
                    ring_bond_count,
                    ring_count: ring_info.atom_rings(idx).count(),
                    ring_sizes: ring_info.ring_sizes(idx),
                    smallest_ring: if ring_bond_count > 0 {
                        smallest_cycle_through(mol, idx)
                    } else {
                        None
                    },
                    connectivity: degree + implicit_h,
                    total_h_count: implicit_h + explicit_h,
                }
            })
            .collect();

        debug!(rings = ring_info.num_rings(), "computed atom invariants");
        Self {
            atoms,
            ring_bonds,
            ring_info,
        }
    }

    pub fn atom(&self, idx: NodeIndex) -> &AtomInvariants {
        &self.atoms[idx.index()]
    }

    pub fn is_ring_bond(&self, idx: EdgeIndex) -> bool {
        self.ring_bonds[idx.index()]
    }

    pub fn ring_info(&self) -> &RingInfo {
        &self.ring_info
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

/// A target molecule bundled with its invariant tables.
///
/// Borrowing the molecule immutably for the lifetime of the bundle keeps the
/// tables from going stale.
#[derive(Debug, Clone)]
pub struct Target<'a, A = Atom, B = Bond> {
    mol: &'a Mol<A, B>,
    invariants: Invariants,
}

impl<'a, A, B> Target<'a, A, B>
where
    A: HasAtomicNum + HasHydrogenCount,
    B: HasBondOrder,
{
    pub fn new(mol: &'a Mol<A, B>) -> Self {
        Self {
            mol,
            invariants: Invariants::compute(mol),
        }
    }
}

impl<'a, A, B> Target<'a, A, B> {
    pub fn mol(&self) -> &'a Mol<A, B> {
        self.mol
    }

    pub fn invariants(&self) -> &Invariants {
        &self.invariants
    }

    pub fn atom_view(&self, idx: NodeIndex) -> TargetAtom<'_, A> {
        TargetAtom {
            atom: self.mol.atom(idx),
            invariants: self.invariants.atom(idx),
        }
    }

    pub fn bond_view(&self, idx: EdgeIndex) -> TargetBond<'_, B> {
        TargetBond {
            bond: self.mol.bond(idx),
            in_ring: self.invariants.is_ring_bond(idx),
        }
    }
}

/// A target atom seen together with its invariants.
#[derive(Debug, Clone, Copy)]
pub struct TargetAtom<'a, A = Atom> {
    pub atom: &'a A,
    pub invariants: &'a AtomInvariants,
}

/// A target bond seen together with its ring flag.
#[derive(Debug, Clone, Copy)]
pub struct TargetBond<'a, B = Bond> {
    pub bond: &'a B,
    pub in_ring: bool,
}

impl<A: HasAtomicNum> HasAtomicNum for TargetAtom<'_, A> {
    fn atomic_num(&self) -> u8 {
        self.atom.atomic_num()
    }
}

impl<A: HasAromaticity> HasAromaticity for TargetAtom<'_, A> {
    fn is_aromatic(&self) -> bool {
        self.atom.is_aromatic()
    }
}

impl<A: HasFormalCharge> HasFormalCharge for TargetAtom<'_, A> {
    fn formal_charge(&self) -> i8 {
        self.atom.formal_charge()
    }
}

impl<A: HasIsotope> HasIsotope for TargetAtom<'_, A> {
    fn isotope(&self) -> u16 {
        self.atom.isotope()
    }
}

impl<A: HasHydrogenCount> HasHydrogenCount for TargetAtom<'_, A> {
    fn hydrogen_count(&self) -> u8 {
        self.atom.hydrogen_count()
    }
}

impl<A: AtomLike> AtomLike for TargetAtom<'_, A> {
    fn as_query(&self) -> Option<&AtomExpr> {
        self.atom.as_query()
    }

    fn invariants(&self) -> Option<&AtomInvariants> {
        Some(self.invariants)
    }
}

impl<B: HasBondOrder> HasBondOrder for TargetBond<'_, B> {
    fn bond_order(&self) -> BondOrder {
        self.bond.bond_order()
    }
}

impl<B: HasAromaticity> HasAromaticity for TargetBond<'_, B> {
    fn is_aromatic(&self) -> bool {
        self.bond.is_aromatic()
    }
}

impl<B: BondLike> BondLike for TargetBond<'_, B> {
    fn as_query(&self) -> Option<&BondExpr> {
        self.bond.as_query()
    }

    fn is_ring_bond(&self) -> Option<bool> {
        Some(self.in_ring)
    }
}
