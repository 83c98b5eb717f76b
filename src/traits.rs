use crate::bond::BondOrder;
use crate::invariants::AtomInvariants;
use crate::query::{AtomExpr, BondExpr};

pub trait HasAtomicNum {
    fn atomic_num(&self) -> u8;
}

pub trait HasFormalCharge {
    fn formal_charge(&self) -> i8;
}

pub trait HasIsotope {
    fn isotope(&self) -> u16;
}

pub trait HasHydrogenCount {
    fn hydrogen_count(&self) -> u8;
}

pub trait HasAromaticity {
    fn is_aromatic(&self) -> bool;
}

pub trait HasBondOrder {
    fn bond_order(&self) -> BondOrder;
}

/// Anything that can stand on either side of an atom comparison.
///
/// Plain atoms expose only their intrinsic properties. Query atoms also
/// expose their expression through [`as_query`](AtomLike::as_query), and
/// target views built by the search engine expose the precomputed
/// [`AtomInvariants`] of the atom they wrap.
pub trait AtomLike:
    HasAtomicNum + HasAromaticity + HasFormalCharge + HasIsotope + HasHydrogenCount
{
    fn as_query(&self) -> Option<&AtomExpr> {
        None
    }

    fn invariants(&self) -> Option<&AtomInvariants> {
        None
    }
}

/// Bond counterpart of [`AtomLike`].
pub trait BondLike: HasBondOrder + HasAromaticity {
    fn as_query(&self) -> Option<&BondExpr> {
        None
    }

    /// Whether the bond lies on a ring, if the element knows.
    fn is_ring_bond(&self) -> Option<bool> {
        None
    }
}
