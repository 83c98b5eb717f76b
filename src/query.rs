use crate::bond::BondOrder;
use crate::error::{MatchError, Result};
use crate::invariants::AtomInvariants;
use crate::matcher::ring_membership_matches;
use crate::traits::{
    AtomLike, BondLike, HasAromaticity, HasAtomicNum, HasBondOrder, HasFormalCharge,
    HasHydrogenCount, HasIsotope,
};

/// Query expression attached to a query-graph atom.
///
/// A pattern-language front end produces these; during search the engine
/// evaluates the tree against a target atom through [`AtomExpr::matches`].
/// Primitives that read topology (ring counts, degree) consult the target's
/// [`AtomInvariants`] and fail with [`MatchError::MissingInvariants`] when the
/// target element does not carry them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AtomExpr {
    /// Matches any atom.
    True,
    /// Matches by element. `aromatic` is `None` for either, `Some(true)` for
    /// aromatic only, `Some(false)` for aliphatic only.
    Element { atomic_num: u8, aromatic: Option<bool> },
    /// Matches any aromatic atom.
    Aromatic,
    /// Matches any aliphatic atom.
    Aliphatic,
    /// Matches formal charge.
    Charge(i8),
    /// Matches a specific mass number.
    Isotope(u16),
    /// Matches the number of explicit neighbours.
    Degree(u8),
    /// Matches bond order sum plus implicit hydrogens.
    Valence(u8),
    /// Matches degree plus implicit hydrogens.
    Connectivity(u8),
    /// Matches implicit plus explicit hydrogen count.
    TotalHCount(u8),
    /// Matches the implicit hydrogen count only.
    ImplicitHCount(u8),
    /// Ring membership by ring-bond count; see [`AtomMatcher::RingMembership`](crate::AtomMatcher::RingMembership).
    RingMembership(i32),
    /// Matches the number of SSSR rings containing the atom.
    RingCount(u8),
    /// Matches the number of incident ring bonds.
    RingBondCount(u8),
    /// Matches atoms in at least one SSSR ring of the given size.
    RingSize(u8),
    /// Matches the size of the smallest ring through the atom, `0` for none.
    SmallestRingSize(u8),
    /// Matches atoms on at least one ring.
    InRing,
    /// Matches acyclic atoms.
    NotInRing,
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
    Not(Box<AtomExpr>),
}

/// Query expression attached to a query-graph bond.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BondExpr {
    /// Matches any bond.
    True,
    /// Non-aromatic single bond.
    Single,
    /// Non-aromatic double bond.
    Double,
    Triple,
    Quadruple,
    /// Any bond flagged aromatic.
    Aromatic,
    /// Single or aromatic, the usual default for an unspecified query bond.
    SingleOrAromatic,
    /// Any bond that lies on a ring.
    Ring,
    And(Vec<BondExpr>),
    Or(Vec<BondExpr>),
    Not(Box<BondExpr>),
}

fn needs<T: AtomLike + ?Sized>(target: &T) -> Result<&AtomInvariants> {
    target.invariants().ok_or(MatchError::MissingInvariants)
}

impl AtomExpr {
    /// Element primitive that accepts both aromatic and aliphatic forms.
    pub fn element(atomic_num: u8) -> Self {
        AtomExpr::Element {
            atomic_num,
            aromatic: None,
        }
    }

    pub fn matches<T: AtomLike + ?Sized>(&self, target: &T) -> Result<bool> {
        Ok(match self {
            AtomExpr::True => true,
            AtomExpr::Element {
                atomic_num,
                aromatic,
            } => {
                target.atomic_num() == *atomic_num
                    && aromatic.is_none_or(|a| target.is_aromatic() == a)
            }
            AtomExpr::Aromatic => target.is_aromatic(),
            AtomExpr::Aliphatic => !target.is_aromatic(),
            AtomExpr::Charge(c) => target.formal_charge() == *c,
            AtomExpr::Isotope(iso) => target.isotope() == *iso,
            AtomExpr::ImplicitHCount(h) => target.hydrogen_count() == *h,
            AtomExpr::Degree(d) => needs(target)?.degree == usize::from(*d),
            AtomExpr::Valence(v) => needs(target)?.valence == usize::from(*v),
            AtomExpr::Connectivity(x) => needs(target)?.connectivity == usize::from(*x),
            AtomExpr::TotalHCount(h) => needs(target)?.total_h_count == usize::from(*h),
            AtomExpr::RingMembership(count) => {
                return ring_membership_matches(*count, target.invariants());
            }
            AtomExpr::RingCount(n) => needs(target)?.ring_count == usize::from(*n),
            AtomExpr::RingBondCount(x) => needs(target)?.ring_bond_count == usize::from(*x),
            AtomExpr::RingSize(r) => needs(target)?.ring_sizes.contains(&(*r as usize)),
            AtomExpr::SmallestRingSize(r) => {
                needs(target)?.smallest_ring.unwrap_or(0) == *r as usize
            }
            AtomExpr::InRing => needs(target)?.in_ring(),
            AtomExpr::NotInRing => !needs(target)?.in_ring(),
            AtomExpr::And(exprs) => {
                for e in exprs {
                    if !e.matches(target)? {
                        return Ok(false);
                    }
                }
                true
            }
            AtomExpr::Or(exprs) => {
                for e in exprs {
                    if e.matches(target)? {
                        return Ok(true);
                    }
                }
                false
            }
            AtomExpr::Not(expr) => !expr.matches(target)?,
        })
    }

    /// First primitive in this expression or its top-level conjunction for
    /// which `f` returns a value.
    fn find_primitive<R>(&self, f: &impl Fn(&AtomExpr) -> Option<R>) -> Option<R> {
        match self {
            AtomExpr::And(exprs) => exprs.iter().find_map(|e| e.find_primitive(f)),
            other => f(other),
        }
    }
}

impl BondExpr {
    pub fn matches<T: BondLike + ?Sized>(&self, target: &T) -> Result<bool> {
        let aromatic = target.is_aromatic();
        let order = target.bond_order();
        Ok(match self {
            BondExpr::True => true,
            BondExpr::Single => order == BondOrder::Single && !aromatic,
            BondExpr::Double => order == BondOrder::Double && !aromatic,
            BondExpr::Triple => order == BondOrder::Triple,
            BondExpr::Quadruple => order == BondOrder::Quadruple,
            BondExpr::Aromatic => aromatic,
            BondExpr::SingleOrAromatic => order == BondOrder::Single || aromatic,
            BondExpr::Ring => target
                .is_ring_bond()
                .ok_or(MatchError::MissingInvariants)?,
            BondExpr::And(exprs) => {
                for e in exprs {
                    if !e.matches(target)? {
                        return Ok(false);
                    }
                }
                true
            }
            BondExpr::Or(exprs) => {
                for e in exprs {
                    if e.matches(target)? {
                        return Ok(true);
                    }
                }
                false
            }
            BondExpr::Not(expr) => !expr.matches(target)?,
        })
    }
}

// Query atoms also answer the plain property accessors, so a query graph can
// be compared with non-query matchers. Properties the expression does not pin
// down read as zero / false.

impl HasAtomicNum for AtomExpr {
    fn atomic_num(&self) -> u8 {
        self.find_primitive(&|e| match e {
            AtomExpr::Element { atomic_num, .. } => Some(*atomic_num),
            _ => None,
        })
        .unwrap_or(0)
    }
}

impl HasAromaticity for AtomExpr {
    fn is_aromatic(&self) -> bool {
        self.find_primitive(&|e| match e {
            AtomExpr::Aromatic => Some(true),
            AtomExpr::Element {
                aromatic: Some(a), ..
            } => Some(*a),
            _ => None,
        })
        .unwrap_or(false)
    }
}

impl HasFormalCharge for AtomExpr {
    fn formal_charge(&self) -> i8 {
        self.find_primitive(&|e| match e {
            AtomExpr::Charge(c) => Some(*c),
            _ => None,
        })
        .unwrap_or(0)
    }
}

impl HasIsotope for AtomExpr {
    fn isotope(&self) -> u16 {
        self.find_primitive(&|e| match e {
            AtomExpr::Isotope(i) => Some(*i),
            _ => None,
        })
        .unwrap_or(0)
    }
}

impl HasHydrogenCount for AtomExpr {
    fn hydrogen_count(&self) -> u8 {
        self.find_primitive(&|e| match e {
            AtomExpr::ImplicitHCount(h) => Some(*h),
            _ => None,
        })
        .unwrap_or(0)
    }
}

impl AtomLike for AtomExpr {
    fn as_query(&self) -> Option<&AtomExpr> {
        Some(self)
    }
}

impl HasBondOrder for BondExpr {
    fn bond_order(&self) -> BondOrder {
        match self {
            BondExpr::Single => BondOrder::Single,
            BondExpr::Double => BondOrder::Double,
            BondExpr::Triple => BondOrder::Triple,
            BondExpr::Quadruple => BondOrder::Quadruple,
            _ => BondOrder::Unset,
        }
    }
}

impl HasAromaticity for BondExpr {
    fn is_aromatic(&self) -> bool {
        matches!(self, BondExpr::Aromatic)
    }
}

impl BondLike for BondExpr {
    fn as_query(&self) -> Option<&BondExpr> {
        Some(self)
    }
}
