//! Pairwise atom and bond compatibility predicates.
//!
//! The search engine never compares elements directly; it asks one
//! [`AtomMatcher`] and one [`BondMatcher`] chosen up front. Both are closed
//! enums so a pattern can be copied, compared and logged.
//!
//! Every `matches` call takes the query element first and the target element
//! second. Either may be absent, which the engine never does but callers
//! probing a matcher may.

use crate::error::{MatchError, Result};
use crate::invariants::AtomInvariants;
use crate::traits::{AtomLike, BondLike};

/// Ring-membership count that accepts every target atom.
pub const RING_ANY: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AtomMatcher {
    /// Always compatible, even when either atom is absent.
    Any,
    /// Compatible when atomic numbers are equal.
    #[default]
    Element,
    /// Delegates to the query atom's own expression.
    ///
    /// Fails with [`MatchError::MissingQuery`] when no query atom is given
    /// and [`MatchError::NotAQuery`] when it carries no expression.
    Query,
    /// Compares the target's ring-bond count with a fixed value: `0` for
    /// acyclic atoms, a positive count for exactly that many ring bonds, or
    /// [`RING_ANY`] to accept anything.
    RingMembership(i32),
}

impl AtomMatcher {
    pub fn matches<Q, T>(&self, query: Option<&Q>, target: Option<&T>) -> Result<bool>
    where
        Q: AtomLike + ?Sized,
        T: AtomLike + ?Sized,
    {
        match *self {
            AtomMatcher::Any => Ok(true),
            AtomMatcher::Element => Ok(match (query, target) {
                (Some(q), Some(t)) => q.atomic_num() == t.atomic_num(),
                _ => false,
            }),
            AtomMatcher::Query => {
                let expr = query
                    .ok_or(MatchError::MissingQuery)?
                    .as_query()
                    .ok_or(MatchError::NotAQuery)?;
                match target {
                    Some(t) => expr.matches(t),
                    None => Ok(false),
                }
            }
            AtomMatcher::RingMembership(count) => {
                if count == RING_ANY {
                    return Ok(true);
                }
                match target {
                    Some(t) => ring_membership_matches(count, t.invariants()),
                    None => Ok(false),
                }
            }
        }
    }
}

/// Shared by [`AtomMatcher::RingMembership`] and
/// [`AtomExpr::RingMembership`](crate::AtomExpr::RingMembership).
pub(crate) fn ring_membership_matches(
    count: i32,
    invariants: Option<&AtomInvariants>,
) -> Result<bool> {
    if count == RING_ANY {
        return Ok(true);
    }
    let inv = invariants.ok_or(MatchError::MissingInvariants)?;
    Ok(i32::try_from(inv.ring_bond_count).is_ok_and(|ring_bonds| ring_bonds == count))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondMatcher {
    /// Always compatible, even when either bond is absent.
    Any,
    /// Compatible when both bonds are aromatic or the orders are equal.
    ///
    /// Aromaticity does not have to agree, so an aromatic single bond is
    /// compatible with an aliphatic single bond.
    #[default]
    Order,
    /// Aromatic flags must agree; aromatic pairs then match regardless of
    /// order, aliphatic pairs need equal orders.
    StrictOrder,
    /// Delegates to the query bond's own expression.
    Query,
}

impl BondMatcher {
    pub fn matches<Q, T>(&self, query: Option<&Q>, target: Option<&T>) -> Result<bool>
    where
        Q: BondLike + ?Sized,
        T: BondLike + ?Sized,
    {
        match *self {
            BondMatcher::Any => Ok(true),
            BondMatcher::Order => Ok(match (query, target) {
                (Some(q), Some(t)) => {
                    (q.is_aromatic() && t.is_aromatic()) || q.bond_order() == t.bond_order()
                }
                _ => false,
            }),
            BondMatcher::StrictOrder => Ok(match (query, target) {
                (Some(q), Some(t)) => {
                    q.is_aromatic() == t.is_aromatic()
                        && (q.is_aromatic() || q.bond_order() == t.bond_order())
                }
                _ => false,
            }),
            BondMatcher::Query => {
                let expr = query
                    .ok_or(MatchError::MissingQuery)?
                    .as_query()
                    .ok_or(MatchError::NotAQuery)?;
                match target {
                    Some(t) => expr.matches(t),
                    None => Ok(false),
                }
            }
        }
    }
}
