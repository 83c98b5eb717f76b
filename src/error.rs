//! Error types for graph construction and matcher contracts.
//!
//! A failed match is never an error: searches report it as `false`, `None`
//! or an empty iterator. The types here cover malformed input only.

use thiserror::Error;

/// Structural problems found while assembling a [`Mol`](crate::Mol).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A bond refers to an atom index that does not exist.
    #[error("bond {bond} refers to atom {atom}, but the graph has {atom_count} atoms")]
    DanglingBond {
        bond: usize,
        atom: usize,
        atom_count: usize,
    },
    /// A bond connects an atom to itself.
    #[error("bond {bond} is a self loop on atom {atom}")]
    SelfLoop { bond: usize, atom: usize },
    /// Two bonds connect the same pair of atoms.
    #[error("bond {bond} duplicates an existing bond between atoms {a} and {b}")]
    DuplicateBond { bond: usize, a: usize, b: usize },
    /// A renumbering was not a permutation of `0..atom_count`.
    #[error("invalid permutation for {atom_count} atoms: {reason}")]
    InvalidPermutation { atom_count: usize, reason: String },
}

/// Contract violations between a matcher and the elements it is given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// A query matcher was handed an element that carries no query
    /// expression.
    #[error("element is not a query expression")]
    NotAQuery,
    /// A pattern's query graph has an atom without a query expression while
    /// its atom matcher delegates to queries.
    #[error("query atom {0} is not a query expression")]
    AtomNotAQuery(usize),
    /// Bond counterpart of [`MatchError::AtomNotAQuery`].
    #[error("query bond {0} is not a query expression")]
    BondNotAQuery(usize),
    /// A query predicate was evaluated against an absent query element.
    #[error("query predicate evaluated without a query element")]
    MissingQuery,
    /// An invariant-based predicate was evaluated against an element with no
    /// precomputed invariants.
    #[error("target element exposes no structural invariants")]
    MissingInvariants,
}

pub type Result<T> = std::result::Result<T, MatchError>;
