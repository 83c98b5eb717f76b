pub mod atom;
pub mod bond;
pub mod canonical;
pub mod element;
pub mod error;
pub mod invariants;
pub mod matcher;
pub mod mol;
pub mod query;
pub mod rings;
pub mod substruct;
pub mod traits;

pub use atom::Atom;
pub use bond::{Bond, BondOrder};
pub use canonical::{canonical_form, canonical_ordering, canonical_signature};
pub use element::Element;
pub use error::{GraphError, MatchError};
pub use invariants::{AtomInvariants, Invariants, Target, TargetAtom, TargetBond};
pub use matcher::{AtomMatcher, BondMatcher, RING_ANY};
pub use mol::Mol;
pub use query::{AtomExpr, BondExpr};
pub use rings::RingInfo;
pub use substruct::{
    get_substruct_match, get_substruct_matches, has_substruct_match, is_isomorphic, AtomMapping,
    Mappings, Pattern, SearchMode, SearchOptions,
};
pub use traits::{
    AtomLike, BondLike, HasAromaticity, HasAtomicNum, HasBondOrder, HasFormalCharge,
    HasHydrogenCount, HasIsotope,
};
