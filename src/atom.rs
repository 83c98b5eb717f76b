use crate::element;
use crate::traits::AtomLike;

/// Default atom type for a target graph node.
///
/// `Atom` stores intrinsic atomic properties, the things you would read off
/// a structural formula. Topological properties such as ring membership are
/// not stored here; they live in the [`Invariants`](crate::Invariants) side
/// table so a molecule can be shared read-only between searches.
///
/// # Examples
///
/// ```
/// use chemcrab_match::Atom;
///
/// let carbon = Atom {
///     atomic_num: 6,
///     formal_charge: 0,
///     isotope: 0,
///     hydrogen_count: 3,
///     is_aromatic: false,
/// };
/// assert_eq!(carbon.symbol(), "C");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, 7 = N, …). Identifies the element.
    pub atomic_num: u8,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Mass number. `0` means natural isotopic abundance.
    pub isotope: u16,
    /// Number of implicit hydrogens on this atom.
    pub hydrogen_count: u8,
    /// Whether this atom is in an aromatic ring.
    pub is_aromatic: bool,
}

impl Atom {
    pub fn new(atomic_num: u8) -> Self {
        Self {
            atomic_num,
            ..Self::default()
        }
    }

    pub fn aromatic(atomic_num: u8) -> Self {
        Self {
            atomic_num,
            is_aromatic: true,
            ..Self::default()
        }
    }

    pub fn with_charge(mut self, formal_charge: i8) -> Self {
        self.formal_charge = formal_charge;
        self
    }

    pub fn with_hydrogens(mut self, hydrogen_count: u8) -> Self {
        self.hydrogen_count = hydrogen_count;
        self
    }

    pub fn with_isotope(mut self, isotope: u16) -> Self {
        self.isotope = isotope;
        self
    }

    /// Element symbol, `"*"` for atomic number 0 and `"?"` when out of range.
    pub fn symbol(&self) -> &'static str {
        element::symbol(self.atomic_num).unwrap_or("?")
    }
}

impl crate::traits::HasAtomicNum for Atom {
    fn atomic_num(&self) -> u8 {
        self.atomic_num
    }
}

impl crate::traits::HasFormalCharge for Atom {
    fn formal_charge(&self) -> i8 {
        self.formal_charge
    }
}

impl crate::traits::HasIsotope for Atom {
    fn isotope(&self) -> u16 {
        self.isotope
    }
}

impl crate::traits::HasHydrogenCount for Atom {
    fn hydrogen_count(&self) -> u8 {
        self.hydrogen_count
    }
}

impl crate::traits::HasAromaticity for Atom {
    fn is_aromatic(&self) -> bool {
        self.is_aromatic
    }
}

impl AtomLike for Atom {}
