/// Element symbols indexed by atomic number. Index 0 is the dummy/any atom.
static SYMBOLS: [&str; 119] = [
    "*", //
    "H", "He", //
    "Li", "Be", "B", "C", "N", "O", "F", "Ne", //
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", //
    "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se",
    "Br", "Kr", //
    "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te",
    "I", "Xe", //
    "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb",
    "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn",
    "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No",
    "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// An element identified by atomic number (1–118).
///
/// Only identity matters to the matching engine, so this is a thin wrapper
/// around the atomic number with symbol lookup in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Element(u8);

impl Element {
    pub fn from_atomic_num(n: u8) -> Option<Element> {
        (1..SYMBOLS.len()).contains(&(n as usize)).then_some(Element(n))
    }

    pub fn from_symbol(s: &str) -> Option<Element> {
        SYMBOLS
            .iter()
            .skip(1)
            .position(|&sym| sym == s)
            .map(|i| Element(i as u8 + 1))
    }

    pub fn atomic_num(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        SYMBOLS[self.0 as usize]
    }
}

/// Symbol for an atomic number, `"*"` for 0 and `None` past oganesson.
pub fn symbol(atomic_num: u8) -> Option<&'static str> {
    SYMBOLS.get(atomic_num as usize).copied()
}
