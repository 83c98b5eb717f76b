#![allow(dead_code)]

use chemcrab_match::{Atom, Bond, BondOrder, Element, Mol};
use serde::Deserialize;

/// Molecule written as atom tokens plus `[a, b, bond]` triples.
///
/// An atom token is an element symbol, lowercase first letter for aromatic,
/// optionally followed by `H<n>` and a signed charge: `"C"`, `"cH1"`,
/// `"NH4+1"`, `"O-1"`. Bond symbols are `-`, `=`, `#`, `$` and `:` for an
/// aromatic single bond.
#[derive(Debug, Clone, Deserialize)]
pub struct MolData {
    pub atoms: Vec<String>,
    #[serde(default)]
    pub bonds: Vec<(usize, usize, String)>,
}

impl MolData {
    pub fn build(&self) -> Mol<Atom, Bond> {
        let bonds: Vec<(usize, usize, char)> = self
            .bonds
            .iter()
            .map(|(a, b, s)| (*a, *b, s.chars().next().unwrap_or('-')))
            .collect();
        let atoms: Vec<&str> = self.atoms.iter().map(String::as_str).collect();
        mol(&atoms, &bonds)
    }
}

pub fn atom(token: &str) -> Atom {
    let split = token
        .char_indices()
        .skip(1)
        .find(|&(_, c)| !c.is_ascii_lowercase())
        .map_or(token.len(), |(i, _)| i);
    let (symbol, mut rest) = token.split_at(split);
    let aromatic = symbol.starts_with(|c: char| c.is_ascii_lowercase());
    let mut chars = symbol.chars();
    let canonical: String = chars
        .next()
        .map(|c| c.to_ascii_uppercase())
        .into_iter()
        .chain(chars)
        .collect();
    let element = Element::from_symbol(&canonical)
        .unwrap_or_else(|| panic!("unknown element in atom token {token:?}"));

    let mut atom = Atom::new(element.atomic_num());
    atom.is_aromatic = aromatic;
    if let Some(h) = rest.strip_prefix('H') {
        let end = h.find(['+', '-']).unwrap_or(h.len());
        atom.hydrogen_count = h[..end].parse().expect("hydrogen count");
        rest = &h[end..];
    }
    if !rest.is_empty() {
        atom.formal_charge = rest.parse().expect("formal charge");
    }
    atom
}

pub fn bond(symbol: char) -> Bond {
    match symbol {
        '-' => Bond::single(),
        '=' => Bond::double(),
        '#' => Bond::triple(),
        '$' => Bond::new(BondOrder::Quadruple),
        ':' => Bond::aromatic(BondOrder::Single),
        other => panic!("unknown bond symbol {other:?}"),
    }
}

pub fn mol(atoms: &[&str], bonds: &[(usize, usize, char)]) -> Mol<Atom, Bond> {
    Mol::from_parts(
        atoms.iter().map(|t| atom(t)),
        bonds.iter().map(|&(a, b, s)| (a, b, bond(s))),
    )
    .unwrap_or_else(|e| panic!("invalid test molecule: {e}"))
}

/// Ring of `n` atoms of the same token joined by the same bond symbol.
pub fn ring(token: &str, n: usize, symbol: char) -> Mol<Atom, Bond> {
    let atoms = vec![token; n];
    let bonds: Vec<_> = (0..n).map(|i| (i, (i + 1) % n, symbol)).collect();
    mol(&atoms, &bonds)
}

pub fn benzene() -> Mol<Atom, Bond> {
    ring("cH1", 6, ':')
}

pub fn toluene() -> Mol<Atom, Bond> {
    mol(
        &["CH3", "c", "cH1", "cH1", "cH1", "cH1", "cH1"],
        &[
            (0, 1, '-'),
            (1, 2, ':'),
            (2, 3, ':'),
            (3, 4, ':'),
            (4, 5, ':'),
            (5, 6, ':'),
            (6, 1, ':'),
        ],
    )
}

pub fn naphthalene() -> Mol<Atom, Bond> {
    mol(
        &["cH1", "cH1", "cH1", "c", "c", "cH1", "cH1", "cH1", "cH1", "cH1"],
        &[
            (0, 1, ':'),
            (1, 2, ':'),
            (2, 3, ':'),
            (3, 4, ':'),
            (4, 5, ':'),
            (5, 0, ':'),
            (4, 6, ':'),
            (6, 7, ':'),
            (7, 8, ':'),
            (8, 9, ':'),
            (9, 3, ':'),
        ],
    )
}

pub fn acetic_acid() -> Mol<Atom, Bond> {
    mol(
        &["CH3", "C", "O", "OH1"],
        &[(0, 1, '-'), (1, 2, '='), (1, 3, '-')],
    )
}

pub fn cubane() -> Mol<Atom, Bond> {
    let mut bonds = Vec::new();
    for i in 0..8usize {
        for bit in [1, 2, 4] {
            if i & bit == 0 {
                bonds.push((i, i | bit, '-'));
            }
        }
    }
    mol(&["CH1"; 8], &bonds)
}

/// Installs a test-writer subscriber once per test binary. Filter with
/// `RUST_LOG`, e.g. `RUST_LOG=chemcrab_match=trace`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
