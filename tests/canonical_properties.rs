mod common;

use chemcrab_match::{
    canonical_form, canonical_ordering, canonical_signature, is_isomorphic, Atom, Bond, Mol,
};
use common::{acetic_acid, benzene, cubane, mol, naphthalene, ring, toluene};

fn reversed(mol: &Mol<Atom, Bond>) -> Mol<Atom, Bond> {
    let order: Vec<usize> = (0..mol.atom_count()).rev().collect();
    mol.renumber(&order).unwrap()
}

fn assert_same_canonical(a: &Mol<Atom, Bond>, b: &Mol<Atom, Bond>) {
    let (sa, sb) = (canonical_signature(a), canonical_signature(b));
    assert_eq!(sa, sb, "signatures differ: '{sa}' vs '{sb}'");
    assert_eq!(canonical_form(a), canonical_form(b));
}

#[test]
fn fragment_ordering_salt() {
    let a = mol(&["Na+1", "Cl-1"], &[]);
    let b = mol(&["Cl-1", "Na+1"], &[]);
    assert_same_canonical(&a, &b);
}

#[test]
fn fragment_ordering_three() {
    let a = mol(&["Na+1", "Cl-1", "OH2"], &[]);
    let b = mol(&["OH2", "Na+1", "Cl-1"], &[]);
    assert_same_canonical(&a, &b);
}

#[test]
fn identical_fragments() {
    let two_methanes = mol(&["CH4", "CH4"], &[]);
    assert_same_canonical(&two_methanes, &reversed(&two_methanes));
    let a = mol(&["CH3", "CH3", "OH2"], &[(0, 1, '-')]);
    let b = mol(&["OH2", "CH3", "CH3"], &[(1, 2, '-')]);
    assert_same_canonical(&a, &b);
}

#[test]
fn branch_order_does_not_matter() {
    // isobutanol written from either end
    let a = mol(
        &["CH3", "CH1", "CH3", "CH2", "OH1"],
        &[(0, 1, '-'), (1, 2, '-'), (1, 3, '-'), (3, 4, '-')],
    );
    let b = mol(
        &["OH1", "CH2", "CH1", "CH3", "CH3"],
        &[(0, 1, '-'), (1, 2, '-'), (2, 3, '-'), (2, 4, '-')],
    );
    assert_same_canonical(&a, &b);
}

#[test]
fn kekule_and_aromatic_forms_differ() {
    let kekule = mol(
        &["CH1"; 6],
        &[
            (0, 1, '='),
            (1, 2, '-'),
            (2, 3, '='),
            (3, 4, '-'),
            (4, 5, '='),
            (5, 0, '-'),
        ],
    );
    assert_ne!(canonical_signature(&kekule), canonical_signature(&benzene()));
}

#[test]
fn kekule_structures_of_the_same_ring_agree() {
    let a = mol(
        &["CH1"; 6],
        &[
            (0, 1, '='),
            (1, 2, '-'),
            (2, 3, '='),
            (3, 4, '-'),
            (4, 5, '='),
            (5, 0, '-'),
        ],
    );
    let b = mol(
        &["CH1"; 6],
        &[
            (0, 1, '-'),
            (1, 2, '='),
            (2, 3, '-'),
            (3, 4, '='),
            (4, 5, '-'),
            (5, 0, '='),
        ],
    );
    assert_same_canonical(&a, &b);
}

#[test]
fn charge_separates_otherwise_equal_graphs() {
    let neutral = mol(&["CH3", "OH1"], &[(0, 1, '-')]);
    let anion = mol(&["CH3", "O-1"], &[(0, 1, '-')]);
    assert_ne!(canonical_signature(&neutral), canonical_signature(&anion));
}

#[test]
fn isotope_label_position_is_canonical() {
    let mut a = toluene();
    a.atom_mut(petgraph::graph::NodeIndex::new(3)).isotope = 13;
    let mut b = toluene();
    // the other meta position
    b.atom_mut(petgraph::graph::NodeIndex::new(5)).isotope = 13;
    assert_same_canonical(&a, &b);

    let mut para = toluene();
    para.atom_mut(petgraph::graph::NodeIndex::new(4)).isotope = 13;
    assert_ne!(canonical_signature(&a), canonical_signature(&para));
}

#[test]
fn ring_size_is_visible_in_signature() {
    let six = ring("CH2", 6, '-');
    let two_threes = mol(
        &["CH2"; 6],
        &[
            (0, 1, '-'),
            (1, 2, '-'),
            (2, 0, '-'),
            (3, 4, '-'),
            (4, 5, '-'),
            (5, 3, '-'),
        ],
    );
    // same degree sequence, different graphs
    assert_ne!(canonical_signature(&six), canonical_signature(&two_threes));
    assert!(!is_isomorphic(&six, &two_threes));
}

#[test]
fn regular_graphs_with_equal_local_structure() {
    // prism versus the bipartite K3,3: both cubic on six vertices
    let prism = mol(
        &["C"; 6],
        &[
            (0, 1, '-'),
            (1, 2, '-'),
            (2, 0, '-'),
            (3, 4, '-'),
            (4, 5, '-'),
            (5, 3, '-'),
            (0, 3, '-'),
            (1, 4, '-'),
            (2, 5, '-'),
        ],
    );
    let k33 = mol(
        &["C"; 6],
        &[
            (0, 3, '-'),
            (0, 4, '-'),
            (0, 5, '-'),
            (1, 3, '-'),
            (1, 4, '-'),
            (1, 5, '-'),
            (2, 3, '-'),
            (2, 4, '-'),
            (2, 5, '-'),
        ],
    );
    assert_ne!(canonical_signature(&prism), canonical_signature(&k33));
    assert_same_canonical(&prism, &reversed(&prism));
    assert_same_canonical(&k33, &reversed(&k33));
}

#[test]
fn idempotence() {
    for m in [benzene(), toluene(), naphthalene(), acetic_acid(), cubane()] {
        let once = canonical_form(&m);
        let twice = canonical_form(&once);
        assert_eq!(once, twice);
        assert_eq!(canonical_signature(&once), canonical_signature(&m));
    }
}

#[test]
fn determinism() {
    for m in [benzene(), toluene(), naphthalene(), acetic_acid(), cubane()] {
        assert_eq!(canonical_ordering(&m), canonical_ordering(&m));
        assert_eq!(canonical_signature(&m), canonical_signature(&m));
    }
}
