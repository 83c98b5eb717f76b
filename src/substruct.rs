//! Subgraph and exact isomorphism search.
//!
//! The engine is a VF2-style backtracking search over a precomputed query
//! atom order. Its state lives in an explicit frame stack, so a search can
//! stop after any mapping and resume later: [`Mappings`] is an ordinary
//! iterator, dropping it cancels the search, and asking the [`Pattern`] for
//! a fresh iterator restarts from scratch.

use std::cmp::Reverse;
use std::collections::HashSet;

use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::{debug, instrument, trace};

use crate::atom::Atom;
use crate::bond::Bond;
use crate::error::{MatchError, Result};
use crate::invariants::Target;
use crate::matcher::{AtomMatcher, BondMatcher};
use crate::mol::Mol;
use crate::query::{AtomExpr, BondExpr};
use crate::traits::{AtomLike, BondLike};

/// Query atom to target atom pairs, sorted by query atom index.
pub type AtomMapping = Vec<(NodeIndex, NodeIndex)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchMode {
    /// The query may map onto part of the target. Extra target bonds between
    /// mapped atoms are allowed.
    #[default]
    Substructure,
    /// Query and target must be the same graph up to relabelling.
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SearchOptions {
    pub mode: SearchMode,
    /// Upper bound on the number of mappings collected by
    /// [`Pattern::find_all`]. `None` collects every mapping.
    pub limit: Option<usize>,
}

impl SearchOptions {
    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Pairwise compatibility test used by the search engine.
///
/// Query indices come from the query graph and target indices from the
/// target graph handed to the same search.
pub(crate) trait Compat {
    fn atoms(&self, query: NodeIndex, target: NodeIndex) -> bool;
    fn bonds(&self, query: EdgeIndex, target: EdgeIndex) -> bool;
}

/// Order in which query atoms are assigned.
///
/// Each atom after the first of its component has at least one neighbour
/// earlier in the order, recorded as its `parent`, so candidates for it can
/// be drawn from the neighbourhood of the parent's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Plan {
    order: Vec<NodeIndex>,
    parent: Vec<Option<NodeIndex>>,
}

impl Plan {
    pub(crate) fn new<A, B>(query: &Mol<A, B>) -> Self {
        Self::starting_at(query, None)
    }

    /// Builds the order, optionally forcing `start` to come first.
    ///
    /// Otherwise each component starts at its highest-degree atom; the next
    /// atom is the one with the most already-ordered neighbours, ties broken
    /// by higher degree and then lower index.
    pub(crate) fn starting_at<A, B>(query: &Mol<A, B>, start: Option<NodeIndex>) -> Self {
        let n = query.atom_count();
        let degree: Vec<usize> = query.atoms().map(|a| query.degree(a)).collect();
        let mut position: Vec<Option<usize>> = vec![None; n];
        let mut ordered_neighbors = vec![0usize; n];
        let mut order = Vec::with_capacity(n);
        let mut parent = Vec::with_capacity(n);

        while order.len() < n {
            let forced = start.filter(|s| order.is_empty() && s.index() < n);
            let next = forced
                .map(|s| s.index())
                .or_else(|| {
                    (0..n)
                        .filter(|&i| position[i].is_none() && ordered_neighbors[i] > 0)
                        .max_by_key(|&i| (ordered_neighbors[i], degree[i], Reverse(i)))
                })
                .or_else(|| {
                    (0..n)
                        .filter(|&i| position[i].is_none())
                        .max_by_key(|&i| (degree[i], Reverse(i)))
                });
            let Some(next) = next else { break };
            let node = NodeIndex::new(next);

            let anchor = query
                .neighbors(node)
                .filter_map(|nb| position[nb.index()].map(|p| (p, nb)))
                .min()
                .map(|(_, nb)| nb);
            position[next] = Some(order.len());
            order.push(node);
            parent.push(anchor);
            for nb in query.neighbors(node) {
                ordered_neighbors[nb.index()] += 1;
            }
        }

        Self { order, parent }
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Fresh,
    Running,
    Done,
}

/// One level of the backtracking stack.
#[derive(Debug)]
struct Frame {
    query: NodeIndex,
    candidates: Vec<NodeIndex>,
    cursor: usize,
    assigned: Option<NodeIndex>,
}

/// Resumable search state shared by pattern matching and automorphism
/// detection.
pub(crate) struct Vf2<'a, QA, QB, TA, TB, C> {
    query: &'a Mol<QA, QB>,
    target: &'a Mol<TA, TB>,
    compat: C,
    mode: SearchMode,
    plan: &'a Plan,
    core_query: Vec<Option<NodeIndex>>,
    core_target: Vec<Option<NodeIndex>>,
    stack: Vec<Frame>,
    status: Status,
}

impl<'a, QA, QB, TA, TB, C: Compat> Vf2<'a, QA, QB, TA, TB, C> {
    pub(crate) fn new(
        query: &'a Mol<QA, QB>,
        target: &'a Mol<TA, TB>,
        plan: &'a Plan,
        compat: C,
        mode: SearchMode,
    ) -> Self {
        Self {
            query,
            target,
            compat,
            mode,
            plan,
            core_query: vec![None; query.atom_count()],
            core_target: vec![None; target.atom_count()],
            stack: Vec::with_capacity(plan.len()),
            status: Status::Fresh,
        }
    }

    fn sizes_compatible(&self) -> bool {
        let (qa, qb) = (self.query.atom_count(), self.query.bond_count());
        let (ta, tb) = (self.target.atom_count(), self.target.bond_count());
        match self.mode {
            SearchMode::Substructure => qa <= ta && qb <= tb,
            SearchMode::Exact => qa == ta && qb == tb,
        }
    }

    fn frame_for(&self, depth: usize) -> Frame {
        let query = self.plan.order[depth];
        let image = self.plan.parent[depth].and_then(|p| self.core_query[p.index()]);
        let mut candidates: Vec<NodeIndex> = match image {
            Some(t) => self
                .target
                .neighbors(t)
                .filter(|n| self.core_target[n.index()].is_none())
                .collect(),
            None => self
                .target
                .atoms()
                .filter(|n| self.core_target[n.index()].is_none())
                .collect(),
        };
        candidates.sort_unstable();
        Frame {
            query,
            candidates,
            cursor: 0,
            assigned: None,
        }
    }

    fn is_feasible(&self, q: NodeIndex, t: NodeIndex) -> bool {
        if self.core_target[t.index()].is_some() {
            return false;
        }
        let q_degree = self.query.degree(q);
        let t_degree = self.target.degree(t);
        let degree_ok = match self.mode {
            SearchMode::Substructure => t_degree >= q_degree,
            SearchMode::Exact => t_degree == q_degree,
        };
        if !degree_ok || !self.compat.atoms(q, t) {
            return false;
        }

        let mut mapped = 0usize;
        for q_bond in self.query.bonds_of(q) {
            let Some(q_nb) = self.query.other_atom(q_bond, q) else {
                continue;
            };
            let Some(t_nb) = self.core_query[q_nb.index()] else {
                continue;
            };
            mapped += 1;
            match self.target.bond_between(t, t_nb) {
                Some(t_bond) if self.compat.bonds(q_bond, t_bond) => {}
                _ => return false,
            }
        }

        if self.mode == SearchMode::Exact {
            let t_mapped = self
                .target
                .neighbors(t)
                .filter(|n| self.core_target[n.index()].is_some())
                .count();
            if t_mapped != mapped {
                return false;
            }
        }
        true
    }

    fn current_mapping(&self) -> AtomMapping {
        self.core_query
            .iter()
            .enumerate()
            .filter_map(|(q, t)| t.map(|t| (NodeIndex::new(q), t)))
            .collect()
    }

    fn finish(&mut self) {
        self.status = Status::Done;
        self.stack.clear();
        self.core_query.fill(None);
        self.core_target.fill(None);
    }

    /// Advances to the next complete mapping.
    pub(crate) fn next_mapping(&mut self) -> Option<AtomMapping> {
        match self.status {
            Status::Done => return None,
            Status::Fresh => {
                self.status = Status::Running;
                if !self.sizes_compatible() {
                    self.finish();
                    return None;
                }
                if self.plan.len() == 0 {
                    self.finish();
                    return Some(Vec::new());
                }
                let frame = self.frame_for(0);
                self.stack.push(frame);
            }
            Status::Running => {}
        }

        while let Some(depth) = self.stack.len().checked_sub(1) {
            let q = self.stack[depth].query;
            if let Some(t) = self.stack[depth].assigned.take() {
                self.core_query[q.index()] = None;
                self.core_target[t.index()] = None;
            }

            let mut next = None;
            while let Some(&t) = self.stack[depth].candidates.get(self.stack[depth].cursor) {
                self.stack[depth].cursor += 1;
                if self.is_feasible(q, t) {
                    next = Some(t);
                    break;
                }
            }

            let Some(t) = next else {
                self.stack.pop();
                continue;
            };
            self.core_query[q.index()] = Some(t);
            self.core_target[t.index()] = Some(q);
            self.stack[depth].assigned = Some(t);

            if depth + 1 == self.plan.len() {
                let mapping = self.current_mapping();
                trace!(?mapping, "mapping found");
                return Some(mapping);
            }
            let frame = self.frame_for(depth + 1);
            self.stack.push(frame);
        }

        self.finish();
        None
    }
}

/// Adapts a pair of matchers to the engine, reading target elements through
/// their invariant views.
struct PatternCompat<'a, 't, QA, QB, TA, TB> {
    query: &'a Mol<QA, QB>,
    target: &'a Target<'t, TA, TB>,
    atom_matcher: AtomMatcher,
    bond_matcher: BondMatcher,
}

impl<QA, QB, TA, TB> Compat for PatternCompat<'_, '_, QA, QB, TA, TB>
where
    QA: AtomLike,
    QB: BondLike,
    TA: AtomLike,
    TB: BondLike,
{
    fn atoms(&self, query: NodeIndex, target: NodeIndex) -> bool {
        let view = self.target.atom_view(target);
        // queries are validated when the pattern is built and target views
        // always carry invariants, so an error here cannot occur
        let result = self
            .atom_matcher
            .matches(Some(self.query.atom(query)), Some(&view));
        debug_assert!(result.is_ok(), "atom matcher contract error: {result:?}");
        result.unwrap_or(false)
    }

    fn bonds(&self, query: EdgeIndex, target: EdgeIndex) -> bool {
        let view = self.target.bond_view(target);
        let result = self
            .bond_matcher
            .matches(Some(self.query.bond(query)), Some(&view));
        debug_assert!(result.is_ok(), "bond matcher contract error: {result:?}");
        result.unwrap_or(false)
    }
}

/// A query graph prepared for repeated searching.
///
/// The query is borrowed, the matching order is computed once, and the
/// pattern can then be run against any number of targets, from any number
/// of threads.
#[derive(Debug, Clone)]
pub struct Pattern<'q, A = Atom, B = Bond> {
    query: &'q Mol<A, B>,
    atom_matcher: AtomMatcher,
    bond_matcher: BondMatcher,
    options: SearchOptions,
    plan: Plan,
}

impl<'q, A: AtomLike, B: BondLike> Pattern<'q, A, B> {
    /// Prepares `query` for searching with the given matchers.
    ///
    /// Fails when a query matcher is chosen but some query atom or bond
    /// carries no query expression.
    #[instrument(skip_all, fields(atoms = query.atom_count(), bonds = query.bond_count()))]
    pub fn new(
        query: &'q Mol<A, B>,
        atom_matcher: AtomMatcher,
        bond_matcher: BondMatcher,
    ) -> Result<Self> {
        if atom_matcher == AtomMatcher::Query {
            if let Some(a) = query.atoms().find(|&a| query.atom(a).as_query().is_none()) {
                return Err(MatchError::AtomNotAQuery(a.index()));
            }
        }
        if bond_matcher == BondMatcher::Query {
            if let Some(b) = query.bonds().find(|&b| query.bond(b).as_query().is_none()) {
                return Err(MatchError::BondNotAQuery(b.index()));
            }
        }
        let plan = Plan::new(query);
        debug!(?atom_matcher, ?bond_matcher, "pattern prepared");
        Ok(Self {
            query,
            atom_matcher,
            bond_matcher,
            options: SearchOptions::default(),
            plan,
        })
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn query(&self) -> &'q Mol<A, B> {
        self.query
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Lazily enumerates mappings into `target`.
    pub fn mappings<'a, TA, TB>(&'a self, target: &'a Target<'_, TA, TB>) -> Mappings<'a, A, B, TA, TB>
    where
        TA: AtomLike,
        TB: BondLike,
    {
        let compat = PatternCompat {
            query: self.query,
            target,
            atom_matcher: self.atom_matcher,
            bond_matcher: self.bond_matcher,
        };
        Mappings {
            inner: Vf2::new(self.query, target.mol(), &self.plan, compat, self.options.mode),
        }
    }

    pub fn matches<TA: AtomLike, TB: BondLike>(&self, target: &Target<'_, TA, TB>) -> bool {
        self.find_mapping(target).is_some()
    }

    pub fn find_mapping<TA: AtomLike, TB: BondLike>(
        &self,
        target: &Target<'_, TA, TB>,
    ) -> Option<AtomMapping> {
        self.mappings(target).next()
    }

    /// Collects mappings, up to the configured limit.
    pub fn find_all<TA: AtomLike, TB: BondLike>(
        &self,
        target: &Target<'_, TA, TB>,
    ) -> Vec<AtomMapping> {
        let limit = self.options.limit.unwrap_or(usize::MAX);
        self.mappings(target).take(limit).collect()
    }

    /// Number of mappings, ignoring the configured limit.
    pub fn count<TA: AtomLike, TB: BondLike>(&self, target: &Target<'_, TA, TB>) -> usize {
        self.mappings(target).count()
    }

    /// Mappings that cover distinct sets of target atoms, keeping the first
    /// mapping found for each set.
    pub fn unique_mappings<TA: AtomLike, TB: BondLike>(
        &self,
        target: &Target<'_, TA, TB>,
    ) -> Vec<AtomMapping> {
        let mut seen = HashSet::new();
        self.mappings(target)
            .filter(|m| {
                let mut atoms: Vec<NodeIndex> = m.iter().map(|&(_, t)| t).collect();
                atoms.sort_unstable();
                seen.insert(atoms)
            })
            .collect()
    }
}

impl<'q> Pattern<'q, AtomExpr, BondExpr> {
    /// Pattern over a query graph, delegating both atoms and bonds to their
    /// expressions. Cannot fail, as every element is a query.
    pub fn from_query(query: &'q Mol<AtomExpr, BondExpr>) -> Self {
        Self {
            query,
            atom_matcher: AtomMatcher::Query,
            bond_matcher: BondMatcher::Query,
            options: SearchOptions::default(),
            plan: Plan::new(query),
        }
    }
}

/// Iterator over the mappings of a pattern into one target.
pub struct Mappings<'a, A, B, TA = Atom, TB = Bond> {
    inner: Vf2<'a, A, B, TA, TB, PatternCompat<'a, 'a, A, B, TA, TB>>,
}

impl<A, B, TA, TB> Iterator for Mappings<'_, A, B, TA, TB>
where
    A: AtomLike,
    B: BondLike,
    TA: AtomLike,
    TB: BondLike,
{
    type Item = AtomMapping;

    fn next(&mut self) -> Option<AtomMapping> {
        self.inner.next_mapping()
    }
}

fn default_pattern<A: AtomLike, B: BondLike>(query: &Mol<A, B>) -> Pattern<'_, A, B> {
    Pattern {
        query,
        atom_matcher: AtomMatcher::Element,
        bond_matcher: BondMatcher::Order,
        options: SearchOptions::default(),
        plan: Plan::new(query),
    }
}

pub fn has_substruct_match<A, B>(target: &Mol<A, B>, query: &Mol<A, B>) -> bool
where
    A: AtomLike,
    B: BondLike,
{
    get_substruct_match(target, query).is_some()
}

pub fn get_substruct_match<A, B>(target: &Mol<A, B>, query: &Mol<A, B>) -> Option<AtomMapping>
where
    A: AtomLike,
    B: BondLike,
{
    default_pattern(query).find_mapping(&Target::new(target))
}

pub fn get_substruct_matches<A, B>(target: &Mol<A, B>, query: &Mol<A, B>) -> Vec<AtomMapping>
where
    A: AtomLike,
    B: BondLike,
{
    default_pattern(query).find_all(&Target::new(target))
}

/// Whether two molecules are the same graph, comparing atoms by element and
/// bonds by order.
pub fn is_isomorphic<A, B>(a: &Mol<A, B>, b: &Mol<A, B>) -> bool
where
    A: AtomLike,
    B: BondLike,
{
    default_pattern(a)
        .with_mode(SearchMode::Exact)
        .matches(&Target::new(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::BondOrder;
    use crate::matcher::RING_ANY;
    use crate::tests::fixtures::*;
    use crate::traits::HasAtomicNum;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    fn is_valid_mapping<QA, QB, TA, TB>(
        query: &Mol<QA, QB>,
        target: &Mol<TA, TB>,
        mapping: &AtomMapping,
    ) -> bool {
        let image = |q: NodeIndex| mapping.iter().find(|&&(qq, _)| qq == q).map(|&(_, t)| t);
        let mut targets: Vec<_> = mapping.iter().map(|&(_, t)| t).collect();
        targets.sort_unstable();
        targets.dedup();
        targets.len() == mapping.len()
            && query.bonds().all(|b| {
                let Some((u, v)) = query.bond_endpoints(b) else {
                    return false;
                };
                match (image(u), image(v)) {
                    (Some(tu), Some(tv)) => target.bond_between(tu, tv).is_some(),
                    _ => false,
                }
            })
    }

    #[test]
    fn ethanol_contains_cc() {
        let target = ethanol();
        let query = chain(2);
        assert!(has_substruct_match(&target, &query));
        let m = get_substruct_match(&target, &query).unwrap();
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn methane_does_not_contain_cc() {
        let target = chain(1);
        let query = chain(2);
        assert!(!has_substruct_match(&target, &query));
        assert_eq!(get_substruct_match(&target, &query), None);
        assert!(get_substruct_matches(&target, &query).is_empty());
    }

    #[test]
    fn propane_cc_matches() {
        assert_eq!(get_substruct_matches(&chain(3), &chain(2)).len(), 4);
    }

    #[test]
    fn cyclohexane_cc_matches_cover_all_edges() {
        let target = cyclohexane();
        let query = chain(2);
        let matches = get_substruct_matches(&target, &query);
        assert_eq!(matches.len(), 12);
        for mapping in &matches {
            assert!(is_valid_mapping(&query, &target, mapping));
        }
    }

    #[test]
    fn aliphatic_cc_in_benzene() {
        // aromatic single bonds are compatible with aliphatic single bonds
        let matches = get_substruct_matches(&benzene(), &chain(2));
        assert_eq!(matches.len(), 12);
        let unique = default_pattern(&chain(2)).unique_mappings(&Target::new(&benzene()));
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn benzene_automorphisms() {
        let target = benzene();
        let matches = get_substruct_matches(&target, &target);
        assert_eq!(matches.len(), 12);
        for (i, a) in matches.iter().enumerate() {
            assert!(is_valid_mapping(&target, &target, a));
            for b in matches.iter().skip(i + 1) {
                assert_ne!(a, b, "duplicate mapping found");
            }
        }
    }

    #[test]
    fn kekule_double_bonds_halve_the_mappings() {
        let mapping_count = get_substruct_matches(&kekule_benzene(), &chain(2)).len();
        assert_eq!(mapping_count, 6);
    }

    #[test]
    fn empty_query_matches_anything() {
        let target = ethanol();
        let query = Mol::<Atom, Bond>::new();
        assert!(has_substruct_match(&target, &query));
        let all = get_substruct_matches(&target, &query);
        assert_eq!(all, vec![Vec::new()]);
    }

    #[test]
    fn both_empty() {
        let empty = Mol::<Atom, Bond>::new();
        assert!(has_substruct_match(&empty, &empty));
        assert!(is_isomorphic(&empty, &empty));
    }

    #[test]
    fn empty_target_no_match_nonempty_query() {
        let target = Mol::<Atom, Bond>::new();
        assert!(!has_substruct_match(&target, &chain(1)));
    }

    #[test]
    fn single_atom_query() {
        let target = ethanol();
        let query = build(vec![Atom::new(8)], &[]);
        let matches = get_substruct_matches(&target, &query);
        assert_eq!(matches.len(), 1);
        let (q, t) = matches[0][0];
        assert_eq!(q, n(0));
        assert_eq!(target.atom(t).atomic_num(), 8);
    }

    #[test]
    fn query_larger_than_target_no_match() {
        assert!(!has_substruct_match(&chain(1), &chain(6)));
    }

    #[test]
    fn bond_orders_must_agree() {
        let cc_double = diatomic(6, 6, Bond::double());
        let cc_single = diatomic(6, 6, Bond::single());
        assert!(has_substruct_match(&cc_double, &cc_double));
        assert!(!has_substruct_match(&cc_single, &cc_double));
        assert!(!has_substruct_match(&cc_double, &cc_single));

        let nitrile = diatomic(6, 7, Bond::triple());
        assert!(has_substruct_match(&nitrile, &nitrile));
        assert!(!has_substruct_match(&diatomic(6, 7, Bond::single()), &nitrile));
    }

    #[test]
    fn aromatic_bonds_do_not_match_aliphatic_double() {
        let query = diatomic(6, 6, Bond::double());
        assert!(!has_substruct_match(&benzene(), &query));
    }

    #[test]
    fn aromatic_ring_in_naphthalene() {
        let matches = get_substruct_matches(&naphthalene(), &benzene());
        // two rings, twelve automorphisms each
        assert_eq!(matches.len(), 24);
    }

    #[test]
    fn mappings_are_sorted_by_query_index() {
        let target = phenol();
        let query = build(
            vec![Atom::new(8), Atom::new(6)],
            &[(0, 1, Bond::single())],
        );
        let m = get_substruct_match(&target, &query).unwrap();
        assert_eq!(m, vec![(n(0), n(0)), (n(1), n(1))]);
    }

    #[test]
    fn mapping_correctness() {
        let target = ethanol();
        let query = build(
            vec![Atom::new(6), Atom::new(8)],
            &[(0, 1, Bond::single())],
        );
        let m = get_substruct_match(&target, &query).unwrap();
        for &(q, t) in &m {
            assert_eq!(query.atom(q).atomic_num(), target.atom(t).atomic_num());
        }
        assert!(is_valid_mapping(&query, &target, &m));
    }

    #[test]
    fn any_matchers_ignore_bond_order() {
        let target = diatomic(6, 6, Bond::double());
        let query = chain(2);
        let pattern = Pattern::new(&query, AtomMatcher::Element, BondMatcher::Any).unwrap();
        assert_eq!(pattern.count(&Target::new(&target)), 2);
    }

    #[test]
    fn disconnected_query_maps_each_component() {
        let target = build(
            vec![Atom::new(11).with_charge(1), Atom::new(17).with_charge(-1), Atom::new(6)],
            &[],
        );
        let query = build(vec![Atom::new(17), Atom::new(11)], &[]);
        let pattern = Pattern::new(&query, AtomMatcher::Element, BondMatcher::Order).unwrap();
        let all = pattern.find_all(&Target::new(&target));
        assert_eq!(all, vec![vec![(n(0), n(1)), (n(1), n(0))]]);
    }

    #[test]
    fn disconnected_query_components_stay_injective() {
        // two separate C-C fragments in propane would need four atoms
        let query = build(
            vec![Atom::new(6), Atom::new(6), Atom::new(6), Atom::new(6)],
            &[(0, 1, Bond::single()), (2, 3, Bond::single())],
        );
        assert!(!has_substruct_match(&chain(3), &query));
        // butane has one pair of disjoint bonds: 2 assignments x 2 x 2 orientations
        assert_eq!(get_substruct_matches(&chain(4), &query).len(), 8);
    }

    #[test]
    fn substructure_allows_extra_target_bonds() {
        // a three-atom chain maps onto cyclopropane despite the ring closure
        let target = aliphatic_ring(3);
        assert_eq!(get_substruct_matches(&target, &chain(3)).len(), 6);
        let pat = chain(3);
        let exact = default_pattern(&pat).with_mode(SearchMode::Exact);
        assert!(!exact.matches(&Target::new(&target)));
    }

    #[test]
    fn exact_mode_requires_same_graph() {
        assert!(is_isomorphic(&cyclohexane(), &cyclohexane()));
        assert!(!is_isomorphic(&chain(6), &cyclohexane()));
        assert!(!is_isomorphic(&chain(5), &chain(6)));
        assert!(!is_isomorphic(&benzene(), &kekule_benzene()));

        let empty = Mol::<Atom, Bond>::new();
        assert!(!is_isomorphic(&empty, &chain(1)));
    }

    #[test]
    fn isomorphism_survives_renumbering() {
        let mol = indane();
        let shuffled = mol.renumber(&[8, 3, 0, 6, 1, 5, 7, 2, 4]).unwrap();
        assert!(is_isomorphic(&mol, &shuffled));
        let pattern = default_pattern(&mol).with_mode(SearchMode::Exact);
        // indane has a single mirror symmetry
        assert_eq!(pattern.count(&Target::new(&shuffled)), 2);
    }

    #[test]
    fn search_can_stop_and_restart() {
        let target_mol = benzene();
        let target = Target::new(&target_mol);
        let pattern = default_pattern(&target_mol);

        let mut first = pattern.mappings(&target);
        let a = first.next().unwrap();
        let b = first.next().unwrap();
        assert_ne!(a, b);
        drop(first);

        let again: Vec<_> = pattern.mappings(&target).take(2).collect();
        assert_eq!(again, vec![a, b]);
        assert_eq!(pattern.count(&target), 12);
    }

    #[test]
    fn exhausted_iterator_stays_exhausted() {
        let target_mol = ethanol();
        let target = Target::new(&target_mol);
        let query = chain(2);
        let pattern = default_pattern(&query);
        let mut it = pattern.mappings(&target);
        assert_eq!(it.by_ref().count(), 2);
        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn limit_caps_find_all() {
        let target_mol = benzene();
        let target = Target::new(&target_mol);
        let pattern = default_pattern(&target_mol)
            .with_options(SearchOptions::default().limit(5));
        assert_eq!(pattern.find_all(&target).len(), 5);
        assert_eq!(pattern.count(&target), 12);
    }

    #[test]
    fn query_pattern_needs_query_elements() {
        let query = chain(2);
        assert_eq!(
            Pattern::new(&query, AtomMatcher::Query, BondMatcher::Order).unwrap_err(),
            MatchError::AtomNotAQuery(0)
        );
        assert_eq!(
            Pattern::new(&query, AtomMatcher::Element, BondMatcher::Query).unwrap_err(),
            MatchError::BondNotAQuery(0)
        );
    }

    #[test]
    fn expression_queries_read_target_invariants() {
        // ring carbon bonded to an acyclic carbon
        let query = Mol::from_parts(
            vec![
                AtomExpr::And(vec![AtomExpr::element(6), AtomExpr::InRing]),
                AtomExpr::And(vec![AtomExpr::element(6), AtomExpr::NotInRing]),
            ],
            [(0, 1, BondExpr::Not(Box::new(BondExpr::Ring)))],
        )
        .unwrap();
        let pattern = Pattern::from_query(&query);

        let toluene_mol = toluene();
        let matches = pattern.find_all(&Target::new(&toluene_mol));
        assert_eq!(matches, vec![vec![(n(0), n(1)), (n(1), n(0))]]);
        assert!(!pattern.matches(&Target::new(&benzene())));
        assert!(!pattern.matches(&Target::new(&chain(4))));
    }

    #[test]
    fn aromatic_query_bond_matches_any_order() {
        let query = Mol::from_parts(
            vec![AtomExpr::Aromatic, AtomExpr::Aromatic],
            [(0, 1, BondExpr::Aromatic)],
        )
        .unwrap();
        let pattern = Pattern::from_query(&query);
        assert_eq!(pattern.count(&Target::new(&benzene())), 12);
        assert_eq!(pattern.count(&Target::new(&kekule_benzene())), 0);
    }

    #[test]
    fn ring_membership_pattern() {
        let query = build(vec![Atom::new(6)], &[]);
        let naph = naphthalene();
        let target = Target::new(&naph);
        let fused = Pattern::new(&query, AtomMatcher::RingMembership(3), BondMatcher::Order).unwrap();
        let mut atoms: Vec<usize> = fused
            .mappings(&target)
            .map(|m| m[0].1.index())
            .collect();
        atoms.sort_unstable();
        assert_eq!(atoms, vec![3, 4]);

        let any = Pattern::new(&query, AtomMatcher::RingMembership(RING_ANY), BondMatcher::Order)
            .unwrap();
        assert_eq!(any.count(&target), 10);
    }

    #[test]
    fn strict_order_rejects_aromatic_against_aliphatic() {
        let query = chain(2);
        let strict = Pattern::new(&query, AtomMatcher::Element, BondMatcher::StrictOrder).unwrap();
        assert!(!strict.matches(&Target::new(&benzene())));
        assert!(strict.matches(&Target::new(&toluene())));

        let arom_query = build(
            vec![Atom::aromatic(6), Atom::aromatic(6)],
            &[(0, 1, Bond::aromatic(BondOrder::Double))],
        );
        let strict = Pattern::new(&arom_query, AtomMatcher::Element, BondMatcher::StrictOrder)
            .unwrap();
        assert_eq!(strict.count(&Target::new(&benzene())), 12);
    }

    #[test]
    fn pattern_is_reusable_across_targets() {
        let query = chain(2);
        let pattern = default_pattern(&query);
        let counts: Vec<usize> = [chain(2), chain(3), cyclohexane(), chain(1)]
            .iter()
            .map(|mol| pattern.count(&Target::new(mol)))
            .collect();
        assert_eq!(counts, vec![2, 4, 12, 0]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "atom matcher contract error")]
    fn unvalidated_contract_error_is_not_a_silent_mismatch() {
        // bypasses Pattern::new, which would reject this pairing
        let query = chain(2);
        let target_mol = chain(2);
        let target = Target::new(&target_mol);
        let compat = PatternCompat {
            query: &query,
            target: &target,
            atom_matcher: AtomMatcher::Query,
            bond_matcher: BondMatcher::Order,
        };
        compat.atoms(n(0), n(0));
    }

    #[test]
    fn plan_keeps_components_connected() {
        let mol = toluene();
        let plan = Plan::new(&mol);
        assert_eq!(plan.len(), 7);
        // the highest-degree atom, the ipso carbon, comes first
        assert_eq!(plan.order[0], n(1));
        assert_eq!(plan.parent[0], None);
        assert!(plan.parent[1..].iter().all(Option::is_some));

        let forced = Plan::starting_at(&mol, Some(n(4)));
        assert_eq!(forced.order[0], n(4));
    }
}
