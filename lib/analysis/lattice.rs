//! Lattice values for dataflow analysis.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// A value in the domain of a dataflow analysis.
///
/// `meet_with` must be idempotent, commutative and associative, `top` must
/// be its identity and `bottom` must absorb it. Over a lattice of finite
/// height this is what lets a solver reach a fixed point.
pub trait DataflowObject: Clone + fmt::Debug + PartialEq {
    /// Set this value to the identity of `meet_with`.
    fn set_to_top(&mut self);

    /// Set this value to the element absorbing `meet_with`.
    fn set_to_bottom(&mut self);

    /// Replace this value with the meet of itself and `other`.
    fn meet_with(&mut self, other: &Self);

    /// Replace the contents of this value with those of `other`.
    fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }
}

/// How facts combine where paths merge.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Confluence {
    /// A fact holds after a merge only if it holds on every path. Top is the
    /// universe, meet is intersection.
    Must,
    /// A fact holds after a merge if it holds on any path. Top is the empty
    /// set, meet is union.
    May,
}

/// A set of facts drawn from a universe fixed when the analysis is
/// preprocessed.
///
/// The universe is shared between every set built from it and never
/// mutated, so a fresh universe is built for each control flow graph.
#[derive(Clone, Debug)]
pub struct FactSet<T: Ord> {
    facts: BTreeSet<T>,
    universe: Rc<BTreeSet<T>>,
    confluence: Confluence,
}

impl<T: Clone + Ord + fmt::Debug> FactSet<T> {
    /// An empty set over the given universe.
    pub fn new(universe: Rc<BTreeSet<T>>, confluence: Confluence) -> FactSet<T> {
        FactSet {
            facts: BTreeSet::new(),
            universe,
            confluence,
        }
    }

    pub fn top(universe: Rc<BTreeSet<T>>, confluence: Confluence) -> FactSet<T> {
        let mut set = FactSet::new(universe, confluence);
        set.set_to_top();
        set
    }

    pub fn bottom(universe: Rc<BTreeSet<T>>, confluence: Confluence) -> FactSet<T> {
        let mut set = FactSet::new(universe, confluence);
        set.set_to_bottom();
        set
    }

    pub fn with_facts<I: IntoIterator<Item = T>>(
        universe: Rc<BTreeSet<T>>,
        confluence: Confluence,
        facts: I,
    ) -> FactSet<T> {
        FactSet {
            facts: facts.into_iter().collect(),
            universe,
            confluence,
        }
    }

    pub fn facts(&self) -> &BTreeSet<T> {
        &self.facts
    }

    pub fn universe(&self) -> &Rc<BTreeSet<T>> {
        &self.universe
    }

    pub fn confluence(&self) -> Confluence {
        self.confluence
    }

    pub fn contains(&self, fact: &T) -> bool {
        self.facts.contains(fact)
    }

    pub fn insert(&mut self, fact: T) -> bool {
        self.facts.insert(fact)
    }

    pub fn remove(&mut self, fact: &T) -> bool {
        self.facts.remove(fact)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.facts.iter()
    }
}

impl<T: Clone + Ord + fmt::Debug> DataflowObject for FactSet<T> {
    fn set_to_top(&mut self) {
        match self.confluence {
            Confluence::Must => self.facts = self.universe.as_ref().clone(),
            Confluence::May => self.facts.clear(),
        }
    }

    fn set_to_bottom(&mut self) {
        match self.confluence {
            Confluence::Must => self.facts.clear(),
            Confluence::May => self.facts = self.universe.as_ref().clone(),
        }
    }

    fn meet_with(&mut self, other: &FactSet<T>) {
        match self.confluence {
            Confluence::Must => self.facts.retain(|fact| other.facts.contains(fact)),
            Confluence::May => self.facts.extend(other.facts.iter().cloned()),
        }
    }

    fn copy_from(&mut self, other: &FactSet<T>) {
        self.facts.clone_from(&other.facts);
        self.universe = other.universe.clone();
        self.confluence = other.confluence;
    }
}

// Two sets denote the same lattice element when they hold the same facts.
impl<T: Ord> PartialEq for FactSet<T> {
    fn eq(&self, other: &FactSet<T>) -> bool {
        self.facts == other.facts
    }
}

impl<T: Ord> Eq for FactSet<T> {}

impl<T: Ord + fmt::Display> fmt::Display for FactSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, fact) in self.facts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", fact)?;
        }
        write!(f, "]")
    }
}
