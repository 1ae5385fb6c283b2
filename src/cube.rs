//! Cubes and clauses over latch literals.
//!
//! A [`Cube`] is a sorted, duplicate-free conjunction of signed latch
//! literals denoting a set of states; a [`Clause`] is its negation. A
//! [`Lemma`] is a shared handle to a cube: the same cube is held by the
//! frame that blocks it, by pending proof obligations, and by predecessor
//! chains, and is freed when the last holder drops it.

use crate::AigEdge;
use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, Not};
use std::rc::Rc;

/// 64-bit bucket signature over gate ids: if `a ⊆ b` then
/// `abs(a) & !abs(b) == 0`, giving an O(1) negative pre-test before the
/// exact subsumption scan.
fn abstraction(lits: &[AigEdge]) -> u64 {
    let mut abs = 0;
    for l in lits {
        abs |= 1u64 << (l.node_id() % 64);
    }
    abs
}

#[derive(Clone, Eq)]
pub struct Cube {
    lits: Vec<AigEdge>,
    abs: u64,
}

impl Cube {
    pub fn new() -> Self {
        Self {
            lits: Vec::new(),
            abs: 0,
        }
    }

    /// Sorts, deduplicates and signs the literal list. A list holding a
    /// latch in both polarities denotes the empty state set and is a
    /// caller bug.
    pub fn from_lits(mut lits: Vec<AigEdge>) -> Self {
        lits.sort();
        lits.dedup();
        debug_assert!(
            lits.windows(2).all(|w| w[0].node_id() != w[1].node_id()),
            "cube contains a latch in both polarities"
        );
        let abs = abstraction(&lits);
        Self { lits, abs }
    }

    pub fn abs(&self) -> u64 {
        self.abs
    }

    /// True iff every literal of `self` also appears in `other`, so the
    /// state set blocked by `self` covers the one blocked by `other`.
    pub fn subsume(&self, other: &Cube) -> bool {
        if self.lits.len() > other.lits.len() {
            return false;
        }
        if self.abs & !other.abs != 0 {
            return false;
        }
        let mut it = other.lits.iter();
        'outer: for l in self.lits.iter() {
            for o in it.by_ref() {
                if l == o {
                    continue 'outer;
                }
                if o > l {
                    return false;
                }
            }
            return false;
        }
        true
    }
}

impl Default for Cube {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Cube {
    type Target = [AigEdge];

    fn deref(&self) -> &Self::Target {
        &self.lits
    }
}

impl PartialEq for Cube {
    fn eq(&self, other: &Self) -> bool {
        self.lits == other.lits
    }
}

impl std::hash::Hash for Cube {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.lits.hash(state)
    }
}

impl FromIterator<AigEdge> for Cube {
    fn from_iter<T: IntoIterator<Item = AigEdge>>(iter: T) -> Self {
        Self::from_lits(iter.into_iter().collect())
    }
}

impl From<&[AigEdge]> for Cube {
    fn from(value: &[AigEdge]) -> Self {
        Self::from_lits(value.to_vec())
    }
}

impl Not for Cube {
    type Output = Clause;

    fn not(self) -> Self::Output {
        Clause {
            lits: self.lits.iter().map(|lit| !*lit).collect(),
        }
    }
}

impl Not for &Cube {
    type Output = Clause;

    fn not(self) -> Self::Output {
        Clause {
            lits: self.lits.iter().map(|lit| !*lit).collect(),
        }
    }
}

impl Debug for Cube {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.lits.iter()).finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    lits: Vec<AigEdge>,
}

impl Clause {
    pub fn new() -> Self {
        Self { lits: Vec::new() }
    }

    pub fn push(&mut self, lit: AigEdge) {
        self.lits.push(lit)
    }
}

impl Default for Clause {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Clause {
    type Target = [AigEdge];

    fn deref(&self) -> &Self::Target {
        &self.lits
    }
}

impl From<&[AigEdge]> for Clause {
    fn from(value: &[AigEdge]) -> Self {
        Self {
            lits: value.to_vec(),
        }
    }
}

impl Not for Clause {
    type Output = Cube;

    fn not(self) -> Self::Output {
        Cube::from_lits(self.lits.iter().map(|lit| !*lit).collect())
    }
}

/// Shared-ownership handle to a cube. Predecessor links only ever point
/// at older cubes, so plain reference counting suffices.
#[derive(Clone, Eq)]
pub struct Lemma {
    cube: Rc<Cube>,
}

impl Lemma {
    pub fn new(cube: Cube) -> Self {
        Self {
            cube: Rc::new(cube),
        }
    }

    pub fn cube(&self) -> &Cube {
        &self.cube
    }
}

impl Deref for Lemma {
    type Target = Cube;

    fn deref(&self) -> &Self::Target {
        &self.cube
    }
}

impl PartialEq for Lemma {
    fn eq(&self, other: &Self) -> bool {
        self.cube == other.cube
    }
}

impl Debug for Lemma {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.cube.fmt(f)
    }
}
