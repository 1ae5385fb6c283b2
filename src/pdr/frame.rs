//! The frame trace F0..Fk plus the distinguished F∞.
//!
//! Level `k` stores the lemmas whose highest proven frame is `k`; the
//! clause set of frame `k` is the union of every level at or above `k`
//! together with F∞. A lemma inserted at level `k` therefore blocks its
//! cube at every frame up to `k` without being duplicated per frame.
//! Levels only ever gain lemmas, except when a stronger lemma subsumes
//! an existing one.

use crate::cube::{Cube, Lemma};
use std::ops::Index;

#[derive(Debug, Default)]
pub struct Frames {
    frames: Vec<Vec<Lemma>>,
    inf: Vec<Lemma>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddLemma {
    Added,
    /// An equal or stronger lemma already covers this cube at or above
    /// the requested level.
    Subsumed,
}

impl Frames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn inf(&self) -> &[Lemma] {
        &self.inf
    }

    /// Whether `cube` is already blocked at `frame` by a stored lemma.
    pub fn trivial_contained(&self, frame: usize, cube: &Cube) -> bool {
        for level in frame..self.frames.len() {
            if self.frames[level].iter().any(|l| l.subsume(cube)) {
                return true;
            }
        }
        self.inf.iter().any(|l| l.subsume(cube))
    }

    /// Installs `lemma` at `level`, discarding every stored lemma it
    /// subsumes at or below `level`. Returns [`AddLemma::Subsumed`]
    /// without changing anything when an equal or stronger lemma already
    /// holds at or above `level`. The number of discarded lemmas is
    /// added to `*subsumed`.
    pub fn add_lemma(&mut self, level: usize, lemma: Lemma, subsumed: &mut usize) -> AddLemma {
        assert!(level >= 1 && level < self.frames.len());
        if self.trivial_contained(level, &lemma) {
            return AddLemma::Subsumed;
        }
        for l in 1..=level {
            let before = self.frames[l].len();
            self.frames[l].retain(|old| !lemma.subsume(old));
            *subsumed += before - self.frames[l].len();
        }
        self.frames[level].push(lemma);
        AddLemma::Added
    }

    /// Moves a lemma blocked forever into F∞, dropping every finite
    /// lemma it subsumes.
    pub fn add_inf_lemma(&mut self, lemma: Lemma, subsumed: &mut usize) {
        if self.inf.iter().any(|l| l.subsume(&lemma)) {
            return;
        }
        for frame in self.frames.iter_mut() {
            let before = frame.len();
            frame.retain(|old| !lemma.subsume(old));
            *subsumed += before - frame.len();
        }
        self.inf.push(lemma);
    }

    /// First level at or above 1 whose lemma set is empty, if any: the
    /// fixpoint witness.
    pub fn empty_level(&self) -> Option<usize> {
        (1..self.frames.len()).find(|l| self.frames[*l].is_empty())
    }

    /// The inductive invariant once a fixpoint is reached: every lemma
    /// at or above the first empty level, plus F∞.
    pub fn invariant(&self) -> Vec<Lemma> {
        let start = self.empty_level().expect("no fixpoint reached");
        let mut inv: Vec<Lemma> = self.inf.to_vec();
        for level in start..self.frames.len() {
            inv.extend(self.frames[level].iter().cloned());
        }
        inv
    }

    /// Lemmas of every level and of F∞, with their levels, for solver
    /// rebuilds: a solver serving frame `k` needs the lemmas of levels
    /// `>= k`.
    pub fn lemmas_at_or_above(&self, level: usize) -> impl Iterator<Item = &Lemma> {
        self.frames[level..]
            .iter()
            .flatten()
            .chain(self.inf.iter())
    }

    pub fn level_sizes(&self) -> Vec<usize> {
        self.frames.iter().map(|f| f.len()).collect()
    }
}

impl Index<usize> for Frames {
    type Output = [Lemma];

    fn index(&self, index: usize) -> &Self::Output {
        &self.frames[index]
    }
}
