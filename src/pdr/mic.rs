//! Lemma generalization: minimal inductive cube extraction and
//! push-forward.
//!
//! Starting from the unsat core of a blocked obligation, `mic` greedily
//! drops one literal at a time, keeping a drop whenever the shrunk cube
//! is still inductive relative to its frame. `generalize` then pushes the
//! result through later frames for as long as it stays blocked, so a
//! lemma enters the trace at the highest frame it holds at.

use super::{Pdr, Relative};
use crate::cube::Cube;
use crate::options::LiteralOrder;
use crate::AigEdge;

impl Pdr {
    /// Shrinks `core` to a minimal-ish inductive cube at `frame`. Greedy
    /// and order-dependent: the result depends on the configured literal
    /// order, not on a global optimum.
    pub(super) fn mic(&mut self, frame: usize, core: Cube) -> Cube {
        let mut lits: Vec<AigEdge> = core.to_vec();
        if self.opts.literal_order == LiteralOrder::Activity {
            let activity = &self.activity;
            activity.sort_by_activity(&mut lits, true);
        }
        let mut i = 0;
        while i < lits.len() {
            if self.aborted() {
                break;
            }
            let cand: Cube = lits
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, l)| *l)
                .collect();
            if cand.is_empty() || self.aig.cube_subsume_init(&cand) {
                i += 1;
                continue;
            }
            match self.solve_relative(frame, &cand, true, false) {
                Relative::Blocked(shrunk) => {
                    self.statistic.num_mic_drop += 1;
                    // The core may discard more than the attempted
                    // literal; keep only survivors, in attempt order.
                    lits.retain(|l| shrunk.contains(l));
                }
                Relative::Cti(_) => {
                    self.statistic.num_mic_keep += 1;
                    i += 1;
                }
            }
        }
        Cube::from_lits(lits)
    }

    /// Generalizes a blocked core at `frame` and pushes it forward.
    /// Returns the first frame at which the cube is no longer blocked
    /// (`depth + 1` when it survives every frame) along with the final
    /// cube, which may have shrunk further along the way.
    pub(super) fn generalize(&mut self, frame: usize, core: Cube) -> (usize, Cube) {
        let mut cube = self.mic(frame, core);
        for f in frame + 1..=self.depth() {
            match self.solve_relative(f, &cube, true, false) {
                Relative::Blocked(shrunk) => cube = shrunk,
                Relative::Cti(_) => return (f, cube),
            }
        }
        (self.depth() + 1, cube)
    }
}
