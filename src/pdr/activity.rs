//! Latch activity, a VSIDS-flavored ordering heuristic for
//! generalization: literals over latches that keep appearing in kept
//! lemmas are likely load-bearing, so drop attempts start with the
//! quiet ones.

use crate::{AigEdge, AigNodeId};
use std::collections::HashMap;

#[derive(Debug)]
pub struct Activity {
    activity: HashMap<AigNodeId, f64>,
    inc: f64,
    decay: f64,
}

impl Activity {
    pub fn new(decay: f64) -> Self {
        assert!(decay > 0.0 && decay <= 1.0);
        Self {
            activity: HashMap::new(),
            inc: 1.0,
            decay,
        }
    }

    fn bump(&mut self, latch: AigNodeId) {
        *self.activity.entry(latch).or_insert(0.0) += self.inc;
    }

    /// Bumps every latch of a stored lemma and ages older bumps.
    pub fn pump_cube_activity(&mut self, cube: &[AigEdge]) {
        for lit in cube {
            self.bump(lit.node_id());
        }
        self.inc /= self.decay;
        if self.inc > 1e100 {
            for v in self.activity.values_mut() {
                *v /= self.inc;
            }
            self.inc = 1.0;
        }
    }

    pub fn activity_of(&self, latch: AigNodeId) -> f64 {
        self.activity.get(&latch).copied().unwrap_or(0.0)
    }

    /// Sorts literals by activity; ascending puts the least active
    /// first, the preferred order for drop attempts.
    pub fn sort_by_activity(&self, lits: &mut [AigEdge], ascending: bool) {
        if ascending {
            lits.sort_by(|a, b| {
                self.activity_of(a.node_id())
                    .total_cmp(&self.activity_of(b.node_id()))
            });
        } else {
            lits.sort_by(|a, b| {
                self.activity_of(b.node_id())
                    .total_cmp(&self.activity_of(a.node_id()))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(id: usize) -> AigEdge {
        AigEdge::new(id, false)
    }

    #[test]
    fn bump_and_order() {
        let mut act = Activity::new(0.99);
        act.pump_cube_activity(&[lit(1), lit(2)]);
        act.pump_cube_activity(&[lit(2)]);
        let mut lits = vec![lit(2), lit(3), lit(1)];
        act.sort_by_activity(&mut lits, true);
        assert_eq!(lits[0].node_id(), 3);
        assert_eq!(lits[2].node_id(), 2);
        act.sort_by_activity(&mut lits, false);
        assert_eq!(lits[0].node_id(), 2);
    }

    #[test]
    fn later_bumps_outweigh_earlier_ones() {
        let mut act = Activity::new(0.5);
        act.pump_cube_activity(&[lit(1)]);
        for _ in 0..8 {
            act.pump_cube_activity(&[]);
        }
        act.pump_cube_activity(&[lit(2)]);
        assert!(act.activity_of(2) > act.activity_of(1));
    }
}
