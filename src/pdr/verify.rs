//! Independent re-checks of both verdicts before they are reported.
//!
//! SAFE: the extracted lemma set is certified as an inductive invariant
//! with a fresh solver that shares no state with the engine. UNSAFE: the
//! counterexample trace is replayed with concrete 2-valued simulation
//! from the reset state.

use super::Witness;
use crate::cnf::{FrameSolver, SatResult};
use crate::cube::Lemma;
use crate::{Aig, AigEdge, AigNodeId};
use std::collections::HashMap;

/// Certifies `invariant` (together with F∞, already merged in): no lemma
/// covers the reset state, the invariant excludes the bad output, and
/// each lemma is inductive relative to the whole set.
pub(super) fn verify_invariant(aig: &Aig, bad: AigEdge, invariant: &[Lemma]) -> bool {
    for lemma in invariant.iter() {
        if aig.cube_subsume_init(lemma) {
            return false;
        }
    }
    let mut solver = FrameSolver::new();
    for lemma in invariant.iter() {
        solver.add_edge_clause(aig, &!lemma.cube());
    }
    solver.assume_edge(aig, bad, 0);
    if solver.solve() != SatResult::Unsat {
        return false;
    }
    for lemma in invariant.iter() {
        for l in lemma.iter() {
            solver.assume_edge(aig, *l, 1);
        }
        if solver.solve() != SatResult::Unsat {
            return false;
        }
    }
    true
}

/// Replays a counterexample trace step by step from the reset state,
/// checking that every recorded state cube is satisfied along the way
/// and that the final step realizes the bad output.
pub(super) fn replay_witness(aig: &Aig, bad: AigEdge, witness: &Witness) -> bool {
    if witness.states.is_empty() || witness.states.len() != witness.inputs.len() {
        return false;
    }
    if !aig.cube_subsume_init(&witness.states[0]) {
        return false;
    }
    let latch_index: HashMap<AigNodeId, usize> = aig
        .latchs()
        .iter()
        .enumerate()
        .map(|(i, l)| (l.input, i))
        .collect();
    let mut latch_vals: Vec<bool> = aig.latchs().iter().map(|l| l.init).collect();
    for (k, inputs) in witness.inputs.iter().enumerate() {
        for lit in witness.states[k].iter() {
            let idx = match latch_index.get(&lit.node_id()) {
                Some(idx) => *idx,
                None => return false,
            };
            if latch_vals[idx] == lit.compl() {
                return false;
            }
        }
        let input_vals: Vec<bool> = aig
            .inputs()
            .map(|i| {
                inputs
                    .iter()
                    .find(|lit| lit.node_id() == i)
                    .map_or(false, |lit| !lit.compl())
            })
            .collect();
        let sim = aig.simulate(&input_vals, &latch_vals);
        if k + 1 == witness.states.len() {
            return sim[bad.node_id()] ^ bad.compl();
        }
        latch_vals = aig
            .latchs()
            .iter()
            .map(|l| sim[l.next.node_id()] ^ l.next.compl())
            .collect();
    }
    false
}
