//! Two- and three-valued circuit simulation.
//!
//! Ternary simulation over {0, 1, X} discovers which latch values are
//! irrelevant to a target gate: a latch set to X that leaves every target
//! determined can be dropped from a witness cube. The full forward sweep
//! evaluates the whole graph; the incremental update re-evaluates only
//! the cone reachable from a changed input, in topological-level order.

use crate::{Aig, AigEdge, AigNodeId};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::{BitAnd, Not};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TernaryValue {
    True,
    False,
    X,
}

impl Not for TernaryValue {
    type Output = TernaryValue;

    fn not(self) -> Self::Output {
        match self {
            TernaryValue::True => TernaryValue::False,
            TernaryValue::False => TernaryValue::True,
            TernaryValue::X => TernaryValue::X,
        }
    }
}

impl BitAnd for TernaryValue {
    type Output = TernaryValue;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (TernaryValue::False, _) | (_, TernaryValue::False) => TernaryValue::False,
            (TernaryValue::True, TernaryValue::True) => TernaryValue::True,
            _ => TernaryValue::X,
        }
    }
}

impl From<bool> for TernaryValue {
    fn from(value: bool) -> Self {
        if value {
            TernaryValue::True
        } else {
            TernaryValue::False
        }
    }
}

impl TernaryValue {
    pub fn not_if(self, c: bool) -> Self {
        if c {
            !self
        } else {
            self
        }
    }

    pub fn is_determined(self) -> bool {
        !matches!(self, TernaryValue::X)
    }
}

fn edge_value(values: &[TernaryValue], edge: AigEdge) -> TernaryValue {
    values[edge.node_id()].not_if(edge.compl())
}

impl Aig {
    /// Concrete 2-valued evaluation of every gate. `primary_inputs` is
    /// given in [`Aig::inputs`] order and `latch_inputs` in
    /// [`Aig::latchs`] order.
    pub fn simulate(&self, primary_inputs: &[bool], latch_inputs: &[bool]) -> Vec<bool> {
        let t: Vec<TernaryValue> = primary_inputs.iter().map(|b| (*b).into()).collect();
        let l: Vec<TernaryValue> = latch_inputs.iter().map(|b| (*b).into()).collect();
        self.ternary_simulate(&t, &l)
            .into_iter()
            .map(|v| match v {
                TernaryValue::True => true,
                TernaryValue::False => false,
                TernaryValue::X => unreachable!("x in a concrete simulation"),
            })
            .collect()
    }

    /// Full forward sweep over {0, 1, X}. Returns one value per gate id.
    pub fn ternary_simulate(
        &self,
        primary_inputs: &[TernaryValue],
        latch_inputs: &[TernaryValue],
    ) -> Vec<TernaryValue> {
        assert_eq!(primary_inputs.len(), self.num_inputs());
        assert_eq!(latch_inputs.len(), self.num_latchs());
        let mut values = vec![TernaryValue::X; self.num_nodes()];
        values[0] = TernaryValue::True;
        let mut pi = primary_inputs.iter();
        let mut li = latch_inputs.iter();
        for id in self.nodes_range() {
            let node = &self[id];
            values[id] = if node.is_and() {
                edge_value(&values, node.fanin0()) & edge_value(&values, node.fanin1())
            } else if node.is_latch_input() {
                *li.next().unwrap()
            } else {
                *pi.next().unwrap()
            };
        }
        values
    }

    /// Re-evaluates only the gates reachable from `cinput` after setting
    /// it to `value`, visiting fan-outs in topological-level order so
    /// every gate sees final fan-in values.
    pub fn update_ternary_simulate(
        &self,
        mut simulation: Vec<TernaryValue>,
        cinput: AigNodeId,
        value: TernaryValue,
    ) -> Vec<TernaryValue> {
        assert!(self[cinput].is_cinput());
        if simulation[cinput] == value {
            return simulation;
        }
        simulation[cinput] = value;
        let mut queue = BinaryHeap::new();
        for fanout in self[cinput].fanouts() {
            queue.push(Reverse((self[fanout.node_id()].level(), fanout.node_id())));
        }
        while let Some(Reverse((_, id))) = queue.pop() {
            let node = &self[id];
            let new = edge_value(&simulation, node.fanin0()) & edge_value(&simulation, node.fanin1());
            if simulation[id] != new {
                simulation[id] = new;
                for fanout in node.fanouts() {
                    queue.push(Reverse((self[fanout.node_id()].level(), fanout.node_id())));
                }
            }
        }
        simulation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Aig;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use TernaryValue::{False, True, X};

    #[test]
    fn ternary_ops() {
        assert_eq!(!X, X);
        assert_eq!(!True, False);
        assert_eq!(True & X, X);
        assert_eq!(False & X, False);
        assert_eq!(True & True, True);
        assert_eq!(X.not_if(true), X);
        assert!(!X.is_determined());
    }

    #[test]
    fn sweep_on_small_circuit() {
        let mut aig = Aig::new();
        let a = aig.new_input_node();
        let b = aig.new_input_node();
        let g = aig.new_and_node(a.into(), AigEdge::new(b, true));
        let values = aig.ternary_simulate(&[True, False], &[]);
        assert_eq!(values[g.node_id()], True);
        let values = aig.ternary_simulate(&[True, X], &[]);
        assert_eq!(values[g.node_id()], X);
        let values = aig.ternary_simulate(&[X, True], &[]);
        // b = 1 forces the and gate through its inverted fan-in.
        assert_eq!(values[g.node_id()], False);
    }

    #[test]
    fn update_matches_full_sweep() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut aig = Aig::new();
        let inputs: Vec<_> = (0..6).map(|_| aig.new_input_node()).collect();
        let mut edges: Vec<AigEdge> = inputs.iter().map(|i| (*i).into()).collect();
        for _ in 0..40 {
            let x = edges[rng.gen_range(0..edges.len())].not_if(rng.gen());
            let y = edges[rng.gen_range(0..edges.len())].not_if(rng.gen());
            edges.push(aig.new_and_node(x, y));
        }
        let mut vals: Vec<TernaryValue> = (0..6)
            .map(|_| if rng.gen() { True } else { False })
            .collect();
        let mut sim = aig.ternary_simulate(&vals, &[]);
        for _ in 0..50 {
            let which = rng.gen_range(0..6);
            let new = match rng.gen_range(0..3) {
                0 => True,
                1 => False,
                _ => X,
            };
            vals[which] = new;
            sim = aig.update_ternary_simulate(sim, inputs[which], new);
            assert_eq!(sim, aig.ternary_simulate(&vals, &[]));
        }
    }

    #[test]
    fn concrete_simulation() {
        let mut aig = Aig::new();
        let l = aig.new_latch_node(false);
        aig.set_latch_next(l, AigEdge::new(l, true));
        let values = aig.simulate(&[], &[false]);
        assert!(!values[l]);
        assert!(values[0]);
    }
}
