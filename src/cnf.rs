//! The CNF/incremental-SAT boundary.
//!
//! A [`FrameSolver`] owns one incremental SAT solver and a lazy map from
//! (gate, timeframe) pairs to propositional variables. The first request
//! for a pair emits the Tseitin clauses defining it: the and-gate triple
//! within a timeframe, and the equality linking a latch at timeframe
//! `t > 0` to its next-state function at `t - 1`. Everything above this
//! boundary works in gate literals and never sees solver internals.
//!
//! SAT and UNSAT are ordinary answers here, never errors; encoding an
//! out-of-range gate is a caller bug and panics.

use crate::{Aig, AigEdge, AigNodeId, AigNodeType, Clause};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    /// A budgeted query ran out of conflicts before deciding.
    Unknown,
}

pub struct FrameSolver {
    sat: cadical::Solver,
    vars: HashMap<(AigNodeId, usize), i32>,
    num_var: i32,
    assumps: Vec<i32>,
    num_solve: usize,
    dead_acts: usize,
}

impl FrameSolver {
    pub fn new() -> Self {
        Self {
            sat: cadical::Solver::new(),
            vars: HashMap::new(),
            num_var: 0,
            assumps: Vec::new(),
            num_solve: 0,
            dead_acts: 0,
        }
    }

    pub fn new_var(&mut self) -> i32 {
        self.num_var += 1;
        self.num_var
    }

    /// Variable of `gate` at `timeframe`, allocating it and emitting its
    /// defining clauses on first request. Idempotent.
    pub fn encode(&mut self, aig: &Aig, gate: AigNodeId, timeframe: usize) -> i32 {
        assert!(gate < aig.num_nodes(), "gate {gate} out of range");
        if let Some(v) = self.vars.get(&(gate, timeframe)) {
            return *v;
        }
        let mut stack = vec![(gate, timeframe)];
        while let Some(&(node, t)) = stack.last() {
            if self.vars.contains_key(&(node, t)) {
                stack.pop();
                continue;
            }
            match aig[node].typ() {
                AigNodeType::And(f0, f1) => {
                    let d0 = self.vars.get(&(f0.node_id(), t)).copied();
                    let d1 = self.vars.get(&(f1.node_id(), t)).copied();
                    match (d0, d1) {
                        (Some(v0), Some(v1)) => {
                            stack.pop();
                            let v = self.new_var();
                            let l0 = if f0.compl() { -v0 } else { v0 };
                            let l1 = if f1.compl() { -v1 } else { v1 };
                            self.sat.add_clause([-l0, -l1, v]);
                            self.sat.add_clause([l0, -v]);
                            self.sat.add_clause([l1, -v]);
                            self.vars.insert((node, t), v);
                        }
                        _ => {
                            if d0.is_none() {
                                stack.push((f0.node_id(), t));
                            }
                            if d1.is_none() {
                                stack.push((f1.node_id(), t));
                            }
                        }
                    }
                }
                AigNodeType::LatchInput if t > 0 => {
                    let next = aig.latch_next(AigEdge::new(node, false));
                    match self.vars.get(&(next.node_id(), t - 1)).copied() {
                        Some(nv) => {
                            stack.pop();
                            let v = self.new_var();
                            let n = if next.compl() { -nv } else { nv };
                            self.sat.add_clause([-v, n]);
                            self.sat.add_clause([v, -n]);
                            self.vars.insert((node, t), v);
                        }
                        None => stack.push((next.node_id(), t - 1)),
                    }
                }
                AigNodeType::True => {
                    stack.pop();
                    let v = self.new_var();
                    self.sat.add_clause([v]);
                    self.vars.insert((node, t), v);
                }
                // Inputs at any timeframe, latches at timeframe 0.
                _ => {
                    stack.pop();
                    let v = self.new_var();
                    self.vars.insert((node, t), v);
                }
            }
        }
        self.vars[&(gate, timeframe)]
    }

    /// Signed variable of an edge at a timeframe.
    pub fn lit(&mut self, aig: &Aig, edge: AigEdge, timeframe: usize) -> i32 {
        let v = self.encode(aig, edge.node_id(), timeframe);
        if edge.compl() {
            -v
        } else {
            v
        }
    }

    pub fn add_clause(&mut self, lits: &[i32]) {
        self.sat.add_clause(lits.iter().copied());
    }

    /// Asserts a clause of gate literals at timeframe 0.
    pub fn add_edge_clause(&mut self, aig: &Aig, clause: &Clause) {
        let lits: Vec<i32> = clause.iter().map(|l| self.lit(aig, *l, 0)).collect();
        self.sat.add_clause(lits);
    }

    pub fn assume(&mut self, lit: i32) {
        self.assumps.push(lit);
    }

    pub fn assume_edge(&mut self, aig: &Aig, edge: AigEdge, timeframe: usize) {
        let l = self.lit(aig, edge, timeframe);
        self.assumps.push(l);
    }

    /// Solves under the accumulated assumptions, clearing them.
    pub fn solve(&mut self) -> SatResult {
        self.num_solve += 1;
        let assumps = std::mem::take(&mut self.assumps);
        match self.sat.solve_with(assumps.iter().copied()) {
            Some(true) => SatResult::Sat,
            Some(false) => SatResult::Unsat,
            None => SatResult::Unknown,
        }
    }

    /// Like [`FrameSolver::solve`] but bounded by a conflict budget; may
    /// answer [`SatResult::Unknown`] instead of blocking.
    pub fn solve_limited(&mut self, conflict_budget: i32) -> SatResult {
        self.sat
            .set_limit("conflicts", conflict_budget)
            .expect("conflicts is a valid limit");
        let res = self.solve();
        self.sat
            .set_limit("conflicts", -1)
            .expect("conflicts is a valid limit");
        res
    }

    /// Model value of a variable; valid only after SAT.
    pub fn value(&self, lit: i32) -> Option<bool> {
        self.sat.value(lit)
    }

    /// Model value of an already-encoded edge; valid only after SAT.
    pub fn value_edge(&self, edge: AigEdge, timeframe: usize) -> Option<bool> {
        let v = *self.vars.get(&(edge.node_id(), timeframe))?;
        self.sat.value(v).map(|b| b ^ edge.compl())
    }

    /// Whether an assumption literal is in the unsatisfiable core; valid
    /// only after UNSAT.
    pub fn failed(&self, lit: i32) -> bool {
        self.sat.failed(lit)
    }

    pub fn failed_edge(&self, edge: AigEdge, timeframe: usize) -> bool {
        let v = match self.vars.get(&(edge.node_id(), timeframe)) {
            Some(v) => *v,
            None => return false,
        };
        self.failed(if edge.compl() { -v } else { v })
    }

    /// Permanently disables a spent activation variable.
    pub fn retire_act(&mut self, act: i32) {
        self.sat.add_clause([-act]);
        self.dead_acts += 1;
    }

    pub fn num_queries(&self) -> usize {
        self.num_solve
    }

    pub fn dead_acts(&self) -> usize {
        self.dead_acts
    }

    /// Discards the backend and every lazily-built variable. The caller
    /// re-asserts the live frame clauses afterwards; cones are re-encoded
    /// on demand by later queries.
    pub fn reset(&mut self) {
        self.sat = cadical::Solver::new();
        self.vars.clear();
        self.num_var = 0;
        self.assumps.clear();
        self.num_solve = 0;
        self.dead_acts = 0;
    }
}

impl Default for FrameSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSolver")
            .field("num_var", &self.num_var)
            .field("num_solve", &self.num_solve)
            .field("dead_acts", &self.dead_acts)
            .finish()
    }
}
