//! Property-directed reachability (IC3) over and-inverter graphs.
//!
//! The crate root hosts the AIG substrate: gates are identified by dense
//! ids, node 0 is the constant, and every edge carries an invert flag.
//! The graph is built programmatically and stays immutable for the whole
//! duration of a check.

mod cnf;
mod cube;
mod options;
mod pdr;
mod statistic;
mod ternary;

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::ops::{Index, Not, Range};

use thiserror::Error;

pub use cnf::{FrameSolver, SatResult};
pub use cube::{Clause, Cube, Lemma};
pub use options::{LiteralOrder, ObligationOrder, Options, OptionsError};
pub use pdr::{CheckResult, Pdr, PdrError, Witness};
pub use statistic::Statistic;
pub use ternary::TernaryValue;

pub type AigNodeId = usize;

#[derive(Debug, Clone)]
pub enum AigNodeType {
    True,
    PrimeInput,
    LatchInput,
    And(AigEdge, AigEdge),
}

#[derive(Debug, Clone)]
pub struct AigNode {
    id: AigNodeId,
    level: usize,
    typ: AigNodeType,
    fanouts: Vec<AigEdge>,
}

impl AigNode {
    pub fn node_id(&self) -> AigNodeId {
        self.id
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn typ(&self) -> &AigNodeType {
        &self.typ
    }

    pub fn is_and(&self) -> bool {
        matches!(self.typ, AigNodeType::And(_, _))
    }

    pub fn is_cinput(&self) -> bool {
        matches!(self.typ, AigNodeType::LatchInput | AigNodeType::PrimeInput)
    }

    pub fn is_latch_input(&self) -> bool {
        matches!(self.typ, AigNodeType::LatchInput)
    }

    pub fn fanin0(&self) -> AigEdge {
        if let AigNodeType::And(ret, _) = self.typ {
            ret
        } else {
            panic!("fanin0 of non-and gate {}", self.id);
        }
    }

    pub fn fanin1(&self) -> AigEdge {
        if let AigNodeType::And(_, ret) = self.typ {
            ret
        } else {
            panic!("fanin1 of non-and gate {}", self.id);
        }
    }

    pub fn fanouts(&self) -> &[AigEdge] {
        &self.fanouts
    }

    fn new_true(id: AigNodeId) -> Self {
        Self {
            id,
            level: 0,
            typ: AigNodeType::True,
            fanouts: Vec::new(),
        }
    }

    fn new_prime_input(id: AigNodeId) -> Self {
        Self {
            id,
            level: 0,
            typ: AigNodeType::PrimeInput,
            fanouts: Vec::new(),
        }
    }

    fn new_latch_input(id: AigNodeId) -> Self {
        Self {
            id,
            level: 0,
            typ: AigNodeType::LatchInput,
            fanouts: Vec::new(),
        }
    }

    fn new_and(id: AigNodeId, fanin0: AigEdge, fanin1: AigEdge, level: usize) -> Self {
        Self {
            id,
            level,
            typ: AigNodeType::And(fanin0, fanin1),
            fanouts: Vec::new(),
        }
    }
}

/// A signed reference to a gate: the literal of the engine. Ordering is
/// (gate id, polarity) so literal arrays can stay sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AigEdge {
    id: AigNodeId,
    complement: bool,
}

impl Not for AigEdge {
    type Output = AigEdge;

    fn not(mut self) -> Self::Output {
        self.complement = !self.complement;
        self
    }
}

impl From<AigNodeId> for AigEdge {
    fn from(id: AigNodeId) -> Self {
        AigEdge::new(id, false)
    }
}

impl AigEdge {
    pub fn new(id: AigNodeId, complement: bool) -> Self {
        Self { id, complement }
    }

    pub fn node_id(&self) -> AigNodeId {
        self.id
    }

    pub fn compl(&self) -> bool {
        self.complement
    }

    pub fn not_if(self, c: bool) -> Self {
        if c {
            !self
        } else {
            self
        }
    }

    pub fn constant_edge(polarity: bool) -> Self {
        AigEdge {
            id: 0,
            complement: !polarity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AigLatch {
    pub input: AigNodeId,
    pub next: AigEdge,
    pub init: bool,
}

impl AigLatch {
    fn new(input: AigNodeId, next: AigEdge, init: bool) -> Self {
        Self { input, next, init }
    }
}

/// Structural precondition violations, detected once by [`Aig::validate`]
/// before any analysis runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("combinational loop: gate {gate} feeds from gate {fanin} which is not earlier in topological order")]
    CombinationalLoop { gate: AigNodeId, fanin: AigNodeId },
    #[error("gate {gate} references out-of-range gate {fanin}")]
    FaninOutOfRange { gate: AigNodeId, fanin: AigNodeId },
    #[error("latch {latch} has a dangling next-state function")]
    DanglingLatch { latch: AigNodeId },
}

#[derive(Debug, Clone, Default)]
pub struct Aig {
    nodes: Vec<AigNode>,
    latchs: Vec<AigLatch>,
    outputs: Vec<AigEdge>,
    bads: Vec<AigEdge>,
    num_inputs: usize,
    num_ands: usize,
    next_map: HashMap<AigNodeId, AigEdge>,
    init_map: HashMap<AigNodeId, bool>,
}

impl Aig {
    pub fn new() -> Self {
        Self {
            nodes: vec![AigNode::new_true(0)],
            latchs: Vec::new(),
            outputs: Vec::new(),
            bads: Vec::new(),
            num_inputs: 0,
            num_ands: 0,
            next_map: HashMap::new(),
            init_map: HashMap::new(),
        }
    }

    pub fn constant_edge(polarity: bool) -> AigEdge {
        AigEdge::constant_edge(polarity)
    }

    pub fn new_input_node(&mut self) -> AigNodeId {
        let nodeid = self.nodes.len();
        self.nodes.push(AigNode::new_prime_input(nodeid));
        self.num_inputs += 1;
        nodeid
    }

    /// Creates a latch with a placeholder next-state function; the real
    /// one is installed with [`Aig::set_latch_next`] once its cone has
    /// been built (it may feed from the latch itself).
    pub fn new_latch_node(&mut self, init: bool) -> AigNodeId {
        let nodeid = self.nodes.len();
        self.nodes.push(AigNode::new_latch_input(nodeid));
        self.latchs
            .push(AigLatch::new(nodeid, Aig::constant_edge(false), init));
        self.next_map.insert(nodeid, Aig::constant_edge(false));
        self.init_map.insert(nodeid, init);
        nodeid
    }

    pub fn set_latch_next(&mut self, latch: AigNodeId, next: AigEdge) {
        let l = self
            .latchs
            .iter_mut()
            .find(|l| l.input == latch)
            .unwrap_or_else(|| panic!("gate {latch} is not a latch"));
        l.next = next;
        self.next_map.insert(latch, next);
    }

    pub fn new_and_node(&mut self, mut fanin0: AigEdge, mut fanin1: AigEdge) -> AigEdge {
        if fanin0.node_id() > fanin1.node_id() {
            std::mem::swap(&mut fanin0, &mut fanin1);
        }
        if fanin0 == Aig::constant_edge(true) {
            return fanin1;
        }
        if fanin0 == Aig::constant_edge(false) {
            return Aig::constant_edge(false);
        }
        if fanin1 == Aig::constant_edge(true) {
            return fanin0;
        }
        if fanin1 == Aig::constant_edge(false) {
            return Aig::constant_edge(false);
        }
        if fanin0 == fanin1 {
            return fanin0;
        }
        if fanin0 == !fanin1 {
            return Aig::constant_edge(false);
        }
        let nodeid = self.nodes.len();
        let level = self.nodes[fanin0.node_id()]
            .level
            .max(self.nodes[fanin1.node_id()].level)
            + 1;
        self.nodes
            .push(AigNode::new_and(nodeid, fanin0, fanin1, level));
        self.num_ands += 1;
        self.nodes[fanin0.id]
            .fanouts
            .push(AigEdge::new(nodeid, fanin0.compl()));
        self.nodes[fanin1.id]
            .fanouts
            .push(AigEdge::new(nodeid, fanin1.compl()));
        nodeid.into()
    }

    pub fn new_or_node(&mut self, fanin0: AigEdge, fanin1: AigEdge) -> AigEdge {
        !self.new_and_node(!fanin0, !fanin1)
    }

    pub fn add_output(&mut self, out: AigEdge) {
        self.outputs.push(out)
    }

    pub fn add_bad(&mut self, bad: AigEdge) {
        self.bads.push(bad)
    }
}

impl Aig {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_latchs(&self) -> usize {
        self.latchs.len()
    }

    pub fn num_ands(&self) -> usize {
        self.num_ands
    }

    pub fn nodes_range(&self) -> Range<usize> {
        1..self.num_nodes()
    }

    pub fn inputs(&self) -> impl Iterator<Item = AigNodeId> + '_ {
        self.nodes
            .iter()
            .filter(|n| matches!(n.typ, AigNodeType::PrimeInput))
            .map(|n| n.id)
    }

    pub fn latchs(&self) -> &[AigLatch] {
        &self.latchs
    }

    pub fn outputs(&self) -> &[AigEdge] {
        &self.outputs
    }

    pub fn bads(&self) -> &[AigEdge] {
        &self.bads
    }

    pub fn ands_iter(&self) -> impl Iterator<Item = &AigNode> {
        self.nodes.iter().filter(|node| node.is_and())
    }

    pub fn is_latch(&self, node: AigNodeId) -> bool {
        self.nodes[node].is_latch_input()
    }

    /// Next-state literal of a latch literal, polarity carried through.
    pub fn latch_next(&self, lit: AigEdge) -> AigEdge {
        self.next_map[&lit.node_id()].not_if(lit.compl())
    }

    pub fn cube_next(&self, cube: &[AigEdge]) -> Vec<AigEdge> {
        cube.iter().map(|l| self.latch_next(*l)).collect()
    }

    pub fn latch_init(&self, latch: AigNodeId) -> bool {
        self.init_map[&latch]
    }

    /// The single reset state as a cube over every latch.
    pub fn latch_init_cube(&self) -> Cube {
        Cube::from_lits(
            self.latchs
                .iter()
                .map(|l| AigEdge::new(l.input, !l.init))
                .collect(),
        )
    }

    /// Whether the reset state satisfies every literal of `cube`.
    pub fn cube_subsume_init(&self, cube: &[AigEdge]) -> bool {
        cube.iter()
            .all(|l| self.init_map[&l.node_id()] == !l.compl())
    }

    /// Marks the combinational cone feeding `logic`.
    pub fn logic_cone(&self, logic: AigEdge) -> Vec<bool> {
        let mut flag = vec![false; self.num_nodes()];
        flag[logic.node_id()] = true;
        for id in (0..self.num_nodes()).rev() {
            if flag[id] && self.nodes[id].is_and() {
                flag[self.nodes[id].fanin0().node_id()] = true;
                flag[self.nodes[id].fanin1().node_id()] = true;
            }
        }
        flag
    }

    /// Validates the structural preconditions once, before any analysis:
    /// and-gate fan-ins must be earlier in the id order (which keeps the
    /// fan-in graph acyclic) and every referenced gate must exist.
    pub fn validate(&self) -> Result<(), ModelError> {
        for node in self.nodes.iter() {
            if let AigNodeType::And(f0, f1) = node.typ {
                for f in [f0, f1] {
                    if f.node_id() >= self.num_nodes() {
                        return Err(ModelError::FaninOutOfRange {
                            gate: node.id,
                            fanin: f.node_id(),
                        });
                    }
                    if f.node_id() >= node.id {
                        return Err(ModelError::CombinationalLoop {
                            gate: node.id,
                            fanin: f.node_id(),
                        });
                    }
                }
            }
        }
        for l in self.latchs.iter() {
            if l.next.node_id() >= self.num_nodes() {
                return Err(ModelError::DanglingLatch { latch: l.input });
            }
        }
        for e in self.outputs.iter().chain(self.bads.iter()) {
            if e.node_id() >= self.num_nodes() {
                return Err(ModelError::FaninOutOfRange {
                    gate: e.node_id(),
                    fanin: e.node_id(),
                });
            }
        }
        Ok(())
    }
}

impl Index<AigNodeId> for Aig {
    type Output = AigNode;

    fn index(&self, index: AigNodeId) -> &Self::Output {
        &self.nodes[index]
    }
}

impl Display for Aig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "aig: {} inputs, {} latchs, {} ands, {} bads",
            self.num_inputs,
            self.latchs.len(),
            self.num_ands,
            self.bads.len()
        )?;
        for l in self.latchs.iter() {
            writeln!(
                f,
                "latch {} init {} next {}{}",
                l.input,
                self.init_map[&l.input],
                if l.next.compl() { "!" } else { "" },
                l.next.node_id()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift_register() -> Aig {
        let mut aig = Aig::new();
        let i = aig.new_input_node();
        let l0 = aig.new_latch_node(false);
        let l1 = aig.new_latch_node(false);
        aig.set_latch_next(l0, i.into());
        aig.set_latch_next(l1, l0.into());
        aig.add_bad(l1.into());
        aig
    }

    #[test]
    fn build_and_validate() {
        let aig = shift_register();
        assert_eq!(aig.num_nodes(), 4);
        assert_eq!(aig.num_latchs(), 2);
        aig.validate().unwrap();
    }

    #[test]
    fn and_node_folding() {
        let mut aig = Aig::new();
        let a: AigEdge = aig.new_input_node().into();
        let b: AigEdge = aig.new_input_node().into();
        assert_eq!(aig.new_and_node(a, Aig::constant_edge(true)), a);
        assert_eq!(
            aig.new_and_node(a, Aig::constant_edge(false)),
            Aig::constant_edge(false)
        );
        assert_eq!(aig.new_and_node(a, a), a);
        assert_eq!(aig.new_and_node(a, !a), Aig::constant_edge(false));
        let ab = aig.new_and_node(a, b);
        assert_eq!(aig[ab.node_id()].level(), 1);
        aig.validate().unwrap();
    }

    #[test]
    fn next_and_init_queries() {
        let aig = shift_register();
        let l0 = aig.latchs()[0].input;
        let l1 = aig.latchs()[1].input;
        assert_eq!(
            aig.latch_next(AigEdge::new(l1, false)),
            AigEdge::new(l0, false)
        );
        assert_eq!(
            aig.latch_next(AigEdge::new(l1, true)),
            AigEdge::new(l0, true)
        );
        assert_eq!(
            aig.cube_next(&[AigEdge::new(l0, false), AigEdge::new(l1, true)]),
            vec![aig.latchs()[0].next, AigEdge::new(l0, true)]
        );
        assert!(aig.cube_subsume_init(&[AigEdge::new(l0, true), AigEdge::new(l1, true)]));
        assert!(!aig.cube_subsume_init(&[AigEdge::new(l0, false)]));
        assert_eq!(aig.latch_init_cube().len(), 2);
    }

    #[test]
    fn logic_cone_marks_feeding_gates_only() {
        let mut aig = Aig::new();
        let a: AigEdge = aig.new_input_node().into();
        let b: AigEdge = aig.new_input_node().into();
        let c: AigEdge = aig.new_input_node().into();
        let ab = aig.new_and_node(a, b);
        let ca = aig.new_and_node(c, !a);
        let cone = aig.logic_cone(ab);
        assert!(cone[ab.node_id()]);
        assert!(cone[a.node_id()]);
        assert!(cone[b.node_id()]);
        assert!(!cone[c.node_id()]);
        assert!(!cone[ca.node_id()]);
    }

    #[test]
    fn validate_rejects_cycle() {
        let mut aig = Aig::new();
        let a: AigEdge = aig.new_input_node().into();
        let b: AigEdge = aig.new_input_node().into();
        let g = aig.new_and_node(a, b);
        // Forge a forward edge to exercise the acyclicity check.
        let gid = g.node_id();
        if let AigNodeType::And(f0, _) = &mut aig.nodes[gid].typ {
            *f0 = AigEdge::new(gid, false);
        }
        assert!(matches!(
            aig.validate(),
            Err(ModelError::CombinationalLoop { .. })
        ));
    }
}
