//! The property-directed reachability engine.
//!
//! `Pdr` maintains one incremental solver per frame (frame `k`'s solver
//! holds the transition relation, the lemmas proven at frames `>= k` and,
//! for frame 0, the reset state) and drives the blocking / propagation
//! loop until a counterexample reaches frame 0 or some frame's lemma set
//! empties out, which proves the property inductively.

mod activity;
mod frame;
mod mic;
mod obligation;
mod verify;

use crate::cnf::{FrameSolver, SatResult};
use crate::cube::{Cube, Lemma};
use crate::options::Options;
use crate::statistic::Statistic;
use crate::ternary::TernaryValue;
use crate::{Aig, AigEdge, Clause, ModelError, OptionsError};
use activity::Activity;
use frame::{AddLemma, Frames};
use log::{debug, info, trace, warn};
use obligation::{ObligationQueue, ProofObligation};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors surfaced before the algorithm starts; once `check` runs, every
/// outcome (including timeout) is a [`CheckResult`], never an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PdrError {
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A counterexample trace: `states[k]` holds at step `k` (step 0 at the
/// reset state) and `inputs[k]` drives step `k` into step `k + 1`, the
/// final entry realizing the bad output.
#[derive(Debug, Clone, PartialEq)]
pub struct Witness {
    pub states: Vec<Cube>,
    pub inputs: Vec<Cube>,
}

impl Witness {
    pub fn depth(&self) -> usize {
        self.states.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// The property holds; the cubes are the blocking lemmas of the
    /// inductive invariant.
    Safe { invariant: Vec<Cube> },
    Unsafe { witness: Option<Witness> },
    /// Timeout, interrupt, or an exhausted conflict budget.
    Unknown,
}

enum Relative {
    /// UNSAT: the assumption core, repaired to exclude the reset state.
    Blocked(Cube),
    /// SAT: generalized predecessor state and the inputs reaching the
    /// queried cube, when a model was requested.
    Cti(Option<(Cube, Cube)>),
}

enum BadState {
    None,
    Unknown,
    Cex(Cube, Cube),
}

enum BlockResult {
    Blocked,
    Unsafe(Rc<ProofObligation>),
    Aborted,
}

pub struct Pdr {
    aig: Aig,
    opts: Options,
    bad: AigEdge,
    solvers: Vec<FrameSolver>,
    inf_solver: FrameSolver,
    frames: Frames,
    activity: Activity,
    statistic: Statistic,
    deadline: Option<Instant>,
    interrupt: Arc<AtomicBool>,
}

impl Pdr {
    pub fn new(aig: Aig, opts: Options) -> Result<Self, PdrError> {
        opts.validate(&aig)?;
        aig.validate()?;
        let bad = if aig.bads().is_empty() {
            aig.outputs()[opts.bad]
        } else {
            aig.bads()[opts.bad]
        };
        let activity = Activity::new(opts.activity_decay);
        let mut res = Self {
            aig,
            opts,
            bad,
            solvers: Vec::new(),
            inf_solver: FrameSolver::new(),
            frames: Frames::new(),
            activity,
            statistic: Statistic::default(),
            deadline: None,
            interrupt: Arc::new(AtomicBool::new(false)),
        };
        res.new_frame();
        let init: Vec<Clause> = res
            .aig
            .latchs()
            .iter()
            .map(|l| Clause::from([AigEdge::new(l.input, !l.init)].as_slice()))
            .collect();
        for clause in init {
            res.solvers[0].add_edge_clause(&res.aig, &clause);
        }
        let cone = res.aig.logic_cone(bad);
        debug!(
            "pdr: property cone holds {} of {} gates",
            cone.iter().filter(|f| **f).count(),
            res.aig.num_nodes()
        );
        Ok(res)
    }

    /// Cooperative cancellation handle; setting the flag aborts the
    /// check at the next polling point with [`CheckResult::Unknown`].
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    pub fn statistic(&self) -> &Statistic {
        &self.statistic
    }

    pub fn depth(&self) -> usize {
        self.solvers.len() - 1
    }

    fn aborted(&self) -> bool {
        if self.interrupt.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    fn new_frame(&mut self) {
        self.frames.new_frame();
        let mut solver = FrameSolver::new();
        let inf: Vec<Clause> = self.frames.inf().iter().map(|l| !l.cube()).collect();
        for clause in inf.iter() {
            solver.add_edge_clause(&self.aig, clause);
        }
        self.solvers.push(solver);
    }

    pub fn check(&mut self) -> CheckResult {
        self.deadline = self.opts.timeout.map(|t| Instant::now() + t);
        info!(
            "pdr: checking {:?} on {} latchs, {} ands",
            self.bad,
            self.aig.num_latchs(),
            self.aig.num_ands()
        );
        loop {
            if self.aborted() {
                return self.give_up("aborted");
            }
            let block_start = Instant::now();
            loop {
                match self.get_bad() {
                    BadState::None => break,
                    BadState::Unknown => return self.give_up("conflict budget exhausted"),
                    BadState::Cex(cube, inputs) => match self.block(cube, inputs) {
                        BlockResult::Blocked => (),
                        BlockResult::Aborted => return self.give_up("aborted while blocking"),
                        BlockResult::Unsafe(po) => {
                            self.statistic.block_time += block_start.elapsed();
                            let witness = self.build_witness(po);
                            if self.opts.verify
                                && !verify::replay_witness(&self.aig, self.bad, &witness)
                            {
                                panic!("counterexample failed concrete replay");
                            }
                            info!("pdr: UNSAFE at depth {}", witness.depth());
                            debug!("{}", self.statistic);
                            let witness = self.opts.witness.then_some(witness);
                            return CheckResult::Unsafe { witness };
                        }
                    },
                }
            }
            self.statistic.block_time += block_start.elapsed();
            self.new_frame();
            let propagate_start = Instant::now();
            let fixpoint = self.propagate();
            self.statistic.propagate_time += propagate_start.elapsed();
            match fixpoint {
                None => return self.give_up("aborted while propagating"),
                Some(true) => {
                    let invariant = self.frames.invariant();
                    if self.opts.verify && !verify::verify_invariant(&self.aig, self.bad, &invariant)
                    {
                        panic!("inductive invariant failed certification");
                    }
                    info!(
                        "pdr: SAFE with {} lemmas at depth {}",
                        invariant.len(),
                        self.depth()
                    );
                    debug!("{}", self.statistic);
                    return CheckResult::Safe {
                        invariant: invariant.iter().map(|l| l.cube().clone()).collect(),
                    };
                }
                Some(false) => {
                    debug!(
                        "pdr: depth {} frames {:?} inf {}",
                        self.depth(),
                        self.frames.level_sizes(),
                        self.frames.inf().len()
                    );
                }
            }
        }
    }

    fn give_up(&self, reason: &str) -> CheckResult {
        warn!(
            "pdr: {} at depth {}, frames {:?}",
            reason,
            self.depth(),
            self.frames.level_sizes()
        );
        info!("{}", self.statistic);
        CheckResult::Unknown
    }

    /// Asks whether the bad output is reachable from the top frame.
    fn get_bad(&mut self) -> BadState {
        self.statistic.num_get_bad += 1;
        self.statistic.num_solve += 1;
        let depth = self.depth();
        self.maybe_rebuild(depth);
        let bad = self.bad;
        self.solvers[depth].assume_edge(&self.aig, bad, 0);
        let res = match self.opts.conflict_budget {
            Some(budget) => self.solvers[depth].solve_limited(budget),
            None => self.solvers[depth].solve(),
        };
        match res {
            SatResult::Unsat => BadState::None,
            SatResult::Unknown => BadState::Unknown,
            SatResult::Sat => {
                let (cube, inputs) = self.extract_witness(depth, &[bad]);
                BadState::Cex(cube, inputs)
            }
        }
    }

    /// Drives the proof-obligation recursion until the bad cube is
    /// blocked at the top frame or an obligation reaches the reset
    /// state.
    fn block(&mut self, cube: Cube, inputs: Cube) -> BlockResult {
        let depth = self.depth();
        let mut obligations = ObligationQueue::new(self.opts.obligation_order);
        obligations.add(ProofObligation::new(depth, Rc::new(cube), inputs, 0, None));
        while let Some(po) = obligations.pop() {
            if po.frame == 0 || self.aig.cube_subsume_init(&po.cube) {
                return BlockResult::Unsafe(po);
            }
            if self.aborted() {
                return BlockResult::Aborted;
            }
            self.statistic.num_obligation += 1;
            if self.frames.trivial_contained(po.frame, &po.cube) {
                if self.opts.keep_obligations && po.frame < depth {
                    obligations.add(po.at_frame(po.frame + 1));
                }
                continue;
            }
            trace!(
                "obligation at frame {} ({} pending): {:?}",
                po.frame,
                obligations.len(),
                po.cube
            );
            match self.solve_relative(po.frame, &po.cube, true, true) {
                Relative::Blocked(core) => {
                    let (pushed, core) = self.generalize(po.frame, core);
                    if self.opts.keep_obligations && pushed <= depth {
                        obligations.add(po.at_frame(pushed));
                    }
                    if pushed > depth && self.opts.eager_inf && self.try_push_inf(&core) {
                        self.add_inf_lemma(core);
                    } else {
                        self.add_lemma(pushed - 1, core);
                    }
                }
                Relative::Cti(model) => {
                    let (pred, pred_inputs) = model.expect("cti without a model");
                    obligations.add(ProofObligation::new(
                        po.frame - 1,
                        Rc::new(pred),
                        pred_inputs,
                        po.depth + 1,
                        Some(po.clone()),
                    ));
                    obligations.add(po);
                }
            }
        }
        BlockResult::Blocked
    }

    /// One relative-induction query: is there a predecessor in frame
    /// `frame - 1` (outside `cube` itself when `strengthen` is set) whose
    /// successor lands in `cube`? Propagation passes `strengthen =
    /// false`, the NOIND form.
    fn solve_relative(
        &mut self,
        frame: usize,
        cube: &Cube,
        strengthen: bool,
        model: bool,
    ) -> Relative {
        assert!(frame >= 1);
        self.maybe_rebuild(frame - 1);
        self.statistic.num_solve += 1;
        let act = {
            let solver = &mut self.solvers[frame - 1];
            let act = if strengthen {
                let act = solver.new_var();
                let mut cls = vec![-act];
                for l in cube.iter() {
                    cls.push(solver.lit(&self.aig, !*l, 0));
                }
                solver.add_clause(&cls);
                solver.assume(act);
                Some(act)
            } else {
                None
            };
            for l in cube.iter() {
                solver.assume_edge(&self.aig, *l, 1);
            }
            act
        };
        match self.solvers[frame - 1].solve() {
            SatResult::Unsat => {
                let mut core: Vec<AigEdge> = cube
                    .iter()
                    .filter(|l| self.solvers[frame - 1].failed_edge(**l, 1))
                    .copied()
                    .collect();
                if let Some(act) = act {
                    self.solvers[frame - 1].retire_act(act);
                }
                if self.aig.cube_subsume_init(&core) {
                    // The core alone no longer excludes the reset state;
                    // put back one literal of the original cube that does.
                    let sep = cube
                        .iter()
                        .find(|l| self.aig.latch_init(l.node_id()) == l.compl())
                        .copied()
                        .expect("blocked cube contains the reset state");
                    core.push(sep);
                }
                let core = Cube::from_lits(core);
                debug_assert!(!self.aig.cube_subsume_init(&core));
                Relative::Blocked(core)
            }
            SatResult::Sat => {
                let cti = if model {
                    let targets = self.aig.cube_next(cube);
                    Some(self.extract_witness(frame - 1, &targets))
                } else {
                    None
                };
                if let Some(act) = act {
                    self.solvers[frame - 1].retire_act(act);
                }
                Relative::Cti(cti)
            }
            SatResult::Unknown => unreachable!("unbudgeted query returned unknown"),
        }
    }

    /// Reads the model of `solvers[solver_idx]` and shrinks it with
    /// ternary simulation: latch literals that can go to X while every
    /// target gate keeps its witnessed value are dropped.
    fn extract_witness(&mut self, solver_idx: usize, targets: &[AigEdge]) -> (Cube, Cube) {
        let solver = &self.solvers[solver_idx];
        let mut primary = Vec::with_capacity(self.aig.num_inputs());
        let mut input_lits = Vec::new();
        for input in self.aig.inputs() {
            match solver.value_edge(input.into(), 0) {
                Some(v) => {
                    primary.push(TernaryValue::from(v));
                    input_lits.push(AigEdge::new(input, !v));
                }
                None => primary.push(TernaryValue::X),
            }
        }
        let mut latch_vals = Vec::with_capacity(self.aig.num_latchs());
        for l in self.aig.latchs() {
            latch_vals.push(match solver.value_edge(l.input.into(), 0) {
                Some(v) => TernaryValue::from(v),
                None => TernaryValue::X,
            });
        }
        let cube = self.generalize_by_ternary(primary, latch_vals, targets);
        (cube, Cube::from_lits(input_lits))
    }

    fn generalize_by_ternary(
        &self,
        primary: Vec<TernaryValue>,
        mut latch_vals: Vec<TernaryValue>,
        targets: &[AigEdge],
    ) -> Cube {
        let determined = |sim: &[TernaryValue]| {
            targets
                .iter()
                .all(|t| sim[t.node_id()].not_if(t.compl()) == TernaryValue::True)
        };
        let mut sim = self.aig.ternary_simulate(&primary, &latch_vals);
        debug_assert!(determined(&sim), "witness does not reproduce its targets");
        for i in 0..latch_vals.len() {
            if !latch_vals[i].is_determined() {
                continue;
            }
            let origin = latch_vals[i];
            let input = self.aig.latchs()[i].input;
            latch_vals[i] = TernaryValue::X;
            sim = self.aig.update_ternary_simulate(sim, input, TernaryValue::X);
            if !determined(&sim) {
                latch_vals[i] = origin;
                sim = self.aig.update_ternary_simulate(sim, input, origin);
            }
        }
        let mut lits = Vec::new();
        for (i, v) in latch_vals.iter().enumerate() {
            match v {
                TernaryValue::True => lits.push(AigEdge::new(self.aig.latchs()[i].input, false)),
                TernaryValue::False => lits.push(AigEdge::new(self.aig.latchs()[i].input, true)),
                TernaryValue::X => (),
            }
        }
        Cube::from_lits(lits)
    }

    /// Stores a lemma at `level`: it enters the frame trace (evicting
    /// lemmas it subsumes) and its clause reaches every solver at or
    /// below `level`.
    fn add_lemma(&mut self, level: usize, cube: Cube) {
        self.activity.pump_cube_activity(&cube);
        let lemma = Lemma::new(cube);
        let mut subsumed = 0;
        if let AddLemma::Added = self.frames.add_lemma(level, lemma.clone(), &mut subsumed) {
            self.statistic.num_lemma += 1;
            let clause = !lemma.cube();
            for i in 0..=level {
                self.solvers[i].add_edge_clause(&self.aig, &clause);
            }
        }
        self.statistic.num_subsumed += subsumed;
    }

    /// Admits a lemma proven inductive relative to F∞ into F∞; its
    /// clause holds in every frame from now on.
    fn add_inf_lemma(&mut self, cube: Cube) {
        let lemma = Lemma::new(cube);
        let mut subsumed = 0;
        let clause = !lemma.cube();
        self.frames.add_inf_lemma(lemma, &mut subsumed);
        self.statistic.num_lemma += 1;
        self.statistic.num_subsumed += subsumed;
        for solver in self.solvers.iter_mut() {
            solver.add_edge_clause(&self.aig, &clause);
        }
        self.inf_solver.add_edge_clause(&self.aig, &clause);
    }

    /// Is `cube` inductive relative to F∞ alone?
    fn try_push_inf(&mut self, cube: &Cube) -> bool {
        if self.inf_solver.num_queries() >= self.opts.rebuild_query_interval
            || self.inf_solver.dead_acts() >= self.opts.rebuild_dead_vars
        {
            self.statistic.num_rebuild += 1;
            self.inf_solver.reset();
            let clauses: Vec<Clause> = self.frames.inf().iter().map(|l| !l.cube()).collect();
            for clause in clauses {
                self.inf_solver.add_edge_clause(&self.aig, &clause);
            }
        }
        self.statistic.num_solve += 1;
        let solver = &mut self.inf_solver;
        let act = solver.new_var();
        let mut cls = vec![-act];
        for l in cube.iter() {
            cls.push(solver.lit(&self.aig, !*l, 0));
        }
        solver.add_clause(&cls);
        solver.assume(act);
        for l in cube.iter() {
            solver.assume_edge(&self.aig, *l, 1);
        }
        let blocked = solver.solve() == SatResult::Unsat;
        solver.retire_act(act);
        blocked
    }

    /// Pushes every lemma that also holds one frame later. Returns
    /// `Some(true)` when a frame drained empty (fixpoint), `None` on
    /// abort.
    fn propagate(&mut self) -> Option<bool> {
        for f in 1..self.depth() {
            if self.aborted() {
                return None;
            }
            let mut lemmas: Vec<Lemma> = self.frames[f].to_vec();
            lemmas.sort_by_key(|l| l.len());
            for lemma in lemmas {
                if !self.frames[f].contains(&lemma) {
                    continue;
                }
                if let Relative::Blocked(core) =
                    self.solve_relative(f + 1, lemma.cube(), false, false)
                {
                    if self.opts.eager_inf && f + 1 == self.depth() && self.try_push_inf(&core) {
                        self.add_inf_lemma(core);
                    } else {
                        self.add_lemma(f + 1, core);
                    }
                }
            }
            if self.frames[f].is_empty() {
                return Some(true);
            }
        }
        Some(false)
    }

    fn maybe_rebuild(&mut self, idx: usize) {
        let solver = &self.solvers[idx];
        if solver.num_queries() < self.opts.rebuild_query_interval
            && solver.dead_acts() < self.opts.rebuild_dead_vars
        {
            return;
        }
        self.statistic.num_rebuild += 1;
        debug!("pdr: rebuilding solver {idx}");
        self.solvers[idx].reset();
        if idx == 0 {
            let init: Vec<Clause> = self
                .aig
                .latchs()
                .iter()
                .map(|l| Clause::from([AigEdge::new(l.input, !l.init)].as_slice()))
                .collect();
            for clause in init {
                self.solvers[idx].add_edge_clause(&self.aig, &clause);
            }
        }
        let clauses: Vec<Clause> = self
            .frames
            .lemmas_at_or_above(idx)
            .map(|l| !l.cube())
            .collect();
        for clause in clauses {
            self.solvers[idx].add_edge_clause(&self.aig, &clause);
        }
    }

    fn build_witness(&self, po: Rc<ProofObligation>) -> Witness {
        let mut states = Vec::new();
        let mut inputs = Vec::new();
        let mut cur = Some(po);
        while let Some(p) = cur {
            states.push((*p.cube).clone());
            inputs.push(p.inputs.clone());
            cur = p.next.clone();
        }
        Witness { states, inputs }
    }
}

impl std::fmt::Debug for Pdr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pdr")
            .field("depth", &self.depth())
            .field("frames", &self.frames.level_sizes())
            .field("statistic", &self.statistic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Aig, Options};

    fn toggle_circuit() -> Aig {
        let mut aig = Aig::new();
        let l = aig.new_latch_node(false);
        aig.set_latch_next(l, AigEdge::new(l, true));
        aig.add_bad(l.into());
        aig
    }

    #[test]
    fn rejects_bad_config_before_running() {
        let aig = toggle_circuit();
        let opts = Options {
            bad: 7,
            ..Default::default()
        };
        assert!(matches!(Pdr::new(aig, opts), Err(PdrError::Options(_))));
    }

    #[test]
    fn interrupt_yields_unknown() {
        let mut pdr = Pdr::new(toggle_circuit(), Options::default()).unwrap();
        pdr.interrupt_handle()
            .store(true, std::sync::atomic::Ordering::Relaxed);
        assert_eq!(pdr.check(), CheckResult::Unknown);
    }

    #[test]
    fn statistics_survive_unknown() {
        let mut pdr = Pdr::new(toggle_circuit(), Options::default()).unwrap();
        pdr.interrupt_handle()
            .store(true, std::sync::atomic::Ordering::Relaxed);
        let _ = pdr.check();
        assert_eq!(pdr.statistic().num_lemma, 0);
    }

    #[test]
    fn generalized_cube_preserves_target_values() {
        let mut aig = Aig::new();
        let l0 = aig.new_latch_node(false);
        let l1 = aig.new_latch_node(false);
        let l2 = aig.new_latch_node(true);
        let g = aig.new_and_node(l0.into(), AigEdge::new(l1, true));
        aig.add_bad(g);
        let pdr = Pdr::new(aig, Options::default()).unwrap();
        let cube = pdr.generalize_by_ternary(
            vec![],
            vec![TernaryValue::True, TernaryValue::False, TernaryValue::True],
            &[g],
        );
        // l2 is outside the target cone and must be dropped; l0 and l1
        // both feed the gate and must survive.
        assert_eq!(
            &*cube,
            [AigEdge::new(l0, false), AigEdge::new(l1, true)].as_slice()
        );
        // Every state in the cube must still witness the target: flip
        // the dropped latch both ways and re-simulate concretely.
        for l2v in [false, true] {
            let sim = pdr.aig.simulate(&[], &[true, false, l2v]);
            assert!(sim[g.node_id()] ^ g.compl());
        }
    }

    #[test]
    fn lemmas_never_cover_reset_state() {
        let mut aig = Aig::new();
        let l0 = aig.new_latch_node(false);
        let l1 = aig.new_latch_node(false);
        aig.set_latch_next(l0, Aig::constant_edge(false));
        aig.set_latch_next(l1, l0.into());
        aig.add_bad(l1.into());
        let mut pdr = Pdr::new(aig, Options::default()).unwrap();
        match pdr.check() {
            CheckResult::Safe { invariant } => {
                for cube in invariant {
                    assert!(!pdr.aig.cube_subsume_init(&cube));
                }
            }
            other => panic!("expected safe, got {other:?}"),
        }
    }
}
