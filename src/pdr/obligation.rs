//! Proof obligations: cubes that must be blocked at a given frame.
//!
//! Obligations form a rooted forest through their successor links; the
//! forest is only walked when a check fails, to reconstruct the
//! counterexample trace from the reset state up to the violation.

use crate::cube::Cube;
use crate::options::ObligationOrder;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug)]
pub struct ProofObligation {
    pub frame: usize,
    pub cube: Rc<Cube>,
    /// Input assignment under which this state steps into the successor
    /// state (or realizes the bad output, for the root obligation).
    pub inputs: Cube,
    /// Distance, in obligations, from the root bad cube.
    pub depth: usize,
    pub next: Option<Rc<ProofObligation>>,
}

impl ProofObligation {
    pub fn new(
        frame: usize,
        cube: Rc<Cube>,
        inputs: Cube,
        depth: usize,
        next: Option<Rc<ProofObligation>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            frame,
            cube,
            inputs,
            depth,
            next,
        })
    }

    /// The same obligation, rescheduled at a higher frame.
    pub fn at_frame(self: &Rc<Self>, frame: usize) -> Rc<Self> {
        Rc::new(Self {
            frame,
            cube: self.cube.clone(),
            inputs: self.inputs.clone(),
            depth: self.depth,
            next: self.next.clone(),
        })
    }
}

/// Pending obligations bucketed by frame. The lowest frame is always
/// served first; within one frame the traversal order is a policy.
#[derive(Debug, Default)]
pub struct ObligationQueue {
    buckets: Vec<VecDeque<Rc<ProofObligation>>>,
    order: ObligationOrder,
    len: usize,
}

impl ObligationQueue {
    pub fn new(order: ObligationOrder) -> Self {
        Self {
            buckets: Vec::new(),
            order,
            len: 0,
        }
    }

    pub fn add(&mut self, po: Rc<ProofObligation>) {
        if self.buckets.len() <= po.frame {
            self.buckets.resize_with(po.frame + 1, VecDeque::new);
        }
        self.buckets[po.frame].push_back(po);
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<Rc<ProofObligation>> {
        for bucket in self.buckets.iter_mut() {
            if !bucket.is_empty() {
                self.len -= 1;
                return match self.order {
                    ObligationOrder::Stack => bucket.pop_back(),
                    ObligationOrder::Queue => bucket.pop_front(),
                };
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.len
    }
}
