//! Engine configuration and strategy selection.

use crate::Aig;
use std::time::Duration;
use thiserror::Error;

/// Traversal order for pending proof obligations within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObligationOrder {
    /// Depth-first: newest obligation first.
    #[default]
    Stack,
    /// Breadth-first: oldest obligation first.
    Queue,
}

/// Literal ordering used while generalizing a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiteralOrder {
    /// Static gate-id order.
    Static,
    /// Dynamic ordering favoring literals rarely seen in kept lemmas.
    #[default]
    Activity,
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Index of the checked property in [`Aig::bads`] (falling back to
    /// [`Aig::outputs`] when no bad gate is declared).
    pub bad: usize,
    /// Wall-clock budget; exceeded checks return
    /// [`CheckResult::Unknown`](crate::CheckResult).
    pub timeout: Option<Duration>,
    /// Conflict budget for the outermost bad-state query. An
    /// indeterminate limited query surfaces as Unknown.
    pub conflict_budget: Option<i32>,
    pub obligation_order: ObligationOrder,
    pub literal_order: LiteralOrder,
    /// Multiplicative activity decay, in (0, 1].
    pub activity_decay: f64,
    /// Carry a blocked obligation one frame up instead of discarding it.
    pub keep_obligations: bool,
    /// Eagerly admit lemmas inductive relative to F∞ into F∞.
    pub eager_inf: bool,
    /// Rebuild a frame solver after this many queries.
    pub rebuild_query_interval: usize,
    /// Rebuild a frame solver once this many retired activation
    /// variables have accumulated.
    pub rebuild_dead_vars: usize,
    /// Re-check the inductive invariant / replay the witness before
    /// reporting a verdict.
    pub verify: bool,
    /// Reconstruct a counterexample trace on UNSAFE.
    pub witness: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bad: 0,
            timeout: None,
            conflict_budget: None,
            obligation_order: ObligationOrder::default(),
            literal_order: LiteralOrder::default(),
            activity_decay: 0.99,
            keep_obligations: true,
            eager_inf: false,
            rebuild_query_interval: 5000,
            rebuild_dead_vars: 500,
            verify: true,
            witness: true,
        }
    }
}

/// Configuration errors, raised before any engine state is created.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptionsError {
    #[error("property index {index} out of range: the model declares {count} checkable outputs")]
    BadIndexOutOfRange { index: usize, count: usize },
    #[error("the model declares no bad gate and no output to check")]
    NoProperty,
    #[error("activity decay {0} outside (0, 1]")]
    InvalidActivityDecay(f64),
    #[error("conflict budget must be positive")]
    InvalidConflictBudget,
    #[error("solver rebuild thresholds must be positive")]
    InvalidRebuildThreshold,
}

impl Options {
    pub fn validate(&self, aig: &Aig) -> Result<(), OptionsError> {
        let count = if aig.bads().is_empty() {
            aig.outputs().len()
        } else {
            aig.bads().len()
        };
        if count == 0 {
            return Err(OptionsError::NoProperty);
        }
        if self.bad >= count {
            return Err(OptionsError::BadIndexOutOfRange {
                index: self.bad,
                count,
            });
        }
        if !(self.activity_decay > 0.0 && self.activity_decay <= 1.0) {
            return Err(OptionsError::InvalidActivityDecay(self.activity_decay));
        }
        if matches!(self.conflict_budget, Some(b) if b <= 0) {
            return Err(OptionsError::InvalidConflictBudget);
        }
        if self.rebuild_query_interval == 0 || self.rebuild_dead_vars == 0 {
            return Err(OptionsError::InvalidRebuildThreshold);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Aig;

    fn one_latch() -> Aig {
        let mut aig = Aig::new();
        let l = aig.new_latch_node(false);
        aig.set_latch_next(l, l.into());
        aig.add_bad(l.into());
        aig
    }

    #[test]
    fn default_options_validate() {
        Options::default().validate(&one_latch()).unwrap();
    }

    #[test]
    fn rejects_out_of_range_property() {
        let opts = Options {
            bad: 3,
            ..Default::default()
        };
        assert_eq!(
            opts.validate(&one_latch()),
            Err(OptionsError::BadIndexOutOfRange { index: 3, count: 1 })
        );
    }

    #[test]
    fn rejects_missing_property() {
        let mut aig = Aig::new();
        let l = aig.new_latch_node(false);
        aig.set_latch_next(l, l.into());
        assert_eq!(
            Options::default().validate(&aig),
            Err(OptionsError::NoProperty)
        );
    }

    #[test]
    fn rejects_bad_decay() {
        let opts = Options {
            activity_decay: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(&one_latch()),
            Err(OptionsError::InvalidActivityDecay(_))
        ));
    }
}
