//! Counters accumulated during a check, reported on every exit path
//! (including UNKNOWN aborts).

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Statistic {
    /// SAT boundary queries, all solvers combined.
    pub num_solve: usize,
    /// Bad-state queries at the top frame.
    pub num_get_bad: usize,
    /// Proof obligations processed.
    pub num_obligation: usize,
    /// Literal-drop attempts during generalization.
    pub num_mic_drop: usize,
    pub num_mic_keep: usize,
    /// Lemmas stored into the frame trace.
    pub num_lemma: usize,
    /// Lemmas discarded because a stronger one subsumed them.
    pub num_subsumed: usize,
    /// Solver rebuilds triggered by growth thresholds.
    pub num_rebuild: usize,
    pub block_time: Duration,
    pub propagate_time: Duration,
}

impl Display for Statistic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "sat queries: {}", self.num_solve)?;
        writeln!(f, "bad-state queries: {}", self.num_get_bad)?;
        writeln!(f, "obligations: {}", self.num_obligation)?;
        writeln!(
            f,
            "mic drops/keeps: {}/{}",
            self.num_mic_drop, self.num_mic_keep
        )?;
        writeln!(
            f,
            "lemmas stored: {} (subsumed away: {})",
            self.num_lemma, self.num_subsumed
        )?;
        writeln!(f, "solver rebuilds: {}", self.num_rebuild)?;
        writeln!(f, "block time: {:?}", self.block_time)?;
        write!(f, "propagate time: {:?}", self.propagate_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_total() {
        let mut s = Statistic::default();
        s.num_solve = 3;
        s.num_lemma = 1;
        let out = s.to_string();
        assert!(out.contains("sat queries: 3"));
        assert!(out.contains("lemmas stored: 1"));
    }
}
