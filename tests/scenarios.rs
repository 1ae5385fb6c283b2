//! End-to-end checks on small hand-built circuits, exercising the whole
//! pipeline: encoding, blocking, generalization, propagation and the
//! final certification of both verdicts.

use aig_pdr::{
    Aig, AigEdge, CheckResult, LiteralOrder, ObligationOrder, Options, Pdr,
};
use std::time::Duration;

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// next(l) = l, init 0, bad = l: l can never rise.
fn stuck_low() -> Aig {
    let mut aig = Aig::new();
    let l = aig.new_latch_node(false);
    aig.set_latch_next(l, l.into());
    aig.add_bad(l.into());
    aig
}

/// next(l) = !l, init 0, bad = l: violated at step 1.
fn toggle() -> Aig {
    let mut aig = Aig::new();
    let l = aig.new_latch_node(false);
    aig.set_latch_next(l, AigEdge::new(l, true));
    aig.add_bad(l.into());
    aig
}

/// Two-stage shift register whose feed is forced to constant 0; the
/// unused primary input stays in the model. Safe, but blocking `l1`
/// requires a lemma about `l0` one frame earlier.
fn dead_shift_register() -> Aig {
    let mut aig = Aig::new();
    let i = aig.new_input_node();
    let l0 = aig.new_latch_node(false);
    let l1 = aig.new_latch_node(false);
    let feed = aig.new_and_node(i.into(), Aig::constant_edge(false));
    aig.set_latch_next(l0, feed);
    aig.set_latch_next(l1, l0.into());
    aig.add_bad(l1.into());
    aig
}

#[test]
fn safe_self_loop() {
    init_log();
    let mut pdr = Pdr::new(stuck_low(), Options::default()).unwrap();
    match pdr.check() {
        CheckResult::Safe { invariant } => assert!(!invariant.is_empty()),
        other => panic!("expected safe, got {other:?}"),
    }
    assert!(pdr.statistic().num_lemma >= 1);
}

#[test]
fn unsafe_toggle_with_depth_one_witness() {
    init_log();
    let mut pdr = Pdr::new(toggle(), Options::default()).unwrap();
    match pdr.check() {
        CheckResult::Unsafe { witness } => {
            let witness = witness.expect("witness requested");
            assert_eq!(witness.depth(), 1);
            assert_eq!(witness.states.len(), witness.inputs.len());
        }
        other => panic!("expected unsafe, got {other:?}"),
    }
}

#[test]
fn safe_shift_register_propagates_to_fixpoint() {
    init_log();
    let mut pdr = Pdr::new(dead_shift_register(), Options::default()).unwrap();
    match pdr.check() {
        CheckResult::Safe { invariant } => {
            // The invariant needs lemmas over both stages.
            assert!(invariant.len() >= 2);
        }
        other => panic!("expected safe, got {other:?}"),
    }
}

#[test]
fn unsafe_through_a_gate_and_an_input() {
    init_log();
    // next(l) = i: any adversarial input violates bad = l at step 1.
    let mut aig = Aig::new();
    let i = aig.new_input_node();
    let l = aig.new_latch_node(false);
    aig.set_latch_next(l, i.into());
    aig.add_bad(l.into());
    let mut pdr = Pdr::new(aig, Options::default()).unwrap();
    match pdr.check() {
        CheckResult::Unsafe { witness } => {
            let witness = witness.expect("witness requested");
            assert_eq!(witness.depth(), 1);
            // The first step must drive the input high.
            assert!(witness.inputs[0].iter().any(|lit| !lit.compl()));
        }
        other => panic!("expected unsafe, got {other:?}"),
    }
}

#[test]
fn safe_conjunction_of_latches() {
    init_log();
    let mut aig = Aig::new();
    let l0 = aig.new_latch_node(false);
    let l1 = aig.new_latch_node(false);
    aig.set_latch_next(l0, l0.into());
    aig.set_latch_next(l1, l1.into());
    let both = aig.new_and_node(l0.into(), l1.into());
    aig.add_bad(both);
    let mut pdr = Pdr::new(aig, Options::default()).unwrap();
    match pdr.check() {
        CheckResult::Safe { invariant } => {
            // Generalization should block each stuck-low latch alone.
            assert!(invariant.iter().all(|cube| cube.len() <= 2));
        }
        other => panic!("expected safe, got {other:?}"),
    }
}

#[test]
fn verdicts_are_stable_across_policies() {
    init_log();
    for obligation_order in [ObligationOrder::Stack, ObligationOrder::Queue] {
        for literal_order in [LiteralOrder::Static, LiteralOrder::Activity] {
            for keep_obligations in [false, true] {
                for eager_inf in [false, true] {
                    let opts = Options {
                        obligation_order,
                        literal_order,
                        keep_obligations,
                        eager_inf,
                        ..Default::default()
                    };
                    let mut safe = Pdr::new(dead_shift_register(), opts.clone()).unwrap();
                    assert!(
                        matches!(safe.check(), CheckResult::Safe { .. }),
                        "safe circuit flipped under {opts:?}"
                    );
                    let mut unsafe_ = Pdr::new(toggle(), opts.clone()).unwrap();
                    assert!(
                        matches!(unsafe_.check(), CheckResult::Unsafe { .. }),
                        "unsafe circuit flipped under {opts:?}"
                    );
                }
            }
        }
    }
}

#[test]
fn zero_timeout_reports_unknown() {
    init_log();
    let opts = Options {
        timeout: Some(Duration::ZERO),
        ..Default::default()
    };
    let mut pdr = Pdr::new(stuck_low(), opts).unwrap();
    assert_eq!(pdr.check(), CheckResult::Unknown);
}

#[test]
fn conflict_budget_does_not_change_easy_verdicts() {
    init_log();
    let opts = Options {
        conflict_budget: Some(1_000_000),
        ..Default::default()
    };
    let mut pdr = Pdr::new(stuck_low(), opts.clone()).unwrap();
    assert!(matches!(pdr.check(), CheckResult::Safe { .. }));
    let mut pdr = Pdr::new(toggle(), opts).unwrap();
    assert!(matches!(pdr.check(), CheckResult::Unsafe { .. }));
}

#[test]
fn witness_can_be_suppressed() {
    init_log();
    let opts = Options {
        witness: false,
        ..Default::default()
    };
    let mut pdr = Pdr::new(toggle(), opts).unwrap();
    assert_eq!(pdr.check(), CheckResult::Unsafe { witness: None });
}

#[test]
fn fallback_to_outputs_when_no_bad_gate() {
    init_log();
    let mut aig = Aig::new();
    let l = aig.new_latch_node(false);
    aig.set_latch_next(l, l.into());
    aig.add_output(l.into());
    let mut pdr = Pdr::new(aig, Options::default()).unwrap();
    assert!(matches!(pdr.check(), CheckResult::Safe { .. }));
}

#[test]
fn tight_rebuild_thresholds_preserve_verdicts() {
    init_log();
    let opts = Options {
        rebuild_query_interval: 2,
        rebuild_dead_vars: 1,
        ..Default::default()
    };
    let mut pdr = Pdr::new(dead_shift_register(), opts.clone()).unwrap();
    assert!(matches!(pdr.check(), CheckResult::Safe { .. }));
    assert!(pdr.statistic().num_rebuild > 0);
    let mut pdr = Pdr::new(toggle(), opts).unwrap();
    assert!(matches!(pdr.check(), CheckResult::Unsafe { .. }));
}
