//! The reversible proposal kernel: picks a move (add/delete/swap) and
//! returns it together with the forward/reverse jump ratio the
//! acceptance predicates need. Ports `train.c`'s `ruleset_proposal`.

use std::collections::HashSet;

use crate::rng::RngFacade;
use crate::rule::RuleLibrary;
use crate::ruleset::RuleList;

/// Below this many rules remaining outside the list, sample the
/// complement directly instead of by rejection, to bound expected draws
/// when the list is nearly full.
const DIRECT_SAMPLE_THRESHOLD: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Swap,
    Add,
    Delete,
}

/// A single proposed move: which positions/rule it touches, and the
/// jump ratio entering the acceptance test as `log(jump_ratio)`.
#[derive(Debug, Clone, Copy)]
pub struct Proposal {
    pub mv: Move,
    pub ndx1: usize,
    pub ndx2: usize,
    pub jump_ratio: f64,
}

pub struct ProposalKernel;

impl ProposalKernel {
    /// Draws a move for a list of `n_rules` positions against a library
    /// of `nrules` rules. Never targets the default position.
    pub fn propose(rl: &RuleList, library: &RuleLibrary, rng: &mut RngFacade) -> Proposal {
        let n_rules = rl.n_rules();
        let nrules = library.nrules();
        let (move_probs, jump_ratios) = regime_tables(n_rules, nrules);

        let u = rng.uniform01();
        if u < move_probs[0] {
            let (ndx1, ndx2) = distinct_non_default_positions(n_rules, rng);
            Proposal { mv: Move::Swap, ndx1, ndx2, jump_ratio: jump_ratios[0] }
        } else if u < move_probs[0] + move_probs[1] {
            let rule_id = pick_random_rule(rl, library, rng);
            let position = rng.uniform_index(n_rules);
            let jump_ratio = jump_ratios[1] * (nrules as f64 - 1.0 - n_rules as f64);
            Proposal { mv: Move::Add, ndx1: rule_id, ndx2: position, jump_ratio }
        } else {
            let last = n_rules - 1;
            let position = rng.uniform_index(last);
            let jump_ratio = jump_ratios[2] * (nrules as f64 - n_rules as f64);
            Proposal { mv: Move::Delete, ndx1: position, ndx2: 0, jump_ratio }
        }
    }
}

/// Move-probability and base-jump-ratio tables, keyed by the
/// `(n_rules, nrules)` regime, matching `train.c`'s `MOVEPROBS`/
/// `JUMPRATIOS`. The `n_rules == nrules - 1` regime tabulates a nonzero
/// add jump ratio that `propose` never actually reaches — preserved
/// rather than simplified away, since it's the original's table.
fn regime_tables(n_rules: usize, nrules: usize) -> ([f64; 3], [f64; 3]) {
    if n_rules == 1 {
        ([0.0, 1.0, 0.0], [0.0, 0.5, 0.0])
    } else if n_rules == 2 {
        ([0.0, 0.5, 0.5], [0.0, 2.0 / 3.0, 2.0])
    } else if n_rules == nrules.wrapping_sub(1) {
        ([0.5, 0.0, 0.5], [1.0, 0.0, 2.0 / 3.0])
    } else if n_rules == nrules.wrapping_sub(2) {
        ([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], [1.0, 1.5, 1.0])
    } else {
        ([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], [1.0, 1.0, 1.0])
    }
}

fn distinct_non_default_positions(n_rules: usize, rng: &mut RngFacade) -> (usize, usize) {
    let last = n_rules - 1;
    let idx1 = rng.uniform_index(last);
    let mut idx2 = rng.uniform_index(last);
    while idx2 == idx1 {
        idx2 = rng.uniform_index(last);
    }
    (idx1, idx2)
}

/// Picks a library rule id not currently in `rl`, uniformly at random.
fn pick_random_rule(rl: &RuleList, library: &RuleLibrary, rng: &mut RngFacade) -> usize {
    let nrules = library.nrules();
    let current: HashSet<usize> = rl.entries.iter().map(|e| e.rule_id).collect();
    let remaining = nrules - current.len();

    if remaining <= DIRECT_SAMPLE_THRESHOLD {
        let complement: Vec<usize> = (0..nrules).filter(|id| !current.contains(id)).collect();
        complement[rng.uniform_index(complement.len())]
    } else {
        loop {
            let candidate = rng.uniform_index(nrules);
            if !current.contains(&candidate) {
                return candidate;
            }
        }
    }
}
