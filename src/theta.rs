//! Posterior-mean class probability per list position. Ports `train.c`'s
//! `get_theta`.

use crate::posterior::Params;
use crate::rule::RuleLibrary;
use crate::ruleset::RuleList;

/// `theta[j] = (n1_j + alpha[1]) / (n1_j + n0_j + alpha[0] + alpha[1])`
/// for each position `j`, where `n1_j`/`n0_j` are the class-1/class-0
/// sample counts captured at that position.
pub fn posterior_mean(rl: &RuleList, library: &RuleLibrary, params: &Params) -> Vec<f64> {
    let labels1 = &library.labels[1];
    rl.entries
        .iter()
        .map(|entry| {
            let (_, n1) = entry.captures.and_with_popcount(labels1);
            let n1 = n1 as f64;
            let n0 = entry.ncaptured as f64 - n1;
            (n1 + params.alpha[1]) / (n0 + n1 + params.alpha[0] + params.alpha[1])
        })
        .collect()
}
