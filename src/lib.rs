//! Core search engine for Scalable Bayesian Rule Lists.
//!
//! Given a fixed library of pre-mined boolean rules over a labeled
//! dataset, this crate searches the space of ordered rule lists for one
//! maximizing the log posterior of a hierarchical Poisson/
//! Dirichlet-multinomial generative model. It implements three coupled
//! pieces — the posterior evaluator (with a prefix upper bound used to
//! prune search), the reversible add/delete/swap proposal kernel, and
//! the MCMC/simulated-annealing search drivers sharing one `propose`
//! routine — on top of a bitvector-based rule-capture primitive.
//!
//! Rule mining, dataset ingestion, CLI plumbing, result serialization,
//! held-out prediction, and cross-validation are out of scope; see
//! [`RuleLibrary`], [`config::EngineConfig`], and [`search::train`] for
//! the boundary this crate consumes and produces.

pub mod bitvector;
pub mod config;
pub mod error;
pub mod posterior;
pub mod proposal;
pub mod rng;
pub mod rule;
pub mod ruleset;
pub mod search;
pub mod theta;

pub use bitvector::BitVector;
pub use config::{EngineConfig, TrainedModel};
pub use error::{Result, TrainError};
pub use posterior::{Params, PosteriorEvaluator, PosteriorTables};
pub use proposal::{Move, Proposal, ProposalKernel};
pub use rng::RngFacade;
pub use rule::{Rule, RuleLibrary};
pub use ruleset::{Entry, RuleList};
pub use search::{run_mcmc, run_simulated_annealing, train, Acceptance};

#[cfg(test)]
mod tests {
    use super::*;

    /// Toy partition scored exactly, with theta matching the closed form.
    #[test]
    fn toy_partition_end_to_end() {
        let labels = [BitVector::from_indices(4, [0, 1]), BitVector::from_indices(4, [2, 3])];
        let r0 = Rule::new(0, 1, BitVector::from_indices(4, [0, 2])).unwrap();
        let r1 = Rule::new(1, 1, BitVector::from_indices(4, [1, 3])).unwrap();
        let default = Rule::new(2, 0, BitVector::from_indices(4, [0, 1, 2, 3])).unwrap();
        let library = RuleLibrary::new(vec![r0, r1, default], labels, 4).unwrap();

        let config = EngineConfig {
            lambda: 1.0,
            eta: 1.0,
            alpha: [1.0, 1.0],
            iters: 0,
            init_size: 1,
            nchain: 1,
            threshold: 0.5,
        };

        let mut rng = RngFacade::new(Some(0));
        let model = train(&library, &config, &mut rng).unwrap();

        assert_eq!(model.rule_ids.len(), 2); // init_size=1 + default
        assert_eq!(model.theta.len(), 2);

        let rl = RuleList::rebuild(&model.rule_ids, &library).unwrap();
        for (entry, &theta) in rl.entries.iter().zip(model.theta.iter()) {
            let (_, n1) = entry.captures.and_with_popcount(&library.labels[1]);
            let n1 = n1 as f64;
            let n0 = entry.ncaptured as f64 - n1;
            let expected = (n1 + 1.0) / (n0 + n1 + 2.0);
            approx::assert_relative_eq!(theta, expected, epsilon = 1e-12);
        }
    }
}
