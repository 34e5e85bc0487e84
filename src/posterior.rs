//! Exact log-posterior evaluation and the prefix upper bound used to
//! prune proposals. Ports `train.c`'s `compute_log_posterior`.

use crate::error::{Result, TrainError};
use crate::rng::RngFacade;
use crate::rule::{RuleLibrary, MAX_CARDINALITY};
use crate::ruleset::RuleList;

/// Hyperparameters of the hierarchical Poisson/Dirichlet-multinomial
/// model, matching `train.c`'s `params_t`.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    pub lambda: f64,
    pub eta: f64,
    pub alpha: [f64; 2],
}

impl Params {
    pub fn validate(&self) -> Result<()> {
        if self.lambda <= 0.0 || self.eta <= 0.0 || self.alpha[0] <= 0.0 || self.alpha[1] <= 0.0 {
            return Err(TrainError::InvalidParams {
                detail: "lambda, eta, and alpha must all be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Cached Poisson tables, built once per training run and then shared by
/// reference instead of recomputed per proposal.
pub struct PosteriorTables {
    pub log_lambda_pmf: Vec<f64>,
    pub log_eta_pmf: [f64; MAX_CARDINALITY + 1],
    pub eta_norm: f64,
}

impl PosteriorTables {
    pub fn new(params: &Params, nrules: usize) -> Result<Self> {
        params.validate()?;

        let mut log_lambda_pmf = Vec::with_capacity(nrules);
        for k in 0..nrules {
            let v = RngFacade::poisson_pmf(k as u64, params.lambda).ln();
            check_finite(v, "log_lambda_pmf")?;
            log_lambda_pmf.push(v);
        }

        let mut log_eta_pmf = [0.0f64; MAX_CARDINALITY + 1];
        for (c, slot) in log_eta_pmf.iter_mut().enumerate() {
            let v = RngFacade::poisson_pmf(c as u64, params.eta).ln();
            check_finite(v, "log_eta_pmf")?;
            *slot = v;
        }

        // For simplicity, as the original does, assume every cardinality
        // up to MAX_CARDINALITY appears among the mined rules.
        let eta_norm =
            RngFacade::poisson_cdf(MAX_CARDINALITY as u64, params.eta) - RngFacade::poisson_pmf(0, params.eta);
        check_finite(eta_norm, "eta_norm")?;

        Ok(PosteriorTables { log_lambda_pmf, log_eta_pmf, eta_norm })
    }
}

fn check_finite(v: f64, what: &str) -> Result<()> {
    if v.is_nan() {
        return Err(TrainError::NumericFailure { detail: format!("{what} is NaN") });
    }
    Ok(())
}

/// Scores rule lists against a fixed library and hyperparameters.
pub struct PosteriorEvaluator<'a> {
    tables: &'a PosteriorTables,
    library: &'a RuleLibrary,
    params: &'a Params,
}

impl<'a> PosteriorEvaluator<'a> {
    pub fn new(tables: &'a PosteriorTables, library: &'a RuleLibrary, params: &'a Params) -> Self {
        PosteriorEvaluator { tables, library, params }
    }

    /// Returns `(log_posterior, prefix_bound)`. `length4bound = -1`
    /// disables the prefix bound accumulation (it still returns a value,
    /// just one computed over an empty prefix, matching the original's
    /// sentinel convention).
    pub fn evaluate(&self, rl: &RuleList, length4bound: i64) -> Result<(f64, f64)> {
        let m = rl.n_rules() - 1; // non-default position count

        let mut card_count = self.library.cardinality_counts();
        let mut norm_constant = self.tables.eta_norm;

        let mut log_prior = *self
            .tables
            .log_lambda_pmf
            .get(m)
            .ok_or_else(|| TrainError::NumericFailure { detail: format!("m={m} exceeds lambda table") })?;

        // `train.c::compute_log_posterior` indexes the lambda table by
        // floor(lambda) rather than by m when the list is no longer than
        // the lambda mode; kept as-is rather than reconciled with the
        // `m > lambda` branch above.
        let mut prefix_prior = if (m as f64) > self.params.lambda {
            log_prior
        } else {
            let idx = self.params.lambda.floor() as usize;
            *self
                .tables
                .log_lambda_pmf
                .get(idx)
                .ok_or_else(|| TrainError::NumericFailure { detail: format!("floor(lambda)={idx} exceeds lambda table") })?
        };

        for i in 0..m {
            if norm_constant.is_nan() || norm_constant <= 0.0 {
                return Err(TrainError::NumericFailure {
                    detail: format!("norm_constant non-positive or NaN at position {i}"),
                });
            }
            let rule = self.library.rule(rl.entries[i].rule_id);
            let li = rule.cardinality;
            let ln_norm = norm_constant.ln();

            log_prior += self.tables.log_eta_pmf[li] - ln_norm;
            check_finite(log_prior, "log_prior")?;
            log_prior -= (card_count[li] as f64).ln();
            check_finite(log_prior, "log_prior")?;

            if (i as i64) <= length4bound {
                prefix_prior += self.tables.log_eta_pmf[li] - ln_norm - (card_count[li] as f64).ln();
            }

            card_count[li] -= 1;
            if card_count[li] == 0 {
                norm_constant -= self.tables.log_eta_pmf[li].exp();
            }
        }

        let labels1 = &self.library.labels[1];
        let mut log_lik = 0.0;
        let mut prefix_log_lik = 0.0;
        let mut left0 = self.library.labels[0].popcount() as f64;
        let mut left1 = self.library.labels[1].popcount() as f64;

        for (j, entry) in rl.entries.iter().enumerate() {
            let (_, n1) = entry.captures.and_with_popcount(labels1);
            let n1 = n1 as f64;
            let n0 = entry.ncaptured as f64 - n1;

            log_lik += RngFacade::ln_gamma(n0 + self.params.alpha[0])
                + RngFacade::ln_gamma(n1 + self.params.alpha[1])
                - RngFacade::ln_gamma(n0 + n1 + self.params.alpha[0] + self.params.alpha[1]);

            left0 -= n0;
            left1 -= n1;

            if (j as i64) <= length4bound {
                prefix_log_lik +=
                    RngFacade::ln_gamma(n0 + 1.0) + RngFacade::ln_gamma(n1 + 1.0) - RngFacade::ln_gamma(n0 + n1 + 2.0);
                if j as i64 == length4bound {
                    // ln Gamma(1) terms are exactly zero and are dropped,
                    // same as in `train.c`.
                    prefix_log_lik += RngFacade::ln_gamma(left0 + 1.0) - RngFacade::ln_gamma(left0 + 2.0)
                        + RngFacade::ln_gamma(left1 + 1.0)
                        - RngFacade::ln_gamma(left1 + 2.0);
                }
            }
        }

        let log_posterior = log_prior + log_lik;
        let prefix_bound = prefix_prior + prefix_log_lik;
        Ok((log_posterior, prefix_bound))
    }
}
