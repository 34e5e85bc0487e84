//! External parameter bundle and the crate's public output boundary to
//! prediction/serialization collaborators.

use serde::Deserialize;

use crate::error::{Result, TrainError};

/// Training hyperparameters, matching `train.c`'s `params_t` plus the
/// loop-control fields (`iters`, `init_size`, `nchain`, `threshold`).
/// Deserializable so a caller can load it from whatever config format it
/// uses externally; this crate only ever consumes the parsed struct.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub lambda: f64,
    pub eta: f64,
    pub alpha: [f64; 2],
    pub iters: usize,
    pub init_size: usize,
    pub nchain: usize,
    pub threshold: f64,
}

impl EngineConfig {
    /// Validates against a concrete library size.
    pub fn validate(&self, nrules: usize) -> Result<()> {
        if nrules < 2 {
            return Err(TrainError::InvalidParams {
                detail: format!("nrules must be >= 2, got {nrules}"),
            });
        }
        if self.init_size >= nrules {
            return Err(TrainError::InvalidParams {
                detail: format!("init_size ({}) must be < nrules ({nrules})", self.init_size),
            });
        }
        if self.lambda <= 0.0 || self.eta <= 0.0 {
            return Err(TrainError::InvalidParams {
                detail: "lambda and eta must be positive".to_string(),
            });
        }
        if self.alpha[0] <= 0.0 || self.alpha[1] <= 0.0 {
            return Err(TrainError::InvalidParams {
                detail: "alpha[0] and alpha[1] must be positive".to_string(),
            });
        }
        if self.nchain < 1 {
            return Err(TrainError::InvalidParams { detail: "nchain must be >= 1".to_string() });
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(TrainError::InvalidParams {
                detail: format!("threshold ({}) must be in [0, 1]", self.threshold),
            });
        }
        Ok(())
    }
}

/// The engine's sole output: the final rule list (as library ids, default
/// last) and its per-position posterior-mean class probability.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub rule_ids: Vec<usize>,
    pub theta: Vec<f64>,
    pub log_posterior: f64,
}
