//! The ordered rule list (`ruleset_t` in the original): the object the
//! proposal kernel mutates and the posterior evaluator scores.

use crate::bitvector::BitVector;
use crate::error::{Result, TrainError};
use crate::rng::RngFacade;
use crate::rule::RuleLibrary;

/// One position in the list: which rule, and the samples it captures
/// under the I2 cascade (first match wins).
#[derive(Debug, Clone)]
pub struct Entry {
    pub rule_id: usize,
    pub captures: BitVector,
    pub ncaptured: usize,
}

/// An ordered rule list. `entries.last()` is always the default rule
/// (I1); positions `0..entries.len()-1` hold distinct non-default rule
/// ids (I4).
#[derive(Debug, Clone)]
pub struct RuleList {
    pub n_samples: usize,
    pub entries: Vec<Entry>,
}

impl RuleList {
    pub fn n_rules(&self) -> usize {
        self.entries.len()
    }

    /// Builds a list of length `init_size + 1` from `init_size` distinct
    /// non-default rules drawn uniformly without replacement, in a
    /// uniformly random order, plus the default rule at the end. Ports
    /// `train.c`'s `create_random_ruleset`.
    pub fn create_random(
        init_size: usize,
        library: &RuleLibrary,
        rng: &mut RngFacade,
    ) -> Result<Self> {
        let non_default: Vec<usize> = library.non_default_ids().collect();
        if init_size > non_default.len() {
            return Err(TrainError::InvalidParams {
                detail: format!(
                    "init_size {init_size} exceeds available non-default rules {}",
                    non_default.len()
                ),
            });
        }
        let picked_idx = rng.sample_without_replacement(non_default.len(), init_size);
        let mut ids: Vec<usize> = picked_idx.into_iter().map(|i| non_default[i]).collect();
        rng.shuffle(&mut ids);
        ids.push(library.default_rule_id);

        Self::build_from_ids(&ids, library)
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn add(&mut self, library: &RuleLibrary, rule_id: usize, position: usize) -> Result<()> {
        if position >= self.entries.len() {
            return Err(TrainError::InvalidParams {
                detail: format!(
                    "add position {position} must precede the default rule (n_rules={})",
                    self.entries.len()
                ),
            });
        }
        let placeholder = Entry { rule_id, captures: BitVector::new(self.n_samples), ncaptured: 0 };
        self.entries.insert(position, placeholder);
        self.recompute_from(position, library);
        Ok(())
    }

    pub fn delete(&mut self, library: &RuleLibrary, position: usize) -> Result<()> {
        if position + 1 >= self.entries.len() {
            return Err(TrainError::InvalidParams {
                detail: format!(
                    "delete position {position} must be a non-default position (n_rules={})",
                    self.entries.len()
                ),
            });
        }
        self.entries.remove(position);
        self.recompute_from(position, library);
        Ok(())
    }

    pub fn swap_any(&mut self, library: &RuleLibrary, i: usize, j: usize) -> Result<()> {
        let last = self.entries.len() - 1;
        if i == j || i >= last || j >= last {
            return Err(TrainError::InvalidParams {
                detail: format!("invalid swap positions ({i}, {j}) for n_rules={}", self.entries.len()),
            });
        }
        self.entries.swap(i, j);
        self.recompute_from(i.min(j), library);
        Ok(())
    }

    pub fn backup(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.rule_id).collect()
    }

    pub fn rebuild(ids: &[usize], library: &RuleLibrary) -> Result<Self> {
        Self::build_from_ids(ids, library)
    }

    fn build_from_ids(ids: &[usize], library: &RuleLibrary) -> Result<Self> {
        if ids.is_empty() {
            return Err(TrainError::InvalidParams { detail: "rule list must have n_rules >= 1".to_string() });
        }
        let n_samples = library.nsamples;
        let mut entries = Vec::with_capacity(ids.len());
        let mut union = BitVector::new(n_samples);
        for &rule_id in ids {
            let rule = library.rule(rule_id);
            let (captures, ncaptured) = rule.truthtable.andnot_with_popcount(&union);
            union.union_in_place(&captures);
            entries.push(Entry { rule_id, captures, ncaptured });
        }
        Ok(RuleList { n_samples, entries })
    }

    /// Recomputes captures for positions `[start, n_rules)` given that
    /// everything before `start` is already correct (I2 cascade), then
    /// refreshes `ncaptured` (I3) along the way.
    fn recompute_from(&mut self, start: usize, library: &RuleLibrary) {
        let mut union = BitVector::new(self.n_samples);
        for entry in &self.entries[..start] {
            union.union_in_place(&entry.captures);
        }
        for entry in &mut self.entries[start..] {
            let rule = library.rule(entry.rule_id);
            let (captures, ncaptured) = rule.truthtable.andnot_with_popcount(&union);
            union.union_in_place(&captures);
            entry.captures = captures;
            entry.ncaptured = ncaptured;
        }
    }
}
