//! The immutable rule library: pre-mined boolean rules plus the label
//! bitvectors, supplied whole by the data-loading collaborator. Mining
//! the rules and labeling the dataset both happen upstream of this crate.

use crate::bitvector::BitVector;
use crate::error::{Result, TrainError};

pub const MAX_CARDINALITY: usize = 10;

/// A single pre-mined boolean rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: usize,
    pub cardinality: usize,
    pub truthtable: BitVector,
    pub support: usize,
}

impl Rule {
    pub fn new(id: usize, cardinality: usize, truthtable: BitVector) -> Result<Self> {
        if cardinality > MAX_CARDINALITY {
            return Err(TrainError::InvalidParams {
                detail: format!(
                    "rule {id} has cardinality {cardinality} > MAX_CARDINALITY ({MAX_CARDINALITY})"
                ),
            });
        }
        let support = truthtable.popcount();
        Ok(Rule { id, cardinality, truthtable, support })
    }
}

/// Immutable catalog of rules plus the two label bitvectors.
///
/// `rules` is ordered and indexed by `Rule::id`. The last id,
/// `default_rule_id`, is the distinguished default rule (I1): it is never
/// an operand of add/delete/swap, and its truthtable is conventionally
/// all-ones (it captures anything earlier positions missed).
pub struct RuleLibrary {
    pub nsamples: usize,
    pub rules: Vec<Rule>,
    pub labels: [BitVector; 2],
    pub default_rule_id: usize,
}

impl RuleLibrary {
    /// Builds the library. `rules` MUST include the default rule as its
    /// last element; disjointness/coverage of `labels` is the data
    /// loader's responsibility to guarantee, not this crate's.
    pub fn new(rules: Vec<Rule>, labels: [BitVector; 2], nsamples: usize) -> Result<Self> {
        if rules.len() < 2 {
            return Err(TrainError::InvalidParams {
                detail: format!(
                    "nrules must be >= 2 (including the default rule), got {}",
                    rules.len()
                ),
            });
        }
        for rule in &rules {
            if rule.truthtable.len() != nsamples {
                return Err(TrainError::InvalidParams {
                    detail: format!(
                        "rule {} truthtable width {} does not match nsamples {}",
                        rule.id,
                        rule.truthtable.len(),
                        nsamples
                    ),
                });
            }
        }
        if labels[0].len() != nsamples || labels[1].len() != nsamples {
            return Err(TrainError::InvalidParams {
                detail: "label bitvector width does not match nsamples".to_string(),
            });
        }
        let default_rule_id = rules.len() - 1;
        Ok(RuleLibrary { nsamples, rules, labels, default_rule_id })
    }

    pub fn nrules(&self) -> usize {
        self.rules.len()
    }

    pub fn rule(&self, id: usize) -> &Rule {
        &self.rules[id]
    }

    /// Non-default rule ids, in catalog order.
    pub fn non_default_ids(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.rules.len()).filter(move |&id| id != self.default_rule_id)
    }

    /// Count of library rules at each cardinality `0..=MAX_CARDINALITY`,
    /// used to seed the per-cardinality counts in the prior computation.
    pub fn cardinality_counts(&self) -> [usize; MAX_CARDINALITY + 1] {
        let mut counts = [0usize; MAX_CARDINALITY + 1];
        for rule in &self.rules {
            counts[rule.cardinality] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_library() -> RuleLibrary {
        // nsamples=4, labels[1]=0011, labels[0]=1100
        let labels = [
            BitVector::from_indices(4, [0, 1]),
            BitVector::from_indices(4, [2, 3]),
        ];
        let r0 = Rule::new(0, 1, BitVector::from_indices(4, [0, 2])).unwrap(); // 1010
        let r1 = Rule::new(1, 1, BitVector::from_indices(4, [1, 3])).unwrap(); // 0101
        let default = Rule::new(2, 0, BitVector::from_indices(4, [0, 1, 2, 3])).unwrap();
        RuleLibrary::new(vec![r0, r1, default], labels, 4).unwrap()
    }

    #[test]
    fn rejects_oversized_cardinality() {
        let bv = BitVector::new(4);
        assert!(Rule::new(0, MAX_CARDINALITY + 1, bv).is_err());
    }

    #[test]
    fn rejects_too_few_rules() {
        let labels = [BitVector::new(4), BitVector::new(4)];
        let default = Rule::new(0, 0, BitVector::from_indices(4, [0, 1, 2, 3])).unwrap();
        assert!(RuleLibrary::new(vec![default], labels, 4).is_err());
    }

    #[test]
    fn default_rule_is_last_id() {
        let lib = toy_library();
        assert_eq!(lib.default_rule_id, 2);
        assert_eq!(lib.nrules(), 3);
    }

    #[test]
    fn non_default_ids_excludes_default() {
        let lib = toy_library();
        let ids: Vec<usize> = lib.non_default_ids().collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn cardinality_counts_tally_library() {
        let lib = toy_library();
        let counts = lib.cardinality_counts();
        assert_eq!(counts[0], 1); // default
        assert_eq!(counts[1], 2); // r0, r1
    }
}
