pub mod doench;
pub mod tko_pssm;

use std::collections::BTreeSet;

use crate::config::{ScoringAlgorithm, SCORING_WINDOW_LEN};
use crate::prediction_tools::doench::DoenchRuleSet1;
use crate::prediction_tools::tko_pssm::TkoPssm;

/// On-target efficiency model.
///
/// Receives a 30-mer laid out as 4 bases, the 20-mer protospacer, the 3-base
/// PAM and 3 trailing bases. Higher is better.
pub trait ScoringOracle {
    fn name(&self) -> &'static str;
    fn score(&self, window: &str) -> f64;
}

/// The set of enabled scoring oracles. With several the score is their mean.
pub struct GuideScorer {
    oracles: Vec<Box<dyn ScoringOracle>>,
}

impl GuideScorer {
    pub fn from_algorithms(algorithms: &BTreeSet<ScoringAlgorithm>) -> Self {
        let oracles = algorithms
            .iter()
            .map(|alg| -> Box<dyn ScoringOracle> {
                match alg {
                    ScoringAlgorithm::Doench => Box::new(DoenchRuleSet1),
                    ScoringAlgorithm::TkoPssm => Box::new(TkoPssm),
                }
            })
            .collect();
        Self { oracles }
    }

    pub fn disabled() -> Self {
        Self { oracles: Vec::new() }
    }

    pub fn with_oracle(oracle: Box<dyn ScoringOracle>) -> Self {
        Self { oracles: vec![oracle] }
    }

    pub fn is_enabled(&self) -> bool {
        !self.oracles.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.oracles.iter().map(|o| o.name()).collect()
    }

    /// Score for a scoring window. Anything but a full 30-mer scores 0.
    pub fn score(&self, window: &str) -> f64 {
        if !self.is_enabled() || window.len() != SCORING_WINDOW_LEN {
            return 0.0;
        }
        let total: f64 = self.oracles.iter().map(|o| o.score(window)).sum();
        total / self.oracles.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl ScoringOracle for Constant {
        fn name(&self) -> &'static str {
            "constant"
        }
        fn score(&self, _window: &str) -> f64 {
            self.0
        }
    }

    const WINDOW: &str = "TCAGACGTTCAGTCATGCACTGACTGGTAC";

    #[test]
    fn disabled_scorer_returns_zero() {
        let scorer = GuideScorer::from_algorithms(&BTreeSet::new());
        assert!(!scorer.is_enabled());
        assert_eq!(scorer.score(WINDOW), 0.0);
    }

    #[test]
    fn truncated_window_scores_zero() {
        let scorer = GuideScorer::with_oracle(Box::new(Constant(0.8)));
        assert_eq!(scorer.score(&WINDOW[..29]), 0.0);
        assert_eq!(scorer.score(WINDOW), 0.8);
    }

    #[test]
    fn several_algorithms_are_averaged() {
        let both = GuideScorer::from_algorithms(&BTreeSet::from([
            ScoringAlgorithm::Doench,
            ScoringAlgorithm::TkoPssm,
        ]));
        assert_eq!(both.names(), vec!["Doench", "TkoPssm"]);
        let expected = (DoenchRuleSet1.score(WINDOW) + TkoPssm.score(WINDOW)) / 2.0;
        assert!((both.score(WINDOW) - expected).abs() < 1e-12);
    }
}
