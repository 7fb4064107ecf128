//! Strategic go/hold decision from an upstream opportunity score
//!
//! Scores fall into three contiguous bands:
//!
//! | score          | band     | proceed | confidence |
//! |----------------|----------|---------|------------|
//! | `>= 100`       | strong   | yes     | 0.8        |
//! | `50 ..< 100`   | moderate | yes     | 0.6        |
//! | `< 50`         | hold     | no      | 0.7        |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the strong band
pub const STRONG_THRESHOLD: f64 = 100.0;
/// Lower bound of the moderate band
pub const MODERATE_THRESHOLD: f64 = 50.0;

/// Score band a decision was taken in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Strong,
    Moderate,
    Hold,
}

impl ScoreBand {
    /// Band for a score; anything not comparable (NaN) holds
    pub fn classify(score: f64) -> Self {
        if score >= STRONG_THRESHOLD {
            ScoreBand::Strong
        } else if score >= MODERATE_THRESHOLD {
            ScoreBand::Moderate
        } else {
            ScoreBand::Hold
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Strong => "strong",
            ScoreBand::Moderate => "moderate",
            ScoreBand::Hold => "hold",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of the strategic decision step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicDecision {
    /// Whether to proceed to planning
    pub proceed: bool,
    /// Fixed confidence attached to the band
    pub confidence: f64,
    /// Band the score fell into
    pub band: ScoreBand,
    /// Score the decision was taken on
    pub score: f64,
    /// Fixed-format rationale
    pub reasoning: String,
}

/// Classify a score into a proceed/hold verdict
pub fn decide(score: f64) -> StrategicDecision {
    let band = ScoreBand::classify(score);
    let (proceed, confidence, reasoning) = match band {
        ScoreBand::Strong => (
            true,
            0.8,
            format!(
                "Strong opportunity: score {:.2} meets the {} threshold. Proceed to planning.",
                score, STRONG_THRESHOLD
            ),
        ),
        ScoreBand::Moderate => (
            true,
            0.6,
            format!(
                "Moderate opportunity: score {:.2} is between {} and {}. Proceed with caution.",
                score, MODERATE_THRESHOLD, STRONG_THRESHOLD
            ),
        ),
        ScoreBand::Hold => (
            false,
            0.7,
            format!(
                "Weak opportunity: score {:.2} is below {}. Hold and gather more evidence.",
                score, MODERATE_THRESHOLD
            ),
        ),
    };

    StrategicDecision {
        proceed,
        confidence,
        band,
        score,
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert!(!decide(49.99).proceed);

        let fifty = decide(50.0);
        assert!(fifty.proceed);
        assert_eq!(fifty.band, ScoreBand::Moderate);
        assert_eq!(fifty.confidence, 0.6);

        assert_eq!(decide(99.99).band, ScoreBand::Moderate);

        let hundred = decide(100.0);
        assert!(hundred.proceed);
        assert_eq!(hundred.band, ScoreBand::Strong);
        assert_eq!(hundred.confidence, 0.8);
    }

    #[test]
    fn test_negative_and_nan_scores_hold() {
        assert_eq!(decide(-25.0).band, ScoreBand::Hold);
        assert!(!decide(f64::NAN).proceed);
    }

    #[test]
    fn test_reasoning_names_the_score() {
        let decision = decide(72.5);
        assert!(decision.reasoning.starts_with("Moderate opportunity"));
        assert!(decision.reasoning.contains("72.50"));
    }
}
