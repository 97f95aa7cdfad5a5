//! Threshold decision on the scored probability

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};

/// Probability above which a person is reported as likely at risk
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Binary risk verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Likely,
    Unlikely,
}

impl Verdict {
    /// Short label for the verdict
    pub fn label(&self) -> &'static str {
        match self {
            Self::Likely => "likely",
            Self::Unlikely => "unlikely",
        }
    }

    /// Sentence shown to the person filling the form
    pub fn message(&self) -> &'static str {
        match self {
            Self::Likely => "This person is likely to have Alzheimer\u{2019}s",
            Self::Unlikely => "This person is unlikely to have Alzheimer\u{2019}s",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict together with the probability it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub probability: f64,
}

/// Fixed-threshold decision rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    threshold: f64,
}

impl DecisionPolicy {
    /// Create a policy with a custom threshold.
    ///
    /// # Errors
    /// Returns `InvalidThreshold` unless the threshold lies in [0, 1].
    pub fn new(threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RiskError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Strictly greater than the threshold is `Likely`.
    pub fn decide(&self, probability: f64) -> Decision {
        let verdict = if probability > self.threshold {
            Verdict::Likely
        } else {
            Verdict::Unlikely
        };
        Decision {
            verdict,
            probability,
        }
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}
