use serde::{Deserialize, Serialize};

/// Maximum points per sub-score. Defaults sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skill: u32,
    pub experience: u32,
    pub education: u32,
    pub location: u32,
    pub industry: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill: 30,
            experience: 25,
            education: 15,
            location: 15,
            industry: 15,
        }
    }
}

impl ScoringWeights {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.skill + self.experience + self.education + self.location + self.industry
    }
}

/// Points deducted per unit of mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRates {
    /// Per year below the minimum experience.
    pub experience_shortfall: u32,
    /// Per year above the maximum experience.
    pub experience_overage: u32,
    /// Per education rank below the required minimum.
    pub education_gap: u32,
}

impl Default for PenaltyRates {
    fn default() -> Self {
        Self {
            experience_shortfall: 8,
            experience_overage: 3,
            education_gap: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub penalties: PenaltyRates,
}

/// `weight * numerator / denominator`, rounded half up. A zero denominator
/// yields zero.
pub(crate) fn scaled(weight: u32, numerator: usize, denominator: usize) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let weight = u64::from(weight);
    let num = u64::try_from(numerator.min(denominator)).unwrap_or(u64::MAX);
    let den = u64::try_from(denominator).unwrap_or(u64::MAX);
    let rounded = (weight * num * 2 + den) / (den * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_100() {
        assert_eq!(ScoringWeights::default().total(), 100);
    }

    #[test]
    fn scaled_rounds_half_up() {
        assert_eq!(scaled(30, 2, 3), 20);
        assert_eq!(scaled(30, 1, 3), 10);
        assert_eq!(scaled(15, 1, 2), 8);
        assert_eq!(scaled(15, 1, 3), 5);
        assert_eq!(scaled(30, 3, 3), 30);
        assert_eq!(scaled(30, 0, 3), 0);
        assert_eq!(scaled(30, 1, 0), 0);
    }

    #[test]
    fn scaled_never_exceeds_weight() {
        assert_eq!(scaled(30, 5, 3), 30);
    }
}
