//! Performance-based score boosting.

use linkweave_core::{defaults, PerformanceMetric};

/// Multiplicative boosts earned by well-performing targets.
///
/// Both boosts compound. The result is not re-normalized, so boosted scores
/// may exceed 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostPolicy {
    /// Clicks strictly above this earn `click_multiplier`.
    pub click_threshold: u64,
    pub click_multiplier: f32,
    /// Positions strictly below this earn `position_multiplier`.
    pub position_threshold: f64,
    pub position_multiplier: f32,
}

impl Default for BoostPolicy {
    fn default() -> Self {
        Self {
            click_threshold: defaults::BOOST_CLICK_THRESHOLD,
            click_multiplier: defaults::BOOST_CLICK_MULTIPLIER,
            position_threshold: defaults::BOOST_POSITION_THRESHOLD,
            position_multiplier: defaults::BOOST_POSITION_MULTIPLIER,
        }
    }
}

impl BoostPolicy {
    /// Final score for a raw similarity given the target's metrics, if any.
    pub fn apply(&self, raw: f32, metric: Option<&PerformanceMetric>) -> f32 {
        let Some(metric) = metric else {
            return raw;
        };
        let mut score = raw;
        if metric.clicks > self.click_threshold {
            score *= self.click_multiplier;
        }
        if metric.position < self.position_threshold {
            score *= self.position_multiplier;
        }
        score
    }
}
