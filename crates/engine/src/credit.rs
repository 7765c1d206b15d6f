//! Additive credit score (0-1000) from identity signals.

use aura_core::constants::{
    CREDIT_BADGE_CAP, CREDIT_BADGE_POINTS, CREDIT_ONCHAIN_CAP, CREDIT_POH_CAP,
    CREDIT_POH_MULTIPLIER, MAX_CREDIT_SCORE,
};
use aura_core::types::RiskCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter-style grade for a credit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditGrade {
    /// 850 and above.
    #[serde(rename = "Excellent")]
    Excellent,
    /// 750 and above.
    #[serde(rename = "Very Good")]
    VeryGood,
    /// 650 and above.
    #[serde(rename = "Good")]
    Good,
    /// 550 and above.
    #[serde(rename = "Fair")]
    Fair,
    /// Below 550.
    #[serde(rename = "Poor")]
    Poor,
}

impl CreditGrade {
    /// Grade a credit score.
    pub fn from_score(score: u32) -> Self {
        match score {
            850.. => CreditGrade::Excellent,
            750..=849 => CreditGrade::VeryGood,
            650..=749 => CreditGrade::Good,
            550..=649 => CreditGrade::Fair,
            _ => CreditGrade::Poor,
        }
    }

    /// Display label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CreditGrade::Excellent => "Excellent",
            CreditGrade::VeryGood => "Very Good",
            CreditGrade::Good => "Good",
            CreditGrade::Fair => "Fair",
            CreditGrade::Poor => "Poor",
        }
    }

    /// Parse a display label back into a grade.
    pub fn from_label(label: &str) -> Option<Self> {
        [
            CreditGrade::Excellent,
            CreditGrade::VeryGood,
            CreditGrade::Good,
            CreditGrade::Fair,
            CreditGrade::Poor,
        ]
        .into_iter()
        .find(|grade| grade.as_str() == label)
    }
}

impl fmt::Display for CreditGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-source contribution to a credit score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditBreakdown {
    /// Proof-of-humanity points (max 400).
    pub poh_points: f64,
    /// Badge points (max 300).
    pub badge_points: f64,
    /// On-chain points (max 300).
    pub onchain_points: f64,
}

/// Credit score with grade and coarse risk level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditScore {
    /// Score in `[0, 1000]`.
    pub credit_score: u32,
    /// Grade.
    pub grade: CreditGrade,
    /// Coarse risk: 750+ low, 550+ medium, else high.
    pub risk_level: RiskCategory,
    /// Contributions.
    pub breakdown: CreditBreakdown,
}

fn capped(value: f64, cap: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, cap)
    } else {
        0.0
    }
}

/// Compute the credit score.
///
/// `poh * 4` (max 400) + `badges * 50` (max 300) + `onchain` (max 300).
pub fn calculate_credit_score(poh_score: f64, badge_count: u32, onchain_score: f64) -> CreditScore {
    let breakdown = CreditBreakdown {
        poh_points: capped(poh_score * CREDIT_POH_MULTIPLIER, CREDIT_POH_CAP),
        badge_points: capped(f64::from(badge_count) * CREDIT_BADGE_POINTS, CREDIT_BADGE_CAP),
        onchain_points: capped(onchain_score, CREDIT_ONCHAIN_CAP),
    };

    let total = (breakdown.poh_points + breakdown.badge_points + breakdown.onchain_points)
        .min(MAX_CREDIT_SCORE);
    let credit_score = total as u32;

    let risk_level = if credit_score >= 750 {
        RiskCategory::Low
    } else if credit_score >= 550 {
        RiskCategory::Medium
    } else {
        RiskCategory::High
    };

    CreditScore {
        credit_score,
        grade: CreditGrade::from_score(credit_score),
        risk_level,
        breakdown,
    }
}
