//! Reputation and trust scoring.
//!
//! Reputation is a six-component weighted sum scaled to `[0, 1000]`. The
//! trust score is reputation divided by ten and selects one of four lending
//! bands.
//!
//! `network_trust` is a badge-count proxy, not graph centrality.

use aura_core::constants::*;
use aura_core::types::ReputationTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inputs for one reputation computation.
///
/// The relational signals are optional: `None` means the badge ledger could
/// not be consulted and the component falls back to a neutral 0.5.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReputationInputs {
    /// Proof-of-humanity score on a 0-100 scale.
    pub poh_score: f64,
    /// Cached badge count.
    pub badge_count: f64,
    /// GitHub score on a 0-100 scale.
    pub github_score: f64,
    /// Twitter score on a 0-100 scale.
    pub twitter_score: f64,
    /// Lifetime on-chain transaction count.
    pub tx_count: f64,
    /// Badges recorded on the ledger, `None` if the ledger is unavailable.
    pub ledger_badge_count: Option<u32>,
    /// Days since the first recorded badge, `None` if there is none or the
    /// ledger is unavailable.
    pub account_age_days: Option<f64>,
}

/// Normalized components, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Components {
    /// Proof of humanity.
    pub poh: f64,
    /// Badge ownership.
    pub badges: f64,
    /// Social accounts.
    pub social: f64,
    /// On-chain activity.
    pub onchain: f64,
    /// Network trust.
    pub network_trust: f64,
    /// Temporal consistency.
    pub temporal: f64,
}

/// Components as integer percentages, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentScores {
    /// Proof of humanity.
    pub poh: u32,
    /// Badge ownership.
    pub badges: u32,
    /// Social accounts.
    pub social: u32,
    /// On-chain activity.
    pub onchain: u32,
    /// Network trust.
    pub network_trust: u32,
    /// Temporal consistency.
    pub temporal: u32,
}

impl From<Components> for ComponentScores {
    fn from(c: Components) -> Self {
        let pct = |x: f64| (x * 100.0) as u32;
        ComponentScores {
            poh: pct(c.poh),
            badges: pct(c.badges),
            social: pct(c.social),
            onchain: pct(c.onchain),
            network_trust: pct(c.network_trust),
            temporal: pct(c.temporal),
        }
    }
}

/// Reputation view for a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationResult {
    /// Score in `[0, 1000]`.
    pub reputation_score: u32,
    /// Component breakdown.
    pub components: ComponentScores,
    /// Tier.
    pub tier: ReputationTier,
    /// Computation time.
    pub calculated_at: DateTime<Utc>,
}

/// Lending parameters for a trust band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LendingParams {
    /// Maximum LTV in percent.
    pub max_ltv: f64,
    /// Interest rate in percent.
    pub interest_rate: f64,
    /// Collateral ratio in percent.
    pub collateral_ratio: f64,
    /// `max_ltv / 100`.
    pub max_loan_multiplier: f64,
}

/// Loan decision for a requested amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanRecommendation {
    /// Requested principal.
    pub requested_amount: f64,
    /// `requested * max_ltv / 100`.
    pub max_approved_amount: f64,
    /// Trust score at least 50 and a positive principal.
    pub approved: bool,
    /// `requested * collateral_ratio / 100`.
    pub required_collateral: f64,
}

/// Trust score with lending parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    /// Score in `[0, 100]`.
    pub trust_score: f64,
    /// Underlying reputation score.
    pub reputation_score: u32,
    /// Reputation tier.
    pub tier: ReputationTier,
    /// Lending band.
    pub lending_params: LendingParams,
    /// Component breakdown.
    pub components: ComponentScores,
    /// Present when a loan amount was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<LoanRecommendation>,
}

fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// `log10(tx + 1) / 2`, capped at 1.
pub fn onchain_component(tx_count: f64) -> f64 {
    if !tx_count.is_finite() || tx_count <= 0.0 {
        return 0.0;
    }
    unit((tx_count + 1.0).log10() / 2.0)
}

/// Ledger badge count over five, capped at 1. Neutral when unavailable.
pub fn network_trust_component(ledger_badge_count: Option<u32>) -> f64 {
    match ledger_badge_count {
        Some(count) => unit(f64::from(count) / NETWORK_TRUST_BADGE_CAP),
        None => NEUTRAL_COMPONENT,
    }
}

/// Step function of account age in days. Neutral when unknown.
pub fn temporal_component(account_age_days: Option<f64>) -> f64 {
    match account_age_days.filter(|d| !d.is_nan()) {
        None => NEUTRAL_COMPONENT,
        Some(days) if days < 7.0 => 0.3,
        Some(days) if days < 30.0 => 0.6,
        Some(days) if days < 90.0 => 0.8,
        Some(_) => 1.0,
    }
}

/// Normalize all six components.
pub fn components(inputs: &ReputationInputs) -> Components {
    Components {
        poh: unit(inputs.poh_score / POH_SCORE_DIVISOR),
        badges: unit(inputs.badge_count / BADGE_COUNT_DIVISOR),
        social: unit(
            SOCIAL_GITHUB_SHARE * unit(inputs.github_score / SOCIAL_SCORE_DIVISOR)
                + SOCIAL_TWITTER_SHARE * unit(inputs.twitter_score / SOCIAL_SCORE_DIVISOR),
        ),
        onchain: onchain_component(inputs.tx_count),
        network_trust: network_trust_component(inputs.ledger_badge_count),
        temporal: temporal_component(inputs.account_age_days),
    }
}

/// Compute the reputation view.
pub fn calculate_reputation(
    inputs: &ReputationInputs,
    calculated_at: DateTime<Utc>,
) -> ReputationResult {
    let c = components(inputs);
    let weighted = REPUTATION_WEIGHT_POH * c.poh
        + REPUTATION_WEIGHT_BADGES * c.badges
        + REPUTATION_WEIGHT_SOCIAL * c.social
        + REPUTATION_WEIGHT_ONCHAIN * c.onchain
        + REPUTATION_WEIGHT_NETWORK * c.network_trust
        + REPUTATION_WEIGHT_TEMPORAL * c.temporal;
    let reputation_score = (unit(weighted) * REPUTATION_SCALE) as u32;

    ReputationResult {
        reputation_score,
        components: c.into(),
        tier: ReputationTier::from_score(reputation_score),
        calculated_at,
    }
}

/// Lending band for a trust score.
pub fn lending_params(trust_score: f64) -> LendingParams {
    let (max_ltv, interest_rate, collateral_ratio) = if trust_score >= 85.0 {
        (75.0, 5.0, 110.0)
    } else if trust_score >= 70.0 {
        (60.0, 7.5, 130.0)
    } else if trust_score >= 50.0 {
        (40.0, 10.0, 150.0)
    } else {
        (25.0, 15.0, 200.0)
    };

    LendingParams {
        max_ltv,
        interest_rate,
        collateral_ratio,
        max_loan_multiplier: max_ltv / 100.0,
    }
}

/// Derive the trust score, optionally pricing a loan.
pub fn calculate_trust_score(reputation: &ReputationResult, loan_amount: Option<f64>) -> TrustScore {
    let trust_score = f64::from(reputation.reputation_score.min(1000)) / 10.0;
    let params = lending_params(trust_score);

    let recommendation = loan_amount.map(|requested| {
        let requested = if requested.is_finite() {
            requested.max(0.0)
        } else {
            0.0
        };
        LoanRecommendation {
            requested_amount: requested,
            max_approved_amount: requested * params.max_loan_multiplier,
            approved: trust_score >= 50.0 && requested > 0.0,
            required_collateral: requested * params.collateral_ratio / 100.0,
        }
    });

    TrustScore {
        trust_score,
        reputation_score: reputation.reputation_score,
        tier: reputation.tier,
        lending_params: params,
        components: reputation.components,
        recommendation,
    }
}
