//! Core types for Aura.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    ENTERPRISE_TIER_LIMIT, FREE_TIER_LIMIT, LOW_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD,
    PRO_TIER_LIMIT,
};
use crate::error::CoreError;

/// A validated EVM wallet address, the unit of scoring.
///
/// Always rendered as lowercase `0x`-prefixed hex so that the same wallet
/// maps to the same passport, cache entry and lock regardless of how the
/// caller capitalized it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(Address);

impl WalletAddress {
    /// Wrap a raw address.
    pub const fn new(address: Address) -> Self {
        WalletAddress(address)
    }

    /// Get the inner address.
    pub const fn inner(&self) -> &Address {
        &self.0
    }

    /// Raw 20 address bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_slice()))
    }
}

impl FromStr for WalletAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| CoreError::InvalidAddress(s.to_string()))?;
        if body.len() != 40 {
            return Err(CoreError::InvalidAddress(s.to_string()));
        }
        let bytes = hex::decode(body).map_err(|_| CoreError::InvalidAddress(s.to_string()))?;
        Ok(WalletAddress(Address::from_slice(&bytes)))
    }
}

impl From<Address> for WalletAddress {
    fn from(address: Address) -> Self {
        WalletAddress(address)
    }
}

impl From<[u8; 20]> for WalletAddress {
    fn from(bytes: [u8; 20]) -> Self {
        WalletAddress(Address::from(bytes))
    }
}

impl Serialize for WalletAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Risk category produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    /// Classifier score at or above the low-risk threshold.
    Low,
    /// Classifier score at or above the medium-risk threshold.
    Medium,
    /// Everything else.
    High,
}

impl RiskCategory {
    /// Map a classifier score in [0, 1] to a category.
    pub fn from_score(score: f64) -> Self {
        if score >= LOW_RISK_THRESHOLD {
            RiskCategory::Low
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskCategory::Medium
        } else {
            RiskCategory::High
        }
    }

    /// Canonical lowercase string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "low",
            RiskCategory::Medium => "medium",
            RiskCategory::High => "high",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RiskCategory::Low),
            "medium" => Ok(RiskCategory::Medium),
            "high" => Ok(RiskCategory::High),
            other => Err(CoreError::InvalidRiskCategory(other.to_string())),
        }
    }
}

/// Reputation tier derived from a 0-1000 reputation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReputationTier {
    /// Below 550.
    Bronze,
    /// 550 and above.
    Silver,
    /// 650 and above.
    Gold,
    /// 750 and above.
    Platinum,
    /// 850 and above.
    Diamond,
}

impl ReputationTier {
    /// Map a reputation score to its tier.
    pub fn from_score(score: u32) -> Self {
        match score {
            850.. => ReputationTier::Diamond,
            750..=849 => ReputationTier::Platinum,
            650..=749 => ReputationTier::Gold,
            550..=649 => ReputationTier::Silver,
            _ => ReputationTier::Bronze,
        }
    }

    /// Display name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReputationTier::Bronze => "Bronze",
            ReputationTier::Silver => "Silver",
            ReputationTier::Gold => "Gold",
            ReputationTier::Platinum => "Platinum",
            ReputationTier::Diamond => "Diamond",
        }
    }
}

impl fmt::Display for ReputationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API key quota class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiTier {
    /// 100 requests.
    Free,
    /// 1 000 requests.
    Pro,
    /// 10 000 requests.
    Enterprise,
}

impl ApiTier {
    /// Request quota for the tier.
    pub const fn rate_limit(&self) -> i64 {
        match self {
            ApiTier::Free => FREE_TIER_LIMIT,
            ApiTier::Pro => PRO_TIER_LIMIT,
            ApiTier::Enterprise => ENTERPRISE_TIER_LIMIT,
        }
    }

    /// Canonical lowercase string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ApiTier::Free => "free",
            ApiTier::Pro => "pro",
            ApiTier::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for ApiTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(ApiTier::Free),
            "pro" => Ok(ApiTier::Pro),
            "enterprise" => Ok(ApiTier::Enterprise),
            _ => Err(CoreError::InvalidTier(s.to_string())),
        }
    }
}

/// Credential verification level derived from a uniqueness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationLevel {
    /// Below 60.
    Low,
    /// 60 and above.
    Medium,
    /// 80 and above.
    High,
}

impl VerificationLevel {
    /// Map a uniqueness score to a verification level.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            VerificationLevel::High
        } else if score >= 60.0 {
            VerificationLevel::Medium
        } else {
            VerificationLevel::Low
        }
    }

    /// Canonical lowercase string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            VerificationLevel::Low => "low",
            VerificationLevel::Medium => "medium",
            VerificationLevel::High => "high",
        }
    }
}

impl fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(VerificationLevel::Low),
            "medium" => Ok(VerificationLevel::Medium),
            "high" => Ok(VerificationLevel::High),
            other => Err(CoreError::InvalidVerificationLevel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_address_normalizes_case() {
        let upper: WalletAddress = "0xABCDEFabcdef0123456789ABCDEFabcdef012345".parse().unwrap();
        let lower: WalletAddress = "0xabcdefabcdef0123456789abcdefabcdef012345".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(
            upper.to_string(),
            "0xabcdefabcdef0123456789abcdefabcdef012345"
        );
    }

    #[test]
    fn test_wallet_address_rejects_malformed() {
        assert!("abcdefabcdef0123456789abcdefabcdef012345"
            .parse::<WalletAddress>()
            .is_err());
        assert!("0x1234".parse::<WalletAddress>().is_err());
        assert!("0xzzzzefabcdef0123456789abcdefabcdef012345"
            .parse::<WalletAddress>()
            .is_err());
    }

    #[test]
    fn test_wallet_address_serde_validates() {
        let json = r#""0x1111111111111111111111111111111111111111""#;
        let wallet: WalletAddress = serde_json::from_str(json).unwrap();
        assert_eq!(wallet, WalletAddress::from([0x11; 20]));
        assert_eq!(serde_json::to_string(&wallet).unwrap(), json);

        assert!(serde_json::from_str::<WalletAddress>(r#""not-a-wallet""#).is_err());
    }

    #[test]
    fn test_risk_category_thresholds() {
        assert_eq!(RiskCategory::from_score(0.7), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(0.69), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(0.4), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(0.39), RiskCategory::High);
    }

    #[test]
    fn test_reputation_tier_boundaries() {
        assert_eq!(ReputationTier::from_score(1000), ReputationTier::Diamond);
        assert_eq!(ReputationTier::from_score(850), ReputationTier::Diamond);
        assert_eq!(ReputationTier::from_score(849), ReputationTier::Platinum);
        assert_eq!(ReputationTier::from_score(650), ReputationTier::Gold);
        assert_eq!(ReputationTier::from_score(550), ReputationTier::Silver);
        assert_eq!(ReputationTier::from_score(0), ReputationTier::Bronze);
    }

    #[test]
    fn test_api_tier_parse_and_limits() {
        assert_eq!("PRO".parse::<ApiTier>().unwrap(), ApiTier::Pro);
        assert_eq!(ApiTier::Enterprise.rate_limit(), 10_000);
        assert!("gold".parse::<ApiTier>().is_err());
    }

    #[test]
    fn test_verification_level() {
        assert_eq!(VerificationLevel::from_score(80.0), VerificationLevel::High);
        assert_eq!(VerificationLevel::from_score(60.0), VerificationLevel::Medium);
        assert_eq!(VerificationLevel::from_score(59.9), VerificationLevel::Low);
        assert_eq!("medium".parse::<VerificationLevel>(), Ok(VerificationLevel::Medium));
        assert!("MEDIUM".parse::<VerificationLevel>().is_err());
    }
}
