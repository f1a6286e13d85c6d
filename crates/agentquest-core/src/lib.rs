use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

mod rank;
mod trust;

pub use rank::{RANK_THRESHOLDS, rank_title};
pub use trust::TrustTier;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("{kind} id must be numeric, got {raw:?}")]
    NotNumeric { kind: &'static str, raw: String },
    #[error("{kind} id must be positive, got {value}")]
    NotPositive { kind: &'static str, value: i64 },
    #[error("agent id is not a valid uuid: {0}")]
    InvalidUuid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub Uuid);

impl AgentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AgentId {
    type Err = ParseIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(raw.trim()).map(Self).map_err(|_| ParseIdError::InvalidUuid(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("wallet address is required")]
    Empty,
    #[error("wallet address is longer than 128 characters")]
    TooLong,
    #[error("wallet address contains invalid character {0:?}")]
    InvalidChar(char),
}

pub const WALLET_MAX_LEN: usize = 128;

/// Trims a wallet address and lowercases `0x` hex addresses so the same
/// account always maps to the same agent row.
pub fn normalize_wallet_address(raw: &str) -> Result<String, WalletError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WalletError::Empty);
    }
    if trimmed.len() > WALLET_MAX_LEN {
        return Err(WalletError::TooLong);
    }
    if let Some(bad) = trimmed.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(*c, '_' | '-' | ':' | '.'))) {
        return Err(WalletError::InvalidChar(bad));
    }
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return Ok(trimmed.to_ascii_lowercase());
    }
    Ok(trimmed.to_string())
}

/// Row id of a mission. Always positive; assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(pub i64);

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MissionId {
    type Err = ParseIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_positive_id("mission", raw).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub i64);

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ClaimId {
    type Err = ParseIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_positive_id("claim", raw).map(Self)
    }
}

fn parse_positive_id(kind: &'static str, raw: &str) -> Result<i64, ParseIdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        return Err(ParseIdError::NotNumeric { kind, raw: raw.to_string() });
    }
    let value: i64 =
        trimmed.parse().map_err(|_| ParseIdError::NotNumeric { kind, raw: raw.to_string() })?;
    if value <= 0 {
        return Err(ParseIdError::NotPositive { kind, value });
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Archived,
}

impl MissionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    #[must_use]
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "active" => Self::Active,
            "paused" => Self::Paused,
            "completed" => Self::Completed,
            "archived" => Self::Archived,
            _ => Self::Draft,
        }
    }
}

/// Whether a mission can take one more claim.
#[must_use]
pub fn mission_has_capacity(current_claims: i64, max_claims: i64) -> bool {
    current_claims < max_claims
}

pub const MAX_CLAIMS_LIMIT: i64 = 100_000;
pub const MAX_XP_REWARD: i64 = 1_000_000;
pub const MAX_USD_REWARD_CENTS: i64 = 100_000_000;
pub const MAX_STAKE_XP: i64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} must be between {min} and {max}")]
pub struct MissionTermsError {
    pub field: &'static str,
    pub min: i64,
    pub max: i64,
}

/// Reward, stake and capacity of a mission. Unset fields are not checked,
/// so partial updates validate only what they change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissionTerms {
    pub max_claims: Option<i64>,
    pub xp_reward: Option<i64>,
    pub usd_reward_cents: Option<i64>,
    pub stake_required: Option<i64>,
}

impl MissionTerms {
    pub fn validate(&self) -> Result<(), MissionTermsError> {
        check_range("max_claims", self.max_claims, 1, MAX_CLAIMS_LIMIT)?;
        check_range("xp_reward", self.xp_reward, 0, MAX_XP_REWARD)?;
        check_range("usd_reward_cents", self.usd_reward_cents, 0, MAX_USD_REWARD_CENTS)?;
        check_range("stake_required", self.stake_required, 0, MAX_STAKE_XP)
    }
}

fn check_range(
    field: &'static str,
    value: Option<i64>,
    min: i64,
    max: i64,
) -> Result<(), MissionTermsError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(MissionTermsError { field, min, max }),
        _ => Ok(()),
    }
}

/// Lifecycle of a claim: `submitted -> auditing -> {verified, rejected}`.
/// An admin may also decide straight from `submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Submitted,
    Auditing,
    Verified,
    Rejected,
}

impl ClaimStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Auditing => "auditing",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "auditing" => Self::Auditing,
            "verified" => Self::Verified,
            "rejected" => Self::Rejected,
            _ => Self::Submitted,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Rejected)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Auditing)
                | (Self::Submitted | Self::Auditing, Self::Verified | Self::Rejected)
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Failed,
}

impl PayoutStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "paid" => Self::Paid,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Renders an amount of cents as `$1,234.56`.
#[must_use]
pub fn format_usd(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let dollars = (abs / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", abs % 100)
}

#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_is_unique() {
        let a = AgentId::new();
        let b = AgentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn mission_id_rejects_non_numeric_input() {
        assert!(matches!("abc".parse::<MissionId>(), Err(ParseIdError::NotNumeric { .. })));
        assert!(matches!("12x".parse::<MissionId>(), Err(ParseIdError::NotNumeric { .. })));
        assert!(matches!("".parse::<MissionId>(), Err(ParseIdError::NotNumeric { .. })));
        assert!(matches!("1.5".parse::<MissionId>(), Err(ParseIdError::NotNumeric { .. })));
    }

    #[test]
    fn mission_id_rejects_zero_and_negative() {
        assert_eq!("0".parse::<MissionId>(), Err(ParseIdError::NotPositive { kind: "mission", value: 0 }));
        assert_eq!("-4".parse::<MissionId>(), Err(ParseIdError::NotPositive { kind: "mission", value: -4 }));
    }

    #[test]
    fn mission_id_accepts_padded_digits() {
        assert_eq!(" 42 ".parse::<MissionId>(), Ok(MissionId(42)));
    }

    #[test]
    fn claim_lifecycle_transitions() {
        use ClaimStatus::*;
        assert!(Submitted.can_transition_to(Auditing));
        assert!(Submitted.can_transition_to(Verified));
        assert!(Auditing.can_transition_to(Rejected));
        assert!(!Auditing.can_transition_to(Submitted));
        assert!(!Verified.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Verified));
        assert!(!Auditing.can_transition_to(Auditing));
    }

    #[test]
    fn status_strings_survive_the_store() {
        for status in [ClaimStatus::Submitted, ClaimStatus::Auditing, ClaimStatus::Verified, ClaimStatus::Rejected] {
            assert_eq!(ClaimStatus::from_db(status.as_str()), status);
        }
        assert_eq!(MissionStatus::from_db("bogus"), MissionStatus::Draft);
    }

    #[test]
    fn mission_terms_are_bounded() {
        let terms = MissionTerms {
            max_claims: Some(10),
            xp_reward: Some(MAX_XP_REWARD),
            usd_reward_cents: Some(0),
            stake_required: Some(MAX_STAKE_XP),
        };
        assert_eq!(terms.validate(), Ok(()));
        assert_eq!(MissionTerms::default().validate(), Ok(()));

        let err = MissionTerms { xp_reward: Some(i64::MAX), ..terms }.validate().unwrap_err();
        assert_eq!(err.field, "xp_reward");
        assert_eq!(err.to_string(), "xp_reward must be between 0 and 1000000");

        assert!(MissionTerms { max_claims: Some(0), ..terms }.validate().is_err());
        assert!(MissionTerms { stake_required: Some(-1), ..terms }.validate().is_err());
        assert!(MissionTerms { usd_reward_cents: Some(MAX_USD_REWARD_CENTS + 1), ..terms }.validate().is_err());
    }

    #[test]
    fn mission_capacity() {
        assert!(mission_has_capacity(0, 1));
        assert!(!mission_has_capacity(5, 5));
        assert!(!mission_has_capacity(0, 0));
    }

    #[test]
    fn wallet_addresses_are_normalized() {
        assert_eq!(normalize_wallet_address("  0xABCdef12 "), Ok("0xabcdef12".to_string()));
        assert_eq!(
            normalize_wallet_address("So1anaWa11etBase58"),
            Ok("So1anaWa11etBase58".to_string())
        );
        assert_eq!(normalize_wallet_address("   "), Err(WalletError::Empty));
        assert_eq!(normalize_wallet_address("0xab cd"), Err(WalletError::InvalidChar(' ')));
        assert_eq!(normalize_wallet_address(&"a".repeat(129)), Err(WalletError::TooLong));
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(0), "$0.00");
        assert_eq!(format_usd(5), "$0.05");
        assert_eq!(format_usd(123_456_78), "$123,456.78");
        assert_eq!(format_usd(-1050), "-$10.50");
    }
}
