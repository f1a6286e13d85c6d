//! Trust tiers and fraud-flag escalation.
//!
//! Every rejected claim adds one fraud flag to the claiming agent. The tier is
//! then recomputed from the flag count:
//!
//! | flags | tier        |
//! |-------|-------------|
//! | 0     | `normal`    |
//! | 1     | `probation` |
//! | 2     | `blacklist` |
//! | 3+    | `banned`    |
//!
//! Escalation only moves an agent up this table. Admins are never escalated.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    #[default]
    Normal,
    Probation,
    Blacklist,
    Banned,
    Admin,
}

impl TrustTier {
    pub const PROBATION_FLAGS: i64 = 1;
    pub const BLACKLIST_FLAGS: i64 = 2;
    pub const BANNED_FLAGS: i64 = 3;

    #[must_use]
    pub fn for_flags(fraud_flags: i64) -> Self {
        if fraud_flags >= Self::BANNED_FLAGS {
            Self::Banned
        } else if fraud_flags >= Self::BLACKLIST_FLAGS {
            Self::Blacklist
        } else if fraud_flags >= Self::PROBATION_FLAGS {
            Self::Probation
        } else {
            Self::Normal
        }
    }

    /// Tier after the agent reaches `fraud_flags`.
    #[must_use]
    pub fn escalate(self, fraud_flags: i64) -> Self {
        if self == Self::Admin {
            return self;
        }
        let threshold = Self::for_flags(fraud_flags);
        if threshold.severity() > self.severity() { threshold } else { self }
    }

    fn severity(self) -> u8 {
        match self {
            Self::Admin | Self::Normal => 0,
            Self::Probation => 1,
            Self::Blacklist => 2,
            Self::Banned => 3,
        }
    }

    #[must_use]
    pub fn can_submit_claims(self) -> bool {
        !matches!(self, Self::Blacklist | Self::Banned)
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Probation => "probation",
            Self::Blacklist => "blacklist",
            Self::Banned => "banned",
            Self::Admin => "admin",
        }
    }

    /// Unknown or empty values are treated as `normal`.
    #[must_use]
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "probation" => Self::Probation,
            "blacklist" => Self::Blacklist,
            "banned" => Self::Banned,
            "admin" => Self::Admin,
            _ => Self::Normal,
        }
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
