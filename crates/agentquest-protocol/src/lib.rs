use agentquest_core::{
    AgentId, ClaimId, ClaimStatus, MissionId, MissionStatus, PayoutStatus, TrustTier,
};
use serde::{Deserialize, Serialize};

mod token;

pub use token::{SessionClaims, TokenError};

/// Error envelope returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub ok: bool,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub wallet_address: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at_ms: u64,
    pub created: bool,
    pub agent: AgentProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: AgentId,
    pub wallet_address: String,
    pub name: String,
    pub tagline: Option<String>,
    pub avatar_url: Option<String>,
    pub xp: i64,
    pub rank_title: String,
    pub missions_completed: i64,
    pub trust_tier: TrustTier,
    pub fraud_flags: i64,
    pub usd_balance_cents: i64,
    pub total_earned_cents: i64,
    pub total_withdrawn_cents: i64,
    pub youtube_linked_at_ms: Option<u64>,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub position: u32,
    pub agent_id: AgentId,
    pub wallet_address: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub xp: i64,
    pub rank_title: String,
    pub missions_completed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionView {
    pub id: MissionId,
    pub title: String,
    #[serde(rename = "type")]
    pub mission_type: String,
    pub creator_id: Option<AgentId>,
    pub status: MissionStatus,
    pub target_url: Option<String>,
    pub current_claims: i64,
    pub max_claims: i64,
    pub xp_reward: i64,
    pub usd_reward_cents: i64,
    pub stake_required: i64,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMissionRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub mission_type: String,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub max_claims: Option<i64>,
    pub xp_reward: i64,
    #[serde(default)]
    pub usd_reward_cents: Option<i64>,
    #[serde(default)]
    pub stake_required: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMissionRequest {
    pub id: MissionId,
    #[serde(default)]
    pub status: Option<MissionStatus>,
    #[serde(default)]
    pub max_claims: Option<i64>,
    #[serde(default)]
    pub xp_reward: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitClaimRequest {
    pub mission_id: MissionId,
    pub proof_url: String,
    #[serde(default)]
    pub proof_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimView {
    pub id: ClaimId,
    pub mission_id: MissionId,
    pub agent_id: AgentId,
    pub status: ClaimStatus,
    pub proof_url: String,
    pub proof_notes: Option<String>,
    pub staked_xp: i64,
    pub submitted_at_ms: u64,
    pub audit_result: Option<String>,
    pub audited_at_ms: Option<u64>,
}

/// A claim waiting for review, with enough context to judge it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQueueEntry {
    #[serde(flatten)]
    pub claim: ClaimView,
    pub mission_title: String,
    pub wallet_address: String,
    pub trust_tier: TrustTier,
    pub fraud_flags: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveClaimRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveClaimResponse {
    pub claim: ClaimView,
    pub agent: AgentProfile,
    pub xp_awarded: i64,
    pub usd_awarded_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectClaimRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectClaimResponse {
    pub claim: ClaimView,
    pub agent: AgentProfile,
    pub previous_tier: TrustTier,
    pub new_tier: TrustTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub amount_cents: i64,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutView {
    pub id: i64,
    pub agent_id: AgentId,
    pub amount_cents: i64,
    pub destination: String,
    pub status: PayoutStatus,
    pub requested_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutSummary {
    pub usd_balance_cents: i64,
    pub total_earned_cents: i64,
    pub total_withdrawn_cents: i64,
    pub payouts: Vec<PayoutView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEventView {
    pub id: i64,
    pub agent_id: AgentId,
    pub wallet_address: String,
    pub claim_id: Option<ClaimId>,
    pub previous_tier: TrustTier,
    pub new_tier: TrustTier,
    pub fraud_flags: i64,
    pub reason: String,
    pub created_at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submit_claim_rejects_string_mission_id() {
        let body = json!({ "mission_id": "seven", "proof_url": "https://x.test/p" });
        assert!(serde_json::from_value::<SubmitClaimRequest>(body).is_err());

        let body = json!({ "mission_id": 7, "proof_url": "https://x.test/p" });
        let parsed: SubmitClaimRequest = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.mission_id, MissionId(7));
        assert!(parsed.proof_notes.is_none());
    }

    #[test]
    fn mission_type_uses_the_type_key() {
        let view = MissionView {
            id: MissionId(3),
            title: "Share the launch video".into(),
            mission_type: "social".into(),
            creator_id: None,
            status: MissionStatus::Active,
            target_url: None,
            current_claims: 0,
            max_claims: 10,
            xp_reward: 50,
            usd_reward_cents: 0,
            stake_required: 0,
            created_at_ms: 1,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["type"], "social");
        assert_eq!(value["status"], "active");
        assert!(value.get("mission_type").is_none());
    }

    #[test]
    fn audit_entry_flattens_the_claim() {
        let entry = AuditQueueEntry {
            claim: ClaimView {
                id: ClaimId(9),
                mission_id: MissionId(3),
                agent_id: AgentId::new(),
                status: ClaimStatus::Auditing,
                proof_url: "https://x.test/p".into(),
                proof_notes: None,
                staked_xp: 5,
                submitted_at_ms: 10,
                audit_result: None,
                audited_at_ms: None,
            },
            mission_title: "Share".into(),
            wallet_address: "0xabc".into(),
            trust_tier: TrustTier::Probation,
            fraud_flags: 1,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], 9);
        assert_eq!(value["status"], "auditing");
        assert_eq!(value["trust_tier"], "probation");
    }
}
