//! Admin endpoints: audit queue, claim decisions, mission moderation and the
//! trust views. Every handler requires an [`AdminSession`].

use super::{clamp_limit, optional_text};
use crate::{
    AppState,
    auth::AdminSession,
    db,
    error::ApiError,
    extract::{ApiJson, ApiQuery, OptionalJson},
};
use agentquest_core::{AgentId, ClaimId, ClaimStatus, MissionTerms, now_ms};
use agentquest_protocol::{
    AgentProfile, ApproveClaimRequest, ApproveClaimResponse, AuditQueueEntry, ClaimView,
    MissionView, RejectClaimRequest, RejectClaimResponse, TrustEventView, UpdateMissionRequest,
};
use axum::{
    Json,
    extract::{Path, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{info, warn};

const TRUST_HISTORY_DEFAULT: u32 = 50;
const TRUST_HISTORY_MAX: u32 = 500;

pub async fn list_agents(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<AgentProfile>>, ApiError> {
    let conn = state.db.lock().await;
    Ok(Json(db::query_agents(&conn)?))
}

pub async fn audit_queue(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<AuditQueueEntry>>, ApiError> {
    let conn = state.db.lock().await;
    Ok(Json(db::query_audit_queue(&conn)?))
}

fn parse_claim_id(raw: &str) -> Result<ClaimId, ApiError> {
    raw.parse().map_err(|err: agentquest_core::ParseIdError| ApiError::bad_request(err.to_string()))
}

/// Loads a claim and checks that it may move to `next`.
fn claim_for_transition(
    conn: &Connection,
    id: ClaimId,
    next: ClaimStatus,
) -> Result<ClaimView, ApiError> {
    let claim = db::fetch_claim(conn, id)?.ok_or_else(|| ApiError::not_found("claim not found"))?;
    if !claim.status.can_transition_to(next) {
        return Err(ApiError::conflict(format!("claim is {}, cannot move to {next}", claim.status)));
    }
    Ok(claim)
}

pub async fn start_audit(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(raw_id): Path<String>,
) -> Result<Json<ClaimView>, ApiError> {
    let claim_id = parse_claim_id(&raw_id)?;
    let conn = state.db.lock().await;
    claim_for_transition(&conn, claim_id, ClaimStatus::Auditing)?;
    db::set_claim_status(&conn, claim_id, ClaimStatus::Auditing, None, now_ms())?;
    let claim = db::fetch_claim(&conn, claim_id)?
        .ok_or_else(|| ApiError::internal("failed to reload claim after audit start"))?;

    info!(claim_id = %claim.id, admin_id = %admin.agent.id, "audit started");
    Ok(Json(claim))
}

pub async fn approve_claim(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(raw_id): Path<String>,
    OptionalJson(request): OptionalJson<ApproveClaimRequest>,
) -> Result<Json<ApproveClaimResponse>, ApiError> {
    let claim_id = parse_claim_id(&raw_id)?;
    let note = optional_text("note", request.note.as_deref(), 500)?;

    let mut conn = state.db.lock().await;
    let response = verify_claim(&mut conn, claim_id, note.as_deref())?;

    info!(
        claim_id = %response.claim.id,
        agent_id = %response.agent.id,
        admin_id = %admin.agent.id,
        xp_awarded = response.xp_awarded,
        "claim verified"
    );
    Ok(Json(response))
}

fn verify_claim(
    conn: &mut Connection,
    claim_id: ClaimId,
    note: Option<&str>,
) -> Result<ApproveClaimResponse, ApiError> {
    let tx = conn.transaction()?;
    let now = now_ms();

    let claim = claim_for_transition(&tx, claim_id, ClaimStatus::Verified)?;
    let mission = db::fetch_mission(&tx, claim.mission_id)?
        .ok_or_else(|| ApiError::internal("claim references a missing mission"))?;
    let agent = reload_agent(&tx, claim.agent_id)?;

    // Stake comes back on top of the reward.
    let xp_award = mission
        .xp_reward
        .checked_add(claim.staked_xp)
        .filter(|award| agent.xp.checked_add(*award).is_some())
        .ok_or_else(|| ApiError::conflict("xp award would overflow the agent's total"))?;
    if agent.usd_balance_cents.checked_add(mission.usd_reward_cents).is_none()
        || agent.total_earned_cents.checked_add(mission.usd_reward_cents).is_none()
    {
        return Err(ApiError::conflict("usd reward would overflow the agent's balance"));
    }
    db::adjust_agent_xp(&tx, claim.agent_id, xp_award, now)?;
    db::credit_reward(&tx, claim.agent_id, mission.usd_reward_cents, now)?;
    db::set_claim_status(&tx, claim.id, ClaimStatus::Verified, Some(note.unwrap_or("verified")), now)?;

    let claim = db::fetch_claim(&tx, claim.id)?
        .ok_or_else(|| ApiError::internal("failed to reload claim after verification"))?;
    let agent = reload_agent(&tx, claim.agent_id)?;
    tx.commit()?;

    Ok(ApproveClaimResponse {
        claim,
        agent,
        xp_awarded: mission.xp_reward,
        usd_awarded_cents: mission.usd_reward_cents,
    })
}

/// Rejects a claim: the stake is forfeited, the agent gains a fraud flag and
/// its trust tier is escalated. One transaction.
pub async fn reject_claim(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(raw_id): Path<String>,
    OptionalJson(request): OptionalJson<RejectClaimRequest>,
) -> Result<Json<RejectClaimResponse>, ApiError> {
    let claim_id = parse_claim_id(&raw_id)?;
    let reason = optional_text("reason", request.reason.as_deref(), 500)?
        .unwrap_or_else(|| "rejected".to_string());

    let mut conn = state.db.lock().await;
    let response = reject(&mut conn, claim_id, &reason)?;

    if response.previous_tier != response.new_tier {
        warn!(
            agent_id = %response.agent.id,
            from = %response.previous_tier,
            to = %response.new_tier,
            fraud_flags = response.agent.fraud_flags,
            "trust tier escalated"
        );
    }
    info!(claim_id = %response.claim.id, admin_id = %admin.agent.id, "claim rejected");
    Ok(Json(response))
}

fn reject(conn: &mut Connection, claim_id: ClaimId, reason: &str) -> Result<RejectClaimResponse, ApiError> {
    let tx = conn.transaction()?;
    let now = now_ms();

    let claim = claim_for_transition(&tx, claim_id, ClaimStatus::Rejected)?;
    db::set_claim_status(&tx, claim.id, ClaimStatus::Rejected, Some(reason), now)?;
    db::release_mission_slot(&tx, claim.mission_id, now)?;

    let (fraud_flags, previous_tier, new_tier) = db::record_fraud_flag(&tx, claim.agent_id, now)?;
    db::insert_trust_event(
        &tx,
        &db::NewTrustEvent {
            agent_id: claim.agent_id,
            claim_id: Some(claim.id),
            previous_tier,
            new_tier,
            fraud_flags,
            reason,
        },
        now,
    )?;

    let claim = db::fetch_claim(&tx, claim.id)?
        .ok_or_else(|| ApiError::internal("failed to reload claim after rejection"))?;
    let agent = reload_agent(&tx, claim.agent_id)?;
    tx.commit()?;

    Ok(RejectClaimResponse { claim, agent, previous_tier, new_tier })
}

fn reload_agent(conn: &Connection, agent_id: AgentId) -> Result<AgentProfile, ApiError> {
    db::fetch_agent(conn, agent_id)?
        .ok_or_else(|| ApiError::internal("claim references a missing agent"))
}

pub async fn list_missions(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<MissionView>>, ApiError> {
    let conn = state.db.lock().await;
    Ok(Json(db::query_missions(&conn, None)?))
}

pub async fn update_mission(
    State(state): State<AppState>,
    admin: AdminSession,
    ApiJson(request): ApiJson<UpdateMissionRequest>,
) -> Result<Json<MissionView>, ApiError> {
    MissionTerms {
        max_claims: request.max_claims,
        xp_reward: request.xp_reward,
        ..MissionTerms::default()
    }
    .validate()
    .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let conn = state.db.lock().await;
    let existing = db::fetch_mission(&conn, request.id)?
        .ok_or_else(|| ApiError::not_found("mission not found"))?;
    if let Some(max_claims) = request.max_claims
        && max_claims < existing.current_claims
    {
        return Err(ApiError::bad_request(format!(
            "max_claims must not be below current claims ({})",
            existing.current_claims
        )));
    }

    db::update_mission(&conn, existing.id, request.status, request.max_claims, request.xp_reward, now_ms())?;
    let mission = db::fetch_mission(&conn, existing.id)?
        .ok_or_else(|| ApiError::internal("failed to reload mission after update"))?;

    info!(mission_id = %mission.id, admin_id = %admin.agent.id, status = mission.status.as_str(), "mission updated");
    Ok(Json(mission))
}

pub async fn trust_agents(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<AgentProfile>>, ApiError> {
    let conn = state.db.lock().await;
    Ok(Json(db::query_flagged_agents(&conn)?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<u32>,
}

pub async fn trust_history(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<Vec<TrustEventView>>, ApiError> {
    let limit = clamp_limit(query.limit, TRUST_HISTORY_DEFAULT, TRUST_HISTORY_MAX);
    let conn = state.db.lock().await;
    Ok(Json(db::query_trust_events(&conn, limit)?))
}
