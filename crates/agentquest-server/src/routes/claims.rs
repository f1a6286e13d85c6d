use super::{http_url, optional_text};
use crate::{AppState, auth::Session, db, error::ApiError, extract::ApiJson};
use agentquest_core::{AgentId, MissionStatus, mission_has_capacity, now_ms};
use agentquest_protocol::{ClaimView, SubmitClaimRequest};
use axum::{Json, extract::State};
use rusqlite::Connection;
use tracing::info;

pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<SubmitClaimRequest>,
) -> Result<Json<ClaimView>, ApiError> {
    if request.mission_id.0 <= 0 {
        return Err(ApiError::bad_request("mission_id must be a positive integer"));
    }
    let proof_url = http_url("proof_url", &request.proof_url)?;
    let proof_notes = optional_text("proof_notes", request.proof_notes.as_deref(), 2000)?;

    let mut conn = state.db.lock().await;
    let claim = submit_claim(&mut conn, session.agent_id(), &request, &proof_url, proof_notes.as_deref())?;

    info!(
        claim_id = %claim.id,
        mission_id = %claim.mission_id,
        agent_id = %claim.agent_id,
        staked_xp = claim.staked_xp,
        "claim submitted"
    );
    Ok(Json(claim))
}

fn submit_claim(
    conn: &mut Connection,
    agent_id: AgentId,
    request: &SubmitClaimRequest,
    proof_url: &str,
    proof_notes: Option<&str>,
) -> Result<ClaimView, ApiError> {
    let tx = conn.transaction()?;
    let now = now_ms();

    let agent = db::fetch_agent(&tx, agent_id)?
        .ok_or_else(|| ApiError::unauthorized("session agent no longer exists"))?;
    if !agent.trust_tier.can_submit_claims() {
        return Err(ApiError::forbidden(format!(
            "agents on the {} tier cannot submit claims",
            agent.trust_tier
        )));
    }

    let mission = db::fetch_mission(&tx, request.mission_id)?
        .ok_or_else(|| ApiError::not_found("mission not found"))?;
    if mission.status != MissionStatus::Active {
        return Err(ApiError::conflict("mission is not accepting claims"));
    }
    if mission.creator_id == Some(agent.id) {
        return Err(ApiError::conflict("agents cannot claim their own missions"));
    }
    if !mission_has_capacity(mission.current_claims, mission.max_claims) {
        return Err(ApiError::conflict("mission has reached its claim limit"));
    }
    if db::has_blocking_claim(&tx, agent.id, mission.id)? {
        return Err(ApiError::conflict("agent already has a claim on this mission"));
    }
    if agent.xp < mission.stake_required {
        return Err(ApiError::conflict(format!(
            "mission requires a stake of {} xp, agent has {}",
            mission.stake_required, agent.xp
        )));
    }

    if !db::reserve_mission_slot(&tx, mission.id, now)? {
        return Err(ApiError::conflict("mission has reached its claim limit"));
    }
    if mission.stake_required > 0 {
        db::adjust_agent_xp(&tx, agent.id, -mission.stake_required, now)?;
    }
    let claim_id = db::insert_claim(
        &tx,
        mission.id,
        agent.id,
        proof_url,
        proof_notes,
        mission.stake_required,
        now,
    )?;
    let claim = db::fetch_claim(&tx, claim_id)?
        .ok_or_else(|| ApiError::internal("failed to reload claim after submission"))?;

    tx.commit()?;
    Ok(claim)
}

pub async fn list_own(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<ClaimView>>, ApiError> {
    let conn = state.db.lock().await;
    Ok(Json(db::query_agent_claims(&conn, session.agent_id())?))
}
