use super::{http_url, required_text};
use crate::{AppState, auth::Session, db, error::ApiError, extract::ApiJson};
use agentquest_core::{MissionStatus, MissionTerms, now_ms};
use agentquest_protocol::{CreateMissionRequest, MissionView};
use axum::{Json, extract::State};
use tracing::info;

const DEFAULT_MAX_CLAIMS: i64 = 10;

pub async fn list_active(State(state): State<AppState>) -> Result<Json<Vec<MissionView>>, ApiError> {
    let conn = state.db.lock().await;
    Ok(Json(db::query_missions(&conn, Some(MissionStatus::Active))?))
}

pub async fn create(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<CreateMissionRequest>,
) -> Result<Json<MissionView>, ApiError> {
    let title = required_text("title", &request.title, 120)?;
    let mission_type = required_text("type", &request.mission_type, 32)?;
    let target_url = match request.target_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(http_url("target_url", raw)?),
    };
    let max_claims = request.max_claims.unwrap_or(DEFAULT_MAX_CLAIMS);
    let usd_reward_cents = request.usd_reward_cents.unwrap_or(0);
    let stake_required = request.stake_required.unwrap_or(0);
    MissionTerms {
        max_claims: Some(max_claims),
        xp_reward: Some(request.xp_reward),
        usd_reward_cents: Some(usd_reward_cents),
        stake_required: Some(stake_required),
    }
    .validate()
    .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let creator = session.agent;
    if !creator.trust_tier.can_submit_claims() {
        return Err(ApiError::forbidden(format!(
            "agents on the {} tier cannot create missions",
            creator.trust_tier
        )));
    }

    let conn = state.db.lock().await;
    let now = now_ms();
    let mission_id = db::insert_mission(
        &conn,
        &db::NewMission {
            title: &title,
            mission_type: &mission_type,
            creator_id: Some(creator.id),
            status: MissionStatus::Active,
            target_url: target_url.as_deref(),
            max_claims,
            xp_reward: request.xp_reward,
            usd_reward_cents,
            stake_required,
        },
        now,
    )?;
    let mission = db::fetch_mission(&conn, mission_id)?
        .ok_or_else(|| ApiError::internal("failed to reload mission after creation"))?;

    info!(mission_id = %mission.id, creator_id = %creator.id, "created mission");
    Ok(Json(mission))
}
