use super::{clamp_limit, http_url, optional_text};
use crate::{
    AppState,
    auth::Session,
    db,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
};
use agentquest_core::{normalize_wallet_address, now_ms};
use agentquest_protocol::{AgentProfile, LeaderboardEntry, UpdateProfileRequest};
use axum::{Json, extract::State};
use serde::Deserialize;

const LEADERBOARD_DEFAULT: u32 = 25;
const LEADERBOARD_MAX: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    limit: Option<u32>,
}

pub async fn leaderboard(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let limit = clamp_limit(query.limit, LEADERBOARD_DEFAULT, LEADERBOARD_MAX);
    let conn = state.db.lock().await;
    let agents = db::query_leaderboard(&conn, limit)?;

    let entries = agents
        .into_iter()
        .zip(1u32..)
        .map(|(agent, position)| LeaderboardEntry {
            position,
            agent_id: agent.id,
            wallet_address: agent.wallet_address,
            name: agent.name,
            avatar_url: agent.avatar_url,
            xp: agent.xp,
            rank_title: agent.rank_title,
            missions_completed: agent.missions_completed,
        })
        .collect();
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    wallet: Option<String>,
}

pub async fn profile(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProfileQuery>,
) -> Result<Json<AgentProfile>, ApiError> {
    let raw = query.wallet.ok_or_else(|| ApiError::bad_request("wallet is required"))?;
    let wallet =
        normalize_wallet_address(&raw).map_err(|err| ApiError::bad_request(err.to_string()))?;

    let conn = state.db.lock().await;
    let agent = db::fetch_agent_by_wallet(&conn, &wallet)?
        .ok_or_else(|| ApiError::not_found("agent not found"))?;
    Ok(Json(agent))
}

pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<AgentProfile>, ApiError> {
    let name = optional_text("name", request.name.as_deref(), 64)?;
    let tagline = optional_text("tagline", request.tagline.as_deref(), 160)?;
    let avatar_url = match request.avatar_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(http_url("avatar_url", raw)?),
    };

    let conn = state.db.lock().await;
    let updated = db::update_agent_profile(
        &conn,
        session.agent_id(),
        name.as_deref(),
        tagline.as_deref(),
        avatar_url.as_deref(),
        now_ms(),
    )?;
    if updated == 0 {
        return Err(ApiError::unauthorized("session agent no longer exists"));
    }
    let agent = db::fetch_agent(&conn, session.agent_id())?
        .ok_or_else(|| ApiError::internal("failed to reload agent after update"))?;
    Ok(Json(agent))
}
