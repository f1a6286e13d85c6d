use super::optional_text;
use crate::{
    AppState,
    auth::Session,
    db,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
};
use agentquest_core::{AgentId, normalize_wallet_address, now_ms};
use agentquest_protocol::{AgentProfile, LoginRequest, LoginResponse, SessionClaims};
use axum::{Json, extract::State, response::Redirect};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Wallet login. Creates the agent on first sight of the wallet.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let wallet = normalize_wallet_address(&request.wallet_address)
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let requested_name = optional_text("name", request.name.as_deref(), 64)?;
    let now = now_ms();

    let conn = state.db.lock().await;
    let (agent, created) = match db::fetch_agent_by_wallet(&conn, &wallet)? {
        Some(agent) => (agent, false),
        None => {
            let agent_id = AgentId::new();
            let name = requested_name.unwrap_or_else(|| default_agent_name(&wallet));
            db::insert_agent(&conn, agent_id, &wallet, &name, now)?;
            let agent = db::fetch_agent(&conn, agent_id)?
                .ok_or_else(|| ApiError::internal("failed to reload agent after creation"))?;
            info!(agent_id = %agent.id, wallet = %wallet, "registered agent");
            (agent, true)
        }
    };
    drop(conn);

    let claims = SessionClaims::new(agent.id, &agent.wallet_address, now, state.config.session_ttl_ms());
    let token = claims
        .sign(state.session_key())
        .map_err(|err| ApiError::internal(format!("failed to sign session: {err}")))?;
    info!(agent_id = %agent.id, created, "issued session");

    Ok(Json(LoginResponse { token, expires_at_ms: claims.expires_at_ms, created, agent }))
}

/// `agent-` followed by the first six address characters after any `0x`.
fn default_agent_name(wallet: &str) -> String {
    let body = wallet.strip_prefix("0x").unwrap_or(wallet);
    let short: String = body.chars().take(6).collect();
    format!("agent-{short}")
}

/// Starts the YouTube OAuth handshake: stores a fresh state token on the
/// agent and redirects to the provider.
pub async fn youtube_start(
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect, ApiError> {
    let youtube = &state.config.youtube;
    let client_id = youtube
        .client_id
        .as_deref()
        .ok_or_else(|| ApiError::unavailable("youtube linking is not configured"))?;

    let oauth_state = Uuid::new_v4().simple().to_string();
    let conn = state.db.lock().await;
    let updated = db::set_youtube_state(&conn, session.agent_id(), &oauth_state, now_ms())?;
    drop(conn);
    if updated == 0 {
        return Err(ApiError::unauthorized("session agent no longer exists"));
    }

    let url = url::Url::parse_with_params(
        &youtube.authorize_url,
        &[
            ("client_id", client_id),
            ("redirect_uri", youtube.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", youtube.scope.as_str()),
            ("access_type", "offline"),
            ("state", oauth_state.as_str()),
        ],
    )
    .map_err(|err| ApiError::internal(format!("invalid youtube authorize url: {err}")))?;

    info!(agent_id = %session.agent_id(), "starting youtube link");
    Ok(Redirect::temporary(url.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct YoutubeCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn youtube_callback(
    State(state): State<AppState>,
    ApiQuery(callback): ApiQuery<YoutubeCallback>,
) -> Result<Json<AgentProfile>, ApiError> {
    if let Some(error) = callback.error {
        return Err(ApiError::bad_request(format!("youtube authorization failed: {error}")));
    }
    let oauth_state = callback
        .state
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("state is required"))?;
    let code = callback
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("code is required"))?;

    let conn = state.db.lock().await;
    let agent_id = db::complete_youtube_link(&conn, &oauth_state, &code, now_ms())?
        .ok_or_else(|| ApiError::bad_request("unknown or already used oauth state"))?;
    let agent = db::fetch_agent(&conn, agent_id)?
        .ok_or_else(|| ApiError::internal("failed to reload agent after youtube link"))?;

    info!(agent_id = %agent.id, "linked youtube account");
    Ok(Json(agent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names() {
        assert_eq!(default_agent_name("0xabcdef1234"), "agent-abcdef");
        assert_eq!(default_agent_name("sol1"), "agent-sol1");
    }
}
