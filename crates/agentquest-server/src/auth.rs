//! Bearer-token sessions.
//!
//! `Authorization: Bearer <token>` where the token is a [`SessionClaims`]
//! signed with the server's session key.

use crate::{AppState, db, error::ApiError};
use agentquest_core::{AgentId, now_ms};
use agentquest_protocol::{AgentProfile, SessionClaims};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

/// A verified token whose agent still exists. `agent` is the profile as
/// loaded when the request was extracted.
#[derive(Debug, Clone)]
pub struct Session {
    pub claims: SessionClaims,
    pub agent: AgentProfile,
}

impl Session {
    pub fn agent_id(&self) -> AgentId {
        self.agent.id
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return None;
    }
    Some(token.trim())
}

impl<S> FromRequestParts<S> for Session
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
        let claims = SessionClaims::verify(token, app.session_key(), now_ms()).map_err(|err| {
            debug!(error = %err, "rejected session token");
            ApiError::unauthorized(err.to_string())
        })?;

        let conn = app.db.lock().await;
        let agent = db::fetch_agent(&conn, claims.agent_id)?;
        drop(conn);
        let Some(agent) = agent else {
            debug!(agent_id = %claims.agent_id, "session for unknown agent");
            return Err(ApiError::unauthorized("session agent no longer exists"));
        };
        Ok(Self { claims, agent })
    }
}

/// A session whose agent currently holds the admin tier. The tier is read
/// from the store on every request.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub agent: AgentProfile,
}

impl<S> FromRequestParts<S> for AdminSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Session { agent, .. } = Session::from_request_parts(parts, state).await?;
        if !agent.trust_tier.is_admin() {
            warn!(agent_id = %agent.id, path = %parts.uri.path(), "non-admin hit admin route");
            return Err(ApiError::forbidden("admin access required"));
        }
        Ok(Self { agent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer   xyz "));
        assert_eq!(bearer_token(&headers), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
