use super::required_text;
use crate::{AppState, auth::Session, db, error::ApiError, extract::ApiJson};
use agentquest_core::{AgentId, TrustTier, format_usd, now_ms};
use agentquest_protocol::{PayoutRequest, PayoutSummary, PayoutView};
use axum::{Json, extract::State};
use rusqlite::Connection;
use tracing::info;

pub const MIN_PAYOUT_CENTS: i64 = 100;

pub async fn summary(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<PayoutSummary>, ApiError> {
    let agent = session.agent;
    let conn = state.db.lock().await;
    let payouts = db::query_payouts(&conn, agent.id)?;
    Ok(Json(PayoutSummary {
        usd_balance_cents: agent.usd_balance_cents,
        total_earned_cents: agent.total_earned_cents,
        total_withdrawn_cents: agent.total_withdrawn_cents,
        payouts,
    }))
}

pub async fn request(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<PayoutRequest>,
) -> Result<Json<PayoutView>, ApiError> {
    if request.amount_cents < MIN_PAYOUT_CENTS {
        return Err(ApiError::bad_request(format!(
            "amount must be at least {}",
            format_usd(MIN_PAYOUT_CENTS)
        )));
    }
    let destination = required_text("destination", &request.destination, 128)?;

    let mut conn = state.db.lock().await;
    let payout = request_payout(&mut conn, session.agent_id(), request.amount_cents, &destination)?;

    info!(
        payout_id = payout.id,
        agent_id = %payout.agent_id,
        amount = %format_usd(payout.amount_cents),
        "payout requested"
    );
    Ok(Json(payout))
}

fn request_payout(
    conn: &mut Connection,
    agent_id: AgentId,
    amount_cents: i64,
    destination: &str,
) -> Result<PayoutView, ApiError> {
    let tx = conn.transaction()?;
    let now = now_ms();

    let agent = db::fetch_agent(&tx, agent_id)?
        .ok_or_else(|| ApiError::unauthorized("session agent no longer exists"))?;
    if agent.trust_tier == TrustTier::Banned {
        return Err(ApiError::forbidden("banned agents cannot withdraw"));
    }
    if !db::debit_balance(&tx, agent.id, amount_cents, now)? {
        return Err(ApiError::conflict(format!(
            "insufficient balance: requested {}, available {}",
            format_usd(amount_cents),
            format_usd(agent.usd_balance_cents)
        )));
    }
    let payout = db::insert_payout(&tx, agent.id, amount_cents, destination, now)?;

    tx.commit()?;
    Ok(payout)
}
