use agentquest_core::{
    AgentId, ClaimId, ClaimStatus, MissionId, MissionStatus, PayoutStatus, TrustTier, rank_title,
};
use agentquest_protocol::{
    AgentProfile, AuditQueueEntry, ClaimView, MissionView, PayoutView, TrustEventView,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use std::{fs, path::Path};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS agents (
      id TEXT PRIMARY KEY,
      wallet_address TEXT NOT NULL UNIQUE,
      name TEXT NOT NULL,
      tagline TEXT,
      avatar_url TEXT,
      xp INTEGER NOT NULL DEFAULT 0,
      rank_title TEXT NOT NULL,
      missions_completed INTEGER NOT NULL DEFAULT 0,
      trust_tier TEXT NOT NULL DEFAULT 'normal',
      fraud_flags INTEGER NOT NULL DEFAULT 0,
      usd_balance_cents INTEGER NOT NULL DEFAULT 0,
      total_earned_cents INTEGER NOT NULL DEFAULT 0,
      total_withdrawn_cents INTEGER NOT NULL DEFAULT 0,
      youtube_oauth_state TEXT,
      youtube_auth_code TEXT,
      youtube_linked_at_ms INTEGER,
      created_at_ms INTEGER NOT NULL,
      updated_at_ms INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS missions (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      title TEXT NOT NULL,
      type TEXT NOT NULL,
      creator_id TEXT,
      status TEXT NOT NULL,
      target_url TEXT,
      current_claims INTEGER NOT NULL DEFAULT 0,
      max_claims INTEGER NOT NULL,
      xp_reward INTEGER NOT NULL,
      usd_reward_cents INTEGER NOT NULL DEFAULT 0,
      stake_required INTEGER NOT NULL DEFAULT 0,
      created_at_ms INTEGER NOT NULL,
      updated_at_ms INTEGER NOT NULL,
      FOREIGN KEY(creator_id) REFERENCES agents(id)
    );

    CREATE TABLE IF NOT EXISTS claims (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      mission_id INTEGER NOT NULL,
      agent_id TEXT NOT NULL,
      status TEXT NOT NULL,
      proof_url TEXT NOT NULL,
      proof_notes TEXT,
      staked_xp INTEGER NOT NULL DEFAULT 0,
      submitted_at_ms INTEGER NOT NULL,
      audit_result TEXT,
      audited_at_ms INTEGER,
      FOREIGN KEY(mission_id) REFERENCES missions(id),
      FOREIGN KEY(agent_id) REFERENCES agents(id)
    );
    CREATE INDEX IF NOT EXISTS claims_status_idx ON claims(status, submitted_at_ms);
    CREATE INDEX IF NOT EXISTS claims_agent_idx ON claims(agent_id, mission_id);

    CREATE TABLE IF NOT EXISTS payouts (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      agent_id TEXT NOT NULL,
      amount_cents INTEGER NOT NULL,
      destination TEXT NOT NULL,
      status TEXT NOT NULL,
      requested_at_ms INTEGER NOT NULL,
      FOREIGN KEY(agent_id) REFERENCES agents(id)
    );

    CREATE TABLE IF NOT EXISTS trust_events (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      agent_id TEXT NOT NULL,
      claim_id INTEGER,
      previous_tier TEXT NOT NULL,
      new_tier TEXT NOT NULL,
      fraud_flags INTEGER NOT NULL,
      reason TEXT NOT NULL,
      created_at_ms INTEGER NOT NULL,
      FOREIGN KEY(agent_id) REFERENCES agents(id),
      FOREIGN KEY(claim_id) REFERENCES claims(id)
    );
";

const AGENT_COLUMNS: &str = "id, wallet_address, name, tagline, avatar_url, xp, rank_title, \
    missions_completed, trust_tier, fraud_flags, usd_balance_cents, total_earned_cents, \
    total_withdrawn_cents, youtube_linked_at_ms, created_at_ms";

const MISSION_COLUMNS: &str = "id, title, type, creator_id, status, target_url, current_claims, \
    max_claims, xp_reward, usd_reward_cents, stake_required, created_at_ms";

const CLAIM_COLUMNS: &str = "c.id, c.mission_id, c.agent_id, c.status, c.proof_url, c.proof_notes, \
    c.staked_xp, c.submitted_at_ms, c.audit_result, c.audited_at_ms";

pub fn init_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

pub fn init_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

fn agent_id_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<AgentId> {
    row.get::<_, String>(idx)?
        .parse()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn opt_ms(value: Option<i64>) -> Option<u64> {
    value.map(|v| v as u64)
}

// ---- agents -------------------------------------------------------------

fn map_agent_row(row: &Row<'_>) -> rusqlite::Result<AgentProfile> {
    Ok(AgentProfile {
        id: agent_id_at(row, 0)?,
        wallet_address: row.get(1)?,
        name: row.get(2)?,
        tagline: row.get(3)?,
        avatar_url: row.get(4)?,
        xp: row.get(5)?,
        rank_title: row.get(6)?,
        missions_completed: row.get(7)?,
        trust_tier: TrustTier::from_db(&row.get::<_, String>(8)?),
        fraud_flags: row.get(9)?,
        usd_balance_cents: row.get(10)?,
        total_earned_cents: row.get(11)?,
        total_withdrawn_cents: row.get(12)?,
        youtube_linked_at_ms: opt_ms(row.get(13)?),
        created_at_ms: row.get::<_, i64>(14)? as u64,
    })
}

pub fn insert_agent(
    conn: &Connection,
    agent_id: AgentId,
    wallet_address: &str,
    name: &str,
    now: u64,
) -> rusqlite::Result<()> {
    conn.execute(
        "
        INSERT INTO agents (id, wallet_address, name, rank_title, trust_tier, created_at_ms, updated_at_ms)
        VALUES (?1, ?2, ?3, ?4, 'normal', ?5, ?5)
        ",
        params![agent_id.to_string(), wallet_address, name, rank_title(0), now],
    )?;
    Ok(())
}

pub fn fetch_agent(conn: &Connection, agent_id: AgentId) -> rusqlite::Result<Option<AgentProfile>> {
    conn.query_row(
        &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
        params![agent_id.to_string()],
        map_agent_row,
    )
    .optional()
}

pub fn fetch_agent_by_wallet(
    conn: &Connection,
    wallet_address: &str,
) -> rusqlite::Result<Option<AgentProfile>> {
    conn.query_row(
        &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE wallet_address = ?1"),
        params![wallet_address],
        map_agent_row,
    )
    .optional()
}

pub fn query_agents(conn: &Connection) -> rusqlite::Result<Vec<AgentProfile>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY created_at_ms DESC"))?;
    let rows = stmt.query_map([], map_agent_row)?;
    rows.collect()
}

/// Highest XP first; banned agents are left off the board.
pub fn query_leaderboard(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<AgentProfile>> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {AGENT_COLUMNS} FROM agents
        WHERE trust_tier != 'banned'
        ORDER BY xp DESC, missions_completed DESC, name ASC
        LIMIT ?1
        "
    ))?;
    let rows = stmt.query_map(params![limit], map_agent_row)?;
    rows.collect()
}

pub fn query_flagged_agents(conn: &Connection) -> rusqlite::Result<Vec<AgentProfile>> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {AGENT_COLUMNS} FROM agents
        WHERE trust_tier != 'admin' AND (fraud_flags > 0 OR trust_tier != 'normal')
        ORDER BY fraud_flags DESC, updated_at_ms DESC
        "
    ))?;
    let rows = stmt.query_map([], map_agent_row)?;
    rows.collect()
}

pub fn update_agent_profile(
    conn: &Connection,
    agent_id: AgentId,
    name: Option<&str>,
    tagline: Option<&str>,
    avatar_url: Option<&str>,
    now: u64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "
        UPDATE agents
        SET name = COALESCE(?2, name),
            tagline = COALESCE(?3, tagline),
            avatar_url = COALESCE(?4, avatar_url),
            updated_at_ms = ?5
        WHERE id = ?1
        ",
        params![agent_id.to_string(), name, tagline, avatar_url, now],
    )
}

pub fn set_trust_tier(
    conn: &Connection,
    wallet_address: &str,
    tier: TrustTier,
    now: u64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE agents SET trust_tier = ?2, updated_at_ms = ?3 WHERE wallet_address = ?1",
        params![wallet_address, tier.as_str(), now],
    )
}

/// Adds to (or, with a negative delta, takes from) an agent's XP and
/// recomputes the rank title from the new total.
pub fn adjust_agent_xp(
    conn: &Connection,
    agent_id: AgentId,
    delta: i64,
    now: u64,
) -> rusqlite::Result<i64> {
    let xp: i64 = conn.query_row(
        "UPDATE agents SET xp = xp + ?2, updated_at_ms = ?3 WHERE id = ?1 RETURNING xp",
        params![agent_id.to_string(), delta, now],
        |row| row.get(0),
    )?;
    conn.execute(
        "UPDATE agents SET rank_title = ?2 WHERE id = ?1",
        params![agent_id.to_string(), rank_title(xp)],
    )?;
    Ok(xp)
}

pub fn set_youtube_state(
    conn: &Connection,
    agent_id: AgentId,
    state: &str,
    now: u64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE agents SET youtube_oauth_state = ?2, updated_at_ms = ?3 WHERE id = ?1",
        params![agent_id.to_string(), state, now],
    )
}

/// Consumes a pending OAuth state and records the linkage. Returns the
/// linked agent, or `None` when no agent holds that state.
pub fn complete_youtube_link(
    conn: &Connection,
    state: &str,
    auth_code: &str,
    now: u64,
) -> rusqlite::Result<Option<AgentId>> {
    let agent_id = conn
        .query_row(
            "SELECT id FROM agents WHERE youtube_oauth_state = ?1",
            params![state],
            |row| agent_id_at(row, 0),
        )
        .optional()?;
    if let Some(agent_id) = agent_id {
        conn.execute(
            "
            UPDATE agents
            SET youtube_oauth_state = NULL,
                youtube_auth_code = ?2,
                youtube_linked_at_ms = ?3,
                updated_at_ms = ?3
            WHERE id = ?1
            ",
            params![agent_id.to_string(), auth_code, now],
        )?;
    }
    Ok(agent_id)
}

// ---- missions -----------------------------------------------------------

fn map_mission_row(row: &Row<'_>) -> rusqlite::Result<MissionView> {
    let creator_id = match row.get::<_, Option<String>>(3)? {
        Some(_) => Some(agent_id_at(row, 3)?),
        None => None,
    };
    Ok(MissionView {
        id: MissionId(row.get(0)?),
        title: row.get(1)?,
        mission_type: row.get(2)?,
        creator_id,
        status: MissionStatus::from_db(&row.get::<_, String>(4)?),
        target_url: row.get(5)?,
        current_claims: row.get(6)?,
        max_claims: row.get(7)?,
        xp_reward: row.get(8)?,
        usd_reward_cents: row.get(9)?,
        stake_required: row.get(10)?,
        created_at_ms: row.get::<_, i64>(11)? as u64,
    })
}

pub struct NewMission<'a> {
    pub title: &'a str,
    pub mission_type: &'a str,
    pub creator_id: Option<AgentId>,
    pub status: MissionStatus,
    pub target_url: Option<&'a str>,
    pub max_claims: i64,
    pub xp_reward: i64,
    pub usd_reward_cents: i64,
    pub stake_required: i64,
}

pub fn insert_mission(
    conn: &Connection,
    mission: &NewMission<'_>,
    now: u64,
) -> rusqlite::Result<MissionId> {
    conn.execute(
        "
        INSERT INTO missions (
          title, type, creator_id, status, target_url, current_claims, max_claims,
          xp_reward, usd_reward_cents, stake_required, created_at_ms, updated_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10, ?10)
        ",
        params![
            mission.title,
            mission.mission_type,
            mission.creator_id.map(|id| id.to_string()),
            mission.status.as_str(),
            mission.target_url,
            mission.max_claims,
            mission.xp_reward,
            mission.usd_reward_cents,
            mission.stake_required,
            now
        ],
    )?;
    Ok(MissionId(conn.last_insert_rowid()))
}

pub fn fetch_mission(conn: &Connection, id: MissionId) -> rusqlite::Result<Option<MissionView>> {
    conn.query_row(
        &format!("SELECT {MISSION_COLUMNS} FROM missions WHERE id = ?1"),
        params![id.0],
        map_mission_row,
    )
    .optional()
}

pub fn query_missions(
    conn: &Connection,
    status: Option<MissionStatus>,
) -> rusqlite::Result<Vec<MissionView>> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {MISSION_COLUMNS} FROM missions
        WHERE ?1 IS NULL OR status = ?1
        ORDER BY created_at_ms DESC, id DESC
        "
    ))?;
    let rows = stmt.query_map(params![status.map(MissionStatus::as_str)], map_mission_row)?;
    rows.collect()
}

pub fn update_mission(
    conn: &Connection,
    id: MissionId,
    status: Option<MissionStatus>,
    max_claims: Option<i64>,
    xp_reward: Option<i64>,
    now: u64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "
        UPDATE missions
        SET status = COALESCE(?2, status),
            max_claims = COALESCE(?3, max_claims),
            xp_reward = COALESCE(?4, xp_reward),
            updated_at_ms = ?5
        WHERE id = ?1
        ",
        params![id.0, status.map(MissionStatus::as_str), max_claims, xp_reward, now],
    )
}

/// Takes one claim slot. Returns `false` when the mission is already full.
pub fn reserve_mission_slot(conn: &Connection, id: MissionId, now: u64) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "
        UPDATE missions SET current_claims = current_claims + 1, updated_at_ms = ?2
        WHERE id = ?1 AND current_claims < max_claims
        ",
        params![id.0, now],
    )?;
    Ok(changed == 1)
}

pub fn release_mission_slot(conn: &Connection, id: MissionId, now: u64) -> rusqlite::Result<()> {
    conn.execute(
        "
        UPDATE missions SET current_claims = MAX(current_claims - 1, 0), updated_at_ms = ?2
        WHERE id = ?1
        ",
        params![id.0, now],
    )?;
    Ok(())
}

// ---- claims -------------------------------------------------------------

fn map_claim_row(row: &Row<'_>) -> rusqlite::Result<ClaimView> {
    Ok(ClaimView {
        id: ClaimId(row.get(0)?),
        mission_id: MissionId(row.get(1)?),
        agent_id: agent_id_at(row, 2)?,
        status: ClaimStatus::from_db(&row.get::<_, String>(3)?),
        proof_url: row.get(4)?,
        proof_notes: row.get(5)?,
        staked_xp: row.get(6)?,
        submitted_at_ms: row.get::<_, i64>(7)? as u64,
        audit_result: row.get(8)?,
        audited_at_ms: opt_ms(row.get(9)?),
    })
}

pub fn insert_claim(
    conn: &Connection,
    mission_id: MissionId,
    agent_id: AgentId,
    proof_url: &str,
    proof_notes: Option<&str>,
    staked_xp: i64,
    now: u64,
) -> rusqlite::Result<ClaimId> {
    conn.execute(
        "
        INSERT INTO claims (mission_id, agent_id, status, proof_url, proof_notes, staked_xp, submitted_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            mission_id.0,
            agent_id.to_string(),
            ClaimStatus::Submitted.as_str(),
            proof_url,
            proof_notes,
            staked_xp,
            now
        ],
    )?;
    Ok(ClaimId(conn.last_insert_rowid()))
}

pub fn fetch_claim(conn: &Connection, id: ClaimId) -> rusqlite::Result<Option<ClaimView>> {
    conn.query_row(
        &format!("SELECT {CLAIM_COLUMNS} FROM claims c WHERE c.id = ?1"),
        params![id.0],
        map_claim_row,
    )
    .optional()
}

pub fn query_agent_claims(conn: &Connection, agent_id: AgentId) -> rusqlite::Result<Vec<ClaimView>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CLAIM_COLUMNS} FROM claims c WHERE c.agent_id = ?1 ORDER BY c.submitted_at_ms DESC, c.id DESC"
    ))?;
    let rows = stmt.query_map(params![agent_id.to_string()], map_claim_row)?;
    rows.collect()
}

/// An open or verified claim by this agent blocks another claim on the
/// same mission. Rejected claims do not.
pub fn has_blocking_claim(
    conn: &Connection,
    agent_id: AgentId,
    mission_id: MissionId,
) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "
        SELECT EXISTS(
          SELECT 1 FROM claims
          WHERE agent_id = ?1 AND mission_id = ?2 AND status != 'rejected'
        )
        ",
        params![agent_id.to_string(), mission_id.0],
        |row| row.get(0),
    )?;
    Ok(exists != 0)
}

/// Oldest first, so the queue is worked in submission order.
pub fn query_audit_queue(conn: &Connection) -> rusqlite::Result<Vec<AuditQueueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {CLAIM_COLUMNS}, m.title, a.wallet_address, a.trust_tier, a.fraud_flags
        FROM claims c
        JOIN missions m ON m.id = c.mission_id
        JOIN agents a ON a.id = c.agent_id
        WHERE c.status IN ('submitted', 'auditing')
        ORDER BY c.submitted_at_ms ASC, c.id ASC
        "
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(AuditQueueEntry {
            claim: map_claim_row(row)?,
            mission_title: row.get(10)?,
            wallet_address: row.get(11)?,
            trust_tier: TrustTier::from_db(&row.get::<_, String>(12)?),
            fraud_flags: row.get(13)?,
        })
    })?;
    rows.collect()
}

pub fn set_claim_status(
    conn: &Connection,
    id: ClaimId,
    status: ClaimStatus,
    audit_result: Option<&str>,
    now: u64,
) -> rusqlite::Result<()> {
    let audited_at = status.is_terminal().then_some(now);
    conn.execute(
        "
        UPDATE claims
        SET status = ?2,
            audit_result = COALESCE(?3, audit_result),
            audited_at_ms = COALESCE(?4, audited_at_ms)
        WHERE id = ?1
        ",
        params![id.0, status.as_str(), audit_result, audited_at],
    )?;
    Ok(())
}

// ---- payouts ------------------------------------------------------------

fn map_payout_row(row: &Row<'_>) -> rusqlite::Result<PayoutView> {
    Ok(PayoutView {
        id: row.get(0)?,
        agent_id: agent_id_at(row, 1)?,
        amount_cents: row.get(2)?,
        destination: row.get(3)?,
        status: PayoutStatus::from_db(&row.get::<_, String>(4)?),
        requested_at_ms: row.get::<_, i64>(5)? as u64,
    })
}

/// Moves `amount_cents` from balance to withdrawn. Returns `false` if the
/// balance does not cover it.
pub fn debit_balance(
    conn: &Connection,
    agent_id: AgentId,
    amount_cents: i64,
    now: u64,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "
        UPDATE agents
        SET usd_balance_cents = usd_balance_cents - ?2,
            total_withdrawn_cents = total_withdrawn_cents + ?2,
            updated_at_ms = ?3
        WHERE id = ?1 AND usd_balance_cents >= ?2
        ",
        params![agent_id.to_string(), amount_cents, now],
    )?;
    Ok(changed == 1)
}

pub fn credit_reward(
    conn: &Connection,
    agent_id: AgentId,
    amount_cents: i64,
    now: u64,
) -> rusqlite::Result<()> {
    conn.execute(
        "
        UPDATE agents
        SET usd_balance_cents = usd_balance_cents + ?2,
            total_earned_cents = total_earned_cents + ?2,
            missions_completed = missions_completed + 1,
            updated_at_ms = ?3
        WHERE id = ?1
        ",
        params![agent_id.to_string(), amount_cents, now],
    )?;
    Ok(())
}

pub fn insert_payout(
    conn: &Connection,
    agent_id: AgentId,
    amount_cents: i64,
    destination: &str,
    now: u64,
) -> rusqlite::Result<PayoutView> {
    conn.execute(
        "
        INSERT INTO payouts (agent_id, amount_cents, destination, status, requested_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
        params![agent_id.to_string(), amount_cents, destination, PayoutStatus::Pending.as_str(), now],
    )?;
    Ok(PayoutView {
        id: conn.last_insert_rowid(),
        agent_id,
        amount_cents,
        destination: destination.to_string(),
        status: PayoutStatus::Pending,
        requested_at_ms: now,
    })
}

pub fn query_payouts(conn: &Connection, agent_id: AgentId) -> rusqlite::Result<Vec<PayoutView>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, agent_id, amount_cents, destination, status, requested_at_ms
        FROM payouts WHERE agent_id = ?1
        ORDER BY requested_at_ms DESC, id DESC
        ",
    )?;
    let rows = stmt.query_map(params![agent_id.to_string()], map_payout_row)?;
    rows.collect()
}

// ---- trust --------------------------------------------------------------

/// Adds one fraud flag and applies the resulting tier. Returns the new flag
/// count and the tier before and after.
pub fn record_fraud_flag(
    conn: &Connection,
    agent_id: AgentId,
    now: u64,
) -> rusqlite::Result<(i64, TrustTier, TrustTier)> {
    let (flags, previous): (i64, String) = conn.query_row(
        "
        UPDATE agents SET fraud_flags = fraud_flags + 1, updated_at_ms = ?2
        WHERE id = ?1
        RETURNING fraud_flags, trust_tier
        ",
        params![agent_id.to_string(), now],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let previous = TrustTier::from_db(&previous);
    let next = previous.escalate(flags);
    if next != previous {
        conn.execute(
            "UPDATE agents SET trust_tier = ?2 WHERE id = ?1",
            params![agent_id.to_string(), next.as_str()],
        )?;
    }
    Ok((flags, previous, next))
}

pub struct NewTrustEvent<'a> {
    pub agent_id: AgentId,
    pub claim_id: Option<ClaimId>,
    pub previous_tier: TrustTier,
    pub new_tier: TrustTier,
    pub fraud_flags: i64,
    pub reason: &'a str,
}

pub fn insert_trust_event(
    conn: &Connection,
    event: &NewTrustEvent<'_>,
    now: u64,
) -> rusqlite::Result<()> {
    conn.execute(
        "
        INSERT INTO trust_events (agent_id, claim_id, previous_tier, new_tier, fraud_flags, reason, created_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            event.agent_id.to_string(),
            event.claim_id.map(|id| id.0),
            event.previous_tier.as_str(),
            event.new_tier.as_str(),
            event.fraud_flags,
            event.reason,
            now
        ],
    )?;
    Ok(())
}

pub fn query_trust_events(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<TrustEventView>> {
    let mut stmt = conn.prepare(
        "
        SELECT t.id, t.agent_id, a.wallet_address, t.claim_id, t.previous_tier, t.new_tier,
               t.fraud_flags, t.reason, t.created_at_ms
        FROM trust_events t
        JOIN agents a ON a.id = t.agent_id
        ORDER BY t.created_at_ms DESC, t.id DESC
        LIMIT ?1
        ",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(TrustEventView {
            id: row.get(0)?,
            agent_id: agent_id_at(row, 1)?,
            wallet_address: row.get(2)?,
            claim_id: row.get::<_, Option<i64>>(3)?.map(ClaimId),
            previous_tier: TrustTier::from_db(&row.get::<_, String>(4)?),
            new_tier: TrustTier::from_db(&row.get::<_, String>(5)?),
            fraud_flags: row.get(6)?,
            reason: row.get(7)?,
            created_at_ms: row.get::<_, i64>(8)? as u64,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Connection, AgentId) {
        let conn = init_in_memory().unwrap();
        let agent_id = AgentId::new();
        insert_agent(&conn, agent_id, "0xfeed", "feed", 1).unwrap();
        (conn, agent_id)
    }

    #[test]
    fn fraud_flags_walk_the_tier_table() {
        let (conn, agent_id) = seeded();
        let tiers: Vec<_> =
            (0..3).map(|i| record_fraud_flag(&conn, agent_id, 10 + i).unwrap()).collect();
        assert_eq!(
            tiers,
            vec![
                (1, TrustTier::Normal, TrustTier::Probation),
                (2, TrustTier::Probation, TrustTier::Blacklist),
                (3, TrustTier::Blacklist, TrustTier::Banned),
            ]
        );
        let agent = fetch_agent(&conn, agent_id).unwrap().unwrap();
        assert_eq!(agent.fraud_flags, 3);
        assert_eq!(agent.trust_tier, TrustTier::Banned);
    }

    #[test]
    fn admin_keeps_tier_when_flagged() {
        let (conn, agent_id) = seeded();
        set_trust_tier(&conn, "0xfeed", TrustTier::Admin, 2).unwrap();
        let (flags, _, next) = record_fraud_flag(&conn, agent_id, 3).unwrap();
        assert_eq!(flags, 1);
        assert_eq!(next, TrustTier::Admin);
    }

    #[test]
    fn xp_adjustment_updates_rank() {
        let (conn, agent_id) = seeded();
        assert_eq!(adjust_agent_xp(&conn, agent_id, 600, 2).unwrap(), 600);
        let agent = fetch_agent(&conn, agent_id).unwrap().unwrap();
        assert_eq!(agent.rank_title, "Specialist");
    }

    #[test]
    fn mission_slots_stop_at_max() {
        let (conn, agent_id) = seeded();
        let id = insert_mission(
            &conn,
            &NewMission {
                title: "t",
                mission_type: "social",
                creator_id: Some(agent_id),
                status: MissionStatus::Active,
                target_url: None,
                max_claims: 1,
                xp_reward: 10,
                usd_reward_cents: 0,
                stake_required: 0,
            },
            1,
        )
        .unwrap();
        assert!(reserve_mission_slot(&conn, id, 2).unwrap());
        assert!(!reserve_mission_slot(&conn, id, 3).unwrap());
        release_mission_slot(&conn, id, 4).unwrap();
        assert_eq!(fetch_mission(&conn, id).unwrap().unwrap().current_claims, 0);
    }

    #[test]
    fn youtube_state_is_single_use() {
        let (conn, agent_id) = seeded();
        set_youtube_state(&conn, agent_id, "state-1", 2).unwrap();
        assert_eq!(complete_youtube_link(&conn, "state-1", "code", 3).unwrap(), Some(agent_id));
        assert_eq!(complete_youtube_link(&conn, "state-1", "code", 4).unwrap(), None);
        let agent = fetch_agent(&conn, agent_id).unwrap().unwrap();
        assert_eq!(agent.youtube_linked_at_ms, Some(3));
    }
}
