mod client;
mod session;

use agentquest_core::{MissionId, format_usd, normalize_wallet_address, now_ms};
use agentquest_protocol::{AgentProfile, LoginRequest, MissionView, SubmitClaimRequest};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::ApiClient;
use session::StoredSession;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8800";

#[derive(Debug, Parser)]
#[command(name = "agentquest", about = "AgentQuest command line client")]
struct Cli {
    /// API base URL. Falls back to the URL of the saved session.
    #[arg(long, global = true, env = "AGENTQUEST_API_URL")]
    api_url: Option<String>,
    #[arg(long, global = true, env = "AGENTQUEST_SESSION_FILE")]
    session_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in with a wallet address, registering the agent if needed.
    Login {
        wallet: String,
        #[arg(long)]
        name: Option<String>,
    },
    Logout,
    /// List missions that accept claims.
    Missions,
    #[command(subcommand)]
    Claim(ClaimCommand),
    #[command(subcommand)]
    Agent(AgentCommand),
}

#[derive(Debug, Subcommand)]
enum ClaimCommand {
    Submit {
        mission_id: String,
        proof_url: String,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum AgentCommand {
    /// Show XP, rank and balances. Defaults to the logged-in wallet.
    Stats {
        #[arg(long)]
        wallet: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let session_path = match cli.session_file {
        Some(path) => path,
        None => session::default_path()?,
    };
    // Parsed per command: logout and login must still work with a corrupt file.
    let saved = || StoredSession::load_or_discard(&session_path);

    match cli.command {
        Command::Login { wallet, name } => {
            let api_url = resolve_api_url(cli.api_url.as_deref(), saved().as_ref());
            let wallet = normalize_wallet_address(&wallet)?;
            let client = ApiClient::new(&api_url, None);
            let response = client.login(&LoginRequest { wallet_address: wallet, name }).await?;
            let stored = StoredSession {
                token: response.token,
                wallet_address: response.agent.wallet_address.clone(),
                agent_id: response.agent.id,
                api_url: api_url.clone(),
                saved_at_ms: now_ms(),
                expires_at_ms: response.expires_at_ms,
            };
            stored.save(&session_path)?;
            info!(agent_id = %stored.agent_id, path = %session_path.display(), "saved session");

            let verb = if response.created { "Registered" } else { "Logged in as" };
            println!("{verb} {} ({})", response.agent.name, response.agent.wallet_address);
        }
        Command::Logout => {
            if session::clear(&session_path)? {
                println!("Logged out");
            } else {
                println!("No saved session");
            }
        }
        Command::Missions => {
            let api_url = resolve_api_url(cli.api_url.as_deref(), saved().as_ref());
            let missions = ApiClient::new(&api_url, None).missions().await?;
            if missions.is_empty() {
                println!("No active missions");
            }
            for mission in &missions {
                println!("{}", mission_line(mission));
            }
        }
        Command::Claim(ClaimCommand::Submit { mission_id, proof_url, notes }) => {
            let mission_id: MissionId =
                mission_id.parse().with_context(|| format!("invalid mission id {mission_id:?}"))?;
            let session = require_session(saved())?;
            let api_url = resolve_api_url(cli.api_url.as_deref(), Some(&session));
            let client = ApiClient::new(&api_url, Some(session.token));
            let claim = client
                .submit_claim(&SubmitClaimRequest { mission_id, proof_url, proof_notes: notes })
                .await?;
            println!(
                "Submitted claim {} on mission {} ({}, {} xp staked)",
                claim.id, claim.mission_id, claim.status, claim.staked_xp
            );
        }
        Command::Agent(AgentCommand::Stats { wallet }) => {
            let saved = saved();
            let api_url = resolve_api_url(cli.api_url.as_deref(), saved.as_ref());
            let wallet = match wallet {
                Some(wallet) => normalize_wallet_address(&wallet)?,
                None => require_session(saved)?.wallet_address,
            };
            let profile = ApiClient::new(&api_url, None).profile(&wallet).await?;
            print!("{}", stats_block(&profile));
        }
    }

    Ok(())
}

fn resolve_api_url(flag: Option<&str>, saved: Option<&StoredSession>) -> String {
    flag.map(str::to_string)
        .or_else(|| saved.map(|session| session.api_url.clone()))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

fn require_session(saved: Option<StoredSession>) -> Result<StoredSession> {
    let Some(session) = saved else {
        bail!("not logged in; run `agentquest login <wallet>` first");
    };
    if session.is_expired(now_ms()) {
        bail!("session expired; run `agentquest login {}` again", session.wallet_address);
    }
    Ok(session)
}

fn mission_line(mission: &MissionView) -> String {
    let mut line = format!(
        "#{:<5} {:<10} {:>5} xp  {:>9}  {}/{} claimed  {}",
        mission.id.0,
        mission.mission_type,
        mission.xp_reward,
        format_usd(mission.usd_reward_cents),
        mission.current_claims,
        mission.max_claims,
        mission.title,
    );
    if mission.stake_required > 0 {
        line.push_str(&format!("  (stake {} xp)", mission.stake_required));
    }
    line
}

fn stats_block(profile: &AgentProfile) -> String {
    format!(
        "{name} ({wallet})\n\
         rank:       {rank}\n\
         xp:         {xp}\n\
         missions:   {missions}\n\
         trust:      {tier} ({flags} flags)\n\
         balance:    {balance}\n\
         earned:     {earned}\n\
         withdrawn:  {withdrawn}\n",
        name = profile.name,
        wallet = profile.wallet_address,
        rank = profile.rank_title,
        xp = profile.xp,
        missions = profile.missions_completed,
        tier = profile.trust_tier,
        flags = profile.fraud_flags,
        balance = format_usd(profile.usd_balance_cents),
        earned = format_usd(profile.total_earned_cents),
        withdrawn = format_usd(profile.total_withdrawn_cents),
    )
}
