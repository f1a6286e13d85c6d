use agentquest_core::{MissionStatus, MissionTerms, TrustTier, normalize_wallet_address, now_ms};
use agentquest_server::{AppState, ServerConfig, build_router, db};
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "agentquest-server", about = "AgentQuest API service")]
struct Cli {
    /// TOML config file; flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Give an existing agent the admin tier.
    GrantAdmin {
        #[arg(long)]
        wallet: String,
    },
    /// Insert an active mission with no creator.
    SeedMission {
        #[arg(long)]
        title: String,
        #[arg(long = "type", default_value = "social")]
        mission_type: String,
        #[arg(long)]
        target_url: Option<String>,
        #[arg(long, default_value_t = 10)]
        max_claims: i64,
        #[arg(long)]
        xp_reward: i64,
        #[arg(long, default_value_t = 0)]
        usd_reward_cents: i64,
        #[arg(long, default_value_t = 0)]
        stake_required: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
    }

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await?;
        }
        Command::GrantAdmin { wallet } => grant_admin(&config, &wallet)?,
        Command::SeedMission {
            title,
            mission_type,
            target_url,
            max_claims,
            xp_reward,
            usd_reward_cents,
            stake_required,
        } => {
            if title.trim().is_empty() {
                bail!("title is required");
            }
            MissionTerms {
                max_claims: Some(max_claims),
                xp_reward: Some(xp_reward),
                usd_reward_cents: Some(usd_reward_cents),
                stake_required: Some(stake_required),
            }
            .validate()?;
            let conn = db::init_db(&config.db_path)?;
            let id = db::insert_mission(
                &conn,
                &db::NewMission {
                    title: title.trim(),
                    mission_type: &mission_type,
                    creator_id: None,
                    status: MissionStatus::Active,
                    target_url: target_url.as_deref(),
                    max_claims,
                    xp_reward,
                    usd_reward_cents,
                    stake_required,
                },
                now_ms(),
            )?;
            info!(mission_id = %id, "seeded mission");
            println!("created mission {id}");
        }
    }

    Ok(())
}

async fn serve(config: ServerConfig) -> Result<()> {
    let connection = db::init_db(&config.db_path)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let db_path = config.db_path.clone();
    let app = build_router(AppState::new(connection, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("agentquest listening on http://{}", addr);
    info!("sqlite database at {}", db_path.display());
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn grant_admin(config: &ServerConfig, wallet: &str) -> Result<()> {
    let wallet = normalize_wallet_address(wallet)?;
    let conn = db::init_db(&config.db_path)?;
    if db::set_trust_tier(&conn, &wallet, TrustTier::Admin, now_ms())? == 0 {
        bail!("no agent with wallet {wallet}; log in once before granting admin");
    }
    info!(%wallet, "granted admin tier");
    println!("{wallet} is now an admin");
    Ok(())
}
