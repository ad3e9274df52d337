/// DAM daemon - decentralized announce and peer directory node
///
/// This daemon runs a DAM node that:
/// - Serves the announce endpoint for incoming handshakes
/// - Announces itself to seed peers on startup
/// - Prunes stale peers and expired challenges in the background

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};

use damnet_common::{protocol, NodeConfig};
use damnet_core::{
    AnnounceInitiator, AnnounceResponder, ChallengeStore, OnionAddress, PeerTable,
};
use damnet_daemon::{keys, ApiServer, HttpAnnounceClient};

#[derive(Debug, Parser)]
#[command(name = "damnet-daemon", version, about = "DAM network node")]
struct Args {
    /// (Re)generate the identity key and exit
    #[arg(short, long)]
    generate: bool,

    /// Ports to forward to/from the hidden service, "remote:local,..."
    #[arg(short = 'm', long, default_value = protocol::DEFAULT_PORTMAP)]
    portmap: String,

    /// Local listen address for the announce endpoint
    #[arg(short, long, default_value = protocol::DEFAULT_LISTEN)]
    listen: String,

    /// Data directory (defaults to ~/.dam)
    #[arg(long)]
    datadir: Option<PathBuf>,

    /// Comma-separated seed peers, "host.onion:port" form
    #[arg(short, long, default_value = "")]
    seeds: String,

    /// Do not announce to seeds on startup
    #[arg(short, long)]
    no_announce: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    let data_dir = args.datadir.unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(".dam")
    });

    if args.generate {
        let path = keys::generate(&data_dir)?;
        println!("identity seed written to {}", path.display());
        return Ok(());
    }

    let seeds: Vec<String> = args
        .seeds
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut config = NodeConfig::new()
        .with_listen(&args.listen)
        .with_portmap(&args.portmap)?
        .with_data_dir(data_dir)
        .with_seeds(seeds);
    config.no_announce = args.no_announce;

    // A malformed seed is an operator error, refuse to start
    for seed in &config.seeds {
        OnionAddress::parse(seed).map_err(|e| anyhow!("invalid seed {}: {}", seed, e))?;
    }

    let keypair = keys::load(&config.seed_path()).map_err(|e| {
        anyhow!(
            "{} (run with --generate to create an identity first)",
            e
        )
    })?;

    let listen: SocketAddr = config.listen.parse()?;
    let own_address = OnionAddress::from_public_key(keypair.public_key(), listen.port());
    info!("our address is {}", own_address);

    let peers = Arc::new(PeerTable::new());
    let challenges = Arc::new(ChallengeStore::new(config.challenge_ttl()));
    let responder = Arc::new(AnnounceResponder::with_local_resolver(
        peers.clone(),
        challenges.clone(),
    ));

    let api_server = ApiServer::new(listen, responder);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            warn!("announce server error: {}", e);
        }
    });

    spawn_maintenance(&config, peers.clone(), challenges.clone());

    if !config.no_announce && !config.seeds.is_empty() {
        let initiator = AnnounceInitiator::new(
            &config,
            keypair,
            own_address,
            peers.clone(),
            Arc::new(HttpAnnounceClient::new()),
        );

        match initiator.announce_all(&config.seeds).await {
            Ok(confirmed) => info!("announced to {}/{} seeds", confirmed, config.seeds.len()),
            Err(e) => bail!("could not join the network: {}", e),
        }
    }

    info!("node is running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    Ok(())
}

/// Periodically drop stale peer records and expired challenges
fn spawn_maintenance(config: &NodeConfig, peers: Arc<PeerTable>, challenges: Arc<ChallengeStore>) {
    let max_age = config.peer_max_age();
    let interval = config.maintenance_interval();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick is immediate, skip it
        loop {
            ticker.tick().await;
            let pruned = peers.prune(max_age).await;
            let swept = challenges.sweep().await;
            if pruned > 0 || swept > 0 {
                info!(pruned, swept, "maintenance pass");
            }
        }
    });
}
