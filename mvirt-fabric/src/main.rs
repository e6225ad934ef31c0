use clap::Parser;
use mraft::{JoinToken, NodeConfig, RaftNode, StorageBackend};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mvirt_fabric::audit::create_audit_logger;
use mvirt_fabric::listener::start_event_listener;
use mvirt_fabric::rest::{AppState, create_router};
use mvirt_fabric::store::{Event, RaftStore};
use mvirt_fabric::{
    Command, DataStore, FabricAuditLogger, FabricConfig, FabricState, NodeId, Response,
};

#[derive(Parser)]
#[command(name = "mvirt-fabric")]
#[command(about = "mvirt Fabric - places cluster networks onto node interfaces")]
struct Args {
    /// Node ID for this instance (auto-detected from token when using --join)
    #[arg(long)]
    node_id: Option<NodeId>,

    /// Node name for display
    #[arg(long)]
    name: Option<String>,

    /// Listen address for Raft gRPC (node-to-node)
    #[arg(long, default_value = "127.0.0.1:6101")]
    raft_listen: String,

    /// Listen address for REST API (client)
    #[arg(short, long, default_value = "[::]:8090")]
    listen: String,

    /// Peer nodes (format: id:addr, can be repeated)
    #[arg(long, value_parser = parse_peer)]
    peer: Vec<(NodeId, String)>,

    /// Data directory for persistent storage
    #[arg(short, long, default_value = "/var/lib/mvirt/fabric")]
    data_dir: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bootstrap a new control plane (only for the first node)
    #[arg(long)]
    bootstrap: bool,

    /// Run in development mode (single-node, ephemeral storage)
    #[arg(long)]
    dev: bool,

    /// Join an existing control plane (leader's Raft gRPC address)
    #[arg(long)]
    join: Option<String>,

    /// Join token (required with --join)
    #[arg(long)]
    token: Option<String>,
}

fn parse_peer(s: &str) -> Result<(NodeId, String), String> {
    let (id_str, addr) = s
        .split_once(':')
        .ok_or("Expected format: id:addr".to_string())?;
    let id: NodeId = id_str.parse().map_err(|_| "Invalid node ID".to_string())?;
    Ok((id, addr.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("mvirt_fabric=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FabricConfig::from_file(path)?,
        None => FabricConfig::default(),
    };

    // Resolve node_id: from --node-id, or extract from token when joining
    let node_id: NodeId = if let Some(id) = args.node_id {
        id
    } else if let Some(token) = &args.token {
        JoinToken::peek_node_id(token).ok_or("Invalid token format: cannot extract node ID")?
    } else {
        return Err("--node-id is required (or use --join with --token)".into());
    };

    let name = args.name.unwrap_or_else(|| format!("node-{}", node_id));

    if args.join.is_none() && !args.dev && !args.bootstrap {
        warn!(
            "Neither --bootstrap, --dev, nor --join specified. Node will wait for control plane membership."
        );
    }

    if !args.dev {
        tokio::fs::create_dir_all(&args.data_dir).await?;
    }

    info!(
        "Starting mvirt-fabric node {} ({}) - Raft: {}, REST: {}, default networks: {}",
        node_id,
        name,
        args.raft_listen,
        args.listen,
        config.default_networks.len()
    );

    let peers: BTreeMap<NodeId, String> = args.peer.into_iter().collect();

    let node_config = NodeConfig {
        id: node_id,
        listen_addr: args.raft_listen.clone(),
        peers,
        storage: if args.dev {
            StorageBackend::Memory
        } else {
            StorageBackend::Persistent {
                path: args.data_dir.join("raft.db"),
            }
        },
        raft_config: None,
    };

    let mut node: RaftNode<Command, Response, FabricState> = RaftNode::new(node_config).await?;
    node.start().await?;

    if let Some(leader_addr) = &args.join {
        let token = args
            .token
            .as_ref()
            .ok_or("--token is required when using --join")?;

        info!("Joining control plane via {}", leader_addr);
        node.join_cluster(leader_addr, token)
            .await
            .map_err(|e| format!("Failed to join control plane: {}", e))?;
        info!("Successfully joined control plane");
    } else if args.bootstrap || args.dev {
        info!("Bootstrapping new control plane");
        node.generate_cluster_secret();
        node.initialize_cluster().await?;
    }

    let audit = if args.dev {
        Arc::new(FabricAuditLogger::new_noop())
    } else {
        create_audit_logger("fabric")
    };

    info!("Waiting for leader election...");
    match node.wait_for_leader(Duration::from_secs(10)).await {
        Some(leader) => {
            info!("Leader elected: node {}", leader);
            audit.leader_elected(leader, node.metrics().current_term);
        }
        None => warn!("No leader elected within timeout"),
    }

    // Create before wrapping the node so the event sink can be wired up
    let (event_tx, _) = broadcast::channel::<Event>(256);
    node.set_event_sink(event_tx.clone());

    let raft_node = Arc::new(RwLock::new(node));
    let store = Arc::new(RaftStore::new(raft_node.clone(), event_tx, node_id));

    let listener_handle = start_event_listener(store.subscribe());

    let app_state = Arc::new(AppState {
        store: store.clone(),
        audit,
        node_id,
        config,
    });
    let router = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!("REST API listening on {}", args.listen);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    let rest_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await
    });

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = signal::ctrl_c() => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }

    let _ = shutdown_tx.send(true);
    let _ = rest_handle.await;

    info!("Shutting down Raft node...");
    let mut node = raft_node.write().await;
    node.shutdown().await?;
    listener_handle.abort();

    info!("Shutdown complete");
    Ok(())
}
