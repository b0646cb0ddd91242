//! `eventbusd`: the command-line entry point wiring a [`CategoryRouter`]
//! and, optionally, a peer registry and replication hook, to the HTTP
//! server.

mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eventbus_core::{Backend, CategoryRouter, NoopHook, ReplicationHook, SharedHook};
use eventbus_replication::{EtcdRegistry, Peer, PeerRegistry, RegistryReplicationHook};

use config::Config;

#[derive(Parser)]
#[command(name = "eventbusd", about = "A chunk-based append-only event bus node")]
struct Cli {
    /// Path to the node's TOML configuration file.
    #[arg(long, default_value = "eventbusd.toml")]
    config: PathBuf,

    /// Override the configured listen address.
    #[arg(long)]
    listen_addr: Option<String>,
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(listen_addr) = cli.listen_addr {
        config.listen_addr = listen_addr;
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let hook: SharedHook = build_hook(&config)?;

    let backend = match &config.data_dir {
        Some(dir) => Backend::Disk { root: PathBuf::from(dir) },
        None => {
            tracing::warn!("no data_dir configured; running with an in-memory, non-durable backend");
            Backend::Memory
        }
    };
    let router = Arc::new(CategoryRouter::new(backend, hook));

    tracing::info!(node = %config.node_name, listen_addr = %config.listen_addr, "starting eventbusd");
    eventbus_server::serve(config.listen_addr.clone(), eventbus_server::router(router)).await?;
    Ok(())
}

/// Registers this node with the peer registry and returns the replication
/// hook that enqueues new segments to every other peer, or a [`NoopHook`]
/// when no etcd endpoint is configured (replication is then simply not
/// exercised).
fn build_hook(config: &Config) -> anyhow::Result<SharedHook> {
    let Some(endpoint) = &config.etcd_endpoint else {
        return Ok(Arc::new(NoopHook) as SharedHook);
    };

    let registry = Arc::new(EtcdRegistry::connect(endpoint, &config.cluster_name)?);
    registry.register_peer(&Peer {
        name: config.node_name.clone(),
        addr: config.listen_addr.clone(),
    })?;
    for peer in &config.peers {
        registry.register_peer(&Peer { name: peer.name.clone(), addr: peer.addr.clone() })?;
    }

    let hook = RegistryReplicationHook::new(registry, config.node_name.clone());
    Ok(Arc::new(hook) as Arc<dyn ReplicationHook>)
}
