//! # Atomic Swap Runtime
//!
//! Runs one swap end to end against two in-memory ledgers.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`SWAP_LOG`, default `info`)
//! 2. Load configuration (`SWAP_CONFIG`, `SWAP_POLL_INTERVAL_MS`,
//!    `SWAP_HANDOFF_DIR`, `SWAP_TIME_WARP`)
//! 3. Load the maker key (`SWAP_MAKER_KEY`) or generate an ephemeral one
//! 4. Maker step: sign and fill the order, write the handoff file
//! 5. Resolver step: resume from the handoff file and settle both escrows
//!
//! Ctrl+C during the resolver step leaves the handoff file in place.

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use swap_core::{EcdsaOrderSigner, FileHandoffStore, InMemorySettlement, OrderSigner};
use swap_runtime::{demo_order, load_config, maker_step, resolver_step, Ledgers};

/// Load the maker key from the environment, or generate one.
fn load_signer() -> Result<EcdsaOrderSigner> {
    match std::env::var("SWAP_MAKER_KEY") {
        Ok(key) => {
            let signer = EcdsaOrderSigner::from_hex(&key).context("Invalid SWAP_MAKER_KEY")?;
            info!("Loaded maker key 0x{}", hex::encode(signer.address()));
            Ok(signer)
        }
        Err(_) => {
            let signer = EcdsaOrderSigner::random();
            warn!(
                "SWAP_MAKER_KEY not set, using ephemeral maker 0x{}",
                hex::encode(signer.address())
            );
            Ok(signer)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_env("SWAP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;
    let maker = load_signer()?;
    let resolver = EcdsaOrderSigner::random();

    info!("===========================================");
    info!("  Atomic Swap Runtime v{}", swap_core::VERSION);
    info!(
        "  {} ({:?}) -> {} ({:?})",
        config.swap.source.chain_id,
        config.swap.source.kind,
        config.swap.destination.chain_id,
        config.swap.destination.kind
    );
    info!("===========================================");

    let ledgers = Ledgers::new(&config.swap);
    let order = demo_order(&config.swap, maker.address(), 1);
    ledgers.fund(&order, resolver.address());
    let warp = ledgers.spawn_time_warp(config.time_warp);

    let store = FileHandoffStore::new(&config.handoff_dir)
        .with_context(|| format!("Cannot use handoff dir {}", config.handoff_dir.display()))?;
    let settlement = InMemorySettlement::new();

    let order_hash = maker_step(
        &config.swap,
        &order,
        &maker,
        resolver.address(),
        &ledgers,
        &settlement,
        &store,
    )
    .await?;

    tokio::select! {
        report = resolver_step(&config.swap, &order_hash, &ledgers, &resolver, &store) => {
            let report = report?;
            info!("Swap settled: {}", serde_json::to_string(&report)?);
        }
        _ = tokio::signal::ctrl_c() => {
            warn!(
                "Interrupted; handoff kept at {}",
                store.path_for(&order_hash).display()
            );
        }
    }

    warp.abort();
    Ok(())
}
