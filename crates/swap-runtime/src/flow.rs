//! Maker and resolver steps.
//!
//! ```text
//! maker_step:    order ──sign──→ fill ──secret──→ handoff file
//! resolver_step: handoff file ──verify──→ resume ──→ DualEscrowCoordinator::run_swap
//! ```
//!
//! Both steps run against `InMemoryChain` ledgers. Chain time can be
//! sped up so the default windows pass in seconds.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use swap_core::adapters::NATIVE_ASSET;
use swap_core::domain::AuctionDetails;
use swap_core::{
    generate_secret, match_and_fill, prepare_handoff, sign_order, verify_order_signature,
    Address, ChainAdapter, DualEscrowCoordinator, EcdsaOrderSigner, HandoffStore, InMemoryChain,
    Order, OrderHash, OrderSettlement, OrderSigner, SwapConfig, SwapCoordinatorApi, SwapReport,
    TakerParams,
};

/// Asset the maker locks on the source ledger.
pub const DEMO_MAKER_ASSET: Address = [0x11; 20];
/// Asset the resolver delivers on the destination ledger.
pub const DEMO_TAKER_ASSET: Address = [0x22; 20];

/// The two simulated ledgers.
pub struct Ledgers {
    /// Maker's ledger.
    pub source: Arc<InMemoryChain>,
    /// Resolver's ledger.
    pub destination: Arc<InMemoryChain>,
}

impl Ledgers {
    /// Ledgers matching the configured chains.
    pub fn new(config: &SwapConfig) -> Self {
        Self {
            source: Arc::new(InMemoryChain::new(config.source.chain_id, config.source.kind)),
            destination: Arc::new(InMemoryChain::new(
                config.destination.chain_id,
                config.destination.kind,
            )),
        }
    }

    /// Give both parties what the order needs.
    pub fn fund(&self, order: &Order, resolver: Address) {
        self.source
            .credit(order.maker, order.maker_asset, order.making_amount);
        self.source
            .credit(resolver, NATIVE_ASSET, order.src_safety_deposit);
        self.destination
            .credit(resolver, order.taker_asset, order.taking_amount);
        self.destination
            .credit(resolver, NATIVE_ASSET, order.dst_safety_deposit);
    }

    /// Advance both ledger clocks by `warp - 1` extra seconds per second.
    pub fn spawn_time_warp(&self, warp: u64) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let destination = Arc::clone(&self.destination);
        tokio::spawn(async move {
            if warp <= 1 {
                return;
            }
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                source.advance(warp - 1);
                destination.advance(warp - 1);
            }
        })
    }
}

/// A one-to-two order between the configured chains.
pub fn demo_order(config: &SwapConfig, maker: Address, nonce: u64) -> Order {
    Order {
        nonce,
        maker,
        receiver: maker,
        maker_asset: DEMO_MAKER_ASSET,
        taker_asset: DEMO_TAKER_ASSET,
        making_amount: 1_000_000,
        taking_amount: 2_000_000,
        src_chain_id: config.source.chain_id,
        dst_chain_id: config.destination.chain_id,
        src_safety_deposit: 1_000,
        dst_safety_deposit: 1_000,
        auction: AuctionDetails::default(),
        allowed_resolvers: Vec::new(),
    }
}

/// Sign and fill `order`, generate the secret and persist the handoff.
pub async fn maker_step(
    config: &SwapConfig,
    order: &Order,
    maker: &EcdsaOrderSigner,
    resolver: Address,
    ledgers: &Ledgers,
    settlement: &dyn OrderSettlement,
    store: &dyn HandoffStore,
) -> Result<OrderHash> {
    let signed = sign_order(order, maker).await?;
    let now = ledgers.source.current_time().await?;
    let fill = match_and_fill(
        &signed,
        &TakerParams {
            resolver,
            fill_time: now,
        },
        maker,
        settlement,
    )
    .await?;

    let handoff = prepare_handoff(config, signed, fill, generate_secret(), now)?;
    store.save(&handoff).await?;
    info!("Maker step done for order {}", handoff.order_hash);
    Ok(handoff.order_hash)
}

/// Load the handoff for `order_hash` and drive the swap to a final state.
///
/// The handoff is removed once the swap settled.
pub async fn resolver_step(
    config: &SwapConfig,
    order_hash: &OrderHash,
    ledgers: &Ledgers,
    verifier: &dyn OrderSigner,
    store: &dyn HandoffStore,
) -> Result<SwapReport> {
    let handoff = store
        .load(order_hash)
        .await?
        .ok_or_else(|| anyhow!("No handoff stored for order {}", order_hash))?;
    verify_order_signature(&handoff.signed_order, verifier)
        .context("Handoff carries an invalid maker signature")?;

    let source: Arc<dyn ChainAdapter> = ledgers.source.clone();
    let destination: Arc<dyn ChainAdapter> = ledgers.destination.clone();
    let coordinator = DualEscrowCoordinator::new(config.clone(), source, destination)?;
    let (swap, vault) = coordinator.resume_swap(&handoff)?;
    let report = coordinator.run_swap(swap, vault).await?;

    store.remove(order_hash).await?;
    Ok(report)
}
