//! Shared setup for the integration scenarios.

use std::sync::Arc;

use swap_core::adapters::NATIVE_ASSET;
use swap_core::domain::AuctionDetails;
use swap_core::{
    generate_secret, match_and_fill, sign_order, DualEscrowCoordinator, EcdsaOrderSigner,
    FillResult, InMemoryChain, InMemorySettlement, LedgerKind, Order, OrderSigner, SecretVault,
    SignedOrder, Swap, SwapConfig, SwapCoordinatorApi, TakerParams,
};

pub const MAKER_ASSET: [u8; 20] = [0x11; 20];
pub const TAKER_ASSET: [u8; 20] = [0x22; 20];
pub const MAKING_AMOUNT: u128 = 1_000_000;
pub const TAKING_AMOUNT: u128 = 2_000_000;
pub const SAFETY_DEPOSIT: u128 = 1_000;

/// Two ledgers starting at time zero, a maker and a resolver.
pub struct World {
    pub config: SwapConfig,
    pub source: Arc<InMemoryChain>,
    pub destination: Arc<InMemoryChain>,
    pub maker: EcdsaOrderSigner,
    pub resolver: EcdsaOrderSigner,
    pub settlement: InMemorySettlement,
}

impl World {
    pub fn new(config: SwapConfig) -> Self {
        let source = Arc::new(InMemoryChain::with_genesis(
            config.source.chain_id,
            config.source.kind,
            0,
        ));
        let destination = Arc::new(InMemoryChain::with_genesis(
            config.destination.chain_id,
            config.destination.kind,
            0,
        ));
        Self {
            config,
            source,
            destination,
            maker: EcdsaOrderSigner::random(),
            resolver: EcdsaOrderSigner::random(),
            settlement: InMemorySettlement::new(),
        }
    }

    pub fn coordinator(&self) -> DualEscrowCoordinator {
        DualEscrowCoordinator::new(
            self.config.clone(),
            self.source.clone(),
            self.destination.clone(),
        )
        .unwrap()
    }

    /// Order with `nonce`, with both parties credited what it needs.
    pub fn funded_order(&self, nonce: u64) -> Order {
        let maker = self.maker.address();
        let resolver = self.resolver.address();
        self.source.credit(maker, MAKER_ASSET, MAKING_AMOUNT);
        self.source.credit(resolver, NATIVE_ASSET, SAFETY_DEPOSIT);
        self.destination.credit(resolver, TAKER_ASSET, TAKING_AMOUNT);
        self.destination.credit(resolver, NATIVE_ASSET, SAFETY_DEPOSIT);
        Order {
            nonce,
            maker,
            receiver: maker,
            maker_asset: MAKER_ASSET,
            taker_asset: TAKER_ASSET,
            making_amount: MAKING_AMOUNT,
            taking_amount: TAKING_AMOUNT,
            src_chain_id: self.config.source.chain_id,
            dst_chain_id: self.config.destination.chain_id,
            src_safety_deposit: SAFETY_DEPOSIT,
            dst_safety_deposit: SAFETY_DEPOSIT,
            auction: AuctionDetails::default(),
            allowed_resolvers: vec![self.resolver.address()],
        }
    }

    /// Sign as the maker and fill as the resolver.
    pub async fn sign_and_fill(&self, order: &Order) -> (SignedOrder, FillResult) {
        let signed = sign_order(order, &self.maker).await.unwrap();
        let fill = match_and_fill(
            &signed,
            &TakerParams {
                resolver: self.resolver.address(),
                fill_time: 0,
            },
            &self.resolver,
            &self.settlement,
        )
        .await
        .unwrap();
        (signed, fill)
    }

    /// Open a fresh swap for a funded order with `nonce`.
    pub async fn open(
        &self,
        coordinator: &DualEscrowCoordinator,
        nonce: u64,
    ) -> (Swap, SecretVault) {
        let order = self.funded_order(nonce);
        let (_, fill) = self.sign_and_fill(&order).await;
        let vault = SecretVault::new(generate_secret());
        let swap = coordinator
            .open_swap(&order, fill, vault.hash_lock())
            .unwrap();
        (swap, vault)
    }
}

/// Testing windows with a script-based destination.
pub fn script_destination() -> SwapConfig {
    let mut config = SwapConfig::for_testing();
    config.destination.kind = LedgerKind::Script;
    config
}
