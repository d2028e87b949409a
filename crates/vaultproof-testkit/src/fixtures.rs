//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use rand::Rng;

use vaultproof::Pipeline;
use vaultproof_core::{now_millis, Chain, Digest, ProofConstructor, ZkProof, ZkProofParams};
use vaultproof_ledger::{ChainClient, ChainConfig, LedgerConfig, LedgerSynchronizer, SimulatedChain};
use vaultproof_store::MemoryStore;

/// A test fixture with a vault pair, a proof constructor and a memory store.
pub struct TestFixture {
    pub source_vault: String,
    pub target_vault: String,
    pub constructor: ProofConstructor,
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_vaults("vault-source", "vault-target")
    }

    pub fn with_vaults(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_vault: source.into(),
            target_vault: target.into(),
            constructor: ProofConstructor::new(),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Deterministic params for transfer `n` between the fixture's vaults.
    pub fn make_params(&self, n: u64) -> ZkProofParams {
        ZkProofParams::new(
            self.source_vault.clone(),
            self.target_vault.clone(),
            Digest::hash(&n.to_be_bytes()),
            1_700_000_000_000 + n as i64,
        )
    }

    /// Params over a random data hash, stamped now.
    pub fn random_params(&self) -> ZkProofParams {
        let data: [u8; 32] = rand::thread_rng().gen();
        ZkProofParams::new(
            self.source_vault.clone(),
            self.target_vault.clone(),
            Digest::from_bytes(data),
            now_millis(),
        )
    }

    /// Generate the proof for [`Self::make_params`].
    pub fn make_proof(&self, n: u64) -> ZkProof {
        self.constructor
            .generate_proof(self.make_params(n))
            .expect("fixture params are valid")
    }

    pub fn make_proofs(&self, count: u64) -> Vec<ZkProof> {
        (0..count).map(|n| self.make_proof(n)).collect()
    }

    /// Synchronizer over simulated chains backed by the fixture's store.
    pub fn ledger(&self) -> Arc<LedgerSynchronizer<MemoryStore>> {
        Arc::new(LedgerSynchronizer::new(
            LedgerConfig::default(),
            self.store.clone(),
        ))
    }

    /// Synchronizer plus direct handles to its chains, for fault injection.
    pub fn ledger_with_chains(
        &self,
    ) -> (
        Arc<LedgerSynchronizer<MemoryStore>>,
        Vec<Arc<SimulatedChain>>,
    ) {
        let config = LedgerConfig::default();
        let chains = simulated_chains(&config);
        let clients = chains
            .iter()
            .map(|c| c.clone() as Arc<dyn ChainClient>)
            .collect();
        let ledger = LedgerSynchronizer::with_clients(config, self.store.clone(), clients);
        (Arc::new(ledger), chains)
    }

    pub fn pipeline(&self) -> Pipeline<MemoryStore> {
        Pipeline::new(self.ledger())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// One simulated chain per supported chain, in [`Chain::ALL`] order.
pub fn simulated_chains(config: &LedgerConfig) -> Vec<Arc<SimulatedChain>> {
    Chain::ALL
        .into_iter()
        .map(|chain| {
            let chain_config = ChainConfig::for_chain(chain, config.endpoint(chain));
            Arc::new(SimulatedChain::new(chain_config, config.time_scale))
        })
        .collect()
}

/// Fixtures over distinct vault pairs.
pub fn multi_vault_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| TestFixture::with_vaults(format!("vault-{i}"), format!("vault-{}", i + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultproof_core::ChainStatus;

    #[test]
    fn test_fixture_params_are_stable() {
        let fixture = TestFixture::new();
        assert_eq!(fixture.make_params(7), fixture.make_params(7));
        assert_ne!(fixture.make_params(7).data_hash, fixture.make_params(8).data_hash);
    }

    #[test]
    fn test_fixture_proofs_verify() {
        let fixture = TestFixture::new();
        for proof in fixture.make_proofs(3) {
            assert!(fixture.constructor.verify_proof(&proof).valid);
        }
    }

    #[test]
    fn test_multi_vault() {
        let fixtures = multi_vault_fixtures(3);
        assert_eq!(fixtures[0].target_vault, fixtures[1].source_vault);
        assert_ne!(fixtures[0].source_vault, fixtures[2].source_vault);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_chain_handle() {
        let fixture = TestFixture::new();
        let (ledger, chains) = fixture.ledger_with_chains();
        chains[2].set_failing(true);

        let receipt = ledger
            .publish_merkle_root(Digest::hash(b"root"), Default::default())
            .await
            .unwrap();
        assert_eq!(
            receipt.record(Chain::Solana).unwrap().status,
            ChainStatus::Failed
        );
        assert_eq!(
            receipt.record(Chain::Ethereum).unwrap().status,
            ChainStatus::Pending
        );
    }
}
