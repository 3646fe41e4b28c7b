//! Read/write access to the ENS registrar contracts

use async_trait::async_trait;
use ethers::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use crate::contracts::{ETHRegistrarController, ReverseRegistrar};
use crate::error::{EnsError, Result};
use crate::gate::CommitmentWindow;
use crate::networks::NetworkContracts;
use crate::secret::Secret;
use crate::types::{Commitment, Confirmation, RegistrationIntent, RentPrice};

/// The chain as seen by the registration flow.
///
/// Each method is one contract read or one transaction. No retries, no
/// validation, no timing rules: those belong to the callers.
#[async_trait]
pub trait RegistrarClient: Send + Sync {
    async fn available(&self, label: &str) -> Result<bool>;

    async fn rent_price(&self, label: &str, duration: u64) -> Result<RentPrice>;

    async fn make_commitment(
        &self,
        intent: &RegistrationIntent,
        secret: &Secret,
    ) -> Result<Commitment>;

    /// Broadcast `commit`; returns once the node accepted the transaction.
    async fn commit(&self, commitment: Commitment) -> Result<TxHash>;

    /// Broadcast the payable `register`.
    async fn register(
        &self,
        intent: &RegistrationIntent,
        secret: &Secret,
        value: U256,
    ) -> Result<TxHash>;

    /// Wait until `tx` is mined and report its block timestamp.
    async fn wait_for_confirmation(&self, tx: TxHash) -> Result<Confirmation>;

    async fn commitment_window(&self) -> Result<CommitmentWindow>;

    async fn latest_block_timestamp(&self) -> Result<u64>;

    /// Set the sender's primary name through the reverse registrar.
    async fn set_primary_name(&self, name: &str) -> Result<TxHash>;
}

/// ethers-backed registrar client
///
/// Reads work with any middleware; writes need one that can sign, e.g.
/// `SignerMiddleware<Provider<Http>, LocalWallet>`.
pub struct EthersRegistrar<M> {
    client: Arc<M>,
    controller: ETHRegistrarController<M>,
    reverse_registrar: ReverseRegistrar<M>,
    confirmations: usize,
}

impl<M: Middleware + 'static> EthersRegistrar<M> {
    pub fn new(client: Arc<M>, contracts: &NetworkContracts) -> Self {
        let controller = ETHRegistrarController::new(contracts.registrar_controller, client.clone());
        let reverse_registrar = ReverseRegistrar::new(contracts.reverse_registrar, client.clone());

        Self {
            client,
            controller,
            reverse_registrar,
            confirmations: 1,
        }
    }

    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    async fn block_timestamp(&self, block: BlockNumber) -> Result<u64> {
        let block = self
            .client
            .get_block(BlockId::Number(block))
            .await
            .map_err(|e| EnsError::from_rpc("get_block", &e))?
            .ok_or_else(|| EnsError::Network("block not found".to_string()))?;

        Ok(block.timestamp.low_u64())
    }
}

#[async_trait]
impl<M: Middleware + 'static> RegistrarClient for EthersRegistrar<M> {
    async fn available(&self, label: &str) -> Result<bool> {
        self.controller
            .available(label.to_string())
            .call()
            .await
            .map_err(|e| EnsError::from_contract("available", e))
    }

    async fn rent_price(&self, label: &str, duration: u64) -> Result<RentPrice> {
        let (base, premium) = self
            .controller
            .rent_price(label.to_string(), U256::from(duration))
            .call()
            .await
            .map_err(|e| EnsError::from_contract("rentPrice", e))?;
        Ok(RentPrice { base, premium })
    }

    async fn make_commitment(
        &self,
        intent: &RegistrationIntent,
        secret: &Secret,
    ) -> Result<Commitment> {
        let commitment = self
            .controller
            .make_commitment(
                intent.name.clone(),
                intent.owner,
                U256::from(intent.duration),
                *secret.as_bytes(),
                intent.resolver,
                vec![], // No resolver data
                intent.reverse_record,
                0, // No fuses
            )
            .call()
            .await
            .map_err(|e| EnsError::from_contract("makeCommitment", e))?;
        Ok(Commitment(H256::from(commitment)))
    }

    async fn commit(&self, commitment: Commitment) -> Result<TxHash> {
        let call = self.controller.commit(commitment.as_bytes());
        let pending = call
            .send()
            .await
            .map_err(|e| EnsError::from_contract("commit", e))?;
        Ok(pending.tx_hash())
    }

    async fn register(
        &self,
        intent: &RegistrationIntent,
        secret: &Secret,
        value: U256,
    ) -> Result<TxHash> {
        let call = self
            .controller
            .register(
                intent.name.clone(),
                intent.owner,
                U256::from(intent.duration),
                *secret.as_bytes(),
                intent.resolver,
                vec![],
                intent.reverse_record,
                0,
            )
            .value(value);
        let pending = call
            .send()
            .await
            .map_err(|e| EnsError::from_contract("register", e))?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_confirmation(&self, tx: TxHash) -> Result<Confirmation> {
        let receipt = PendingTransaction::new(tx, self.client.provider())
            .confirmations(self.confirmations)
            .await
            .map_err(|e| EnsError::from_rpc("wait_for_confirmation", &e))?
            .ok_or_else(|| EnsError::Chain(format!("transaction {:?} was dropped", tx)))?;

        if receipt.status == Some(U64::zero()) {
            return Err(EnsError::Chain(format!("transaction {:?} reverted", tx)));
        }

        let block_number = receipt
            .block_number
            .ok_or_else(|| EnsError::Chain(format!("transaction {:?} has no block", tx)))?;
        let timestamp = self.block_timestamp(BlockNumber::Number(block_number)).await?;

        Ok(Confirmation {
            transaction_hash: receipt.transaction_hash,
            block_number: block_number.as_u64(),
            timestamp,
        })
    }

    async fn commitment_window(&self) -> Result<CommitmentWindow> {
        let min_age = self
            .controller
            .min_commitment_age()
            .call()
            .await
            .map_err(|e| EnsError::from_contract("minCommitmentAge", e))?;
        let max_age = self
            .controller
            .max_commitment_age()
            .call()
            .await
            .map_err(|e| EnsError::from_contract("maxCommitmentAge", e))?;

        Ok(CommitmentWindow {
            min_age: Duration::from_secs(min_age.low_u64()),
            max_age: Duration::from_secs(max_age.low_u64()),
        })
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        self.block_timestamp(BlockNumber::Latest).await
    }

    async fn set_primary_name(&self, name: &str) -> Result<TxHash> {
        let call = self.reverse_registrar.set_name(name.to_string());
        let pending = call
            .send()
            .await
            .map_err(|e| EnsError::from_contract("setName", e))?;
        Ok(pending.tx_hash())
    }
}
