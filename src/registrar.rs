//! .eth registration through the ETHRegistrarController commit/reveal scheme

use ethers::types::TxHash;

use crate::client::RegistrarClient;
use crate::error::Result;
use crate::gate::{wait_for_window, CommitmentWindow, PollConfig};
use crate::name::validate_name;
use crate::retry::{retry_read, RetryPolicy};
use crate::secret::Secret;
use crate::types::{Commitment, PendingCommit, RegistrationIntent, RegistrationReceipt, RentPrice};

/// Domain Registrar - validated, retried access to the registrar controller
///
/// Reads are retried on transport errors. Writes (`commit`, `register`,
/// `set_primary_name`) are sent exactly once per call: resending a stale
/// price or an already-mined commitment only wastes gas.
pub struct DomainRegistrar<C> {
    client: C,
    retry: RetryPolicy,
    poll: PollConfig,
}

impl<C: RegistrarClient> DomainRegistrar<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            poll: PollConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Check if a label is available for registration.
    ///
    /// `Ok(false)` means taken. A failed read is an error, never `false`.
    pub async fn is_available(&self, label: &str) -> Result<bool> {
        validate_name(label)?;
        let available = retry_read(&self.retry, "available", move || self.client.available(label)).await?;
        tracing::debug!(label, available, "Checked availability");
        Ok(available)
    }

    /// Get the price to register a label for `duration` seconds.
    ///
    /// Premiums decay, so quote again right before paying.
    pub async fn rent_price(&self, label: &str, duration: u64) -> Result<RentPrice> {
        validate_name(label)?;
        let price = retry_read(&self.retry, "rentPrice", move || {
            self.client.rent_price(label, duration)
        })
        .await?;
        tracing::debug!(label, base = %price.base, premium = %price.premium, "Quoted rent price");
        Ok(price)
    }

    /// Have the controller derive the commitment for `intent` and `secret`.
    pub async fn make_commitment(
        &self,
        intent: &RegistrationIntent,
        secret: &Secret,
    ) -> Result<Commitment> {
        intent.validate()?;
        retry_read(&self.retry, "makeCommitment", move || {
            self.client.make_commitment(intent, secret)
        })
        .await
    }

    /// Step 1: submit the commitment. Returns the unconfirmed transaction.
    pub async fn commit(&self, commitment: Commitment) -> Result<TxHash> {
        let tx = self.client.commit(commitment).await?;
        tracing::info!(%commitment, ?tx, "Commitment submitted");
        Ok(tx)
    }

    /// Wait for the commit transaction to be mined.
    pub async fn confirm_commit(&self, commitment: Commitment, tx: TxHash) -> Result<PendingCommit> {
        let confirmation = self.client.wait_for_confirmation(tx).await?;
        tracing::info!(
            %commitment,
            block = confirmation.block_number,
            "Commitment confirmed"
        );
        Ok(PendingCommit {
            commitment,
            transaction_hash: confirmation.transaction_hash,
            block_number: confirmation.block_number,
            submitted_at: confirmation.timestamp,
        })
    }

    pub async fn commitment_window(&self) -> Result<CommitmentWindow> {
        retry_read(&self.retry, "commitmentAges", move || self.client.commitment_window()).await
    }

    /// Sleep until `pending` is old enough to register.
    pub async fn wait_for_maturity(
        &self,
        window: &CommitmentWindow,
        pending: &PendingCommit,
    ) -> Result<()> {
        tracing::info!(
            commitment = %pending.commitment,
            min_age_secs = window.min_age.as_secs(),
            "Waiting for commitment to mature"
        );
        wait_for_window(&self.client, window, pending, &self.poll).await
    }

    /// Step 2: register the name.
    ///
    /// Checks the commitment window against the latest block first, so an
    /// expired or premature commitment fails here without a transaction.
    /// Sends `price` plus the slippage buffer; the controller refunds the
    /// excess.
    pub async fn register(
        &self,
        intent: &RegistrationIntent,
        secret: &Secret,
        pending: &PendingCommit,
        window: &CommitmentWindow,
        price: RentPrice,
    ) -> Result<RegistrationReceipt> {
        intent.validate()?;

        let now = retry_read(&self.retry, "latestBlock", move || self.client.latest_block_timestamp()).await?;
        window.ensure_open(pending, now)?;

        let value = price.with_slippage();
        let tx = self.client.register(intent, secret, value).await?;
        tracing::info!(name = %intent.full_name(), ?tx, %value, "Registration submitted");

        let confirmation = self.client.wait_for_confirmation(tx).await?;
        tracing::info!(
            name = %intent.full_name(),
            block = confirmation.block_number,
            "Registration confirmed"
        );

        Ok(RegistrationReceipt {
            name: intent.full_name(),
            owner: intent.owner,
            transaction_hash: confirmation.transaction_hash,
            price: price.total(),
            value_sent: value,
        })
    }

    /// Point the sender's reverse record at `name`.
    pub async fn set_primary_name(&self, name: &str) -> Result<TxHash> {
        let label = crate::name::normalize_label(name)?;
        let full_name = crate::name::format_name(&label);
        let tx = self.client.set_primary_name(&full_name).await?;
        let confirmation = self.client.wait_for_confirmation(tx).await?;
        tracing::info!(name = %full_name, ?tx, "Primary name set");
        Ok(confirmation.transaction_hash)
    }
}
