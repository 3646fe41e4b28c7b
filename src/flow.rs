//! One registration attempt, step by step
//!
//! `Idle -> Validated -> AvailabilityConfirmed -> PriceQuoted -> Committed
//! -> AwaitingMinAge -> Registered`. Any error moves the attempt to
//! `Failed`, except a commitment that ages out, which ends in `Expired`,
//! and a `register` made before the commitment is old enough, which leaves
//! the attempt in `AwaitingMinAge` so it can be retried later.
//! Calling a step from the wrong state is refused and changes nothing.

use ethers::types::TxHash;

use crate::client::RegistrarClient;
use crate::error::{EnsError, Result};
use crate::gate::CommitmentWindow;
use crate::registrar::DomainRegistrar;
use crate::resolver::NameResolver;
use crate::secret::Secret;
use crate::types::{Commitment, PendingCommit, RegistrationIntent, RegistrationReceipt, RentPrice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Validated,
    AvailabilityConfirmed,
    PriceQuoted(RentPrice),
    Committed {
        commitment: Commitment,
        transaction_hash: TxHash,
    },
    AwaitingMinAge {
        pending: PendingCommit,
        window: CommitmentWindow,
    },
    Registered(RegistrationReceipt),
    Failed(String),
    Expired,
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "Idle",
            FlowState::Validated => "Validated",
            FlowState::AvailabilityConfirmed => "AvailabilityConfirmed",
            FlowState::PriceQuoted(_) => "PriceQuoted",
            FlowState::Committed { .. } => "Committed",
            FlowState::AwaitingMinAge { .. } => "AwaitingMinAge",
            FlowState::Registered(_) => "Registered",
            FlowState::Failed(_) => "Failed",
            FlowState::Expired => "Expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowState::Registered(_) | FlowState::Failed(_) | FlowState::Expired
        )
    }
}

/// A single attempt to register `intent`.
///
/// Owns the attempt's secret; it is generated at commit time and dropped as
/// soon as the attempt ends. Attempts share nothing but the registrar, so
/// any number may run concurrently.
pub struct RegistrationAttempt<'r, C> {
    registrar: &'r DomainRegistrar<C>,
    intent: RegistrationIntent,
    secret: Option<Secret>,
    state: FlowState,
}

impl<'r, C: RegistrarClient> RegistrationAttempt<'r, C> {
    pub fn new(registrar: &'r DomainRegistrar<C>, intent: RegistrationIntent) -> Self {
        Self {
            registrar,
            intent,
            secret: None,
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn intent(&self) -> &RegistrationIntent {
        &self.intent
    }

    /// Run every step in order and return the receipt.
    pub async fn run(&mut self) -> Result<RegistrationReceipt> {
        self.validate()?;
        self.check_availability().await?;
        self.quote_price().await?;
        self.commit().await?;
        self.confirm_commit().await?;
        self.wait_for_maturity().await?;
        self.register().await
    }

    /// Local checks only; no network.
    pub fn validate(&mut self) -> Result<()> {
        self.require("Idle", matches!(self.state, FlowState::Idle))?;
        match self.intent.validate() {
            Ok(()) => {
                self.state = FlowState::Validated;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn check_availability(&mut self) -> Result<()> {
        self.require("Validated", matches!(self.state, FlowState::Validated))?;
        match self.registrar.is_available(&self.intent.name).await {
            Ok(true) => {
                self.state = FlowState::AvailabilityConfirmed;
                Ok(())
            }
            Ok(false) => Err(self.fail(EnsError::NameUnavailable(self.intent.full_name()))),
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn quote_price(&mut self) -> Result<RentPrice> {
        self.require(
            "AvailabilityConfirmed",
            matches!(self.state, FlowState::AvailabilityConfirmed),
        )?;
        match self
            .registrar
            .rent_price(&self.intent.name, self.intent.duration)
            .await
        {
            Ok(price) => {
                self.state = FlowState::PriceQuoted(price);
                Ok(price)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Generate the secret, build the commitment and submit it.
    pub async fn commit(&mut self) -> Result<Commitment> {
        self.require("PriceQuoted", matches!(self.state, FlowState::PriceQuoted(_)))?;

        let secret = Secret::generate();
        let result = async {
            let commitment = self.registrar.make_commitment(&self.intent, &secret).await?;
            let tx = self.registrar.commit(commitment).await?;
            Ok::<_, EnsError>((commitment, tx))
        }
        .await;

        match result {
            Ok((commitment, transaction_hash)) => {
                self.secret = Some(secret);
                self.state = FlowState::Committed {
                    commitment,
                    transaction_hash,
                };
                Ok(commitment)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Wait for the commit to be mined and read the commitment window.
    pub async fn confirm_commit(&mut self) -> Result<PendingCommit> {
        let FlowState::Committed {
            commitment,
            transaction_hash,
        } = self.state
        else {
            return Err(self.out_of_order("Committed"));
        };

        let result = async {
            let pending = self
                .registrar
                .confirm_commit(commitment, transaction_hash)
                .await?;
            let window = self.registrar.commitment_window().await?;
            Ok::<_, EnsError>((pending, window))
        }
        .await;

        match result {
            Ok((pending, window)) => {
                self.state = FlowState::AwaitingMinAge { pending, window };
                Ok(pending)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Block until the commitment is old enough to register.
    pub async fn wait_for_maturity(&mut self) -> Result<()> {
        let FlowState::AwaitingMinAge { pending, window } = self.state else {
            return Err(self.out_of_order("AwaitingMinAge"));
        };

        match self.registrar.wait_for_maturity(&window, &pending).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Re-quote the price and submit the registration.
    pub async fn register(&mut self) -> Result<RegistrationReceipt> {
        let FlowState::AwaitingMinAge { pending, window } = self.state else {
            return Err(self.out_of_order("AwaitingMinAge"));
        };
        let Some(secret) = self.secret.as_ref() else {
            return Err(self.out_of_order("AwaitingMinAge"));
        };

        let result = async {
            let price = self
                .registrar
                .rent_price(&self.intent.name, self.intent.duration)
                .await?;
            self.registrar
                .register(&self.intent, secret, &pending, &window, price)
                .await
        }
        .await;

        match result {
            Ok(receipt) => {
                tracing::info!(name = %receipt.name, tx = ?receipt.transaction_hash, "Registered");
                self.secret = None;
                self.state = FlowState::Registered(receipt.clone());
                Ok(receipt)
            }
            Err(e @ EnsError::CommitmentTooNew(_)) => {
                tracing::debug!(name = %self.intent.full_name(), "Commitment not old enough yet");
                Err(e)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Check that the registered name now resolves to its owner.
    pub async fn verify<R: NameResolver + ?Sized>(&self, resolver: &R) -> Result<bool> {
        let FlowState::Registered(receipt) = &self.state else {
            return Err(self.out_of_order("Registered"));
        };
        let resolved = resolver.resolve_address(&receipt.name).await?;
        Ok(resolved == Some(receipt.owner))
    }

    fn require(&self, expected: &'static str, ok: bool) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(self.out_of_order(expected))
        }
    }

    fn out_of_order(&self, expected: &'static str) -> EnsError {
        EnsError::OutOfOrder {
            expected,
            actual: self.state.name(),
        }
    }

    /// Move to the terminal state matching `err` and hand it back.
    fn fail(&mut self, err: EnsError) -> EnsError {
        let awaiting = matches!(self.state, FlowState::AwaitingMinAge { .. });
        self.state = match err {
            EnsError::CommitmentExpired(_) if awaiting => FlowState::Expired,
            _ => FlowState::Failed(err.to_string()),
        };
        self.secret = None;
        tracing::warn!(
            name = %self.intent.full_name(),
            state = self.state.name(),
            error = %err,
            "Registration attempt ended"
        );
        err
    }
}
