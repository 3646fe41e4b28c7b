//! Commitment age window between `commit` and `register`
//!
//! The controller only accepts a registration whose commitment is at least
//! `minCommitmentAge` and less than `maxCommitmentAge` old, measured in block
//! time. Both ends are checked here against block timestamps so a late
//! registration fails locally instead of burning gas on a revert.

use std::time::Duration;

use crate::client::RegistrarClient;
use crate::error::{EnsError, Result};
use crate::types::PendingCommit;

/// Mainnet controller defaults
pub const DEFAULT_MIN_COMMITMENT_AGE: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_COMMITMENT_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitmentWindow {
    pub min_age: Duration,
    pub max_age: Duration,
}

impl Default for CommitmentWindow {
    fn default() -> Self {
        Self {
            min_age: DEFAULT_MIN_COMMITMENT_AGE,
            max_age: DEFAULT_MAX_COMMITMENT_AGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Registering now would revert with `CommitmentTooNew`
    TooEarly { remaining: Duration },
    /// Registrable; `remaining` is the time left before expiry
    Open { remaining: Duration },
    Expired,
}

impl CommitmentWindow {
    /// Where `pending` stands at block time `now`.
    pub fn status(&self, pending: &PendingCommit, now: u64) -> GateStatus {
        let opens_at = pending.submitted_at.saturating_add(self.min_age.as_secs());
        let expires_at = pending.submitted_at.saturating_add(self.max_age.as_secs());

        if now >= expires_at {
            GateStatus::Expired
        } else if now < opens_at {
            GateStatus::TooEarly {
                remaining: Duration::from_secs(opens_at - now),
            }
        } else {
            GateStatus::Open {
                remaining: Duration::from_secs(expires_at - now),
            }
        }
    }

    /// Fail unless `pending` is registrable at `now`.
    pub fn ensure_open(&self, pending: &PendingCommit, now: u64) -> Result<()> {
        match self.status(pending, now) {
            GateStatus::Open { .. } => Ok(()),
            GateStatus::TooEarly { remaining } => Err(EnsError::CommitmentTooNew(format!(
                "{} needs {}s more",
                pending.commitment,
                remaining.as_secs()
            ))),
            GateStatus::Expired => Err(EnsError::CommitmentExpired(format!(
                "{} is older than {}s",
                pending.commitment,
                self.max_age.as_secs()
            ))),
        }
    }
}

/// Polling limits for [`wait_for_window`]
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(12),
        }
    }
}

/// Sleep until the chain's block time says `pending` may be registered.
///
/// Sleeps for the remaining time, then re-reads the latest block timestamp
/// since blocks lag wall-clock time. Returns `CommitmentExpired` if the
/// window closes before it opens for us.
pub async fn wait_for_window<C: RegistrarClient + ?Sized>(
    client: &C,
    window: &CommitmentWindow,
    pending: &PendingCommit,
    poll: &PollConfig,
) -> Result<()> {
    let mut backoff = poll.min_interval;

    loop {
        let now = client.latest_block_timestamp().await?;

        match window.status(pending, now) {
            GateStatus::Open { .. } => return Ok(()),
            GateStatus::Expired => {
                return Err(EnsError::CommitmentExpired(format!(
                    "{} expired while waiting",
                    pending.commitment
                )))
            }
            GateStatus::TooEarly { remaining } => {
                let delay = remaining.max(backoff).min(poll.max_interval);
                tracing::debug!(
                    commitment = %pending.commitment,
                    remaining_secs = remaining.as_secs(),
                    "Waiting for commitment to mature"
                );
                tokio::time::sleep(delay).await;
                backoff = (backoff * 2).min(poll.max_interval);
            }
        }
    }
}
