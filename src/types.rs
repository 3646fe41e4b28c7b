//! Registration data model

use ethers::types::{Address, TxHash, H256, U256};
use serde::Serialize;
use std::fmt;

use crate::error::{EnsError, Result};
use crate::name::{format_name, validate_name};

/// One year in seconds
pub const DEFAULT_DURATION: u64 = 365 * 24 * 60 * 60;

/// The controller refuses anything shorter than 28 days
pub const MIN_REGISTRATION_DURATION: u64 = 28 * 24 * 60 * 60;

/// Overpayment attached to `register`, in percent of the quoted price.
/// The controller refunds whatever exceeds the actual price.
pub const SLIPPAGE_PERCENT: u64 = 5;

/// Registration length in seconds for a whole number of years.
pub fn duration_for_years(years: u64) -> Result<u64> {
    years
        .checked_mul(DEFAULT_DURATION)
        .ok_or_else(|| EnsError::Validation(format!("{} years is too long a registration", years)))
}

/// What the user wants registered; nothing here is on-chain yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationIntent {
    /// Bare label, e.g. "alicesensei"
    pub name: String,
    pub owner: Address,
    /// Seconds
    pub duration: u64,
    pub resolver: Address,
    pub reverse_record: bool,
}

impl RegistrationIntent {
    /// One-year registration pointing at `resolver` with a reverse record.
    pub fn new(name: impl Into<String>, owner: Address, resolver: Address) -> Self {
        Self {
            name: name.into(),
            owner,
            duration: DEFAULT_DURATION,
            resolver,
            reverse_record: true,
        }
    }

    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_reverse_record(mut self, reverse_record: bool) -> Self {
        self.reverse_record = reverse_record;
        self
    }

    /// Local checks that must pass before any network call.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.duration < MIN_REGISTRATION_DURATION {
            return Err(EnsError::Validation(format!(
                "Duration must be at least {} seconds",
                MIN_REGISTRATION_DURATION
            )));
        }
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format_name(&self.name)
    }
}

/// Hash binding an intent and a secret, as computed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Commitment(pub H256);

impl Commitment {
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0 .0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

/// Quote from the controller's price oracle, in wei
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RentPrice {
    pub base: U256,
    pub premium: U256,
}

impl RentPrice {
    pub fn total(&self) -> U256 {
        self.base + self.premium
    }

    /// Total plus the slippage buffer, sent as `register`'s value.
    pub fn with_slippage(&self) -> U256 {
        self.total() * U256::from(100 + SLIPPAGE_PERCENT) / U256::from(100)
    }
}

/// A mined transaction and the timestamp of its block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub timestamp: u64,
}

/// A commitment that has been mined and is waiting out its minimum age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommit {
    pub commitment: Commitment,
    pub transaction_hash: TxHash,
    pub block_number: u64,
    /// Block timestamp of the commit transaction
    pub submitted_at: u64,
}

/// Proof of a confirmed registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationReceipt {
    /// Full name, e.g. "alicesensei.eth"
    pub name: String,
    pub owner: Address,
    pub transaction_hash: TxHash,
    /// Quoted total (base + premium) at submission time
    pub price: U256,
    /// Value attached to the transaction, including slippage
    pub value_sent: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(name: &str) -> RegistrationIntent {
        RegistrationIntent::new(name, Address::repeat_byte(1), Address::repeat_byte(2))
    }

    #[test]
    fn test_rent_price_total_is_exact() {
        let price = RentPrice {
            base: U256::from(3_125_000_000_000_000u64),
            premium: U256::from(7u64),
        };
        assert_eq!(price.total(), U256::from(3_125_000_000_000_007u64));

        let huge = RentPrice {
            base: U256::MAX - U256::from(10u64),
            premium: U256::from(10u64),
        };
        assert_eq!(huge.total(), U256::MAX);
    }

    #[test]
    fn test_slippage_is_five_percent() {
        let price = RentPrice {
            base: U256::from(1_000u64),
            premium: U256::from(1_000u64),
        };
        assert_eq!(price.with_slippage(), U256::from(2_100u64));
    }

    #[test]
    fn test_intent_defaults() {
        let intent = intent("alicesensei");
        assert_eq!(intent.duration, 31_536_000);
        assert!(intent.reverse_record);
        assert_eq!(intent.full_name(), "alicesensei.eth");
        assert!(intent.validate().is_ok());
    }

    #[test]
    fn test_intent_validation() {
        assert!(matches!(intent("ab").validate(), Err(EnsError::Validation(_))));
        assert!(matches!(
            intent("alicesensei").with_duration(60).validate(),
            Err(EnsError::Validation(_))
        ));
        assert!(intent("alicesensei")
            .with_duration(MIN_REGISTRATION_DURATION)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_duration_for_years() {
        assert_eq!(duration_for_years(1).unwrap(), DEFAULT_DURATION);
        assert_eq!(duration_for_years(3).unwrap(), 3 * DEFAULT_DURATION);
        assert!(matches!(
            duration_for_years(u64::MAX / DEFAULT_DURATION + 1),
            Err(EnsError::Validation(_))
        ));
        assert!(matches!(duration_for_years(u64::MAX), Err(EnsError::Validation(_))));
    }

    #[test]
    fn test_commitment_display() {
        let commitment = Commitment(H256::repeat_byte(0xab));
        let shown = commitment.to_string();
        assert!(shown.starts_with("0x"));
        assert_eq!(shown.len(), 66);
    }
}
