//! Error types for ENS registration and resolution

use ethers::abi::{self, ParamType};
use ethers::contract::ContractError;
use ethers::providers::{Middleware, MiddlewareError, ProviderError};
use ethers::types::Bytes;
use ethers::utils::id;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EnsError>;

/// EIP-1193 "user rejected request"
const USER_REJECTED_CODE: i64 = 4001;

/// Selector of the solidity `Error(string)` revert
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

#[derive(Error, Debug)]
pub enum EnsError {
    /// Bad input, rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// RPC unreachable or timed out. The answer is unknown, retry.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Name not available: {0}")]
    NameUnavailable(String),

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("Insufficient payment: {0}")]
    InsufficientPayment(String),

    #[error("Commitment expired: {0}")]
    CommitmentExpired(String),

    #[error("Commitment too new: {0}")]
    CommitmentTooNew(String),

    /// Contract revert or node refusal not otherwise classified
    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Registration step out of order: expected {expected}, state is {actual}")]
    OutOfOrder {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EnsError {
    /// Only transport failures are worth retrying; everything else is a
    /// definite answer from the chain or the user.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnsError::Network(_))
    }

    /// Classify a failed contract call.
    pub fn from_contract<M: Middleware + 'static>(action: &str, err: ContractError<M>) -> Self {
        if let Some(data) = err.as_revert() {
            return Self::from_revert(action, data);
        }
        if let Some(e) = err.as_middleware_error() {
            return Self::from_rpc(action, e);
        }
        if let Some(e) = err.as_provider_error() {
            return Self::from_rpc(action, e);
        }
        EnsError::Chain(format!("{}: {}", action, err))
    }

    /// Classify a middleware/provider error.
    ///
    /// Failures that never reached the node are `Network` only when they come
    /// from the provider itself; a layer above it (the signer) refusing to
    /// send is a rejection and must not be retried.
    pub fn from_rpc<E: MiddlewareError + 'static>(action: &str, err: &E) -> Self {
        match err.as_error_response() {
            Some(resp) if resp.code == USER_REJECTED_CODE => {
                EnsError::TransactionRejected(format!("{}: {}", action, resp.message))
            }
            Some(resp) => match resp.as_revert_data() {
                Some(data) => Self::from_revert(action, &data),
                None => EnsError::Chain(format!("{}: {}", action, resp.message)),
            },
            None => match provider_error(err) {
                Some(ProviderError::SignerUnavailable) | None => {
                    EnsError::TransactionRejected(format!("{}: {}", action, err))
                }
                Some(_) => EnsError::Network(format!("{}: {}", action, err)),
            },
        }
    }

    /// Map revert data from the registrar controller onto the taxonomy.
    pub fn from_revert(action: &str, data: &Bytes) -> Self {
        if data.len() < 4 {
            return EnsError::Chain(format!("{}: reverted without reason", action));
        }
        let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];

        if selector == id("NameNotAvailable(string)") {
            EnsError::NameUnavailable(action.to_string())
        } else if selector == id("InsufficientValue()") {
            EnsError::InsufficientPayment(action.to_string())
        } else if selector == id("CommitmentTooNew(bytes32)") {
            EnsError::CommitmentTooNew(action.to_string())
        } else if selector == id("CommitmentTooOld(bytes32)") {
            EnsError::CommitmentExpired(action.to_string())
        } else if selector == id("UnexpiredCommitmentExists(bytes32)") {
            EnsError::Chain(format!("{}: an unexpired commitment already exists", action))
        } else if selector == id("DurationTooShort(uint256)") {
            EnsError::Chain(format!("{}: duration too short", action))
        } else if selector == ERROR_STRING_SELECTOR {
            let reason = abi::decode(&[ParamType::String], &data[4..])
                .ok()
                .and_then(|mut tokens| tokens.pop())
                .and_then(|token| token.into_string())
                .unwrap_or_default();
            EnsError::Chain(format!("{}: {}", action, reason))
        } else {
            EnsError::Chain(format!("{}: reverted with 0x{}", action, hex::encode(data)))
        }
    }
}

/// The provider error at the bottom of a middleware stack, if that is
/// where `err` came from.
fn provider_error<E: MiddlewareError + 'static>(err: &E) -> Option<&ProviderError> {
    let dyn_err: &(dyn std::error::Error + 'static) = err;
    if let Some(e) = dyn_err.downcast_ref::<ProviderError>() {
        return Some(e);
    }
    provider_error(err.as_inner()?)
}
