//! ENS `.eth` registration for Sensei replicas
//!
//! Registers names through the `ETHRegistrarController` commit/reveal scheme,
//! resolves names, primary names and avatars, and keeps a local history of
//! what was registered.

pub mod client;
pub mod config;
pub mod contracts;
pub mod db;
pub mod error;
pub mod flow;
pub mod gate;
pub mod name;
pub mod networks;
pub mod registrar;
pub mod resolver;
pub mod retry;
pub mod secret;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{EthersRegistrar, RegistrarClient};
pub use config::Config;
pub use error::{EnsError, Result};
pub use flow::{FlowState, RegistrationAttempt};
pub use gate::{CommitmentWindow, GateStatus, PollConfig};
pub use name::{format_name, labelhash, namehash, normalize_label, suggest_names, validate_name};
pub use networks::{Network, NetworkContracts};
pub use registrar::DomainRegistrar;
pub use resolver::{EnsResolver, NameResolver};
pub use retry::RetryPolicy;
pub use secret::Secret;
pub use types::{
    Commitment, Confirmation, PendingCommit, RegistrationIntent, RegistrationReceipt, RentPrice,
};
