//! Forward, reverse and avatar resolution

use async_trait::async_trait;
use ethers::prelude::*;
use std::sync::Arc;

use crate::contracts::{ENSRegistry, PublicResolver};
use crate::error::{EnsError, Result};
use crate::name::{format_name, namehash};
use crate::networks::NetworkContracts;
use crate::retry::{retry_read, RetryPolicy};

/// Text record holding the avatar URI
const AVATAR_KEY: &str = "avatar";

/// Each lookup is independently nullable: a missing record is `Ok(None)`,
/// only RPC failures are errors.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// name -> address
    async fn resolve_address(&self, name: &str) -> Result<Option<Address>>;

    /// address -> primary name
    async fn resolve_primary_name(&self, address: Address) -> Result<Option<String>>;

    /// name -> avatar URI
    async fn resolve_avatar(&self, name: &str) -> Result<Option<String>>;
}

/// Resolves through the ENS registry and whatever resolver a name points to.
pub struct EnsResolver<M> {
    client: Arc<M>,
    registry: ENSRegistry<M>,
    retry: RetryPolicy,
}

impl<M: Middleware + 'static> EnsResolver<M> {
    pub fn new(client: Arc<M>, contracts: &NetworkContracts) -> Self {
        let registry = ENSRegistry::new(contracts.registry, client.clone());
        Self {
            client,
            registry,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The resolver contract set for `node`, if any
    async fn resolver_for(&self, node: [u8; 32]) -> Result<Option<PublicResolver<M>>> {
        let address = retry_read(&self.retry, "resolver", || async move {
            self.registry
                .resolver(node)
                .call()
                .await
                .map_err(|e| EnsError::from_contract("resolver", e))
        })
        .await?;

        if address.is_zero() {
            return Ok(None);
        }
        Ok(Some(PublicResolver::new(address, self.client.clone())))
    }

    async fn forward(&self, name: &str) -> Result<Option<Address>> {
        let node = namehash(name);
        let Some(resolver) = self.resolver_for(node).await? else {
            return Ok(None);
        };
        let resolver = &resolver;

        let address = retry_read(&self.retry, "addr", || async move {
            resolver
                .addr(node)
                .call()
                .await
                .map_err(|e| EnsError::from_contract("addr", e))
        })
        .await?;

        Ok((!address.is_zero()).then_some(address))
    }
}

/// e.g., reverse_node_name(0xAbC...) -> "abc....addr.reverse"
pub fn reverse_node_name(address: Address) -> String {
    format!("{}.addr.reverse", hex::encode(address.as_bytes()))
}

#[async_trait]
impl<M: Middleware + 'static> NameResolver for EnsResolver<M> {
    async fn resolve_address(&self, name: &str) -> Result<Option<Address>> {
        self.forward(&format_name(name)).await
    }

    async fn resolve_primary_name(&self, address: Address) -> Result<Option<String>> {
        let node = namehash(&reverse_node_name(address));
        let Some(resolver) = self.resolver_for(node).await? else {
            return Ok(None);
        };
        let resolver = &resolver;

        let name = retry_read(&self.retry, "name", || async move {
            resolver
                .name(node)
                .call()
                .await
                .map_err(|e| EnsError::from_contract("name", e))
        })
        .await?;

        if name.is_empty() {
            return Ok(None);
        }

        // Anyone can claim any name in their reverse record; only trust it
        // if the name points back at the address.
        match self.forward(&name).await? {
            Some(forward) if forward == address => Ok(Some(name)),
            _ => {
                tracing::debug!(%name, ?address, "Reverse record does not resolve back");
                Ok(None)
            }
        }
    }

    async fn resolve_avatar(&self, name: &str) -> Result<Option<String>> {
        let node = namehash(&format_name(name));
        let Some(resolver) = self.resolver_for(node).await? else {
            return Ok(None);
        };
        let resolver = &resolver;

        let avatar = retry_read(&self.retry, "text", || async move {
            resolver
                .text(node, AVATAR_KEY.to_string())
                .call()
                .await
                .map_err(|e| EnsError::from_contract("text", e))
        })
        .await?;

        Ok((!avatar.is_empty()).then_some(avatar))
    }
}
