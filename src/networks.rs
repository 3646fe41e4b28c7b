use ethers::types::Address;
use std::str::FromStr;

use crate::error::{EnsError, Result};

/// ENS Registry contract address (same on mainnet and Sepolia)
pub const ENS_REGISTRY: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";

/// Networks with an ENS deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    /// Ethereum Mainnet
    Mainnet,
    /// Ethereum Sepolia Testnet
    Sepolia,
}

/// Contract addresses the client talks to on one network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkContracts {
    pub registry: Address,
    pub registrar_controller: Address,
    pub public_resolver: Address,
    pub reverse_registrar: Address,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Sepolia => 11155111,
        }
    }

    /// Get RPC URL (public endpoints)
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://eth.llamarpc.com",
            Network::Sepolia => "https://1rpc.io/sepolia",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "Ethereum",
            Network::Sepolia => "Ethereum Sepolia",
        }
    }

    pub fn registrar_controller(&self) -> &'static str {
        match self {
            Network::Mainnet => "0x253553366Da8546fC250F225fe3d25d0C782303b",
            Network::Sepolia => "0xfb3cE5D01e0f33f41DbB39035dB9745962F1f968",
        }
    }

    pub fn public_resolver(&self) -> &'static str {
        match self {
            Network::Mainnet => "0x231b0Ee14048e9dCcD1d247744d114a4EB5E8E63",
            Network::Sepolia => "0xE99638b40E4Fff0129D56f03b55b6bbC4BBE49b5",
        }
    }

    pub fn reverse_registrar(&self) -> &'static str {
        match self {
            Network::Mainnet => "0xa58E81fe9b61B5c3fE2AFD33CF304c454AbFc7Cb",
            Network::Sepolia => "0xA0a1AbcDAe1a2a4A2EF8e9113Ff0e02DD81DC0C6",
        }
    }

    /// Parsed contract addresses for this network
    pub fn contracts(&self) -> Result<NetworkContracts> {
        Ok(NetworkContracts {
            registry: parse_address(ENS_REGISTRY)?,
            registrar_controller: parse_address(self.registrar_controller())?,
            public_resolver: parse_address(self.public_resolver())?,
            reverse_registrar: parse_address(self.reverse_registrar())?,
        })
    }

    /// Parse network from user input (case-insensitive)
    pub fn from_input(input: &str) -> Option<Network> {
        match input.to_lowercase().as_str() {
            "mainnet" | "ethereum" | "eth" | "1" => Some(Network::Mainnet),
            "sepolia" | "eth-sepolia" | "11155111" => Some(Network::Sepolia),
            _ => None,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn parse_address(addr: &str) -> Result<Address> {
    Address::from_str(addr).map_err(|e| EnsError::Config(format!("bad address {}: {}", addr, e)))
}
