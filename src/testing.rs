//! In-memory registrar controller for tests
//!
//! Enforces the controller's rules (payment, commitment age window,
//! availability, duration) against a block clock driven by tokio time, so
//! tests using a paused runtime can skip through the commitment wait.

use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::types::{Address, TxHash, H256, U256};
use ethers::utils::keccak256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

use crate::client::RegistrarClient;
use crate::error::{EnsError, Result};
use crate::gate::CommitmentWindow;
use crate::name::{format_name, labelhash};
use crate::resolver::NameResolver;
use crate::secret::Secret;
use crate::types::{
    Commitment, Confirmation, RegistrationIntent, RentPrice, MIN_REGISTRATION_DURATION,
};

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// 0.003125 ETH, the 5+ character yearly price at ~$3200/ETH
pub(crate) const BASE_PRICE_WEI: u64 = 3_125_000_000_000_000;

struct MockState {
    premium: U256,
    owners: HashMap<String, Address>,
    primary_names: HashMap<Address, String>,
    avatars: HashMap<String, String>,
    commitments: HashMap<H256, u64>,
    transactions: HashMap<TxHash, Confirmation>,
    next_block: u64,
}

pub(crate) struct MockRegistrar {
    state: Mutex<MockState>,
    started: Instant,
    window: CommitmentWindow,
    sender: Address,
    rpc_calls: AtomicUsize,
    register_calls: AtomicUsize,
    read_failures: AtomicUsize,
}

impl MockRegistrar {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                premium: U256::zero(),
                owners: HashMap::new(),
                primary_names: HashMap::new(),
                avatars: HashMap::new(),
                commitments: HashMap::new(),
                transactions: HashMap::new(),
                next_block: 1,
            }),
            started: Instant::now(),
            window: CommitmentWindow::default(),
            sender: Address::repeat_byte(0x5e),
            rpc_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            read_failures: AtomicUsize::new(0),
        }
    }

    /// Current block timestamp
    pub(crate) fn now(&self) -> u64 {
        GENESIS_TIMESTAMP + self.started.elapsed().as_secs()
    }

    pub(crate) fn rpc_calls(&self) -> usize {
        self.rpc_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Make the next `count` reads fail with a transport error.
    pub(crate) fn fail_next_reads(&self, count: usize) {
        self.read_failures.store(count, Ordering::SeqCst);
    }

    pub(crate) fn set_premium(&self, premium: U256) {
        self.lock().premium = premium;
    }

    pub(crate) fn take_name(&self, label: &str, owner: Address) {
        self.lock().owners.insert(label.to_string(), owner);
    }

    pub(crate) fn set_avatar(&self, name: &str, uri: &str) {
        self.lock().avatars.insert(format_name(name), uri.to_string());
    }

    pub(crate) fn set_primary_name_for(&self, owner: Address, name: &str) {
        self.lock().primary_names.insert(owner, name.to_string());
    }

    pub(crate) fn sender(&self) -> Address {
        self.sender
    }

    /// The controller's commitment hash, computed the way the contract does.
    pub(crate) fn commitment_for(intent: &RegistrationIntent, secret: &Secret) -> Commitment {
        let encoded = abi::encode(&[
            Token::FixedBytes(labelhash(&intent.name).to_vec()),
            Token::Address(intent.owner),
            Token::Uint(U256::from(intent.duration)),
            Token::FixedBytes(secret.as_bytes().to_vec()),
            Token::Address(intent.resolver),
            Token::Array(vec![]),
            Token::Bool(intent.reverse_record),
            Token::Uint(U256::zero()),
        ]);
        Commitment(H256::from(keccak256(encoded)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn call(&self) {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn read(&self) -> Result<()> {
        self.call();
        let injected = self
            .read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match injected {
            Ok(_) => Err(EnsError::Network("connection reset".to_string())),
            Err(_) => Ok(()),
        }
    }

    fn mine(&self, state: &mut MockState) -> TxHash {
        let block_number = state.next_block;
        state.next_block += 1;
        let hash = TxHash::from_low_u64_be(block_number);
        state.transactions.insert(
            hash,
            Confirmation {
                transaction_hash: hash,
                block_number,
                timestamp: self.now(),
            },
        );
        hash
    }
}

#[async_trait]
impl RegistrarClient for MockRegistrar {
    async fn available(&self, label: &str) -> Result<bool> {
        self.read()?;
        Ok(!self.lock().owners.contains_key(label))
    }

    async fn rent_price(&self, _label: &str, duration: u64) -> Result<RentPrice> {
        self.read()?;
        let base = U256::from(BASE_PRICE_WEI) * U256::from(duration)
            / U256::from(crate::types::DEFAULT_DURATION);
        Ok(RentPrice {
            base,
            premium: self.lock().premium,
        })
    }

    async fn make_commitment(
        &self,
        intent: &RegistrationIntent,
        secret: &Secret,
    ) -> Result<Commitment> {
        self.read()?;
        Ok(Self::commitment_for(intent, secret))
    }

    async fn commit(&self, commitment: Commitment) -> Result<TxHash> {
        self.call();
        let now = self.now();
        let mut state = self.lock();
        if let Some(at) = state.commitments.get(&commitment.0) {
            if now < at + self.window.max_age.as_secs() {
                return Err(EnsError::Chain(
                    "commit: an unexpired commitment already exists".to_string(),
                ));
            }
        }
        state.commitments.insert(commitment.0, now);
        Ok(self.mine(&mut state))
    }

    async fn register(
        &self,
        intent: &RegistrationIntent,
        secret: &Secret,
        value: U256,
    ) -> Result<TxHash> {
        self.call();
        self.register_calls.fetch_add(1, Ordering::SeqCst);

        let now = self.now();
        let commitment = Self::commitment_for(intent, secret);
        let mut state = self.lock();

        let base = U256::from(BASE_PRICE_WEI) * U256::from(intent.duration)
            / U256::from(crate::types::DEFAULT_DURATION);
        if value < base + state.premium {
            return Err(EnsError::InsufficientPayment("register".to_string()));
        }

        let committed_at = state.commitments.get(&commitment.0).copied().unwrap_or(0);
        if committed_at + self.window.min_age.as_secs() > now {
            return Err(EnsError::CommitmentTooNew("register".to_string()));
        }
        if committed_at + self.window.max_age.as_secs() <= now {
            return Err(EnsError::CommitmentExpired("register".to_string()));
        }
        if state.owners.contains_key(&intent.name) {
            return Err(EnsError::NameUnavailable("register".to_string()));
        }
        state.commitments.remove(&commitment.0);
        if intent.duration < MIN_REGISTRATION_DURATION {
            return Err(EnsError::Chain("register: duration too short".to_string()));
        }

        state.owners.insert(intent.name.clone(), intent.owner);
        if intent.reverse_record {
            state
                .primary_names
                .insert(intent.owner, format_name(&intent.name));
        }
        Ok(self.mine(&mut state))
    }

    async fn wait_for_confirmation(&self, tx: TxHash) -> Result<Confirmation> {
        self.call();
        self.lock()
            .transactions
            .get(&tx)
            .copied()
            .ok_or_else(|| EnsError::Chain(format!("transaction {:?} was dropped", tx)))
    }

    async fn commitment_window(&self) -> Result<CommitmentWindow> {
        self.read()?;
        Ok(self.window)
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        self.call();
        Ok(self.now())
    }

    async fn set_primary_name(&self, name: &str) -> Result<TxHash> {
        self.call();
        let mut state = self.lock();
        state.primary_names.insert(self.sender, name.to_string());
        Ok(self.mine(&mut state))
    }
}

#[async_trait]
impl NameResolver for MockRegistrar {
    async fn resolve_address(&self, name: &str) -> Result<Option<Address>> {
        self.read()?;
        let label = name.strip_suffix(".eth").unwrap_or(name);
        Ok(self.lock().owners.get(label).copied())
    }

    async fn resolve_primary_name(&self, address: Address) -> Result<Option<String>> {
        self.read()?;
        Ok(self.lock().primary_names.get(&address).cloned())
    }

    async fn resolve_avatar(&self, name: &str) -> Result<Option<String>> {
        self.read()?;
        Ok(self.lock().avatars.get(&format_name(name)).cloned())
    }
}
