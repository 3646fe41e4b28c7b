use chrono::{DateTime, Duration, Utc};
use ethers::types::Address;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::types::RegistrationReceipt;

/// Registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Registered,
    Expired,
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationStatus::Registered => write!(f, "registered"),
            RegistrationStatus::Expired => write!(f, "expired"),
        }
    }
}

/// A completed registration, as remembered locally.
///
/// Only a hint for the UI; the chain is the source of truth.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct RegistrationRecord {
    pub id: Uuid,
    pub replica_id: String,
    pub name: String,
    pub owner: String,
    pub transaction_hash: String,
    pub price_wei: String,
    pub status: String,
    pub registered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RegistrationRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == RegistrationStatus::Registered.to_string() && self.expires_at > now
    }
}

const COLUMNS: &str =
    "id, replica_id, name, owner, transaction_hash, price_wei, status, registered_at, expires_at";

/// Registration history repository
#[derive(Clone)]
pub struct RegistrationRepository {
    pool: SqlitePool,
}

impl RegistrationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Remember a confirmed registration for `replica_id`
    pub async fn record(
        &self,
        replica_id: &str,
        receipt: &RegistrationReceipt,
        duration: u64,
    ) -> Result<RegistrationRecord, sqlx::Error> {
        let registered_at = Utc::now();
        let expires_at = i64::try_from(duration)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|length| registered_at.checked_add_signed(length))
            .ok_or_else(|| {
                sqlx::Error::Protocol(format!("registration duration {}s is out of range", duration))
            })?;

        sqlx::query_as::<_, RegistrationRecord>(&format!(
            "INSERT INTO registrations ({COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(replica_id)
        .bind(&receipt.name)
        .bind(address_key(receipt.owner))
        .bind(format!("{:?}", receipt.transaction_hash))
        .bind(receipt.price.to_string())
        .bind(RegistrationStatus::Registered.to_string())
        .bind(registered_at)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Every registration made for a replica, newest first
    pub async fn find_by_replica(
        &self,
        replica_id: &str,
    ) -> Result<Vec<RegistrationRecord>, sqlx::Error> {
        sqlx::query_as::<_, RegistrationRecord>(&format!(
            "SELECT {COLUMNS} FROM registrations
             WHERE replica_id = $1 ORDER BY registered_at DESC"
        ))
        .bind(replica_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Latest registration of a name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<RegistrationRecord>, sqlx::Error> {
        sqlx::query_as::<_, RegistrationRecord>(&format!(
            "SELECT {COLUMNS} FROM registrations
             WHERE name = $1 ORDER BY registered_at DESC LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_by_owner(&self, owner: Address) -> Result<Vec<RegistrationRecord>, sqlx::Error> {
        sqlx::query_as::<_, RegistrationRecord>(&format!(
            "SELECT {COLUMNS} FROM registrations
             WHERE owner = $1 ORDER BY registered_at DESC"
        ))
        .bind(address_key(owner))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<RegistrationRecord>, sqlx::Error> {
        sqlx::query_as::<_, RegistrationRecord>(&format!(
            "SELECT {COLUMNS} FROM registrations ORDER BY registered_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Flag every registration past its expiry. Returns how many changed.
    pub async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE registrations SET status = $1
             WHERE status = $2 AND expires_at <= $3",
        )
        .bind(RegistrationStatus::Expired.to_string())
        .bind(RegistrationStatus::Registered.to_string())
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(count = result.rows_affected(), "Marked registrations expired");
        }
        Ok(result.rows_affected())
    }
}

/// Record a registration that is already paid for on chain.
///
/// The history is only a hint, so a failed write is logged and reported as
/// `false` instead of failing the caller.
pub async fn remember_registration(
    history: Option<&RegistrationRepository>,
    replica_id: &str,
    receipt: &RegistrationReceipt,
    duration: u64,
) -> bool {
    let Some(repo) = history else {
        return false;
    };
    match repo.record(replica_id, receipt, duration).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(
                name = %receipt.name,
                tx = ?receipt.transaction_hash,
                error = %e,
                "Registration succeeded but could not be saved to history"
            );
            false
        }
    }
}

/// Lowercase full-width hex, so lookups don't depend on checksum casing
fn address_key(address: Address) -> String {
    format!("{:?}", address)
}
