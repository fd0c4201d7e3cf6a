//! Settlement results and receipts for the Synthex audit trail.
//!
//! Every exchange and every settlement produces a receipt carrying a SHA-256
//! hash over its canonical fields, so an external auditor can check that a
//! stored receipt was not altered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{CurrencyKey, EntryId, Fixed18, UserId};

/// Outstanding reconciliation for one (user, destination) book.
///
/// Reclaim and rebate are accumulated separately and never netted: one
/// entry may owe a reclaim while another in the same book owes a rebate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOwing {
    /// Owed back by the user (overpaid relative to the current price).
    pub reclaim_amount: Fixed18,
    /// Owed to the user (underpaid relative to the current price).
    pub rebate_amount: Fixed18,
    /// Entries in the book at the time of the computation.
    pub num_entries: usize,
}

impl SettlementOwing {
    /// Whether there is nothing to reclaim or rebate.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.reclaim_amount.is_zero() && self.rebate_amount.is_zero()
    }
}

/// Record of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeReceipt {
    pub entry_id: EntryId,
    pub user: UserId,
    pub source_currency: CurrencyKey,
    pub source_amount: Fixed18,
    pub dest_currency: CurrencyKey,
    /// Destination amount credited to the user, net of fee.
    pub dest_amount: Fixed18,
    /// Fee charged, in destination currency.
    pub fee: Fixed18,
    /// Fee credited to the fee pool, in the stable unit.
    pub fee_in_stable: Fixed18,
    pub exchange_fee_rate: Fixed18,
    /// Settlement of the source book performed before the trade.
    pub source_settlement: Option<SettlementReceipt>,
    pub timestamp: u64,
    pub receipt_hash: [u8; 32],
}

impl ExchangeReceipt {
    /// Hash over the canonical fields (everything except the hash itself).
    #[must_use]
    pub fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"synthex:exchange_receipt:v1:");
        hasher.update(self.entry_id.0.as_bytes());
        hasher.update(self.user.0.as_bytes());
        hash_currency(&mut hasher, &self.source_currency);
        hasher.update(self.source_amount.raw().to_le_bytes());
        hash_currency(&mut hasher, &self.dest_currency);
        hasher.update(self.dest_amount.raw().to_le_bytes());
        hasher.update(self.fee.raw().to_le_bytes());
        hasher.update(self.fee_in_stable.raw().to_le_bytes());
        hasher.update(self.exchange_fee_rate.raw().to_le_bytes());
        match &self.source_settlement {
            Some(s) => {
                hasher.update([1u8]);
                hasher.update(s.receipt_hash);
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.timestamp.to_le_bytes());
        hasher.finalize().into()
    }

    /// Fill in `receipt_hash`.
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.receipt_hash = self.compute_hash();
        self
    }

    /// Whether `receipt_hash` matches the canonical fields.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.receipt_hash == self.compute_hash()
    }

    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.receipt_hash)
    }

    #[must_use]
    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.timestamp)
    }
}

/// Record of a completed settlement of one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub user: UserId,
    pub currency: CurrencyKey,
    /// Amount actually burned (the owed reclaim, capped at the user's balance).
    pub reclaimed: Fixed18,
    /// Amount minted to the user.
    pub rebated: Fixed18,
    /// Reclaim owed before capping at the balance.
    pub reclaim_owed: Fixed18,
    pub entries_settled: Vec<EntryId>,
    pub timestamp: u64,
    pub receipt_hash: [u8; 32],
}

impl SettlementReceipt {
    #[must_use]
    pub fn num_entries_settled(&self) -> usize {
        self.entries_settled.len()
    }

    #[must_use]
    pub fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"synthex:settlement_receipt:v1:");
        hasher.update(self.user.0.as_bytes());
        hash_currency(&mut hasher, &self.currency);
        hasher.update(self.reclaimed.raw().to_le_bytes());
        hasher.update(self.rebated.raw().to_le_bytes());
        hasher.update(self.reclaim_owed.raw().to_le_bytes());
        hasher.update((self.entries_settled.len() as u64).to_le_bytes());
        for id in &self.entries_settled {
            hasher.update(id.0.as_bytes());
        }
        hasher.update(self.timestamp.to_le_bytes());
        hasher.finalize().into()
    }

    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.receipt_hash = self.compute_hash();
        self
    }

    #[must_use]
    pub fn verify(&self) -> bool {
        self.receipt_hash == self.compute_hash()
    }

    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.receipt_hash)
    }

    #[must_use]
    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.timestamp)
    }
}

fn hash_currency(hasher: &mut Sha256, currency: &CurrencyKey) {
    let bytes = currency.as_str().as_bytes();
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn to_datetime(secs: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}
