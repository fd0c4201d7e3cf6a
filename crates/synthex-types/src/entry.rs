//! Exchange entries and per-(user, destination) books.
//!
//! An [`ExchangeEntry`] is the immutable record of one trade outcome. Entries
//! are grouped by (user, destination currency) into a [`UserDestinationBook`],
//! oldest first. A book is only ever appended to (by an exchange) or cleared
//! as a whole (by settlement).

use serde::{Deserialize, Serialize};

use crate::{CurrencyKey, EntryId, Fixed18, Result, SynthexError, UserId};

/// One historical trade outcome for a user into a destination currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeEntry {
    pub id: EntryId,
    pub user: UserId,
    /// Currency that was debited.
    pub source_currency: CurrencyKey,
    /// Amount of source currency debited.
    pub source_amount: Fixed18,
    /// Source price in stable-unit terms at trade time.
    pub source_rate: Fixed18,
    /// Currency that was credited.
    pub dest_currency: CurrencyKey,
    /// Amount of destination currency credited, net of fee.
    pub dest_amount: Fixed18,
    /// Fee rate applied to this trade (0.005 = 0.5%).
    pub exchange_fee_rate: Fixed18,
    /// Destination price in stable-unit terms at trade time.
    pub effective_dest_rate: Fixed18,
    /// Trade time, seconds since UNIX epoch.
    pub timestamp: u64,
}

/// Ordered entries for one (user, destination currency) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDestinationBook {
    user: UserId,
    dest_currency: CurrencyKey,
    entries: Vec<ExchangeEntry>,
}

impl UserDestinationBook {
    /// Create an empty book for `(user, dest_currency)`.
    #[must_use]
    pub fn new(user: UserId, dest_currency: CurrencyKey) -> Self {
        Self {
            user,
            dest_currency,
            entries: Vec::new(),
        }
    }

    /// Append an entry.
    ///
    /// # Errors
    /// Returns `BookMismatch` if the entry's user or destination currency
    /// differs from the book's key.
    pub fn push(&mut self, entry: ExchangeEntry) -> Result<()> {
        if entry.user != self.user || entry.dest_currency != self.dest_currency {
            return Err(SynthexError::BookMismatch {
                user: entry.user,
                currency: entry.dest_currency,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    #[must_use]
    pub fn dest_currency(&self) -> &CurrencyKey {
        &self.dest_currency
    }

    /// Entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[ExchangeEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Timestamp of the most recent entry, if any.
    #[must_use]
    pub fn latest_timestamp(&self) -> Option<u64> {
        self.entries.last().map(|e| e.timestamp)
    }

    /// Remove every entry, returning them.
    pub fn clear(&mut self) -> Vec<ExchangeEntry> {
        std::mem::take(&mut self.entries)
    }
}

/// Dummy entry for tests.
#[cfg(any(test, feature = "test-helpers"))]
impl ExchangeEntry {
    #[must_use]
    pub fn dummy(user: UserId, dest: &str, timestamp: u64) -> Self {
        let dest_currency = CurrencyKey::new(dest).expect("valid test currency");
        Self {
            id: EntryId::deterministic(user, &dest_currency, timestamp),
            user,
            source_currency: CurrencyKey::new("sUSD").expect("valid test currency"),
            source_amount: Fixed18::from_int(100),
            source_rate: Fixed18::ONE,
            dest_currency,
            dest_amount: Fixed18::from_int(50),
            exchange_fee_rate: Fixed18::ZERO,
            effective_dest_rate: Fixed18::from_int(2),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_book_has_no_latest() {
        let book = UserDestinationBook::new(UserId::new(), CurrencyKey::new("sETH").unwrap());
        assert!(book.is_empty());
        assert_eq!(book.latest_timestamp(), None);
    }

    #[test]
    fn push_keeps_insertion_order() {
        let user = UserId::new();
        let mut book = UserDestinationBook::new(user, CurrencyKey::new("sETH").unwrap());
        book.push(ExchangeEntry::dummy(user, "sETH", 10)).unwrap();
        book.push(ExchangeEntry::dummy(user, "sETH", 20)).unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.entries()[0].timestamp, 10);
        assert_eq!(book.latest_timestamp(), Some(20));
    }

    #[test]
    fn push_rejects_foreign_entries() {
        let user = UserId::new();
        let mut book = UserDestinationBook::new(user, CurrencyKey::new("sETH").unwrap());

        let wrong_dest = ExchangeEntry::dummy(user, "sBTC", 10);
        assert!(matches!(
            book.push(wrong_dest),
            Err(SynthexError::BookMismatch { .. })
        ));

        let wrong_user = ExchangeEntry::dummy(UserId::new(), "sETH", 10);
        assert!(matches!(
            book.push(wrong_user),
            Err(SynthexError::BookMismatch { .. })
        ));
        assert!(book.is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let user = UserId::new();
        let mut book = UserDestinationBook::new(user, CurrencyKey::new("sETH").unwrap());
        book.push(ExchangeEntry::dummy(user, "sETH", 1)).unwrap();
        book.push(ExchangeEntry::dummy(user, "sETH", 2)).unwrap();
        let removed = book.clear();
        assert_eq!(removed.len(), 2);
        assert!(book.is_empty());
    }
}
