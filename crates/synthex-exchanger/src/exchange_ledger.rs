//! Exchange ledger: the deferred-settlement state machine.
//!
//! Every exchange appends an [`ExchangeEntry`] to the user's book for the
//! destination currency. While the latest entry of a book is inside the
//! waiting period, each entry is re-priced against the live destination
//! rate; the difference between what the user received and what they would
//! receive now is owed back (reclaim) or owed to them (rebate). Once the
//! window has elapsed the book owes nothing and is simply cleared on the
//! next settlement.
//!
//! ## Exchange flow
//!
//! ```text
//! gate → amount → rates (stale?) → fee rate → source owing → price
//!      → balance/overflow checks → settle source book
//!      → debit/credit/fee pool → append entry
//! ```
//!
//! Read-only queries re-price against the oracle's last posted rate even
//! when it is stale; only mutations refuse a stale rate.
//!
//! All checks and arithmetic run before the first balance movement, so an
//! error leaves books and balances exactly as they were.

use std::collections::HashMap;
use std::sync::Arc;

use synthex_types::{
    constants, BalanceLedger, Clock, CurrencyClassifier, CurrencyKey, EntryId, ExchangeConfig, ExchangeEntry,
    ExchangeReceipt, FeeConfig, Fixed18, PriceOracle, Result, SettlementOwing, SettlementReceipt,
    SynthexError, UserDestinationBook, UserId,
};

use crate::fee_policy::FeePolicy;
use crate::settlement::{ExchangeTransfer, SettlementExecutor};
use crate::waiting_period::WindowState;

type BookKey = (UserId, CurrencyKey);

/// Deferred-settlement exchange engine over a balance ledger `L`.
pub struct ExchangeLedger<L> {
    config: ExchangeConfig,
    books: HashMap<BookKey, UserDestinationBook>,
    /// Engine-wide entry counter feeding [`EntryId::deterministic`].
    next_sequence: u64,
    fee_policy: FeePolicy,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
    executor: SettlementExecutor<L>,
}

impl<L: BalanceLedger> ExchangeLedger<L> {
    /// Wire up an engine.
    ///
    /// # Errors
    /// `Configuration` if `config` fails validation.
    pub fn new(
        config: ExchangeConfig,
        ledger: L,
        oracle: Arc<dyn PriceOracle>,
        classifier: Arc<dyn CurrencyClassifier>,
        fees: Arc<dyn FeeConfig>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            admin = %config.admin,
            fee_pool = %config.fee_pool,
            waiting_period_secs = config.waiting_period_secs,
            stable = %config.stable_currency,
            enabled = config.exchange_enabled,
            "Exchange ledger initialized"
        );
        Ok(Self {
            config,
            books: HashMap::new(),
            next_sequence: 0,
            fee_policy: FeePolicy::new(fees, classifier),
            oracle,
            clock,
            executor: SettlementExecutor::new(ledger),
        })
    }

    // -----------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    #[must_use]
    pub fn exchange_enabled(&self) -> bool {
        self.config.exchange_enabled
    }

    #[must_use]
    pub fn waiting_period_secs(&self) -> u64 {
        self.config.waiting_period_secs
    }

    /// Open or close the trading gate.
    ///
    /// # Errors
    /// `Unauthorized` unless `caller` is the admin.
    pub fn set_exchange_enabled(&mut self, caller: UserId, enabled: bool) -> Result<()> {
        self.config.authorize(caller)?;
        tracing::info!(caller = %caller, enabled, "Exchange gate updated");
        self.config.exchange_enabled = enabled;
        Ok(())
    }

    /// Change the waiting period. Applies to every book immediately.
    ///
    /// # Errors
    /// `Unauthorized` unless `caller` is the admin.
    pub fn set_waiting_period_secs(&mut self, caller: UserId, secs: u64) -> Result<()> {
        self.config.authorize(caller)?;
        tracing::info!(
            caller = %caller,
            old = self.config.waiting_period_secs,
            new = secs,
            "Waiting period updated"
        );
        self.config.waiting_period_secs = secs;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Collaborators
    // -----------------------------------------------------------------

    #[must_use]
    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fee_policy
    }

    /// The injected balance ledger.
    #[must_use]
    pub fn ledger(&self) -> &L {
        self.executor.ledger()
    }

    /// Mutable access for deposits and other out-of-engine movements.
    pub fn ledger_mut(&mut self) -> &mut L {
        self.executor.ledger_mut()
    }

    /// Effective fee rate for `source → dest`.
    ///
    /// # Errors
    /// `UnknownCurrency` if either side is not classified.
    pub fn fee_rate_for_exchange(&self, source: &CurrencyKey, dest: &CurrencyKey) -> Result<Fixed18> {
        self.fee_policy.fee_rate_for_exchange(source, dest)
    }

    // -----------------------------------------------------------------
    // Read-only queries
    // -----------------------------------------------------------------

    /// Entries of the (user, dest) book, oldest first.
    #[must_use]
    pub fn exchange_entries(&self, user: UserId, dest: &CurrencyKey) -> &[ExchangeEntry] {
        self.book(user, dest)
            .map(UserDestinationBook::entries)
            .unwrap_or_default()
    }

    /// Seconds until the latest exchange into `currency` leaves its waiting
    /// period; 0 if there is none.
    #[must_use]
    pub fn max_secs_left_in_waiting_period(&self, user: UserId, currency: &CurrencyKey) -> u64 {
        self.window_state(user, currency, self.clock.now()).secs_left()
    }

    /// Reclaim and rebate currently owed on the (user, dest) book.
    ///
    /// A stale destination rate is still used here.
    ///
    /// # Errors
    /// `UnknownCurrency` or `ZeroRate` if the book is still pending and the
    /// destination has no usable price.
    pub fn settlement_owing(&self, user: UserId, dest: &CurrencyKey) -> Result<SettlementOwing> {
        match self.book(user, dest) {
            None => Ok(SettlementOwing::default()),
            Some(book) => self.book_owing(book, self.clock.now(), || self.quoted_rate(dest)),
        }
    }

    /// Whether `currency` is still inside a waiting period or has a pending
    /// reclaim or rebate.
    pub fn has_waiting_period_or_settlement_owing(
        &self,
        user: UserId,
        currency: &CurrencyKey,
    ) -> Result<bool> {
        if self.max_secs_left_in_waiting_period(user, currency) > 0 {
            return Ok(true);
        }
        Ok(!self.settlement_owing(user, currency)?.is_nil())
    }

    /// How much of `amount` the user could move out of `currency` once the
    /// book has been settled.
    ///
    /// A reclaim limits the result to what would be left of the balance;
    /// a rebate is added on top.
    pub fn amount_after_settlement(
        &self,
        user: UserId,
        currency: &CurrencyKey,
        amount: Fixed18,
    ) -> Result<Fixed18> {
        let owing = self.settlement_owing(user, currency)?;
        let mut result = amount;
        if !owing.reclaim_amount.is_zero() {
            let left = self
                .ledger()
                .balance_of(user, currency)
                .saturating_sub(owing.reclaim_amount);
            result = result.min(left);
        }
        result.checked_add(owing.rebate_amount)
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Exchange `source_amount` of `source` into `dest` for `user`.
    ///
    /// # Errors
    /// `ExchangeDisabled`, `ZeroAmount`, `SameCurrency`, `StaleRate`,
    /// `UnknownCurrency`, `ZeroRate`, `InsufficientBalance`, or
    /// `ArithmeticOverflow`. Nothing changes on error.
    pub fn exchange(
        &mut self,
        user: UserId,
        source: &CurrencyKey,
        source_amount: Fixed18,
        dest: &CurrencyKey,
    ) -> Result<ExchangeReceipt> {
        if !self.config.exchange_enabled {
            return Err(SynthexError::ExchangeDisabled);
        }
        if source_amount.is_zero() {
            return Err(SynthexError::ZeroAmount);
        }
        if source == dest {
            return Err(SynthexError::SameCurrency(source.clone()));
        }

        let source_rate = self.usable_rate(source)?;
        let dest_rate = self.usable_rate(dest)?;
        let fee_rate = self.fee_policy.fee_rate_for_exchange(source, dest)?;
        let now = self.clock.now();

        // Outstanding drift on the source balance is reconciled first.
        let source_owing = self
            .book(user, source)
            .map(|book| self.book_owing(book, now, || Ok(source_rate)))
            .transpose()?;

        let gross = source_amount.mul_trunc(source_rate)?.div_trunc(dest_rate)?;
        let (dest_amount, fee) = FeePolicy::fee_for_amount(gross, fee_rate)?;
        let fee_in_stable = fee.mul_trunc(dest_rate)?;

        let transfer = ExchangeTransfer {
            user,
            source_currency: source.clone(),
            source_amount,
            dest_currency: dest.clone(),
            dest_amount,
            fee_pool: self.config.fee_pool,
            stable_currency: self.config.stable_currency.clone(),
            fee_in_stable,
        };
        self.executor
            .check_exchange(&transfer, source_owing.as_ref())?;

        let source_settlement = match source_owing {
            Some(owing) => Some(self.settle_book(user, source, &owing, now)?),
            None => None,
        };
        self.executor.apply_exchange(&transfer)?;

        let entry_id = EntryId::deterministic(user, dest, self.next_sequence);
        self.next_sequence += 1;
        let entry = ExchangeEntry {
            id: entry_id,
            user,
            source_currency: source.clone(),
            source_amount,
            source_rate,
            dest_currency: dest.clone(),
            dest_amount,
            exchange_fee_rate: fee_rate,
            effective_dest_rate: dest_rate,
            timestamp: now,
        };
        self.books
            .entry((user, dest.clone()))
            .or_insert_with(|| UserDestinationBook::new(user, dest.clone()))
            .push(entry)?;

        tracing::info!(
            entry = %entry_id,
            user = %user,
            source = %source,
            dest = %dest,
            amount = %source_amount,
            received = %dest_amount,
            fee = %fee,
            fee_rate = %fee_rate,
            "Exchange executed"
        );

        Ok(ExchangeReceipt {
            entry_id,
            user,
            source_currency: source.clone(),
            source_amount,
            dest_currency: dest.clone(),
            dest_amount,
            fee,
            fee_in_stable,
            exchange_fee_rate: fee_rate,
            source_settlement,
            timestamp: now,
            receipt_hash: [0u8; 32],
        }
        .sealed())
    }

    /// Apply the owed reclaim and rebate for (user, dest) and clear the book.
    ///
    /// Settling an empty book is a no-op that still returns a receipt.
    ///
    /// # Errors
    /// `StaleRate` or `UnknownCurrency` if the book is pending and the rate
    /// is unusable.
    pub fn settle(&mut self, user: UserId, dest: &CurrencyKey) -> Result<SettlementReceipt> {
        let now = self.clock.now();
        let owing = self.settleable_owing(user, dest, now)?;
        self.settle_book(user, dest, &owing, now)
    }

    /// Transfer `amount` of `currency` after settling the sender's book.
    ///
    /// # Errors
    /// `InsufficientBalance` if the settled balance is lower than `amount`,
    /// plus anything [`settle`](Self::settle) can return.
    pub fn transfer_settled(
        &mut self,
        from: UserId,
        to: UserId,
        currency: &CurrencyKey,
        amount: Fixed18,
    ) -> Result<Option<SettlementReceipt>> {
        let now = self.clock.now();
        let owing = self.settleable_owing(from, currency, now)?;
        let available = self
            .executor
            .balance_after_settlement(from, currency, &owing)?;
        if available < amount {
            return Err(SynthexError::InsufficientBalance {
                currency: currency.clone(),
                needed: amount,
                available,
            });
        }

        let settlement = if self.book(from, currency).is_some() {
            Some(self.settle_book(from, currency, &owing, now)?)
        } else {
            None
        };
        self.executor.apply_transfer(from, to, currency, amount)?;
        tracing::info!(
            from = %from,
            to = %to,
            currency = %currency,
            amount = %amount,
            "Transfer after settlement"
        );
        Ok(settlement)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn book(&self, user: UserId, currency: &CurrencyKey) -> Option<&UserDestinationBook> {
        self.books
            .get(&(user, currency.clone()))
            .filter(|book| !book.is_empty())
    }

    fn window_state(&self, user: UserId, currency: &CurrencyKey, now: u64) -> WindowState {
        WindowState::of(
            self.book(user, currency)
                .and_then(UserDestinationBook::latest_timestamp),
            now,
            self.config.waiting_period_secs,
        )
    }

    /// Owing for a non-empty book; the rate is only read while it is pending.
    fn book_owing(
        &self,
        book: &UserDestinationBook,
        now: u64,
        current_rate: impl FnOnce() -> Result<Fixed18>,
    ) -> Result<SettlementOwing> {
        let state = WindowState::of(book.latest_timestamp(), now, self.config.waiting_period_secs);
        if state.is_pending() {
            Self::reprice_book(book, current_rate()?)
        } else {
            Ok(SettlementOwing {
                num_entries: book.len(),
                ..SettlementOwing::default()
            })
        }
    }

    /// Owing that a mutation may act on: a pending book needs a fresh rate.
    fn settleable_owing(
        &self,
        user: UserId,
        dest: &CurrencyKey,
        now: u64,
    ) -> Result<SettlementOwing> {
        match self.book(user, dest) {
            None => Ok(SettlementOwing::default()),
            Some(book) => self.book_owing(book, now, || self.usable_rate(dest)),
        }
    }

    /// Last posted price of `currency`, stale or not; zero is rejected.
    fn quoted_rate(&self, currency: &CurrencyKey) -> Result<Fixed18> {
        let reading = self.oracle.rate(currency)?;
        if reading.price.is_zero() {
            return Err(SynthexError::ZeroRate(currency.clone()));
        }
        Ok(reading.price)
    }

    /// Oracle price of `currency`, rejected if stale or zero.
    fn usable_rate(&self, currency: &CurrencyKey) -> Result<Fixed18> {
        let reading = self.oracle.rate(currency)?;
        if reading.is_stale {
            tracing::warn!(currency = %currency, price = %reading.price, "Stale rate rejected");
            return Err(SynthexError::StaleRate(currency.clone()));
        }
        if reading.price.is_zero() {
            return Err(SynthexError::ZeroRate(currency.clone()));
        }
        Ok(reading.price)
    }

    /// Re-price every entry of `book` at `current_rate`.
    ///
    /// Each entry is priced with its own source amount, source rate and fee
    /// rate, in the same truncation order as [`exchange`](Self::exchange),
    /// so an unchanged rate yields exactly zero.
    fn reprice_book(book: &UserDestinationBook, current_rate: Fixed18) -> Result<SettlementOwing> {
        let mut owing = SettlementOwing {
            num_entries: book.len(),
            ..SettlementOwing::default()
        };
        for entry in book.entries() {
            let gross = entry
                .source_amount
                .mul_trunc(entry.source_rate)?
                .div_trunc(current_rate)?;
            let (should_have, _) = FeePolicy::fee_for_amount(gross, entry.exchange_fee_rate)?;

            if entry.dest_amount > should_have {
                let reclaim = entry.dest_amount.saturating_sub(should_have);
                owing.reclaim_amount = owing.reclaim_amount.checked_add(reclaim)?;
            } else {
                let rebate = should_have.saturating_sub(entry.dest_amount);
                owing.rebate_amount = owing.rebate_amount.checked_add(rebate)?;
            }
            tracing::debug!(
                entry = %entry.id,
                traded_rate = %entry.effective_dest_rate,
                current_rate = %current_rate,
                received = %entry.dest_amount,
                should_have = %should_have,
                "Entry re-priced"
            );
        }
        Ok(owing)
    }

    fn settle_book(
        &mut self,
        user: UserId,
        currency: &CurrencyKey,
        owing: &SettlementOwing,
        now: u64,
    ) -> Result<SettlementReceipt> {
        let applied = self.executor.apply_settlement(user, currency, owing)?;
        let cleared = self
            .books
            .remove(&(user, currency.clone()))
            .map(|mut book| book.clear())
            .unwrap_or_default();

        if cleared.is_empty() {
            tracing::debug!(user = %user, currency = %currency, "Nothing to settle");
        } else {
            tracing::info!(
                user = %user,
                currency = %currency,
                entries = cleared.len(),
                reclaimed = %applied.reclaimed,
                rebated = %applied.rebated,
                "Book settled"
            );
        }

        Ok(SettlementReceipt {
            user,
            currency: currency.clone(),
            reclaimed: applied.reclaimed,
            rebated: applied.rebated,
            reclaim_owed: owing.reclaim_amount,
            entries_settled: cleared.iter().map(|e| e.id).collect(),
            timestamp: now,
            receipt_hash: [0u8; 32],
        }
        .sealed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthex_ledger::{BalanceBook, CurrencyRegistry, FeeSchedule, ManualClock, PriceBoard};
    use synthex_types::CurrencyClass;

    const START: u64 = 1_700_000_000;

    fn key(code: &str) -> CurrencyKey {
        CurrencyKey::new(code).unwrap()
    }

    fn fx(s: &str) -> Fixed18 {
        s.parse().unwrap()
    }

    struct Harness {
        admin: UserId,
        user: UserId,
        clock: Arc<ManualClock>,
        prices: Arc<PriceBoard>,
        engine: ExchangeLedger<BalanceBook>,
    }

    fn harness(period: u64, fee: &str) -> Harness {
        let admin = UserId::new();
        let user = UserId::new();
        let clock = Arc::new(ManualClock::new(START));
        let prices = Arc::new(PriceBoard::new(key("sUSD"), clock.clone()));
        prices.set_rate(&key("sETH"), Fixed18::from_int(2)).unwrap();
        prices.set_rate(&key("iETH"), Fixed18::from_int(4)).unwrap();

        let registry = CurrencyRegistry::new(admin, key("sUSD"));
        registry.register(admin, key("sETH"), CurrencyClass::Long).unwrap();
        registry.register(admin, key("iETH"), CurrencyClass::Inverse).unwrap();

        let mut book = BalanceBook::new();
        book.deposit(user, &key("sUSD"), Fixed18::from_int(1_000)).unwrap();

        let engine = ExchangeLedger::new(
            ExchangeConfig::new(admin).with_waiting_period_secs(period),
            book,
            prices.clone(),
            Arc::new(registry),
            Arc::new(FeeSchedule::with_rate(admin, fx(fee))),
            clock.clone(),
        )
        .unwrap();
        Harness {
            admin,
            user,
            clock,
            prices,
            engine,
        }
    }

    #[test]
    fn exchange_prices_and_records_entry() {
        let mut h = harness(60, "0.005");
        let receipt = h
            .engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        assert_eq!(receipt.dest_amount, fx("49.75"));
        assert_eq!(receipt.fee, fx("0.25"));
        assert_eq!(receipt.fee_in_stable, fx("0.5"));
        assert!(receipt.source_settlement.is_none());
        assert!(receipt.verify());

        let entries = h.engine.exchange_entries(h.user, &key("sETH"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].effective_dest_rate, Fixed18::from_int(2));
        assert_eq!(entries[0].timestamp, START);
        assert_eq!(h.engine.ledger().balance_of(h.user, &key("sUSD")), Fixed18::from_int(900));
        assert_eq!(h.engine.ledger().balance_of(h.user, &key("sETH")), fx("49.75"));
    }

    #[test]
    fn inverse_long_exchange_charges_double() {
        let mut h = harness(60, "0.005");
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        h.clock.advance(60);
        let receipt = h
            .engine
            .exchange(h.user, &key("sETH"), Fixed18::from_int(10), &key("iETH"))
            .unwrap();
        assert_eq!(receipt.exchange_fee_rate, fx("0.01"));
        // 10 * 2 / 4 = 5, minus 1%
        assert_eq!(receipt.dest_amount, fx("4.95"));
    }

    #[test]
    fn gate_and_degenerate_requests() {
        let mut h = harness(60, "0.005");
        assert_eq!(
            h.engine
                .exchange(h.user, &key("sUSD"), Fixed18::ZERO, &key("sETH"))
                .unwrap_err(),
            SynthexError::ZeroAmount
        );
        assert_eq!(
            h.engine
                .exchange(h.user, &key("sUSD"), Fixed18::ONE, &key("sUSD"))
                .unwrap_err(),
            SynthexError::SameCurrency(key("sUSD"))
        );

        h.engine.set_exchange_enabled(h.admin, false).unwrap();
        assert_eq!(
            h.engine
                .exchange(h.user, &key("sUSD"), Fixed18::ONE, &key("sETH"))
                .unwrap_err(),
            SynthexError::ExchangeDisabled
        );
        h.engine.set_exchange_enabled(h.admin, true).unwrap();
        assert!(h
            .engine
            .exchange(h.user, &key("sUSD"), Fixed18::ONE, &key("sETH"))
            .is_ok());
    }

    #[test]
    fn setters_require_admin() {
        let mut h = harness(60, "0.005");
        let user = h.user;
        assert_eq!(
            h.engine.set_waiting_period_secs(user, 1).unwrap_err(),
            SynthexError::Unauthorized(user)
        );
        assert_eq!(
            h.engine.set_exchange_enabled(user, false).unwrap_err(),
            SynthexError::Unauthorized(user)
        );
        assert_eq!(h.engine.waiting_period_secs(), 60);
        assert!(h.engine.exchange_enabled());

        h.engine.set_waiting_period_secs(h.admin, 120).unwrap();
        assert_eq!(h.engine.waiting_period_secs(), 120);
    }

    #[test]
    fn stale_rate_rejected_without_side_effects() {
        let mut h = harness(60, "0.005");
        h.clock.advance(3_601);
        assert_eq!(
            h.engine
                .exchange(h.user, &key("sUSD"), Fixed18::ONE, &key("sETH"))
                .unwrap_err(),
            SynthexError::StaleRate(key("sETH"))
        );
        assert!(h.engine.exchange_entries(h.user, &key("sETH")).is_empty());
        assert_eq!(h.engine.ledger().balance_of(h.user, &key("sUSD")), Fixed18::from_int(1_000));
    }

    #[test]
    fn rising_price_owes_reclaim() {
        let mut h = harness(60, "0.005");
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        assert!(h.engine.settlement_owing(h.user, &key("sETH")).unwrap().is_nil());

        h.prices.set_rate(&key("sETH"), Fixed18::from_int(4)).unwrap();
        let owing = h.engine.settlement_owing(h.user, &key("sETH")).unwrap();
        assert_eq!(owing.reclaim_amount, fx("24.875"));
        assert!(owing.rebate_amount.is_zero());
        assert_eq!(owing.num_entries, 1);
    }

    #[test]
    fn falling_price_owes_rebate() {
        let mut h = harness(60, "0.005");
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        h.prices.set_rate(&key("sETH"), Fixed18::from_int(1)).unwrap();
        let owing = h.engine.settlement_owing(h.user, &key("sETH")).unwrap();
        assert!(owing.reclaim_amount.is_zero());
        assert_eq!(owing.rebate_amount, fx("49.75"));
    }

    #[test]
    fn stale_pending_book_still_reports_owing() {
        let mut h = harness(7_200, "0.005");
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        h.prices.set_rate(&key("sETH"), Fixed18::from_int(4)).unwrap();
        h.clock.advance(3_601);

        let owing = h.engine.settlement_owing(h.user, &key("sETH")).unwrap();
        assert_eq!(owing.reclaim_amount, fx("24.875"));
        assert!(owing.rebate_amount.is_zero());
        assert!(h
            .engine
            .has_waiting_period_or_settlement_owing(h.user, &key("sETH"))
            .unwrap());
        assert_eq!(
            h.engine
                .amount_after_settlement(h.user, &key("sETH"), fx("49.75"))
                .unwrap(),
            fx("24.875")
        );
    }

    #[test]
    fn settle_rejects_stale_pending_book() {
        let mut h = harness(7_200, "0.005");
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        h.prices.set_rate(&key("sETH"), Fixed18::from_int(4)).unwrap();
        h.clock.advance(3_601);

        assert_eq!(
            h.engine.settle(h.user, &key("sETH")).unwrap_err(),
            SynthexError::StaleRate(key("sETH"))
        );
        assert_eq!(h.engine.exchange_entries(h.user, &key("sETH")).len(), 1);
        assert_eq!(h.engine.ledger().balance_of(h.user, &key("sETH")), fx("49.75"));

        h.prices.set_rate(&key("sETH"), Fixed18::from_int(4)).unwrap();
        let receipt = h.engine.settle(h.user, &key("sETH")).unwrap();
        assert_eq!(receipt.reclaimed, fx("24.875"));
    }

    #[test]
    fn failed_exchange_keeps_source_book() {
        let mut h = harness(60, "0");
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        h.engine
            .exchange(h.user, &key("sETH"), Fixed18::from_int(10), &key("sUSD"))
            .unwrap();
        assert_eq!(h.engine.exchange_entries(h.user, &key("sUSD")).len(), 1);

        // Fill the sETH balance so the next credit cannot fit.
        h.engine
            .ledger_mut()
            .deposit(h.user, &key("sETH"), Fixed18::MAX.saturating_sub(Fixed18::from_int(50)))
            .unwrap();
        let seth_before = h.engine.ledger().balance_of(h.user, &key("sETH"));

        let err = h
            .engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap_err();
        assert!(matches!(err, SynthexError::ArithmeticOverflow { .. }));
        assert_eq!(h.engine.exchange_entries(h.user, &key("sUSD")).len(), 1);
        assert_eq!(h.engine.ledger().balance_of(h.user, &key("sUSD")), Fixed18::from_int(920));
        assert_eq!(h.engine.ledger().balance_of(h.user, &key("sETH")), seth_before);
        h.engine.ledger().verify_all_supply().unwrap();
    }

    #[test]
    fn settle_applies_and_clears() {
        let mut h = harness(60, "0.005");
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        h.prices.set_rate(&key("sETH"), Fixed18::from_int(4)).unwrap();

        let receipt = h.engine.settle(h.user, &key("sETH")).unwrap();
        assert_eq!(receipt.reclaimed, fx("24.875"));
        assert_eq!(receipt.num_entries_settled(), 1);
        assert!(receipt.verify());
        assert_eq!(h.engine.ledger().balance_of(h.user, &key("sETH")), fx("24.875"));
        assert!(h.engine.exchange_entries(h.user, &key("sETH")).is_empty());
        assert_eq!(h.engine.max_secs_left_in_waiting_period(h.user, &key("sETH")), 0);

        let again = h.engine.settle(h.user, &key("sETH")).unwrap();
        assert!(again.reclaimed.is_zero() && again.rebated.is_zero());
        assert_eq!(again.num_entries_settled(), 0);
        h.engine.ledger().verify_all_supply().unwrap();
    }

    #[test]
    fn exchange_out_of_pending_book_settles_first() {
        let mut h = harness(60, "0");
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        h.prices.set_rate(&key("sETH"), Fixed18::from_int(4)).unwrap();

        // 50 sETH received, 25 reclaimable: only 25 may leave.
        let err = h
            .engine
            .exchange(h.user, &key("sETH"), Fixed18::from_int(30), &key("sUSD"))
            .unwrap_err();
        assert!(matches!(err, SynthexError::InsufficientBalance { .. }));
        assert_eq!(h.engine.exchange_entries(h.user, &key("sETH")).len(), 1);

        let receipt = h
            .engine
            .exchange(h.user, &key("sETH"), Fixed18::from_int(25), &key("sUSD"))
            .unwrap();
        let settled = receipt.source_settlement.unwrap();
        assert_eq!(settled.reclaimed, Fixed18::from_int(25));
        assert!(h.engine.ledger().balance_of(h.user, &key("sETH")).is_zero());
        assert!(h.engine.exchange_entries(h.user, &key("sETH")).is_empty());
        assert_eq!(receipt.dest_amount, Fixed18::from_int(100));
    }

    #[test]
    fn helper_queries_follow_owing() {
        let mut h = harness(60, "0");
        assert!(!h
            .engine
            .has_waiting_period_or_settlement_owing(h.user, &key("sETH"))
            .unwrap());
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        assert!(h
            .engine
            .has_waiting_period_or_settlement_owing(h.user, &key("sETH"))
            .unwrap());

        h.prices.set_rate(&key("sETH"), Fixed18::from_int(4)).unwrap();
        assert_eq!(
            h.engine
                .amount_after_settlement(h.user, &key("sETH"), Fixed18::from_int(50))
                .unwrap(),
            Fixed18::from_int(25)
        );
        assert_eq!(
            h.engine
                .amount_after_settlement(h.user, &key("sETH"), Fixed18::from_int(10))
                .unwrap(),
            Fixed18::from_int(10)
        );

        h.prices.set_rate(&key("sETH"), Fixed18::from_int(1)).unwrap();
        assert_eq!(
            h.engine
                .amount_after_settlement(h.user, &key("sETH"), Fixed18::from_int(10))
                .unwrap(),
            Fixed18::from_int(60)
        );

        h.clock.advance(60);
        assert!(!h
            .engine
            .has_waiting_period_or_settlement_owing(h.user, &key("sETH"))
            .unwrap());
    }

    #[test]
    fn transfer_settles_sender_first() {
        let mut h = harness(60, "0");
        let bob = UserId::new();
        h.engine
            .exchange(h.user, &key("sUSD"), Fixed18::from_int(100), &key("sETH"))
            .unwrap();
        h.prices.set_rate(&key("sETH"), Fixed18::from_int(1)).unwrap();

        let settlement = h
            .engine
            .transfer_settled(h.user, bob, &key("sETH"), Fixed18::from_int(100))
            .unwrap()
            .unwrap();
        assert_eq!(settlement.rebated, Fixed18::from_int(50));
        assert_eq!(h.engine.ledger().balance_of(bob, &key("sETH")), Fixed18::from_int(100));
        assert!(h.engine.ledger().balance_of(h.user, &key("sETH")).is_zero());

        let none = h
            .engine
            .transfer_settled(bob, h.user, &key("sETH"), Fixed18::from_int(1))
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn invalid_config_rejected() {
        let admin = UserId::new();
        let clock = Arc::new(ManualClock::new(START));
        let result = ExchangeLedger::new(
            ExchangeConfig::new(admin).with_fee_pool(admin),
            BalanceBook::new(),
            Arc::new(PriceBoard::new(key("sUSD"), clock.clone())),
            Arc::new(CurrencyRegistry::new(admin, key("sUSD"))),
            Arc::new(FeeSchedule::new(admin)),
            clock,
        );
        assert!(matches!(result, Err(SynthexError::Configuration(_))));
    }
}
