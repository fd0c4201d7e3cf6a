//! Settlement executor.
//!
//! Translates engine decisions into balance-ledger calls:
//! 1. Exchange: debit source, credit destination, credit the fee pool
//! 2. Settlement: burn the reclaim (capped at the balance), mint the rebate
//!
//! Every balance precondition is checked before the first call into the
//! ledger, so a failed operation leaves all balances untouched.

use synthex_types::{BalanceLedger, CurrencyKey, Fixed18, Result, SettlementOwing, SynthexError, UserId};

/// Balance movements for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeTransfer {
    pub user: UserId,
    pub source_currency: CurrencyKey,
    pub source_amount: Fixed18,
    pub dest_currency: CurrencyKey,
    pub dest_amount: Fixed18,
    pub fee_pool: UserId,
    pub stable_currency: CurrencyKey,
    pub fee_in_stable: Fixed18,
}

/// What a settlement actually moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedSettlement {
    /// Burned from the user; may be less than the reclaim owed.
    pub reclaimed: Fixed18,
    /// Minted to the user.
    pub rebated: Fixed18,
}

impl AppliedSettlement {
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.reclaimed.is_zero() && self.rebated.is_zero()
    }
}

/// Owns the balance ledger and applies exchange and settlement movements.
#[derive(Debug, Default)]
pub struct SettlementExecutor<L> {
    ledger: L,
}

impl<L: BalanceLedger> SettlementExecutor<L> {
    #[must_use]
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// Release the ledger.
    pub fn into_inner(self) -> L {
        self.ledger
    }

    /// Reclaim to burn for `owing`, given the user's current balance.
    #[must_use]
    pub fn capped_reclaim(&self, user: UserId, currency: &CurrencyKey, owing: &SettlementOwing) -> Fixed18 {
        owing
            .reclaim_amount
            .min(self.ledger.balance_of(user, currency))
    }

    /// The user's balance of `currency` once `owing` has been applied.
    pub fn balance_after_settlement(
        &self,
        user: UserId,
        currency: &CurrencyKey,
        owing: &SettlementOwing,
    ) -> Result<Fixed18> {
        let balance = self.ledger.balance_of(user, currency);
        balance
            .saturating_sub(owing.reclaim_amount)
            .checked_add(owing.rebate_amount)
    }

    /// Burn the reclaim (capped at the available balance) and mint the rebate.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if minting the rebate would overflow the balance.
    pub fn apply_settlement(
        &mut self,
        user: UserId,
        currency: &CurrencyKey,
        owing: &SettlementOwing,
    ) -> Result<AppliedSettlement> {
        let reclaimed = self.capped_reclaim(user, currency, owing);
        self.balance_after_settlement(user, currency, owing)?;

        if reclaimed < owing.reclaim_amount {
            tracing::warn!(
                user = %user,
                currency = %currency,
                owed = %owing.reclaim_amount,
                reclaimed = %reclaimed,
                "Reclaim capped at available balance"
            );
        }
        if !reclaimed.is_zero() {
            self.ledger.debit(user, currency, reclaimed)?;
        }
        if !owing.rebate_amount.is_zero() {
            self.ledger.credit(user, currency, owing.rebate_amount)?;
        }
        Ok(AppliedSettlement {
            reclaimed,
            rebated: owing.rebate_amount,
        })
    }

    /// Check every precondition of `transfer` without moving anything.
    ///
    /// With `source_owing`, the source balance is taken as it will stand
    /// once that settlement has been applied.
    ///
    /// # Errors
    /// `InsufficientBalance` if the user cannot cover `source_amount`;
    /// `ArithmeticOverflow` if the rebate or a credit would overflow.
    pub fn check_exchange(
        &self,
        transfer: &ExchangeTransfer,
        source_owing: Option<&SettlementOwing>,
    ) -> Result<()> {
        let available = match source_owing {
            Some(owing) => {
                self.balance_after_settlement(transfer.user, &transfer.source_currency, owing)?
            }
            None => self
                .ledger
                .balance_of(transfer.user, &transfer.source_currency),
        };
        if available < transfer.source_amount {
            return Err(SynthexError::InsufficientBalance {
                currency: transfer.source_currency.clone(),
                needed: transfer.source_amount,
                available,
            });
        }
        let dest_after = self
            .ledger
            .balance_of(transfer.user, &transfer.dest_currency)
            .checked_add(transfer.dest_amount)?;
        // The fee pool may be the trader's own destination balance.
        let pool_before = if transfer.fee_pool == transfer.user
            && transfer.stable_currency == transfer.dest_currency
        {
            dest_after
        } else {
            self.ledger
                .balance_of(transfer.fee_pool, &transfer.stable_currency)
        };
        pool_before.checked_add(transfer.fee_in_stable)?;
        Ok(())
    }

    /// Move balances for one exchange.
    ///
    /// # Errors
    /// Anything [`check_exchange`](Self::check_exchange) reports. Nothing is
    /// moved on error.
    pub fn apply_exchange(&mut self, transfer: &ExchangeTransfer) -> Result<()> {
        self.check_exchange(transfer, None)?;

        self.ledger
            .debit(transfer.user, &transfer.source_currency, transfer.source_amount)?;
        self.ledger
            .credit(transfer.user, &transfer.dest_currency, transfer.dest_amount)?;
        if !transfer.fee_in_stable.is_zero() {
            self.ledger
                .credit(transfer.fee_pool, &transfer.stable_currency, transfer.fee_in_stable)?;
        }
        Ok(())
    }

    /// Move `amount` of `currency` between two users.
    ///
    /// # Errors
    /// `InsufficientBalance` if `from` holds less than `amount`.
    pub fn apply_transfer(
        &mut self,
        from: UserId,
        to: UserId,
        currency: &CurrencyKey,
        amount: Fixed18,
    ) -> Result<()> {
        let available = self.ledger.balance_of(from, currency);
        if available < amount {
            return Err(SynthexError::InsufficientBalance {
                currency: currency.clone(),
                needed: amount,
                available,
            });
        }
        self.ledger.balance_of(to, currency).checked_add(amount)?;
        self.ledger.debit(from, currency, amount)?;
        self.ledger.credit(to, currency, amount)
    }
}
