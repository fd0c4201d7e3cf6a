//! # synthex-exchanger
//!
//! **Exchange core**: fee policy, per-(user, destination) exchange books,
//! waiting-period gating, and reclaim/rebate settlement.
//!
//! ## Architecture
//!
//! 1. **FeePolicy**: effective fee rate per currency pair (inverse vs long pays double)
//! 2. **ExchangeLedger**: the state machine; records entries and computes owing
//! 3. **WindowState**: empty / pending / elapsed, derived from timestamps
//! 4. **SettlementExecutor**: applies exchange and settlement movements to the
//!    balance ledger
//!
//! ## Lifecycle of an entry
//!
//! ```text
//! exchange() ──► entry appended ──► pending (reclaim/rebate tracked)
//!                                      │
//!                      window elapses  │  settle() / exchange out / transfer
//!                                      ▼
//!                                 book cleared
//! ```

pub mod exchange_ledger;
pub mod fee_policy;
pub mod settlement;
pub mod waiting_period;

pub use exchange_ledger::ExchangeLedger;
pub use fee_policy::FeePolicy;
pub use settlement::{AppliedSettlement, ExchangeTransfer, SettlementExecutor};
pub use waiting_period::WindowState;
