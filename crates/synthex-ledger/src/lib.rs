//! # synthex-ledger
//!
//! **Collaborator plane**: in-memory implementations of everything the
//! exchange engine reads from or writes to outside its own books.
//!
//! ## Components
//!
//! 1. **BalanceBook**: per-(user, currency) balances with mint/burn supply tracking
//! 2. **PriceBoard**: posted prices with a staleness window
//! 3. **CurrencyRegistry**: admin-managed long/inverse/stable classification
//! 4. **FeeSchedule**: admin-settable base exchange fee
//! 5. **SystemClock / ManualClock**: wall clock and a test clock
//!
//! ## Wiring
//!
//! ```text
//! PriceBoard ───────┐
//! CurrencyRegistry ─┤
//! FeeSchedule ──────┼──► ExchangeLedger<BalanceBook>
//! Clock ────────────┘
//! ```

pub mod balance_book;
pub mod clock;
pub mod fee_schedule;
pub mod price_board;
pub mod registry;
pub mod supply_conservation;

pub use balance_book::BalanceBook;
pub use clock::{ManualClock, SystemClock};
pub use fee_schedule::FeeSchedule;
pub use price_board::PriceBoard;
pub use registry::CurrencyRegistry;
pub use supply_conservation::SupplyConservation;
