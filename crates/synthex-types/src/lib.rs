//! # synthex-types
//!
//! Shared types, errors, and collaborator traits for the **Synthex**
//! deferred-settlement exchange engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Arithmetic**: [`Fixed18`], unsigned fixed point with 18 fractional digits
//! - **Identifiers**: [`UserId`], [`CurrencyKey`], [`EntryId`]
//! - **Entry model**: [`ExchangeEntry`], [`UserDestinationBook`]
//! - **Results**: [`SettlementOwing`], [`ExchangeReceipt`], [`SettlementReceipt`]
//! - **Configuration**: [`ExchangeConfig`]
//! - **Collaborators**: [`PriceOracle`], [`CurrencyClassifier`], [`FeeConfig`],
//!   [`BalanceLedger`], [`Clock`]
//! - **Errors**: [`SynthexError`] with `SX_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod config;
pub mod constants;
pub mod entry;
pub mod error;
pub mod fixed;
pub mod ids;
pub mod receipt;
pub mod traits;

pub use config::*;
pub use entry::*;
pub use error::*;
pub use fixed::*;
pub use ids::*;
pub use receipt::*;
pub use traits::*;

// Constants are accessed via `synthex_types::constants::FOO`.
