//! # Cashbook Core
//!
//! A balance ledger and daily reconciliation engine for retail back
//! offices: tracks how much cash and how much money in each bank account
//! the business holds as sales, purchases, expenses, and manual corrections
//! move money around.
//!
//! ## Features
//!
//! - **Append-only ledger**: every movement carries its own before/after
//!   balance, so history replays exactly and is never edited
//! - **Opening balances**: per-day rows with carry-forward derivation and
//!   manual add/set adjustments
//! - **Daily reconciliation**: opening + additions + sales − purchases −
//!   expenses = closing, per account
//! - **Range reports**: summed flow totals with point-in-time balances
//! - **Chronological trail**: ledger entries joined back to their
//!   originating sales, purchases, and expenses
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use cashbook_core::utils::MemoryStorage;
//! use cashbook_core::{AdjustmentMode, Cashbook, PaymentMethod};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # async fn demo() -> cashbook_core::CashbookResult<()> {
//! let storage = MemoryStorage::new();
//! let mut cashbook = Cashbook::new(storage.clone(), storage);
//!
//! let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! cashbook
//!     .apply_opening_adjustment(
//!         today,
//!         &PaymentMethod::Cash,
//!         BigDecimal::from(1000),
//!         AdjustmentMode::Set,
//!         Some("Till count".to_string()),
//!     )
//!     .await?;
//! let report = cashbook.daily_report(today).await?;
//! assert_eq!(report.closing_balance.cash, BigDecimal::from(1000));
//! # Ok(())
//! # }
//! ```

pub mod ledger;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use ledger::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
