//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for the balance ledger.
///
/// This trait allows the engine to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these
/// methods. Two contracts matter beyond plain CRUD:
///
/// - [`append_transaction`](BalanceStore::append_transaction) must reject an
///   append whose `expected_sequence` no longer matches the account's head,
///   with [`CashbookError::ConcurrentBalanceConflict`]. This is the
///   serialization point that keeps two concurrent payments from computing
///   the same before-balance.
/// - [`save_opening_row`](BalanceStore::save_opening_row) must apply the
///   same check against the row's `version`.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Get a bank account by id.
    async fn get_bank_account(&self, id: Uuid) -> CashbookResult<Option<BankAccount>>;

    /// List all bank accounts, active and inactive.
    async fn list_bank_accounts(&self) -> CashbookResult<Vec<BankAccount>>;

    /// Sequence number of the account's most recent transaction, 0 if none.
    async fn head_sequence(&self, account: &AccountRef) -> CashbookResult<u64>;

    /// Append a transaction, provided the account's head sequence still
    /// equals `expected_sequence`.
    async fn append_transaction(
        &mut self,
        transaction: &BalanceTransaction,
        expected_sequence: u64,
    ) -> CashbookResult<()>;

    /// The account's most recent transaction on the given calendar day.
    async fn latest_transaction_on(
        &self,
        account: &AccountRef,
        date: NaiveDate,
    ) -> CashbookResult<Option<BalanceTransaction>>;

    /// List transactions, optionally filtered by account, source kind, and
    /// inclusive date range, ordered by `(occurred_at, sequence)` ascending.
    async fn list_transactions(
        &self,
        account: Option<&AccountRef>,
        source: Option<SourceKind>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> CashbookResult<Vec<BalanceTransaction>>;

    /// Get the explicit opening balance row for a date, if one exists.
    async fn get_opening_row(&self, date: NaiveDate) -> CashbookResult<Option<OpeningBalanceRow>>;

    /// The most recent explicit opening balance row strictly before `date`.
    async fn latest_opening_row_before(
        &self,
        date: NaiveDate,
    ) -> CashbookResult<Option<OpeningBalanceRow>>;

    /// Create or replace an opening balance row.
    ///
    /// `expected_version` of `None` means the row must not exist yet; a
    /// mismatch either way is a [`CashbookError::ConcurrentBalanceConflict`].
    async fn save_opening_row(
        &mut self,
        row: &OpeningBalanceRow,
        expected_version: Option<u64>,
    ) -> CashbookResult<()>;

    /// The earliest date with any ledger activity (row or transaction).
    /// Bounds carry-forward derivation.
    async fn earliest_activity_date(&self) -> CashbookResult<Option<NaiveDate>>;
}

/// Read access to the business records owned by the sale/purchase/expense
/// collaborators.
///
/// Reconciliation needs the originating records, not just the ledger, so a
/// record with several payment lines contributes one reconciliation line per
/// payment.
#[async_trait]
pub trait BusinessRecords: Send + Sync {
    /// Sales within the inclusive date range, ordered by `occurred_at`.
    async fn sales_between(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<Vec<BusinessRecord>>;

    /// Purchases within the inclusive date range, ordered by `occurred_at`.
    async fn purchases_between(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<Vec<BusinessRecord>>;

    /// Expenses within the inclusive date range, ordered by `occurred_at`.
    async fn expenses_between(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<Vec<BusinessRecord>>;
}

/// Trait for implementing custom movement validation rules.
pub trait MovementValidator: Send + Sync {
    /// Validate a movement before it is written to the ledger.
    fn validate_movement(
        &self,
        source: &TransactionSource,
        amount: &BigDecimal,
        description: Option<&str>,
    ) -> CashbookResult<()>;
}

/// Default movement validator: amounts must be non-zero.
pub struct DefaultMovementValidator;

impl MovementValidator for DefaultMovementValidator {
    fn validate_movement(
        &self,
        _source: &TransactionSource,
        amount: &BigDecimal,
        _description: Option<&str>,
    ) -> CashbookResult<()> {
        if *amount == BigDecimal::from(0) {
            return Err(CashbookError::Validation(
                "Transaction amount must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
