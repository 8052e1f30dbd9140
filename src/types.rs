//! Core types and data structures for the balance ledger

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// How a payment moves money, and through which channel.
///
/// A bank transfer always names its account, so a transfer without a target
/// is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer { bank_account_id: Uuid },
}

impl PaymentMethod {
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

/// A place money is held: the till, or one bank account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRef {
    Cash,
    Bank(Uuid),
}

impl AccountRef {
    /// The payment channel that targets this account.
    pub fn payment_method(&self) -> PaymentMethod {
        match self {
            AccountRef::Cash => PaymentMethod::Cash,
            AccountRef::Bank(id) => PaymentMethod::BankTransfer {
                bank_account_id: *id,
            },
        }
    }
}

impl From<&PaymentMethod> for AccountRef {
    fn from(method: &PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => AccountRef::Cash,
            PaymentMethod::BankTransfer { bank_account_id } => AccountRef::Bank(*bank_account_id),
        }
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRef::Cash => write!(f, "cash"),
            AccountRef::Bank(id) => write!(f, "bank:{}", id),
        }
    }
}

/// Whether a manual opening-balance adjustment adds to the derived value or
/// replaces it outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentMode {
    /// Add an amount on top of the derived opening balance. Modeled as income.
    Add,
    /// Replace the opening balance with an explicit total. A correction; the
    /// balance may jump discontinuously.
    Set,
}

/// The business event a balance transaction originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TransactionSource {
    SalePayment,
    PurchasePayment,
    ExpensePayment,
    OpeningBalanceAddition { mode: AdjustmentMode },
}

impl TransactionSource {
    /// Source discriminant without any payload, for filtering.
    pub fn kind(&self) -> SourceKind {
        match self {
            TransactionSource::SalePayment => SourceKind::SalePayment,
            TransactionSource::PurchasePayment => SourceKind::PurchasePayment,
            TransactionSource::ExpensePayment => SourceKind::ExpensePayment,
            TransactionSource::OpeningBalanceAddition { .. } => SourceKind::OpeningBalanceAddition,
        }
    }

    pub fn is_opening_adjustment(&self) -> bool {
        matches!(self, TransactionSource::OpeningBalanceAddition { .. })
    }

    /// Human-readable label for timelines and exports.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionSource::SalePayment => "Sale",
            TransactionSource::PurchasePayment => "Purchase",
            TransactionSource::ExpensePayment => "Expense",
            TransactionSource::OpeningBalanceAddition {
                mode: AdjustmentMode::Add,
            } => "Opening balance addition",
            TransactionSource::OpeningBalanceAddition {
                mode: AdjustmentMode::Set,
            } => "Opening balance correction",
        }
    }
}

/// Filterable source discriminant, payload-free counterpart of
/// [`TransactionSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    SalePayment,
    PurchasePayment,
    ExpensePayment,
    OpeningBalanceAddition,
}

/// A bank account the business holds money in.
///
/// Bank accounts are created and edited by the account-management layer; the
/// ledger only consumes their identity and flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Uuid,
    pub bank_name: String,
    pub account_number: String,
    /// Human-readable label shown in reports.
    pub label: String,
    /// Exactly one active account may be the default at a time.
    pub is_default: bool,
    /// Inactive accounts may not receive new transactions.
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BankAccount {
    pub fn new(bank_name: String, account_number: String, label: String) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            bank_name,
            account_number,
            label,
            is_default: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One atomic, signed movement of money against exactly one account.
///
/// Transactions are append-only: they are never mutated or deleted after
/// creation. Corrections are recorded as new transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceTransaction {
    pub id: Uuid,
    /// The account this movement is charged against.
    pub account: AccountRef,
    pub source: TransactionSource,
    /// Identifier of the originating sale/purchase/expense/adjustment record.
    pub source_id: String,
    /// Signed amount: positive for inflow, negative for outflow.
    pub amount: BigDecimal,
    /// The account's balance immediately before this transaction.
    pub before_balance: BigDecimal,
    /// The account's balance immediately after; always `before + amount`.
    pub after_balance: BigDecimal,
    /// Per-account monotonic sequence number; breaks `created_at` ties.
    pub sequence: u64,
    /// Business timestamp; determines which calendar day the movement
    /// belongs to.
    pub occurred_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub description: Option<String>,
}

impl BalanceTransaction {
    /// The calendar day this movement belongs to.
    pub fn date(&self) -> NaiveDate {
        self.occurred_at.date()
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.account.payment_method()
    }
}

/// Persisted opening balance for one calendar date.
///
/// Holds the date's opening balance as currently known: the carried-forward
/// base plus any explicit add/set adjustments applied so far. The `version`
/// field serializes concurrent writers per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningBalanceRow {
    pub date: NaiveDate,
    pub cash_balance: BigDecimal,
    pub bank_balances: BTreeMap<Uuid, BigDecimal>,
    pub note: Option<String>,
    pub version: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl OpeningBalanceRow {
    pub fn balance_for(&self, account: &AccountRef) -> BigDecimal {
        match account {
            AccountRef::Cash => self.cash_balance.clone(),
            AccountRef::Bank(id) => self
                .bank_balances
                .get(id)
                .cloned()
                .unwrap_or_else(|| BigDecimal::from(0)),
        }
    }

    pub fn set_balance(&mut self, account: &AccountRef, balance: BigDecimal) {
        match account {
            AccountRef::Cash => self.cash_balance = balance,
            AccountRef::Bank(id) => {
                self.bank_balances.insert(*id, balance);
            }
        }
    }

    pub fn to_balances(&self) -> AccountBalances {
        AccountBalances {
            cash: self.cash_balance.clone(),
            banks: self.bank_balances.clone(),
        }
    }
}

/// Working set of balances across all accounts (cash plus every bank).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub cash: BigDecimal,
    pub banks: BTreeMap<Uuid, BigDecimal>,
}

impl AccountBalances {
    pub fn zero() -> Self {
        Self {
            cash: BigDecimal::from(0),
            banks: BTreeMap::new(),
        }
    }

    pub fn get(&self, account: &AccountRef) -> BigDecimal {
        match account {
            AccountRef::Cash => self.cash.clone(),
            AccountRef::Bank(id) => self
                .banks
                .get(id)
                .cloned()
                .unwrap_or_else(|| BigDecimal::from(0)),
        }
    }

    pub fn add(&mut self, account: &AccountRef, amount: &BigDecimal) {
        match account {
            AccountRef::Cash => self.cash += amount,
            AccountRef::Bank(id) => {
                let entry = self
                    .banks
                    .entry(*id)
                    .or_insert_with(|| BigDecimal::from(0));
                *entry += amount;
            }
        }
    }

    pub fn add_all(&mut self, other: &AccountBalances) {
        self.cash += &other.cash;
        for (id, amount) in &other.banks {
            self.add(&AccountRef::Bank(*id), amount);
        }
    }

    pub fn sub_all(&mut self, other: &AccountBalances) {
        self.cash -= &other.cash;
        for (id, amount) in &other.banks {
            self.add(&AccountRef::Bank(*id), &(-amount));
        }
    }

    /// Cash plus every bank balance.
    pub fn total(&self) -> BigDecimal {
        let mut total = self.cash.clone();
        for balance in self.banks.values() {
            total += balance;
        }
        total
    }

    /// Per-bank lines, ordered by account id for stable output.
    pub fn bank_lines(&self) -> Vec<BankBalance> {
        self.banks
            .iter()
            .map(|(id, balance)| BankBalance {
                bank_account_id: *id,
                balance: balance.clone(),
            })
            .collect()
    }
}

impl Default for AccountBalances {
    fn default() -> Self {
        Self::zero()
    }
}

/// One bank account's balance, as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankBalance {
    pub bank_account_id: Uuid,
    pub balance: BigDecimal,
}

/// One payment against a business record. A record with several payments
/// contributes one line per payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLine {
    pub method: PaymentMethod,
    /// Positive magnitude; the direction comes from the record kind.
    pub amount: BigDecimal,
}

/// A sale, purchase, or expense as the recording collaborators own it.
///
/// The ledger does not persist these; it reads them back for reconciliation
/// and for joining ledger entries to their origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub id: String,
    /// Invoice or voucher number shown on exports.
    pub reference: String,
    pub description: Option<String>,
    pub occurred_at: NaiveDateTime,
    pub payments: Vec<PaymentLine>,
}

impl BusinessRecord {
    pub fn total(&self) -> BigDecimal {
        self.payments.iter().map(|p| &p.amount).sum()
    }
}

/// Errors that can occur in the balance ledger.
#[derive(Debug, thiserror::Error)]
pub enum CashbookError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid account reference: {0}")]
    InvalidAccountReference(String),
    #[error("Bank account {0} is inactive")]
    AccountInactive(Uuid),
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("Concurrent balance update conflict: {0}")]
    ConcurrentBalanceConflict(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for ledger operations.
pub type CashbookResult<T> = Result<T, CashbookError>;
