//! Main cashbook orchestrator that coordinates accounts, the transaction
//! ledger, opening balances, and reconciliation

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ledger::opening::{OpeningBalance, OpeningBalanceManager};
use crate::ledger::registry::{AccountDirectory, AccountRegistry};
use crate::ledger::store::TransactionRecorder;
use crate::reconciliation::daily::{DailyReport, DailyReportBuilder};
use crate::reconciliation::range::{DateRangeReport, RangeReportBuilder};
use crate::reconciliation::timeline::{TimelineBuilder, TimelineEntry};
use crate::traits::*;
use crate::types::*;

/// Main entry point tying the ledger components together.
///
/// `S` supplies ledger storage, `B` supplies the sale/purchase/expense
/// records owned by the recording collaborators. Reporting methods are pure
/// reads; only [`record_payment`](Cashbook::record_payment) and
/// [`apply_opening_adjustment`](Cashbook::apply_opening_adjustment) write.
pub struct Cashbook<S: BalanceStore, B: BusinessRecords> {
    storage: S,
    registry: AccountRegistry<S>,
    recorder: TransactionRecorder<S>,
    opening: OpeningBalanceManager<S>,
    daily: DailyReportBuilder<S, B>,
    range: RangeReportBuilder<S, B>,
    timeline: TimelineBuilder<S, B>,
}

impl<S: BalanceStore + Clone, B: BusinessRecords + Clone> Cashbook<S, B> {
    /// Create a new cashbook over the given storage and record source.
    pub fn new(storage: S, records: B) -> Self {
        Self {
            registry: AccountRegistry::new(storage.clone()),
            recorder: TransactionRecorder::new(storage.clone()),
            opening: OpeningBalanceManager::new(storage.clone()),
            daily: DailyReportBuilder::new(storage.clone(), records.clone()),
            range: RangeReportBuilder::new(storage.clone(), records.clone()),
            timeline: TimelineBuilder::new(storage.clone(), records),
            storage,
        }
    }

    /// Create a cashbook with a custom movement validator.
    pub fn with_validator(storage: S, records: B, validator: Box<dyn MovementValidator>) -> Self {
        Self {
            registry: AccountRegistry::new(storage.clone()),
            recorder: TransactionRecorder::with_validator(storage.clone(), validator),
            opening: OpeningBalanceManager::new(storage.clone()),
            daily: DailyReportBuilder::new(storage.clone(), records.clone()),
            range: RangeReportBuilder::new(storage.clone(), records.clone()),
            timeline: TimelineBuilder::new(storage.clone(), records),
            storage,
        }
    }

    // Account operations
    /// Every place money can be held.
    pub async fn directory(&self) -> CashbookResult<AccountDirectory> {
        self.registry.directory().await
    }

    /// Resolve a payment method to the account it targets.
    pub async fn resolve_account(&self, method: &PaymentMethod) -> CashbookResult<AccountRef> {
        self.registry.resolve(method).await
    }

    /// The unique default among active bank accounts, if any.
    pub async fn default_bank_account(&self) -> CashbookResult<Option<BankAccount>> {
        self.registry.default_bank_account().await
    }

    // Ledger operations
    /// Record one payment movement against the ledger. Called once per
    /// payment line when a sale, purchase, or expense is persisted.
    pub async fn record_payment(
        &mut self,
        method: &PaymentMethod,
        source: TransactionSource,
        source_id: String,
        amount: BigDecimal,
        occurred_at: NaiveDateTime,
        description: Option<String>,
    ) -> CashbookResult<BalanceTransaction> {
        self.recorder
            .record(method, source, source_id, amount, occurred_at, description)
            .await
    }

    /// List ledger transactions ordered by `(occurred_at, sequence)`.
    pub async fn transactions(
        &self,
        account: Option<&AccountRef>,
        source: Option<SourceKind>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> CashbookResult<Vec<BalanceTransaction>> {
        self.recorder
            .list(account, source, start_date, end_date)
            .await
    }

    // Opening balance operations
    /// The opening balance for a date, explicit or derived.
    pub async fn opening_balance(&self, date: NaiveDate) -> CashbookResult<OpeningBalance> {
        self.opening.opening_balance(date).await
    }

    /// Manually adjust one account's opening balance for a date.
    pub async fn apply_opening_adjustment(
        &mut self,
        date: NaiveDate,
        method: &PaymentMethod,
        amount: BigDecimal,
        mode: AdjustmentMode,
        description: Option<String>,
    ) -> CashbookResult<OpeningBalance> {
        self.opening
            .apply_adjustment(date, method, amount, mode, description)
            .await
    }

    // Reconciliation operations
    /// Reconcile one calendar day.
    pub async fn daily_report(&self, date: NaiveDate) -> CashbookResult<DailyReport> {
        self.daily.build(date).await
    }

    /// Reconcile an inclusive date range.
    pub async fn range_report(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<DateRangeReport> {
        self.range.build(start_date, end_date).await
    }

    /// Chronological, human-auditable trail of every movement in range.
    pub async fn timeline(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<Vec<TimelineEntry>> {
        self.timeline.build(start_date, end_date).await
    }

    /// Verify the ledger's internal consistency over a range: every
    /// transaction must satisfy `after == before + amount`, and consecutive
    /// transactions of one account must hand the balance over exactly.
    pub async fn audit_ledger(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> CashbookResult<LedgerAudit> {
        let transactions = self
            .storage
            .list_transactions(None, None, start_date, end_date)
            .await?;

        let mut by_account: BTreeMap<AccountRef, Vec<&BalanceTransaction>> = BTreeMap::new();
        for transaction in &transactions {
            by_account
                .entry(transaction.account)
                .or_default()
                .push(transaction);
        }

        let mut issues = Vec::new();
        for (account, mut chain) in by_account.clone() {
            chain.sort_by_key(|t| t.sequence);

            for transaction in &chain {
                let expected = &transaction.before_balance + &transaction.amount;
                if transaction.after_balance != expected {
                    issues.push(format!(
                        "account {}: transaction {} after-balance {} != before {} + amount {}",
                        account,
                        transaction.id,
                        transaction.after_balance,
                        transaction.before_balance,
                        transaction.amount
                    ));
                }
            }

            for pair in chain.windows(2) {
                // A sequence gap means the predecessor is outside the
                // audited range; only adjacent appends must hand over.
                if pair[1].sequence == pair[0].sequence + 1
                    && pair[1].before_balance != pair[0].after_balance
                {
                    issues.push(format!(
                        "account {}: transaction {} before-balance {} != predecessor after-balance {}",
                        account, pair[1].id, pair[1].before_balance, pair[0].after_balance
                    ));
                }
            }
        }

        Ok(LedgerAudit {
            start_date,
            end_date,
            accounts_checked: by_account.len(),
            transactions_checked: transactions.len(),
            is_consistent: issues.is_empty(),
            issues,
        })
    }
}

/// Result of a ledger consistency audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAudit {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub accounts_checked: usize,
    pub transactions_checked: usize,
    pub is_consistent: bool,
    pub issues: Vec<String>,
}
