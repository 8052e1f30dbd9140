//! Daily reconciliation: one day's opening balance, categorized flows, and
//! closing balance

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ledger::opening::live_opening;
use crate::traits::*;
use crate::types::*;

/// Balances across all accounts at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceBreakdown {
    pub cash: BigDecimal,
    pub bank_balances: Vec<BankBalance>,
    pub total: BigDecimal,
}

impl BalanceBreakdown {
    fn from_balances(balances: &AccountBalances) -> Self {
        Self {
            cash: balances.cash.clone(),
            bank_balances: balances.bank_lines(),
            total: balances.total(),
        }
    }
}

/// One manual opening-balance adjustment, as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentLine {
    pub method: PaymentMethod,
    pub mode: AdjustmentMode,
    /// Signed delta as recorded in the ledger.
    pub amount: BigDecimal,
    pub description: Option<String>,
    pub occurred_at: NaiveDateTime,
}

/// One payment line contributing to a day's flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowItem {
    pub record_id: String,
    pub reference: String,
    pub method: PaymentMethod,
    pub amount: BigDecimal,
    pub occurred_at: NaiveDateTime,
}

/// A day's inflow or outflow, split by payment channel.
///
/// A business record with several payments contributes one item per
/// payment; each payment line has its own ledger transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub cash: BigDecimal,
    pub bank_transfer: BigDecimal,
    pub total: BigDecimal,
    pub bank_breakdown: Vec<BankBalance>,
    pub items: Vec<FlowItem>,
}

/// One reconciled calendar day. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub opening_balance: BalanceBreakdown,
    pub opening_adjustments: Vec<AdjustmentLine>,
    pub sales: FlowSummary,
    pub purchases: FlowSummary,
    pub expenses: FlowSummary,
    pub closing_balance: BalanceBreakdown,
}

/// Builds daily reports. Read-only and idempotent: the same historical date
/// yields the same report until its opening balance is explicitly changed.
pub struct DailyReportBuilder<S: BalanceStore, B: BusinessRecords> {
    storage: S,
    records: B,
}

impl<S: BalanceStore, B: BusinessRecords> DailyReportBuilder<S, B> {
    pub fn new(storage: S, records: B) -> Self {
        Self { storage, records }
    }

    /// Reconcile one day: `closing = opening + additions + sales −
    /// purchases − expenses`, per account.
    pub async fn build(&self, date: NaiveDate) -> CashbookResult<DailyReport> {
        let live = live_opening(&self.storage, date).await?;

        let adjustment_transactions = self
            .storage
            .list_transactions(
                None,
                Some(SourceKind::OpeningBalanceAddition),
                Some(date),
                Some(date),
            )
            .await?;

        let mut additions = AccountBalances::zero();
        let mut opening_adjustments = Vec::with_capacity(adjustment_transactions.len());
        for transaction in &adjustment_transactions {
            let TransactionSource::OpeningBalanceAddition { mode } = transaction.source else {
                continue;
            };
            // Only Add lines enter the closing formula; a Set is already
            // embodied in the opening row.
            if mode == AdjustmentMode::Add {
                additions.add(&transaction.account, &transaction.amount);
            }
            opening_adjustments.push(AdjustmentLine {
                method: transaction.payment_method(),
                mode,
                amount: transaction.amount.clone(),
                description: transaction.description.clone(),
                occurred_at: transaction.occurred_at,
            });
        }

        // The reported opening is the value before the day's additions.
        let mut opening = live.clone();
        opening.sub_all(&additions);

        let (sales, sales_flow) = summarize(self.records.sales_between(date, date).await?);
        let (purchases, purchases_flow) =
            summarize(self.records.purchases_between(date, date).await?);
        let (expenses, expenses_flow) = summarize(self.records.expenses_between(date, date).await?);

        let mut closing = opening.clone();
        closing.add_all(&additions);
        closing.add_all(&sales_flow);
        closing.sub_all(&purchases_flow);
        closing.sub_all(&expenses_flow);

        debug!(
            %date,
            sales = %sales.total,
            purchases = %purchases.total,
            expenses = %expenses.total,
            "built daily report"
        );

        Ok(DailyReport {
            date,
            opening_balance: BalanceBreakdown::from_balances(&opening),
            opening_adjustments,
            sales,
            purchases,
            expenses,
            closing_balance: BalanceBreakdown::from_balances(&closing),
        })
    }
}

/// Collapse business records into a flow summary plus the per-account
/// totals used for closing arithmetic. Amounts are positive magnitudes; the
/// record kind supplies the direction.
fn summarize(records: Vec<BusinessRecord>) -> (FlowSummary, AccountBalances) {
    let mut cash = BigDecimal::from(0);
    let mut bank_transfer = BigDecimal::from(0);
    let mut flow = AccountBalances::zero();
    let mut items = Vec::new();

    for record in &records {
        for payment in &record.payments {
            flow.add(&AccountRef::from(&payment.method), &payment.amount);
            match payment.method {
                PaymentMethod::Cash => cash += &payment.amount,
                PaymentMethod::BankTransfer { .. } => bank_transfer += &payment.amount,
            }
            items.push(FlowItem {
                record_id: record.id.clone(),
                reference: record.reference.clone(),
                method: payment.method,
                amount: payment.amount.clone(),
                occurred_at: record.occurred_at,
            });
        }
    }

    let total = &cash + &bank_transfer;
    (
        FlowSummary {
            cash,
            bank_transfer,
            total,
            bank_breakdown: flow.bank_lines(),
            items,
        },
        flow,
    )
}
