//! Chronological reconstruction of ledger movements for export and print

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// Whether a timeline row moved money in or out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    Income,
    Expense,
}

/// One row of the human-auditable trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub occurred_at: NaiveDateTime,
    pub direction: FlowDirection,
    /// Business category of the movement: "Sale", "Purchase", etc.
    pub source_label: String,
    pub description: String,
    pub method: PaymentMethod,
    /// Label of the targeted bank account, for transfers.
    pub bank_label: Option<String>,
    pub amount: BigDecimal,
    pub before_balance: BigDecimal,
    pub after_balance: BigDecimal,
}

/// Joins ledger transactions back to their originating business records and
/// orders them chronologically. A pure projection: a transaction whose
/// record is missing still appears, with a generic description.
pub struct TimelineBuilder<S: BalanceStore, B: BusinessRecords> {
    storage: S,
    records: B,
}

impl<S: BalanceStore, B: BusinessRecords> TimelineBuilder<S, B> {
    pub fn new(storage: S, records: B) -> Self {
        Self { storage, records }
    }

    pub async fn build(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<Vec<TimelineEntry>> {
        if start_date > end_date {
            return Err(CashbookError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }

        let transactions = self
            .storage
            .list_transactions(None, None, Some(start_date), Some(end_date))
            .await?;

        let mut join = RecordJoin::default();
        join.absorb(
            SourceKind::SalePayment,
            self.records.sales_between(start_date, end_date).await?,
        );
        join.absorb(
            SourceKind::PurchasePayment,
            self.records.purchases_between(start_date, end_date).await?,
        );
        join.absorb(
            SourceKind::ExpensePayment,
            self.records.expenses_between(start_date, end_date).await?,
        );

        let mut bank_labels: HashMap<Uuid, Option<String>> = HashMap::new();
        let mut entries = Vec::with_capacity(transactions.len());
        for transaction in &transactions {
            let bank_label = match transaction.account {
                AccountRef::Cash => None,
                AccountRef::Bank(id) => {
                    if !bank_labels.contains_key(&id) {
                        let label = self
                            .storage
                            .get_bank_account(id)
                            .await?
                            .map(|account| account.label);
                        bank_labels.insert(id, label);
                    }
                    bank_labels.get(&id).cloned().flatten()
                }
            };

            let description = if transaction.source.is_opening_adjustment() {
                transaction
                    .description
                    .clone()
                    .unwrap_or_else(|| transaction.source.label().to_string())
            } else {
                join.claim(transaction).unwrap_or_else(|| {
                    format!("{} payment {}", transaction.source.label(), transaction.source_id)
                })
            };

            let direction = if transaction.amount >= BigDecimal::from(0) {
                FlowDirection::Income
            } else {
                FlowDirection::Expense
            };

            entries.push(TimelineEntry {
                occurred_at: transaction.occurred_at,
                direction,
                source_label: transaction.source.label().to_string(),
                description,
                method: transaction.payment_method(),
                bank_label,
                amount: transaction.amount.clone(),
                before_balance: transaction.before_balance.clone(),
                after_balance: transaction.after_balance.clone(),
            });
        }

        Ok(entries)
    }
}

/// Correlation state: each `(source kind, record id, account)` key holds a
/// pool of unclaimed payment lines. The first unmatched transaction of a
/// key claims the first unmatched payment, and so on in creation order.
#[derive(Default)]
struct RecordJoin {
    descriptions: HashMap<(SourceKind, String), String>,
    pools: HashMap<(SourceKind, String, AccountRef), usize>,
}

impl RecordJoin {
    fn absorb(&mut self, kind: SourceKind, records: Vec<BusinessRecord>) {
        for record in records {
            let description = record
                .description
                .clone()
                .unwrap_or_else(|| record.reference.clone());
            self.descriptions
                .insert((kind, record.id.clone()), description);
            for payment in &record.payments {
                *self
                    .pools
                    .entry((kind, record.id.clone(), AccountRef::from(&payment.method)))
                    .or_insert(0) += 1;
            }
        }
    }

    /// Claim one payment line for this transaction, returning the record's
    /// description, or `None` when no unclaimed payment matches.
    fn claim(&mut self, transaction: &BalanceTransaction) -> Option<String> {
        let key = (
            transaction.source.kind(),
            transaction.source_id.clone(),
            transaction.account,
        );
        let remaining = self.pools.get_mut(&key)?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        self.descriptions
            .get(&(transaction.source.kind(), transaction.source_id.clone()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::store::TransactionRecorder;
    use crate::utils::memory_storage::MemoryStorage;

    #[tokio::test]
    async fn test_unmatched_transaction_gets_generic_description() {
        let storage = MemoryStorage::new();
        let mut recorder = TransactionRecorder::new(storage.clone());
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        recorder
            .record(
                &PaymentMethod::Cash,
                TransactionSource::SalePayment,
                "sale-orphan".to_string(),
                BigDecimal::from(120),
                date.and_hms_opt(10, 0, 0).unwrap(),
                None,
            )
            .await
            .unwrap();

        let builder = TimelineBuilder::new(storage.clone(), storage);
        let timeline = builder.build(date, date).await.unwrap();

        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].direction, FlowDirection::Income);
        assert!(timeline[0].description.contains("sale-orphan"));
    }
}
