//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development.
///
/// Implements both [`BalanceStore`] and [`BusinessRecords`], so one
/// instance can back a whole [`crate::Cashbook`](crate::ledger::Cashbook)
/// in tests. Clones share the same underlying data.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    bank_accounts: Arc<RwLock<HashMap<Uuid, BankAccount>>>,
    transactions: Arc<RwLock<Vec<BalanceTransaction>>>,
    opening_rows: Arc<RwLock<BTreeMap<NaiveDate, OpeningBalanceRow>>>,
    sales: Arc<RwLock<Vec<BusinessRecord>>>,
    purchases: Arc<RwLock<Vec<BusinessRecord>>>,
    expenses: Arc<RwLock<Vec<BusinessRecord>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            bank_accounts: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(Vec::new())),
            opening_rows: Arc::new(RwLock::new(BTreeMap::new())),
            sales: Arc::new(RwLock::new(Vec::new())),
            purchases: Arc::new(RwLock::new(Vec::new())),
            expenses: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.bank_accounts.write().unwrap().clear();
        self.transactions.write().unwrap().clear();
        self.opening_rows.write().unwrap().clear();
        self.sales.write().unwrap().clear();
        self.purchases.write().unwrap().clear();
        self.expenses.write().unwrap().clear();
    }

    /// Insert a bank account directly, standing in for the account CRUD
    /// layer.
    pub fn seed_bank_account(&self, account: BankAccount) {
        self.bank_accounts
            .write()
            .unwrap()
            .insert(account.id, account);
    }

    /// Insert a sale record, standing in for the sale collaborator.
    pub fn seed_sale(&self, record: BusinessRecord) {
        self.sales.write().unwrap().push(record);
    }

    /// Insert a purchase record, standing in for the purchase collaborator.
    pub fn seed_purchase(&self, record: BusinessRecord) {
        self.purchases.write().unwrap().push(record);
    }

    /// Insert an expense record, standing in for the expense collaborator.
    pub fn seed_expense(&self, record: BusinessRecord) {
        self.expenses.write().unwrap().push(record);
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceStore for MemoryStorage {
    async fn get_bank_account(&self, id: Uuid) -> CashbookResult<Option<BankAccount>> {
        Ok(self.bank_accounts.read().unwrap().get(&id).cloned())
    }

    async fn list_bank_accounts(&self) -> CashbookResult<Vec<BankAccount>> {
        Ok(self
            .bank_accounts
            .read()
            .unwrap()
            .values()
            .cloned()
            .collect())
    }

    async fn head_sequence(&self, account: &AccountRef) -> CashbookResult<u64> {
        Ok(self
            .transactions
            .read()
            .unwrap()
            .iter()
            .filter(|t| t.account == *account)
            .map(|t| t.sequence)
            .max()
            .unwrap_or(0))
    }

    async fn append_transaction(
        &mut self,
        transaction: &BalanceTransaction,
        expected_sequence: u64,
    ) -> CashbookResult<()> {
        let mut transactions = self.transactions.write().unwrap();
        // The head check and the push happen under one write lock, which is
        // what makes this an atomic compare-and-append.
        let head = transactions
            .iter()
            .filter(|t| t.account == transaction.account)
            .map(|t| t.sequence)
            .max()
            .unwrap_or(0);
        if head != expected_sequence {
            return Err(CashbookError::ConcurrentBalanceConflict(format!(
                "account {}",
                transaction.account
            )));
        }
        transactions.push(transaction.clone());
        Ok(())
    }

    async fn latest_transaction_on(
        &self,
        account: &AccountRef,
        date: NaiveDate,
    ) -> CashbookResult<Option<BalanceTransaction>> {
        Ok(self
            .transactions
            .read()
            .unwrap()
            .iter()
            .filter(|t| t.account == *account && t.date() == date)
            .max_by_key(|t| t.sequence)
            .cloned())
    }

    async fn list_transactions(
        &self,
        account: Option<&AccountRef>,
        source: Option<SourceKind>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> CashbookResult<Vec<BalanceTransaction>> {
        let transactions = self.transactions.read().unwrap();
        let mut filtered: Vec<BalanceTransaction> = transactions
            .iter()
            .filter(|t| {
                if let Some(account) = account {
                    if t.account != *account {
                        return false;
                    }
                }
                if let Some(source) = source {
                    if t.source.kind() != source {
                        return false;
                    }
                }
                if let Some(start) = start_date {
                    if t.date() < start {
                        return false;
                    }
                }
                if let Some(end) = end_date {
                    if t.date() > end {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        filtered.sort_by_key(|t| (t.occurred_at, t.created_at, t.sequence));
        Ok(filtered)
    }

    async fn get_opening_row(&self, date: NaiveDate) -> CashbookResult<Option<OpeningBalanceRow>> {
        Ok(self.opening_rows.read().unwrap().get(&date).cloned())
    }

    async fn latest_opening_row_before(
        &self,
        date: NaiveDate,
    ) -> CashbookResult<Option<OpeningBalanceRow>> {
        Ok(self
            .opening_rows
            .read()
            .unwrap()
            .range(..date)
            .next_back()
            .map(|(_, row)| row.clone()))
    }

    async fn save_opening_row(
        &mut self,
        row: &OpeningBalanceRow,
        expected_version: Option<u64>,
    ) -> CashbookResult<()> {
        let mut rows = self.opening_rows.write().unwrap();
        let matches = match (rows.get(&row.date), expected_version) {
            (None, None) => true,
            (Some(existing), Some(version)) => existing.version == version,
            _ => false,
        };
        if !matches {
            return Err(CashbookError::ConcurrentBalanceConflict(format!(
                "opening balance {}",
                row.date
            )));
        }
        rows.insert(row.date, row.clone());
        Ok(())
    }

    async fn earliest_activity_date(&self) -> CashbookResult<Option<NaiveDate>> {
        let earliest_transaction = self
            .transactions
            .read()
            .unwrap()
            .iter()
            .map(|t| t.date())
            .min();
        let earliest_row = self.opening_rows.read().unwrap().keys().next().copied();
        Ok(match (earliest_transaction, earliest_row) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        })
    }
}

fn records_between(
    records: &Arc<RwLock<Vec<BusinessRecord>>>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<BusinessRecord> {
    let records = records.read().unwrap();
    let mut filtered: Vec<BusinessRecord> = records
        .iter()
        .filter(|r| {
            let date = r.occurred_at.date();
            date >= start_date && date <= end_date
        })
        .cloned()
        .collect();
    filtered.sort_by_key(|r| r.occurred_at);
    filtered
}

#[async_trait]
impl BusinessRecords for MemoryStorage {
    async fn sales_between(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<Vec<BusinessRecord>> {
        Ok(records_between(&self.sales, start_date, end_date))
    }

    async fn purchases_between(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<Vec<BusinessRecord>> {
        Ok(records_between(&self.purchases, start_date, end_date))
    }

    async fn expenses_between(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<Vec<BusinessRecord>> {
        Ok(records_between(&self.expenses, start_date, end_date))
    }
}
