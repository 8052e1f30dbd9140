//! Opening balance rows and carry-forward derivation

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ledger::registry::AccountRegistry;
use crate::ledger::store::MAX_CAS_ATTEMPTS;
use crate::traits::*;
use crate::types::*;

/// A date's opening balance as the engine reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningBalance {
    pub date: NaiveDate,
    pub cash: BigDecimal,
    pub bank_balances: Vec<BankBalance>,
    pub note: Option<String>,
    /// True when an explicit row exists for the date, false when the value
    /// is derived by carry-forward.
    pub explicit: bool,
}

impl OpeningBalance {
    pub fn total(&self) -> BigDecimal {
        let mut total = self.cash.clone();
        for line in &self.bank_balances {
            total += &line.balance;
        }
        total
    }
}

/// The live opening value for `date`: the explicit row when one exists,
/// otherwise the prior day's closing balance.
///
/// Always re-reads storage; an opening corrected after the fact flows into
/// every later derivation.
pub(crate) async fn live_opening<S: BalanceStore>(
    storage: &S,
    date: NaiveDate,
) -> CashbookResult<AccountBalances> {
    if let Some(row) = storage.get_opening_row(date).await? {
        return Ok(row.to_balances());
    }
    carried_closing(storage, date).await
}

/// Closing balance of the day before `date`, rolled forward from the most
/// recent explicit row (or from zero if the ledger has no earlier record).
pub(crate) async fn carried_closing<S: BalanceStore>(
    storage: &S,
    date: NaiveDate,
) -> CashbookResult<AccountBalances> {
    let Some(end) = date.pred_opt() else {
        return Ok(AccountBalances::zero());
    };

    let anchor = storage.latest_opening_row_before(date).await?;
    let (start, mut balances, anchor_date) = match anchor {
        Some(row) => (row.date, row.to_balances(), Some(row.date)),
        None => match storage.earliest_activity_date().await? {
            Some(first) if first <= end => (first, AccountBalances::zero(), None),
            _ => return Ok(AccountBalances::zero()),
        },
    };

    let transactions = storage
        .list_transactions(None, None, Some(start), Some(end))
        .await?;
    for transaction in &transactions {
        // Adjustments on the anchor day are already inside the row value.
        if Some(transaction.date()) == anchor_date && transaction.source.is_opening_adjustment() {
            continue;
        }
        balances.add(&transaction.account, &transaction.amount);
    }

    Ok(balances)
}

/// Manages per-date opening balance rows and the manual add/set
/// adjustments against them.
///
/// An `Add` models income: the amount lands on top of the current value and
/// produces an addition transaction. A `Set` is a correction: the row takes
/// the explicit total, and the audit transaction carries the jump so the
/// per-account chain stays unbroken.
pub struct OpeningBalanceManager<S: BalanceStore> {
    storage: S,
    registry: AccountRegistry<S>,
}

impl<S: BalanceStore + Clone> OpeningBalanceManager<S> {
    pub fn new(storage: S) -> Self {
        Self {
            registry: AccountRegistry::new(storage.clone()),
            storage,
        }
    }

    /// The opening balance for a date: the explicit row, or the prior day's
    /// closing balance when no row exists (all-zero for a ledger with no
    /// earlier record).
    pub async fn opening_balance(&self, date: NaiveDate) -> CashbookResult<OpeningBalance> {
        if let Some(row) = self.storage.get_opening_row(date).await? {
            let balances = row.to_balances();
            return Ok(OpeningBalance {
                date,
                cash: balances.cash.clone(),
                bank_balances: balances.bank_lines(),
                note: row.note,
                explicit: true,
            });
        }

        let balances = carried_closing(&self.storage, date).await?;
        Ok(OpeningBalance {
            date,
            cash: balances.cash.clone(),
            bank_balances: balances.bank_lines(),
            note: None,
            explicit: false,
        })
    }

    /// Apply a manual adjustment to one account's opening balance for a
    /// date, materializing the derived row first when none exists.
    ///
    /// The submitted amount is expected to be validated upstream; a
    /// resulting negative balance is legal (expenses may outrun inflow).
    /// The audit transaction is appended before the row write and carries
    /// the delta against the pre-adjustment value, so the ledger chain
    /// stays the source of truth. Writers for the same date are serialized
    /// by the row version.
    pub async fn apply_adjustment(
        &mut self,
        date: NaiveDate,
        method: &PaymentMethod,
        amount: BigDecimal,
        mode: AdjustmentMode,
        description: Option<String>,
    ) -> CashbookResult<OpeningBalance> {
        let account = self.registry.resolve(method).await?;
        let now = chrono::Utc::now().naive_utc();

        let (mut row, mut expected_version) = match self.storage.get_opening_row(date).await? {
            Some(row) => {
                let version = row.version;
                (row, Some(version))
            }
            None => {
                let base = carried_closing(&self.storage, date).await?;
                let row = OpeningBalanceRow {
                    date,
                    cash_balance: base.cash.clone(),
                    bank_balances: base.banks.clone(),
                    note: None,
                    version: 0,
                    created_at: now,
                    updated_at: now,
                };
                (row, None)
            }
        };

        let old_value = row.balance_for(&account);
        let (new_value, delta) = match mode {
            AdjustmentMode::Add => (&old_value + &amount, amount.clone()),
            AdjustmentMode::Set => (amount.clone(), &amount - &old_value),
        };

        // A set that changes nothing leaves no movement to audit.
        if delta != BigDecimal::from(0) {
            self.append_audit_transaction(&account, date, &old_value, &delta, mode, &description)
                .await?;
        }

        row.set_balance(&account, new_value.clone());
        if description.is_some() {
            row.note = description.clone();
        }
        row.version += 1;
        row.updated_at = now;

        for _attempt in 0..MAX_CAS_ATTEMPTS {
            match self.storage.save_opening_row(&row, expected_version).await {
                Ok(()) => {
                    debug!(%date, account = %account, ?mode, "applied opening balance adjustment");
                    return self.opening_balance(date).await;
                }
                Err(CashbookError::ConcurrentBalanceConflict(_)) => {
                    // Another writer touched the same date. Safe to re-apply
                    // only if our account's basis is untouched (the usual
                    // case: an adjustment against a different account).
                    let fresh = self.storage.get_opening_row(date).await?.ok_or_else(|| {
                        CashbookError::Storage(format!(
                            "opening balance row for {} disappeared during update",
                            date
                        ))
                    })?;
                    if fresh.balance_for(&account) != old_value {
                        return Err(CashbookError::ConcurrentBalanceConflict(format!(
                            "opening balance {} for account {}",
                            date, account
                        )));
                    }
                    warn!(%date, account = %account, "opening row conflicted, re-applying");
                    expected_version = Some(fresh.version);
                    row = fresh;
                    row.set_balance(&account, new_value.clone());
                    if description.is_some() {
                        row.note = description.clone();
                    }
                    row.version += 1;
                    row.updated_at = now;
                }
                Err(err) => return Err(err),
            }
        }

        Err(CashbookError::ConcurrentBalanceConflict(format!(
            "opening balance {}",
            date
        )))
    }

    /// Append the ledger movement that makes an adjustment auditable. The
    /// before-balance is the account's running balance on that day prior to
    /// the row write: the day's last transaction, or the pre-adjustment
    /// opening value.
    async fn append_audit_transaction(
        &mut self,
        account: &AccountRef,
        date: NaiveDate,
        old_value: &BigDecimal,
        delta: &BigDecimal,
        mode: AdjustmentMode,
        description: &Option<String>,
    ) -> CashbookResult<()> {
        let now = chrono::Utc::now().naive_utc();

        for _attempt in 0..MAX_CAS_ATTEMPTS {
            let head = self.storage.head_sequence(account).await?;
            let before_balance = match self.storage.latest_transaction_on(account, date).await? {
                Some(latest) => latest.after_balance,
                None => old_value.clone(),
            };

            let transaction = BalanceTransaction {
                id: Uuid::new_v4(),
                account: *account,
                source: TransactionSource::OpeningBalanceAddition { mode },
                source_id: format!("opening:{}", date),
                amount: delta.clone(),
                after_balance: &before_balance + delta,
                before_balance,
                sequence: head + 1,
                occurred_at: date.and_time(now.time()),
                created_at: now,
                description: description.clone(),
            };

            match self.storage.append_transaction(&transaction, head).await {
                Ok(()) => return Ok(()),
                Err(CashbookError::ConcurrentBalanceConflict(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(CashbookError::ConcurrentBalanceConflict(format!(
            "account {}",
            account
        )))
    }
}
