//! Append-only balance transaction recording

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ledger::opening;
use crate::ledger::registry::AccountRegistry;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_source_id;

/// How many times a conflicted write is retried with a re-read balance
/// before giving up.
pub(crate) const MAX_CAS_ATTEMPTS: usize = 5;

/// Records signed balance movements against the ledger.
///
/// "Read current balance, then append" must behave as one unit per account:
/// every append carries the account's expected head sequence, the storage
/// rejects stale appends, and the recorder re-reads and retries. Two
/// different accounts never contend.
pub struct TransactionRecorder<S: BalanceStore> {
    storage: S,
    registry: AccountRegistry<S>,
    validator: Box<dyn MovementValidator>,
}

impl<S: BalanceStore + Clone> TransactionRecorder<S> {
    pub fn new(storage: S) -> Self {
        Self {
            registry: AccountRegistry::new(storage.clone()),
            storage,
            validator: Box::new(DefaultMovementValidator),
        }
    }

    pub fn with_validator(storage: S, validator: Box<dyn MovementValidator>) -> Self {
        Self {
            registry: AccountRegistry::new(storage.clone()),
            storage,
            validator,
        }
    }

    /// Append one movement to the ledger.
    ///
    /// `amount` is signed: positive for inflow (sale, addition), negative
    /// for outflow (purchase, expense). The before-balance is the
    /// after-balance of the account's most recent transaction on the same
    /// day, or the day's opening balance when the movement is the first of
    /// the day.
    pub async fn record(
        &mut self,
        method: &PaymentMethod,
        source: TransactionSource,
        source_id: String,
        amount: BigDecimal,
        occurred_at: NaiveDateTime,
        description: Option<String>,
    ) -> CashbookResult<BalanceTransaction> {
        validate_source_id(&source_id)?;
        self.validator
            .validate_movement(&source, &amount, description.as_deref())?;
        let account = self.registry.resolve(method).await?;
        let date = occurred_at.date();

        for attempt in 0..MAX_CAS_ATTEMPTS {
            let head = self.storage.head_sequence(&account).await?;
            let before_balance = match self.storage.latest_transaction_on(&account, date).await? {
                Some(latest) => latest.after_balance,
                None => opening::live_opening(&self.storage, date).await?.get(&account),
            };
            let after_balance = &before_balance + &amount;

            let transaction = BalanceTransaction {
                id: Uuid::new_v4(),
                account,
                source,
                source_id: source_id.clone(),
                amount: amount.clone(),
                before_balance,
                after_balance,
                sequence: head + 1,
                occurred_at,
                created_at: chrono::Utc::now().naive_utc(),
                description: description.clone(),
            };

            match self.storage.append_transaction(&transaction, head).await {
                Ok(()) => {
                    debug!(
                        account = %account,
                        amount = %transaction.amount,
                        sequence = transaction.sequence,
                        "appended balance transaction"
                    );
                    return Ok(transaction);
                }
                Err(CashbookError::ConcurrentBalanceConflict(_)) => {
                    warn!(
                        account = %account,
                        attempt,
                        "balance append conflicted, re-reading"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        Err(CashbookError::ConcurrentBalanceConflict(format!(
            "account {}",
            account
        )))
    }

    /// List ledger transactions ordered by `(occurred_at, sequence)`.
    pub async fn list(
        &self,
        account: Option<&AccountRef>,
        source: Option<SourceKind>,
        start_date: Option<chrono::NaiveDate>,
        end_date: Option<chrono::NaiveDate>,
    ) -> CashbookResult<Vec<BalanceTransaction>> {
        self.storage
            .list_transactions(account, source, start_date, end_date)
            .await
    }
}
