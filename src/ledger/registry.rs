//! Account registry: lookup layer over externally managed accounts

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// The fixed cash account plus the dynamic set of bank accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDirectory {
    /// Bank accounts as managed by the account CRUD layer, active and
    /// inactive. The cash account always exists and carries no record.
    pub bank_accounts: Vec<BankAccount>,
}

impl AccountDirectory {
    pub fn active_bank_accounts(&self) -> Vec<&BankAccount> {
        self.bank_accounts.iter().filter(|a| a.is_active).collect()
    }

    /// Every account as a ledger key: cash first, then each bank account.
    pub fn account_refs(&self) -> Vec<AccountRef> {
        std::iter::once(AccountRef::Cash)
            .chain(self.bank_accounts.iter().map(|a| AccountRef::Bank(a.id)))
            .collect()
    }
}

/// Resolves payment methods to ledger accounts.
///
/// Purely a lookup layer; bank accounts are created and edited elsewhere.
pub struct AccountRegistry<S: BalanceStore> {
    pub(crate) storage: S,
}

impl<S: BalanceStore> AccountRegistry<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Every place money can be held.
    pub async fn directory(&self) -> CashbookResult<AccountDirectory> {
        let mut bank_accounts = self.storage.list_bank_accounts().await?;
        bank_accounts.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(AccountDirectory { bank_accounts })
    }

    /// Resolve a payment method to the account it targets.
    ///
    /// Fails with [`CashbookError::InvalidAccountReference`] when a transfer
    /// names an unknown bank account, and
    /// [`CashbookError::AccountInactive`] when the account is disabled.
    pub async fn resolve(&self, method: &PaymentMethod) -> CashbookResult<AccountRef> {
        match method {
            PaymentMethod::Cash => Ok(AccountRef::Cash),
            PaymentMethod::BankTransfer { bank_account_id } => {
                let account = self
                    .storage
                    .get_bank_account(*bank_account_id)
                    .await?
                    .ok_or_else(|| {
                        CashbookError::InvalidAccountReference(format!(
                            "unknown bank account {}",
                            bank_account_id
                        ))
                    })?;

                if !account.is_active {
                    return Err(CashbookError::AccountInactive(account.id));
                }

                Ok(AccountRef::Bank(account.id))
            }
        }
    }

    /// Get a bank account by id without resolving a payment.
    pub async fn bank_account(&self, id: Uuid) -> CashbookResult<Option<BankAccount>> {
        self.storage.get_bank_account(id).await
    }

    /// The unique default among active bank accounts, if any.
    pub async fn default_bank_account(&self) -> CashbookResult<Option<BankAccount>> {
        let accounts = self.storage.list_bank_accounts().await?;
        Ok(accounts
            .into_iter()
            .find(|a| a.is_active && a.is_default))
    }
}
