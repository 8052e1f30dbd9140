//! Integration tests for cashbook-core

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use cashbook_core::utils::{MemoryStorage, StrictMovementValidator};
use cashbook_core::{
    AdjustmentMode, BankAccount, BusinessRecord, Cashbook, CashbookError, FlowDirection,
    PaymentLine, PaymentMethod, TransactionSource,
};

type TestCashbook = Cashbook<MemoryStorage, MemoryStorage>;

fn cashbook() -> (TestCashbook, MemoryStorage) {
    let storage = MemoryStorage::new();
    (Cashbook::new(storage.clone(), storage.clone()), storage)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(day: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    day.and_hms_opt(hour, minute, 0).unwrap()
}

/// Persist a business record the way the recording collaborators do: the
/// record itself plus one ledger movement per payment line.
async fn record_business_event(
    cashbook: &mut TestCashbook,
    storage: &MemoryStorage,
    source: TransactionSource,
    id: &str,
    reference: &str,
    occurred_at: NaiveDateTime,
    payments: Vec<PaymentLine>,
) {
    let record = BusinessRecord {
        id: id.to_string(),
        reference: reference.to_string(),
        description: Some(reference.to_string()),
        occurred_at,
        payments: payments.clone(),
    };
    match source {
        TransactionSource::SalePayment => storage.seed_sale(record),
        TransactionSource::PurchasePayment => storage.seed_purchase(record),
        TransactionSource::ExpensePayment => storage.seed_expense(record),
        TransactionSource::OpeningBalanceAddition { .. } => {
            panic!("adjustments go through apply_opening_adjustment")
        }
    }

    for payment in payments {
        let signed = match source {
            TransactionSource::SalePayment => payment.amount.clone(),
            _ => -payment.amount.clone(),
        };
        cashbook
            .record_payment(
                &payment.method,
                source,
                id.to_string(),
                signed,
                occurred_at,
                Some(reference.to_string()),
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_cash_sale_raises_closing_balance() {
    let (mut cashbook, storage) = cashbook();
    let day = date(2024, 1, 1);

    cashbook
        .apply_opening_adjustment(
            day,
            &PaymentMethod::Cash,
            BigDecimal::from(1000),
            AdjustmentMode::Set,
            None,
        )
        .await
        .unwrap();

    record_business_event(
        &mut cashbook,
        &storage,
        TransactionSource::SalePayment,
        "sale-1",
        "INV-001",
        at(day, 10, 15),
        vec![PaymentLine {
            method: PaymentMethod::Cash,
            amount: BigDecimal::from(500),
        }],
    )
    .await;

    let report = cashbook.daily_report(day).await.unwrap();
    assert_eq!(report.opening_balance.cash, BigDecimal::from(1000));
    assert_eq!(report.sales.cash, BigDecimal::from(500));
    assert_eq!(report.closing_balance.cash, BigDecimal::from(1500));
}

#[tokio::test]
async fn test_closing_carries_forward_without_explicit_row() {
    let (mut cashbook, storage) = cashbook();
    let day1 = date(2024, 1, 1);
    let day2 = date(2024, 1, 2);

    cashbook
        .apply_opening_adjustment(
            day1,
            &PaymentMethod::Cash,
            BigDecimal::from(1000),
            AdjustmentMode::Set,
            None,
        )
        .await
        .unwrap();
    record_business_event(
        &mut cashbook,
        &storage,
        TransactionSource::SalePayment,
        "sale-1",
        "INV-001",
        at(day1, 10, 0),
        vec![PaymentLine {
            method: PaymentMethod::Cash,
            amount: BigDecimal::from(500),
        }],
    )
    .await;

    let opening = cashbook.opening_balance(day2).await.unwrap();
    assert_eq!(opening.cash, BigDecimal::from(1500));
    assert!(!opening.explicit);

    let report = cashbook.daily_report(day2).await.unwrap();
    assert_eq!(report.opening_balance.cash, BigDecimal::from(1500));
    assert_eq!(report.closing_balance.cash, BigDecimal::from(1500));
}

#[tokio::test]
async fn test_set_overrides_derived_opening_with_audit_trail() {
    let (mut cashbook, storage) = cashbook();
    let day1 = date(2024, 1, 1);
    let day2 = date(2024, 1, 2);

    cashbook
        .apply_opening_adjustment(
            day1,
            &PaymentMethod::Cash,
            BigDecimal::from(1000),
            AdjustmentMode::Set,
            None,
        )
        .await
        .unwrap();
    record_business_event(
        &mut cashbook,
        &storage,
        TransactionSource::SalePayment,
        "sale-1",
        "INV-001",
        at(day1, 10, 0),
        vec![PaymentLine {
            method: PaymentMethod::Cash,
            amount: BigDecimal::from(500),
        }],
    )
    .await;

    // Day 2 derives 1500; the recount says 2000.
    let opening = cashbook
        .apply_opening_adjustment(
            day2,
            &PaymentMethod::Cash,
            BigDecimal::from(2000),
            AdjustmentMode::Set,
            Some("Morning recount".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(opening.cash, BigDecimal::from(2000));

    let corrections = cashbook
        .transactions(None, None, Some(day2), Some(day2))
        .await
        .unwrap();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].before_balance, BigDecimal::from(1500));
    assert_eq!(corrections[0].after_balance, BigDecimal::from(2000));
    assert_eq!(
        corrections[0].source,
        TransactionSource::OpeningBalanceAddition {
            mode: AdjustmentMode::Set
        }
    );
}

#[tokio::test]
async fn test_split_payment_produces_independent_timeline_rows() {
    let (mut cashbook, storage) = cashbook();
    let day = date(2024, 1, 5);

    let bank = BankAccount::new(
        "First National".to_string(),
        "1234567890".to_string(),
        "FN Current".to_string(),
    );
    storage.seed_bank_account(bank.clone());

    record_business_event(
        &mut cashbook,
        &storage,
        TransactionSource::SalePayment,
        "sale-split",
        "INV-042",
        at(day, 14, 0),
        vec![
            PaymentLine {
                method: PaymentMethod::Cash,
                amount: BigDecimal::from(300),
            },
            PaymentLine {
                method: PaymentMethod::BankTransfer {
                    bank_account_id: bank.id,
                },
                amount: BigDecimal::from(200),
            },
        ],
    )
    .await;

    let timeline = cashbook.timeline(day, day).await.unwrap();
    assert_eq!(timeline.len(), 2);

    let cash_row = timeline
        .iter()
        .find(|e| e.method == PaymentMethod::Cash)
        .unwrap();
    let bank_row = timeline
        .iter()
        .find(|e| !e.method.is_cash())
        .unwrap();

    assert_eq!(cash_row.amount, BigDecimal::from(300));
    assert_eq!(cash_row.before_balance, BigDecimal::from(0));
    assert_eq!(cash_row.after_balance, BigDecimal::from(300));
    assert_eq!(cash_row.bank_label, None);
    assert_eq!(cash_row.direction, FlowDirection::Income);
    assert_eq!(cash_row.description, "INV-042");

    assert_eq!(bank_row.amount, BigDecimal::from(200));
    assert_eq!(bank_row.before_balance, BigDecimal::from(0));
    assert_eq!(bank_row.after_balance, BigDecimal::from(200));
    assert_eq!(bank_row.bank_label, Some("FN Current".to_string()));
}

#[tokio::test]
async fn test_daily_closing_formula_across_accounts() {
    let (mut cashbook, storage) = cashbook();
    let day = date(2024, 2, 1);

    let bank = BankAccount::new(
        "First National".to_string(),
        "1234567890".to_string(),
        "FN Current".to_string(),
    );
    storage.seed_bank_account(bank.clone());
    let transfer = PaymentMethod::BankTransfer {
        bank_account_id: bank.id,
    };

    cashbook
        .apply_opening_adjustment(
            day,
            &PaymentMethod::Cash,
            BigDecimal::from(1000),
            AdjustmentMode::Set,
            None,
        )
        .await
        .unwrap();
    cashbook
        .apply_opening_adjustment(day, &transfer, BigDecimal::from(5000), AdjustmentMode::Set, None)
        .await
        .unwrap();
    cashbook
        .apply_opening_adjustment(
            day,
            &PaymentMethod::Cash,
            BigDecimal::from(200),
            AdjustmentMode::Add,
            Some("Owner float".to_string()),
        )
        .await
        .unwrap();

    record_business_event(
        &mut cashbook,
        &storage,
        TransactionSource::SalePayment,
        "sale-1",
        "INV-100",
        at(day, 9, 0),
        vec![
            PaymentLine {
                method: PaymentMethod::Cash,
                amount: BigDecimal::from(800),
            },
            PaymentLine {
                method: transfer,
                amount: BigDecimal::from(1200),
            },
        ],
    )
    .await;
    record_business_event(
        &mut cashbook,
        &storage,
        TransactionSource::PurchasePayment,
        "purchase-1",
        "PO-31",
        at(day, 11, 0),
        vec![PaymentLine {
            method: transfer,
            amount: BigDecimal::from(700),
        }],
    )
    .await;
    record_business_event(
        &mut cashbook,
        &storage,
        TransactionSource::ExpensePayment,
        "expense-1",
        "Electricity",
        at(day, 16, 0),
        vec![PaymentLine {
            method: PaymentMethod::Cash,
            amount: BigDecimal::from(150),
        }],
    )
    .await;

    let report = cashbook.daily_report(day).await.unwrap();

    // cash: 1000 + 200 + 800 − 0 − 150 = 1850
    assert_eq!(report.opening_balance.cash, BigDecimal::from(1000));
    assert_eq!(report.closing_balance.cash, BigDecimal::from(1850));
    // bank: 5000 + 0 + 1200 − 700 − 0 = 5500
    let bank_closing = report
        .closing_balance
        .bank_balances
        .iter()
        .find(|b| b.bank_account_id == bank.id)
        .unwrap();
    assert_eq!(bank_closing.balance, BigDecimal::from(5500));
    assert_eq!(
        report.closing_balance.total,
        BigDecimal::from(1850 + 5500)
    );
    assert_eq!(report.opening_adjustments.len(), 3);

    // The ledger agrees with the reconciliation, account by account.
    let audit = cashbook.audit_ledger(None, None).await.unwrap();
    assert!(audit.is_consistent, "issues: {:?}", audit.issues);
}

#[tokio::test]
async fn test_daily_report_is_idempotent() {
    let (mut cashbook, storage) = cashbook();
    let day = date(2024, 3, 1);

    cashbook
        .apply_opening_adjustment(
            day,
            &PaymentMethod::Cash,
            BigDecimal::from(750),
            AdjustmentMode::Set,
            None,
        )
        .await
        .unwrap();
    record_business_event(
        &mut cashbook,
        &storage,
        TransactionSource::SalePayment,
        "sale-1",
        "INV-200",
        at(day, 12, 0),
        vec![PaymentLine {
            method: PaymentMethod::Cash,
            amount: BigDecimal::from(125),
        }],
    )
    .await;

    let first = cashbook.daily_report(day).await.unwrap();
    let second = cashbook.daily_report(day).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_range_sums_flows_but_not_balances() {
    let (mut cashbook, storage) = cashbook();
    let start = date(2024, 4, 1);
    let end = date(2024, 4, 3);

    cashbook
        .apply_opening_adjustment(
            start,
            &PaymentMethod::Cash,
            BigDecimal::from(1000),
            AdjustmentMode::Set,
            None,
        )
        .await
        .unwrap();

    for (i, day) in [start, date(2024, 4, 2), end].iter().enumerate() {
        record_business_event(
            &mut cashbook,
            &storage,
            TransactionSource::SalePayment,
            &format!("sale-{}", i),
            &format!("INV-{}", 300 + i),
            at(*day, 10, 0),
            vec![PaymentLine {
                method: PaymentMethod::Cash,
                amount: BigDecimal::from(100),
            }],
        )
        .await;
    }

    let report = cashbook.range_report(start, end).await.unwrap();
    assert_eq!(report.daily_reports.len(), 3);

    let summed: BigDecimal = report
        .daily_reports
        .iter()
        .map(|r| r.sales.total.clone())
        .sum();
    assert_eq!(report.summary.sales.total, summed);
    assert_eq!(report.summary.sales.total, BigDecimal::from(300));

    // Balances are point-in-time, never summed across days.
    assert_eq!(report.summary.opening_balance.cash, BigDecimal::from(1000));
    assert_eq!(report.summary.closing_balance.cash, BigDecimal::from(1300));
    let summed_closings: BigDecimal = report
        .daily_reports
        .iter()
        .map(|r| r.closing_balance.cash.clone())
        .sum();
    assert_ne!(report.summary.closing_balance.cash, summed_closings);
    assert_eq!(
        report.summary.closing_balance,
        report.daily_reports.last().unwrap().closing_balance
    );
}

#[tokio::test]
async fn test_range_honors_later_opening_corrections() {
    let (mut cashbook, storage) = cashbook();
    let start = date(2024, 5, 1);
    let end = date(2024, 5, 2);

    record_business_event(
        &mut cashbook,
        &storage,
        TransactionSource::SalePayment,
        "sale-1",
        "INV-400",
        at(start, 10, 0),
        vec![PaymentLine {
            method: PaymentMethod::Cash,
            amount: BigDecimal::from(100),
        }],
    )
    .await;

    let before = cashbook.range_report(start, end).await.unwrap();
    assert_eq!(before.summary.closing_balance.cash, BigDecimal::from(100));

    // Correct day 1's opening after the fact; both days must move.
    cashbook
        .apply_opening_adjustment(
            start,
            &PaymentMethod::Cash,
            BigDecimal::from(1000),
            AdjustmentMode::Set,
            Some("Late correction".to_string()),
        )
        .await
        .unwrap();

    let after = cashbook.range_report(start, end).await.unwrap();
    assert_eq!(after.daily_reports[0].opening_balance.cash, BigDecimal::from(1000));
    assert_eq!(after.summary.closing_balance.cash, BigDecimal::from(1100));
}

#[tokio::test]
async fn test_default_bank_account_lookup() {
    let (cashbook, storage) = cashbook();

    let mut first = BankAccount::new(
        "First National".to_string(),
        "111".to_string(),
        "FN Current".to_string(),
    );
    first.is_default = true;
    first.is_active = false;
    let mut second = BankAccount::new(
        "Union Bank".to_string(),
        "222".to_string(),
        "Union Savings".to_string(),
    );
    second.is_default = true;
    storage.seed_bank_account(first);
    storage.seed_bank_account(second.clone());

    // Only the active default counts.
    let default = cashbook.default_bank_account().await.unwrap().unwrap();
    assert_eq!(default.id, second.id);

    let directory = cashbook.directory().await.unwrap();
    assert_eq!(directory.bank_accounts.len(), 2);
    assert_eq!(directory.active_bank_accounts().len(), 1);

    // Cash is always enumerated, ahead of the bank accounts.
    let refs = directory.account_refs();
    assert_eq!(refs.len(), 3);
    assert_eq!(refs[0], cashbook_core::AccountRef::Cash);
}

#[tokio::test]
async fn test_strict_validator_guards_flow_direction() {
    let storage = MemoryStorage::new();
    let mut cashbook: TestCashbook = Cashbook::with_validator(
        storage.clone(),
        storage,
        Box::new(StrictMovementValidator),
    );
    let day = date(2024, 7, 1);

    // An expense recorded as an inflow is a caller bug.
    let result = cashbook
        .record_payment(
            &PaymentMethod::Cash,
            TransactionSource::ExpensePayment,
            "expense-1".to_string(),
            BigDecimal::from(150),
            at(day, 9, 0),
            None,
        )
        .await;
    assert!(matches!(result, Err(CashbookError::Validation(_))));

    cashbook
        .record_payment(
            &PaymentMethod::Cash,
            TransactionSource::ExpensePayment,
            "expense-1".to_string(),
            BigDecimal::from(-150),
            at(day, 9, 0),
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ledger_chain_invariant_holds_per_account() {
    let (mut cashbook, storage) = cashbook();
    let day = date(2024, 6, 1);

    let bank = BankAccount::new(
        "First National".to_string(),
        "111".to_string(),
        "FN Current".to_string(),
    );
    storage.seed_bank_account(bank.clone());
    let transfer = PaymentMethod::BankTransfer {
        bank_account_id: bank.id,
    };

    for i in 0..4u32 {
        let method = if i % 2 == 0 {
            PaymentMethod::Cash
        } else {
            transfer
        };
        record_business_event(
            &mut cashbook,
            &storage,
            TransactionSource::SalePayment,
            &format!("sale-{}", i),
            &format!("INV-{}", 500 + i),
            at(day, 9 + i, 0),
            vec![PaymentLine {
                method,
                amount: BigDecimal::from(50 + i64::from(i)),
            }],
        )
        .await;
    }

    for account in [
        cashbook_core::AccountRef::Cash,
        cashbook_core::AccountRef::Bank(bank.id),
    ] {
        let chain = cashbook
            .transactions(Some(&account), None, None, None)
            .await
            .unwrap();
        for pair in chain.windows(2) {
            assert_eq!(pair[1].before_balance, pair[0].after_balance);
        }
        for transaction in &chain {
            assert_eq!(
                transaction.after_balance,
                &transaction.before_balance + &transaction.amount
            );
        }
    }
}
