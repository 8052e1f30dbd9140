//! Daily reconciliation usage example

use bigdecimal::BigDecimal;
use cashbook_core::utils::MemoryStorage;
use cashbook_core::{
    AdjustmentMode, BankAccount, BusinessRecord, Cashbook, PaymentLine, PaymentMethod,
    TransactionSource,
};
use chrono::NaiveDate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("💵 Cashbook Core - Daily Reconciliation Example\n");

    let storage = MemoryStorage::new();
    let mut cashbook = Cashbook::new(storage.clone(), storage.clone());

    // 1. Register a bank account (normally done by the account CRUD layer)
    println!("🏦 Registering bank account...");
    let mut bank = BankAccount::new(
        "First National".to_string(),
        "1234567890".to_string(),
        "FN Current".to_string(),
    );
    bank.is_default = true;
    storage.seed_bank_account(bank.clone());
    println!("  ✓ {} ({})\n", bank.label, bank.bank_name);

    // 2. Open the day with a till count
    let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    println!("🌅 Setting opening balances for {}...", today);
    cashbook
        .apply_opening_adjustment(
            today,
            &PaymentMethod::Cash,
            BigDecimal::from(1000),
            AdjustmentMode::Set,
            Some("Morning till count".to_string()),
        )
        .await?;
    cashbook
        .apply_opening_adjustment(
            today,
            &PaymentMethod::BankTransfer {
                bank_account_id: bank.id,
            },
            BigDecimal::from(5000),
            AdjustmentMode::Set,
            Some("Statement balance".to_string()),
        )
        .await?;
    let opening = cashbook.opening_balance(today).await?;
    println!(
        "  ✓ Cash ₹1,000 · FN Current ₹5,000 (total ₹{})\n",
        opening.total()
    );

    // 3. Record the day's business: a split-payment sale and an expense
    println!("💰 Recording business events...");
    let sale_time = today.and_hms_opt(10, 30, 0).unwrap();
    storage.seed_sale(BusinessRecord {
        id: "sale-1".to_string(),
        reference: "INV-001".to_string(),
        description: Some("Counter sale".to_string()),
        occurred_at: sale_time,
        payments: vec![
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
    });
    cashbook
        .record_payment(
            &PaymentMethod::Cash,
            TransactionSource::SalePayment,
            "sale-1".to_string(),
            BigDecimal::from(300),
            sale_time,
            Some("Counter sale".to_string()),
        )
        .await?;
    cashbook
        .record_payment(
            &PaymentMethod::BankTransfer {
                bank_account_id: bank.id,
            },
            TransactionSource::SalePayment,
            "sale-1".to_string(),
            BigDecimal::from(200),
            sale_time,
            Some("Counter sale".to_string()),
        )
        .await?;
    println!("  ✓ Sale INV-001: ₹300 cash + ₹200 transfer");

    let expense_time = today.and_hms_opt(16, 0, 0).unwrap();
    storage.seed_expense(BusinessRecord {
        id: "expense-1".to_string(),
        reference: "Electricity".to_string(),
        description: Some("Monthly electricity bill".to_string()),
        occurred_at: expense_time,
        payments: vec![PaymentLine {
            method: PaymentMethod::Cash,
            amount: BigDecimal::from(150),
        }],
    });
    cashbook
        .record_payment(
            &PaymentMethod::Cash,
            TransactionSource::ExpensePayment,
            "expense-1".to_string(),
            BigDecimal::from(-150),
            expense_time,
            Some("Monthly electricity bill".to_string()),
        )
        .await?;
    println!("  ✓ Expense: ₹150 cash\n");

    // 4. Reconcile the day
    println!("📊 Daily report for {}:", today);
    let report = cashbook.daily_report(today).await?;
    println!("  Opening cash:  ₹{}", report.opening_balance.cash);
    println!("  Sales total:   ₹{}", report.sales.total);
    println!("  Expenses:      ₹{}", report.expenses.total);
    println!("  Closing cash:  ₹{}", report.closing_balance.cash);
    println!("  Closing total: ₹{}\n", report.closing_balance.total);

    // 5. Print the chronological trail
    println!("🧾 Transaction trail:");
    for entry in cashbook.timeline(today, today).await? {
        println!(
            "  {} | {:<24} | {:>8} | {} → {}",
            entry.occurred_at.time(),
            entry.description,
            entry.amount,
            entry.before_balance,
            entry.after_balance
        );
    }

    // 6. Verify the ledger is internally consistent
    let audit = cashbook.audit_ledger(None, None).await?;
    println!(
        "\n🔒 Ledger audit: {} transactions across {} accounts — {}",
        audit.transactions_checked,
        audit.accounts_checked,
        if audit.is_consistent { "consistent" } else { "INCONSISTENT" }
    );

    Ok(())
}
