//! Multi-day reconciliation over an inclusive date range

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::reconciliation::daily::{BalanceBreakdown, DailyReport, DailyReportBuilder};
use crate::traits::*;
use crate::types::*;

/// Flow totals summed across a range, split by payment channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTotals {
    pub cash: BigDecimal,
    pub bank_transfer: BigDecimal,
    pub total: BigDecimal,
}

impl FlowTotals {
    fn zero() -> Self {
        Self {
            cash: BigDecimal::from(0),
            bank_transfer: BigDecimal::from(0),
            total: BigDecimal::from(0),
        }
    }
}

/// Range summary: flow totals are sums, balances are point-in-time.
///
/// Opening is the first day's opening and closing the last day's closing;
/// balances summed across days would be meaningless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSummary {
    pub sales: FlowTotals,
    pub purchases: FlowTotals,
    pub expenses: FlowTotals,
    pub opening_balance: BalanceBreakdown,
    pub closing_balance: BalanceBreakdown,
}

/// A reconciled date range: per-day reports plus the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRangeReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_reports: Vec<DailyReport>,
    pub summary: RangeSummary,
}

/// Builds range reports by composing independent daily reconciliations.
pub struct RangeReportBuilder<S: BalanceStore, B: BusinessRecords> {
    daily: DailyReportBuilder<S, B>,
}

impl<S: BalanceStore, B: BusinessRecords> RangeReportBuilder<S, B> {
    pub fn new(storage: S, records: B) -> Self {
        Self {
            daily: DailyReportBuilder::new(storage, records),
        }
    }

    /// Reconcile every day in `[start_date, end_date]`, ascending.
    ///
    /// Each day's opening is derived independently from storage rather than
    /// chained from the previous in-memory report, so a later correction of
    /// a historical opening balance is always honored.
    pub async fn build(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> CashbookResult<DateRangeReport> {
        if start_date > end_date {
            return Err(CashbookError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }

        let mut daily_reports = Vec::new();
        let mut date = start_date;
        loop {
            daily_reports.push(self.daily.build(date).await?);
            if date == end_date {
                break;
            }
            date = date.succ_opt().ok_or_else(|| {
                CashbookError::Validation(format!("date overflow after {}", date))
            })?;
        }

        let mut sales = FlowTotals::zero();
        let mut purchases = FlowTotals::zero();
        let mut expenses = FlowTotals::zero();
        for report in &daily_reports {
            sales.cash += &report.sales.cash;
            sales.bank_transfer += &report.sales.bank_transfer;
            sales.total += &report.sales.total;
            purchases.cash += &report.purchases.cash;
            purchases.bank_transfer += &report.purchases.bank_transfer;
            purchases.total += &report.purchases.total;
            expenses.cash += &report.expenses.cash;
            expenses.bank_transfer += &report.expenses.bank_transfer;
            expenses.total += &report.expenses.total;
        }

        // One day at minimum, so first/last always exist.
        let opening_balance = daily_reports
            .first()
            .map(|r| r.opening_balance.clone())
            .unwrap_or_else(|| BalanceBreakdown {
                cash: BigDecimal::from(0),
                bank_balances: Vec::new(),
                total: BigDecimal::from(0),
            });
        let closing_balance = daily_reports
            .last()
            .map(|r| r.closing_balance.clone())
            .unwrap_or_else(|| opening_balance.clone());

        Ok(DateRangeReport {
            start_date,
            end_date,
            daily_reports,
            summary: RangeSummary {
                sales,
                purchases,
                expenses,
                opening_balance,
                closing_balance,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let storage = MemoryStorage::new();
        let builder = RangeReportBuilder::new(storage.clone(), storage);

        let result = builder
            .build(
                NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            )
            .await;

        assert!(matches!(
            result,
            Err(CashbookError::InvalidDateRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_single_day_range() {
        let storage = MemoryStorage::new();
        let builder = RangeReportBuilder::new(storage.clone(), storage);
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        let report = builder.build(date, date).await.unwrap();
        assert_eq!(report.daily_reports.len(), 1);
        assert_eq!(report.summary.opening_balance, report.summary.closing_balance);
    }
}
