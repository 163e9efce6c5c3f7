//! Report aggregation over a date range.
//!
//! Amounts are converted into the base currency with the rate frozen on each
//! row, then summed with the same flow rules as account balances. Transfers
//! move money between the company's own accounts and never count as income or
//! expense.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::balance::Flow;
use super::money::to_base;
use super::status::DocumentStatus;
use super::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub flow: Flow,
    pub amount: Decimal,
    pub currency_rate: Decimal,
    pub category_id: Option<Uuid>,
    pub paid_at: DateTime<Utc>,
}

/// Longest range a report may cover.
pub const MAX_RANGE_YEARS: u32 = 10;

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, LedgerError> {
        if from > to {
            return Err(LedgerError::validation(
                "from",
                format!("range start {} is after its end {}", from, to),
            ));
        }
        let limit = from
            .checked_add_months(Months::new(MAX_RANGE_YEARS * 12))
            .unwrap_or(NaiveDate::MAX);
        if to > limit {
            return Err(LedgerError::validation(
                "to",
                format!("a report may cover at most {} years", MAX_RANGE_YEARS),
            ));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let date = at.date_naive();
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Income,
    Expense,
}

impl ReportKind {
    /// Whether a flow contributes to this side of the report.
    pub fn includes(self, flow: Flow) -> bool {
        match self {
            ReportKind::Income => flow == Flow::Income,
            ReportKind::Expense => matches!(flow, Flow::Expense | Flow::Payment),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category_id: Option<Uuid>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
    pub net_profit: Decimal,
    pub income_by_category: Vec<CategoryTotal>,
    pub expense_by_category: Vec<CategoryTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub kind: ReportKind,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub months: Vec<MonthlyTotal>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Invoices: money owed to the company.
    Receivable,
    /// Bills: money the company owes.
    Payable,
}

/// An unpaid or partially paid document as the dashboard sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDocument {
    pub side: Side,
    pub status: DocumentStatus,
    pub amount: Decimal,
    pub paid: Decimal,
    pub currency_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
    pub profit: Decimal,
    pub receivables: Decimal,
    pub payables: Decimal,
    pub open_invoices: u64,
    pub open_bills: u64,
    pub overdue_documents: u64,
}

fn in_range<'a>(
    entries: &'a [ReportEntry],
    range: &'a DateRange,
    kind: ReportKind,
) -> impl Iterator<Item = &'a ReportEntry> + 'a {
    entries
        .iter()
        .filter(move |e| kind.includes(e.flow) && range.contains(e.paid_at))
}

fn by_category(
    entries: &[ReportEntry],
    range: &DateRange,
    kind: ReportKind,
) -> Result<(Decimal, Vec<CategoryTotal>), LedgerError> {
    let mut categories: BTreeMap<Option<Uuid>, Decimal> = BTreeMap::new();
    let mut total = Decimal::ZERO;

    for entry in in_range(entries, range, kind) {
        let amount = to_base(entry.amount, entry.currency_rate)?;
        *categories.entry(entry.category_id).or_default() += amount;
        total += amount;
    }

    let categories = categories
        .into_iter()
        .map(|(category_id, amount)| CategoryTotal {
            category_id,
            amount,
        })
        .collect();
    Ok((total, categories))
}

pub fn profit_and_loss(
    entries: &[ReportEntry],
    range: DateRange,
) -> Result<ProfitAndLoss, LedgerError> {
    let (income, income_by_category) = by_category(entries, &range, ReportKind::Income)?;
    let (expense, expense_by_category) = by_category(entries, &range, ReportKind::Expense)?;

    Ok(ProfitAndLoss {
        from: range.from,
        to: range.to,
        income,
        expense,
        net_profit: income - expense,
        income_by_category,
        expense_by_category,
    })
}

fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

/// Per-month totals, one row for every month the range touches (empty months
/// included).
pub fn monthly_summary(
    entries: &[ReportEntry],
    kind: ReportKind,
    range: DateRange,
) -> Result<MonthlySummary, LedgerError> {
    let mut months: BTreeMap<String, Decimal> = BTreeMap::new();

    let (mut year, mut month) = (range.from.year(), range.from.month());
    while (year, month) <= (range.to.year(), range.to.month()) {
        months.insert(month_key(year, month), Decimal::ZERO);
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    let mut total = Decimal::ZERO;
    for entry in in_range(entries, &range, kind) {
        let amount = to_base(entry.amount, entry.currency_rate)?;
        let key = month_key(entry.paid_at.year(), entry.paid_at.month());
        *months.entry(key).or_default() += amount;
        total += amount;
    }

    Ok(MonthlySummary {
        kind,
        from: range.from,
        to: range.to,
        months: months
            .into_iter()
            .map(|(month, amount)| MonthlyTotal { month, amount })
            .collect(),
        total,
    })
}

pub fn dashboard(
    entries: &[ReportEntry],
    range: DateRange,
    open_documents: &[OpenDocument],
) -> Result<DashboardSummary, LedgerError> {
    let pnl = profit_and_loss(entries, range)?;

    let mut summary = DashboardSummary {
        from: range.from,
        to: range.to,
        income: pnl.income,
        expense: pnl.expense,
        profit: pnl.net_profit,
        receivables: Decimal::ZERO,
        payables: Decimal::ZERO,
        open_invoices: 0,
        open_bills: 0,
        overdue_documents: 0,
    };

    for doc in open_documents.iter().filter(|d| d.status.is_open()) {
        let outstanding = to_base(doc.amount - doc.paid, doc.currency_rate)?;
        match doc.side {
            Side::Receivable => {
                summary.receivables += outstanding;
                summary.open_invoices += 1;
            }
            Side::Payable => {
                summary.payables += outstanding;
                summary.open_bills += 1;
            }
        }
        if doc.status == DocumentStatus::Overdue {
            summary.overdue_documents += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(
        flow: Flow,
        amount: &str,
        rate: &str,
        category: Option<Uuid>,
        day: (i32, u32, u32),
    ) -> ReportEntry {
        ReportEntry {
            flow,
            amount: dec(amount),
            currency_rate: dec(rate),
            category_id: category,
            paid_at: Utc.with_ymd_and_hms(day.0, day.1, day.2, 12, 0, 0).unwrap(),
        }
    }

    fn q1() -> DateRange {
        DateRange::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap()
    }

    #[test]
    fn profit_and_loss_excludes_transfers_and_out_of_range() {
        let sales = Uuid::new_v4();
        let rent = Uuid::new_v4();
        let entries = [
            entry(Flow::Income, "500", "1", Some(sales), (2024, 1, 10)),
            entry(Flow::Income, "123.50", "1.235", Some(sales), (2024, 2, 1)),
            entry(Flow::Expense, "200.25", "1", Some(rent), (2024, 2, 3)),
            entry(Flow::Payment, "50", "1", None, (2024, 3, 31)),
            entry(Flow::TransferIn, "1000", "1", None, (2024, 1, 5)),
            entry(Flow::TransferOut, "1000", "1", None, (2024, 1, 5)),
            entry(Flow::Income, "999", "1", Some(sales), (2024, 4, 1)),
        ];

        let pnl = profit_and_loss(&entries, q1()).unwrap();
        assert_eq!(pnl.income, dec("600"));
        assert_eq!(pnl.expense, dec("250.25"));
        assert_eq!(pnl.net_profit, dec("349.75"));
        assert_eq!(
            pnl.income_by_category,
            vec![CategoryTotal {
                category_id: Some(sales),
                amount: dec("600")
            }]
        );
        assert_eq!(pnl.expense_by_category.len(), 2);
    }

    #[test]
    fn monthly_summary_fills_empty_months() {
        let entries = [
            entry(Flow::Income, "10", "1", None, (2023, 12, 31)),
            entry(Flow::Income, "20", "1", None, (2024, 2, 14)),
            entry(Flow::Expense, "5", "1", None, (2024, 2, 14)),
        ];
        let range = DateRange::new(date(2023, 12, 1), date(2024, 3, 15)).unwrap();
        let summary = monthly_summary(&entries, ReportKind::Income, range).unwrap();

        let months: Vec<(&str, Decimal)> = summary
            .months
            .iter()
            .map(|m| (m.month.as_str(), m.amount))
            .collect();
        assert_eq!(
            months,
            vec![
                ("2023-12", dec("10")),
                ("2024-01", Decimal::ZERO),
                ("2024-02", dec("20")),
                ("2024-03", Decimal::ZERO),
            ]
        );
        assert_eq!(summary.total, dec("30"));
    }

    #[test]
    fn dashboard_counts_open_documents() {
        let docs = [
            OpenDocument {
                side: Side::Receivable,
                status: DocumentStatus::Sent,
                amount: dec("110"),
                paid: Decimal::ZERO,
                currency_rate: dec("1"),
            },
            OpenDocument {
                side: Side::Receivable,
                status: DocumentStatus::Overdue,
                amount: dec("100"),
                paid: dec("40"),
                currency_rate: dec("2"),
            },
            OpenDocument {
                side: Side::Payable,
                status: DocumentStatus::Partial,
                amount: dec("80"),
                paid: dec("30"),
                currency_rate: dec("1"),
            },
            OpenDocument {
                side: Side::Payable,
                status: DocumentStatus::Paid,
                amount: dec("999"),
                paid: dec("999"),
                currency_rate: dec("1"),
            },
        ];

        let summary = dashboard(&[], q1(), &docs).unwrap();
        assert_eq!(summary.receivables, dec("140"));
        assert_eq!(summary.payables, dec("50"));
        assert_eq!(summary.open_invoices, 2);
        assert_eq!(summary.open_bills, 1);
        assert_eq!(summary.overdue_documents, 1);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn range_is_capped_at_ten_years() {
        assert!(DateRange::new(date(2015, 1, 1), date(2025, 1, 1)).is_ok());

        let err = DateRange::new(date(2015, 1, 1), date(2025, 1, 2)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "to"));
        assert!(DateRange::new(date(1, 1, 1), date(9999, 12, 31)).is_err());
        assert!(DateRange::new(NaiveDate::MAX, NaiveDate::MAX).is_ok());
    }
}
