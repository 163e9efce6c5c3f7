use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ledger::report::DateRange;
use crate::ledger::LedgerError;

#[derive(Debug, Deserialize)]
pub struct ReportParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportParams {
    pub fn range(&self) -> Result<DateRange, LedgerError> {
        DateRange::new(self.from, self.to)
    }
}

/// Dashboard range; defaults to the current calendar year up to `today`.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DashboardParams {
    pub fn range(&self, today: NaiveDate) -> Result<DateRange, LedgerError> {
        let to = self.to.unwrap_or(today);
        let from = match self.from {
            Some(from) => from,
            None => NaiveDate::from_yo_opt(to.year(), 1).unwrap_or(to),
        };
        DateRange::new(from, to)
    }
}

/// A report with the currency its figures are expressed in.
#[derive(Debug, Serialize)]
pub struct ReportResponse<T> {
    pub currency_code: String,
    #[serde(flatten)]
    pub report: T,
}
