//! Taxes recorded against a single transaction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{check_storable, percent_of};
use super::totals::TaxLine;
use super::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedTransactionTax {
    pub tax_id: Uuid,
    pub name: String,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// `amount × rate / 100` for each tax, each line rounded to `precision` on its
/// own.
pub fn transaction_taxes(
    amount: Decimal,
    taxes: &[TaxLine],
    precision: u32,
) -> Result<Vec<ComputedTransactionTax>, LedgerError> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::validation(
            "amount",
            "amount must not be negative",
        ));
    }
    check_storable("amount", amount)?;

    taxes
        .iter()
        .map(|tax| {
            if tax.rate < Decimal::ZERO {
                return Err(LedgerError::validation(
                    "tax_ids",
                    format!("tax '{}' has a negative rate", tax.name),
                ));
            }
            check_storable("tax_ids", tax.rate)?;
            Ok(ComputedTransactionTax {
                tax_id: tax.tax_id,
                name: tax.name.clone(),
                rate: tax.rate,
                amount: check_storable("tax_ids", percent_of(amount, tax.rate, precision))?,
            })
        })
        .collect()
}

pub fn total_tax(taxes: &[ComputedTransactionTax]) -> Decimal {
    taxes.iter().map(|t| t.amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tax(rate: &str) -> TaxLine {
        TaxLine {
            tax_id: Uuid::new_v4(),
            name: format!("{}%", rate),
            rate: dec(rate),
        }
    }

    #[test]
    fn each_tax_line_is_rounded() {
        let taxes = transaction_taxes(dec("99.99"), &[tax("7.5"), tax("2.5")], 2).unwrap();
        // 7.49925 and 2.49975
        assert_eq!(taxes[0].amount, dec("7.50"));
        assert_eq!(taxes[1].amount, dec("2.50"));
        assert_eq!(total_tax(&taxes), dec("10.00"));
    }

    #[test]
    fn zero_precision_currency() {
        let taxes = transaction_taxes(dec("1234"), &[tax("8")], 0).unwrap();
        assert_eq!(taxes[0].amount, dec("99"));
    }

    #[test]
    fn no_taxes_is_empty() {
        assert!(transaction_taxes(dec("10"), &[], 2).unwrap().is_empty());
    }

    #[test]
    fn rejects_negative_input() {
        assert!(transaction_taxes(dec("-1"), &[tax("10")], 2).is_err());
        assert!(transaction_taxes(dec("1"), &[tax("-10")], 2).is_err());
    }

    #[test]
    fn oversized_amount_or_rate_is_a_validation_error() {
        let huge = "1000000000000000000000000";
        let err = transaction_taxes(dec(huge), &[tax("10")], 2).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "amount"));

        let err = transaction_taxes(dec("99999999999"), &[tax(huge)], 2).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "tax_ids"));
    }
}
