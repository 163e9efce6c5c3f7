//! Fixed-point money helpers and display formatting.
//!
//! Every amount is a [`Decimal`]. Arithmetic happens at full precision and is
//! rounded explicitly; formatting is applied only at the presentation edge.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::LedgerError;

/// Fractional digits of every stored monetary column.
pub const STORAGE_SCALE: u32 = 4;

/// Fractional digits of stored currency rates.
pub const RATE_SCALE: u32 = 8;

/// Largest precision a currency may declare.
pub const MAX_PRECISION: u32 = STORAGE_SCALE;

/// Exclusive upper bound of a `NUMERIC(15,4)` column.
pub fn max_storable() -> Decimal {
    Decimal::new(100_000_000_000, 0)
}

/// Reject a value a `NUMERIC(15,4)` column would round or refuse.
pub fn check_storable(field: &str, value: Decimal) -> Result<Decimal, LedgerError> {
    if value.normalize().scale() > STORAGE_SCALE {
        return Err(LedgerError::validation(
            field,
            format!("value has more than {} decimal places", STORAGE_SCALE),
        ));
    }
    if value.abs() >= max_storable() {
        return Err(LedgerError::validation(
            field,
            format!("value must be less than {}", max_storable()),
        ));
    }
    Ok(value)
}

/// Round half away from zero to `precision` fractional digits.
pub fn round_to(amount: Decimal, precision: u32) -> Decimal {
    amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// Half of the smallest unit at `precision` (0.005 for cents).
pub fn half_minor_unit(precision: u32) -> Decimal {
    Decimal::new(5, precision + 1)
}

/// `amount × rate / 100`, rounded to `precision`.
pub fn percent_of(amount: Decimal, rate: Decimal, precision: u32) -> Decimal {
    round_to(amount * rate / Decimal::ONE_HUNDRED, precision)
}

/// Convert a document/transaction amount into the company's base currency
/// using the rate frozen on that row.
pub fn to_base(amount: Decimal, rate: Decimal) -> Result<Decimal, LedgerError> {
    if rate <= Decimal::ZERO {
        return Err(LedgerError::validation(
            "currency_rate",
            "currency rate must be greater than zero",
        ));
    }
    Ok(round_to(amount / rate, STORAGE_SCALE))
}

/// Move an amount between two currencies through the base currency.
pub fn convert(
    amount: Decimal,
    from_rate: Decimal,
    to_rate: Decimal,
    precision: u32,
) -> Result<Decimal, LedgerError> {
    if to_rate <= Decimal::ZERO {
        return Err(LedgerError::validation(
            "currency_rate",
            "currency rate must be greater than zero",
        ));
    }
    Ok(round_to(to_base(amount, from_rate)? * to_rate, precision))
}

/// Check a caller-supplied amount: non-negative and no finer than the
/// currency's smallest unit.
pub fn validate_amount(
    field: &str,
    amount: Decimal,
    precision: u32,
) -> Result<Decimal, LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::validation(field, "amount must not be negative"));
    }
    if amount.normalize().scale() > precision {
        return Err(LedgerError::validation(
            field,
            format!("amount has more than {} decimal places", precision),
        ));
    }
    check_storable(field, amount)
}

/// Display rules attached to a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyFormat {
    pub code: String,
    pub precision: u32,
    pub symbol: String,
    pub symbol_first: bool,
    pub decimal_mark: String,
    pub thousands_separator: String,
}

impl CurrencyFormat {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.precision > MAX_PRECISION {
            return Err(LedgerError::validation(
                "precision",
                format!("precision must be between 0 and {}", MAX_PRECISION),
            ));
        }
        if self.decimal_mark.is_empty() {
            return Err(LedgerError::validation(
                "decimal_mark",
                "decimal mark must not be empty",
            ));
        }
        if self.decimal_mark == self.thousands_separator {
            return Err(LedgerError::validation(
                "thousands_separator",
                "thousands separator must differ from the decimal mark",
            ));
        }
        Ok(())
    }
}

/// Render `amount` for display: rounded to the currency precision, grouped,
/// and decorated with the symbol on the configured side.
pub fn format_amount(amount: Decimal, format: &CurrencyFormat) -> String {
    let rounded = round_to(amount, format.precision);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().to_string();

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part.to_string(), frac_part.to_string()),
        None => (digits, String::new()),
    };

    let mut number = group_thousands(&int_part, &format.thousands_separator);
    if format.precision > 0 {
        let mut frac = frac_part;
        while frac.len() < format.precision as usize {
            frac.push('0');
        }
        number.push_str(&format.decimal_mark);
        number.push_str(&frac);
    }

    let sign = if negative { "-" } else { "" };
    if format.symbol_first {
        format!("{}{}{}", sign, format.symbol, number)
    } else {
        format!("{}{}{}", sign, number, format.symbol)
    }
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// A company's currency as the ledger needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySpec {
    pub format: CurrencyFormat,
    pub rate: Decimal,
}

/// The live currencies of one company, keyed by code.
#[derive(Debug, Clone, Default)]
pub struct CurrencyBook {
    currencies: HashMap<String, CurrencySpec>,
}

impl CurrencyBook {
    pub fn new(currencies: impl IntoIterator<Item = CurrencySpec>) -> Self {
        Self {
            currencies: currencies
                .into_iter()
                .map(|c| (c.format.code.clone(), c))
                .collect(),
        }
    }

    /// Look up a currency; a missing code is a configuration error, never a
    /// silent default.
    pub fn get(&self, code: &str) -> Result<&CurrencySpec, LedgerError> {
        self.currencies
            .get(code)
            .ok_or_else(|| LedgerError::missing_currency(code))
    }

    pub fn precision(&self, code: &str) -> Result<u32, LedgerError> {
        Ok(self.get(code)?.format.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn usd() -> CurrencyFormat {
        CurrencyFormat {
            code: "USD".into(),
            precision: 2,
            symbol: "$".into(),
            symbol_first: true,
            decimal_mark: ".".into(),
            thousands_separator: ",".into(),
        }
    }

    fn eur() -> CurrencyFormat {
        CurrencyFormat {
            code: "EUR".into(),
            precision: 2,
            symbol: "€".into(),
            symbol_first: false,
            decimal_mark: ",".into(),
            thousands_separator: ".".into(),
        }
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(dec("0.005"), 2), dec("0.01"));
        assert_eq!(round_to(dec("0.0049"), 2), dec("0.00"));
        assert_eq!(round_to(dec("-0.005"), 2), dec("-0.01"));
        assert_eq!(round_to(dec("2.5"), 0), dec("3"));
    }

    #[test]
    fn percent_of_rounds_to_precision() {
        assert_eq!(percent_of(dec("1.15"), dec("10"), 2), dec("0.12"));
        assert_eq!(percent_of(dec("100.00"), dec("10"), 2), dec("10.00"));
        assert_eq!(percent_of(dec("1.15"), dec("7"), 2), dec("0.08"));
    }

    #[test]
    fn to_base_divides_by_frozen_rate() {
        assert_eq!(to_base(dec("123.50"), dec("1.235")).unwrap(), dec("100"));
        assert!(matches!(
            to_base(dec("1"), Decimal::ZERO),
            Err(LedgerError::Validation { .. })
        ));
    }

    #[test]
    fn convert_goes_through_base() {
        assert_eq!(
            convert(dec("123.50"), dec("1.235"), dec("0.9"), 2).unwrap(),
            dec("90.00")
        );
        assert_eq!(convert(dec("10"), Decimal::ONE, Decimal::ONE, 2).unwrap(), dec("10"));
        assert!(convert(dec("10"), Decimal::ONE, Decimal::ZERO, 2).is_err());
    }

    #[test]
    fn validate_amount_checks_sign_and_scale() {
        assert_eq!(validate_amount("amount", dec("10.50"), 2).unwrap(), dec("10.50"));
        assert!(validate_amount("amount", dec("10.500"), 2).is_ok());
        assert!(validate_amount("amount", dec("10.505"), 2).is_err());
        assert!(validate_amount("amount", dec("-1"), 2).is_err());
        assert!(validate_amount("amount", dec("5"), 0).is_ok());
    }

    #[test]
    fn storable_values_fit_numeric_15_4() {
        assert!(check_storable("price", dec("99999999999.9999")).is_ok());
        assert!(check_storable("price", dec("0.0123")).is_ok());
        assert!(check_storable("price", dec("0.012300")).is_ok());

        let fine = check_storable("price", dec("0.012345")).unwrap_err();
        assert!(matches!(fine, LedgerError::Validation { ref field, .. } if field == "price"));
        assert!(check_storable("price", dec("100000000000")).is_err());
        assert!(validate_amount("amount", dec("1000000000000000000000000"), 2).is_err());
    }

    #[test]
    fn formats_symbol_first_with_grouping() {
        assert_eq!(format_amount(dec("1234.5"), &usd()), "$1,234.50");
        assert_eq!(format_amount(dec("1234567.891"), &usd()), "$1,234,567.89");
        assert_eq!(format_amount(dec("-10"), &usd()), "-$10.00");
        assert_eq!(format_amount(dec("0.004"), &usd()), "$0.00");
    }

    #[test]
    fn formats_symbol_last_with_custom_separators() {
        assert_eq!(format_amount(dec("1234.5"), &eur()), "1.234,50€");
        assert_eq!(format_amount(dec("999"), &eur()), "999,00€");
    }

    #[test]
    fn formats_zero_precision() {
        let jpy = CurrencyFormat {
            code: "JPY".into(),
            precision: 0,
            symbol: "¥".into(),
            symbol_first: true,
            decimal_mark: ".".into(),
            thousands_separator: ",".into(),
        };
        assert_eq!(format_amount(dec("1234.5"), &jpy), "¥1,235");
    }

    #[test]
    fn missing_currency_is_configuration_error() {
        let book = CurrencyBook::new([CurrencySpec {
            format: usd(),
            rate: Decimal::ONE,
        }]);
        assert!(book.get("USD").is_ok());
        assert_eq!(
            book.get("EUR").unwrap_err(),
            LedgerError::missing_currency("EUR")
        );
    }

    #[test]
    fn rejects_ambiguous_separators() {
        let mut format = usd();
        format.thousands_separator = ".".into();
        assert!(format.validate().is_err());
        format.precision = 9;
        assert!(format.validate().is_err());
    }
}
