//! Account balance projection.
//!
//! Transaction amounts are stored unsigned; direction comes from the flow.
//! A balance is never persisted, it is re-derived from the postings each time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::{round_to, CurrencyBook, STORAGE_SCALE};
use super::LedgerError;

/// Direction of a transaction relative to the account it is booked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Income,
    Expense,
    TransferIn,
    TransferOut,
    Payment,
}

impl Flow {
    pub fn is_inflow(self) -> bool {
        matches!(self, Flow::Income | Flow::TransferIn)
    }

    /// +1 for money coming into the account, -1 otherwise.
    pub fn sign(self) -> Decimal {
        if self.is_inflow() {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        }
    }

    pub fn signed(self, amount: Decimal) -> Decimal {
        amount * self.sign()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Income => "income",
            Flow::Expense => "expense",
            Flow::TransferIn => "transfer_in",
            Flow::TransferOut => "transfer_out",
            Flow::Payment => "payment",
        }
    }
}

/// One unsigned movement on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub flow: Flow,
    pub amount: Decimal,
}

impl Posting {
    pub fn new(flow: Flow, amount: Decimal) -> Self {
        Self { flow, amount }
    }
}

/// Per-flow sums, each non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTotals {
    pub income: Decimal,
    pub expense: Decimal,
    pub transfer_in: Decimal,
    pub transfer_out: Decimal,
    pub payment: Decimal,
}

impl FlowTotals {
    fn add(&mut self, posting: &Posting) {
        let slot = match posting.flow {
            Flow::Income => &mut self.income,
            Flow::Expense => &mut self.expense,
            Flow::TransferIn => &mut self.transfer_in,
            Flow::TransferOut => &mut self.transfer_out,
            Flow::Payment => &mut self.payment,
        };
        *slot += posting.amount;
    }

    pub fn inflow(&self) -> Decimal {
        self.income + self.transfer_in
    }

    pub fn outflow(&self) -> Decimal {
        self.expense + self.payment + self.transfer_out
    }

    pub fn net(&self) -> Decimal {
        self.inflow() - self.outflow()
    }
}

/// Sum postings by flow. Rejects negative amounts.
pub fn flow_totals(postings: &[Posting]) -> Result<FlowTotals, LedgerError> {
    let mut totals = FlowTotals::default();
    for posting in postings {
        if posting.amount.is_sign_negative() && !posting.amount.is_zero() {
            return Err(LedgerError::validation(
                "amount",
                format!(
                    "{} amount {} must not be negative",
                    posting.flow.as_str(),
                    posting.amount
                ),
            ));
        }
        totals.add(posting);
    }
    Ok(totals)
}

/// Derived balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub currency_code: String,
    pub opening_balance: Decimal,
    pub totals: FlowTotals,
    pub balance: Decimal,
}

/// `opening + Σ(income, transfer-in) − Σ(expense, payment, transfer-out)`.
///
/// The account's currency must exist in `currencies`; a dangling code is a
/// configuration error rather than an implicit rate of one.
pub fn account_balance(
    opening_balance: Decimal,
    currency_code: &str,
    postings: &[Posting],
    currencies: &CurrencyBook,
) -> Result<AccountBalance, LedgerError> {
    currencies.get(currency_code)?;

    let totals = flow_totals(postings)?;
    let balance = round_to(opening_balance + totals.net(), STORAGE_SCALE);

    Ok(AccountBalance {
        currency_code: currency_code.to_string(),
        opening_balance,
        totals,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::money::{CurrencyFormat, CurrencySpec};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn book() -> CurrencyBook {
        CurrencyBook::new([CurrencySpec {
            format: CurrencyFormat {
                code: "USD".into(),
                precision: 2,
                symbol: "$".into(),
                symbol_first: true,
                decimal_mark: ".".into(),
                thousands_separator: ",".into(),
            },
            rate: Decimal::ONE,
        }])
    }

    #[test]
    fn opening_plus_income_minus_expense() {
        let postings = [
            Posting::new(Flow::Income, dec("500.00")),
            Posting::new(Flow::Expense, dec("200.25")),
        ];
        let balance = account_balance(dec("1000.00"), "USD", &postings, &book()).unwrap();
        assert_eq!(balance.balance, dec("1299.75"));
        assert_eq!(balance.totals.income, dec("500.00"));
        assert_eq!(balance.totals.expense, dec("200.25"));
    }

    #[test]
    fn transfers_and_payments_carry_their_direction() {
        let postings = [
            Posting::new(Flow::TransferIn, dec("50")),
            Posting::new(Flow::TransferOut, dec("20")),
            Posting::new(Flow::Payment, dec("10.5")),
        ];
        let balance = account_balance(Decimal::ZERO, "USD", &postings, &book()).unwrap();
        assert_eq!(balance.balance, dec("19.5"));
        let signed: Decimal = postings.iter().map(|p| p.flow.signed(p.amount)).sum();
        assert_eq!(signed, balance.totals.net());
        assert_eq!(balance.totals.inflow(), dec("50"));
        assert_eq!(balance.totals.outflow(), dec("30.5"));
    }

    #[test]
    fn balance_is_independent_of_posting_order() {
        let flows = [
            Flow::Income,
            Flow::Expense,
            Flow::TransferIn,
            Flow::TransferOut,
            Flow::Payment,
        ];
        let mut postings: Vec<Posting> = (1..=500)
            .map(|i| Posting::new(flows[i % flows.len()], Decimal::new(i as i64 * 1_0001, 4)))
            .collect();

        let forward = account_balance(dec("10"), "USD", &postings, &book()).unwrap();
        postings.reverse();
        let reversed = account_balance(dec("10"), "USD", &postings, &book()).unwrap();
        postings.sort_by_key(|p| (p.amount * Decimal::from(7919)).trunc() % Decimal::from(101));
        let shuffled = account_balance(dec("10"), "USD", &postings, &book()).unwrap();

        assert_eq!(forward.balance, reversed.balance);
        assert_eq!(forward.balance, shuffled.balance);
        assert_eq!(forward.totals, shuffled.totals);
    }

    #[test]
    fn sums_thousands_of_cents_without_drift() {
        let postings = vec![Posting::new(Flow::Income, dec("0.10")); 10_000];
        let balance = account_balance(Decimal::ZERO, "USD", &postings, &book()).unwrap();
        assert_eq!(balance.balance, dec("1000"));
    }

    #[test]
    fn unknown_currency_is_configuration_error() {
        let err = account_balance(Decimal::ZERO, "EUR", &[], &book()).unwrap_err();
        assert!(matches!(err, LedgerError::Configuration(_)));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let postings = [Posting::new(Flow::Income, dec("-1"))];
        let err = account_balance(Decimal::ZERO, "USD", &postings, &book()).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "amount"));
    }
}
