//! Document total computation.
//!
//! Every line total and every tax line is rounded to the currency precision on
//! its own, then summed. The aggregate is never rounded again, so the stored
//! totals always add up exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{check_storable, percent_of, round_to, MAX_PRECISION};
use super::LedgerError;

const QUANTITY_SCALE: u32 = 2;

/// Largest quantity a `NUMERIC(7,2)` column holds.
fn max_quantity() -> Decimal {
    Decimal::new(9_999_999, QUANTITY_SCALE)
}

/// A tax applied to a document line, with the rate frozen at the time the
/// line was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLine {
    pub tax_id: Uuid,
    pub name: String,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub item_id: Option<Uuid>,
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub taxes: Vec<TaxLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the subtotal.
    Percent(Decimal),
    /// Flat amount in document currency.
    Fixed(Decimal),
}

impl Discount {
    pub fn kind(&self) -> &'static str {
        match self {
            Discount::Percent(_) => "percent",
            Discount::Fixed(_) => "fixed",
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            Discount::Percent(v) | Discount::Fixed(v) => *v,
        }
    }

    pub fn from_parts(kind: &str, value: Decimal) -> Result<Self, LedgerError> {
        match kind {
            "percent" => Ok(Discount::Percent(value)),
            "fixed" => Ok(Discount::Fixed(value)),
            other => Err(LedgerError::validation(
                "discount_type",
                format!("unknown discount type '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedItemTax {
    pub tax_id: Uuid,
    pub name: String,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedItem {
    pub item_id: Option<Uuid>,
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Pre-tax line total.
    pub total: Decimal,
    pub tax: Decimal,
    pub taxes: Vec<ComputedItemTax>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalCode {
    Subtotal,
    Discount,
    Tax,
    Total,
}

impl TotalCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalCode::Subtotal => "subtotal",
            TotalCode::Discount => "discount",
            TotalCode::Tax => "tax",
            TotalCode::Total => "total",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "subtotal" => Some(TotalCode::Subtotal),
            "discount" => Some(TotalCode::Discount),
            "tax" => Some(TotalCode::Tax),
            "total" => Some(TotalCode::Total),
            _ => None,
        }
    }

    pub fn sort_order(&self) -> i32 {
        match self {
            TotalCode::Subtotal => 1,
            TotalCode::Discount => 2,
            TotalCode::Tax => 3,
            TotalCode::Total => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TotalCode::Subtotal => "Subtotal",
            TotalCode::Discount => "Discount",
            TotalCode::Tax => "Tax",
            TotalCode::Total => "Total",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedTotal {
    pub code: TotalCode,
    pub name: String,
    pub amount: Decimal,
    pub sort_order: i32,
}

impl ComputedTotal {
    fn new(code: TotalCode, amount: Decimal) -> Self {
        Self {
            code,
            name: code.label().to_string(),
            amount,
            sort_order: code.sort_order(),
        }
    }
}

/// Everything a document write persists: lines, their taxes, the totals rows
/// and the header amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCalculation {
    pub items: Vec<ComputedItem>,
    pub totals: Vec<ComputedTotal>,
    /// Always equal to the `total` row.
    pub amount: Decimal,
}

impl DocumentCalculation {
    pub fn total(&self, code: TotalCode) -> Decimal {
        self.totals
            .iter()
            .filter(|t| t.code == code)
            .map(|t| t.amount)
            .sum()
    }
}

fn validate_line(index: usize, line: &LineInput) -> Result<(), LedgerError> {
    let field = |name: &str| format!("items[{}].{}", index, name);

    if line.quantity <= Decimal::ZERO {
        return Err(LedgerError::validation(
            field("quantity"),
            "quantity must be greater than zero",
        ));
    }
    if line.quantity.normalize().scale() > QUANTITY_SCALE || line.quantity > max_quantity() {
        return Err(LedgerError::validation(
            field("quantity"),
            format!(
                "quantity must have at most {} decimals and not exceed {}",
                QUANTITY_SCALE,
                max_quantity()
            ),
        ));
    }
    if line.price.is_sign_negative() && !line.price.is_zero() {
        return Err(LedgerError::validation(
            field("price"),
            "price must not be negative",
        ));
    }
    check_storable(&field("price"), line.price)?;
    for tax in &line.taxes {
        if tax.rate < Decimal::ZERO {
            return Err(LedgerError::validation(
                field("taxes"),
                format!("tax '{}' has a negative rate", tax.name),
            ));
        }
        check_storable(&field("taxes"), tax.rate)?;
    }
    Ok(())
}

/// Inputs are bounded by [`validate_line`], so the products below cannot
/// overflow; only the results still need to fit their columns.
fn compute_line(
    index: usize,
    line: &LineInput,
    precision: u32,
) -> Result<ComputedItem, LedgerError> {
    let field = |name: &str| format!("items[{}].{}", index, name);
    let total = check_storable(
        &field("price"),
        round_to(line.quantity * line.price, precision),
    )?;

    let taxes: Vec<ComputedItemTax> = line
        .taxes
        .iter()
        .map(|t| ComputedItemTax {
            tax_id: t.tax_id,
            name: t.name.clone(),
            rate: t.rate,
            amount: percent_of(total, t.rate, precision),
        })
        .collect();
    let tax = check_storable(&field("taxes"), taxes.iter().map(|t| t.amount).sum())?;

    Ok(ComputedItem {
        item_id: line.item_id,
        name: line.name.clone(),
        quantity: line.quantity,
        price: line.price,
        total,
        tax,
        taxes,
    })
}

fn discount_amount(
    discount: Discount,
    subtotal: Decimal,
    tax: Decimal,
    precision: u32,
) -> Result<Decimal, LedgerError> {
    let amount = match discount {
        Discount::Percent(rate) => {
            if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
                return Err(LedgerError::validation(
                    "discount",
                    "discount percentage must be between 0 and 100",
                ));
            }
            percent_of(subtotal, rate, precision)
        }
        Discount::Fixed(value) => {
            if value < Decimal::ZERO {
                return Err(LedgerError::validation(
                    "discount",
                    "discount must not be negative",
                ));
            }
            round_to(check_storable("discount", value)?, precision)
        }
    };

    if amount > subtotal + tax {
        return Err(LedgerError::validation(
            "discount",
            format!("discount {} exceeds the document total {}", amount, subtotal + tax),
        ));
    }
    Ok(amount)
}

/// Compute lines, taxes and totals rows for a document in its own currency.
///
/// The result is a pure function of the input: same lines, discount and
/// precision always yield identical rows.
pub fn compute_document_totals(
    lines: &[LineInput],
    discount: Option<Discount>,
    precision: u32,
) -> Result<DocumentCalculation, LedgerError> {
    if precision > MAX_PRECISION {
        return Err(LedgerError::validation(
            "precision",
            format!("precision must be between 0 and {}", MAX_PRECISION),
        ));
    }
    for (index, line) in lines.iter().enumerate() {
        validate_line(index, line)?;
    }

    let items = lines
        .iter()
        .enumerate()
        .map(|(index, line)| compute_line(index, line, precision))
        .collect::<Result<Vec<_>, _>>()?;

    let subtotal = check_storable("items", items.iter().map(|i| i.total).sum())?;
    let tax = check_storable("items", items.iter().map(|i| i.tax).sum())?;

    let mut totals = vec![ComputedTotal::new(TotalCode::Subtotal, subtotal)];

    let discount = match discount {
        Some(d) => {
            let amount = discount_amount(d, subtotal, tax, precision)?;
            totals.push(ComputedTotal::new(TotalCode::Discount, amount));
            amount
        }
        None => Decimal::ZERO,
    };

    totals.push(ComputedTotal::new(TotalCode::Tax, tax));

    let amount = check_storable("items", subtotal + tax - discount)?;
    totals.push(ComputedTotal::new(TotalCode::Total, amount));

    Ok(DocumentCalculation {
        items,
        totals,
        amount,
    })
}

/// Compare a stored document amount with its recomputed grand total.
pub fn verify_amount(
    document_id: Uuid,
    stored: Decimal,
    calculation: &DocumentCalculation,
) -> Result<(), LedgerError> {
    if stored != calculation.amount {
        return Err(LedgerError::Consistency {
            document_id,
            stored,
            computed: calculation.amount,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tax(name: &str, rate: &str) -> TaxLine {
        TaxLine {
            tax_id: Uuid::new_v4(),
            name: name.into(),
            rate: dec(rate),
        }
    }

    fn line(quantity: &str, price: &str, taxes: Vec<TaxLine>) -> LineInput {
        LineInput {
            item_id: None,
            name: "Widget".into(),
            quantity: dec(quantity),
            price: dec(price),
            taxes,
        }
    }

    #[test]
    fn single_item_with_ten_percent_tax() {
        let calc =
            compute_document_totals(&[line("2", "50.00", vec![tax("VAT", "10")])], None, 2)
                .unwrap();

        assert_eq!(calc.total(TotalCode::Subtotal), dec("100.00"));
        assert_eq!(calc.total(TotalCode::Tax), dec("10.00"));
        assert_eq!(calc.total(TotalCode::Total), dec("110.00"));
        assert_eq!(calc.amount, dec("110.00"));
        assert_eq!(calc.items[0].total, dec("100.00"));
        assert_eq!(calc.items[0].tax, dec("10.00"));
    }

    #[test]
    fn totals_rows_are_in_fixed_order() {
        let calc = compute_document_totals(
            &[line("1", "10", vec![tax("VAT", "5")])],
            Some(Discount::Fixed(dec("1"))),
            2,
        )
        .unwrap();

        let codes: Vec<TotalCode> = calc.totals.iter().map(|t| t.code).collect();
        assert_eq!(
            codes,
            vec![
                TotalCode::Subtotal,
                TotalCode::Discount,
                TotalCode::Tax,
                TotalCode::Total
            ]
        );
        let orders: Vec<i32> = calc.totals.iter().map(|t| t.sort_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);

        let plain = compute_document_totals(&[line("1", "10", vec![])], None, 2).unwrap();
        assert!(plain.totals.iter().all(|t| t.code != TotalCode::Discount));
        assert_eq!(plain.totals.len(), 3);
    }

    #[test]
    fn tax_is_rounded_per_line_not_on_the_sum() {
        let lines = [
            line("1", "1.15", vec![tax("Standard", "10")]),
            line("1", "1.15", vec![tax("Standard", "10")]),
            line("1", "1.15", vec![tax("Reduced", "7")]),
        ];
        let calc = compute_document_totals(&lines, None, 2).unwrap();

        let unrounded: Decimal = lines
            .iter()
            .map(|l| l.quantity * l.price * l.taxes[0].rate / Decimal::ONE_HUNDRED)
            .sum();

        assert_eq!(calc.total(TotalCode::Tax), dec("0.32"));
        assert_eq!(round_to(unrounded, 2), dec("0.31"));
        assert_ne!(calc.total(TotalCode::Tax), round_to(unrounded, 2));
    }

    #[test]
    fn multiple_taxes_on_one_line_round_independently() {
        let calc = compute_document_totals(
            &[line("3", "3.35", vec![tax("State", "6.25"), tax("City", "2.25")])],
            None,
            2,
        )
        .unwrap();

        let item = &calc.items[0];
        assert_eq!(item.total, dec("10.05"));
        // 0.628125 and 0.226125
        assert_eq!(item.taxes[0].amount, dec("0.63"));
        assert_eq!(item.taxes[1].amount, dec("0.23"));
        assert_eq!(item.tax, dec("0.86"));
        assert_eq!(calc.amount, dec("10.91"));
    }

    #[test]
    fn amount_matches_rows_after_many_recomputations() {
        let lines = [
            line("1.5", "19.99", vec![tax("VAT", "21")]),
            line("3", "0.333", vec![tax("VAT", "21"), tax("Eco", "0.5")]),
            line("7.25", "12.3456", vec![]),
        ];
        let discount = Some(Discount::Percent(dec("2.5")));
        let first = compute_document_totals(&lines, discount, 2).unwrap();

        for _ in 0..10_000 {
            let calc = compute_document_totals(&lines, discount, 2).unwrap();
            assert_eq!(calc.amount, first.amount);
            assert_eq!(
                calc.amount,
                calc.total(TotalCode::Subtotal) + calc.total(TotalCode::Tax)
                    - calc.total(TotalCode::Discount)
            );
            assert_eq!(calc.amount, calc.total(TotalCode::Total));
        }
    }

    #[test]
    fn recomputation_is_byte_identical() {
        let lines = [line("2", "9.995", vec![tax("VAT", "19")])];
        let a = compute_document_totals(&lines, Some(Discount::Fixed(dec("0.5"))), 2).unwrap();
        let b = compute_document_totals(&lines, Some(Discount::Fixed(dec("0.5"))), 2).unwrap();

        assert_eq!(
            serde_json::to_string(&a.totals).unwrap(),
            serde_json::to_string(&b.totals).unwrap()
        );
        assert_eq!(a, b);
    }

    #[test]
    fn percent_discount_applies_to_subtotal() {
        let calc = compute_document_totals(
            &[line("1", "200", vec![tax("VAT", "10")])],
            Some(Discount::Percent(dec("10"))),
            2,
        )
        .unwrap();
        assert_eq!(calc.total(TotalCode::Discount), dec("20"));
        assert_eq!(calc.amount, dec("200"));
    }

    #[test]
    fn discount_larger_than_total_is_rejected() {
        let err = compute_document_totals(
            &[line("1", "10", vec![])],
            Some(Discount::Fixed(dec("10.01"))),
            2,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "discount"));
    }

    #[test]
    fn zero_items_yield_zero_amount() {
        let calc = compute_document_totals(&[], None, 2).unwrap();
        assert_eq!(calc.amount, Decimal::ZERO);
        assert!(calc.items.is_empty());
        assert_eq!(calc.total(TotalCode::Subtotal), Decimal::ZERO);
    }

    #[test]
    fn rejects_bad_line_input() {
        let zero_qty = compute_document_totals(&[line("0", "1", vec![])], None, 2).unwrap_err();
        assert!(
            matches!(zero_qty, LedgerError::Validation { ref field, .. } if field == "items[0].quantity")
        );

        let three_decimals = compute_document_totals(&[line("1.234", "1", vec![])], None, 2);
        assert!(three_decimals.is_err());

        let negative_price =
            compute_document_totals(&[line("1", "-0.01", vec![])], None, 2).unwrap_err();
        assert!(
            matches!(negative_price, LedgerError::Validation { ref field, .. } if field == "items[0].price")
        );

        let negative_tax =
            compute_document_totals(&[line("1", "1", vec![tax("Bad", "-1")])], None, 2);
        assert!(negative_tax.is_err());
    }

    #[test]
    fn price_finer_than_storage_is_rejected() {
        let err = compute_document_totals(&[line("1000", "0.012345", vec![])], None, 2).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "items[0].price"));

        // The stored price must reproduce the stored total.
        let stored = compute_document_totals(&[line("1000", "0.0123", vec![])], None, 2).unwrap();
        assert_eq!(stored.items[0].total, dec("12.30"));
        assert_eq!(stored.items[0].total, round_to(dec("1000") * stored.items[0].price, 2));
    }

    #[test]
    fn oversized_values_are_rejected_without_panicking() {
        let huge_price = compute_document_totals(
            &[line("99999.99", "1000000000000000000000000", vec![])],
            None,
            2,
        )
        .unwrap_err();
        assert!(
            matches!(huge_price, LedgerError::Validation { ref field, .. } if field == "items[0].price")
        );

        // Each input fits, but the line total does not.
        let huge_total =
            compute_document_totals(&[line("99999.99", "99999999999", vec![])], None, 2)
                .unwrap_err();
        assert!(
            matches!(huge_total, LedgerError::Validation { ref field, .. } if field == "items[0].price")
        );

        let huge_rate = compute_document_totals(
            &[line("1", "1", vec![tax("Bad", "1000000000000000000000000")])],
            None,
            2,
        );
        assert!(huge_rate.is_err());
    }

    #[test]
    fn trailing_zero_quantity_is_accepted() {
        assert!(compute_document_totals(&[line("1.5000", "2", vec![])], None, 2).is_ok());
    }

    #[test]
    fn verify_amount_detects_drift() {
        let calc = compute_document_totals(&[line("2", "50", vec![tax("VAT", "10")])], None, 2)
            .unwrap();
        let id = Uuid::new_v4();

        assert!(verify_amount(id, dec("110.0000"), &calc).is_ok());
        assert_eq!(
            verify_amount(id, dec("110.01"), &calc).unwrap_err(),
            LedgerError::Consistency {
                document_id: id,
                stored: dec("110.01"),
                computed: dec("110"),
            }
        );
    }

    #[test]
    fn discount_round_trips_through_parts() {
        let d = Discount::Percent(dec("12.5"));
        assert_eq!(Discount::from_parts(d.kind(), d.value()).unwrap(), d);
        assert!(Discount::from_parts("bogus", Decimal::ONE).is_err());
    }
}
