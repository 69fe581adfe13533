//! Tax computation for line items.
//!
//! Pricing itself lives upstream; the ledger only needs the split of a unit price into
//! tax and total under the club's tax policy.

use super::money::Money;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxType {
    /// Tax is added on top of the base amount.
    Add,
    /// The base amount already includes tax.
    Include,
    Exempt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxBreakdown {
    pub tax_amount: Money,
    pub total_amount: Money,
}

/// Tax rates are percentages in `0..=100`.
pub fn validate_rate(tax_rate: Decimal) -> Result<(), LedgerError> {
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE_HUNDRED {
        return Err(LedgerError::ValidationError(format!(
            "Tax rate must be between 0 and 100, got {}",
            tax_rate
        )));
    }
    Ok(())
}

/// Splits `base_amount` into tax and total. `tax_rate` is a percentage (7 means 7%).
///
/// Tax is rounded to cents, half away from zero. Callers validate the rate first.
pub fn compute(base_amount: Money, tax_type: TaxType, tax_rate: Decimal) -> TaxBreakdown {
    let rate = tax_rate / Decimal::ONE_HUNDRED;
    match tax_type {
        TaxType::Add => {
            let tax_amount = Money::new(base_amount.value() * rate).round_cents();
            TaxBreakdown {
                tax_amount,
                total_amount: base_amount + tax_amount,
            }
        }
        TaxType::Include => {
            let net = base_amount.value() / (Decimal::ONE + rate);
            let tax_amount = Money::new(base_amount.value() - net).round_cents();
            TaxBreakdown {
                tax_amount,
                total_amount: base_amount,
            }
        }
        TaxType::Exempt => TaxBreakdown {
            tax_amount: Money::ZERO,
            total_amount: base_amount,
        },
    }
}
