use super::money::Money;
use super::tax::{self, TaxType};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MIN_QUANTITY: u8 = 1;
pub const MAX_QUANTITY: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemType {
    GreenFee,
    Cart,
    Caddy,
    Merchandise,
    Other,
}

/// A chargeable unit held by exactly one player slot.
///
/// Amounts are per unit; cart and payment maths multiply by `quantity`.
/// Ownership history is two fields: the current `owner_player_id` and a fixed
/// `original_player_id` set on the first transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub tee_time_id: String,
    pub owner_player_id: String,
    pub r#type: LineItemType,
    pub description: String,
    pub base_amount: Money,
    pub tax_type: TaxType,
    pub tax_rate: Decimal,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub quantity: u8,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method_id: Option<String>,
    pub is_transferred: bool,
    pub transferred_from_player_id: Option<String>,
    pub transferred_to_player_id: Option<String>,
    pub original_player_id: Option<String>,
    pub transferred_at: Option<DateTime<Utc>>,
}

/// Input for creating a line item. Tax and total are derived, never supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLineItem {
    pub player_id: String,
    pub r#type: LineItemType,
    pub description: String,
    pub base_amount: Money,
    pub tax_type: TaxType,
    pub tax_rate: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: u8,
}

fn default_quantity() -> u8 {
    1
}

pub fn validate_quantity(quantity: u8) -> Result<(), LedgerError> {
    if (MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(LedgerError::ValidationError(format!(
            "Quantity must be between {} and {}, got {}",
            MIN_QUANTITY, MAX_QUANTITY, quantity
        )))
    }
}

impl LineItem {
    pub fn create(
        id: String,
        tee_time_id: String,
        input: NewLineItem,
    ) -> Result<Self, LedgerError> {
        validate_quantity(input.quantity)?;
        if input.base_amount.value() < Decimal::ZERO {
            return Err(LedgerError::ValidationError(
                "Base amount cannot be negative".to_string(),
            ));
        }
        if input.description.trim().is_empty() {
            return Err(LedgerError::ValidationError(
                "Description is required".to_string(),
            ));
        }
        tax::validate_rate(input.tax_rate)?;
        let breakdown = tax::compute(input.base_amount, input.tax_type, input.tax_rate);
        Ok(Self {
            id,
            tee_time_id,
            owner_player_id: input.player_id,
            r#type: input.r#type,
            description: input.description,
            base_amount: input.base_amount,
            tax_type: input.tax_type,
            tax_rate: input.tax_rate,
            tax_amount: breakdown.tax_amount,
            total_amount: breakdown.total_amount,
            quantity: input.quantity,
            is_paid: false,
            paid_at: None,
            payment_method_id: None,
            is_transferred: false,
            transferred_from_player_id: None,
            transferred_to_player_id: None,
            original_player_id: None,
            transferred_at: None,
        })
    }

    pub fn line_subtotal(&self) -> Money {
        self.base_amount.times(self.quantity)
    }

    pub fn line_tax(&self) -> Money {
        self.tax_amount.times(self.quantity)
    }

    pub fn line_total(&self) -> Money {
        self.total_amount.times(self.quantity)
    }

    /// The player this item returns to on undo.
    pub fn home_player_id(&self) -> Option<&str> {
        self.original_player_id
            .as_deref()
            .or(self.transferred_from_player_id.as_deref())
    }

    /// Quantity changes and removal need an unpaid item that is still with its owner.
    pub fn ensure_editable(&self) -> Result<(), LedgerError> {
        if self.is_paid {
            return Err(LedgerError::Conflict(format!(
                "Line item {} is already paid",
                self.id
            )));
        }
        if self.is_transferred {
            return Err(LedgerError::Conflict(format!(
                "Line item {} has been transferred",
                self.id
            )));
        }
        Ok(())
    }

    pub fn set_quantity(&mut self, quantity: u8) -> Result<(), LedgerError> {
        self.ensure_editable()?;
        validate_quantity(quantity)?;
        self.quantity = quantity;
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from_player_id: &str,
        to_player_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if self.owner_player_id != from_player_id {
            return Err(LedgerError::Conflict(format!(
                "Line item {} is not owned by player {}",
                self.id, from_player_id
            )));
        }
        self.ensure_editable()?;
        if from_player_id == to_player_id {
            return Err(LedgerError::ValidationError(
                "Cannot transfer a line item to its current owner".to_string(),
            ));
        }
        self.is_transferred = true;
        self.transferred_from_player_id = Some(from_player_id.to_string());
        self.transferred_to_player_id = Some(to_player_id.to_string());
        self.transferred_at = Some(at);
        if self.original_player_id.is_none() {
            self.original_player_id = Some(from_player_id.to_string());
        }
        self.owner_player_id = to_player_id.to_string();
        Ok(())
    }

    /// Returns the item to its original owner. `original_player_id` is kept.
    pub fn undo_transfer(&mut self) -> Result<(), LedgerError> {
        if self.is_paid {
            return Err(LedgerError::Conflict(format!(
                "Line item {} is already paid",
                self.id
            )));
        }
        if !self.is_transferred {
            return Err(LedgerError::Conflict(format!(
                "Line item {} has not been transferred",
                self.id
            )));
        }
        let home = self.home_player_id().map(str::to_string).ok_or_else(|| {
            LedgerError::IntegrityFault(format!(
                "Line item {} is transferred but has no previous owner",
                self.id
            ))
        })?;
        self.owner_player_id = home;
        self.is_transferred = false;
        self.transferred_from_player_id = None;
        self.transferred_to_player_id = None;
        self.transferred_at = None;
        Ok(())
    }

    pub fn mark_paid(
        &mut self,
        payment_method_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if self.is_paid {
            return Err(LedgerError::Conflict(format!(
                "Line item {} is already paid",
                self.id
            )));
        }
        self.is_paid = true;
        self.paid_at = Some(at);
        self.payment_method_id = Some(payment_method_id.to_string());
        Ok(())
    }

    /// Reopens a paid item after its payment has been voided.
    pub fn reopen(&mut self) {
        self.is_paid = false;
        self.paid_at = None;
        self.payment_method_id = None;
    }
}
