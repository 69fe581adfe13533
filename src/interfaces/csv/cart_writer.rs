use crate::application::carts::SlotCart;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Flat, two-decimal view of a [`SlotCart`] for CSV output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSummaryRow {
    pub player: String,
    pub name: String,
    pub tee_time: String,
    pub items: usize,
    pub subtotal: String,
    pub tax: String,
    pub total: String,
    pub paid: String,
    pub balance: String,
    pub settled: bool,
}

impl From<&SlotCart> for CartSummaryRow {
    fn from(cart: &SlotCart) -> Self {
        Self {
            player: cart.player_id.clone(),
            name: cart.player_name.clone(),
            tee_time: cart.tee_time_id.clone(),
            items: cart.items.len() + cart.transferred_in.len(),
            subtotal: cart.subtotal.to_string(),
            tax: cart.tax_total.to_string(),
            total: cart.grand_total.to_string(),
            paid: cart.paid_amount.to_string(),
            balance: cart.balance_due.to_string(),
            settled: cart.is_settled,
        }
    }
}

pub struct CartWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CartWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_carts<'a>(&mut self, carts: impl IntoIterator<Item = &'a SlotCart>) -> Result<()> {
        for cart in carts {
            self.writer.serialize(CartSummaryRow::from(cart))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
