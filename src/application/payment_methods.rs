use super::context::LedgerContext;
use crate::domain::batch::{Guard, Write, WriteBatch};
use crate::domain::payment::{PaymentMethod, PaymentMethodType};
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Input for [`PaymentMethodService::create`]. New methods start enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaymentMethod {
    pub club_id: String,
    pub name: String,
    pub r#type: PaymentMethodType,
    #[serde(default)]
    pub requires_ref: bool,
    #[serde(default)]
    pub opens_pos: bool,
    #[serde(default)]
    pub sort_order: i32,
}

/// Payment method administration.
///
/// A club always keeps at least one enabled method. Disabling or deleting the last one is
/// checked inside the same commit that performs it.
#[derive(Clone)]
pub struct PaymentMethodService {
    ctx: LedgerContext,
}

impl PaymentMethodService {
    /// Creates a new service over the shared ledger context.
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Methods of a club in display order (`sort_order`, then id).
    pub async fn list(&self, club_id: &str, include_disabled: bool) -> Result<Vec<PaymentMethod>> {
        let methods = self.ctx.store.payment_methods(club_id).await?;
        Ok(methods
            .into_iter()
            .filter(|m| include_disabled || m.is_enabled)
            .collect())
    }

    /// Registers a new, enabled method for a club.
    pub async fn create(&self, input: NewPaymentMethod) -> Result<PaymentMethod> {
        if input.name.trim().is_empty() {
            return Err(LedgerError::ValidationError(
                "Payment method name is required".to_string(),
            ));
        }
        let method = PaymentMethod {
            id: Uuid::new_v4().to_string(),
            club_id: input.club_id,
            name: input.name,
            r#type: input.r#type,
            is_enabled: true,
            requires_ref: input.requires_ref,
            opens_pos: input.opens_pos,
            sort_order: input.sort_order,
        };
        let mut batch = WriteBatch::new();
        batch.write(Write::PutPaymentMethod(method.clone()));
        self.ctx.store.commit(batch).await?;

        info!(method_id = %method.id, club_id = %method.club_id, "Payment method created");
        Ok(method)
    }

    /// Enables or disables a method. Disabling the club's last enabled method is refused.
    pub async fn set_enabled(&self, method_id: &str, enabled: bool) -> Result<PaymentMethod> {
        let method = self.require(method_id).await?;
        if method.is_enabled == enabled {
            return Ok(method);
        }

        let mut updated = method.clone();
        updated.is_enabled = enabled;
        let mut batch = WriteBatch::new();
        batch.guard_payment_method(&method);
        if !enabled {
            batch.guard(floor_guard(&method));
        }
        batch.write(Write::PutPaymentMethod(updated.clone()));
        self.ctx.store.commit(batch).await?;

        info!(method_id, enabled, "Payment method toggled");
        Ok(updated)
    }

    /// Deletes a method. The club must keep another enabled method afterwards.
    pub async fn delete(&self, method_id: &str) -> Result<()> {
        let method = self.require(method_id).await?;

        let mut batch = WriteBatch::new();
        batch
            .guard_payment_method(&method)
            .guard(floor_guard(&method));
        batch.write(Write::DeletePaymentMethod(method.id.clone()));
        self.ctx.store.commit(batch).await?;

        info!(method_id, "Payment method deleted");
        Ok(())
    }

    async fn require(&self, method_id: &str) -> Result<PaymentMethod> {
        self.ctx
            .store
            .payment_method(method_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("payment method", method_id))
    }
}

fn floor_guard(method: &PaymentMethod) -> Guard {
    Guard::OtherEnabledPaymentMethod {
        club_id: method.club_id.clone(),
        excluding: method.id.clone(),
    }
}
