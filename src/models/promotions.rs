// src/models/promotions.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::inventory::{validate_not_negative, validate_positive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "promotion_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionKind {
    Percent, // value = % de desconto
    Fixed,   // value = desconto em R$ por unidade
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "Terça do brigadeiro")]
    pub name: String,
    pub kind: PromotionKind,
    #[schema(example = "15")]
    pub value: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|s| s <= now)
            && self.ends_at.is_none_or(|e| now <= e)
    }

    /// Desconto por unidade, limitado ao próprio preço.
    pub fn unit_discount(&self, unit_price: Decimal) -> Decimal {
        let discount = match self.kind {
            PromotionKind::Percent => unit_price * self.value / Decimal::ONE_HUNDRED,
            PromotionKind::Fixed => self.value,
        };
        discount.min(unit_price).max(Decimal::ZERO).round_dp(2)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Combo {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Café + Fatia de bolo")]
    pub name: String,
    #[schema(example = "14.90")]
    pub combo_price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComboItem {
    pub combo_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComboDetail {
    #[serde(flatten)]
    pub combo: Combo,
    pub items: Vec<ComboItem>,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_promotion_window"))]
pub struct PromotionPayload {
    pub product_id: Uuid,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub kind: PromotionKind,
    #[validate(custom(function = "validate_positive"))]
    pub value: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn validate_promotion_window(payload: &PromotionPayload) -> Result<(), ValidationError> {
    if payload.kind == PromotionKind::Percent && payload.value > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("percent_range");
        err.message = Some("O percentual não pode passar de 100.".into());
        return Err(err);
    }
    if let (Some(start), Some(end)) = (payload.starts_at, payload.ends_at) {
        if end < start {
            let mut err = ValidationError::new("window");
            err.message = Some("O fim da promoção é anterior ao início.".into());
            return Err(err);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComboItemPayload {
    pub product_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComboPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(custom(function = "validate_not_negative"))]
    pub combo_price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[validate(length(min = 1, message = "O combo precisa de ao menos um produto."), nested)]
    pub items: Vec<ComboItemPayload>,
}
