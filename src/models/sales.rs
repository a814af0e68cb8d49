// src/models/sales.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::inventory::validate_positive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Pix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = 1024)]
    pub display_id: i32,
    pub location_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub loyalty_discount: Decimal,
    pub total: Decimal,
    pub points_earned: i64,
    pub points_redeemed: i64,
    pub idempotency_key: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Decimal,
    /// Preço de tabela no momento da venda
    pub list_price: Decimal,
    /// Preço após promoção
    pub unit_price: Decimal,
    /// Desconto de combo rateado na linha
    pub discount: Decimal,
    /// Custo unitário (para o CMV)
    pub unit_cost: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub header: Sale,
    pub customer_name: Option<String>,
    pub items: Vec<SaleItem>,
}

/// Produto travado (FOR UPDATE) durante o registro da venda.
#[derive(Debug, Clone, FromRow)]
pub struct LockedProduct {
    pub id: Uuid,
    pub name: String,
    pub sale_price: Decimal,
    pub current_stock: Decimal,
    pub is_active: bool,
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemPayload {
    pub product_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalePayload {
    pub location_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    #[validate(length(min = 1, message = "A venda precisa de ao menos um item."), nested)]
    pub items: Vec<SaleItemPayload>,
    /// Pontos que o cliente quer trocar por desconto
    #[validate(range(min = 1, message = "A quantidade de pontos deve ser positiva."))]
    pub redeem_points: Option<i64>,
    /// Chave enviada pelo PDV para não duplicar a venda em reenvios
    #[validate(length(min = 1, max = 100))]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SaleQuery {
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

/// Linha já precificada, pronta para gravar.
#[derive(Debug, Clone)]
pub struct NewSaleItem {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub list_price: Decimal,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub unit_cost: Decimal,
}
