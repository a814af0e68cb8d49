// src/models/customers.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::inventory::{validate_not_negative, validate_positive};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Maria Oliveira")]
    pub full_name: String,
    pub document_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,
    #[schema(example = 320)]
    pub points_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyConfig {
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub enabled: bool,
    /// Pontos ganhos por R$ 1,00 gasto
    #[schema(example = "1")]
    pub points_per_currency: Decimal,
    /// Valor em R$ de cada ponto no resgate
    #[schema(example = "0.05")]
    pub currency_per_point: Decimal,
    #[schema(example = 100)]
    pub min_redeem_points: i64,
    pub updated_at: DateTime<Utc>,
}

impl LoyaltyConfig {
    /// Configuração padrão (programa desligado) até a loja salvar a sua.
    pub fn disabled(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            enabled: false,
            points_per_currency: Decimal::ONE,
            currency_per_point: Decimal::new(5, 2),
            min_redeem_points: 100,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "loyalty_reason", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoyaltyReason {
    Earn,
    Redeem,
    Reversal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyEntry {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub sale_id: Option<Uuid>,
    /// Positivo = crédito, negativo = débito
    pub points: i64,
    pub reason: LoyaltyReason,
    pub created_at: DateTime<Utc>,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub full_name: String,
    pub document_number: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CustomerQuery {
    /// Busca por nome, documento ou telefone
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyConfigPayload {
    pub enabled: bool,
    #[validate(custom(function = "validate_not_negative"))]
    pub points_per_currency: Decimal,
    #[validate(custom(function = "validate_positive"))]
    pub currency_per_point: Decimal,
    #[validate(range(min = 0, message = "O mínimo para resgate não pode ser negativo."))]
    pub min_redeem_points: i64,
}
