// src/models/inventory.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- 1. Categorias ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Laticínios")]
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- 2. Fornecedores ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Distribuidora Doce Vida")]
    pub name: String,
    pub document_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(example = 3)]
    pub lead_time_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "measure_unit", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasureUnit {
    Kg,
    G,
    L,
    Ml,
    Un,
}

// --- 3. Insumos ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    #[schema(example = "Farinha de trigo")]
    pub name: String,
    pub unit: MeasureUnit,
    #[schema(example = "25.5")]
    pub current_stock: Decimal,
    #[schema(example = "10")]
    pub minimum_stock: Decimal,
    /// Múltiplo de compra (ex: saco de 5 kg)
    #[schema(example = "5")]
    pub purchase_package_size: Decimal,
    pub average_cost: Decimal,
    pub last_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 4. Lotes ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngredientLot {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub ingredient_id: Uuid,
    pub location_id: Option<Uuid>,
    #[schema(example = "L2025-031")]
    pub lot_code: String,
    #[schema(value_type = Option<String>, format = Date, example = "2025-12-31")]
    pub expiration_date: Option<NaiveDate>,
    pub initial_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

// --- 5. Movimentações de Estoque ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "stock_movement_reason", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum StockMovementReason {
    Purchase,
    ProductionConsumption,
    ProductionLoss,
    Spoilage,
    Correction,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity_changed: Decimal,
    pub reason: StockMovementReason,
    pub unit_cost: Option<Decimal>,
    /// Pedido de compra / ordem de produção de origem
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Painel de alertas: estoque baixo + lotes vencendo/vencidos.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAlerts {
    pub low_stock: Vec<Ingredient>,
    pub expiring_lots: Vec<ExpiringLot>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringLot {
    pub lot_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub lot_code: String,
    #[schema(value_type = String, format = Date)]
    pub expiration_date: NaiveDate,
    pub remaining_quantity: Decimal,
    /// Negativo quando já venceu
    pub days_to_expire: i32,
}

// ---
// Payloads
// ---

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub document_number: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(range(min = 0, message = "O prazo de entrega não pode ser negativo."))]
    #[serde(default)]
    pub lead_time_days: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngredientPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub unit: MeasureUnit,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub minimum_stock: Decimal,
    #[validate(custom(function = "validate_positive"))]
    #[serde(default = "default_package_size")]
    pub purchase_package_size: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub last_cost: Option<Decimal>,
}

fn default_package_size() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockEntryPayload {
    pub ingredient_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub unit_cost: Decimal,
    pub lot_code: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub expiration_date: Option<NaiveDate>,
    pub location_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Motivos aceitos no ajuste manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentReason {
    Spoilage,
    Correction,
}

impl From<AdjustmentReason> for StockMovementReason {
    fn from(reason: AdjustmentReason) -> Self {
        match reason {
            AdjustmentReason::Spoilage => StockMovementReason::Spoilage,
            AdjustmentReason::Correction => StockMovementReason::Correction,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentPayload {
    pub ingredient_id: Uuid,
    /// Com sinal: negativo baixa estoque
    #[schema(example = "-1.5")]
    pub quantity: Decimal,
    pub reason: AdjustmentReason,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LotQuery {
    pub ingredient_id: Option<Uuid>,
    /// Lotes que vencem até hoje + N dias (0 a 365)
    #[validate(range(min = 0, max = 365, message = "O prazo deve estar entre 0 e 365 dias."))]
    pub expiring_within_days: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MovementQuery {
    pub ingredient_id: Option<Uuid>,
}
