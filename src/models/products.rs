// src/models/products.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::inventory::{validate_not_negative, validate_positive, MeasureUnit};

// Produto final (o que vai para a vitrine)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "BOLO-CEN-01")]
    pub sku: String,
    #[schema(example = "Bolo de cenoura com chocolate")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "45.90")]
    pub sale_price: Decimal,
    pub current_stock: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Cabeçalho da ficha técnica
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub product_id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    /// Quantas unidades do produto uma receita rende
    #[schema(example = "12")]
    pub yield_quantity: Decimal,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Linha da ficha técnica já com os dados do insumo (para custeio).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLine {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: MeasureUnit,
    /// Quantidade por receita (rendimento inteiro)
    pub quantity: Decimal,
    pub loss_percent: Decimal,
    pub average_cost: Decimal,
    pub current_stock: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLineCost {
    #[serde(flatten)]
    pub line: RecipeLine,
    /// Quantidade por unidade produzida, já com a perda
    pub quantity_per_unit: Decimal,
    pub cost_per_unit: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub lines: Vec<RecipeLineCost>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductCosting {
    pub product_id: Uuid,
    pub unit_cost: Decimal,
    pub sale_price: Decimal,
    pub margin_value: Decimal,
    pub margin_percent: Decimal,
    /// Quanto dá para produzir com o estoque atual
    pub max_producible: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngredientRequirement {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: MeasureUnit,
    pub required: Decimal,
    pub available: Decimal,
    pub shortage: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct YieldSimulation {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub batches: Decimal,
    pub total_cost: Decimal,
    pub can_produce: bool,
    pub requirements: Vec<IngredientRequirement>,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(min = 1, message = "O SKU é obrigatório."))]
    pub sku: String,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    pub sale_price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeItemPayload {
    pub ingredient_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub loss_percent: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipePayload {
    #[validate(custom(function = "validate_positive"))]
    pub yield_quantity: Decimal,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "A ficha técnica precisa de ao menos um insumo."), nested)]
    pub items: Vec<RecipeItemPayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct YieldPayload {
    pub product_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
}

/// Custo unitário de produção por produto (snapshot do CMV na venda).
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ProductUnitCost {
    pub product_id: Uuid,
    pub unit_cost: Decimal,
}
