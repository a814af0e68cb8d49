// src/models/purchasing.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::inventory::{validate_not_negative, validate_positive, MeasureUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "purchase_order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "DRAFT",
            PurchaseOrderStatus::Sent => "SENT",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Mudanças manuais de status. RECEIVED só acontece pelo recebimento.
    pub fn can_change_to(self, target: PurchaseOrderStatus) -> bool {
        matches!(
            (self, target),
            (PurchaseOrderStatus::Draft, PurchaseOrderStatus::Sent)
                | (PurchaseOrderStatus::Draft, PurchaseOrderStatus::Cancelled)
                | (PurchaseOrderStatus::Sent, PurchaseOrderStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = 17)]
    pub display_id: i32,
    pub supplier_id: Uuid,
    pub status: PurchaseOrderStatus,
    #[schema(value_type = Option<String>, format = Date)]
    pub expected_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderItem {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: MeasureUnit,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

impl PurchaseOrderItem {
    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub header: PurchaseOrder,
    pub supplier_name: String,
    pub items: Vec<PurchaseOrderItem>,
}

/// Sugestão de compra de um insumo (resultado do MRP).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSuggestion {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: MeasureUnit,
    pub gross_requirement: Decimal,
    pub current_stock: Decimal,
    pub minimum_stock: Decimal,
    pub net_requirement: Decimal,
    pub package_size: Decimal,
    pub suggested_quantity: Decimal,
    pub unit_cost: Decimal,
    pub estimated_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSuggestionGroup {
    /// None = insumos sem fornecedor cadastrado
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub items: Vec<PurchaseSuggestion>,
    pub total_estimated_cost: Decimal,
}

/// Dados de planejamento por insumo usados no cálculo do MRP.
#[derive(Debug, Clone, FromRow)]
pub struct PlanningIngredient {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: MeasureUnit,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub current_stock: Decimal,
    pub minimum_stock: Decimal,
    pub purchase_package_size: Decimal,
    pub average_cost: Decimal,
    pub last_cost: Option<Decimal>,
}

/// Linha de ficha técnica para o MRP (por receita inteira).
#[derive(Debug, Clone, FromRow)]
pub struct PlanningRecipeLine {
    pub product_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub loss_percent: Decimal,
    pub yield_quantity: Decimal,
}

/// Teto de uma linha do plano extra.
pub const MAX_PLANNED_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

fn validate_planned_quantity(val: &Decimal) -> Result<(), ValidationError> {
    validate_positive(val)?;
    if *val > MAX_PLANNED_QUANTITY {
        let mut err = ValidationError::new("range");
        err.message = Some("A quantidade planejada deve ser no máximo 1.000.000.".into());
        return Err(err);
    }
    Ok(())
}

/// Quantidade de produto planejada (ordens abertas + plano extra).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlannedProduction {
    pub product_id: Uuid,
    #[validate(custom(function = "validate_planned_quantity"))]
    pub quantity: Decimal,
}

// ---
// Payloads
// ---

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    /// Considera ordens com prazo até hoje + N dias (padrão 7)
    #[validate(range(min = 0, max = 365, message = "O horizonte deve estar entre 0 e 365 dias."))]
    pub horizon_days: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub extra_plan: Vec<PlannedProduction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderItemPayload {
    pub ingredient_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderPayload {
    pub supplier_id: Uuid,
    #[schema(value_type = Option<String>, format = Date)]
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "O pedido precisa de ao menos um item."), nested)]
    pub items: Vec<PurchaseOrderItemPayload>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusPayload {
    pub status: PurchaseOrderStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveItemPayload {
    pub item_id: Uuid,
    pub lot_code: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceivePayload {
    /// Lote/validade por item; itens omitidos entram com lote gerado
    #[serde(default)]
    pub items: Vec<ReceiveItemPayload>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FromSuggestionsPayload {
    pub supplier_id: Uuid,
    #[validate(range(min = 0, max = 365, message = "O horizonte deve estar entre 0 e 365 dias."))]
    pub horizon_days: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub extra_plan: Vec<PlannedProduction>,
    #[schema(value_type = Option<String>, format = Date)]
    pub expected_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PurchaseOrderQuery {
    pub status: Option<PurchaseOrderStatus>,
}
