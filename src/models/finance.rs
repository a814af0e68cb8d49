// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::inventory::validate_positive;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "expense_group", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseGroup {
    Operating,
    Administrative,
    Tax,
    Financial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payable_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayableStatus {
    Pending,   // Aberto
    Partial,   // Pago Parcialmente
    Paid,      // Quitado
    Cancelled, // Cancelado
}

impl PayableStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PayableStatus::Pending => "PENDING",
            PayableStatus::Partial => "PARTIAL",
            PayableStatus::Paid => "PAID",
            PayableStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, PayableStatus::Pending | PayableStatus::Partial)
    }
}

// --- Structs ---

// Categorias de despesa (fin_categorias_despesa)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategory {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Energia elétrica")]
    pub name: String,
    pub expense_group: ExpenseGroup,
    pub is_active: bool,
}

// Contas a pagar (fin_contas_pagar)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payable {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub category_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    #[schema(example = "Conta de luz - março")]
    pub description: String,
    #[schema(example = "480.00")]
    pub amount: Decimal,
    /// Quanto falta pagar
    pub balance: Decimal,
    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub competence_date: NaiveDate,
    pub status: PayableStatus,
    #[schema(value_type = Option<String>, format = Date)]
    pub paid_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payable {
    /// Vencido é calculado na leitura, não fica gravado.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date < today
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayableView {
    #[serde(flatten)]
    pub payable: Payable,
    pub category_name: String,
    pub overdue: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct PayableWithCategory {
    #[sqlx(flatten)]
    pub payable: Payable,
    pub category_name: String,
}

// --- DRE ---

/// Totais de vendas do período (vendas canceladas ficam de fora).
#[derive(Debug, Clone, Default, FromRow)]
pub struct SalesTotals {
    pub gross_revenue: Decimal,
    pub discounts: Decimal,
    pub cost_of_goods_sold: Decimal,
    pub sales_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExpenseTotal {
    pub category_id: Uuid,
    pub category_name: String,
    pub expense_group: ExpenseGroup,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DreLine {
    pub label: String,
    pub value: Decimal,
    /// % sobre a receita líquida
    pub percent: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DreExpenseLine {
    pub category_id: Uuid,
    pub category_name: String,
    pub expense_group: ExpenseGroup,
    pub value: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DreReport {
    #[schema(value_type = String, format = Date)]
    pub from: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub to: NaiveDate,
    pub sales_count: i64,
    pub gross_revenue: DreLine,
    pub discounts: DreLine,
    pub net_revenue: DreLine,
    pub cost_of_goods_sold: DreLine,
    pub gross_profit: DreLine,
    pub expenses: Vec<DreExpenseLine>,
    pub total_expenses: DreLine,
    pub operating_result: DreLine,
}

// --- Metas de vendas (metas_vendas) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesTarget {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub location_id: Option<Uuid>,
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = 3)]
    pub month: i32,
    #[schema(example = "60000.00")]
    pub target_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetProgress {
    pub target_id: Uuid,
    pub location_id: Option<Uuid>,
    pub target_amount: Decimal,
    pub achieved: Decimal,
    pub percent: Decimal,
    pub remaining: Decimal,
    /// Projeção linear do mês: realizado / dias decorridos × dias do mês
    pub projection: Decimal,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategoryPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub expense_group: ExpenseGroup,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayablePayload {
    pub category_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    #[validate(length(min = 1, message = "A descrição é obrigatória."))]
    pub description: String,
    #[validate(custom(function = "validate_positive"))]
    pub amount: Decimal,
    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,
    /// Mês de competência para a DRE (padrão: vencimento)
    #[schema(value_type = Option<String>, format = Date)]
    pub competence_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PayableQuery {
    pub status: Option<PayableStatus>,
    /// Só as vencidas (calculado na leitura)
    pub overdue: Option<bool>,
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayPayload {
    /// Ausente = quita o saldo
    #[validate(custom(function = "validate_positive"))]
    pub amount: Option<Decimal>,
    #[schema(value_type = Option<String>, format = Date)]
    pub paid_at: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DreQuery {
    #[param(value_type = String, format = Date)]
    pub from: NaiveDate,
    #[param(value_type = String, format = Date)]
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetPayload {
    pub location_id: Option<Uuid>,
    #[validate(range(min = 2000, max = 2100, message = "Ano inválido."))]
    pub year: i32,
    #[validate(range(min = 1, max = 12, message = "Mês inválido."))]
    pub month: i32,
    #[validate(custom(function = "validate_positive"))]
    pub target_amount: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TargetPeriodQuery {
    pub year: i32,
    pub month: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TargetQuery {
    pub year: Option<i32>,
    pub month: Option<i32>,
}
