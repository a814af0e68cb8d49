// src/models/dashboard.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// 1. Resumo do Dia (Os Cards do Topo)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub sales_today: Decimal,      // Vendas concluídas hoje
    pub sales_count_today: i64,
    pub average_ticket: Decimal,   // Ticket médio de hoje
    pub payables_due_today: Decimal,
    pub low_stock_count: i64,
    pub orders_in_production: i64, // Ordens entre PREPARATION e FINISHING
}

// 2. Gráfico de Vendas (Últimos 30 dias)
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesChartEntry {
    pub date: Option<String>, // YYYY-MM-DD
    pub total: Option<Decimal>,
}

// 3. Curva ABC (Top Produtos)
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopProductEntry {
    pub product_name: String,
    pub total_quantity: Option<Decimal>,
    pub total_revenue: Option<Decimal>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyOverview {
    pub customers_with_points: i64,
    pub points_outstanding: i64,
    pub points_redeemed_month: i64,
}

// --- Layout (grade configurável por cargo) ---

/// Um card posicionado na grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPlacement {
    #[schema(example = "sales_today")]
    pub key: String,
    pub position: i32,
    #[schema(example = 2)]
    pub width: i32,
    #[schema(example = 1)]
    pub height: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardLayout {
    pub role_id: Uuid,
    pub widgets: Vec<WidgetPlacement>,
    /// true quando o cargo ainda não salvou um layout próprio
    pub is_default: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StoredLayout {
    pub widgets: sqlx::types::Json<Vec<WidgetPlacement>>,
    pub updated_at: DateTime<Utc>,
}

/// Widget visível ao usuário (catálogo do registro).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInfo {
    pub key: &'static str,
    pub title: &'static str,
    pub default_width: i32,
    pub default_height: i32,
    pub permission: &'static str,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveLayoutPayload {
    /// Ausente = cargo do próprio usuário
    pub role_id: Option<Uuid>,
    #[validate(length(max = 32, message = "Widgets demais no layout."))]
    pub widgets: Vec<WidgetPlacement>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LayoutQuery {
    /// Layout de outro cargo (exige dashboard:manage)
    pub role_id: Option<Uuid>,
}
