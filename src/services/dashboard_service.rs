// src/services/dashboard_service.rs

use std::collections::HashSet;

use chrono::{Datelike, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomerRepository, DashboardRepository, InventoryRepository, ProductionRepository, RbacRepository},
    models::{
        dashboard::{
            DashboardLayout, DashboardSummary, LoyaltyOverview, SalesChartEntry, SaveLayoutPayload, TopProductEntry,
            WidgetInfo, WidgetPlacement,
        },
        finance::TargetProgress,
        inventory::{ExpiringLot, Ingredient},
        production::BoardCard,
    },
    services::{finance_service::FinanceService, inventory_service::EXPIRY_ALERT_DAYS},
};

pub const MIN_WIDGET_SIZE: i32 = 1;
pub const MAX_WIDGET_SIZE: i32 = 4;
const MANAGE_PERMISSION: &str = "dashboard:manage";

// ---
// Registro de widgets
// ---

/// Definição estática de um card do dashboard.
/// Cada widget se registra com `inventory::submit!`, sem lista central.
#[derive(Debug)]
pub struct WidgetDef {
    pub key: &'static str,
    pub title: &'static str,
    pub default_width: i32,
    pub default_height: i32,
    /// Permissão exigida para ver o card
    pub permission: &'static str,
    /// Ordem no layout padrão
    pub order: u32,
}

::inventory::collect!(WidgetDef);

::inventory::submit! {
    WidgetDef { key: "sales_today", title: "Vendas de hoje", default_width: 1, default_height: 1, permission: "sales:read", order: 0 }
}
::inventory::submit! {
    WidgetDef { key: "sales_chart", title: "Vendas (30 dias)", default_width: 3, default_height: 2, permission: "sales:read", order: 1 }
}
::inventory::submit! {
    WidgetDef { key: "top_products", title: "Produtos mais vendidos", default_width: 2, default_height: 2, permission: "sales:read", order: 2 }
}
::inventory::submit! {
    WidgetDef { key: "low_stock", title: "Estoque baixo", default_width: 2, default_height: 2, permission: "inventory:read", order: 3 }
}
::inventory::submit! {
    WidgetDef { key: "expiring_lots", title: "Lotes vencendo", default_width: 2, default_height: 2, permission: "inventory:read", order: 4 }
}
::inventory::submit! {
    WidgetDef { key: "production_queue", title: "Fila de produção", default_width: 2, default_height: 2, permission: "production:read", order: 5 }
}
::inventory::submit! {
    WidgetDef { key: "payables_due", title: "Contas a vencer", default_width: 2, default_height: 1, permission: "finance:read", order: 6 }
}
::inventory::submit! {
    WidgetDef { key: "sales_target", title: "Meta do mês", default_width: 1, default_height: 1, permission: "finance:read", order: 7 }
}
::inventory::submit! {
    WidgetDef { key: "loyalty_overview", title: "Fidelidade", default_width: 1, default_height: 1, permission: "customers:write", order: 8 }
}

impl WidgetDef {
    fn info(&self) -> WidgetInfo {
        WidgetInfo {
            key: self.key,
            title: self.title,
            default_width: self.default_width,
            default_height: self.default_height,
            permission: self.permission,
        }
    }

    fn default_placement(&self, position: i32) -> WidgetPlacement {
        WidgetPlacement {
            key: self.key.to_string(),
            position,
            width: self.default_width,
            height: self.default_height,
        }
    }
}

/// Todos os widgets registrados, na ordem do layout padrão.
pub fn registry() -> Vec<&'static WidgetDef> {
    let mut widgets: Vec<&'static WidgetDef> = ::inventory::iter::<WidgetDef>.into_iter().collect();
    widgets.sort_by_key(|w| w.order);
    widgets
}

pub fn find_widget(key: &str) -> Option<&'static WidgetDef> {
    ::inventory::iter::<WidgetDef>.into_iter().find(|w| w.key == key)
}

pub fn default_layout() -> Vec<WidgetPlacement> {
    registry()
        .into_iter()
        .enumerate()
        .map(|(i, w)| w.default_placement(i as i32))
        .collect()
}

/// Valida o layout vindo do editor e renumera as posições a partir de 0.
pub fn normalize_layout(mut widgets: Vec<WidgetPlacement>) -> Result<Vec<WidgetPlacement>, AppError> {
    let mut seen = HashSet::new();

    for widget in &widgets {
        if find_widget(&widget.key).is_none() {
            return Err(AppError::InvalidLayout(format!("widget desconhecido '{}'", widget.key)));
        }
        if !seen.insert(widget.key.as_str()) {
            return Err(AppError::InvalidLayout(format!("widget '{}' repetido", widget.key)));
        }
        let valid = MIN_WIDGET_SIZE..=MAX_WIDGET_SIZE;
        if !valid.contains(&widget.width) || !valid.contains(&widget.height) {
            return Err(AppError::InvalidLayout(format!(
                "tamanho de '{}' fora do intervalo {MIN_WIDGET_SIZE}..{MAX_WIDGET_SIZE}",
                widget.key
            )));
        }
    }

    // Ordem estável: empates mantêm a ordem recebida
    widgets.sort_by_key(|w| w.position);
    for (i, widget) in widgets.iter_mut().enumerate() {
        widget.position = i as i32;
    }
    Ok(widgets)
}

/// Remove os cards que o cargo não pode ver e renumera as posições sem buracos.
pub fn visible_placements(widgets: Vec<WidgetPlacement>, slugs: &[String]) -> Vec<WidgetPlacement> {
    let mut visible: Vec<WidgetPlacement> = widgets
        .into_iter()
        .filter(|w| find_widget(&w.key).is_some_and(|def| slugs.iter().any(|s| s == def.permission)))
        .collect();

    visible.sort_by_key(|w| w.position);
    for (i, widget) in visible.iter_mut().enumerate() {
        widget.position = i as i32;
    }
    visible
}

/// Dados de um card, despachados pela chave do widget.
#[derive(Debug, Serialize)]
#[serde(tag = "key", content = "data", rename_all = "snake_case")]
pub enum WidgetData {
    SalesToday { total: Decimal, count: i64, average_ticket: Decimal },
    SalesChart(Vec<SalesChartEntry>),
    TopProducts(Vec<TopProductEntry>),
    LowStock(Vec<Ingredient>),
    ExpiringLots(Vec<ExpiringLot>),
    ProductionQueue(Vec<BoardCard>),
    PayablesDue { due_today: Decimal, open_until_week: Decimal },
    SalesTarget(Vec<TargetProgress>),
    LoyaltyOverview(LoyaltyOverview),
}

pub fn average_ticket(total: Decimal, count: i64) -> Decimal {
    if count <= 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(count)).round_dp(2)
}

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
    rbac_repo: RbacRepository,
    inventory_repo: InventoryRepository,
    production_repo: ProductionRepository,
    customer_repo: CustomerRepository,
    finance_service: FinanceService,
}

impl DashboardService {
    pub fn new(
        repo: DashboardRepository,
        rbac_repo: RbacRepository,
        inventory_repo: InventoryRepository,
        production_repo: ProductionRepository,
        customer_repo: CustomerRepository,
        finance_service: FinanceService,
    ) -> Self {
        Self { repo, rbac_repo, inventory_repo, production_repo, customer_repo, finance_service }
    }

    /// Catálogo de widgets que o cargo pode ver.
    pub async fn widgets(&self, conn: &mut PgConnection, role_id: Uuid) -> Result<Vec<WidgetInfo>, AppError> {
        let slugs = self.rbac_repo.role_permission_slugs(&mut *conn, role_id).await?;

        Ok(registry()
            .into_iter()
            .filter(|w| slugs.iter().any(|s| s == w.permission))
            .map(WidgetDef::info)
            .collect())
    }

    pub async fn get_layout(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        caller_role_id: Uuid,
        role_id: Option<Uuid>,
    ) -> Result<DashboardLayout, AppError> {
        let role_id = self.target_role(&mut *conn, tenant_id, caller_role_id, role_id).await?;
        let slugs = self.rbac_repo.role_permission_slugs(&mut *conn, role_id).await?;

        let layout = match self.repo.find_layout(&mut *conn, tenant_id, role_id).await? {
            Some(stored) => DashboardLayout {
                role_id,
                widgets: visible_placements(stored.widgets.0, &slugs),
                is_default: false,
                updated_at: Some(stored.updated_at),
            },
            None => DashboardLayout {
                role_id,
                widgets: visible_placements(default_layout(), &slugs),
                is_default: true,
                updated_at: None,
            },
        };
        Ok(layout)
    }

    pub async fn save_layout(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        caller_role_id: Uuid,
        payload: SaveLayoutPayload,
    ) -> Result<DashboardLayout, AppError> {
        let role_id = self.target_role(&mut *conn, tenant_id, caller_role_id, payload.role_id).await?;

        let widgets = normalize_layout(payload.widgets)?;
        let stored = self.repo.save_layout(&mut *conn, tenant_id, role_id, &widgets).await?;

        tracing::info!(%tenant_id, %role_id, widgets = widgets.len(), "Layout do dashboard salvo");
        Ok(DashboardLayout {
            role_id,
            widgets: stored.widgets.0,
            is_default: false,
            updated_at: Some(stored.updated_at),
        })
    }

    /// Grava o layout padrão de um cargo recém-criado.
    pub(crate) async fn seed_default_layout(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), AppError> {
        self.repo.save_layout(&mut *conn, tenant_id, role_id, &default_layout()).await?;
        Ok(())
    }

    pub async fn widget_data(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        role_id: Uuid,
        key: &str,
    ) -> Result<WidgetData, AppError> {
        let widget = find_widget(key).ok_or_else(|| AppError::ResourceNotFound("Widget".into()))?;
        let slugs = self.rbac_repo.role_permission_slugs(&mut *conn, role_id).await?;
        if !slugs.iter().any(|s| s == widget.permission) {
            return Err(AppError::PermissionDenied(widget.permission.to_string()));
        }

        let today = Utc::now().date_naive();

        let data = match widget.key {
            "sales_today" => {
                let (total, count) = self.repo.sales_on(&mut *conn, tenant_id, today).await?;
                WidgetData::SalesToday { total, count, average_ticket: average_ticket(total, count) }
            }
            "sales_chart" => WidgetData::SalesChart(self.repo.sales_last_30_days(&mut *conn, tenant_id).await?),
            "top_products" => WidgetData::TopProducts(self.repo.top_products(&mut *conn, tenant_id).await?),
            "low_stock" => WidgetData::LowStock(self.inventory_repo.low_stock_ingredients(&mut *conn, tenant_id).await?),
            "expiring_lots" => {
                let limit = today + Duration::days(EXPIRY_ALERT_DAYS);
                WidgetData::ExpiringLots(self.inventory_repo.expiring_lots(&mut *conn, tenant_id, today, limit).await?)
            }
            "production_queue" => {
                let cards = self.production_repo.board_cards(&mut *conn, tenant_id).await?;
                WidgetData::ProductionQueue(cards.into_iter().filter(|c| !c.stage.is_terminal()).collect())
            }
            "payables_due" => {
                let finance = self.finance_service.repo();
                let due_today = finance.payables_due_on(&mut *conn, tenant_id, today).await?;
                let open = finance
                    .open_payables_until(&mut *conn, tenant_id, today + Duration::days(7))
                    .await?;
                WidgetData::PayablesDue {
                    due_today,
                    open_until_week: open.iter().map(|row| row.payable.balance).sum(),
                }
            }
            "sales_target" => WidgetData::SalesTarget(
                self.finance_service
                    .progress_for_month(&mut *conn, tenant_id, today.year(), today.month() as i32)
                    .await?,
            ),
            "loyalty_overview" => WidgetData::LoyaltyOverview(self.customer_repo.loyalty_overview(&mut *conn, tenant_id).await?),
            other => return Err(AppError::ResourceNotFound(format!("Widget {other}"))),
        };
        Ok(data)
    }

    pub async fn summary(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<DashboardSummary, AppError> {
        let today = Utc::now().date_naive();

        let (sales_today, sales_count_today) = self.repo.sales_on(&mut *conn, tenant_id, today).await?;
        let payables_due_today = self.finance_service.repo().payables_due_on(&mut *conn, tenant_id, today).await?;
        let low_stock_count = self.repo.count_low_stock(&mut *conn, tenant_id).await?;
        let orders_in_production = self.production_repo.count_in_progress(&mut *conn, tenant_id).await?;

        Ok(DashboardSummary {
            sales_today,
            sales_count_today,
            average_ticket: average_ticket(sales_today, sales_count_today),
            payables_due_today,
            low_stock_count,
            orders_in_production,
        })
    }

    /// Cargo alvo do layout: o próprio, ou outro quando o usuário tem dashboard:manage.
    async fn target_role(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        caller_role_id: Uuid,
        requested: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        let role_id = match requested {
            Some(id) if id != caller_role_id => id,
            _ => return Ok(caller_role_id),
        };

        if !self.rbac_repo.role_has_permission(caller_role_id, MANAGE_PERMISSION).await? {
            return Err(AppError::PermissionDenied(MANAGE_PERMISSION.to_string()));
        }
        self.rbac_repo
            .find_role(&mut *conn, tenant_id, role_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Cargo".into()))?;
        Ok(role_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(key: &str, position: i32, width: i32, height: i32) -> WidgetPlacement {
        WidgetPlacement { key: key.into(), position, width, height }
    }

    #[test]
    fn registry_holds_every_widget_in_order() {
        let keys: Vec<&str> = registry().iter().map(|w| w.key).collect();
        assert_eq!(
            keys,
            vec![
                "sales_today",
                "sales_chart",
                "top_products",
                "low_stock",
                "expiring_lots",
                "production_queue",
                "payables_due",
                "sales_target",
                "loyalty_overview",
            ]
        );
    }

    #[test]
    fn default_layout_is_valid() {
        let layout = default_layout();
        assert_eq!(normalize_layout(layout.clone()).unwrap(), layout);
    }

    #[test]
    fn normalize_sorts_and_renumbers() {
        let layout = normalize_layout(vec![
            placement("low_stock", 40, 2, 2),
            placement("sales_today", 5, 1, 1),
            placement("sales_chart", 12, 4, 2),
        ])
        .unwrap();

        let keys: Vec<(&str, i32)> = layout.iter().map(|w| (w.key.as_str(), w.position)).collect();
        assert_eq!(keys, vec![("sales_today", 0), ("sales_chart", 1), ("low_stock", 2)]);
    }

    #[test]
    fn rejects_unknown_duplicate_and_oversized_widgets() {
        assert!(matches!(
            normalize_layout(vec![placement("clima", 0, 1, 1)]),
            Err(AppError::InvalidLayout(_))
        ));
        assert!(matches!(
            normalize_layout(vec![placement("sales_today", 0, 1, 1), placement("sales_today", 1, 1, 1)]),
            Err(AppError::InvalidLayout(_))
        ));
        assert!(matches!(
            normalize_layout(vec![placement("sales_chart", 0, 5, 1)]),
            Err(AppError::InvalidLayout(_))
        ));
        assert!(matches!(
            normalize_layout(vec![placement("sales_chart", 0, 2, 0)]),
            Err(AppError::InvalidLayout(_))
        ));
    }

    #[test]
    fn layout_is_filtered_by_role_permissions() {
        let slugs = vec!["inventory:read".to_string()];
        let visible = visible_placements(default_layout(), &slugs);
        let keys: Vec<&str> = visible.iter().map(|w| w.key.as_str()).collect();
        assert_eq!(keys, vec!["low_stock", "expiring_lots"]);
    }

    #[test]
    fn average_ticket_without_sales_is_zero() {
        assert_eq!(average_ticket(Decimal::new(150, 0), 0), Decimal::ZERO);
        assert_eq!(average_ticket(Decimal::new(100, 0), 3), Decimal::new(3333, 2));
    }

    #[test]
    fn filtered_layout_has_contiguous_positions() {
        let slugs = vec!["inventory:read".to_string()];
        let stored = vec![
            placement("sales_today", 0, 1, 1),
            placement("expiring_lots", 4, 2, 2),
            placement("sales_chart", 1, 3, 2),
            placement("low_stock", 3, 2, 2),
        ];

        let visible = visible_placements(stored, &slugs);
        let order: Vec<(&str, i32)> = visible.iter().map(|w| (w.key.as_str(), w.position)).collect();
        assert_eq!(order, vec![("low_stock", 0), ("expiring_lots", 1)]);
    }
}
