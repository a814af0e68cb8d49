// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{SalesChartEntry, StoredLayout, TopProductEntry, WidgetPlacement},
};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Vendas do dia (total líquido e quantidade de cupons)
    pub async fn sales_on<'e, E>(&self, executor: E, tenant_id: Uuid, day: NaiveDate) -> Result<(Decimal, i64), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row: (Decimal, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total), 0), COUNT(*)
            FROM sales
            WHERE tenant_id = $1 AND status = 'COMPLETED' AND created_at::date = $2
            "#,
        )
        .bind(tenant_id)
        .bind(day)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    // 2. Gráfico de Linha (Últimos 30 dias)
    pub async fn sales_last_30_days<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<SalesChartEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let data = sqlx::query_as::<_, SalesChartEntry>(
            r#"
            SELECT
                to_char(created_at, 'YYYY-MM-DD') AS date,
                SUM(total) AS total
            FROM sales
            WHERE tenant_id = $1
              AND status = 'COMPLETED'
              AND created_at >= (CURRENT_DATE - INTERVAL '30 days')
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;

        Ok(data)
    }

    // 3. Curva ABC (Top 5 Produtos mais vendidos em R$)
    pub async fn top_products<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<TopProductEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let data = sqlx::query_as::<_, TopProductEntry>(
            r#"
            SELECT
                p.name AS product_name,
                SUM(si.quantity) AS total_quantity,
                SUM(si.quantity * si.unit_price - si.discount) AS total_revenue
            FROM sale_items si
            JOIN sales s ON si.sale_id = s.id
            JOIN products p ON si.product_id = p.id
            WHERE s.tenant_id = $1
              AND s.status = 'COMPLETED'
              AND s.created_at >= (CURRENT_DATE - INTERVAL '30 days')
            GROUP BY p.id, p.name
            ORDER BY total_revenue DESC
            LIMIT 5
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;

        Ok(data)
    }

    pub async fn count_low_stock<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ingredients WHERE tenant_id = $1 AND current_stock < minimum_stock",
        )
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    // ---
    // Layout por cargo
    // ---

    pub async fn find_layout<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<StoredLayout>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let layout = sqlx::query_as::<_, StoredLayout>(
            "SELECT widgets, updated_at FROM dashboard_layouts WHERE tenant_id = $1 AND role_id = $2",
        )
        .bind(tenant_id)
        .bind(role_id)
        .fetch_optional(executor)
        .await?;
        Ok(layout)
    }

    pub async fn save_layout<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        role_id: Uuid,
        widgets: &[WidgetPlacement],
    ) -> Result<StoredLayout, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let layout = sqlx::query_as::<_, StoredLayout>(
            r#"
            INSERT INTO dashboard_layouts (tenant_id, role_id, widgets)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id, role_id)
            DO UPDATE SET widgets = EXCLUDED.widgets, updated_at = NOW()
            RETURNING widgets, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(role_id)
        .bind(Json(widgets))
        .fetch_one(executor)
        .await?;
        Ok(layout)
    }
}
