// src/db/production_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        production::{BoardCard, ProductionOrder, ProductionStage, StageHistoryEntry, BOARD_ARCHIVE_DAYS},
        purchasing::PlannedProduction,
    },
};

#[derive(Clone)]
pub struct ProductionRepository {
    pool: PgPool,
}

impl ProductionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_order<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        location_id: Option<Uuid>,
        due_date: Option<NaiveDate>,
        notes: Option<&str>,
        created_by: Uuid,
    ) -> Result<ProductionOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ProductionOrder>(
            r#"
            INSERT INTO production_orders (tenant_id, product_id, quantity, location_id, due_date, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .bind(quantity)
        .bind(location_id)
        .bind(due_date)
        .bind(notes)
        .bind(created_by)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    /// Trava a ordem: dois operadores arrastando o mesmo cartão são serializados aqui.
    pub async fn find_order_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<ProductionOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ProductionOrder>(
            "SELECT * FROM production_orders WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(order_id)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    pub async fn order_exists<'e, E>(&self, executor: E, tenant_id: Uuid, order_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM production_orders WHERE tenant_id = $1 AND id = $2)",
        )
        .bind(tenant_id)
        .bind(order_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn update_stage<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        stage: ProductionStage,
        ingredients_consumed: bool,
    ) -> Result<ProductionOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ProductionOrder>(
            r#"
            UPDATE production_orders SET
                stage = $3,
                ingredients_consumed = $4,
                finished_at = CASE WHEN $3 = 'DONE'::production_stage THEN NOW() ELSE finished_at END,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(order_id)
        .bind(stage)
        .bind(ingredients_consumed)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    pub async fn record_history<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        from_stage: Option<ProductionStage>,
        to_stage: ProductionStage,
        moved_by: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO production_order_history (tenant_id, order_id, from_stage, to_stage, moved_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(tenant_id)
        .bind(order_id)
        .bind(from_stage)
        .bind(to_stage)
        .bind(moved_by)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn history<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<StageHistoryEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, StageHistoryEntry>(
            r#"
            SELECT id, order_id, from_stage, to_stage, moved_by, moved_at
            FROM production_order_history
            WHERE tenant_id = $1 AND order_id = $2
            ORDER BY moved_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(entries)
    }

    /// Cartões do quadro. DONE/CANCELLED saem do quadro depois de alguns dias.
    pub async fn board_cards<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<BoardCard>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cards = sqlx::query_as::<_, BoardCard>(
            r#"
            SELECT
                o.id, o.display_id, o.product_id, p.name AS product_name,
                o.quantity, o.stage, o.due_date, o.notes, o.created_at
            FROM production_orders o
            JOIN products p ON p.id = o.product_id
            WHERE o.tenant_id = $1
              AND (
                o.stage NOT IN ('DONE', 'CANCELLED')
                OR o.updated_at >= NOW() - make_interval(days => $2::int)
              )
            ORDER BY o.due_date ASC NULLS LAST, o.created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(BOARD_ARCHIVE_DAYS as i32)
        .fetch_all(executor)
        .await?;
        Ok(cards)
    }

    /// Ordens abertas que ainda não baixaram insumos, dentro do horizonte (ou sem prazo).
    pub async fn planned_production<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        horizon: NaiveDate,
    ) -> Result<Vec<PlannedProduction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, PlannedProduction>(
            r#"
            SELECT product_id, SUM(quantity) AS quantity
            FROM production_orders
            WHERE tenant_id = $1
              AND stage NOT IN ('DONE', 'CANCELLED')
              AND ingredients_consumed = FALSE
              AND (due_date IS NULL OR due_date <= $2)
            GROUP BY product_id
            "#,
        )
        .bind(tenant_id)
        .bind(horizon)
        .fetch_all(executor)
        .await?;
        Ok(plan)
    }

    pub async fn count_in_progress<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM production_orders WHERE tenant_id = $1 AND stage IN ('PREPARATION', 'BAKING', 'FINISHING')",
        )
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }
}
