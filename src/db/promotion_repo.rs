// src/db/promotion_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::promotions::{Combo, ComboItem, ComboItemPayload, ComboPayload, Promotion, PromotionPayload},
};

#[derive(Clone)]
pub struct PromotionRepository {
    pool: PgPool,
}

impl PromotionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_promotion<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &PromotionPayload,
    ) -> Result<Promotion, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            INSERT INTO promotions (tenant_id, product_id, name, kind, value, starts_at, ends_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.product_id)
        .bind(&input.name)
        .bind(input.kind)
        .bind(input.value)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.is_active)
        .fetch_one(executor)
        .await?;
        Ok(promotion)
    }

    pub async fn update_promotion<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        promotion_id: Uuid,
        input: &PromotionPayload,
    ) -> Result<Option<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            UPDATE promotions SET
                product_id = $3, name = $4, kind = $5, value = $6,
                starts_at = $7, ends_at = $8, is_active = $9
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(promotion_id)
        .bind(input.product_id)
        .bind(&input.name)
        .bind(input.kind)
        .bind(input.value)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.is_active)
        .fetch_optional(executor)
        .await?;
        Ok(promotion)
    }

    pub async fn list_promotions<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promotions = sqlx::query_as::<_, Promotion>(
            "SELECT * FROM promotions WHERE tenant_id = $1 ORDER BY created_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(promotions)
    }

    /// Promoções vigentes agora para os produtos do carrinho.
    pub async fn active_promotions<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Vec<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promotions = sqlx::query_as::<_, Promotion>(
            r#"
            SELECT * FROM promotions
            WHERE tenant_id = $1
              AND product_id = ANY($2)
              AND is_active = TRUE
              AND (starts_at IS NULL OR starts_at <= $3)
              AND (ends_at IS NULL OR ends_at >= $3)
            "#,
        )
        .bind(tenant_id)
        .bind(product_ids)
        .bind(now)
        .fetch_all(executor)
        .await?;
        Ok(promotions)
    }

    // ---
    // Combos
    // ---

    pub async fn create_combo<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &ComboPayload,
    ) -> Result<Combo, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Combo>(
            "INSERT INTO combos (tenant_id, name, combo_price, is_active) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(input.combo_price)
        .bind(input.is_active)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation(format!("Combo '{}' já existe.", input.name))
            })
        })
    }

    pub async fn insert_combo_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        combo_id: Uuid,
        items: &[ComboItemPayload],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let quantities: Vec<Decimal> = items.iter().map(|i| i.quantity).collect();

        sqlx::query(
            r#"
            INSERT INTO combo_items (combo_id, tenant_id, product_id, quantity)
            SELECT $1, $2, * FROM unnest($3::uuid[], $4::numeric[])
            "#,
        )
        .bind(combo_id)
        .bind(tenant_id)
        .bind(&product_ids)
        .bind(&quantities)
        .execute(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation("Produto repetido no combo.".into())
            })
        })?;
        Ok(())
    }

    pub async fn list_combos<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        only_active: bool,
    ) -> Result<Vec<Combo>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let combos = sqlx::query_as::<_, Combo>(
            r#"
            SELECT * FROM combos
            WHERE tenant_id = $1 AND (NOT $2 OR is_active = TRUE)
            ORDER BY name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(only_active)
        .fetch_all(executor)
        .await?;
        Ok(combos)
    }

    pub async fn combo_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        combo_ids: &[Uuid],
    ) -> Result<Vec<ComboItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, ComboItem>(
            "SELECT combo_id, product_id, quantity FROM combo_items WHERE tenant_id = $1 AND combo_id = ANY($2)",
        )
        .bind(tenant_id)
        .bind(combo_ids)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }
}
