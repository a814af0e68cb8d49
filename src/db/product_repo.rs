// src/db/product_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::{
        products::{Product, ProductPayload, ProductUnitCost, Recipe, RecipeItemPayload, RecipeLine},
        sales::LockedProduct,
    },
};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &ProductPayload,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (tenant_id, sku, name, description, sale_price, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.sale_price)
        .bind(input.is_active)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, || AppError::SkuAlreadyExists(input.sku.clone())))
    }

    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        input: &ProductPayload,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                sku = $3, name = $4, description = $5, sale_price = $6, is_active = $7,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.sale_price)
        .bind(input.is_active)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, || AppError::SkuAlreadyExists(input.sku.clone())))
    }

    pub async fn list_products<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(products)
    }

    pub async fn find_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    /// Trava os produtos da venda (ordem por id para não haver deadlock entre caixas).
    pub async fn lock_products<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<Vec<LockedProduct>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, LockedProduct>(
            r#"
            SELECT id, name, sale_price, current_stock, is_active
            FROM products
            WHERE tenant_id = $1 AND id = ANY($2)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(product_ids)
        .fetch_all(executor)
        .await?;
        Ok(products)
    }

    pub async fn change_stock<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        delta: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE products SET current_stock = current_stock + $3, updated_at = NOW() WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(product_id)
        .bind(delta)
        .execute(executor)
        .await?;
        Ok(())
    }

    // ---
    // Ficha técnica
    // ---

    pub async fn find_recipe<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Recipe>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let recipe = sqlx::query_as::<_, Recipe>(
            "SELECT * FROM recipes WHERE tenant_id = $1 AND product_id = $2",
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_optional(executor)
        .await?;
        Ok(recipe)
    }

    pub async fn recipe_lines<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<RecipeLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, RecipeLine>(
            r#"
            SELECT
                ri.ingredient_id, i.name AS ingredient_name, i.unit,
                ri.quantity, ri.loss_percent, i.average_cost, i.current_stock
            FROM recipe_items ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.tenant_id = $1 AND ri.product_id = $2
            ORDER BY i.name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn upsert_recipe_header<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        yield_quantity: Decimal,
        notes: Option<&str>,
    ) -> Result<Recipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (product_id, tenant_id, yield_quantity, notes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id)
            DO UPDATE SET yield_quantity = EXCLUDED.yield_quantity, notes = EXCLUDED.notes, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .bind(yield_quantity)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(recipe)
    }

    pub async fn clear_recipe_items<'e, E>(&self, executor: E, tenant_id: Uuid, product_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM recipe_items WHERE tenant_id = $1 AND product_id = $2")
            .bind(tenant_id)
            .bind(product_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_recipe_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        items: &[RecipeItemPayload],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ingredient_ids: Vec<Uuid> = items.iter().map(|i| i.ingredient_id).collect();
        let quantities: Vec<Decimal> = items.iter().map(|i| i.quantity).collect();
        let losses: Vec<Decimal> = items.iter().map(|i| i.loss_percent).collect();

        // Inserção em massa usando UNNEST
        sqlx::query(
            r#"
            INSERT INTO recipe_items (product_id, tenant_id, ingredient_id, quantity, loss_percent)
            SELECT $1, $2, * FROM unnest($3::uuid[], $4::numeric[], $5::numeric[])
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .bind(&ingredient_ids)
        .bind(&quantities)
        .bind(&losses)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Quantos dos insumos informados existem na loja.
    pub async fn count_ingredients<'e, E>(&self, executor: E, tenant_id: Uuid, ids: &[Uuid]) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ingredients WHERE tenant_id = $1 AND id = ANY($2)",
        )
        .bind(tenant_id)
        .bind(ids)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    /// Custo unitário atual pela ficha técnica (produtos sem ficha ficam de fora).
    pub async fn unit_costs<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductUnitCost>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let costs = sqlx::query_as::<_, ProductUnitCost>(
            r#"
            SELECT
                r.product_id,
                COALESCE(SUM(ri.quantity * (1 + ri.loss_percent / 100) * i.average_cost), 0)
                    / r.yield_quantity AS unit_cost
            FROM recipes r
            JOIN recipe_items ri ON ri.product_id = r.product_id
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE r.tenant_id = $1 AND r.product_id = ANY($2)
            GROUP BY r.product_id, r.yield_quantity
            "#,
        )
        .bind(tenant_id)
        .bind(product_ids)
        .fetch_all(executor)
        .await?;
        Ok(costs)
    }
}
