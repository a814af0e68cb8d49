// src/db/purchasing_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::purchasing::{
        PlanningIngredient, PlanningRecipeLine, PurchaseOrder, PurchaseOrderItem,
        PurchaseOrderItemPayload, PurchaseOrderStatus,
    },
};

#[derive(Clone)]
pub struct PurchasingRepository {
    pool: PgPool,
}

impl PurchasingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Dados do planejamento (MRP)
    // ---

    pub async fn planning_ingredients<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<PlanningIngredient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, PlanningIngredient>(
            r#"
            SELECT
                i.id AS ingredient_id, i.name AS ingredient_name, i.unit,
                i.supplier_id, s.name AS supplier_name,
                i.current_stock, i.minimum_stock, i.purchase_package_size,
                i.average_cost, i.last_cost
            FROM ingredients i
            LEFT JOIN suppliers s ON s.id = i.supplier_id
            WHERE i.tenant_id = $1
            ORDER BY i.name ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn planning_recipe_lines<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<Vec<PlanningRecipeLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, PlanningRecipeLine>(
            r#"
            SELECT ri.product_id, ri.ingredient_id, ri.quantity, ri.loss_percent, r.yield_quantity
            FROM recipe_items ri
            JOIN recipes r ON r.product_id = ri.product_id
            WHERE ri.tenant_id = $1 AND ri.product_id = ANY($2)
            "#,
        )
        .bind(tenant_id)
        .bind(product_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // ---
    // Pedidos de compra
    // ---

    pub async fn create_order<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        supplier_id: Uuid,
        expected_date: Option<NaiveDate>,
        notes: Option<&str>,
        total_amount: Decimal,
        created_by: Uuid,
    ) -> Result<PurchaseOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            INSERT INTO purchase_orders (tenant_id, supplier_id, expected_date, notes, total_amount, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(supplier_id)
        .bind(expected_date)
        .bind(notes)
        .bind(total_amount)
        .bind(created_by)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    pub async fn insert_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        items: &[PurchaseOrderItemPayload],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ingredient_ids: Vec<Uuid> = items.iter().map(|i| i.ingredient_id).collect();
        let quantities: Vec<Decimal> = items.iter().map(|i| i.quantity).collect();
        let costs: Vec<Decimal> = items.iter().map(|i| i.unit_cost).collect();

        sqlx::query(
            r#"
            INSERT INTO purchase_order_items (tenant_id, purchase_order_id, ingredient_id, quantity, unit_cost)
            SELECT $1, $2, * FROM unnest($3::uuid[], $4::numeric[], $5::numeric[])
            "#,
        )
        .bind(tenant_id)
        .bind(order_id)
        .bind(&ingredient_ids)
        .bind(&quantities)
        .bind(&costs)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_orders<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: Option<PurchaseOrderStatus>,
    ) -> Result<Vec<PurchaseOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let orders = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT * FROM purchase_orders
            WHERE tenant_id = $1 AND ($2::purchase_order_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_all(executor)
        .await?;
        Ok(orders)
    }

    pub async fn find_order<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<PurchaseOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            "SELECT * FROM purchase_orders WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(order_id)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    pub async fn find_order_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<PurchaseOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            "SELECT * FROM purchase_orders WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(order_id)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    pub async fn order_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<PurchaseOrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, PurchaseOrderItem>(
            r#"
            SELECT
                poi.id, poi.purchase_order_id, poi.ingredient_id,
                i.name AS ingredient_name, i.unit, poi.quantity, poi.unit_cost
            FROM purchase_order_items poi
            JOIN ingredients i ON i.id = poi.ingredient_id
            WHERE poi.tenant_id = $1 AND poi.purchase_order_id = $2
            ORDER BY i.name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        status: PurchaseOrderStatus,
    ) -> Result<PurchaseOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders SET
                status = $3,
                received_at = CASE WHEN $3 = 'RECEIVED'::purchase_order_status THEN NOW() ELSE received_at END,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(order_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }
}
