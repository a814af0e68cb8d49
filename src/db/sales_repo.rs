// src/db/sales_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sales::{NewSaleItem, PaymentMethod, Sale, SaleItem},
};

/// Cabeçalho da venda a gravar (valores já calculados).
#[derive(Debug, Clone)]
pub struct NewSale<'a> {
    pub location_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub seller_id: Uuid,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub loyalty_discount: Decimal,
    pub total: Decimal,
    pub points_earned: i64,
    pub points_redeemed: i64,
    pub idempotency_key: Option<&'a str>,
}

#[derive(Clone)]
pub struct SalesRepository {
    pool: PgPool,
}

impl SalesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_idempotency_key<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        key: &str,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE tenant_id = $1 AND idempotency_key = $2",
        )
        .bind(tenant_id)
        .bind(key)
        .fetch_optional(executor)
        .await?;
        Ok(sale)
    }

    /// Serializa vendas com a mesma chave de idempotência dentro da transação.
    pub async fn lock_idempotency_key<'e, E>(&self, executor: E, tenant_id: Uuid, key: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1 || ':' || $2, 0))")
            .bind(tenant_id.to_string())
            .bind(key)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_sale<'e, E>(&self, executor: E, tenant_id: Uuid, sale: &NewSale<'_>) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (
                tenant_id, location_id, customer_id, seller_id, payment_method,
                subtotal, discount_total, loyalty_discount, total,
                points_earned, points_redeemed, idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(sale.location_id)
        .bind(sale.customer_id)
        .bind(sale.seller_id)
        .bind(sale.payment_method)
        .bind(sale.subtotal)
        .bind(sale.discount_total)
        .bind(sale.loyalty_discount)
        .bind(sale.total)
        .bind(sale.points_earned)
        .bind(sale.points_redeemed)
        .bind(sale.idempotency_key)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn insert_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
        items: &[NewSaleItem],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let quantities: Vec<Decimal> = items.iter().map(|i| i.quantity).collect();
        let list_prices: Vec<Decimal> = items.iter().map(|i| i.list_price).collect();
        let unit_prices: Vec<Decimal> = items.iter().map(|i| i.unit_price).collect();
        let discounts: Vec<Decimal> = items.iter().map(|i| i.discount).collect();
        let unit_costs: Vec<Decimal> = items.iter().map(|i| i.unit_cost).collect();

        sqlx::query(
            r#"
            INSERT INTO sale_items (tenant_id, sale_id, product_id, quantity, list_price, unit_price, discount, unit_cost)
            SELECT $1, $2, * FROM unnest(
                $3::uuid[], $4::numeric[], $5::numeric[], $6::numeric[], $7::numeric[], $8::numeric[]
            )
            "#,
        )
        .bind(tenant_id)
        .bind(sale_id)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&list_prices)
        .bind(&unit_prices)
        .bind(&discounts)
        .bind(&unit_costs)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_sale<'e, E>(&self, executor: E, tenant_id: Uuid, sale_id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(sale_id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn find_sale_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(sale_id)
        .fetch_optional(executor)
        .await?;
        Ok(sale)
    }

    pub async fn sale_items<'e, E>(&self, executor: E, tenant_id: Uuid, sale_id: Uuid) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT
                si.id, si.sale_id, si.product_id, p.name AS product_name,
                si.quantity, si.list_price, si.unit_price, si.discount, si.unit_cost
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            WHERE si.tenant_id = $1 AND si.sale_id = $2
            ORDER BY p.name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn customer_name<'e, E>(&self, executor: E, tenant_id: Uuid, customer_id: Uuid) -> Result<Option<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let name: Option<String> = sqlx::query_scalar(
            "SELECT full_name FROM customers WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(customer_id)
        .fetch_optional(executor)
        .await?;
        Ok(name)
    }

    pub async fn list_sales<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE tenant_id = $1
              AND ($2::date IS NULL OR created_at::date >= $2)
              AND ($3::date IS NULL OR created_at::date <= $3)
            ORDER BY created_at DESC
            LIMIT 1000
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(sales)
    }

    pub async fn mark_cancelled<'e, E>(&self, executor: E, tenant_id: Uuid, sale_id: Uuid) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET status = 'CANCELLED', cancelled_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(sale_id)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }
}
