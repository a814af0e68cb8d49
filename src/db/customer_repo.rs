// src/db/customer_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::{
        customers::{Customer, CustomerPayload, LoyaltyConfig, LoyaltyConfigPayload, LoyaltyEntry, LoyaltyReason},
        dashboard::LoyaltyOverview,
    },
};

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &CustomerPayload,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (tenant_id, full_name, document_number, email, phone, birth_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.full_name)
        .bind(&input.document_number)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.birth_date)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation("Já existe um cliente com esse documento.".into())
            })
        })
    }

    pub async fn list_customers<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE tenant_id = $1
              AND (
                $2::text IS NULL
                OR full_name ILIKE '%' || $2 || '%'
                OR document_number ILIKE '%' || $2 || '%'
                OR phone ILIKE '%' || $2 || '%'
              )
            ORDER BY full_name ASC
            LIMIT 200
            "#,
        )
        .bind(tenant_id)
        .bind(search)
        .fetch_all(executor)
        .await?;
        Ok(customers)
    }

    pub async fn find_customer<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(customer_id)
        .fetch_optional(executor)
        .await?;
        Ok(customer)
    }

    /// Trava o saldo de pontos até o fim da venda/cancelamento.
    pub async fn find_customer_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(customer_id)
        .fetch_optional(executor)
        .await?;
        Ok(customer)
    }

    /// O saldo nunca fica negativo: o débito maior que o saldo zera.
    pub async fn change_points<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        customer_id: Uuid,
        delta: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE customers SET points_balance = GREATEST(points_balance + $3, 0), updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(customer_id)
        .bind(delta)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn record_ledger<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        customer_id: Uuid,
        sale_id: Option<Uuid>,
        points: i64,
        reason: LoyaltyReason,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO loyalty_ledger (tenant_id, customer_id, sale_id, points, reason) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(tenant_id)
        .bind(customer_id)
        .bind(sale_id)
        .bind(points)
        .bind(reason)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn ledger<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Vec<LoyaltyEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, LoyaltyEntry>(
            r#"
            SELECT id, customer_id, sale_id, points, reason, created_at
            FROM loyalty_ledger
            WHERE tenant_id = $1 AND customer_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(customer_id)
        .fetch_all(executor)
        .await?;
        Ok(entries)
    }

    // ---
    // Configuração do programa de fidelidade
    // ---

    pub async fn get_loyalty_config<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<LoyaltyConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = sqlx::query_as::<_, LoyaltyConfig>(
            "SELECT * FROM loyalty_config WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(config.unwrap_or_else(|| LoyaltyConfig::disabled(tenant_id)))
    }

    pub async fn upsert_loyalty_config<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &LoyaltyConfigPayload,
    ) -> Result<LoyaltyConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = sqlx::query_as::<_, LoyaltyConfig>(
            r#"
            INSERT INTO loyalty_config (tenant_id, enabled, points_per_currency, currency_per_point, min_redeem_points)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id)
            DO UPDATE SET
                enabled = EXCLUDED.enabled,
                points_per_currency = EXCLUDED.points_per_currency,
                currency_per_point = EXCLUDED.currency_per_point,
                min_redeem_points = EXCLUDED.min_redeem_points,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.enabled)
        .bind(input.points_per_currency)
        .bind(input.currency_per_point)
        .bind(input.min_redeem_points)
        .fetch_one(executor)
        .await?;
        Ok(config)
    }

    pub async fn loyalty_overview<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<LoyaltyOverview, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let overview = sqlx::query_as::<_, LoyaltyOverview>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM customers WHERE tenant_id = $1 AND points_balance > 0) AS customers_with_points,
                (SELECT COALESCE(SUM(points_balance), 0)::bigint FROM customers WHERE tenant_id = $1) AS points_outstanding,
                (SELECT COALESCE(-SUM(points), 0)::bigint FROM loyalty_ledger
                  WHERE tenant_id = $1 AND reason = 'REDEEM'
                    AND created_at >= date_trunc('month', NOW())) AS points_redeemed_month
            "#,
        )
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
        Ok(overview)
    }
}
