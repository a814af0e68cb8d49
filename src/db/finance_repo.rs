// src/db/finance_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::finance::{
        ExpenseCategory, ExpenseCategoryPayload, ExpenseTotal, Payable, PayablePayload, PayableStatus,
        PayableWithCategory, SalesTarget, SalesTotals, TargetPayload,
    },
};

#[derive(Clone)]
pub struct FinanceRepository {
    pool: PgPool,
}

impl FinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Categorias de despesa
    // ---

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &ExpenseCategoryPayload,
    ) -> Result<ExpenseCategory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ExpenseCategory>(
            "INSERT INTO expense_categories (tenant_id, name, expense_group) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(input.expense_group)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation(format!("Categoria '{}' já existe.", input.name))
            })
        })
    }

    pub async fn list_categories<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<ExpenseCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, ExpenseCategory>(
            "SELECT * FROM expense_categories WHERE tenant_id = $1 ORDER BY expense_group, name",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(categories)
    }

    // ---
    // Contas a pagar
    // ---

    pub async fn create_payable<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &PayablePayload,
    ) -> Result<Payable, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payable = sqlx::query_as::<_, Payable>(
            r#"
            INSERT INTO payables (
                tenant_id, category_id, supplier_id, purchase_order_id, description,
                amount, balance, due_date, competence_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, COALESCE($8, $7))
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.category_id)
        .bind(input.supplier_id)
        .bind(input.purchase_order_id)
        .bind(&input.description)
        .bind(input.amount)
        .bind(input.due_date)
        .bind(input.competence_date)
        .fetch_one(executor)
        .await?;
        Ok(payable)
    }

    pub async fn category_exists<'e, E>(&self, executor: E, tenant_id: Uuid, category_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM expense_categories WHERE tenant_id = $1 AND id = $2 AND is_active)",
        )
        .bind(tenant_id)
        .bind(category_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    /// Filtro por período usa o vencimento.
    pub async fn list_payables<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: Option<PayableStatus>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<PayableWithCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, PayableWithCategory>(
            r#"
            SELECT p.*, c.name AS category_name
            FROM payables p
            JOIN expense_categories c ON c.id = p.category_id
            WHERE p.tenant_id = $1
              AND ($2::payable_status IS NULL OR p.status = $2)
              AND ($3::date IS NULL OR p.due_date >= $3)
              AND ($4::date IS NULL OR p.due_date <= $4)
            ORDER BY p.due_date ASC, p.created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn find_payable_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payable_id: Uuid,
    ) -> Result<Option<Payable>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payable = sqlx::query_as::<_, Payable>(
            "SELECT * FROM payables WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(payable_id)
        .fetch_optional(executor)
        .await?;
        Ok(payable)
    }

    pub async fn update_payment<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payable_id: Uuid,
        balance: Decimal,
        status: PayableStatus,
        paid_at: Option<NaiveDate>,
    ) -> Result<Payable, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payable = sqlx::query_as::<_, Payable>(
            r#"
            UPDATE payables SET balance = $3, status = $4, paid_at = $5, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(payable_id)
        .bind(balance)
        .bind(status)
        .bind(paid_at)
        .fetch_one(executor)
        .await?;
        Ok(payable)
    }

    pub async fn payables_due_on<'e, E>(&self, executor: E, tenant_id: Uuid, date: NaiveDate) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(balance), 0) FROM payables
            WHERE tenant_id = $1 AND due_date = $2 AND status IN ('PENDING', 'PARTIAL')
            "#,
        )
        .bind(tenant_id)
        .bind(date)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Contas em aberto que vencem até `until` (inclui as vencidas).
    pub async fn open_payables_until<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        until: NaiveDate,
    ) -> Result<Vec<PayableWithCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, PayableWithCategory>(
            r#"
            SELECT p.*, c.name AS category_name
            FROM payables p
            JOIN expense_categories c ON c.id = p.category_id
            WHERE p.tenant_id = $1 AND p.status IN ('PENDING', 'PARTIAL') AND p.due_date <= $2
            ORDER BY p.due_date ASC
            LIMIT 50
            "#,
        )
        .bind(tenant_id)
        .bind(until)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // ---
    // DRE
    // ---

    /// Vendas concluídas no período: receita bruta, descontos e CMV pelo custo gravado na venda.
    pub async fn sales_totals<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SalesTotals, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, SalesTotals>(
            r#"
            SELECT
                COALESCE(SUM(s.subtotal), 0) AS gross_revenue,
                COALESCE(SUM(s.discount_total + s.loyalty_discount), 0) AS discounts,
                COALESCE(SUM(c.cost), 0) AS cost_of_goods_sold,
                COUNT(s.id) AS sales_count
            FROM sales s
            LEFT JOIN LATERAL (
                SELECT SUM(si.quantity * si.unit_cost) AS cost
                FROM sale_items si WHERE si.sale_id = s.id
            ) c ON TRUE
            WHERE s.tenant_id = $1
              AND s.status = 'COMPLETED'
              AND s.created_at::date BETWEEN $2 AND $3
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(executor)
        .await?;
        Ok(totals)
    }

    /// Despesas por categoria, pela data de competência; canceladas ficam de fora.
    pub async fn expense_totals<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExpenseTotal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ExpenseTotal>(
            r#"
            SELECT c.id AS category_id, c.name AS category_name, c.expense_group, SUM(p.amount) AS total
            FROM payables p
            JOIN expense_categories c ON c.id = p.category_id
            WHERE p.tenant_id = $1
              AND p.status <> 'CANCELLED'
              AND p.competence_date BETWEEN $2 AND $3
            GROUP BY c.id, c.name, c.expense_group
            ORDER BY c.expense_group, total DESC
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // ---
    // Metas de vendas
    // ---

    pub async fn create_target<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &TargetPayload,
    ) -> Result<SalesTarget, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SalesTarget>(
            r#"
            INSERT INTO sales_targets (tenant_id, location_id, year, month, target_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.location_id)
        .bind(input.year)
        .bind(input.month)
        .bind(input.target_amount)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation(format!(
                    "Já existe meta para {:02}/{}.",
                    input.month, input.year
                ))
            })
        })
    }

    pub async fn list_targets<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        year: Option<i32>,
        month: Option<i32>,
    ) -> Result<Vec<SalesTarget>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let targets = sqlx::query_as::<_, SalesTarget>(
            r#"
            SELECT * FROM sales_targets
            WHERE tenant_id = $1
              AND ($2::int IS NULL OR year = $2)
              AND ($3::int IS NULL OR month = $3)
            ORDER BY year DESC, month DESC
            "#,
        )
        .bind(tenant_id)
        .bind(year)
        .bind(month)
        .fetch_all(executor)
        .await?;
        Ok(targets)
    }

    /// Total vendido (líquido) no período; `location_id` None soma todas as lojas.
    pub async fn achieved_sales<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        location_id: Option<Uuid>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total), 0) FROM sales
            WHERE tenant_id = $1
              AND status = 'COMPLETED'
              AND ($2::uuid IS NULL OR location_id = $2)
              AND created_at::date BETWEEN $3 AND $4
            "#,
        )
        .bind(tenant_id)
        .bind(location_id)
        .bind(from)
        .bind(to)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }
}
