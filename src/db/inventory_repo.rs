// src/db/inventory_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::inventory::{
        Category, ExpiringLot, Ingredient, IngredientLot, IngredientPayload, StockMovement,
        StockMovementReason, Supplier, SupplierPayload,
    },
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Categorias
    // ---

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (tenant_id, name, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(tenant_id)
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation(format!("Categoria '{}' já existe.", name))
            })
        })
    }

    pub async fn list_categories<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(categories)
    }

    // ---
    // Fornecedores
    // ---

    pub async fn create_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &SupplierPayload,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (tenant_id, name, document_number, email, phone, lead_time_days)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.document_number)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.lead_time_days)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation(format!("Fornecedor '{}' já existe.", input.name))
            })
        })
    }

    pub async fn update_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        supplier_id: Uuid,
        input: &SupplierPayload,
    ) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers SET
                name = $3, document_number = $4, email = $5, phone = $6,
                lead_time_days = $7, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(supplier_id)
        .bind(&input.name)
        .bind(&input.document_number)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.lead_time_days)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation(format!("Fornecedor '{}' já existe.", input.name))
            })
        })
    }

    pub async fn list_suppliers<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(suppliers)
    }

    pub async fn find_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(supplier_id)
        .fetch_optional(executor)
        .await?;
        Ok(supplier)
    }

    // ---
    // Insumos
    // ---

    pub async fn create_ingredient<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &IngredientPayload,
    ) -> Result<Ingredient, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (
                tenant_id, category_id, supplier_id, name, unit,
                minimum_stock, purchase_package_size, last_cost
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.category_id)
        .bind(input.supplier_id)
        .bind(&input.name)
        .bind(input.unit)
        .bind(input.minimum_stock)
        .bind(input.purchase_package_size)
        .bind(input.last_cost)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation(format!("Insumo '{}' já existe.", input.name))
            })
        })
    }

    /// Estoque e custo médio não são editáveis por aqui: só por movimentação.
    pub async fn update_ingredient<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Uuid,
        input: &IngredientPayload,
    ) -> Result<Option<Ingredient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Ingredient>(
            r#"
            UPDATE ingredients SET
                category_id = $3, supplier_id = $4, name = $5, unit = $6,
                minimum_stock = $7, purchase_package_size = $8,
                last_cost = COALESCE($9, last_cost), updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .bind(input.category_id)
        .bind(input.supplier_id)
        .bind(&input.name)
        .bind(input.unit)
        .bind(input.minimum_stock)
        .bind(input.purchase_package_size)
        .bind(input.last_cost)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation(format!("Insumo '{}' já existe.", input.name))
            })
        })
    }

    pub async fn list_ingredients<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Ingredient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            "SELECT * FROM ingredients WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(ingredients)
    }

    /// Trava a linha do insumo até o fim da transação.
    pub async fn find_ingredient_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Uuid,
    ) -> Result<Option<Ingredient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "SELECT * FROM ingredients WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .fetch_optional(executor)
        .await?;
        Ok(ingredient)
    }

    /// Trava vários insumos de uma vez, sempre na mesma ordem (evita deadlock).
    pub async fn lock_ingredients<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_ids: &[Uuid],
    ) -> Result<Vec<Ingredient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            "SELECT * FROM ingredients WHERE tenant_id = $1 AND id = ANY($2) ORDER BY id FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(ingredient_ids)
        .fetch_all(executor)
        .await?;
        Ok(ingredients)
    }

    /// Entrada de estoque: soma a quantidade e grava o novo custo médio e o último custo.
    pub async fn apply_stock_entry<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Uuid,
        quantity: Decimal,
        average_cost: Decimal,
        last_cost: Decimal,
    ) -> Result<Ingredient, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            UPDATE ingredients SET
                current_stock = current_stock + $3,
                average_cost = $4,
                last_cost = $5,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .bind(quantity)
        .bind(average_cost)
        .bind(last_cost)
        .fetch_one(executor)
        .await?;
        Ok(ingredient)
    }

    /// Soma (ou subtrai) do saldo sem mexer no custo.
    pub async fn change_stock<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Uuid,
        delta: Decimal,
    ) -> Result<Ingredient, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            UPDATE ingredients SET current_stock = current_stock + $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .bind(delta)
        .fetch_one(executor)
        .await?;
        Ok(ingredient)
    }

    pub async fn low_stock_ingredients<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Ingredient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT * FROM ingredients
            WHERE tenant_id = $1 AND current_stock < minimum_stock
            ORDER BY (current_stock / NULLIF(minimum_stock, 0)) ASC, name ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(ingredients)
    }

    // ---
    // Lotes
    // ---

    #[allow(clippy::too_many_arguments)]
    pub async fn create_lot<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Uuid,
        location_id: Option<Uuid>,
        lot_code: &str,
        expiration_date: Option<NaiveDate>,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> Result<IngredientLot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, IngredientLot>(
            r#"
            INSERT INTO ingredient_lots (
                tenant_id, ingredient_id, location_id, lot_code, expiration_date,
                initial_quantity, remaining_quantity, unit_cost
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .bind(location_id)
        .bind(lot_code)
        .bind(expiration_date)
        .bind(quantity)
        .bind(unit_cost)
        .fetch_one(executor)
        .await?;
        Ok(lot)
    }

    /// Lotes com saldo em ordem FEFO, travados para baixa.
    pub async fn lots_for_consumption<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Uuid,
    ) -> Result<Vec<IngredientLot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lots = sqlx::query_as::<_, IngredientLot>(
            r#"
            SELECT * FROM ingredient_lots
            WHERE tenant_id = $1 AND ingredient_id = $2 AND remaining_quantity > 0
            ORDER BY expiration_date ASC NULLS LAST, created_at ASC
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .fetch_all(executor)
        .await?;
        Ok(lots)
    }

    pub async fn take_from_lot<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        lot_id: Uuid,
        quantity: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE ingredient_lots SET remaining_quantity = remaining_quantity - $3 WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(lot_id)
        .bind(quantity)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_open_lots<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Option<Uuid>,
        expiring_before: Option<NaiveDate>,
    ) -> Result<Vec<IngredientLot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lots = sqlx::query_as::<_, IngredientLot>(
            r#"
            SELECT * FROM ingredient_lots
            WHERE tenant_id = $1
              AND remaining_quantity > 0
              AND ($2::uuid IS NULL OR ingredient_id = $2)
              AND ($3::date IS NULL OR expiration_date <= $3)
            ORDER BY expiration_date ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .bind(expiring_before)
        .fetch_all(executor)
        .await?;
        Ok(lots)
    }

    /// Lotes com saldo que vencem até `limit` (inclui os já vencidos).
    pub async fn expiring_lots<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        today: NaiveDate,
        limit: NaiveDate,
    ) -> Result<Vec<ExpiringLot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lots = sqlx::query_as::<_, ExpiringLot>(
            r#"
            SELECT
                l.id AS lot_id, l.ingredient_id, i.name AS ingredient_name, l.lot_code,
                l.expiration_date, l.remaining_quantity,
                (l.expiration_date - $2::date)::int AS days_to_expire
            FROM ingredient_lots l
            JOIN ingredients i ON i.id = l.ingredient_id
            WHERE l.tenant_id = $1
              AND l.remaining_quantity > 0
              AND l.expiration_date IS NOT NULL
              AND l.expiration_date <= $3
            ORDER BY l.expiration_date ASC
            "#,
        )
        .bind(tenant_id)
        .bind(today)
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(lots)
    }

    // ---
    // Livro-razão
    // ---

    #[allow(clippy::too_many_arguments)]
    pub async fn record_stock_movement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Uuid,
        lot_id: Option<Uuid>,
        quantity_changed: Decimal,
        reason: StockMovementReason,
        unit_cost: Option<Decimal>,
        reference_id: Option<Uuid>,
        notes: Option<&str>,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                tenant_id, ingredient_id, lot_id, quantity_changed, reason, unit_cost, reference_id, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .bind(lot_id)
        .bind(quantity_changed)
        .bind(reason)
        .bind(unit_cost)
        .bind(reference_id)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(movement)
    }

    pub async fn list_movements<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Option<Uuid>,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE tenant_id = $1 AND ($2::uuid IS NULL OR ingredient_id = $2)
            ORDER BY created_at DESC
            LIMIT 500
            "#,
        )
        .bind(tenant_id)
        .bind(ingredient_id)
        .fetch_all(executor)
        .await?;
        Ok(movements)
    }
}
