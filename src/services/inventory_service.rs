// src/services/inventory_service.rs

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{field_error, AppError},
    db::{InventoryRepository, TenantRepository},
    models::inventory::{
        Category, CreateCategoryPayload, Ingredient, IngredientLot, IngredientPayload, InventoryAlerts, LotQuery,
        StockAdjustmentPayload, StockEntryPayload, StockMovement, StockMovementReason, Supplier, SupplierPayload,
    },
};

/// Janela do alerta de validade.
pub const EXPIRY_ALERT_DAYS: i64 = 7;

/// Custo médio ponderado após uma entrada.
pub fn calculate_new_average_cost(
    current_qty: Decimal,
    current_avg: Decimal,
    incoming_qty: Decimal,
    incoming_cost: Decimal,
) -> Decimal {
    let total_current_value = current_qty * current_avg;
    let total_incoming_value = incoming_qty * incoming_cost;
    let new_total_qty = current_qty + incoming_qty;

    if new_total_qty <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((total_current_value + total_incoming_value) / new_total_qty).round_dp(4)
}

/// Quanto sai de cada lote numa baixa.
#[derive(Debug, Clone, PartialEq)]
pub struct LotTake {
    pub lot_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

/// Distribui a baixa pelos lotes em ordem FEFO: vence primeiro sai primeiro,
/// lotes sem validade por último, empate pela data de entrada.
/// Devolve o que não coube em nenhum lote.
pub fn plan_lot_consumption(lots: &[IngredientLot], required: Decimal) -> (Vec<LotTake>, Decimal) {
    let mut ordered: Vec<&IngredientLot> = lots.iter().filter(|l| l.remaining_quantity > Decimal::ZERO).collect();
    ordered.sort_by_key(|l| (l.expiration_date.is_none(), l.expiration_date, l.created_at));

    let mut remaining = required;
    let mut takes = Vec::new();
    for lot in ordered {
        if remaining <= Decimal::ZERO {
            break;
        }
        let quantity = lot.remaining_quantity.min(remaining);
        takes.push(LotTake { lot_id: lot.id, quantity, unit_cost: lot.unit_cost });
        remaining -= quantity;
    }

    (takes, remaining.max(Decimal::ZERO))
}

fn generated_lot_code(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().format("%Y%m%d%H%M%S"))
}

/// Entrada de estoque já resolvida (compra manual ou recebimento de pedido).
pub(crate) struct IncomingStock<'a> {
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub lot_code: Option<&'a str>,
    pub expiration_date: Option<NaiveDate>,
    pub location_id: Option<Uuid>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<&'a str>,
}

/// Data limite para o filtro de vencimento: hoje + `days`, sem estourar o calendário.
pub fn expiry_cutoff(today: NaiveDate, days: i32) -> Result<NaiveDate, AppError> {
    if !(0..=365).contains(&days) {
        return Err(field_error("expiringWithinDays", "range", "O prazo deve estar entre 0 e 365 dias."));
    }
    today
        .checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| field_error("expiringWithinDays", "range", "O prazo deve estar entre 0 e 365 dias."))
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    tenant_repo: TenantRepository,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository, tenant_repo: TenantRepository) -> Self {
        Self { inventory_repo, tenant_repo }
    }

    // ---
    // Cadastros
    // ---

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &CreateCategoryPayload,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo
            .create_category(executor, tenant_id, &payload.name, payload.description.as_deref())
            .await
    }

    pub async fn list_categories<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo.list_categories(executor, tenant_id).await
    }

    pub async fn create_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &SupplierPayload,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo.create_supplier(executor, tenant_id, payload).await
    }

    pub async fn update_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        supplier_id: Uuid,
        payload: &SupplierPayload,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo
            .update_supplier(executor, tenant_id, supplier_id, payload)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Fornecedor".into()))
    }

    pub async fn list_suppliers<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo.list_suppliers(executor, tenant_id).await
    }

    pub async fn create_ingredient<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &IngredientPayload,
    ) -> Result<Ingredient, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo.create_ingredient(executor, tenant_id, payload).await
    }

    pub async fn update_ingredient<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ingredient_id: Uuid,
        payload: &IngredientPayload,
    ) -> Result<Ingredient, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo
            .update_ingredient(executor, tenant_id, ingredient_id, payload)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Insumo".into()))
    }

    pub async fn list_ingredients<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Ingredient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo.list_ingredients(executor, tenant_id).await
    }

    // ---
    // Movimentação
    // ---

    /// Entrada manual (compra avulsa): cria o lote, soma o estoque e recalcula o custo médio.
    pub async fn stock_entry(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &StockEntryPayload,
    ) -> Result<IngredientLot, AppError> {
        let mut tx = conn.begin().await?;

        if let Some(location_id) = payload.location_id {
            if !self.tenant_repo.location_exists(&mut *tx, tenant_id, location_id).await? {
                return Err(AppError::ResourceNotFound("Local".into()));
            }
        }

        let ingredient = self
            .inventory_repo
            .find_ingredient_for_update(&mut *tx, tenant_id, payload.ingredient_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Insumo".into()))?;

        let incoming = IncomingStock {
            quantity: payload.quantity,
            unit_cost: payload.unit_cost,
            lot_code: payload.lot_code.as_deref(),
            expiration_date: payload.expiration_date,
            location_id: payload.location_id,
            reference_id: None,
            notes: payload.notes.as_deref(),
        };
        let lot = self.receive_stock(&mut *tx, tenant_id, &ingredient, &incoming).await?;

        tx.commit().await?;

        tracing::info!(%tenant_id, ingredient_id = %ingredient.id, lot_id = %lot.id, "Entrada de estoque registrada");
        Ok(lot)
    }

    /// Usado pela entrada manual e pelo recebimento de pedidos de compra.
    /// O insumo precisa estar travado pela transação que chama.
    pub(crate) async fn receive_stock(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        ingredient: &Ingredient,
        incoming: &IncomingStock<'_>,
    ) -> Result<IngredientLot, AppError> {
        let lot_code = incoming
            .lot_code
            .filter(|code| !code.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| generated_lot_code("ENT"));

        // 1. Lote
        let lot = self
            .inventory_repo
            .create_lot(
                &mut *conn,
                tenant_id,
                ingredient.id,
                incoming.location_id,
                &lot_code,
                incoming.expiration_date,
                incoming.quantity,
                incoming.unit_cost,
            )
            .await?;

        // 2. Saldo + custo médio + último custo
        let new_avg_cost = calculate_new_average_cost(
            ingredient.current_stock,
            ingredient.average_cost,
            incoming.quantity,
            incoming.unit_cost,
        );
        self.inventory_repo
            .apply_stock_entry(&mut *conn, tenant_id, ingredient.id, incoming.quantity, new_avg_cost, incoming.unit_cost)
            .await?;

        // 3. Histórico
        self.inventory_repo
            .record_stock_movement(
                &mut *conn,
                tenant_id,
                ingredient.id,
                Some(lot.id),
                incoming.quantity,
                StockMovementReason::Purchase,
                Some(incoming.unit_cost),
                incoming.reference_id,
                incoming.notes,
            )
            .await?;

        Ok(lot)
    }

    /// Baixa `quantity` do insumo consumindo lotes FEFO.
    /// O insumo precisa estar travado pela transação que chama.
    pub(crate) async fn consume(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        ingredient: &Ingredient,
        quantity: Decimal,
        reason: StockMovementReason,
        reference_id: Option<Uuid>,
        notes: Option<&str>,
    ) -> Result<Ingredient, AppError> {
        if ingredient.current_stock < quantity {
            return Err(AppError::InsufficientStock {
                name: ingredient.name.clone(),
                available: ingredient.current_stock,
                requested: quantity,
            });
        }

        let lots = self
            .inventory_repo
            .lots_for_consumption(&mut *conn, tenant_id, ingredient.id)
            .await?;
        let (takes, uncovered) = plan_lot_consumption(&lots, quantity);

        for take in &takes {
            self.inventory_repo
                .take_from_lot(&mut *conn, tenant_id, take.lot_id, take.quantity)
                .await?;
            self.inventory_repo
                .record_stock_movement(
                    &mut *conn,
                    tenant_id,
                    ingredient.id,
                    Some(take.lot_id),
                    -take.quantity,
                    reason,
                    Some(take.unit_cost),
                    reference_id,
                    notes,
                )
                .await?;
        }

        // Saldo sem lote (estoque anterior ao controle por lotes)
        if uncovered > Decimal::ZERO {
            self.inventory_repo
                .record_stock_movement(
                    &mut *conn,
                    tenant_id,
                    ingredient.id,
                    None,
                    -uncovered,
                    reason,
                    Some(ingredient.average_cost),
                    reference_id,
                    notes,
                )
                .await?;
        }

        self.inventory_repo
            .change_stock(&mut *conn, tenant_id, ingredient.id, -quantity)
            .await
    }

    /// Ajuste manual: positivo entra como lote de ajuste pelo custo médio,
    /// negativo baixa os lotes FEFO.
    pub async fn adjust(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &StockAdjustmentPayload,
    ) -> Result<Ingredient, AppError> {
        if payload.quantity.is_zero() {
            return Err(field_error("quantity", "range", "O ajuste não pode ser zero."));
        }

        let mut tx = conn.begin().await?;

        let ingredient = self
            .inventory_repo
            .find_ingredient_for_update(&mut *tx, tenant_id, payload.ingredient_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Insumo".into()))?;

        let reason: StockMovementReason = payload.reason.into();
        let notes = payload.notes.as_deref();

        let updated = if payload.quantity.is_sign_positive() {
            let lot = self
                .inventory_repo
                .create_lot(
                    &mut *tx,
                    tenant_id,
                    ingredient.id,
                    None,
                    &generated_lot_code("AJUSTE"),
                    None,
                    payload.quantity,
                    ingredient.average_cost,
                )
                .await?;
            self.inventory_repo
                .record_stock_movement(
                    &mut *tx,
                    tenant_id,
                    ingredient.id,
                    Some(lot.id),
                    payload.quantity,
                    reason,
                    Some(ingredient.average_cost),
                    None,
                    notes,
                )
                .await?;
            self.inventory_repo
                .change_stock(&mut *tx, tenant_id, ingredient.id, payload.quantity)
                .await?
        } else {
            self.consume(&mut *tx, tenant_id, &ingredient, payload.quantity.abs(), reason, None, notes)
                .await?
        };

        tx.commit().await?;

        tracing::info!(%tenant_id, ingredient_id = %ingredient.id, quantity = %payload.quantity, "Ajuste de estoque");
        Ok(updated)
    }

    // ---
    // Consultas
    // ---

    pub async fn list_lots<'e, E>(&self, executor: E, tenant_id: Uuid, query: &LotQuery) -> Result<Vec<IngredientLot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let expiring_before = query
            .expiring_within_days
            .map(|days| expiry_cutoff(Utc::now().date_naive(), days))
            .transpose()?;

        self.inventory_repo
            .list_open_lots(executor, tenant_id, query.ingredient_id, expiring_before)
            .await
    }

    pub async fn alerts(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<InventoryAlerts, AppError> {
        let today = Utc::now().date_naive();

        let low_stock = self.inventory_repo.low_stock_ingredients(&mut *conn, tenant_id).await?;
        let expiring_lots = self
            .inventory_repo
            .expiring_lots(&mut *conn, tenant_id, today, today + Duration::days(EXPIRY_ALERT_DAYS))
            .await?;

        Ok(InventoryAlerts { low_stock, expiring_lots })
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
        self.inventory_repo.list_movements(executor, tenant_id, ingredient_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lot(remaining: &str, expiration: Option<(i32, u32, u32)>, created_at: DateTime<Utc>) -> IngredientLot {
        IngredientLot {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            ingredient_id: Uuid::nil(),
            location_id: None,
            lot_code: "L1".into(),
            expiration_date: expiration.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            initial_quantity: dec(remaining),
            remaining_quantity: dec(remaining),
            unit_cost: dec("2"),
            created_at,
        }
    }

    #[test]
    fn average_cost_weights_by_quantity() {
        let avg = calculate_new_average_cost(dec("10"), dec("4"), dec("30"), dec("8"));
        assert_eq!(avg, dec("7"));
    }

    #[test]
    fn average_cost_is_zero_when_total_is_not_positive() {
        assert_eq!(calculate_new_average_cost(dec("0"), dec("5"), dec("0"), dec("9")), Decimal::ZERO);
        assert_eq!(calculate_new_average_cost(dec("-3"), dec("5"), dec("2"), dec("9")), Decimal::ZERO);
    }

    #[test]
    fn consumes_earliest_expiry_first_and_undated_lots_last() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let undated = lot("5", None, t0);
        let late = lot("5", Some((2025, 6, 1)), t0);
        let early = lot("3", Some((2025, 3, 1)), t0 + Duration::hours(1));

        let (takes, uncovered) = plan_lot_consumption(&[undated.clone(), late.clone(), early.clone()], dec("10"));

        let order: Vec<Uuid> = takes.iter().map(|t| t.lot_id).collect();
        assert_eq!(order, vec![early.id, late.id, undated.id]);
        assert_eq!(takes[0].quantity, dec("3"));
        assert_eq!(takes[1].quantity, dec("5"));
        assert_eq!(takes[2].quantity, dec("2"));
        assert_eq!(uncovered, Decimal::ZERO);
    }

    #[test]
    fn same_expiry_breaks_ties_by_entry_time() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let newer = lot("4", Some((2025, 3, 1)), t0 + Duration::days(2));
        let older = lot("4", Some((2025, 3, 1)), t0);

        let (takes, _) = plan_lot_consumption(&[newer, older.clone()], dec("1"));
        assert_eq!(takes.len(), 1);
        assert_eq!(takes[0].lot_id, older.id);
    }

    #[test]
    fn reports_what_no_lot_could_cover() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let (takes, uncovered) = plan_lot_consumption(&[lot("1.5", None, t0), lot("0", None, t0)], dec("4"));
        assert_eq!(takes.len(), 1);
        assert_eq!(uncovered, dec("2.5"));
    }

    #[test]
    fn expiry_cutoff_adds_days_to_today() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 20).unwrap();
        assert_eq!(expiry_cutoff(today, 0).unwrap(), today);
        assert_eq!(expiry_cutoff(today, 15).unwrap(), NaiveDate::from_ymd_opt(2026, 1, 4).unwrap());
    }

    #[test]
    fn huge_expiry_window_is_a_validation_error_not_a_panic() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 20).unwrap();
        assert!(matches!(expiry_cutoff(today, i32::MAX), Err(AppError::ValidationError(_))));
        assert!(matches!(expiry_cutoff(today, -1), Err(AppError::ValidationError(_))));

        use validator::Validate;
        let query = LotQuery { ingredient_id: None, expiring_within_days: Some(i32::MAX) };
        assert!(query.validate().is_err());
        let query = LotQuery { ingredient_id: None, expiring_within_days: Some(30) };
        assert!(query.validate().is_ok());
    }
}
