// src/services/purchasing_service.rs

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{field_error, AppError},
    db::{InventoryRepository, ProductRepository, ProductionRepository, PurchasingRepository, TenantRepository},
    models::purchasing::{
        CreatePurchaseOrderPayload, FromSuggestionsPayload, PlannedProduction, PlanningIngredient, PlanningRecipeLine,
        PurchaseOrder, PurchaseOrderDetail, PurchaseOrderItemPayload, PurchaseOrderStatus, PurchaseSuggestion,
        ReceivePayload, SuggestionRequest, SupplierSuggestionGroup,
    },
    services::inventory_service::{IncomingStock, InventoryService},
};

pub const DEFAULT_HORIZON_DAYS: i32 = 7;

/// Arredonda para cima até o múltiplo de compra (embalagem ≤ 0 conta como 1).
pub fn round_up_to_package(net: Decimal, package_size: Decimal) -> Decimal {
    let package = if package_size <= Decimal::ZERO { Decimal::ONE } else { package_size };
    if net <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (net / package).ceil() * package
}

/// MRP: explode o plano de produção pelas fichas técnicas, compara com estoque
/// e mínimo, e agrupa o que precisa ser comprado por fornecedor.
pub fn calculate_purchase_needs(
    plan: &[PlannedProduction],
    lines: &[PlanningRecipeLine],
    ingredients: &[PlanningIngredient],
) -> Vec<SupplierSuggestionGroup> {
    // 1. Necessidade bruta por insumo
    let mut gross: HashMap<Uuid, Decimal> = HashMap::new();
    for planned in plan {
        for line in lines.iter().filter(|l| l.product_id == planned.product_id) {
            if line.yield_quantity <= Decimal::ZERO {
                continue;
            }
            let need = planned.quantity * line.quantity * (Decimal::ONE + line.loss_percent / Decimal::ONE_HUNDRED)
                / line.yield_quantity;
            *gross.entry(line.ingredient_id).or_default() += need;
        }
    }

    // 2. Líquida + múltiplo de compra, agrupando por fornecedor
    let mut groups: Vec<SupplierSuggestionGroup> = Vec::new();
    for ing in ingredients {
        let gross_requirement = gross.get(&ing.ingredient_id).copied().unwrap_or_default().round_dp(4);
        let net_requirement = (gross_requirement + ing.minimum_stock - ing.current_stock).max(Decimal::ZERO);
        let suggested_quantity = round_up_to_package(net_requirement, ing.purchase_package_size);
        if suggested_quantity <= Decimal::ZERO {
            continue;
        }

        let unit_cost = ing.last_cost.unwrap_or(ing.average_cost);
        let suggestion = PurchaseSuggestion {
            ingredient_id: ing.ingredient_id,
            ingredient_name: ing.ingredient_name.clone(),
            unit: ing.unit,
            gross_requirement,
            current_stock: ing.current_stock,
            minimum_stock: ing.minimum_stock,
            net_requirement,
            package_size: ing.purchase_package_size,
            suggested_quantity,
            unit_cost,
            estimated_cost: (suggested_quantity * unit_cost).round_dp(2),
        };

        match groups.iter_mut().find(|g| g.supplier_id == ing.supplier_id) {
            Some(group) => {
                group.total_estimated_cost += suggestion.estimated_cost;
                group.items.push(suggestion);
            }
            None => groups.push(SupplierSuggestionGroup {
                supplier_id: ing.supplier_id,
                supplier_name: ing.supplier_name.clone(),
                total_estimated_cost: suggestion.estimated_cost,
                items: vec![suggestion],
            }),
        }
    }

    // Fornecedores em ordem alfabética, "sem fornecedor" por último
    groups.sort_by(|a, b| {
        (a.supplier_id.is_none(), &a.supplier_name).cmp(&(b.supplier_id.is_none(), &b.supplier_name))
    });
    groups
}

/// Só pedido enviado pode ser recebido; RECEIVED de novo é erro.
pub fn ensure_receivable(status: PurchaseOrderStatus) -> Result<(), AppError> {
    if status != PurchaseOrderStatus::Sent {
        return Err(AppError::InvalidStatusTransition {
            from: status.as_str().to_string(),
            to: PurchaseOrderStatus::Received.as_str().to_string(),
        });
    }
    Ok(())
}

/// Código do lote recebido; vazio conta como não informado.
pub fn receipt_lot_code(informed: Option<&str>, display_id: i32, line: usize) -> String {
    match informed.map(str::trim).filter(|code| !code.is_empty()) {
        Some(code) => code.to_string(),
        None => format!("PC{display_id}-{line}"),
    }
}

#[derive(Clone)]
pub struct PurchasingService {
    purchasing_repo: PurchasingRepository,
    production_repo: ProductionRepository,
    inventory_repo: InventoryRepository,
    product_repo: ProductRepository,
    tenant_repo: TenantRepository,
    inventory_service: InventoryService,
}

impl PurchasingService {
    pub fn new(
        purchasing_repo: PurchasingRepository,
        production_repo: ProductionRepository,
        inventory_repo: InventoryRepository,
        product_repo: ProductRepository,
        tenant_repo: TenantRepository,
        inventory_service: InventoryService,
    ) -> Self {
        Self { purchasing_repo, production_repo, inventory_repo, product_repo, tenant_repo, inventory_service }
    }

    // ---
    // Sugestões (MRP)
    // ---

    pub async fn suggestions(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        request: &SuggestionRequest,
    ) -> Result<Vec<SupplierSuggestionGroup>, AppError> {
        self.compute_suggestions(&mut *conn, tenant_id, request.horizon_days, &request.extra_plan)
            .await
    }

    async fn compute_suggestions(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        horizon_days: Option<i32>,
        extra_plan: &[PlannedProduction],
    ) -> Result<Vec<SupplierSuggestionGroup>, AppError> {
        let horizon = Utc::now().date_naive() + Duration::days(i64::from(horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS)));

        let mut plan = self.production_repo.planned_production(&mut *conn, tenant_id, horizon).await?;
        plan.extend_from_slice(extra_plan);

        let product_ids: Vec<Uuid> = plan
            .iter()
            .map(|p| p.product_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let lines = self.purchasing_repo.planning_recipe_lines(&mut *conn, tenant_id, &product_ids).await?;
        let ingredients = self.purchasing_repo.planning_ingredients(&mut *conn, tenant_id).await?;

        Ok(calculate_purchase_needs(&plan, &lines, &ingredients))
    }

    // ---
    // Pedidos de compra
    // ---

    pub async fn create_order(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        user_id: Uuid,
        payload: &CreatePurchaseOrderPayload,
    ) -> Result<PurchaseOrderDetail, AppError> {
        let mut tx = conn.begin().await?;
        let order = self
            .insert_order(
                &mut *tx,
                tenant_id,
                user_id,
                payload.supplier_id,
                payload.expected_date,
                payload.notes.as_deref(),
                &payload.items,
            )
            .await?;
        let detail = self.load_detail(&mut *tx, tenant_id, order).await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, order_id = %detail.header.id, "Pedido de compra criado");
        Ok(detail)
    }

    /// Pedido em rascunho com as sugestões atuais de um fornecedor.
    pub async fn create_from_suggestions(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        user_id: Uuid,
        payload: &FromSuggestionsPayload,
    ) -> Result<PurchaseOrderDetail, AppError> {
        let mut tx = conn.begin().await?;

        let groups = self
            .compute_suggestions(&mut *tx, tenant_id, payload.horizon_days, &payload.extra_plan)
            .await?;
        let group = groups
            .into_iter()
            .find(|g| g.supplier_id == Some(payload.supplier_id))
            .ok_or_else(|| AppError::ResourceNotFound("Sugestão de compra para o fornecedor".into()))?;

        let items: Vec<PurchaseOrderItemPayload> = group
            .items
            .iter()
            .map(|s| PurchaseOrderItemPayload {
                ingredient_id: s.ingredient_id,
                quantity: s.suggested_quantity,
                unit_cost: s.unit_cost,
            })
            .collect();

        let order = self
            .insert_order(
                &mut *tx,
                tenant_id,
                user_id,
                payload.supplier_id,
                payload.expected_date,
                Some("Gerado a partir das sugestões de compra"),
                &items,
            )
            .await?;
        let detail = self.load_detail(&mut *tx, tenant_id, order).await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, order_id = %detail.header.id, items = items.len(), "Pedido de compra gerado pelo MRP");
        Ok(detail)
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_order(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        user_id: Uuid,
        supplier_id: Uuid,
        expected_date: Option<chrono::NaiveDate>,
        notes: Option<&str>,
        items: &[PurchaseOrderItemPayload],
    ) -> Result<PurchaseOrder, AppError> {
        self.inventory_repo
            .find_supplier(&mut *conn, tenant_id, supplier_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Fornecedor".into()))?;

        let ids: HashSet<Uuid> = items.iter().map(|i| i.ingredient_id).collect();
        if ids.len() != items.len() {
            return Err(field_error("items", "duplicate", "O mesmo insumo aparece mais de uma vez no pedido."));
        }
        let ids: Vec<Uuid> = ids.into_iter().collect();
        if self.product_repo.count_ingredients(&mut *conn, tenant_id, &ids).await? != ids.len() as i64 {
            return Err(AppError::ResourceNotFound("Insumo".into()));
        }

        let total: Decimal = items.iter().map(|i| i.quantity * i.unit_cost).sum::<Decimal>().round_dp(2);

        let order = self
            .purchasing_repo
            .create_order(&mut *conn, tenant_id, supplier_id, expected_date, notes, total, user_id)
            .await?;
        self.purchasing_repo.insert_items(&mut *conn, tenant_id, order.id, items).await?;
        Ok(order)
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
        self.purchasing_repo.list_orders(executor, tenant_id, status).await
    }

    pub async fn get_order(&self, conn: &mut PgConnection, tenant_id: Uuid, order_id: Uuid) -> Result<PurchaseOrderDetail, AppError> {
        let order = self
            .purchasing_repo
            .find_order(&mut *conn, tenant_id, order_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido de compra".into()))?;
        self.load_detail(&mut *conn, tenant_id, order).await
    }

    async fn load_detail(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order: PurchaseOrder,
    ) -> Result<PurchaseOrderDetail, AppError> {
        let supplier_name = self
            .inventory_repo
            .find_supplier(&mut *conn, tenant_id, order.supplier_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_default();
        let items = self.purchasing_repo.order_items(&mut *conn, tenant_id, order.id).await?;

        Ok(PurchaseOrderDetail { header: order, supplier_name, items })
    }

    /// DRAFT → SENT, DRAFT|SENT → CANCELLED.
    pub async fn change_status(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order_id: Uuid,
        status: PurchaseOrderStatus,
    ) -> Result<PurchaseOrder, AppError> {
        let mut tx = conn.begin().await?;

        let order = self
            .purchasing_repo
            .find_order_for_update(&mut *tx, tenant_id, order_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido de compra".into()))?;

        if !order.status.can_change_to(status) {
            return Err(AppError::InvalidStatusTransition {
                from: order.status.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        let updated = self.purchasing_repo.set_status(&mut *tx, tenant_id, order_id, status).await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, %order_id, status = status.as_str(), "Status do pedido de compra alterado");
        Ok(updated)
    }

    /// Recebimento: cada linha vira uma entrada de estoque (lote + custo médio + último custo).
    pub async fn receive(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order_id: Uuid,
        payload: &ReceivePayload,
    ) -> Result<PurchaseOrderDetail, AppError> {
        let mut tx = conn.begin().await?;

        // 1. Trava o pedido: dois recebimentos simultâneos não duplicam estoque
        let order = self
            .purchasing_repo
            .find_order_for_update(&mut *tx, tenant_id, order_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Pedido de compra".into()))?;

        ensure_receivable(order.status)?;

        if let Some(location_id) = payload.location_id {
            if !self.tenant_repo.location_exists(&mut *tx, tenant_id, location_id).await? {
                return Err(AppError::ResourceNotFound("Local".into()));
            }
        }

        let items = self.purchasing_repo.order_items(&mut *tx, tenant_id, order_id).await?;
        if let Some(unknown) = payload.items.iter().find(|r| !items.iter().any(|i| i.id == r.item_id)) {
            return Err(AppError::ResourceNotFound(format!("Item do pedido {}", unknown.item_id)));
        }

        // 2. Trava os insumos em ordem de id
        let ids: Vec<Uuid> = items.iter().map(|i| i.ingredient_id).collect();
        let mut ingredients = self.inventory_repo.lock_ingredients(&mut *tx, tenant_id, &ids).await?;

        // 3. Entradas
        let notes = format!("Pedido de compra #{}", order.display_id);
        for (idx, item) in items.iter().enumerate() {
            let receipt = payload.items.iter().find(|r| r.item_id == item.id);
            let lot_code = receipt_lot_code(receipt.and_then(|r| r.lot_code.as_deref()), order.display_id, idx + 1);

            let ingredient = ingredients
                .iter_mut()
                .find(|i| i.id == item.ingredient_id)
                .ok_or_else(|| AppError::ResourceNotFound("Insumo".into()))?;

            let incoming = IncomingStock {
                quantity: item.quantity,
                unit_cost: item.unit_cost,
                lot_code: Some(&lot_code),
                expiration_date: receipt.and_then(|r| r.expiration_date),
                location_id: payload.location_id,
                reference_id: Some(order.id),
                notes: Some(&notes),
            };
            self.inventory_service
                .receive_stock(&mut *tx, tenant_id, ingredient, &incoming)
                .await?;

            // Mantém o saldo em memória para o custo médio de linhas seguintes do mesmo insumo
            ingredient.average_cost = crate::services::inventory_service::calculate_new_average_cost(
                ingredient.current_stock,
                ingredient.average_cost,
                item.quantity,
                item.unit_cost,
            );
            ingredient.current_stock += item.quantity;
        }

        // 4. Status
        let received = self
            .purchasing_repo
            .set_status(&mut *tx, tenant_id, order_id, PurchaseOrderStatus::Received)
            .await?;
        let detail = self.load_detail(&mut *tx, tenant_id, received).await?;

        tx.commit().await?;

        tracing::info!(%tenant_id, %order_id, lines = detail.items.len(), "Pedido de compra recebido");
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::MeasureUnit;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ingredient(name: &str, supplier: Option<(Uuid, &str)>, stock: &str, minimum: &str, package: &str) -> PlanningIngredient {
        PlanningIngredient {
            ingredient_id: Uuid::new_v4(),
            ingredient_name: name.into(),
            unit: MeasureUnit::Kg,
            supplier_id: supplier.map(|(id, _)| id),
            supplier_name: supplier.map(|(_, n)| n.to_string()),
            current_stock: dec(stock),
            minimum_stock: dec(minimum),
            purchase_package_size: dec(package),
            average_cost: dec("4"),
            last_cost: Some(dec("5")),
        }
    }

    fn recipe_line(product_id: Uuid, ingredient_id: Uuid, quantity: &str, loss: &str, yield_qty: &str) -> PlanningRecipeLine {
        PlanningRecipeLine {
            product_id,
            ingredient_id,
            quantity: dec(quantity),
            loss_percent: dec(loss),
            yield_quantity: dec(yield_qty),
        }
    }

    #[test]
    fn package_rounding_goes_up_to_the_next_multiple() {
        assert_eq!(round_up_to_package(dec("7"), dec("5")), dec("10"));
        assert_eq!(round_up_to_package(dec("10"), dec("5")), dec("10"));
        assert_eq!(round_up_to_package(dec("2.3"), dec("0")), dec("3"));
        assert_eq!(round_up_to_package(dec("0"), dec("5")), dec("0"));
    }

    #[test]
    fn explodes_plan_through_recipes_and_nets_against_stock() {
        let bolo = Uuid::new_v4();
        let supplier = Uuid::new_v4();
        let farinha = ingredient("Farinha", Some((supplier, "Moinho")), "3", "2", "5");

        // 10 bolos, receita rende 2 e usa 1 kg com 20% de perda → 6 kg brutos
        let lines = vec![recipe_line(bolo, farinha.ingredient_id, "1", "20", "2")];
        let plan = vec![PlannedProduction { product_id: bolo, quantity: dec("10") }];

        let groups = calculate_purchase_needs(&plan, &lines, &[farinha]);
        assert_eq!(groups.len(), 1);

        let s = &groups[0].items[0];
        assert_eq!(s.gross_requirement, dec("6"));
        assert_eq!(s.net_requirement, dec("5"));
        assert_eq!(s.suggested_quantity, dec("5"));
        assert_eq!(s.estimated_cost, dec("25"));
        assert_eq!(groups[0].total_estimated_cost, dec("25"));
    }

    #[test]
    fn minimum_stock_alone_triggers_a_suggestion() {
        let acucar = ingredient("Açúcar", None, "1", "4", "1");
        let groups = calculate_purchase_needs(&[], &[], &[acucar]);
        assert_eq!(groups[0].items[0].suggested_quantity, dec("3"));
        assert_eq!(groups[0].supplier_id, None);
    }

    #[test]
    fn covered_ingredients_are_left_out() {
        let ovo = ingredient("Ovo", None, "50", "10", "12");
        assert!(calculate_purchase_needs(&[], &[], &[ovo]).is_empty());
    }

    #[test]
    fn groups_by_supplier_with_unassigned_last() {
        let a = (Uuid::new_v4(), "Atacadão");
        let z = (Uuid::new_v4(), "Zona Sul");
        let ings = vec![
            ingredient("Cacau", None, "0", "1", "1"),
            ingredient("Leite", Some(z), "0", "1", "1"),
            ingredient("Manteiga", Some(a), "0", "1", "1"),
            ingredient("Creme", Some(z), "0", "2", "1"),
        ];

        let groups = calculate_purchase_needs(&[], &[], &ings);
        let names: Vec<Option<String>> = groups.iter().map(|g| g.supplier_name.clone()).collect();
        assert_eq!(names, vec![Some("Atacadão".into()), Some("Zona Sul".into()), None]);
        assert_eq!(groups[1].items.len(), 2);
        assert_eq!(groups[1].total_estimated_cost, dec("15"));
    }

    #[test]
    fn extra_plan_lines_must_be_positive_and_bounded() {
        use validator::Validate;

        let product = Uuid::new_v4();
        let request = |quantity: &str| -> SuggestionRequest {
            serde_json::from_value(serde_json::json!({
                "extraPlan": [{ "productId": product, "quantity": quantity }]
            }))
            .unwrap()
        };

        assert!(request("100").validate().is_ok());
        assert!(request("-1000").validate().is_err());
        assert!(request("0").validate().is_err());
        assert!(request("79228162514264337593543950335").validate().is_err());

        let from_suggestions: FromSuggestionsPayload = serde_json::from_value(serde_json::json!({
            "supplierId": Uuid::new_v4(),
            "extraPlan": [{ "productId": product, "quantity": "-5" }]
        }))
        .unwrap();
        assert!(from_suggestions.validate().is_err());
    }

    #[test]
    fn only_sent_orders_are_received_once() {
        assert!(ensure_receivable(PurchaseOrderStatus::Sent).is_ok());
        for status in [PurchaseOrderStatus::Draft, PurchaseOrderStatus::Received, PurchaseOrderStatus::Cancelled] {
            assert!(matches!(ensure_receivable(status), Err(AppError::InvalidStatusTransition { .. })));
        }
    }

    #[test]
    fn blank_lot_code_falls_back_to_the_order_code() {
        assert_eq!(receipt_lot_code(Some("L-2025-07"), 12, 1), "L-2025-07");
        assert_eq!(receipt_lot_code(Some(""), 12, 2), "PC12-2");
        assert_eq!(receipt_lot_code(Some("   "), 12, 3), "PC12-3");
        assert_eq!(receipt_lot_code(None, 12, 4), "PC12-4");
    }
}
