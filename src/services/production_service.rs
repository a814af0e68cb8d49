// src/services/production_service.rs

use rust_decimal::Decimal;
use sqlx::{Connection, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{InventoryRepository, ProductRepository, ProductionRepository, TenantRepository},
    models::{
        inventory::StockMovementReason,
        production::{
            BoardCard, BoardColumn, CreateProductionOrderPayload, ProductionOrder, ProductionStage, StageHistoryEntry,
        },
        products::RecipeLine,
    },
    services::{inventory_service::InventoryService, product_service::quantity_per_unit},
};

/// Monta as colunas do quadro na ordem do fluxo, mantendo a ordem dos cartões.
pub fn group_board(cards: Vec<BoardCard>) -> Vec<BoardColumn> {
    let mut columns: Vec<BoardColumn> = ProductionStage::BOARD
        .iter()
        .map(|stage| BoardColumn { stage: *stage, cards: Vec::new() })
        .collect();

    for card in cards {
        if let Some(column) = columns.iter_mut().find(|c| c.stage == card.stage) {
            column.cards.push(card);
        }
    }
    columns
}

/// Quanto de cada insumo a ordem consome (quantidade × ficha por unidade).
pub fn order_requirements(lines: &[RecipeLine], yield_quantity: Decimal, order_quantity: Decimal) -> Vec<(Uuid, Decimal)> {
    lines
        .iter()
        .map(|line| {
            let required = (quantity_per_unit(line, yield_quantity) * order_quantity).round_dp(4);
            (line.ingredient_id, required)
        })
        .filter(|(_, required)| *required > Decimal::ZERO)
        .collect()
}

/// O que um movimento no quadro faz com o estoque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEffects {
    /// Baixa os insumos da ficha técnica
    pub consume: bool,
    /// Entrada do produto pronto
    pub stock_in: bool,
    /// Registra a perda dos insumos já baixados
    pub loss: bool,
    /// `ingredients_consumed` depois do movimento
    pub consumed: bool,
}

/// Decide os efeitos do movimento `from → to`. A baixa acontece só na primeira
/// saída do BACKLOG; voltar e sair de novo não baixa outra vez.
pub fn stage_effects(from: ProductionStage, to: ProductionStage, consumed: bool) -> Result<StageEffects, AppError> {
    if !from.can_move_to(to) {
        return Err(AppError::InvalidStageTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }

    let consume = from.starts_production(to) && !consumed;
    let consumed = consumed || consume;
    Ok(StageEffects {
        consume,
        stock_in: to == ProductionStage::Done,
        loss: to == ProductionStage::Cancelled && consumed,
        consumed,
    })
}

#[derive(Clone)]
pub struct ProductionService {
    production_repo: ProductionRepository,
    product_repo: ProductRepository,
    inventory_repo: InventoryRepository,
    tenant_repo: TenantRepository,
    inventory_service: InventoryService,
}

impl ProductionService {
    pub fn new(
        production_repo: ProductionRepository,
        product_repo: ProductRepository,
        inventory_repo: InventoryRepository,
        tenant_repo: TenantRepository,
        inventory_service: InventoryService,
    ) -> Self {
        Self { production_repo, product_repo, inventory_repo, tenant_repo, inventory_service }
    }

    pub async fn create_order(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        user_id: Uuid,
        payload: &CreateProductionOrderPayload,
    ) -> Result<ProductionOrder, AppError> {
        let mut tx = conn.begin().await?;

        self.product_repo
            .find_product(&mut *tx, tenant_id, payload.product_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Produto".into()))?;

        if let Some(location_id) = payload.location_id {
            if !self.tenant_repo.location_exists(&mut *tx, tenant_id, location_id).await? {
                return Err(AppError::ResourceNotFound("Local".into()));
            }
        }

        let order = self
            .production_repo
            .create_order(
                &mut *tx,
                tenant_id,
                payload.product_id,
                payload.quantity,
                payload.location_id,
                payload.due_date,
                payload.notes.as_deref(),
                user_id,
            )
            .await?;

        self.production_repo
            .record_history(&mut *tx, tenant_id, order.id, None, ProductionStage::Backlog, user_id)
            .await?;

        tx.commit().await?;

        tracing::info!(%tenant_id, order_id = %order.id, display_id = order.display_id, "Ordem de produção criada");
        Ok(order)
    }

    /// Move o cartão no quadro. A ordem fica travada até o commit:
    /// a baixa de insumos acontece uma única vez, na primeira saída do BACKLOG.
    pub async fn move_order(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order_id: Uuid,
        user_id: Uuid,
        to_stage: ProductionStage,
    ) -> Result<ProductionOrder, AppError> {
        let mut tx = conn.begin().await?;

        // 1. Trava a ordem
        let order = self
            .production_repo
            .find_order_for_update(&mut *tx, tenant_id, order_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de produção".into()))?;

        let from_stage = order.stage;
        let effects = stage_effects(from_stage, to_stage, order.ingredients_consumed)?;

        // 2. Baixa de insumos
        if effects.consume {
            self.consume_ingredients(&mut *tx, tenant_id, &order).await?;
        }

        // 3. Efeitos da etapa de destino
        if effects.stock_in {
            self.product_repo
                .change_stock(&mut *tx, tenant_id, order.product_id, order.quantity)
                .await?;
        }
        if effects.loss {
            self.record_production_loss(&mut *tx, tenant_id, &order).await?;
        }

        // 4. Etapa + histórico
        let updated = self
            .production_repo
            .update_stage(&mut *tx, tenant_id, order_id, to_stage, effects.consumed)
            .await?;
        self.production_repo
            .record_history(&mut *tx, tenant_id, order_id, Some(from_stage), to_stage, user_id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            %tenant_id,
            %order_id,
            from = from_stage.as_str(),
            to = to_stage.as_str(),
            "Ordem de produção movimentada"
        );
        Ok(updated)
    }

    async fn consume_ingredients(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order: &ProductionOrder,
    ) -> Result<(), AppError> {
        let product = self
            .product_repo
            .find_product(&mut *conn, tenant_id, order.product_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Produto".into()))?;

        let recipe = self
            .product_repo
            .find_recipe(&mut *conn, tenant_id, order.product_id)
            .await?
            .ok_or_else(|| AppError::RecipeNotFound(product.name.clone()))?;

        let lines = self.product_repo.recipe_lines(&mut *conn, tenant_id, order.product_id).await?;
        let requirements = order_requirements(&lines, recipe.yield_quantity, order.quantity);
        if requirements.is_empty() {
            return Err(AppError::RecipeNotFound(product.name));
        }

        let ids: Vec<Uuid> = requirements.iter().map(|(id, _)| *id).collect();
        let ingredients = self.inventory_repo.lock_ingredients(&mut *conn, tenant_id, &ids).await?;

        let notes = format!("OP #{}", order.display_id);
        for (ingredient_id, required) in requirements {
            let ingredient = ingredients
                .iter()
                .find(|i| i.id == ingredient_id)
                .ok_or_else(|| AppError::ResourceNotFound("Insumo".into()))?;

            self.inventory_service
                .consume(
                    &mut *conn,
                    tenant_id,
                    ingredient,
                    required,
                    StockMovementReason::ProductionConsumption,
                    Some(order.id),
                    Some(&notes),
                )
                .await?;
        }
        Ok(())
    }

    /// Cancelamento depois da baixa: os insumos não voltam ao estoque,
    /// a perda fica registrada no histórico de movimentações.
    async fn record_production_loss(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order: &ProductionOrder,
    ) -> Result<(), AppError> {
        let recipe = match self.product_repo.find_recipe(&mut *conn, tenant_id, order.product_id).await? {
            Some(recipe) => recipe,
            None => return Ok(()),
        };
        let lines = self.product_repo.recipe_lines(&mut *conn, tenant_id, order.product_id).await?;

        for (ingredient_id, lost) in order_requirements(&lines, recipe.yield_quantity, order.quantity) {
            let notes = format!("OP #{} cancelada: perda de {}", order.display_id, lost.normalize());
            self.inventory_repo
                .record_stock_movement(
                    &mut *conn,
                    tenant_id,
                    ingredient_id,
                    None,
                    Decimal::ZERO,
                    StockMovementReason::ProductionLoss,
                    None,
                    Some(order.id),
                    Some(&notes),
                )
                .await?;
        }
        Ok(())
    }

    pub async fn board<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<BoardColumn>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cards = self.production_repo.board_cards(executor, tenant_id).await?;
        Ok(group_board(cards))
    }

    pub async fn history(&self, conn: &mut PgConnection, tenant_id: Uuid, order_id: Uuid) -> Result<Vec<StageHistoryEntry>, AppError> {

        if !self.production_repo.order_exists(&mut *conn, tenant_id, order_id).await? {
            return Err(AppError::ResourceNotFound("Ordem de produção".into()));
        }
        self.production_repo.history(&mut *conn, tenant_id, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::MeasureUnit;
    use chrono::{NaiveDate, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn card(stage: ProductionStage, display_id: i32) -> BoardCard {
        BoardCard {
            id: Uuid::new_v4(),
            display_id,
            product_id: Uuid::nil(),
            product_name: "Brigadeiro".into(),
            quantity: dec("100"),
            stage,
            due_date: NaiveDate::from_ymd_opt(2025, 5, 10),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn board_has_every_column_in_flow_order() {
        let columns = group_board(vec![]);
        let stages: Vec<ProductionStage> = columns.iter().map(|c| c.stage).collect();
        assert_eq!(stages, ProductionStage::BOARD.to_vec());
        assert!(columns.iter().all(|c| c.cards.is_empty()));
    }

    #[test]
    fn cards_keep_their_order_inside_the_column() {
        let cards = vec![
            card(ProductionStage::Baking, 3),
            card(ProductionStage::Backlog, 1),
            card(ProductionStage::Baking, 2),
        ];
        let columns = group_board(cards);

        let baking: Vec<i32> = columns[2].cards.iter().map(|c| c.display_id).collect();
        assert_eq!(baking, vec![3, 2]);
        assert_eq!(columns[0].cards.len(), 1);
    }

    #[test]
    fn requirements_scale_the_recipe_to_the_order() {
        let line = RecipeLine {
            ingredient_id: Uuid::new_v4(),
            ingredient_name: "Leite condensado".into(),
            unit: MeasureUnit::G,
            quantity: dec("395"),
            loss_percent: dec("0"),
            average_cost: dec("0.02"),
            current_stock: dec("1000"),
        };
        // A receita rende 25 brigadeiros; a ordem pede 100
        let req = order_requirements(&[line.clone()], dec("25"), dec("100"));
        assert_eq!(req, vec![(line.ingredient_id, dec("1580"))]);
    }

    #[test]
    fn ingredients_are_consumed_once_across_back_and_forth() {
        use ProductionStage::*;

        let mut consumed = false;
        let mut consumptions = 0;
        for (from, to) in [(Backlog, Preparation), (Preparation, Backlog), (Backlog, Preparation), (Preparation, Baking)] {
            let effects = stage_effects(from, to, consumed).unwrap();
            if effects.consume {
                consumptions += 1;
            }
            assert!(!effects.stock_in && !effects.loss);
            consumed = effects.consumed;
        }
        assert_eq!(consumptions, 1);
        assert!(consumed);
    }

    #[test]
    fn done_adds_stock_and_is_final() {
        use ProductionStage::*;

        let effects = stage_effects(Finishing, Done, true).unwrap();
        assert_eq!(effects, StageEffects { consume: false, stock_in: true, loss: false, consumed: true });

        for to in [Finishing, Cancelled, Done] {
            assert!(matches!(stage_effects(Done, to, true), Err(AppError::InvalidStageTransition { .. })));
        }
    }

    #[test]
    fn cancelling_records_a_loss_only_after_consumption() {
        use ProductionStage::*;

        let before = stage_effects(Backlog, Cancelled, false).unwrap();
        assert!(!before.consume && !before.loss && !before.stock_in);

        let after = stage_effects(Baking, Cancelled, true).unwrap();
        assert!(after.loss && !after.consume && !after.stock_in);

        assert!(stage_effects(Cancelled, Backlog, true).is_err());
    }

    #[test]
    fn skipping_stages_is_rejected() {
        assert!(stage_effects(ProductionStage::Backlog, ProductionStage::Baking, false).is_err());
        assert!(stage_effects(ProductionStage::Backlog, ProductionStage::Done, false).is_err());
    }
}
