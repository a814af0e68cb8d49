// src/models/production.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::inventory::validate_positive;

/// Colunas do quadro Kanban de produção, na ordem em que aparecem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "production_stage", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionStage {
    Backlog,
    Preparation,
    Baking,
    Finishing,
    Done,
    Cancelled,
}

impl ProductionStage {
    pub const BOARD: [ProductionStage; 6] = [
        ProductionStage::Backlog,
        ProductionStage::Preparation,
        ProductionStage::Baking,
        ProductionStage::Finishing,
        ProductionStage::Done,
        ProductionStage::Cancelled,
    ];

    /// Posição no fluxo; CANCELLED fica fora da sequência.
    fn index(self) -> Option<usize> {
        match self {
            ProductionStage::Backlog => Some(0),
            ProductionStage::Preparation => Some(1),
            ProductionStage::Baking => Some(2),
            ProductionStage::Finishing => Some(3),
            ProductionStage::Done => Some(4),
            ProductionStage::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProductionStage::Done | ProductionStage::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProductionStage::Backlog => "BACKLOG",
            ProductionStage::Preparation => "PREPARATION",
            ProductionStage::Baking => "BAKING",
            ProductionStage::Finishing => "FINISHING",
            ProductionStage::Done => "DONE",
            ProductionStage::Cancelled => "CANCELLED",
        }
    }

    /// Um passo para frente, um passo para trás, ou cancelar;
    /// DONE e CANCELLED não saem do lugar.
    pub fn can_move_to(self, target: ProductionStage) -> bool {
        if self.is_terminal() || self == target {
            return false;
        }
        if target == ProductionStage::Cancelled {
            return true;
        }
        match (self.index(), target.index()) {
            (Some(from), Some(to)) => from.abs_diff(to) == 1,
            _ => false,
        }
    }

    /// Sair do BACKLOG é o início da produção: é aqui que os insumos são baixados.
    pub fn starts_production(self, target: ProductionStage) -> bool {
        self == ProductionStage::Backlog && target == ProductionStage::Preparation
    }
}

// Ordem de produção
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductionOrder {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = 42)]
    pub display_id: i32,
    pub product_id: Uuid,
    pub location_id: Option<Uuid>,
    #[schema(example = "24")]
    pub quantity: Decimal,
    pub stage: ProductionStage,
    pub ingredients_consumed: bool,
    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cartão do quadro (ordem + nome do produto).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardCard {
    pub id: Uuid,
    pub display_id: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Decimal,
    pub stage: ProductionStage,
    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub stage: ProductionStage,
    pub cards: Vec<BoardCard>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageHistoryEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub from_stage: Option<ProductionStage>,
    pub to_stage: ProductionStage,
    pub moved_by: Option<Uuid>,
    pub moved_at: DateTime<Utc>,
}

/// Por quantos dias DONE/CANCELLED continuam visíveis no quadro.
pub const BOARD_ARCHIVE_DAYS: i64 = 7;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductionOrderPayload {
    pub product_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
    pub location_id: Option<Uuid>,
    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveOrderPayload {
    pub to_stage: ProductionStage,
}

#[cfg(test)]
mod tests {
    use super::ProductionStage::*;

    #[test]
    fn moves_one_step_in_either_direction() {
        assert!(Backlog.can_move_to(Preparation));
        assert!(Baking.can_move_to(Finishing));
        assert!(Baking.can_move_to(Preparation));
        assert!(Finishing.can_move_to(Done));
    }

    #[test]
    fn rejects_jumps_and_noop_moves() {
        assert!(!Backlog.can_move_to(Baking));
        assert!(!Preparation.can_move_to(Done));
        assert!(!Baking.can_move_to(Baking));
    }

    #[test]
    fn terminal_stages_are_frozen() {
        assert!(!Done.can_move_to(Finishing));
        assert!(!Done.can_move_to(Cancelled));
        assert!(!Cancelled.can_move_to(Backlog));
    }

    #[test]
    fn any_open_stage_can_be_cancelled() {
        for stage in [Backlog, Preparation, Baking, Finishing] {
            assert!(stage.can_move_to(Cancelled), "{:?}", stage);
        }
    }

    #[test]
    fn only_backlog_to_preparation_starts_production() {
        assert!(Backlog.starts_production(Preparation));
        assert!(!Preparation.starts_production(Baking));
        assert!(!Backlog.starts_production(Cancelled));
    }
}
