// src/services/product_service.rs

use std::collections::HashSet;

use rust_decimal::Decimal;
use sqlx::{Connection, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProductRepository,
    models::products::{
        IngredientRequirement, Product, ProductCosting, ProductPayload, Recipe, RecipeDetail, RecipeItemPayload,
        RecipeLine, RecipeLineCost, RecipePayload, YieldPayload, YieldSimulation,
    },
};

// ---
// Cálculos da ficha técnica
// ---

/// Quantidade do insumo por unidade produzida, já com a perda.
pub fn quantity_per_unit(line: &RecipeLine, yield_quantity: Decimal) -> Decimal {
    if yield_quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    line.quantity * (Decimal::ONE + line.loss_percent / Decimal::ONE_HUNDRED) / yield_quantity
}

pub fn cost_lines(lines: Vec<RecipeLine>, yield_quantity: Decimal) -> Vec<RecipeLineCost> {
    lines
        .into_iter()
        .map(|line| {
            let per_unit = quantity_per_unit(&line, yield_quantity);
            RecipeLineCost {
                quantity_per_unit: per_unit.round_dp(4),
                cost_per_unit: (per_unit * line.average_cost).round_dp(4),
                line,
            }
        })
        .collect()
}

/// Σ(quantidade × (1 + perda%) × custo médio) / rendimento
pub fn unit_cost(lines: &[RecipeLine], yield_quantity: Decimal) -> Decimal {
    lines
        .iter()
        .map(|line| quantity_per_unit(line, yield_quantity) * line.average_cost)
        .sum::<Decimal>()
        .round_dp(4)
}

/// Margem em valor e em % do preço de venda (0% quando o preço é zero).
pub fn margin(sale_price: Decimal, unit_cost: Decimal) -> (Decimal, Decimal) {
    let value = (sale_price - unit_cost).round_dp(2);
    if sale_price.is_zero() {
        return (value, Decimal::ZERO);
    }
    (value, ((sale_price - unit_cost) / sale_price * Decimal::ONE_HUNDRED).round_dp(2))
}

/// Quantas unidades inteiras o estoque atual permite produzir.
pub fn max_producible(lines: &[RecipeLine], yield_quantity: Decimal) -> Decimal {
    lines
        .iter()
        .filter_map(|line| {
            let per_unit = quantity_per_unit(line, yield_quantity);
            (per_unit > Decimal::ZERO).then(|| (line.current_stock.max(Decimal::ZERO) / per_unit).floor())
        })
        .min()
        .unwrap_or(Decimal::ZERO)
}

/// Necessidade de cada insumo para produzir `quantity` unidades.
pub fn simulate_yield(product_id: Uuid, quantity: Decimal, yield_quantity: Decimal, lines: &[RecipeLine]) -> YieldSimulation {
    let requirements: Vec<IngredientRequirement> = lines
        .iter()
        .map(|line| {
            let required = (quantity_per_unit(line, yield_quantity) * quantity).round_dp(4);
            IngredientRequirement {
                ingredient_id: line.ingredient_id,
                ingredient_name: line.ingredient_name.clone(),
                unit: line.unit,
                required,
                available: line.current_stock,
                shortage: (required - line.current_stock).max(Decimal::ZERO),
            }
        })
        .collect();

    let total_cost = lines
        .iter()
        .zip(&requirements)
        .map(|(line, req)| req.required * line.average_cost)
        .sum::<Decimal>()
        .round_dp(2);

    YieldSimulation {
        product_id,
        quantity,
        batches: (quantity / yield_quantity).round_dp(4),
        total_cost,
        can_produce: requirements.iter().all(|r| r.shortage.is_zero()),
        requirements,
    }
}

pub fn ensure_unique_ingredients(items: &[RecipeItemPayload]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.ingredient_id) {
            return Err(AppError::InvalidRecipe(format!(
                "insumo {} aparece mais de uma vez",
                item.ingredient_id
            )));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct ProductService {
    product_repo: ProductRepository,
}

impl ProductService {
    pub fn new(product_repo: ProductRepository) -> Self {
        Self { product_repo }
    }

    pub async fn create_product<'e, E>(&self, executor: E, tenant_id: Uuid, payload: &ProductPayload) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.product_repo.create_product(executor, tenant_id, payload).await
    }

    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        payload: &ProductPayload,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.product_repo
            .update_product(executor, tenant_id, product_id, payload)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Produto".into()))
    }

    pub async fn list_products<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.product_repo.list_products(executor, tenant_id).await
    }

    /// Substitui a ficha técnica inteira (cabeçalho + linhas) numa transação.
    pub async fn replace_recipe(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        product_id: Uuid,
        payload: &RecipePayload,
    ) -> Result<RecipeDetail, AppError> {
        ensure_unique_ingredients(&payload.items)?;

        let mut tx = conn.begin().await?;

        self.product_repo
            .find_product(&mut *tx, tenant_id, product_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Produto".into()))?;

        let ingredient_ids: Vec<Uuid> = payload.items.iter().map(|i| i.ingredient_id).collect();
        let found = self.product_repo.count_ingredients(&mut *tx, tenant_id, &ingredient_ids).await?;
        if found != ingredient_ids.len() as i64 {
            return Err(AppError::ResourceNotFound("Insumo".into()));
        }

        let recipe = self
            .product_repo
            .upsert_recipe_header(&mut *tx, tenant_id, product_id, payload.yield_quantity, payload.notes.as_deref())
            .await?;
        self.product_repo.clear_recipe_items(&mut *tx, tenant_id, product_id).await?;
        self.product_repo
            .insert_recipe_items(&mut *tx, tenant_id, product_id, &payload.items)
            .await?;

        let lines = self.product_repo.recipe_lines(&mut *tx, tenant_id, product_id).await?;

        tx.commit().await?;

        tracing::info!(%tenant_id, %product_id, lines = lines.len(), "Ficha técnica atualizada");
        let yield_quantity = recipe.yield_quantity;
        Ok(RecipeDetail { recipe, lines: cost_lines(lines, yield_quantity) })
    }

    pub async fn get_recipe(&self, conn: &mut PgConnection, tenant_id: Uuid, product_id: Uuid) -> Result<RecipeDetail, AppError> {
        let (_, recipe, lines) = self.load_recipe(&mut *conn, tenant_id, product_id).await?;
        let yield_quantity = recipe.yield_quantity;
        Ok(RecipeDetail { recipe, lines: cost_lines(lines, yield_quantity) })
    }

    pub async fn costing(&self, conn: &mut PgConnection, tenant_id: Uuid, product_id: Uuid) -> Result<ProductCosting, AppError> {
        let (product, recipe, lines) = self.load_recipe(&mut *conn, tenant_id, product_id).await?;

        let cost = unit_cost(&lines, recipe.yield_quantity);
        let (margin_value, margin_percent) = margin(product.sale_price, cost);

        Ok(ProductCosting {
            product_id,
            unit_cost: cost,
            sale_price: product.sale_price,
            margin_value,
            margin_percent,
            max_producible: max_producible(&lines, recipe.yield_quantity),
        })
    }

    /// Calculadora de rendimento: insumos necessários e faltas.
    pub async fn simulate_yield(&self, conn: &mut PgConnection, tenant_id: Uuid, payload: &YieldPayload) -> Result<YieldSimulation, AppError> {
        let (_, recipe, lines) = self.load_recipe(&mut *conn, tenant_id, payload.product_id).await?;
        Ok(simulate_yield(payload.product_id, payload.quantity, recipe.yield_quantity, &lines))
    }

    async fn load_recipe(
        &self,
        conn: &mut sqlx::PgConnection,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<(Product, Recipe, Vec<RecipeLine>), AppError> {
        let product = self
            .product_repo
            .find_product(&mut *conn, tenant_id, product_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Produto".into()))?;

        let recipe = self
            .product_repo
            .find_recipe(&mut *conn, tenant_id, product_id)
            .await?
            .ok_or_else(|| AppError::RecipeNotFound(product.name.clone()))?;

        let lines = self.product_repo.recipe_lines(&mut *conn, tenant_id, product_id).await?;
        Ok((product, recipe, lines))
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

    fn line(quantity: &str, loss: &str, avg_cost: &str, stock: &str) -> RecipeLine {
        RecipeLine {
            ingredient_id: Uuid::new_v4(),
            ingredient_name: "Farinha".into(),
            unit: MeasureUnit::Kg,
            quantity: dec(quantity),
            loss_percent: dec(loss),
            average_cost: dec(avg_cost),
            current_stock: dec(stock),
        }
    }

    #[test]
    fn unit_cost_includes_loss_and_divides_by_yield() {
        // 2 kg com 10% de perda a R$ 5,00 + 1 kg a R$ 8,00, rendendo 4 unidades
        let lines = vec![line("2", "10", "5", "100"), line("1", "0", "8", "100")];
        assert_eq!(unit_cost(&lines, dec("4")), dec("4.75"));
    }

    #[test]
    fn margin_is_zero_percent_for_free_products() {
        assert_eq!(margin(dec("0"), dec("3")), (dec("-3"), Decimal::ZERO));
        assert_eq!(margin(dec("20"), dec("15")), (dec("5"), dec("25")));
    }

    #[test]
    fn max_producible_is_limited_by_the_scarcest_ingredient() {
        // Rende 10: precisa de 0,2 kg e 0,05 kg por unidade
        let lines = vec![line("2", "0", "1", "3.1"), line("0.5", "0", "1", "10")];
        assert_eq!(max_producible(&lines, dec("10")), dec("15"));
        assert_eq!(max_producible(&[], dec("10")), Decimal::ZERO);
    }

    #[test]
    fn yield_simulation_reports_shortages() {
        let lines = vec![line("1", "0", "10", "2"), line("3", "0", "1", "1")];
        let sim = simulate_yield(Uuid::nil(), dec("6"), dec("3"), &lines);

        assert_eq!(sim.batches, dec("2"));
        assert_eq!(sim.requirements[0].required, dec("2"));
        assert_eq!(sim.requirements[0].shortage, Decimal::ZERO);
        assert_eq!(sim.requirements[1].required, dec("6"));
        assert_eq!(sim.requirements[1].shortage, dec("5"));
        assert_eq!(sim.total_cost, dec("26"));
        assert!(!sim.can_produce);
    }

    #[test]
    fn duplicated_ingredient_is_rejected() {
        let id = Uuid::new_v4();
        let item = RecipeItemPayload { ingredient_id: id, quantity: dec("1"), loss_percent: Decimal::ZERO };
        let items = vec![item.clone(), item];
        assert!(matches!(ensure_unique_ingredients(&items), Err(AppError::InvalidRecipe(_))));
    }
}
