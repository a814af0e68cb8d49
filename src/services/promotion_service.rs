// src/services/promotion_service.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ProductRepository, PromotionRepository},
    models::promotions::{Combo, ComboDetail, ComboItem, ComboPayload, Promotion, PromotionPayload},
};

// ---
// Precificação do PDV
// ---

#[derive(Debug, Clone, Copy)]
pub struct PricingLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub list_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub list_price: Decimal,
    /// Preço após a melhor promoção
    pub unit_price: Decimal,
    /// Desconto de combo rateado na linha
    pub discount: Decimal,
}

impl PricedLine {
    pub fn gross(&self) -> Decimal {
        self.quantity * self.list_price
    }

    pub fn net(&self) -> Decimal {
        self.quantity * self.unit_price - self.discount
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
}

/// Combo com os componentes, pronto para a precificação.
#[derive(Debug, Clone)]
pub struct ComboRule {
    pub combo: Combo,
    pub items: Vec<ComboItem>,
}

/// Aplica primeiro a melhor promoção de cada linha, depois os combos de forma gulosa
/// (o combo que economiza mais por unidade primeiro).
pub fn price_sale_lines(
    lines: &[PricingLine],
    promotions: &[Promotion],
    combos: &[ComboRule],
    now: DateTime<Utc>,
) -> Vec<PricedLine> {
    // 1. Promoções: maior desconto por unidade vence
    let mut priced: Vec<PricedLine> = lines
        .iter()
        .map(|line| {
            let best_discount = promotions
                .iter()
                .filter(|p| p.product_id == line.product_id && p.is_valid_at(now))
                .map(|p| p.unit_discount(line.list_price))
                .max()
                .unwrap_or(Decimal::ZERO);

            PricedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                list_price: line.list_price,
                unit_price: (line.list_price - best_discount).max(Decimal::ZERO),
                discount: Decimal::ZERO,
            }
        })
        .collect();

    // 2. Combos
    let mut available: HashMap<Uuid, Decimal> = HashMap::new();
    for line in &priced {
        *available.entry(line.product_id).or_default() += line.quantity;
    }
    let unit_price_of = |priced: &[PricedLine], product_id: Uuid| {
        priced
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.unit_price)
            .unwrap_or(Decimal::ZERO)
    };

    let mut ranked: Vec<(&ComboRule, Decimal)> = combos
        .iter()
        .filter(|rule| rule.combo.is_active && !rule.items.is_empty())
        .map(|rule| {
            let regular: Decimal = rule
                .items
                .iter()
                .map(|c| c.quantity * unit_price_of(&priced, c.product_id))
                .sum();
            (rule, regular - rule.combo.combo_price)
        })
        .filter(|(_, saving)| *saving > Decimal::ZERO)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    for (rule, saving) in ranked {
        let count = rule
            .items
            .iter()
            .map(|c| {
                let have = available.get(&c.product_id).copied().unwrap_or_default();
                (have / c.quantity).floor()
            })
            .min()
            .unwrap_or(Decimal::ZERO);
        if count <= Decimal::ZERO {
            continue;
        }

        // Rateio do desconto proporcional ao valor de cada componente
        let total_discount = (saving * count).round_dp(2);
        let regular_total: Decimal = rule
            .items
            .iter()
            .map(|c| c.quantity * unit_price_of(&priced, c.product_id))
            .sum();

        let mut allocated = Decimal::ZERO;
        let last = rule.items.len() - 1;
        for (idx, component) in rule.items.iter().enumerate() {
            let share = if idx == last {
                total_discount - allocated
            } else {
                let value = component.quantity * unit_price_of(&priced, component.product_id);
                (total_discount * value / regular_total).round_dp(2)
            };
            allocated += share;

            if let Some(line) = priced.iter_mut().find(|l| l.product_id == component.product_id) {
                line.discount += share;
            }
            if let Some(have) = available.get_mut(&component.product_id) {
                *have -= component.quantity * count;
            }
        }
    }

    priced
}

pub fn sale_totals(lines: &[PricedLine]) -> SaleTotals {
    let subtotal: Decimal = lines.iter().map(PricedLine::gross).sum::<Decimal>().round_dp(2);
    let total: Decimal = lines.iter().map(PricedLine::net).sum::<Decimal>().round_dp(2).max(Decimal::ZERO);
    SaleTotals { subtotal, discount_total: subtotal - total, total }
}

#[derive(Clone)]
pub struct PromotionService {
    promotion_repo: PromotionRepository,
    product_repo: ProductRepository,
}

impl PromotionService {
    pub fn new(promotion_repo: PromotionRepository, product_repo: ProductRepository) -> Self {
        Self { promotion_repo, product_repo }
    }

    pub async fn create_promotion(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &PromotionPayload,
    ) -> Result<Promotion, AppError> {
        self.ensure_product(&mut *conn, tenant_id, payload.product_id).await?;
        self.promotion_repo.create_promotion(&mut *conn, tenant_id, payload).await
    }

    pub async fn update_promotion(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        promotion_id: Uuid,
        payload: &PromotionPayload,
    ) -> Result<Promotion, AppError> {
        self.ensure_product(&mut *conn, tenant_id, payload.product_id).await?;
        self.promotion_repo
            .update_promotion(&mut *conn, tenant_id, promotion_id, payload)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Promoção".into()))
    }

    pub async fn list_promotions<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.promotion_repo.list_promotions(executor, tenant_id).await
    }

    pub async fn create_combo(&self, conn: &mut PgConnection, tenant_id: Uuid, payload: &ComboPayload) -> Result<ComboDetail, AppError> {
        let mut tx = conn.begin().await?;

        for item in &payload.items {
            self.ensure_product(&mut *tx, tenant_id, item.product_id).await?;
        }

        let combo = self.promotion_repo.create_combo(&mut *tx, tenant_id, payload).await?;
        self.promotion_repo
            .insert_combo_items(&mut *tx, tenant_id, combo.id, &payload.items)
            .await?;
        let items = self.promotion_repo.combo_items(&mut *tx, tenant_id, &[combo.id]).await?;

        tx.commit().await?;
        Ok(ComboDetail { combo, items })
    }

    pub async fn list_combos(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<ComboDetail>, AppError> {
        let rules = self.load_combos(&mut *conn, tenant_id, false).await?;
        Ok(rules
            .into_iter()
            .map(|rule| ComboDetail { combo: rule.combo, items: rule.items })
            .collect())
    }

    /// Promoções vigentes dos produtos + combos ativos, para o PDV.
    pub(crate) async fn pricing_rules(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        product_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<(Vec<Promotion>, Vec<ComboRule>), AppError> {
        let promotions = self
            .promotion_repo
            .active_promotions(&mut *conn, tenant_id, product_ids, now)
            .await?;
        let combos = self.load_combos(&mut *conn, tenant_id, true).await?;
        Ok((promotions, combos))
    }

    async fn load_combos(&self, conn: &mut PgConnection, tenant_id: Uuid, only_active: bool) -> Result<Vec<ComboRule>, AppError> {
        let combos = self.promotion_repo.list_combos(&mut *conn, tenant_id, only_active).await?;
        let ids: Vec<Uuid> = combos.iter().map(|c| c.id).collect();
        let mut items = self.promotion_repo.combo_items(&mut *conn, tenant_id, &ids).await?;

        Ok(combos
            .into_iter()
            .map(|combo| {
                let (mine, rest): (Vec<ComboItem>, Vec<ComboItem>) =
                    items.drain(..).partition(|i| i.combo_id == combo.id);
                items = rest;
                ComboRule { combo, items: mine }
            })
            .collect())
    }

    async fn ensure_product(&self, conn: &mut PgConnection, tenant_id: Uuid, product_id: Uuid) -> Result<(), AppError> {
        self.product_repo
            .find_product(&mut *conn, tenant_id, product_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::ResourceNotFound("Produto".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::promotions::PromotionKind;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn promo(product_id: Uuid, kind: PromotionKind, value: &str) -> Promotion {
        Promotion {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            product_id,
            name: "Promo".into(),
            kind,
            value: dec(value),
            starts_at: None,
            ends_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn combo(price: &str, items: &[(Uuid, &str)]) -> ComboRule {
        let id = Uuid::new_v4();
        ComboRule {
            combo: Combo {
                id,
                tenant_id: Uuid::nil(),
                name: "Combo".into(),
                combo_price: dec(price),
                is_active: true,
                created_at: Utc::now(),
            },
            items: items
                .iter()
                .map(|(product_id, qty)| ComboItem { combo_id: id, product_id: *product_id, quantity: dec(qty) })
                .collect(),
        }
    }

    fn line(product_id: Uuid, qty: &str, price: &str) -> PricingLine {
        PricingLine { product_id, quantity: dec(qty), list_price: dec(price) }
    }

    #[test]
    fn best_promotion_wins_and_price_never_goes_negative() {
        let bolo = Uuid::new_v4();
        let promos = vec![
            promo(bolo, PromotionKind::Percent, "10"),
            promo(bolo, PromotionKind::Fixed, "3"),
        ];
        let priced = price_sale_lines(&[line(bolo, "1", "20")], &promos, &[], Utc::now());
        assert_eq!(priced[0].unit_price, dec("17"));

        let free = price_sale_lines(&[line(bolo, "1", "2")], &[promo(bolo, PromotionKind::Fixed, "5")], &[], Utc::now());
        assert_eq!(free[0].unit_price, Decimal::ZERO);
    }

    #[test]
    fn expired_promotions_are_ignored() {
        let bolo = Uuid::new_v4();
        let mut old = promo(bolo, PromotionKind::Fixed, "5");
        old.ends_at = Some(Utc::now() - Duration::days(1));
        let priced = price_sale_lines(&[line(bolo, "1", "20")], &[old], &[], Utc::now());
        assert_eq!(priced[0].unit_price, dec("20"));
    }

    #[test]
    fn combo_is_formed_as_many_times_as_components_allow() {
        let cafe = Uuid::new_v4();
        let fatia = Uuid::new_v4();
        let rule = combo("12", &[(cafe, "1"), (fatia, "1")]);

        // 3 cafés (R$ 5) + 2 fatias (R$ 9): 2 combos de R$ 14 por R$ 12
        let priced = price_sale_lines(&[line(cafe, "3", "5"), line(fatia, "2", "9")], &[], &[rule], Utc::now());
        let totals = sale_totals(&priced);

        assert_eq!(totals.subtotal, dec("33"));
        assert_eq!(totals.discount_total, dec("4"));
        assert_eq!(totals.total, dec("29"));
        let combo_discount: Decimal = priced.iter().map(|l| l.discount).sum();
        assert_eq!(combo_discount, dec("4"));
    }

    #[test]
    fn combo_that_does_not_save_is_skipped() {
        let cafe = Uuid::new_v4();
        let rule = combo("6", &[(cafe, "1")]);
        let priced = price_sale_lines(&[line(cafe, "2", "5")], &[], &[rule], Utc::now());
        assert_eq!(sale_totals(&priced).discount_total, Decimal::ZERO);
    }

    #[test]
    fn promotions_apply_before_combos() {
        let cafe = Uuid::new_v4();
        let fatia = Uuid::new_v4();
        let rule = combo("12", &[(cafe, "1"), (fatia, "1")]);
        let promos = vec![promo(fatia, PromotionKind::Fixed, "1")];

        // Com a promoção o par custa 13, o combo economiza só 1
        let priced = price_sale_lines(&[line(cafe, "1", "5"), line(fatia, "1", "9")], &promos, &[rule], Utc::now());
        let totals = sale_totals(&priced);
        assert_eq!(totals.discount_total, dec("2"));
        assert_eq!(totals.total, dec("12"));
    }
}
