// src/services/sales_service.rs

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Connection, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{field_error, AppError},
    db::{sales_repo::NewSale, CustomerRepository, ProductRepository, SalesRepository, TenantRepository},
    models::{
        customers::LoyaltyReason,
        sales::{CreateSalePayload, NewSaleItem, Sale, SaleDetail, SaleItemPayload, SaleQuery, SaleStatus},
    },
    services::{
        customer_service::{plan_redemption, points_earned},
        promotion_service::{price_sale_lines, sale_totals, PricingLine, PromotionService},
    },
};

/// Soma linhas repetidas do mesmo produto; a ordem por id define a ordem das travas.
pub fn merge_sale_items(items: &[SaleItemPayload]) -> BTreeMap<Uuid, Decimal> {
    let mut merged = BTreeMap::new();
    for item in items {
        *merged.entry(item.product_id).or_insert(Decimal::ZERO) += item.quantity;
    }
    merged
}

/// Venda cancelada não cancela de novo: estoque e pontos voltam uma vez só.
pub fn ensure_cancellable(status: SaleStatus) -> Result<(), AppError> {
    match status {
        SaleStatus::Completed => Ok(()),
        SaleStatus::Cancelled => Err(AppError::InvalidStatusTransition { from: "CANCELLED".into(), to: "CANCELLED".into() }),
    }
}

/// Parte do estorno que cabe no saldo: o saldo não fica negativo.
pub fn applied_points_delta(balance: i64, delta: i64) -> i64 {
    if balance + delta < 0 { -balance } else { delta }
}

#[derive(Clone)]
pub struct SalesService {
    sales_repo: SalesRepository,
    product_repo: ProductRepository,
    customer_repo: CustomerRepository,
    tenant_repo: TenantRepository,
    promotion_service: PromotionService,
}

impl SalesService {
    pub fn new(
        sales_repo: SalesRepository,
        product_repo: ProductRepository,
        customer_repo: CustomerRepository,
        tenant_repo: TenantRepository,
        promotion_service: PromotionService,
    ) -> Self {
        Self { sales_repo, product_repo, customer_repo, tenant_repo, promotion_service }
    }

    /// Registra a venda numa única transação: trava os produtos, confere estoque,
    /// precifica, aplica o resgate de pontos, grava, baixa o estoque e credita pontos.
    /// Devolve `false` quando a chave de idempotência já tinha gerado a venda.
    pub async fn create_sale(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        seller_id: Uuid,
        payload: &CreateSalePayload,
    ) -> Result<(SaleDetail, bool), AppError> {
        let mut tx = conn.begin().await?;

        // 1. Reenvio do PDV
        if let Some(key) = payload.idempotency_key.as_deref() {
            self.sales_repo.lock_idempotency_key(&mut *tx, tenant_id, key).await?;
            if let Some(existing) = self.sales_repo.find_by_idempotency_key(&mut *tx, tenant_id, key).await? {
                let detail = self.load_detail(&mut *tx, tenant_id, existing).await?;
                tx.commit().await?;
                tracing::info!(%tenant_id, sale_id = %detail.header.id, "Venda repetida pela chave de idempotência");
                return Ok((detail, false));
            }
        }

        if !self.tenant_repo.location_exists(&mut *tx, tenant_id, payload.location_id).await? {
            return Err(AppError::ResourceNotFound("Local".into()));
        }

        // 2. Trava os produtos e confere o estoque
        let quantities = merge_sale_items(&payload.items);
        let product_ids: Vec<Uuid> = quantities.keys().copied().collect();
        let products = self.product_repo.lock_products(&mut *tx, tenant_id, &product_ids).await?;
        if products.len() != product_ids.len() {
            return Err(AppError::ResourceNotFound("Produto".into()));
        }

        let mut pricing_lines = Vec::with_capacity(products.len());
        for product in &products {
            let quantity = quantities.get(&product.id).copied().unwrap_or_default();
            if !product.is_active {
                return Err(field_error("items", "inactive", &format!("O produto {} está inativo.", product.name)));
            }
            if product.current_stock < quantity {
                return Err(AppError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.current_stock,
                    requested: quantity,
                });
            }
            pricing_lines.push(PricingLine { product_id: product.id, quantity, list_price: product.sale_price });
        }

        // 3. Preço: tabela → promoções → combos
        let now = Utc::now();
        let (promotions, combos) = self
            .promotion_service
            .pricing_rules(&mut *tx, tenant_id, &product_ids, now)
            .await?;
        let priced = price_sale_lines(&pricing_lines, &promotions, &combos, now);
        let totals = sale_totals(&priced);

        // 4. Fidelidade
        let customer = match payload.customer_id {
            Some(customer_id) => Some(
                self.customer_repo
                    .find_customer_for_update(&mut *tx, tenant_id, customer_id)
                    .await?
                    .ok_or_else(|| AppError::ResourceNotFound("Cliente".into()))?,
            ),
            None => None,
        };
        let loyalty = self.customer_repo.get_loyalty_config(&mut *tx, tenant_id).await?;

        let (points_redeemed, loyalty_discount) = match (payload.redeem_points, &customer) {
            (Some(requested), Some(customer)) => {
                let r = plan_redemption(&loyalty, customer.points_balance, requested, totals.total)?;
                (r.points, r.discount)
            }
            (Some(_), None) => {
                return Err(AppError::LoyaltyRedeemRejected("a venda não tem cliente identificado".into()));
            }
            (None, _) => (0, Decimal::ZERO),
        };

        let total = totals.total - loyalty_discount;
        let earned = points_earned(&loyalty, total, customer.is_some());

        // 5. Custo unitário do momento (CMV)
        let costs: HashMap<Uuid, Decimal> = self
            .product_repo
            .unit_costs(&mut *tx, tenant_id, &product_ids)
            .await?
            .into_iter()
            .map(|c| (c.product_id, c.unit_cost.round_dp(4)))
            .collect();

        // 6. Grava
        let sale = self
            .sales_repo
            .insert_sale(
                &mut *tx,
                tenant_id,
                &NewSale {
                    location_id: payload.location_id,
                    customer_id: payload.customer_id,
                    seller_id,
                    payment_method: payload.payment_method,
                    subtotal: totals.subtotal,
                    discount_total: totals.discount_total,
                    loyalty_discount,
                    total,
                    points_earned: earned,
                    points_redeemed,
                    idempotency_key: payload.idempotency_key.as_deref(),
                },
            )
            .await?;

        let items: Vec<NewSaleItem> = priced
            .iter()
            .map(|line| NewSaleItem {
                product_id: line.product_id,
                quantity: line.quantity,
                list_price: line.list_price,
                unit_price: line.unit_price,
                discount: line.discount,
                unit_cost: costs.get(&line.product_id).copied().unwrap_or_default(),
            })
            .collect();
        self.sales_repo.insert_items(&mut *tx, tenant_id, sale.id, &items).await?;

        // 7. Baixa o estoque (uma vez, dentro da mesma transação)
        for item in &items {
            self.product_repo
                .change_stock(&mut *tx, tenant_id, item.product_id, -item.quantity)
                .await?;
        }

        // 8. Pontos
        if let Some(customer) = &customer {
            if points_redeemed > 0 {
                self.move_points(&mut *tx, tenant_id, customer.id, sale.id, -points_redeemed, LoyaltyReason::Redeem)
                    .await?;
            }
            if earned > 0 {
                self.move_points(&mut *tx, tenant_id, customer.id, sale.id, earned, LoyaltyReason::Earn)
                    .await?;
            }
        }

        let detail = self.load_detail(&mut *tx, tenant_id, sale).await?;
        tx.commit().await?;

        tracing::info!(
            %tenant_id,
            sale_id = %detail.header.id,
            display_id = detail.header.display_id,
            total = %detail.header.total,
            "Venda registrada"
        );
        Ok((detail, true))
    }

    /// Cancela: devolve o estoque e estorna os pontos, uma única vez.
    pub async fn cancel_sale(&self, conn: &mut PgConnection, tenant_id: Uuid, sale_id: Uuid) -> Result<SaleDetail, AppError> {
        let mut tx = conn.begin().await?;

        let sale = self
            .sales_repo
            .find_sale_for_update(&mut *tx, tenant_id, sale_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Venda".into()))?;

        ensure_cancellable(sale.status)?;

        let items = self.sales_repo.sale_items(&mut *tx, tenant_id, sale_id).await?;
        for item in &items {
            self.product_repo
                .change_stock(&mut *tx, tenant_id, item.product_id, item.quantity)
                .await?;
        }

        if let Some(customer_id) = sale.customer_id {
            let delta = sale.points_redeemed - sale.points_earned;
            let customer = match delta {
                0 => None,
                _ => self.customer_repo.find_customer_for_update(&mut *tx, tenant_id, customer_id).await?,
            };
            if let Some(customer) = customer {
                // O extrato registra só o que saiu de fato do saldo
                let applied = applied_points_delta(customer.points_balance, delta);
                if applied != delta {
                    tracing::warn!(%tenant_id, %sale_id, delta, applied, "Estorno de pontos limitado ao saldo do cliente");
                }
                if applied != 0 {
                    self.move_points(&mut *tx, tenant_id, customer_id, sale_id, applied, LoyaltyReason::Reversal)
                        .await?;
                }
            }
        }

        let cancelled = self.sales_repo.mark_cancelled(&mut *tx, tenant_id, sale_id).await?;
        let detail = self.load_detail(&mut *tx, tenant_id, cancelled).await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, %sale_id, "Venda cancelada");
        Ok(detail)
    }

    pub async fn list_sales<'e, E>(&self, executor: E, tenant_id: Uuid, query: &SaleQuery) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.sales_repo.list_sales(executor, tenant_id, query.from, query.to).await
    }

    pub async fn get_sale(&self, conn: &mut PgConnection, tenant_id: Uuid, sale_id: Uuid) -> Result<SaleDetail, AppError> {
        let sale = self
            .sales_repo
            .find_sale(&mut *conn, tenant_id, sale_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Venda".into()))?;
        self.load_detail(&mut *conn, tenant_id, sale).await
    }

    async fn move_points(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        customer_id: Uuid,
        sale_id: Uuid,
        points: i64,
        reason: LoyaltyReason,
    ) -> Result<(), AppError> {
        self.customer_repo.change_points(&mut *conn, tenant_id, customer_id, points).await?;
        self.customer_repo
            .record_ledger(&mut *conn, tenant_id, customer_id, Some(sale_id), points, reason)
            .await
    }

    async fn load_detail(&self, conn: &mut PgConnection, tenant_id: Uuid, sale: Sale) -> Result<SaleDetail, AppError> {
        let items = self.sales_repo.sale_items(&mut *conn, tenant_id, sale.id).await?;
        let customer_name = match sale.customer_id {
            Some(customer_id) => self.sales_repo.customer_name(&mut *conn, tenant_id, customer_id).await?,
            None => None,
        };
        Ok(SaleDetail { header: sale, customer_name, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn repeated_products_are_merged_and_ordered_by_id() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let items = vec![
            SaleItemPayload { product_id: b, quantity: Decimal::from_str("1").unwrap() },
            SaleItemPayload { product_id: a, quantity: Decimal::from_str("2").unwrap() },
            SaleItemPayload { product_id: b, quantity: Decimal::from_str("0.5").unwrap() },
        ];

        let merged = merge_sale_items(&items);
        let keys: Vec<Uuid> = merged.keys().copied().collect();
        assert_eq!(keys, vec![a, b]);
        assert_eq!(merged[&b], Decimal::from_str("1.5").unwrap());
    }

    #[test]
    fn cancelled_sale_cannot_be_cancelled_again() {
        assert!(ensure_cancellable(SaleStatus::Completed).is_ok());
        assert!(matches!(
            ensure_cancellable(SaleStatus::Cancelled),
            Err(AppError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn reversal_is_capped_by_the_current_balance() {
        // Ganhou 50 pontos na venda e já gastou 30 deles
        assert_eq!(applied_points_delta(20, -50), -20);
        assert_eq!(applied_points_delta(0, -50), 0);
        assert_eq!(applied_points_delta(80, -50), -50);
        // Devolver pontos resgatados nunca é limitado
        assert_eq!(applied_points_delta(0, 40), 40);

        // Saldo e extrato continuam batendo
        let balance = 20;
        let applied = applied_points_delta(balance, -50);
        assert_eq!(balance + applied, 0);
    }
}
