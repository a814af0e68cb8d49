// src/services/customer_service.rs

use rust_decimal::{prelude::ToPrimitive, Decimal};
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CustomerRepository,
    models::customers::{Customer, CustomerPayload, LoyaltyConfig, LoyaltyConfigPayload, LoyaltyEntry},
};

// ---
// Regras de pontos
// ---

/// floor(total líquido × pontos por real), só com programa ativo e cliente identificado.
pub fn points_earned(config: &LoyaltyConfig, net_total: Decimal, has_customer: bool) -> i64 {
    if !config.enabled || !has_customer || net_total <= Decimal::ZERO {
        return 0;
    }
    (net_total * config.points_per_currency).floor().to_i64().unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redemption {
    pub points: i64,
    pub discount: Decimal,
}

/// Valida o resgate e calcula o desconto. Se o desconto passar do total da venda,
/// usa só os pontos necessários: ceil(total / valor do ponto).
pub fn plan_redemption(
    config: &LoyaltyConfig,
    balance: i64,
    requested: i64,
    sale_total: Decimal,
) -> Result<Redemption, AppError> {
    if !config.enabled {
        return Err(AppError::LoyaltyRedeemRejected("programa de fidelidade desativado".into()));
    }
    if requested < config.min_redeem_points {
        return Err(AppError::LoyaltyRedeemRejected(format!(
            "o mínimo para resgate é {} pontos",
            config.min_redeem_points
        )));
    }
    if requested > balance {
        return Err(AppError::LoyaltyRedeemRejected(format!("saldo de {} pontos", balance)));
    }

    let value = config.currency_per_point;
    let discount = Decimal::from(requested) * value;
    if discount <= sale_total {
        return Ok(Redemption { points: requested, discount: discount.round_dp(2) });
    }

    let points = (sale_total / value).ceil().to_i64().unwrap_or(requested).min(requested);
    Ok(Redemption { points, discount: sale_total })
}

#[derive(Clone)]
pub struct CustomerService {
    customer_repo: CustomerRepository,
}

impl CustomerService {
    pub fn new(customer_repo: CustomerRepository) -> Self {
        Self { customer_repo }
    }

    pub async fn create_customer<'e, E>(&self, executor: E, tenant_id: Uuid, payload: &CustomerPayload) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.customer_repo.create_customer(executor, tenant_id, payload).await
    }

    pub async fn list_customers<'e, E>(&self, executor: E, tenant_id: Uuid, search: Option<&str>) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.customer_repo.list_customers(executor, tenant_id, search).await
    }

    pub async fn get_customer<'e, E>(&self, executor: E, tenant_id: Uuid, customer_id: Uuid) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.customer_repo
            .find_customer(executor, tenant_id, customer_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Cliente".into()))
    }

    pub async fn points_ledger(&self, conn: &mut PgConnection, tenant_id: Uuid, customer_id: Uuid) -> Result<Vec<LoyaltyEntry>, AppError> {
        self.customer_repo
            .find_customer(&mut *conn, tenant_id, customer_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Cliente".into()))?;
        self.customer_repo.ledger(&mut *conn, tenant_id, customer_id).await
    }

    pub async fn loyalty_config<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<LoyaltyConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.customer_repo.get_loyalty_config(executor, tenant_id).await
    }

    pub async fn update_loyalty_config<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &LoyaltyConfigPayload,
    ) -> Result<LoyaltyConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = self.customer_repo.upsert_loyalty_config(executor, tenant_id, payload).await?;
        tracing::info!(%tenant_id, enabled = config.enabled, "Programa de fidelidade atualizado");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn config() -> LoyaltyConfig {
        LoyaltyConfig {
            enabled: true,
            points_per_currency: dec("1"),
            currency_per_point: dec("0.05"),
            min_redeem_points: 100,
            ..LoyaltyConfig::disabled(Uuid::nil())
        }
    }

    #[test]
    fn earns_floor_of_total_times_rate() {
        assert_eq!(points_earned(&config(), dec("57.90"), true), 57);
        assert_eq!(points_earned(&config(), dec("57.90"), false), 0);
        assert_eq!(points_earned(&LoyaltyConfig::disabled(Uuid::nil()), dec("100"), true), 0);
    }

    #[test]
    fn redemption_within_the_total_uses_every_point() {
        let r = plan_redemption(&config(), 500, 200, dec("50")).unwrap();
        assert_eq!(r, Redemption { points: 200, discount: dec("10") });
    }

    #[test]
    fn redemption_is_capped_to_the_sale_total() {
        // 1000 pontos valem R$ 50, mas a venda é de R$ 12,32
        let r = plan_redemption(&config(), 1000, 1000, dec("12.32")).unwrap();
        assert_eq!(r.discount, dec("12.32"));
        assert_eq!(r.points, 247);
    }

    #[test]
    fn redemption_rules_are_enforced() {
        assert!(matches!(
            plan_redemption(&config(), 500, 50, dec("10")),
            Err(AppError::LoyaltyRedeemRejected(_))
        ));
        assert!(matches!(
            plan_redemption(&config(), 150, 200, dec("10")),
            Err(AppError::LoyaltyRedeemRejected(_))
        ));
        assert!(matches!(
            plan_redemption(&LoyaltyConfig::disabled(Uuid::nil()), 500, 200, dec("10")),
            Err(AppError::LoyaltyRedeemRejected(_))
        ));
    }
}
