// src/config.rs

use std::{env, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        CustomerRepository, DashboardRepository, FinanceRepository, InventoryRepository, ProductRepository,
        ProductionRepository, PromotionRepository, PurchasingRepository, RbacRepository, SalesRepository,
        SettingsRepository, TenantRepository, UserRepository,
    },
    services::{
        auth::AuthService, customer_service::CustomerService, dashboard_service::DashboardService,
        document_service::DocumentService, finance_service::FinanceService, inventory_service::InventoryService,
        product_service::ProductService, production_service::ProductionService, promotion_service::PromotionService,
        purchasing_service::PurchasingService, rbac_service::RbacService, sales_service::SalesService,
        tenancy_service::TenantService,
    },
};

/// Configuração lida do ambiente (.env em desenvolvimento).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub jwt_expiration_days: i64,
    pub pdf_fonts_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            jwt_expiration_days: parse_or("JWT_EXPIRATION_DAYS", 7)?,
            pdf_fonts_dir: env::var("PDF_FONTS_DIR").unwrap_or_else(|_| "./fonts".to_string()),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("{key} inválida: '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: AppConfig,
    pub i18n_store: I18nStore,

    pub auth_service: AuthService,
    pub tenant_repo: TenantRepository,
    pub rbac_repo: RbacRepository,
    pub settings_repo: SettingsRepository,

    pub tenant_service: TenantService,
    pub rbac_service: RbacService,
    pub inventory_service: InventoryService,
    pub product_service: ProductService,
    pub production_service: ProductionService,
    pub purchasing_service: PurchasingService,
    pub promotion_service: PromotionService,
    pub customer_service: CustomerService,
    pub sales_service: SalesService,
    pub finance_service: FinanceService,
    pub dashboard_service: DashboardService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar no banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Repositórios ---
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let production_repo = ProductionRepository::new(db_pool.clone());
        let purchasing_repo = PurchasingRepository::new(db_pool.clone());
        let promotion_repo = PromotionRepository::new(db_pool.clone());
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let sales_repo = SalesRepository::new(db_pool.clone());
        let finance_repo = FinanceRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        // --- Serviços (o gráfico de dependências) ---
        let auth_service = AuthService::new(
            user_repo.clone(),
            config.jwt_secret.clone(),
            config.jwt_expiration_days,
            db_pool.clone(),
        );
        let inventory_service = InventoryService::new(inventory_repo.clone(), tenant_repo.clone());
        let product_service = ProductService::new(product_repo.clone());
        let production_service = ProductionService::new(
            production_repo.clone(),
            product_repo.clone(),
            inventory_repo.clone(),
            tenant_repo.clone(),
            inventory_service.clone(),
        );
        let purchasing_service = PurchasingService::new(
            purchasing_repo,
            production_repo.clone(),
            inventory_repo.clone(),
            product_repo.clone(),
            tenant_repo.clone(),
            inventory_service.clone(),
        );
        let promotion_service = PromotionService::new(promotion_repo, product_repo.clone());
        let customer_service = CustomerService::new(customer_repo.clone());
        let sales_service = SalesService::new(
            sales_repo,
            product_repo,
            customer_repo.clone(),
            tenant_repo.clone(),
            promotion_service.clone(),
        );
        let finance_service = FinanceService::new(finance_repo);
        let dashboard_service = DashboardService::new(
            dashboard_repo,
            rbac_repo.clone(),
            inventory_repo,
            production_repo,
            customer_repo,
            finance_service.clone(),
        );
        let tenant_service = TenantService::new(
            tenant_repo.clone(),
            rbac_repo.clone(),
            settings_repo.clone(),
            user_repo,
            dashboard_service.clone(),
            db_pool.clone(),
        );
        let rbac_service = RbacService::new(rbac_repo.clone());
        let document_service = DocumentService::new(
            purchasing_service.clone(),
            sales_service.clone(),
            settings_repo.clone(),
            config.pdf_fonts_dir.clone(),
        );

        Ok(Self {
            db_pool,
            config,
            i18n_store: I18nStore::default(),
            auth_service,
            tenant_repo,
            rbac_repo,
            settings_repo,
            tenant_service,
            rbac_service,
            inventory_service,
            product_service,
            production_service,
            purchasing_service,
            promotion_service,
            customer_service,
            sales_service,
            finance_service,
            dashboard_service,
            document_service,
        })
    }
}
