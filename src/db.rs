pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod production_repo;
pub use production_repo::ProductionRepository;
pub mod purchasing_repo;
pub use purchasing_repo::PurchasingRepository;
pub mod promotion_repo;
pub use promotion_repo::PromotionRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod sales_repo;
pub use sales_repo::SalesRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
