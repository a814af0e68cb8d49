pub mod auth;
pub mod tenancy_service;
pub mod rbac_service;
pub mod inventory_service;
pub mod product_service;
pub mod production_service;
pub mod purchasing_service;
pub mod promotion_service;
pub mod customer_service;
pub mod sales_service;
pub mod finance_service;
pub mod dashboard_service;
pub mod document_service;
