pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod finance;
pub mod inventory;
pub mod production;
pub mod products;
pub mod promotions;
pub mod purchasing;
pub mod rbac;
pub mod sales;
pub mod settings;
pub mod tenancy;
