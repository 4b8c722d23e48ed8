pub mod auth;
pub mod catalogs;
pub mod employees;
pub mod notifications;
pub mod operations;
pub mod products;
pub mod tasks;
