pub mod auth;
pub mod catalog_service;
pub mod employee_service;
pub mod notification;
pub mod operation_service;
pub mod product_service;
pub mod task_service;
