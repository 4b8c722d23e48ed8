pub mod catalog;
pub mod identity;
pub mod operation;
pub mod product;
pub mod task;
