pub mod account_repo;
pub use account_repo::AccountRepository;
pub mod company_repo;
pub use company_repo::CompanyRepository;
pub mod employee_repo;
pub use employee_repo::EmployeeRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod operation_repo;
pub use operation_repo::OperationRepository;
pub mod task_repo;
pub use task_repo::TaskRepository;
