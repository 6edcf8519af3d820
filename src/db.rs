pub mod source;
pub mod operations_repo;
pub use operations_repo::OperationsRepository;
