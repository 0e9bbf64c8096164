mod allocation_repo;
mod repo_error;

pub use allocation_repo::*;
pub use repo_error::RepositoryError;
