//! Composition root: the only place that picks concrete outbound adapters.

use std::sync::Arc;

use allocation::CapacityPolicy;
use sqlx::PgPool;

use crate::{
    adapters::outbound::postgres::PostgresAllocationStore,
    domain::services::AllocationServiceImpl,
    repositories::AllocationRepositoryImpl,
};

pub type PostgresAllocationService = AllocationServiceImpl<PostgresAllocationStore>;

/// Allocation service backed by PostgreSQL.
pub fn postgres_allocation_service(
    pool: PgPool,
    policy: CapacityPolicy,
) -> PostgresAllocationService {
    let repo = Arc::new(AllocationRepositoryImpl::new(pool));
    let store = PostgresAllocationStore::new(repo);
    AllocationServiceImpl::new(Arc::new(store), policy)
}

