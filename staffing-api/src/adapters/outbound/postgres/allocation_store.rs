//! PostgreSQL implementation of the AllocationStore port.
//!
//! Each write transaction holds a transaction-scoped advisory lock keyed by
//! the employee id, so the capacity check and the write it guards cannot
//! interleave with another writer for the same employee.

use std::str::FromStr;
use std::sync::Arc;

use allocation::{AllocationMode, AllocationPeriod};
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::domain::{
    models::{
        Allocation, AllocationHistoryEntry, AllocationHistoryId, AllocationId, Employee,
        EmployeeId, HistoryAction, NewAllocation, NewAllocationHistoryEntry, ProjectId,
    },
    ports::outbound::{AllocationStore, AllocationTransaction},
    StaffingError,
};
use crate::repositories::{
    self, AllocationRepository, AllocationRepositoryImpl, DatabaseAllocation,
    DatabaseAllocationHistory, DatabaseEmployee, NewDatabaseAllocation,
    NewDatabaseAllocationHistory, RepositoryError,
};

/// Adapter that implements AllocationStore using PostgreSQL.
pub struct PostgresAllocationStore<R = AllocationRepositoryImpl> {
    repo: Arc<R>,
}

impl<R> PostgresAllocationStore<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

fn storage_error(e: RepositoryError) -> StaffingError {
    StaffingError::storage(e.to_string())
}

#[async_trait]
impl<R: AllocationRepository + Send + Sync + 'static> AllocationStore
    for PostgresAllocationStore<R>
{
    async fn begin(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Box<dyn AllocationTransaction>, StaffingError> {
        let tx = self
            .repo
            .begin_for_employee(employee_id.as_i32())
            .await
            .map_err(storage_error)?;

        Ok(Box::new(PostgresAllocationTransaction { tx, employee_id }))
    }

    async fn employee_ids(&self) -> Result<Vec<EmployeeId>, StaffingError> {
        let ids = self.repo.employee_ids().await.map_err(storage_error)?;
        Ok(ids.into_iter().map(EmployeeId::new).collect())
    }

    async fn find_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Option<Employee>, StaffingError> {
        let employee = self
            .repo
            .find_employee(employee_id.as_i32())
            .await
            .map_err(storage_error)?;

        Ok(employee.map(db_employee_to_domain))
    }

    async fn find_allocation(
        &self,
        id: AllocationId,
    ) -> Result<Option<Allocation>, StaffingError> {
        self.repo
            .find_allocation(id.as_i32())
            .await
            .map_err(storage_error)?
            .map(db_allocation_to_domain)
            .transpose()
    }

    async fn get_allocations(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<Allocation>, StaffingError> {
        self.repo
            .allocations_for_employee(employee_id.as_i32())
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(db_allocation_to_domain)
            .collect()
    }

    async fn get_history(
        &self,
        allocation_id: AllocationId,
    ) -> Result<Vec<AllocationHistoryEntry>, StaffingError> {
        self.repo
            .history_for_allocation(allocation_id.as_i32())
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(db_history_to_domain)
            .collect()
    }
}

/// A database transaction holding one employee's advisory lock.
///
/// Rolled back on drop unless committed.
pub struct PostgresAllocationTransaction {
    tx: Transaction<'static, Postgres>,
    employee_id: EmployeeId,
}

#[async_trait]
impl AllocationTransaction for PostgresAllocationTransaction {
    async fn employee(&mut self) -> Result<Option<Employee>, StaffingError> {
        let employee = repositories::fetch_employee(&mut self.tx, self.employee_id.as_i32())
            .await
            .map_err(storage_error)?;

        Ok(employee.map(db_employee_to_domain))
    }

    async fn allocations(&mut self) -> Result<Vec<Allocation>, StaffingError> {
        repositories::fetch_allocations(&mut self.tx, self.employee_id.as_i32())
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(db_allocation_to_domain)
            .collect()
    }

    async fn insert_allocation(
        &mut self,
        allocation: &NewAllocation,
    ) -> Result<Allocation, StaffingError> {
        let new_allocation = NewDatabaseAllocation {
            employee_id: allocation.employee_id.as_i32(),
            project_id: allocation.project_id.as_i32(),
            start_date: allocation.period.start(),
            end_date: allocation.period.end(),
            allocated_hours: hours_to_db(allocation.magnitude.hours)?,
            allocated_percentage: allocation.magnitude.percentage,
        };

        let inserted = repositories::insert_allocation(&mut self.tx, &new_allocation)
            .await
            .map_err(storage_error)?;

        db_allocation_to_domain(inserted)
    }

    async fn update_allocation(&mut self, allocation: &Allocation) -> Result<(), StaffingError> {
        let row = DatabaseAllocation {
            id: allocation.id.as_i32(),
            employee_id: self.employee_id.as_i32(),
            project_id: allocation.project_id.as_i32(),
            start_date: allocation.period.start(),
            end_date: allocation.period.end(),
            allocated_hours: hours_to_db(allocation.allocated_hours)?,
            allocated_percentage: allocation.allocated_percentage,
        };

        let updated = repositories::update_allocation(&mut self.tx, &row)
            .await
            .map_err(storage_error)?;

        if updated == 0 {
            return Err(StaffingError::AllocationNotFound(allocation.id));
        }
        Ok(())
    }

    async fn delete_allocation(&mut self, id: AllocationId) -> Result<bool, StaffingError> {
        let deleted =
            repositories::delete_allocation(&mut self.tx, id.as_i32(), self.employee_id.as_i32())
                .await
                .map_err(storage_error)?;

        Ok(deleted > 0)
    }

    async fn record_history(
        &mut self,
        entry: &NewAllocationHistoryEntry,
    ) -> Result<AllocationHistoryId, StaffingError> {
        let row = NewDatabaseAllocationHistory {
            allocation_id: entry.allocation_id.as_i32(),
            employee_id: entry.employee_id.as_i32(),
            project_id: entry.project_id.as_i32(),
            action: entry.action.to_string(),
            mode: entry.mode.to_string(),
            start_date: entry.period.start(),
            end_date: entry.period.end(),
            allocated_hours: hours_to_db(entry.magnitude.hours)?,
            allocated_percentage: entry.magnitude.percentage,
        };

        let id = repositories::insert_history(&mut self.tx, &row)
            .await
            .map_err(storage_error)?;

        Ok(AllocationHistoryId::new(id))
    }

    async fn commit(self: Box<Self>) -> Result<(), StaffingError> {
        self.tx
            .commit()
            .await
            .map_err(|e| storage_error(RepositoryError::from(e)))
    }
}

fn hours_to_db(hours: u32) -> Result<i32, StaffingError> {
    i32::try_from(hours).map_err(|_| StaffingError::storage(format!("hours out of range: {hours}")))
}

fn hours_from_db(hours: i32) -> Result<u32, StaffingError> {
    u32::try_from(hours).map_err(|_| {
        storage_error(RepositoryError::InvalidData(format!(
            "negative allocated hours: {hours}"
        )))
    })
}

fn db_employee_to_domain(row: DatabaseEmployee) -> Employee {
    Employee {
        id: EmployeeId::new(row.id),
        name: row.name,
        monthly_capacity_hours: row.monthly_capacity_hours,
    }
}

fn db_allocation_to_domain(row: DatabaseAllocation) -> Result<Allocation, StaffingError> {
    Ok(Allocation {
        id: AllocationId::new(row.id),
        employee_id: EmployeeId::new(row.employee_id),
        project_id: ProjectId::new(row.project_id),
        period: AllocationPeriod::new(row.start_date, row.end_date)?,
        allocated_hours: hours_from_db(row.allocated_hours)?,
        allocated_percentage: row.allocated_percentage,
    })
}

fn db_history_to_domain(
    row: DatabaseAllocationHistory,
) -> Result<AllocationHistoryEntry, StaffingError> {
    let invalid = |what: &str, value: &str| {
        storage_error(RepositoryError::InvalidData(format!("unknown {what}: {value}")))
    };

    let action =
        HistoryAction::from_str(&row.action).map_err(|_| invalid("action", &row.action))?;
    let mode = AllocationMode::from_str(&row.mode).map_err(|_| invalid("mode", &row.mode))?;

    Ok(AllocationHistoryEntry {
        id: AllocationHistoryId::new(row.id),
        allocation_id: AllocationId::new(row.allocation_id),
        employee_id: EmployeeId::new(row.employee_id),
        project_id: ProjectId::new(row.project_id),
        action,
        mode,
        period: AllocationPeriod::new(row.start_date, row.end_date)?,
        allocated_hours: hours_from_db(row.allocated_hours)?,
        allocated_percentage: row.allocated_percentage,
        recorded_at: row.recorded_at,
    })
}
