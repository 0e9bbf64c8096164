//! In-memory implementation of the AllocationStore port.
//!
//! Backs the service tests. Writers for the same employee are serialized
//! with a per-employee async mutex, mirroring the advisory lock taken by the
//! Postgres adapter.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::OwnedMutexGuard;

use crate::domain::{
    models::{
        Allocation, AllocationHistoryEntry, AllocationHistoryId, AllocationId, Employee,
        EmployeeId, NewAllocation, NewAllocationHistoryEntry,
    },
    ports::outbound::{AllocationStore, AllocationTransaction},
    StaffingError,
};

#[derive(Clone, Default)]
pub struct InMemoryAllocationStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: RwLock<State>,
    employee_locks: Mutex<HashMap<EmployeeId, Arc<tokio::sync::Mutex<()>>>>,
    next_allocation_id: AtomicI32,
    next_history_id: AtomicI32,
}

#[derive(Default)]
struct State {
    employees: BTreeMap<EmployeeId, Employee>,
    allocations: BTreeMap<AllocationId, Allocation>,
    history: Vec<AllocationHistoryEntry>,
}

fn poisoned<T>(_: T) -> StaffingError {
    StaffingError::storage("in-memory store lock poisoned")
}

impl Inner {
    fn employee_lock(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Arc<tokio::sync::Mutex<()>>, StaffingError> {
        let mut locks = self.employee_locks.lock().map_err(poisoned)?;
        Ok(locks.entry(employee_id).or_default().clone())
    }

    fn allocation_id(&self) -> AllocationId {
        AllocationId::new(self.next_allocation_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn history_id(&self) -> AllocationHistoryId {
        AllocationHistoryId::new(self.next_history_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl InMemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees(self, employees: Vec<Employee>) -> Self {
        {
            let mut state = self.inner.state.write().unwrap_or_else(|e| e.into_inner());
            for employee in employees {
                state.employees.insert(employee.id, employee);
            }
        }
        self
    }

    /// Seed allocations as if they were already stored, bypassing the
    /// capacity check.
    pub fn with_allocations(self, allocations: Vec<Allocation>) -> Self {
        {
            let mut state = self.inner.state.write().unwrap_or_else(|e| e.into_inner());
            for allocation in allocations {
                self.inner
                    .next_allocation_id
                    .fetch_max(allocation.id.as_i32(), Ordering::SeqCst);
                state.allocations.insert(allocation.id, allocation);
            }
        }
        self
    }

    pub fn allocation_count(&self) -> usize {
        self.inner
            .state
            .read()
            .map(|state| state.allocations.len())
            .unwrap_or_default()
    }

    pub fn all_history(&self) -> Vec<AllocationHistoryEntry> {
        self.inner
            .state
            .read()
            .map(|state| state.history.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AllocationStore for InMemoryAllocationStore {
    async fn begin(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Box<dyn AllocationTransaction>, StaffingError> {
        let lock = self.inner.employee_lock(employee_id)?;
        let guard = lock.lock_owned().await;

        // Snapshot only after the lock is held so the view includes every
        // write committed by the previous holder.
        let allocations = {
            let state = self.inner.state.read().map_err(poisoned)?;
            state
                .allocations
                .iter()
                .filter(|(_, a)| a.employee_id == employee_id)
                .map(|(id, a)| (*id, a.clone()))
                .collect()
        };

        Ok(Box::new(InMemoryTransaction {
            inner: self.inner.clone(),
            employee_id,
            allocations,
            history: Vec::new(),
            _guard: guard,
        }))
    }

    async fn employee_ids(&self) -> Result<Vec<EmployeeId>, StaffingError> {
        let state = self.inner.state.read().map_err(poisoned)?;
        Ok(state.employees.keys().copied().collect())
    }

    async fn find_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Option<Employee>, StaffingError> {
        let state = self.inner.state.read().map_err(poisoned)?;
        Ok(state.employees.get(&employee_id).cloned())
    }

    async fn find_allocation(
        &self,
        id: AllocationId,
    ) -> Result<Option<Allocation>, StaffingError> {
        let state = self.inner.state.read().map_err(poisoned)?;
        Ok(state.allocations.get(&id).cloned())
    }

    async fn get_allocations(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<Allocation>, StaffingError> {
        let state = self.inner.state.read().map_err(poisoned)?;
        Ok(state
            .allocations
            .values()
            .filter(|a| a.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn get_history(
        &self,
        allocation_id: AllocationId,
    ) -> Result<Vec<AllocationHistoryEntry>, StaffingError> {
        let state = self.inner.state.read().map_err(poisoned)?;
        Ok(state
            .history
            .iter()
            .filter(|h| h.allocation_id == allocation_id)
            .cloned()
            .collect())
    }
}

struct InMemoryTransaction {
    inner: Arc<Inner>,
    employee_id: EmployeeId,
    allocations: BTreeMap<AllocationId, Allocation>,
    history: Vec<AllocationHistoryEntry>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl AllocationTransaction for InMemoryTransaction {
    async fn employee(&mut self) -> Result<Option<Employee>, StaffingError> {
        let state = self.inner.state.read().map_err(poisoned)?;
        Ok(state.employees.get(&self.employee_id).cloned())
    }

    async fn allocations(&mut self) -> Result<Vec<Allocation>, StaffingError> {
        // Let concurrent writers run up to their own `begin` so tests exercise
        // the same interleaving a database round trip would allow.
        tokio::task::yield_now().await;
        Ok(self.allocations.values().cloned().collect())
    }

    async fn insert_allocation(
        &mut self,
        allocation: &NewAllocation,
    ) -> Result<Allocation, StaffingError> {
        let stored = Allocation {
            id: self.inner.allocation_id(),
            employee_id: allocation.employee_id,
            project_id: allocation.project_id,
            period: allocation.period,
            allocated_hours: allocation.magnitude.hours,
            allocated_percentage: Some(allocation.magnitude.percentage),
        };
        self.allocations.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_allocation(&mut self, allocation: &Allocation) -> Result<(), StaffingError> {
        match self.allocations.get_mut(&allocation.id) {
            Some(existing) => {
                *existing = allocation.clone();
                Ok(())
            }
            None => Err(StaffingError::AllocationNotFound(allocation.id)),
        }
    }

    async fn delete_allocation(&mut self, id: AllocationId) -> Result<bool, StaffingError> {
        Ok(self.allocations.remove(&id).is_some())
    }

    async fn record_history(
        &mut self,
        entry: &NewAllocationHistoryEntry,
    ) -> Result<AllocationHistoryId, StaffingError> {
        let id = self.inner.history_id();
        self.history.push(AllocationHistoryEntry {
            id,
            allocation_id: entry.allocation_id,
            employee_id: entry.employee_id,
            project_id: entry.project_id,
            action: entry.action,
            mode: entry.mode,
            period: entry.period,
            allocated_hours: entry.magnitude.hours,
            allocated_percentage: entry.magnitude.percentage,
            recorded_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), StaffingError> {
        let this = *self;
        let mut state = this.inner.state.write().map_err(poisoned)?;
        state
            .allocations
            .retain(|_, a| a.employee_id != this.employee_id);
        state.allocations.extend(this.allocations);
        state.history.extend(this.history);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation::{AllocationPeriod, Magnitude};
    use time::macros::date;

    use crate::domain::models::ProjectId;

    fn new_allocation(employee_id: i32) -> NewAllocation {
        NewAllocation {
            employee_id: EmployeeId::new(employee_id),
            project_id: ProjectId::new(1),
            period: AllocationPeriod::open(date!(2024 - 01 - 01)),
            magnitude: Magnitude {
                hours: 20,
                percentage: 50.0,
            },
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = InMemoryAllocationStore::new().with_employees(vec![Employee::new(1, "Ada")]);

        {
            let mut tx = store.begin(EmployeeId::new(1)).await.unwrap();
            tx.insert_allocation(&new_allocation(1)).await.unwrap();
        }

        assert_eq!(store.allocation_count(), 0);
    }

    #[tokio::test]
    async fn committed_transaction_is_visible_to_next_writer() {
        let store = InMemoryAllocationStore::new().with_employees(vec![Employee::new(1, "Ada")]);

        let mut tx = store.begin(EmployeeId::new(1)).await.unwrap();
        let inserted = tx.insert_allocation(&new_allocation(1)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(EmployeeId::new(1)).await.unwrap();
        let seen = tx.allocations().await.unwrap();
        assert_eq!(seen, vec![inserted]);
    }

    #[tokio::test]
    async fn second_writer_waits_for_first() {
        let store = InMemoryAllocationStore::new().with_employees(vec![Employee::new(1, "Ada")]);

        let first = store.begin(EmployeeId::new(1)).await.unwrap();
        let waiting = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            store.begin(EmployeeId::new(1)),
        )
        .await;
        assert!(waiting.is_err());

        // Other employees are not blocked.
        assert!(store.begin(EmployeeId::new(2)).await.is_ok());

        drop(first);
        assert!(store.begin(EmployeeId::new(1)).await.is_ok());
    }

    #[tokio::test]
    async fn seeded_allocations_keep_ids_unique() {
        let seeded = Allocation {
            id: AllocationId::new(41),
            employee_id: EmployeeId::new(1),
            project_id: ProjectId::new(1),
            period: AllocationPeriod::open(date!(2024 - 01 - 01)),
            allocated_hours: 10,
            allocated_percentage: None,
        };
        let store = InMemoryAllocationStore::new()
            .with_employees(vec![Employee::new(1, "Ada")])
            .with_allocations(vec![seeded]);

        let mut tx = store.begin(EmployeeId::new(1)).await.unwrap();
        let inserted = tx.insert_allocation(&new_allocation(1)).await.unwrap();
        assert_eq!(inserted.id, AllocationId::new(42));
    }
}
