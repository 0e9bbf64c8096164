use std::sync::Arc;

use allocation::{
    check_capacity, derive_magnitude, find_overallocations, overlapping_total,
    percentage_for_period, round2, AllocationError, AllocationMode, AllocationPeriod,
    CapacityPolicy, ExistingAllocation, Magnitude, MagnitudeInput, MAX_CAPACITY_PERCENTAGE,
};
use async_trait::async_trait;
use itertools::Itertools;

use crate::domain::{
    models::{
        Allocation, AllocationHistoryEntry, AllocationId, Employee, EmployeeId, HistoryAction,
        NewAllocation, NewAllocationHistoryEntry, NewAllocationRequest, UpdateAllocationRequest,
    },
    ports::{
        inbound::{AllocationService, EmployeeAudit},
        outbound::{AllocationStore, AllocationTransaction},
    },
    StaffingError,
};

/// Implementation of the AllocationService inbound port.
///
/// Every write runs inside a store transaction scoped to the employee, so
/// the overlapping total it checks is the total it commits against.
pub struct AllocationServiceImpl<S> {
    store: Arc<S>,
    policy: CapacityPolicy,
}

impl<S> AllocationServiceImpl<S> {
    pub fn new(store: Arc<S>, policy: CapacityPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.policy
    }

    fn enforce_ceiling(
        &self,
        employee: &Employee,
        period: &AllocationPeriod,
        percentage: f64,
        others: &[ExistingAllocation],
    ) -> Result<(), StaffingError> {
        if self.policy.enforces_ceiling() {
            check_capacity(employee.id.as_i32(), period, percentage, others)?;
            return Ok(());
        }

        let summary = overlapping_total(period, others);
        let total = round2(summary.total + percentage);
        if total > MAX_CAPACITY_PERCENTAGE {
            tracing::info!(
                employee_id = %employee.id,
                total,
                mode = %self.policy.mode,
                "allocation exceeds capacity, ceiling not enforced in this mode"
            );
        }
        Ok(())
    }
}

fn validate_input(input: MagnitudeInput) -> Result<(), StaffingError> {
    match input {
        MagnitudeInput::Hours(0) => Err(StaffingError::ZeroHours),
        MagnitudeInput::Percentage(pct) if !(0.0..=100.0).contains(&pct) => {
            Err(StaffingError::PercentageOutOfRange(pct))
        }
        _ => Ok(()),
    }
}

/// Stored percentage, or one derived from hours for records that predate
/// storing both fields.
fn effective_percentage(
    allocation: &Allocation,
    employee: &Employee,
) -> Result<f64, StaffingError> {
    match allocation.allocated_percentage {
        Some(pct) => Ok(pct),
        None => Ok(percentage_for_period(
            allocation.allocated_hours,
            employee.monthly_capacity_hours,
            &allocation.period,
        )?),
    }
}

fn existing_allocations(
    allocations: &[Allocation],
    employee: &Employee,
) -> Result<Vec<ExistingAllocation>, StaffingError> {
    allocations
        .iter()
        .map(|allocation| {
            let mut existing = allocation.to_existing();
            existing.allocated_percentage = Some(effective_percentage(allocation, employee)?);
            Ok(existing)
        })
        .collect()
}

async fn load_employee(
    tx: &mut dyn AllocationTransaction,
    employee_id: EmployeeId,
) -> Result<Employee, StaffingError> {
    tx.employee()
        .await?
        .ok_or(StaffingError::EmployeeNotFound(employee_id))
}

#[async_trait]
impl<S: AllocationStore> AllocationService for AllocationServiceImpl<S> {
    #[tracing::instrument(skip(self, request), fields(employee_id = %request.employee_id))]
    async fn create_allocation(
        &self,
        request: &NewAllocationRequest,
    ) -> Result<Allocation, StaffingError> {
        let period = AllocationPeriod::new(request.start_date, request.end_date)?;
        let input = self
            .policy
            .mode
            .authoritative_input(request.allocated_hours, request.allocated_percentage)?;
        validate_input(input)?;

        let mut tx = self.store.begin(request.employee_id).await?;
        let employee = load_employee(tx.as_mut(), request.employee_id).await?;
        let magnitude = derive_magnitude(input, employee.monthly_capacity_hours, &period)?;

        let current = tx.allocations().await?;
        let others = existing_allocations(&current, &employee)?;
        self.enforce_ceiling(&employee, &period, magnitude.percentage, &others)?;

        let allocation = tx
            .insert_allocation(&NewAllocation {
                employee_id: employee.id,
                project_id: request.project_id,
                period,
                magnitude,
            })
            .await?;
        tx.record_history(&NewAllocationHistoryEntry::new(
            &allocation,
            HistoryAction::Created,
            self.policy.mode,
            magnitude,
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(
            allocation_id = %allocation.id,
            hours = magnitude.hours,
            percentage = magnitude.percentage,
            "allocation created"
        );
        Ok(allocation)
    }

    #[tracing::instrument(skip(self, request))]
    async fn update_allocation(
        &self,
        id: AllocationId,
        request: &UpdateAllocationRequest,
    ) -> Result<Allocation, StaffingError> {
        let located = self
            .store
            .find_allocation(id)
            .await?
            .ok_or(StaffingError::AllocationNotFound(id))?;

        let mut tx = self.store.begin(located.employee_id).await?;
        let employee = load_employee(tx.as_mut(), located.employee_id).await?;

        // Re-read under the lock; the unlocked lookup may be stale.
        let (current, others): (Vec<_>, Vec<_>) =
            tx.allocations().await?.into_iter().partition(|a| a.id == id);
        let current = current
            .into_iter()
            .next()
            .ok_or(StaffingError::AllocationNotFound(id))?;

        let period = AllocationPeriod::new(
            request.start_date.unwrap_or(current.start_date()),
            request.end_date.unwrap_or(current.end_date()),
        )?;

        let supplied = match self.policy.mode {
            AllocationMode::Hours => request.allocated_hours.map(MagnitudeInput::Hours),
            AllocationMode::Percentage => {
                request.allocated_percentage.map(MagnitudeInput::Percentage)
            }
        };
        let input = match supplied {
            Some(input) => {
                validate_input(input)?;
                input
            }
            None if request.allocated_hours.is_some()
                || request.allocated_percentage.is_some() =>
            {
                return Err(AllocationError::MissingMagnitude(self.policy.mode).into());
            }
            None => match self.policy.mode {
                AllocationMode::Hours => MagnitudeInput::Hours(current.allocated_hours),
                AllocationMode::Percentage => {
                    MagnitudeInput::Percentage(effective_percentage(&current, &employee)?)
                }
            },
        };
        let magnitude = derive_magnitude(input, employee.monthly_capacity_hours, &period)?;

        // Metadata-only edits leave the employee's load as it was.
        if supplied.is_some() || period != current.period {
            let others = existing_allocations(&others, &employee)?;
            self.enforce_ceiling(&employee, &period, magnitude.percentage, &others)?;
        }

        let updated = Allocation {
            id,
            employee_id: employee.id,
            project_id: request.project_id.unwrap_or(current.project_id),
            period,
            allocated_hours: magnitude.hours,
            allocated_percentage: Some(magnitude.percentage),
        };
        tx.update_allocation(&updated).await?;
        tx.record_history(&NewAllocationHistoryEntry::new(
            &updated,
            HistoryAction::Updated,
            self.policy.mode,
            magnitude,
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(
            allocation_id = %id,
            hours = magnitude.hours,
            percentage = magnitude.percentage,
            "allocation updated"
        );
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_allocation(&self, id: AllocationId) -> Result<(), StaffingError> {
        let located = self
            .store
            .find_allocation(id)
            .await?
            .ok_or(StaffingError::AllocationNotFound(id))?;

        let mut tx = self.store.begin(located.employee_id).await?;
        let employee = load_employee(tx.as_mut(), located.employee_id).await?;
        let current = tx
            .allocations()
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(StaffingError::AllocationNotFound(id))?;

        let magnitude = Magnitude {
            hours: current.allocated_hours,
            percentage: effective_percentage(&current, &employee)?,
        };

        if !tx.delete_allocation(id).await? {
            return Err(StaffingError::AllocationNotFound(id));
        }
        tx.record_history(&NewAllocationHistoryEntry::new(
            &current,
            HistoryAction::Deleted,
            self.policy.mode,
            magnitude,
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(allocation_id = %id, "allocation deleted");
        Ok(())
    }

    async fn get_allocations(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<Allocation>, StaffingError> {
        let allocations = self.store.get_allocations(employee_id).await?;

        Ok(allocations
            .into_iter()
            .sorted_by_key(|a| (a.start_date(), a.id))
            .collect())
    }

    async fn get_history(
        &self,
        allocation_id: AllocationId,
    ) -> Result<Vec<AllocationHistoryEntry>, StaffingError> {
        self.store.get_history(allocation_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn audit(
        &self,
        employee_id: Option<EmployeeId>,
    ) -> Result<Vec<EmployeeAudit>, StaffingError> {
        let employee_ids = match employee_id {
            Some(id) => vec![id],
            None => self.store.employee_ids().await?,
        };

        let mut audits = Vec::new();
        for employee_id in employee_ids {
            let employee = self
                .store
                .find_employee(employee_id)
                .await?
                .ok_or(StaffingError::EmployeeNotFound(employee_id))?;
            let allocations = self.store.get_allocations(employee_id).await?;
            let existing = existing_allocations(&allocations, &employee)?;
            let overallocations = find_overallocations(&existing);

            for found in &overallocations {
                tracing::warn!(
                    %employee_id,
                    allocation_id = found.allocation_id,
                    total = found.total_percentage,
                    "employee is over-allocated"
                );
            }

            if !overallocations.is_empty() {
                audits.push(EmployeeAudit {
                    employee_id,
                    overallocations,
                });
            }
        }

        Ok(audits)
    }
}
