use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::repo_error::RepositoryError;

/// First key of the two-key advisory lock taken per employee, so allocation
/// locks never collide with other advisory locks in the same database.
pub const ALLOCATION_LOCK_NAMESPACE: i32 = 0x616c_6c6f;

#[async_trait]
pub trait AllocationRepository {
    async fn employee_ids(&self) -> Result<Vec<i32>, RepositoryError>;
    async fn find_employee(&self, id: i32) -> Result<Option<DatabaseEmployee>, RepositoryError>;
    async fn find_allocation(&self, id: i32)
        -> Result<Option<DatabaseAllocation>, RepositoryError>;
    async fn allocations_for_employee(
        &self,
        employee_id: i32,
    ) -> Result<Vec<DatabaseAllocation>, RepositoryError>;
    async fn history_for_allocation(
        &self,
        allocation_id: i32,
    ) -> Result<Vec<DatabaseAllocationHistory>, RepositoryError>;
    /// Begin a transaction holding the employee's advisory lock until it
    /// commits or rolls back.
    async fn begin_for_employee(
        &self,
        employee_id: i32,
    ) -> Result<Transaction<'static, Postgres>, RepositoryError>;
}

pub struct AllocationRepositoryImpl {
    pool: PgPool,
}

impl AllocationRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DatabaseEmployee {
    pub id: i32,
    pub name: String,
    pub monthly_capacity_hours: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DatabaseAllocation {
    pub id: i32,
    pub employee_id: i32,
    pub project_id: i32,
    pub start_date: time::Date,
    pub end_date: Option<time::Date>,
    pub allocated_hours: i32,
    pub allocated_percentage: Option<f64>,
}

pub struct NewDatabaseAllocation {
    pub employee_id: i32,
    pub project_id: i32,
    pub start_date: time::Date,
    pub end_date: Option<time::Date>,
    pub allocated_hours: i32,
    pub allocated_percentage: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DatabaseAllocationHistory {
    pub id: i32,
    pub allocation_id: i32,
    pub employee_id: i32,
    pub project_id: i32,
    pub action: String,
    pub mode: String,
    pub start_date: time::Date,
    pub end_date: Option<time::Date>,
    pub allocated_hours: i32,
    pub allocated_percentage: f64,
    pub recorded_at: time::OffsetDateTime,
}

pub struct NewDatabaseAllocationHistory {
    pub allocation_id: i32,
    pub employee_id: i32,
    pub project_id: i32,
    pub action: String,
    pub mode: String,
    pub start_date: time::Date,
    pub end_date: Option<time::Date>,
    pub allocated_hours: i32,
    pub allocated_percentage: f64,
}

#[async_trait]
impl AllocationRepository for AllocationRepositoryImpl {
    async fn employee_ids(&self) -> Result<Vec<i32>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, i32>("SELECT id FROM employees ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn find_employee(&self, id: i32) -> Result<Option<DatabaseEmployee>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_employee(&mut conn, id).await
    }

    async fn find_allocation(
        &self,
        id: i32,
    ) -> Result<Option<DatabaseAllocation>, RepositoryError> {
        let allocation = sqlx::query_as::<_, DatabaseAllocation>(
            r#"
            SELECT id, employee_id, project_id, start_date, end_date, allocated_hours, allocated_percentage
            FROM allocations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(allocation)
    }

    async fn allocations_for_employee(
        &self,
        employee_id: i32,
    ) -> Result<Vec<DatabaseAllocation>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_allocations(&mut conn, employee_id).await
    }

    async fn history_for_allocation(
        &self,
        allocation_id: i32,
    ) -> Result<Vec<DatabaseAllocationHistory>, RepositoryError> {
        let history = sqlx::query_as::<_, DatabaseAllocationHistory>(
            r#"
            SELECT id, allocation_id, employee_id, project_id, action, mode, start_date, end_date,
                   allocated_hours, allocated_percentage, recorded_at
            FROM allocation_history
            WHERE allocation_id = $1
            ORDER BY recorded_at, id
            "#,
        )
        .bind(allocation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(history)
    }

    async fn begin_for_employee(
        &self,
        employee_id: i32,
    ) -> Result<Transaction<'static, Postgres>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(ALLOCATION_LOCK_NAMESPACE)
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }
}

pub async fn fetch_employee(
    conn: &mut PgConnection,
    employee_id: i32,
) -> Result<Option<DatabaseEmployee>, RepositoryError> {
    let employee = sqlx::query_as::<_, DatabaseEmployee>(
        "SELECT id, name, monthly_capacity_hours FROM employees WHERE id = $1",
    )
    .bind(employee_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(employee)
}

pub async fn fetch_allocations(
    conn: &mut PgConnection,
    employee_id: i32,
) -> Result<Vec<DatabaseAllocation>, RepositoryError> {
    let allocations = sqlx::query_as::<_, DatabaseAllocation>(
        r#"
        SELECT id, employee_id, project_id, start_date, end_date, allocated_hours, allocated_percentage
        FROM allocations
        WHERE employee_id = $1
        ORDER BY start_date, id
        "#,
    )
    .bind(employee_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(allocations)
}

pub async fn insert_allocation(
    conn: &mut PgConnection,
    allocation: &NewDatabaseAllocation,
) -> Result<DatabaseAllocation, RepositoryError> {
    let inserted = sqlx::query_as::<_, DatabaseAllocation>(
        r#"
        INSERT INTO allocations (
            employee_id, project_id, start_date, end_date, allocated_hours, allocated_percentage
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, employee_id, project_id, start_date, end_date, allocated_hours, allocated_percentage
        "#,
    )
    .bind(allocation.employee_id)
    .bind(allocation.project_id)
    .bind(allocation.start_date)
    .bind(allocation.end_date)
    .bind(allocation.allocated_hours)
    .bind(allocation.allocated_percentage)
    .fetch_one(&mut *conn)
    .await?;

    Ok(inserted)
}

/// Returns the number of rows updated.
pub async fn update_allocation(
    conn: &mut PgConnection,
    allocation: &DatabaseAllocation,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r#"
        UPDATE allocations
        SET project_id = $2,
            start_date = $3,
            end_date = $4,
            allocated_hours = $5,
            allocated_percentage = $6,
            updated_at = NOW()
        WHERE id = $1 AND employee_id = $7
        "#,
    )
    .bind(allocation.id)
    .bind(allocation.project_id)
    .bind(allocation.start_date)
    .bind(allocation.end_date)
    .bind(allocation.allocated_hours)
    .bind(allocation.allocated_percentage)
    .bind(allocation.employee_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_allocation(
    conn: &mut PgConnection,
    id: i32,
    employee_id: i32,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM allocations WHERE id = $1 AND employee_id = $2")
        .bind(id)
        .bind(employee_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn insert_history(
    conn: &mut PgConnection,
    entry: &NewDatabaseAllocationHistory,
) -> Result<i32, RepositoryError> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO allocation_history (
            allocation_id, employee_id, project_id, action, mode, start_date, end_date,
            allocated_hours, allocated_percentage
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(entry.allocation_id)
    .bind(entry.employee_id)
    .bind(entry.project_id)
    .bind(&entry.action)
    .bind(&entry.mode)
    .bind(entry.start_date)
    .bind(entry.end_date)
    .bind(entry.allocated_hours)
    .bind(entry.allocated_percentage)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}
