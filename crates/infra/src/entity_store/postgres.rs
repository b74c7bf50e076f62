//! Postgres-backed entity store implementation.
//!
//! The schema is managed outside this crate. The queries below expect:
//!
//! | Table | Columns |
//! |-------|---------|
//! | `pet_store` | `pet_store_id BIGSERIAL PK`, `pet_store_name`, `pet_store_address`, `pet_store_city`, `pet_store_state`, `pet_store_zip`, `pet_store_phone` |
//! | `employee` | `employee_id BIGSERIAL PK`, `pet_store_id BIGINT NOT NULL FK`, `employee_first_name`, `employee_last_name`, `employee_phone`, `employee_job_title` |
//! | `customer` | `customer_id BIGSERIAL PK`, `customer_first_name`, `customer_last_name`, `customer_email` |
//! | `pet_store_customer` | `pet_store_id BIGINT FK`, `customer_id BIGINT FK`, `PRIMARY KEY (pet_store_id, customer_id)` |
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | PersistenceError |
//! |------------|----------------------|------------------|
//! | Database (unique / FK / not-null / check violation) | `23505` / `23503` / `23502` / `23514` | `Constraint` |
//! | Database (read-only transaction) | `25006` | `ReadOnly` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Other | Any other | `Backend` |
//!
//! Deleting a store removes its employees and association rows explicitly in
//! the same transaction, so the result does not depend on `ON DELETE CASCADE`
//! being configured.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use petstore_core::{CustomerId, EmployeeId, Entity, StoreId};
use petstore_stores::{Customer, CustomerFields, Employee, EmployeeFields, Store, StoreFields};

use super::r#trait::{EntityStore, PersistenceError, StoreTx, TxMode};

const CUSTOMER_COLUMNS: &str = r#"
    c.customer_id,
    c.customer_first_name,
    c.customer_last_name,
    c.customer_email,
    ARRAY(
        SELECT psc.pet_store_id
        FROM pet_store_customer psc
        WHERE psc.customer_id = c.customer_id
        ORDER BY psc.pet_store_id
    ) AS store_ids
"#;

/// Postgres-backed entity store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; every call to
/// `begin` checks out one connection for the lifetime of the transaction.
#[derive(Debug, Clone)]
pub struct PostgresEntityStore {
    pool: Arc<PgPool>,
}

impl PostgresEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    type Tx = PostgresTx;

    async fn begin(&self, mode: TxMode) -> Result<PostgresTx, PersistenceError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        if mode == TxMode::ReadOnly {
            sqlx::query("SET TRANSACTION READ ONLY")
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("set_read_only", e))?;
        }

        Ok(PostgresTx { mode, tx })
    }
}

/// Transaction over a [`PostgresEntityStore`]. sqlx rolls it back on drop
/// unless it was committed.
#[derive(Debug)]
pub struct PostgresTx {
    mode: TxMode,
    tx: Transaction<'static, Postgres>,
}

impl PostgresTx {
    fn ensure_writable(&self) -> Result<(), PersistenceError> {
        match self.mode {
            TxMode::ReadWrite => Ok(()),
            TxMode::ReadOnly => Err(PersistenceError::ReadOnly),
        }
    }
}

#[async_trait]
impl StoreTx for PostgresTx {
    fn mode(&self) -> TxMode {
        self.mode
    }

    #[instrument(skip(self), fields(store_id = %id), err)]
    async fn find_store(&mut self, id: StoreId) -> Result<Option<Store>, PersistenceError> {
        let row = sqlx::query(
            r#"
            SELECT
                pet_store_id,
                pet_store_name,
                pet_store_address,
                pet_store_city,
                pet_store_state,
                pet_store_zip,
                pet_store_phone
            FROM pet_store
            WHERE pet_store_id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_store", e))?;

        row.map(|r| decode::<StoreRow>(&r).map(Store::from)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_all_stores(&mut self) -> Result<Vec<Store>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT
                pet_store_id,
                pet_store_name,
                pet_store_address,
                pet_store_city,
                pet_store_state,
                pet_store_zip,
                pet_store_phone
            FROM pet_store
            ORDER BY pet_store_id ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_all_stores", e))?;

        rows.iter()
            .map(|r| decode::<StoreRow>(r).map(Store::from))
            .collect()
    }

    #[instrument(skip_all, fields(store_id = ?store.id()), err)]
    async fn save_store(&mut self, store: Store) -> Result<Store, PersistenceError> {
        self.ensure_writable()?;
        let id = store.id();
        let fields = store.into_fields();

        let query = match id {
            None => sqlx::query(
                r#"
                INSERT INTO pet_store (
                    pet_store_name,
                    pet_store_address,
                    pet_store_city,
                    pet_store_state,
                    pet_store_zip,
                    pet_store_phone
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING pet_store_id
                "#,
            ),
            Some(_) => sqlx::query(
                r#"
                UPDATE pet_store SET
                    pet_store_name = $1,
                    pet_store_address = $2,
                    pet_store_city = $3,
                    pet_store_state = $4,
                    pet_store_zip = $5,
                    pet_store_phone = $6
                WHERE pet_store_id = $7
                RETURNING pet_store_id
                "#,
            ),
        };

        let mut query = bind_store_fields(query, &fields);
        if let Some(id) = id {
            query = query.bind(id.get());
        }

        let row = query
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("save_store", e))?
            .ok_or_else(|| missing_row("pet_store", id))?;

        let id: i64 = row
            .try_get("pet_store_id")
            .map_err(|e| map_sqlx_error("save_store", e))?;
        Ok(Store::persisted(StoreId::new(id), fields))
    }

    #[instrument(skip(self), fields(store_id = %id), err)]
    async fn delete_store(&mut self, id: StoreId) -> Result<bool, PersistenceError> {
        self.ensure_writable()?;

        sqlx::query("DELETE FROM pet_store_customer WHERE pet_store_id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_store_customers", e))?;

        sqlx::query("DELETE FROM employee WHERE pet_store_id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_store_employees", e))?;

        let result = sqlx::query("DELETE FROM pet_store WHERE pet_store_id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_store", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(employee_id = %id), err)]
    async fn find_employee(
        &mut self,
        id: EmployeeId,
    ) -> Result<Option<Employee>, PersistenceError> {
        let row = sqlx::query(
            r#"
            SELECT
                employee_id,
                pet_store_id,
                employee_first_name,
                employee_last_name,
                employee_phone,
                employee_job_title
            FROM employee
            WHERE employee_id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_employee", e))?;

        row.map(|r| decode::<EmployeeRow>(&r).map(Employee::from)).transpose()
    }

    #[instrument(skip(self), fields(store_id = %store_id), err)]
    async fn find_employees_of(
        &mut self,
        store_id: StoreId,
    ) -> Result<Vec<Employee>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT
                employee_id,
                pet_store_id,
                employee_first_name,
                employee_last_name,
                employee_phone,
                employee_job_title
            FROM employee
            WHERE pet_store_id = $1
            ORDER BY employee_id ASC
            "#,
        )
        .bind(store_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_employees_of", e))?;

        rows.iter()
            .map(|r| decode::<EmployeeRow>(r).map(Employee::from))
            .collect()
    }

    #[instrument(skip_all, fields(employee_id = ?employee.id()), err)]
    async fn save_employee(&mut self, employee: Employee) -> Result<Employee, PersistenceError> {
        self.ensure_writable()?;
        let id = employee.id();
        let store_id = employee.store_id().ok_or_else(|| {
            PersistenceError::Constraint("employee.pet_store_id must not be null".to_string())
        })?;
        let fields = employee.into_fields();

        let query = match id {
            None => sqlx::query(
                r#"
                INSERT INTO employee (
                    pet_store_id,
                    employee_first_name,
                    employee_last_name,
                    employee_phone,
                    employee_job_title
                )
                VALUES ($1, $2, $3, $4, $5)
                RETURNING employee_id
                "#,
            )
            .bind(store_id.get()),
            Some(_) => sqlx::query(
                r#"
                UPDATE employee SET
                    pet_store_id = $1,
                    employee_first_name = $2,
                    employee_last_name = $3,
                    employee_phone = $4,
                    employee_job_title = $5
                WHERE employee_id = $6
                RETURNING employee_id
                "#,
            )
            .bind(store_id.get()),
        };

        let mut query = query
            .bind(fields.first_name.clone())
            .bind(fields.last_name.clone())
            .bind(fields.phone.clone())
            .bind(fields.job_title.clone());
        if let Some(id) = id {
            query = query.bind(id.get());
        }

        let row = query
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("save_employee", e))?
            .ok_or_else(|| missing_row("employee", id))?;

        let id: i64 = row
            .try_get("employee_id")
            .map_err(|e| map_sqlx_error("save_employee", e))?;
        Ok(Employee::persisted(EmployeeId::new(id), store_id, fields))
    }

    #[instrument(skip(self), fields(customer_id = %id), err)]
    async fn find_customer(
        &mut self,
        id: CustomerId,
    ) -> Result<Option<Customer>, PersistenceError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customer c WHERE c.customer_id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_customer", e))?;

        row.map(|r| decode::<CustomerRow>(&r).map(Customer::from)).transpose()
    }

    #[instrument(skip(self), fields(store_id = %store_id), err)]
    async fn find_customers_of(
        &mut self,
        store_id: StoreId,
    ) -> Result<Vec<Customer>, PersistenceError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer c \
             JOIN pet_store_customer link ON link.customer_id = c.customer_id \
             WHERE link.pet_store_id = $1 \
             ORDER BY c.customer_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(store_id.get())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_customers_of", e))?;

        rows.iter()
            .map(|r| decode::<CustomerRow>(r).map(Customer::from))
            .collect()
    }

    #[instrument(skip_all, fields(customer_id = ?customer.id()), err)]
    async fn save_customer(&mut self, customer: Customer) -> Result<Customer, PersistenceError> {
        self.ensure_writable()?;
        let id = customer.id();
        let store_ids = customer.store_ids().clone();
        let fields = customer.into_fields();

        let query = match id {
            None => sqlx::query(
                r#"
                INSERT INTO customer (
                    customer_first_name,
                    customer_last_name,
                    customer_email
                )
                VALUES ($1, $2, $3)
                RETURNING customer_id
                "#,
            ),
            Some(_) => sqlx::query(
                r#"
                UPDATE customer SET
                    customer_first_name = $1,
                    customer_last_name = $2,
                    customer_email = $3
                WHERE customer_id = $4
                RETURNING customer_id
                "#,
            ),
        };

        let mut query = query
            .bind(fields.first_name.clone())
            .bind(fields.last_name.clone())
            .bind(fields.email.clone());
        if let Some(id) = id {
            query = query.bind(id.get());
        }

        let row = query
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("save_customer", e))?
            .ok_or_else(|| missing_row("customer", id))?;

        let id: i64 = row
            .try_get("customer_id")
            .map_err(|e| map_sqlx_error("save_customer", e))?;
        Ok(Customer::persisted(CustomerId::new(id), store_ids, fields))
    }

    #[instrument(skip(self), fields(store_id = %store_id, customer_id = %customer_id), err)]
    async fn link_customer(
        &mut self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<bool, PersistenceError> {
        self.ensure_writable()?;

        let result = sqlx::query(
            r#"
            INSERT INTO pet_store_customer (pet_store_id, customer_id)
            VALUES ($1, $2)
            ON CONFLICT (pet_store_id, customer_id) DO NOTHING
            "#,
        )
        .bind(store_id.get())
        .bind(customer_id.get())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("link_customer", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self) -> Result<(), PersistenceError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), PersistenceError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

fn bind_store_fields<'q>(query: PgQuery<'q>, fields: &StoreFields) -> PgQuery<'q> {
    query
        .bind(fields.name.clone())
        .bind(fields.address.clone())
        .bind(fields.city.clone())
        .bind(fields.state.clone())
        .bind(fields.zip.clone())
        .bind(fields.phone.clone())
}

fn missing_row(table: &str, id: Option<impl core::fmt::Display>) -> PersistenceError {
    match id {
        Some(id) => PersistenceError::Constraint(format!("{table} {id} does not exist")),
        None => PersistenceError::Backend(format!("insert into {table} returned no row")),
    }
}

fn decode<T>(row: &PgRow) -> Result<T, PersistenceError>
where
    T: for<'r> FromRow<'r, PgRow>,
{
    T::from_row(row).map_err(|e| PersistenceError::Backend(format!("failed to decode row: {e}")))
}

/// Map SQLx errors to `PersistenceError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> PersistenceError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{} failed: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23502") | Some("23514") => {
                    PersistenceError::Constraint(msg)
                }
                Some("25006") => PersistenceError::ReadOnly,
                _ => PersistenceError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            PersistenceError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            PersistenceError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::Io(e) => {
            PersistenceError::Unavailable(format!("io error in {}: {}", operation, e))
        }
        _ => PersistenceError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct StoreRow {
    pet_store_id: i64,
    name: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    phone: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for StoreRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoreRow {
            pet_store_id: row.try_get("pet_store_id")?,
            name: row.try_get("pet_store_name")?,
            address: row.try_get("pet_store_address")?,
            city: row.try_get("pet_store_city")?,
            state: row.try_get("pet_store_state")?,
            zip: row.try_get("pet_store_zip")?,
            phone: row.try_get("pet_store_phone")?,
        })
    }
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Store::persisted(
            StoreId::new(row.pet_store_id),
            StoreFields {
                name: row.name,
                address: row.address,
                city: row.city,
                state: row.state,
                zip: row.zip,
                phone: row.phone,
            },
        )
    }
}

#[derive(Debug)]
struct EmployeeRow {
    employee_id: i64,
    pet_store_id: i64,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    job_title: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for EmployeeRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(EmployeeRow {
            employee_id: row.try_get("employee_id")?,
            pet_store_id: row.try_get("pet_store_id")?,
            first_name: row.try_get("employee_first_name")?,
            last_name: row.try_get("employee_last_name")?,
            phone: row.try_get("employee_phone")?,
            job_title: row.try_get("employee_job_title")?,
        })
    }
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee::persisted(
            EmployeeId::new(row.employee_id),
            StoreId::new(row.pet_store_id),
            EmployeeFields {
                first_name: row.first_name,
                last_name: row.last_name,
                phone: row.phone,
                job_title: row.job_title,
            },
        )
    }
}

#[derive(Debug)]
struct CustomerRow {
    customer_id: i64,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    store_ids: Vec<i64>,
}

impl<'r> FromRow<'r, PgRow> for CustomerRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CustomerRow {
            customer_id: row.try_get("customer_id")?,
            first_name: row.try_get("customer_first_name")?,
            last_name: row.try_get("customer_last_name")?,
            email: row.try_get("customer_email")?,
            store_ids: row.try_get("store_ids")?,
        })
    }
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer::persisted(
            CustomerId::new(row.customer_id),
            row.store_ids.into_iter().map(StoreId::new).collect::<BTreeSet<_>>(),
            CustomerFields {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
            },
        )
    }
}
