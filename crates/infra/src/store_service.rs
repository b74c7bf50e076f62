//! Store aggregate service: the write and read operations over stores,
//! employees and customers.
//!
//! ## Execution Flow
//!
//! ```text
//! request
//!   ↓
//! 1. Open a transaction (read-write for mutations, read-only for queries)
//!   ↓
//! 2. Resolve the addressed entities (create vs update, NotFound on a bad id)
//!   ↓
//! 3. Validate ownership / membership against the path store id
//!   ↓
//! 4. Overwrite fields and persist
//!   ↓
//! 5. Commit on success, roll back on any error, then project
//! ```
//!
//! Nothing is mutated before step 3 passes, and nothing is visible to other
//! transactions before step 5 commits.

use tracing::{info, instrument, warn};

use petstore_core::{CustomerId, EmployeeId, Entity, StoreId};
use petstore_stores::{
    Customer, CustomerFields, Employee, EmployeeFields, MembershipPolicy, OwnershipValidator,
    Store, StoreFields,
};

use crate::entity_store::{EntityStore, StoreTx, TxMode};
use crate::error::ServiceError;
use crate::projection::{self, CustomerView, EmployeeView, StoreSummaryView, StoreView};
use crate::upsert::{require, resolve};

/// Consistency manager for the store aggregate.
///
/// Generic over the entity store so tests run against
/// [`InMemoryEntityStore`](crate::entity_store::InMemoryEntityStore) and
/// production against Postgres.
#[derive(Debug, Clone)]
pub struct StoreService<S> {
    store: S,
    validator: OwnershipValidator,
}

impl<S> StoreService<S>
where
    S: EntityStore,
{
    pub fn new(store: S, policy: MembershipPolicy) -> Self {
        Self {
            store,
            validator: OwnershipValidator::new(policy),
        }
    }

    pub fn policy(&self) -> MembershipPolicy {
        self.validator.policy()
    }

    /// Create (`id = None`) or fully overwrite a store.
    #[instrument(skip(self, fields), err)]
    pub async fn save_store(
        &self,
        id: Option<StoreId>,
        fields: StoreFields,
    ) -> Result<StoreView, ServiceError> {
        let mut tx = self.store.begin(TxMode::ReadWrite).await?;
        let outcome = save_store_in(&mut tx, id, fields).await;
        let view = finish(tx, outcome).await?;

        info!(store_id = %view.id, created = id.is_none(), "store saved");
        Ok(view)
    }

    /// Create or update an employee of `store_id`.
    #[instrument(skip(self, fields), err)]
    pub async fn save_employee(
        &self,
        store_id: StoreId,
        employee_id: Option<EmployeeId>,
        fields: EmployeeFields,
    ) -> Result<EmployeeView, ServiceError> {
        let mut tx = self.store.begin(TxMode::ReadWrite).await?;
        let outcome =
            save_employee_in(&mut tx, self.validator, store_id, employee_id, fields).await;
        let view = finish(tx, outcome).await?;

        info!(
            store_id = %store_id,
            employee_id = %view.id,
            created = employee_id.is_none(),
            "employee saved"
        );
        Ok(view)
    }

    /// Create or update a customer and make sure it is associated with
    /// `store_id`.
    #[instrument(skip(self, fields), err)]
    pub async fn save_customer(
        &self,
        store_id: StoreId,
        customer_id: Option<CustomerId>,
        fields: CustomerFields,
    ) -> Result<CustomerView, ServiceError> {
        let mut tx = self.store.begin(TxMode::ReadWrite).await?;
        let outcome =
            save_customer_in(&mut tx, self.validator, store_id, customer_id, fields).await;
        let view = finish(tx, outcome).await?;

        info!(
            store_id = %store_id,
            customer_id = %view.id,
            created = customer_id.is_none(),
            "customer saved"
        );
        Ok(view)
    }

    /// All stores in summary shape, ordered by id.
    #[instrument(skip(self), err)]
    pub async fn list_stores(&self) -> Result<Vec<StoreSummaryView>, ServiceError> {
        let mut tx = self.store.begin(TxMode::ReadOnly).await?;
        let outcome = list_stores_in(&mut tx).await;
        finish(tx, outcome).await
    }

    /// One store with its employees and customers.
    #[instrument(skip(self), err)]
    pub async fn get_store(&self, store_id: StoreId) -> Result<StoreView, ServiceError> {
        let mut tx = self.store.begin(TxMode::ReadOnly).await?;
        let outcome = get_store_in(&mut tx, store_id).await;
        finish(tx, outcome).await
    }

    /// Delete a store with its employees and customer associations.
    #[instrument(skip(self), err)]
    pub async fn delete_store(&self, store_id: StoreId) -> Result<(), ServiceError> {
        let mut tx = self.store.begin(TxMode::ReadWrite).await?;
        let outcome = delete_store_in(&mut tx, store_id).await;
        finish(tx, outcome).await?;

        info!(store_id = %store_id, "store deleted");
        Ok(())
    }
}

/// Commit on success, roll back on failure. The original error wins over a
/// rollback error.
async fn finish<T, V>(tx: T, outcome: Result<V, ServiceError>) -> Result<V, ServiceError>
where
    T: StoreTx,
{
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn save_store_in<T: StoreTx>(
    tx: &mut T,
    id: Option<StoreId>,
    fields: StoreFields,
) -> Result<StoreView, ServiceError> {
    let mut store: Store = resolve(tx, id).await?;
    store.overwrite(fields);
    let saved = tx.save_store(store).await?;

    let (employees, customers) = match saved.id() {
        Some(id) => (
            tx.find_employees_of(id).await?,
            tx.find_customers_of(id).await?,
        ),
        None => (Vec::new(), Vec::new()),
    };
    Ok(projection::store_view(saved, employees, customers)?)
}

async fn save_employee_in<T: StoreTx>(
    tx: &mut T,
    validator: OwnershipValidator,
    store_id: StoreId,
    employee_id: Option<EmployeeId>,
    fields: EmployeeFields,
) -> Result<EmployeeView, ServiceError> {
    require::<Store, _>(tx, store_id).await?;

    let mut employee: Employee = resolve(tx, employee_id).await?;
    if employee.id().is_some() {
        validator.validate(&employee, store_id)?;
    }

    employee.overwrite(fields);
    employee.assign_to(store_id);
    let saved = tx.save_employee(employee).await?;
    Ok(projection::employee_view(saved)?)
}

async fn save_customer_in<T: StoreTx>(
    tx: &mut T,
    validator: OwnershipValidator,
    store_id: StoreId,
    customer_id: Option<CustomerId>,
    fields: CustomerFields,
) -> Result<CustomerView, ServiceError> {
    require::<Store, _>(tx, store_id).await?;

    let mut customer: Customer = resolve(tx, customer_id).await?;
    if customer.id().is_some() {
        validator.validate(&customer, store_id)?;
    }

    customer.overwrite(fields);
    let saved = tx.save_customer(customer).await?;
    if let Some(id) = saved.id() {
        tx.link_customer(store_id, id).await?;
    }
    Ok(projection::customer_view(saved)?)
}

async fn list_stores_in<T: StoreTx>(tx: &mut T) -> Result<Vec<StoreSummaryView>, ServiceError> {
    let stores = tx.find_all_stores().await?;
    Ok(stores
        .into_iter()
        .map(projection::store_summary_view)
        .collect::<Result<_, _>>()?)
}

async fn get_store_in<T: StoreTx>(
    tx: &mut T,
    store_id: StoreId,
) -> Result<StoreView, ServiceError> {
    let store: Store = require(tx, store_id).await?;
    let employees = tx.find_employees_of(store_id).await?;
    let customers = tx.find_customers_of(store_id).await?;
    Ok(projection::store_view(store, employees, customers)?)
}

async fn delete_store_in<T: StoreTx>(tx: &mut T, store_id: StoreId) -> Result<(), ServiceError> {
    require::<Store, _>(tx, store_id).await?;
    tx.delete_store(store_id).await?;
    Ok(())
}
