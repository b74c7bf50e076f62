use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use petstore_core::{CustomerId, EmployeeId, StoreId};
use petstore_stores::{Customer, Employee, Store};

/// Entity store operation error.
///
/// These are **infrastructure errors** (constraints, connectivity) as opposed to
/// domain errors (lookups, ownership).
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store rejected a write (not-null, foreign key, unique, ...).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A write was attempted inside a read-only transaction.
    #[error("write attempted in a read-only transaction")]
    ReadOnly,

    /// The store could not be reached or refused to commit.
    #[error("entity store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("entity store error: {0}")]
    Backend(String),
}

/// Access mode requested when opening a transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Unit of work against the relational store.
///
/// Nothing written through a transaction is visible to other transactions
/// until `commit` succeeds. Dropping a transaction without committing discards
/// its writes.
#[async_trait]
pub trait StoreTx: Send {
    fn mode(&self) -> TxMode;

    async fn find_store(&mut self, id: StoreId) -> Result<Option<Store>, PersistenceError>;

    /// All stores, ordered by id.
    async fn find_all_stores(&mut self) -> Result<Vec<Store>, PersistenceError>;

    /// Insert (no id) or update (id) a store row. Returns the stored row.
    async fn save_store(&mut self, store: Store) -> Result<Store, PersistenceError>;

    /// Delete a store together with its employees and customer associations.
    ///
    /// Returns `false` if no such store exists.
    async fn delete_store(&mut self, id: StoreId) -> Result<bool, PersistenceError>;

    async fn find_employee(&mut self, id: EmployeeId) -> Result<Option<Employee>, PersistenceError>;

    /// Employees owned by a store, ordered by id.
    async fn find_employees_of(
        &mut self,
        store_id: StoreId,
    ) -> Result<Vec<Employee>, PersistenceError>;

    /// Insert or update an employee row. The owning store must be set and exist.
    async fn save_employee(&mut self, employee: Employee) -> Result<Employee, PersistenceError>;

    /// Load a customer with its current membership set.
    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, PersistenceError>;

    /// Customers associated with a store, ordered by id.
    async fn find_customers_of(
        &mut self,
        store_id: StoreId,
    ) -> Result<Vec<Customer>, PersistenceError>;

    /// Insert or update a customer row. Membership is not written here.
    async fn save_customer(&mut self, customer: Customer) -> Result<Customer, PersistenceError>;

    /// Insert the store/customer association if it is absent.
    ///
    /// Returns `true` if a new association row was written.
    async fn link_customer(
        &mut self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<bool, PersistenceError>;

    async fn commit(self) -> Result<(), PersistenceError>;

    async fn rollback(self) -> Result<(), PersistenceError>;
}

/// Source of transactions.
#[async_trait]
pub trait EntityStore: Send + Sync {
    type Tx: StoreTx + 'static;

    async fn begin(&self, mode: TxMode) -> Result<Self::Tx, PersistenceError>;
}

#[async_trait]
impl<S> EntityStore for Arc<S>
where
    S: EntityStore,
{
    type Tx = S::Tx;

    async fn begin(&self, mode: TxMode) -> Result<Self::Tx, PersistenceError> {
        (**self).begin(mode).await
    }
}
