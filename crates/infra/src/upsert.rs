//! Create-or-update resolution.
//!
//! An absent id yields a fresh entity with no identity; a present id must
//! resolve to an existing row. A supplied id that does not exist is never
//! turned into a create.

use async_trait::async_trait;

use petstore_core::{CustomerId, DomainError, EmployeeId, Entity, StoreId};
use petstore_stores::{Customer, Employee, Store};

use crate::entity_store::{PersistenceError, StoreTx};
use crate::error::ServiceError;

/// Lookup of one entity type by id within a transaction.
#[async_trait]
pub trait FindById<E: Entity>: Send {
    async fn find_by_id(&mut self, id: E::Id) -> Result<Option<E>, PersistenceError>;
}

#[async_trait]
impl<T: StoreTx> FindById<Store> for T {
    async fn find_by_id(&mut self, id: StoreId) -> Result<Option<Store>, PersistenceError> {
        self.find_store(id).await
    }
}

#[async_trait]
impl<T: StoreTx> FindById<Employee> for T {
    async fn find_by_id(&mut self, id: EmployeeId) -> Result<Option<Employee>, PersistenceError> {
        self.find_employee(id).await
    }
}

#[async_trait]
impl<T: StoreTx> FindById<Customer> for T {
    async fn find_by_id(&mut self, id: CustomerId) -> Result<Option<Customer>, PersistenceError> {
        self.find_customer(id).await
    }
}

/// Fetch the entity with `id`, or fail with `NotFound`.
pub async fn require<E, T>(tx: &mut T, id: E::Id) -> Result<E, ServiceError>
where
    E: Entity + Send,
    T: FindById<E> + ?Sized,
{
    <T as FindById<E>>::find_by_id(tx, id)
        .await?
        .ok_or_else(|| DomainError::not_found(E::KIND, id).into())
}

/// `None` gives a blank entity; `Some(id)` behaves like [`require`].
pub async fn resolve<E, T>(tx: &mut T, id: Option<E::Id>) -> Result<E, ServiceError>
where
    E: Entity + Send,
    T: FindById<E> + ?Sized,
{
    match id {
        None => Ok(E::blank()),
        Some(id) => require(tx, id).await,
    }
}
