use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use petstore_core::{CustomerId, EmployeeId, Entity, StoreId};
use petstore_stores::{Customer, CustomerFields, Employee, EmployeeFields, Store, StoreFields};

use super::r#trait::{EntityStore, PersistenceError, StoreTx, TxMode};

#[derive(Debug, Clone)]
struct EmployeeRow {
    store_id: StoreId,
    fields: EmployeeFields,
}

/// The relational layout: three entity tables plus the association table.
#[derive(Debug, Clone, Default)]
struct Tables {
    last_store_id: i64,
    last_employee_id: i64,
    last_customer_id: i64,
    stores: BTreeMap<StoreId, StoreFields>,
    employees: BTreeMap<EmployeeId, EmployeeRow>,
    customers: BTreeMap<CustomerId, CustomerFields>,
    store_customers: BTreeSet<(StoreId, CustomerId)>,
}

impl Tables {
    fn memberships_of(&self, customer_id: CustomerId) -> BTreeSet<StoreId> {
        self.store_customers
            .iter()
            .filter(|(_, c)| *c == customer_id)
            .map(|(s, _)| *s)
            .collect()
    }

    fn customer(&self, id: CustomerId) -> Option<Customer> {
        self.customers
            .get(&id)
            .map(|fields| Customer::persisted(id, self.memberships_of(id), fields.clone()))
    }
}

/// In-memory relational store.
///
/// Intended for tests/dev. Read-write transactions are serialized behind an
/// async mutex and work on a private copy of the tables that replaces the
/// shared state on commit. Read-only transactions work on a snapshot.
/// Identifiers come from per-table counters and are never reused.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityStore {
    tables: Arc<Mutex<Tables>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read-write commit fail with `Unavailable` (tests).
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    type Tx = InMemoryTx;

    async fn begin(&self, mode: TxMode) -> Result<InMemoryTx, PersistenceError> {
        let (working, guard) = match mode {
            TxMode::ReadOnly => (self.tables.lock().await.clone(), None),
            TxMode::ReadWrite => {
                let guard = self.tables.clone().lock_owned().await;
                (guard.clone(), Some(guard))
            }
        };

        Ok(InMemoryTx {
            mode,
            working,
            guard,
            fail_commits: self.fail_commits.clone(),
        })
    }
}

/// Transaction over an [`InMemoryEntityStore`].
#[derive(Debug)]
pub struct InMemoryTx {
    mode: TxMode,
    working: Tables,
    guard: Option<OwnedMutexGuard<Tables>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryTx {
    fn writable(&mut self) -> Result<&mut Tables, PersistenceError> {
        match self.mode {
            TxMode::ReadWrite => Ok(&mut self.working),
            TxMode::ReadOnly => Err(PersistenceError::ReadOnly),
        }
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    fn mode(&self) -> TxMode {
        self.mode
    }

    async fn find_store(&mut self, id: StoreId) -> Result<Option<Store>, PersistenceError> {
        Ok(self
            .working
            .stores
            .get(&id)
            .map(|fields| Store::persisted(id, fields.clone())))
    }

    async fn find_all_stores(&mut self) -> Result<Vec<Store>, PersistenceError> {
        Ok(self
            .working
            .stores
            .iter()
            .map(|(id, fields)| Store::persisted(*id, fields.clone()))
            .collect())
    }

    async fn save_store(&mut self, store: Store) -> Result<Store, PersistenceError> {
        let tables = self.writable()?;
        let id = match store.id() {
            Some(id) if tables.stores.contains_key(&id) => id,
            Some(id) => {
                return Err(PersistenceError::Constraint(format!(
                    "pet_store {id} does not exist"
                )));
            }
            None => {
                tables.last_store_id += 1;
                StoreId::new(tables.last_store_id)
            }
        };

        let fields = store.into_fields();
        tables.stores.insert(id, fields.clone());
        Ok(Store::persisted(id, fields))
    }

    async fn delete_store(&mut self, id: StoreId) -> Result<bool, PersistenceError> {
        let tables = self.writable()?;
        if tables.stores.remove(&id).is_none() {
            return Ok(false);
        }

        tables.employees.retain(|_, row| row.store_id != id);
        tables.store_customers.retain(|(s, _)| *s != id);
        Ok(true)
    }

    async fn find_employee(
        &mut self,
        id: EmployeeId,
    ) -> Result<Option<Employee>, PersistenceError> {
        Ok(self
            .working
            .employees
            .get(&id)
            .map(|row| Employee::persisted(id, row.store_id, row.fields.clone())))
    }

    async fn find_employees_of(
        &mut self,
        store_id: StoreId,
    ) -> Result<Vec<Employee>, PersistenceError> {
        Ok(self
            .working
            .employees
            .iter()
            .filter(|(_, row)| row.store_id == store_id)
            .map(|(id, row)| Employee::persisted(*id, row.store_id, row.fields.clone()))
            .collect())
    }

    async fn save_employee(&mut self, employee: Employee) -> Result<Employee, PersistenceError> {
        let tables = self.writable()?;
        let store_id = employee.store_id().ok_or_else(|| {
            PersistenceError::Constraint("employee.pet_store_id must not be null".to_string())
        })?;
        if !tables.stores.contains_key(&store_id) {
            return Err(PersistenceError::Constraint(format!(
                "employee.pet_store_id references missing pet_store {store_id}"
            )));
        }

        let id = match employee.id() {
            Some(id) if tables.employees.contains_key(&id) => id,
            Some(id) => {
                return Err(PersistenceError::Constraint(format!(
                    "employee {id} does not exist"
                )));
            }
            None => {
                tables.last_employee_id += 1;
                EmployeeId::new(tables.last_employee_id)
            }
        };

        let fields = employee.into_fields();
        tables.employees.insert(
            id,
            EmployeeRow {
                store_id,
                fields: fields.clone(),
            },
        );
        Ok(Employee::persisted(id, store_id, fields))
    }

    async fn find_customer(
        &mut self,
        id: CustomerId,
    ) -> Result<Option<Customer>, PersistenceError> {
        Ok(self.working.customer(id))
    }

    async fn find_customers_of(
        &mut self,
        store_id: StoreId,
    ) -> Result<Vec<Customer>, PersistenceError> {
        let tables = &self.working;
        Ok(tables
            .store_customers
            .iter()
            .filter(|(s, _)| *s == store_id)
            .filter_map(|(_, c)| tables.customer(*c))
            .collect())
    }

    async fn save_customer(&mut self, customer: Customer) -> Result<Customer, PersistenceError> {
        let tables = self.writable()?;
        let id = match customer.id() {
            Some(id) if tables.customers.contains_key(&id) => id,
            Some(id) => {
                return Err(PersistenceError::Constraint(format!(
                    "customer {id} does not exist"
                )));
            }
            None => {
                tables.last_customer_id += 1;
                CustomerId::new(tables.last_customer_id)
            }
        };

        tables.customers.insert(id, customer.into_fields());
        tables
            .customer(id)
            .ok_or_else(|| {
                PersistenceError::Backend(format!("customer {id} vanished after insert"))
            })
    }

    async fn link_customer(
        &mut self,
        store_id: StoreId,
        customer_id: CustomerId,
    ) -> Result<bool, PersistenceError> {
        let tables = self.writable()?;
        if !tables.stores.contains_key(&store_id) {
            return Err(PersistenceError::Constraint(format!(
                "pet_store_customer.pet_store_id references missing pet_store {store_id}"
            )));
        }
        if !tables.customers.contains_key(&customer_id) {
            return Err(PersistenceError::Constraint(format!(
                "pet_store_customer.customer_id references missing customer {customer_id}"
            )));
        }

        Ok(tables.store_customers.insert((store_id, customer_id)))
    }

    async fn commit(self) -> Result<(), PersistenceError> {
        let Some(mut guard) = self.guard else {
            return Ok(());
        };

        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(
                "commit rejected by entity store".to_string(),
            ));
        }

        *guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
