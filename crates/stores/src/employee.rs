use serde::{Deserialize, Serialize};

use petstore_core::{EmployeeId, Entity, StoreId};

/// Descriptive attributes of an employee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
}

/// Employee: exclusively owned by one store.
///
/// `store_id` is `None` only for a blank employee that has not been assigned
/// yet; the entity store refuses to persist it in that state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Employee {
    id: Option<EmployeeId>,
    store_id: Option<StoreId>,
    fields: EmployeeFields,
}

impl Employee {
    /// Rehydrate an employee that already has an identity and an owner.
    pub fn persisted(id: EmployeeId, store_id: StoreId, fields: EmployeeFields) -> Self {
        Self {
            id: Some(id),
            store_id: Some(store_id),
            fields,
        }
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.store_id
    }

    pub fn fields(&self) -> &EmployeeFields {
        &self.fields
    }

    pub fn into_fields(self) -> EmployeeFields {
        self.fields
    }

    pub fn overwrite(&mut self, fields: EmployeeFields) {
        self.fields = fields;
    }

    /// Set the owning store.
    pub fn assign_to(&mut self, store_id: StoreId) {
        self.store_id = Some(store_id);
    }
}

impl Entity for Employee {
    type Id = EmployeeId;

    const KIND: &'static str = "Employee";

    fn id(&self) -> Option<EmployeeId> {
        self.id
    }

    fn blank() -> Self {
        Self::default()
    }
}
