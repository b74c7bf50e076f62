//! Transfer views: flat, cycle-free shapes returned to callers.
//!
//! Children never carry their parent. Employees expose the owning store id,
//! customers expose nothing about their stores. The list view is its own type
//! with no association fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use petstore_core::{CustomerId, EmployeeId, Entity, StoreId};
use petstore_stores::{Customer, CustomerFields, Employee, EmployeeFields, Store, StoreFields};

use crate::entity_store::PersistenceError;
use crate::error::ServiceError;

/// Full store view with its employees and customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreView {
    pub id: StoreId,
    #[serde(flatten)]
    pub fields: StoreFields,
    pub employees: Vec<EmployeeView>,
    pub customers: Vec<CustomerView>,
}

/// Store as it appears in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummaryView {
    pub id: StoreId,
    #[serde(flatten)]
    pub fields: StoreFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeView {
    pub id: EmployeeId,
    pub store_id: StoreId,
    #[serde(flatten)]
    pub fields: EmployeeFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub id: CustomerId,
    #[serde(flatten)]
    pub fields: CustomerFields,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    /// Only persisted entities can be projected.
    #[error("cannot project {0} without an id")]
    MissingId(&'static str),

    #[error("cannot project Employee {0} without an owning store")]
    Unowned(EmployeeId),
}

impl From<ProjectionError> for ServiceError {
    fn from(value: ProjectionError) -> Self {
        ServiceError::Persistence(PersistenceError::Backend(value.to_string()))
    }
}

fn persisted_id<E: Entity>(entity: &E) -> Result<E::Id, ProjectionError> {
    entity.id().ok_or(ProjectionError::MissingId(E::KIND))
}

pub fn employee_view(employee: Employee) -> Result<EmployeeView, ProjectionError> {
    let id = persisted_id(&employee)?;
    let store_id = employee.store_id().ok_or(ProjectionError::Unowned(id))?;
    Ok(EmployeeView {
        id,
        store_id,
        fields: employee.into_fields(),
    })
}

pub fn customer_view(customer: Customer) -> Result<CustomerView, ProjectionError> {
    Ok(CustomerView {
        id: persisted_id(&customer)?,
        fields: customer.into_fields(),
    })
}

pub fn store_summary_view(store: Store) -> Result<StoreSummaryView, ProjectionError> {
    Ok(StoreSummaryView {
        id: persisted_id(&store)?,
        fields: store.into_fields(),
    })
}

pub fn store_view(
    store: Store,
    employees: Vec<Employee>,
    customers: Vec<Customer>,
) -> Result<StoreView, ProjectionError> {
    let StoreSummaryView { id, fields } = store_summary_view(store)?;
    Ok(StoreView {
        id,
        fields,
        employees: employees
            .into_iter()
            .map(employee_view)
            .collect::<Result<_, _>>()?,
        customers: customers
            .into_iter()
            .map(customer_view)
            .collect::<Result<_, _>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn acme() -> Store {
        Store::persisted(
            StoreId::new(1),
            StoreFields {
                name: Some("Acme".into()),
                city: Some("Springfield".into()),
                ..StoreFields::default()
            },
        )
    }

    #[test]
    fn summary_serializes_without_association_keys() {
        let json = serde_json::to_value(store_summary_view(acme()).unwrap()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["id"], 1);
        assert_eq!(obj["name"], "Acme");
        assert!(obj["phone"].is_null());
        assert!(!obj.contains_key("employees"));
        assert!(!obj.contains_key("customers"));
    }

    #[test]
    fn full_view_nests_children_with_camel_case_fields() {
        let employee = Employee::persisted(
            EmployeeId::new(4),
            StoreId::new(1),
            EmployeeFields {
                first_name: Some("Jo".into()),
                job_title: Some("Groomer".into()),
                ..EmployeeFields::default()
            },
        );
        let customer = Customer::persisted(
            CustomerId::new(9),
            BTreeSet::from([StoreId::new(1), StoreId::new(2)]),
            CustomerFields {
                email: Some("sam@example.com".into()),
                ..CustomerFields::default()
            },
        );

        let view = store_view(acme(), vec![employee], vec![customer]).unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["employees"][0]["firstName"], "Jo");
        assert_eq!(json["employees"][0]["jobTitle"], "Groomer");
        assert_eq!(json["employees"][0]["storeId"], 1);
        assert_eq!(json["customers"][0]["email"], "sam@example.com");
        assert!(json["customers"][0].get("storeIds").is_none());
    }

    #[test]
    fn unpersisted_entities_are_rejected() {
        assert_eq!(
            store_summary_view(Store::blank()),
            Err(ProjectionError::MissingId("Store"))
        );
        assert_eq!(
            customer_view(Customer::blank()),
            Err(ProjectionError::MissingId("Customer"))
        );
    }
}
