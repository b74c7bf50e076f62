use serde::Deserialize;

use petstore_core::{CustomerId, EmployeeId};
use petstore_stores::{CustomerFields, EmployeeFields};

// -------------------------
// Request DTOs
// -------------------------
//
// Store bodies deserialize straight into `StoreFields`: the store id always
// comes from the path. Child bodies carry an optional id that selects update
// over create.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRequest {
    #[serde(default)]
    pub id: Option<EmployeeId>,
    #[serde(flatten)]
    pub fields: EmployeeFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    #[serde(default)]
    pub id: Option<CustomerId>,
    #[serde(flatten)]
    pub fields: CustomerFields,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn employee_request_without_id_is_a_create() {
        let req: EmployeeRequest = serde_json::from_value(json!({
            "firstName": "Jo",
            "jobTitle": "Groomer",
        }))
        .unwrap();
        assert_eq!(req.id, None);
        assert_eq!(req.fields.first_name.as_deref(), Some("Jo"));
        assert_eq!(req.fields.job_title.as_deref(), Some("Groomer"));
        assert_eq!(req.fields.phone, None);
    }

    #[test]
    fn customer_request_with_id_is_an_update() {
        let req: CustomerRequest = serde_json::from_value(json!({
            "id": 3,
            "email": "sam@example.com",
        }))
        .unwrap();
        assert_eq!(req.id, Some(CustomerId::new(3)));
        assert_eq!(req.fields.email.as_deref(), Some("sam@example.com"));
    }
}
