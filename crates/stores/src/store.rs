use serde::{Deserialize, Serialize};

use petstore_core::{Entity, StoreId};

/// Descriptive attributes of a store.
///
/// Updates replace the whole set: a field left out of a request is stored as
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFields {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
}

/// Aggregate root: Store.
///
/// Employees and customers are not held here; they reference the store by id
/// and are loaded alongside it when a full view is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    id: Option<StoreId>,
    fields: StoreFields,
}

impl Store {
    /// Rehydrate a store that already has an identity.
    pub fn persisted(id: StoreId, fields: StoreFields) -> Self {
        Self {
            id: Some(id),
            fields,
        }
    }

    pub fn fields(&self) -> &StoreFields {
        &self.fields
    }

    pub fn into_fields(self) -> StoreFields {
        self.fields
    }

    /// Full replace of the descriptive attributes. Identity is untouched.
    pub fn overwrite(&mut self, fields: StoreFields) {
        self.fields = fields;
    }
}

impl Entity for Store {
    type Id = StoreId;

    const KIND: &'static str = "Store";

    fn id(&self) -> Option<StoreId> {
        self.id
    }

    fn blank() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> StoreFields {
        StoreFields {
            name: Some("Acme".to_string()),
            address: Some("1 Main St".to_string()),
            city: Some("Springfield".to_string()),
            state: Some("IL".to_string()),
            zip: Some("62701".to_string()),
            phone: Some("555-0100".to_string()),
        }
    }

    #[test]
    fn blank_store_has_no_identity() {
        let store = Store::blank();
        assert_eq!(store.id(), None);
        assert_eq!(store.fields(), &StoreFields::default());
    }

    #[test]
    fn overwrite_replaces_every_field_and_keeps_identity() {
        let mut store = Store::persisted(StoreId::new(3), acme());
        store.overwrite(StoreFields {
            name: Some("Beta".to_string()),
            ..StoreFields::default()
        });

        assert_eq!(store.id(), Some(StoreId::new(3)));
        assert_eq!(store.fields().name.as_deref(), Some("Beta"));
        assert_eq!(store.fields().address, None);
        assert_eq!(store.fields().phone, None);
    }

    #[test]
    fn fields_deserialize_from_partial_camel_case_json() {
        let fields: StoreFields = serde_json::from_str(r#"{"name":"Acme","zip":"62701"}"#).unwrap();
        assert_eq!(fields.name.as_deref(), Some("Acme"));
        assert_eq!(fields.zip.as_deref(), Some("62701"));
        assert_eq!(fields.city, None);
    }
}
