use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use petstore_core::{CustomerId, Entity, StoreId};

/// Descriptive attributes of a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Customer: shared between stores.
///
/// `store_ids` mirrors the store/customer association relation as it was when
/// the customer was loaded. It is read-only here; the association is written
/// through the entity store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Customer {
    id: Option<CustomerId>,
    store_ids: BTreeSet<StoreId>,
    fields: CustomerFields,
}

impl Customer {
    pub fn persisted(id: CustomerId, store_ids: BTreeSet<StoreId>, fields: CustomerFields) -> Self {
        Self {
            id: Some(id),
            store_ids,
            fields,
        }
    }

    pub fn store_ids(&self) -> &BTreeSet<StoreId> {
        &self.store_ids
    }

    pub fn is_member_of(&self, store_id: StoreId) -> bool {
        self.store_ids.contains(&store_id)
    }

    pub fn fields(&self) -> &CustomerFields {
        &self.fields
    }

    pub fn into_fields(self) -> CustomerFields {
        self.fields
    }

    pub fn overwrite(&mut self, fields: CustomerFields) {
        self.fields = fields;
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    const KIND: &'static str = "Customer";

    fn id(&self) -> Option<CustomerId> {
        self.id
    }

    fn blank() -> Self {
        Self::default()
    }
}
