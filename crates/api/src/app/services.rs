use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use petstore_core::{CustomerId, EmployeeId, StoreId};
use petstore_infra::entity_store::{InMemoryEntityStore, PostgresEntityStore};
use petstore_infra::{
    CustomerView, EmployeeView, ServiceError, StoreService, StoreSummaryView, StoreView,
};
use petstore_stores::{CustomerFields, EmployeeFields, MembershipPolicy, StoreFields};

use crate::config::AppConfig;

type InMemoryStoreService = StoreService<InMemoryEntityStore>;
type PostgresStoreService = StoreService<PostgresEntityStore>;

/// The store service over whichever entity store the process was configured
/// with.
#[derive(Debug, Clone)]
pub enum AppServices {
    InMemory {
        service: InMemoryStoreService,
        store: InMemoryEntityStore,
    },
    Postgres {
        service: PostgresStoreService,
    },
}

pub fn build_in_memory_services(policy: MembershipPolicy) -> AppServices {
    let store = InMemoryEntityStore::new();
    AppServices::InMemory {
        service: StoreService::new(store.clone(), policy),
        store,
    }
}

pub async fn build_postgres_services(
    database_url: &str,
    max_connections: u32,
    policy: MembershipPolicy,
) -> anyhow::Result<AppServices> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(AppServices::Postgres {
        service: StoreService::new(PostgresEntityStore::new(pool), policy),
    })
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            build_postgres_services(url, config.db_max_connections, config.customer_policy).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory entity store");
            Ok(build_in_memory_services(config.customer_policy))
        }
    }
}

macro_rules! with_service {
    ($services:expr, |$service:ident| $body:expr) => {
        match $services {
            AppServices::InMemory { service: $service, .. } => $body,
            AppServices::Postgres { service: $service } => $body,
        }
    };
}

impl AppServices {
    /// The backing in-memory store, if any (lets tests inject failures).
    pub fn in_memory_store(&self) -> Option<&InMemoryEntityStore> {
        match self {
            AppServices::InMemory { store, .. } => Some(store),
            AppServices::Postgres { .. } => None,
        }
    }

    pub async fn save_store(
        &self,
        id: Option<StoreId>,
        fields: StoreFields,
    ) -> Result<StoreView, ServiceError> {
        with_service!(self, |service| service.save_store(id, fields).await)
    }

    pub async fn save_employee(
        &self,
        store_id: StoreId,
        employee_id: Option<EmployeeId>,
        fields: EmployeeFields,
    ) -> Result<EmployeeView, ServiceError> {
        with_service!(self, |service| service
            .save_employee(store_id, employee_id, fields)
            .await)
    }

    pub async fn save_customer(
        &self,
        store_id: StoreId,
        customer_id: Option<CustomerId>,
        fields: CustomerFields,
    ) -> Result<CustomerView, ServiceError> {
        with_service!(self, |service| service
            .save_customer(store_id, customer_id, fields)
            .await)
    }

    pub async fn list_stores(&self) -> Result<Vec<StoreSummaryView>, ServiceError> {
        with_service!(self, |service| service.list_stores().await)
    }

    pub async fn get_store(&self, store_id: StoreId) -> Result<StoreView, ServiceError> {
        with_service!(self, |service| service.get_store(store_id).await)
    }

    pub async fn delete_store(&self, store_id: StoreId) -> Result<(), ServiceError> {
        with_service!(self, |service| service.delete_store(store_id).await)
    }
}
