//! Infrastructure layer: entity stores, create/update resolution, transfer
//! views and the store aggregate service.

pub mod entity_store;
pub mod error;
pub mod projection;
pub mod store_service;
pub mod upsert;

pub use error::ServiceError;
pub use projection::{CustomerView, EmployeeView, StoreSummaryView, StoreView};
pub use store_service::StoreService;
