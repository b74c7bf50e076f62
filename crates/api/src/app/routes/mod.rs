use axum::Router;

pub mod customers;
pub mod employees;
pub mod stores;
pub mod system;

/// Router for all pet store endpoints.
pub fn router() -> Router {
    Router::new().nest(
        "/pet_store",
        stores::router()
            .merge(employees::router())
            .merge(customers::router()),
    )
}
