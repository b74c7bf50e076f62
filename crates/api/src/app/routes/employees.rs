use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use petstore_core::StoreId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/:store_id/employee", post(save_employee))
}

/// Create (no `id` in the body) or update an employee of the path store.
pub async fn save_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Path(store_id): Path<String>,
    body: Result<Json<dto::EmployeeRequest>, JsonRejection>,
) -> axum::response::Response {
    let store_id: StoreId = match errors::parse_id(&store_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match errors::json_body(body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let created = body.id.is_none();
    match services.save_employee(store_id, body.id, body.fields).await {
        Ok(view) => (errors::upsert_status(created), Json(view)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
