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
    Router::new().route("/:store_id/customer", post(save_customer))
}

/// Create or update a customer; either way it ends up associated with the
/// path store.
pub async fn save_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(store_id): Path<String>,
    body: Result<Json<dto::CustomerRequest>, JsonRejection>,
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
    match services.save_customer(store_id, body.id, body.fields).await {
        Ok(view) => (errors::upsert_status(created), Json(view)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
