pub mod create;
pub mod list;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use pantry_core::{Category, NewCategory};
use utoipa::OpenApi;

/// Returns the router for /api/categories endpoints (mounted at /api/categories)
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list::list_categories).post(create::create_category))
}

#[derive(OpenApi)]
#[openapi(
    paths(list::list_categories, create::create_category),
    components(schemas(Category, NewCategory))
)]
pub struct ApiDoc;
