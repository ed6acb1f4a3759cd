pub mod create;
pub mod list;
pub mod update_price;

use crate::AppState;
use axum::routing::{get, put};
use axum::Router;
use pantry_core::{Ingredient, NewIngredient};
use utoipa::OpenApi;

/// Returns the router for /api/ingredients endpoints (mounted at /api/ingredients)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_ingredients).post(create::create_ingredient))
        .route("/{id}/price", put(update_price::update_price))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_ingredients,
        create::create_ingredient,
        update_price::update_price,
    ),
    components(schemas(Ingredient, NewIngredient, update_price::UpdatePriceRequest))
)]
pub struct ApiDoc;
