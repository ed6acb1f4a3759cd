use crate::api::ApiError;
use crate::AppState;
use axum::{extract::State, Json};
use pantry_core::Ingredient;

#[utoipa::path(
    get,
    path = "/api/ingredients",
    tag = "ingredients",
    responses(
        (status = 200, description = "All ingredients by name", body = Vec<Ingredient>)
    )
)]
pub async fn list_ingredients(
    State(catalog): State<AppState>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    Ok(Json(catalog.list_ingredients()?))
}
