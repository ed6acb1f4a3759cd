use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use pantry_core::{RecipeChanges, RecipeDetail};
use uuid::Uuid;

#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = RecipeChanges,
    responses(
        (status = 200, description = "Recipe updated; cost re-derived when lines changed", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Recipe, category or ingredient not found", body = ErrorResponse)
    )
)]
pub async fn update_recipe(
    State(catalog): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<RecipeChanges>,
) -> Result<Json<RecipeDetail>, ApiError> {
    Ok(Json(catalog.update_recipe(id, &changes)?))
}
