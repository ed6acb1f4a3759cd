use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use pantry_core::RecipeDetail;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe with its ingredient lines", body = RecipeDetail),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
pub async fn get_recipe(
    State(catalog): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeDetail>, ApiError> {
    Ok(Json(catalog.get_recipe(id)?))
}
