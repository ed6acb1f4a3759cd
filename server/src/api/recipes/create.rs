use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use pantry_core::{NewRecipe, RecipeDetail};

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = NewRecipe,
    responses(
        (status = 201, description = "Recipe created with its cost already derived", body = RecipeDetail),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Category or ingredient not found", body = ErrorResponse)
    )
)]
pub async fn create_recipe(
    State(catalog): State<AppState>,
    Json(request): Json<NewRecipe>,
) -> Result<(StatusCode, Json<RecipeDetail>), ApiError> {
    let detail = catalog.create_recipe(&request)?;
    Ok((StatusCode::CREATED, Json(detail)))
}
