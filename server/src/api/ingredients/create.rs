use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use pantry_core::{Ingredient, NewIngredient};

#[utoipa::path(
    post,
    path = "/api/ingredients",
    tag = "ingredients",
    request_body = NewIngredient,
    responses(
        (status = 201, description = "Ingredient created", body = Ingredient),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Ingredient name already taken", body = ErrorResponse)
    )
)]
pub async fn create_ingredient(
    State(catalog): State<AppState>,
    Json(request): Json<NewIngredient>,
) -> Result<(StatusCode, Json<Ingredient>), ApiError> {
    let ingredient = catalog.create_ingredient(&request)?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}
