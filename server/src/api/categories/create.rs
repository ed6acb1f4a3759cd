use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use pantry_core::{Category, NewCategory};

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    request_body = NewCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid request (empty name)", body = ErrorResponse),
        (status = 409, description = "Category already exists", body = ErrorResponse)
    )
)]
pub async fn create_category(
    State(catalog): State<AppState>,
    Json(request): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = catalog.create_category(&request)?;
    Ok((StatusCode::CREATED, Json(category)))
}
