use crate::api::ApiError;
use crate::AppState;
use axum::{extract::State, Json};
use pantry_core::Category;

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    responses(
        (status = 200, description = "All categories by name", body = Vec<Category>)
    )
)]
pub async fn list_categories(
    State(catalog): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(catalog.list_categories()?))
}
