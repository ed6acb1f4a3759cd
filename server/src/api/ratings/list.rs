use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use pantry_core::Rating;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/ratings",
    tag = "ratings",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Ratings on the recipe, oldest first", body = Vec<Rating>),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
pub async fn list_ratings(
    State(catalog): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Rating>>, ApiError> {
    Ok(Json(catalog.list_ratings(id)?))
}
