use crate::api::{ApiError, ErrorResponse};
use crate::identity::ActingUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use pantry_core::Recipe;
use uuid::Uuid;

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/ratings",
    tag = "ratings",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Rating removed; recipe with its refreshed aggregate", body = Recipe),
        (status = 401, description = "Missing or malformed X-User-Id", body = ErrorResponse),
        (status = 404, description = "Recipe or rating not found", body = ErrorResponse)
    ),
    security(
        ("user_id" = [])
    )
)]
pub async fn delete_rating(
    ActingUser(user_id): ActingUser,
    State(catalog): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Recipe>, ApiError> {
    Ok(Json(catalog.delete_rating(id, user_id)?))
}
