use crate::api::{ApiError, ErrorResponse};
use crate::identity::ActingUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pantry_core::{Rating, RatingInput, RatingOutcome, Recipe};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// The caller's rating together with the recipe's refreshed aggregate.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RatedRecipe {
    pub rating: Rating,
    pub recipe: Recipe,
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/ratings",
    tag = "ratings",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = RatingInput,
    responses(
        (status = 201, description = "First rating from this user", body = RatedRecipe),
        (status = 200, description = "User's existing rating replaced", body = RatedRecipe),
        (status = 400, description = "Score out of range", body = ErrorResponse),
        (status = 401, description = "Missing or malformed X-User-Id", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("user_id" = [])
    )
)]
pub async fn rate_recipe(
    ActingUser(user_id): ActingUser,
    State(catalog): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RatingInput>,
) -> Result<(StatusCode, Json<RatedRecipe>), ApiError> {
    let (outcome, recipe) = catalog.rate_recipe(id, user_id, &input)?;

    let (status, rating) = match outcome {
        RatingOutcome::Created(rating) => (StatusCode::CREATED, rating),
        RatingOutcome::Updated(rating) => (StatusCode::OK, rating),
    };
    Ok((status, Json(RatedRecipe { rating, recipe })))
}
