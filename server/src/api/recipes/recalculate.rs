use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use pantry_core::Recipe;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Which cached aggregate to re-derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Cost,
    Rating,
    #[default]
    All,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RecalculateRequest {
    #[serde(default)]
    pub aggregate: Aggregate,
}

/// Repair a recipe's cached cost and/or rating from its source rows.
#[utoipa::path(
    post,
    path = "/api/recipes/{id}/recalculate",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body(content = Option<RecalculateRequest>, description = "Defaults to recalculating everything"),
    responses(
        (status = 200, description = "Recipe with fresh aggregates", body = Recipe),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
pub async fn recalculate_recipe(
    State(catalog): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<RecalculateRequest>>,
) -> Result<Json<Recipe>, ApiError> {
    let aggregate = request.map(|Json(r)| r.aggregate).unwrap_or_default();

    let recipe = match aggregate {
        Aggregate::Cost => catalog.recalculate_cost(id)?,
        Aggregate::Rating => catalog.recalculate_rating(id)?,
        Aggregate::All => {
            catalog.recalculate_cost(id)?;
            catalog.recalculate_rating(id)?
        }
    };

    tracing::info!(
        "Recalculated {:?} for recipe {}: cost {} cents, rating {} over {}",
        aggregate,
        id,
        recipe.estimated_cost_cents,
        recipe.average_rating,
        recipe.ratings_count
    );
    Ok(Json(recipe))
}
