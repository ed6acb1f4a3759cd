use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use pantry_core::{PageResult, Recipe, SearchCriteria};

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(SearchCriteria),
    responses(
        (status = 200, description = "Page of recipes matching the filters", body = PageResult<Recipe>),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
pub async fn search_recipes(
    State(catalog): State<AppState>,
    Query(criteria): Query<SearchCriteria>,
) -> Result<Json<PageResult<Recipe>>, ApiError> {
    Ok(Json(catalog.search(&criteria)?))
}
