use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use pantry_core::{BudgetMatch, BudgetSearch, PageResult};

#[utoipa::path(
    get,
    path = "/api/recipes/by-budget",
    tag = "recipes",
    params(BudgetSearch),
    responses(
        (status = 200, description = "Recipes that fit the budget once scaled, cheapest first", body = PageResult<BudgetMatch>),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
pub async fn search_by_budget(
    State(catalog): State<AppState>,
    Query(search): Query<BudgetSearch>,
) -> Result<Json<PageResult<BudgetMatch>>, ApiError> {
    Ok(Json(catalog.search_by_budget(&search)?))
}
