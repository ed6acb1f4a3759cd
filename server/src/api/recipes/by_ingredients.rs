use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{extract::State, Json};
use pantry_core::{IngredientMatch, IngredientSearch, PageResult};

/// The available-ingredient set can be long, so this search takes a JSON
/// body rather than query parameters.
#[utoipa::path(
    post,
    path = "/api/recipes/by-ingredients",
    tag = "recipes",
    request_body = IngredientSearch,
    responses(
        (status = 200, description = "Recipes ranked by how much of them the ingredients cover", body = PageResult<IngredientMatch>),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
pub async fn search_by_ingredients(
    State(catalog): State<AppState>,
    Json(search): Json<IngredientSearch>,
) -> Result<Json<PageResult<IngredientMatch>>, ApiError> {
    let page = catalog.search_by_ingredients(&search)?;
    tracing::debug!(
        "Ingredient search over {} ingredients matched {} recipes",
        search.ingredient_ids.len(),
        page.total_count
    );
    Ok(Json(page))
}
