pub mod by_budget;
pub mod by_ingredients;
pub mod create;
pub mod delete;
pub mod get;
pub mod recalculate;
pub mod search;
pub mod update;

use crate::api::ratings;
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use pantry_core::{
    BudgetMatch, Difficulty, IngredientMatch, IngredientSearch, LineDetail, NewIngredientLine,
    NewRecipe, Recipe, RecipeChanges, RecipeDetail,
};
use utoipa::OpenApi;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search::search_recipes).post(create::create_recipe))
        .route(
            "/by-ingredients",
            post(by_ingredients::search_by_ingredients),
        )
        .route("/by-budget", get(by_budget::search_by_budget))
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::update_recipe)
                .delete(delete::delete_recipe),
        )
        .route("/{id}/recalculate", post(recalculate::recalculate_recipe))
        .route(
            "/{id}/ratings",
            get(ratings::list::list_ratings)
                .post(ratings::upsert::rate_recipe)
                .delete(ratings::delete::delete_rating),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        search::search_recipes,
        by_ingredients::search_by_ingredients,
        by_budget::search_by_budget,
        create::create_recipe,
        get::get_recipe,
        update::update_recipe,
        delete::delete_recipe,
        recalculate::recalculate_recipe,
    ),
    components(schemas(
        Recipe,
        RecipeDetail,
        LineDetail,
        Difficulty,
        NewRecipe,
        NewIngredientLine,
        RecipeChanges,
        IngredientSearch,
        IngredientMatch,
        BudgetMatch,
        recalculate::RecalculateRequest,
        recalculate::Aggregate,
    ))
)]
pub struct ApiDoc;
