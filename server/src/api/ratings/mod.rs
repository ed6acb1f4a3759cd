pub mod delete;
pub mod list;
pub mod upsert;

use pantry_core::{Rating, RatingInput};
use utoipa::OpenApi;

// Routes are mounted under /api/recipes/{id}/ratings by the recipes router.

#[derive(OpenApi)]
#[openapi(
    paths(list::list_ratings, upsert::rate_recipe, delete::delete_rating),
    components(schemas(Rating, RatingInput, upsert::RatedRecipe))
)]
pub struct ApiDoc;
