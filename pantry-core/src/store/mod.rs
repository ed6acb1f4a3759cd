//! Storage abstraction for the catalog.
//!
//! The catalog never talks to a database directly. A [`CatalogStore`] hands
//! out a reader for queries and a writer bound to a transaction for
//! mutations; the in-memory store backs tests and the Postgres store backs the
//! server.

mod memory;

pub use memory::MemoryStore;

use crate::aggregates::RatingSummary;
use crate::error::{CatalogError, StoreError};
use crate::filter::{CatalogQuery, RecipeScope};
use crate::page::PageResult;
use crate::types::{Category, Ingredient, Rating, Recipe, RecipeIngredientLine};
use uuid::Uuid;

/// Read access to catalog rows.
///
/// Batch lookups take id slices so callers can load everything a result set
/// needs in a fixed number of queries.
pub trait CatalogReader {
    /// Every recipe accepted by `scope`, in no particular order.
    fn find_recipes(&mut self, scope: &RecipeScope) -> Result<Vec<Recipe>, StoreError>;

    /// One page of the recipes accepted by `query.scope`, ordered by the
    /// query's sort key and direction with ties broken by ascending id.
    /// The total counts the whole scoped set, also when the page is past the
    /// end.
    fn search_recipes(&mut self, query: &CatalogQuery) -> Result<PageResult<Recipe>, StoreError>;

    fn get_recipe(&mut self, id: Uuid) -> Result<Option<Recipe>, StoreError>;

    /// Ingredients with the given ids. Unknown ids are skipped.
    fn find_ingredients_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Ingredient>, StoreError>;

    /// All ingredients ordered by name.
    fn list_ingredients(&mut self) -> Result<Vec<Ingredient>, StoreError>;

    /// Ingredient lines of all the given recipes.
    fn lines_for_recipes(
        &mut self,
        recipe_ids: &[Uuid],
    ) -> Result<Vec<RecipeIngredientLine>, StoreError>;

    fn recipe_ids_using_ingredient(&mut self, ingredient_id: Uuid)
        -> Result<Vec<Uuid>, StoreError>;

    /// Ratings of a recipe, oldest first.
    fn ratings_for_recipe(&mut self, recipe_id: Uuid) -> Result<Vec<Rating>, StoreError>;

    fn find_rating(&mut self, recipe_id: Uuid, user_id: Uuid)
        -> Result<Option<Rating>, StoreError>;

    fn get_category(&mut self, id: Uuid) -> Result<Option<Category>, StoreError>;

    /// All categories ordered by name.
    fn list_categories(&mut self) -> Result<Vec<Category>, StoreError>;
}

/// Write access to catalog rows, only handed out inside a transaction.
pub trait CatalogWriter: CatalogReader {
    /// Load a recipe and hold it against concurrent recalculation until the
    /// transaction ends.
    fn lock_recipe(&mut self, id: Uuid) -> Result<Option<Recipe>, StoreError>;

    /// Ingredients with the given ids, ordered by id, held against price
    /// changes until the transaction ends. Unknown ids are skipped.
    fn lock_ingredients(&mut self, ids: &[Uuid]) -> Result<Vec<Ingredient>, StoreError>;

    fn insert_recipe(&mut self, recipe: &Recipe) -> Result<(), StoreError>;

    /// Overwrite the descriptive columns of a recipe. Cached aggregates are
    /// left alone.
    fn update_recipe(&mut self, recipe: &Recipe) -> Result<(), StoreError>;

    fn delete_recipe(&mut self, id: Uuid) -> Result<bool, StoreError>;

    fn replace_lines(
        &mut self,
        recipe_id: Uuid,
        lines: &[RecipeIngredientLine],
    ) -> Result<(), StoreError>;

    /// Returns the updated recipe, or `None` when it no longer exists.
    fn set_cached_cost(&mut self, id: Uuid, cost_cents: i64)
        -> Result<Option<Recipe>, StoreError>;

    /// Returns the updated recipe, or `None` when it no longer exists.
    fn set_cached_rating(
        &mut self,
        id: Uuid,
        summary: &RatingSummary,
    ) -> Result<Option<Recipe>, StoreError>;

    fn insert_rating(&mut self, rating: &Rating) -> Result<(), StoreError>;

    fn update_rating(&mut self, rating: &Rating) -> Result<(), StoreError>;

    fn delete_rating(&mut self, id: Uuid) -> Result<bool, StoreError>;

    fn insert_ingredient(&mut self, ingredient: &Ingredient) -> Result<(), StoreError>;

    fn set_ingredient_price(
        &mut self,
        id: Uuid,
        unit_price_cents: i64,
    ) -> Result<Option<Ingredient>, StoreError>;

    fn insert_category(&mut self, category: &Category) -> Result<(), StoreError>;
}

/// A catalog backend.
pub trait CatalogStore: Send + Sync {
    /// Run read-only work against one consistent snapshot.
    fn read<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut dyn CatalogReader) -> Result<T, CatalogError>;

    /// Run `f` in a transaction. Everything it wrote is committed when it
    /// returns `Ok` and discarded when it returns `Err`.
    fn transaction<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut dyn CatalogWriter) -> Result<T, CatalogError>;
}
