use super::{CatalogReader, CatalogStore, CatalogWriter};
use crate::aggregates::RatingSummary;
use crate::error::{CatalogError, StoreError};
use crate::filter::{sort_recipes, CatalogQuery, RecipeScope};
use crate::page::PageResult;
use crate::types::{Category, Ingredient, Rating, Recipe, RecipeIngredientLine};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    recipes: BTreeMap<Uuid, Recipe>,
    ingredients: BTreeMap<Uuid, Ingredient>,
    /// Lines per recipe, in the order they were written
    lines: BTreeMap<Uuid, Vec<RecipeIngredientLine>>,
    ratings: BTreeMap<Uuid, Rating>,
    categories: BTreeMap<Uuid, Category>,
}

/// In-process catalog store.
///
/// Transactions run one at a time under a single lock and work on the live
/// state; a snapshot taken at the start is put back if the work fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_aggregate_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every cached-aggregate write fail until switched off again.
    /// Lets tests observe that a failed recalculation leaves nothing behind.
    pub fn fail_aggregate_writes(&self, fail: bool) {
        self.fail_aggregate_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl CatalogStore for MemoryStore {
    fn read<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut dyn CatalogReader) -> Result<T, CatalogError>,
    {
        let mut guard = self.lock()?;
        let mut txn = MemoryTxn {
            state: &mut *guard,
            fail_aggregate_writes: false,
        };
        f(&mut txn)
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut dyn CatalogWriter) -> Result<T, CatalogError>,
    {
        let mut guard = self.lock()?;
        let snapshot = guard.clone();
        let result = {
            let mut txn = MemoryTxn {
                state: &mut *guard,
                fail_aggregate_writes: self.fail_aggregate_writes.load(Ordering::SeqCst),
            };
            f(&mut txn)
        };
        if result.is_err() {
            *guard = snapshot;
        }
        result
    }
}

struct MemoryTxn<'a> {
    state: &'a mut MemoryState,
    fail_aggregate_writes: bool,
}

impl MemoryTxn<'_> {
    fn check_aggregate_write(&self) -> Result<(), StoreError> {
        if self.fail_aggregate_writes {
            return Err(StoreError::Backend(
                "aggregate writes are switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn require_recipe(&self, id: Uuid) -> Result<(), StoreError> {
        if self.state.recipes.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::Backend(format!(
                "foreign key violation: recipe {id} does not exist"
            )))
        }
    }
}

impl CatalogReader for MemoryTxn<'_> {
    fn find_recipes(&mut self, scope: &RecipeScope) -> Result<Vec<Recipe>, StoreError> {
        Ok(self
            .state
            .recipes
            .values()
            .filter(|recipe| scope.matches(recipe))
            .cloned()
            .collect())
    }

    fn search_recipes(&mut self, query: &CatalogQuery) -> Result<PageResult<Recipe>, StoreError> {
        let mut recipes = self.find_recipes(&query.scope)?;
        sort_recipes(&mut recipes, query.sort, query.direction);
        Ok(PageResult::paginate(recipes, query.page))
    }

    fn get_recipe(&mut self, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        Ok(self.state.recipes.get(&id).cloned())
    }

    fn find_ingredients_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Ingredient>, StoreError> {
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        Ok(self
            .state
            .ingredients
            .values()
            .filter(|ingredient| wanted.contains(&ingredient.id))
            .cloned()
            .collect())
    }

    fn list_ingredients(&mut self) -> Result<Vec<Ingredient>, StoreError> {
        let mut ingredients: Vec<Ingredient> = self.state.ingredients.values().cloned().collect();
        ingredients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ingredients)
    }

    fn lines_for_recipes(
        &mut self,
        recipe_ids: &[Uuid],
    ) -> Result<Vec<RecipeIngredientLine>, StoreError> {
        let wanted: HashSet<&Uuid> = recipe_ids.iter().collect();
        Ok(self
            .state
            .lines
            .iter()
            .filter(|(recipe_id, _)| wanted.contains(recipe_id))
            .flat_map(|(_, lines)| lines.iter().cloned())
            .collect())
    }

    fn recipe_ids_using_ingredient(
        &mut self,
        ingredient_id: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .state
            .lines
            .iter()
            .filter(|(_, lines)| lines.iter().any(|l| l.ingredient_id == ingredient_id))
            .map(|(recipe_id, _)| *recipe_id)
            .collect())
    }

    fn ratings_for_recipe(&mut self, recipe_id: Uuid) -> Result<Vec<Rating>, StoreError> {
        let mut ratings: Vec<Rating> = self
            .state
            .ratings
            .values()
            .filter(|rating| rating.recipe_id == recipe_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(ratings)
    }

    fn find_rating(
        &mut self,
        recipe_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Rating>, StoreError> {
        Ok(self
            .state
            .ratings
            .values()
            .find(|rating| rating.recipe_id == recipe_id && rating.user_id == user_id)
            .cloned())
    }

    fn get_category(&mut self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.state.categories.get(&id).cloned())
    }

    fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

impl CatalogWriter for MemoryTxn<'_> {
    fn lock_recipe(&mut self, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        // The whole transaction already runs under the store lock.
        self.get_recipe(id)
    }

    fn lock_ingredients(&mut self, ids: &[Uuid]) -> Result<Vec<Ingredient>, StoreError> {
        self.find_ingredients_by_ids(ids)
    }

    fn insert_recipe(&mut self, recipe: &Recipe) -> Result<(), StoreError> {
        if self.state.recipes.contains_key(&recipe.id) {
            return Err(StoreError::Conflict("recipes_pkey".to_string()));
        }
        self.state.recipes.insert(recipe.id, recipe.clone());
        Ok(())
    }

    fn update_recipe(&mut self, recipe: &Recipe) -> Result<(), StoreError> {
        if let Some(stored) = self.state.recipes.get_mut(&recipe.id) {
            stored.title = recipe.title.clone();
            stored.description = recipe.description.clone();
            stored.instructions = recipe.instructions.clone();
            stored.prep_time_minutes = recipe.prep_time_minutes;
            stored.cook_time_minutes = recipe.cook_time_minutes;
            stored.servings = recipe.servings;
            stored.difficulty = recipe.difficulty;
            stored.category_id = recipe.category_id;
            stored.updated_at = recipe.updated_at;
        }
        Ok(())
    }

    fn delete_recipe(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let existed = self.state.recipes.remove(&id).is_some();
        if existed {
            self.state.lines.remove(&id);
            self.state.ratings.retain(|_, rating| rating.recipe_id != id);
        }
        Ok(existed)
    }

    fn replace_lines(
        &mut self,
        recipe_id: Uuid,
        lines: &[RecipeIngredientLine],
    ) -> Result<(), StoreError> {
        self.require_recipe(recipe_id)?;
        if let Some(line) = lines
            .iter()
            .find(|line| !self.state.ingredients.contains_key(&line.ingredient_id))
        {
            return Err(StoreError::Backend(format!(
                "foreign key violation: ingredient {} does not exist",
                line.ingredient_id
            )));
        }
        if lines.is_empty() {
            self.state.lines.remove(&recipe_id);
        } else {
            self.state.lines.insert(recipe_id, lines.to_vec());
        }
        Ok(())
    }

    fn set_cached_cost(
        &mut self,
        id: Uuid,
        cost_cents: i64,
    ) -> Result<Option<Recipe>, StoreError> {
        self.check_aggregate_write()?;
        Ok(self.state.recipes.get_mut(&id).map(|recipe| {
            recipe.estimated_cost_cents = cost_cents;
            recipe.clone()
        }))
    }

    fn set_cached_rating(
        &mut self,
        id: Uuid,
        summary: &RatingSummary,
    ) -> Result<Option<Recipe>, StoreError> {
        self.check_aggregate_write()?;
        Ok(self.state.recipes.get_mut(&id).map(|recipe| {
            recipe.average_rating = summary.average;
            recipe.ratings_count = summary.count;
            recipe.clone()
        }))
    }

    fn insert_rating(&mut self, rating: &Rating) -> Result<(), StoreError> {
        self.require_recipe(rating.recipe_id)?;
        let duplicate = self
            .state
            .ratings
            .values()
            .any(|r| r.recipe_id == rating.recipe_id && r.user_id == rating.user_id);
        if duplicate {
            return Err(StoreError::Conflict(
                "ratings_recipe_id_user_id_key".to_string(),
            ));
        }
        self.state.ratings.insert(rating.id, rating.clone());
        Ok(())
    }

    fn update_rating(&mut self, rating: &Rating) -> Result<(), StoreError> {
        if let Some(stored) = self.state.ratings.get_mut(&rating.id) {
            stored.score = rating.score;
            stored.review = rating.review.clone();
            stored.updated_at = rating.updated_at;
        }
        Ok(())
    }

    fn delete_rating(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.ratings.remove(&id).is_some())
    }

    fn insert_ingredient(&mut self, ingredient: &Ingredient) -> Result<(), StoreError> {
        if self
            .state
            .ingredients
            .values()
            .any(|i| i.name == ingredient.name)
        {
            return Err(StoreError::Conflict("ingredients_name_key".to_string()));
        }
        self.state
            .ingredients
            .insert(ingredient.id, ingredient.clone());
        Ok(())
    }

    fn set_ingredient_price(
        &mut self,
        id: Uuid,
        unit_price_cents: i64,
    ) -> Result<Option<Ingredient>, StoreError> {
        Ok(self.state.ingredients.get_mut(&id).map(|ingredient| {
            ingredient.unit_price_cents = unit_price_cents;
            ingredient.updated_at = Utc::now();
            ingredient.clone()
        }))
    }

    fn insert_category(&mut self, category: &Category) -> Result<(), StoreError> {
        if self
            .state
            .categories
            .values()
            .any(|c| c.name == category.name)
        {
            return Err(StoreError::Conflict("categories_name_key".to_string()));
        }
        self.state.categories.insert(category.id, category.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SortDirection, SortKey};
    use crate::page::PageRequest;
    use crate::types::Difficulty;
    use rust_decimal::Decimal;

    fn recipe() -> Recipe {
        let now = Utc::now();
        Recipe {
            id: Uuid::now_v7(),
            title: "Omelette".to_string(),
            description: None,
            instructions: "Whisk and fry.".to_string(),
            prep_time_minutes: 5,
            cook_time_minutes: 5,
            servings: 1,
            difficulty: Difficulty::Easy,
            category_id: None,
            estimated_cost_cents: 0,
            average_rating: Decimal::ZERO,
            ratings_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn rating(recipe_id: Uuid, user_id: Uuid, score: i16) -> Rating {
        let now = Utc::now();
        Rating {
            id: Uuid::now_v7(),
            recipe_id,
            user_id,
            score,
            review: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_failed_transaction_is_rolled_back() {
        let store = MemoryStore::new();
        let omelette = recipe();

        let result: Result<(), CatalogError> = store.transaction(|txn| {
            txn.insert_recipe(&omelette)?;
            Err(CatalogError::Consistency("boom".to_string()))
        });
        assert!(result.is_err());

        let found = store.read(|r| Ok(r.get_recipe(omelette.id)?)).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_committed_transaction_is_visible() {
        let store = MemoryStore::new();
        let omelette = recipe();

        store
            .transaction(|txn| Ok(txn.insert_recipe(&omelette)?))
            .unwrap();

        let found = store.read(|r| Ok(r.get_recipe(omelette.id)?)).unwrap();
        assert_eq!(found, Some(omelette));
    }

    #[test]
    fn test_one_rating_per_user_and_recipe() {
        let store = MemoryStore::new();
        let omelette = recipe();
        let user = Uuid::now_v7();

        let result = store.transaction(|txn| {
            txn.insert_recipe(&omelette)?;
            txn.insert_rating(&rating(omelette.id, user, 4))?;
            Ok(txn.insert_rating(&rating(omelette.id, user, 2))?)
        });

        assert!(matches!(
            result,
            Err(CatalogError::Store(StoreError::Conflict(_)))
        ));
    }

    #[test]
    fn test_deleting_recipe_cascades() {
        let store = MemoryStore::new();
        let omelette = recipe();
        let user = Uuid::now_v7();

        store
            .transaction(|txn| {
                txn.insert_recipe(&omelette)?;
                Ok(txn.insert_rating(&rating(omelette.id, user, 5))?)
            })
            .unwrap();
        let deleted = store
            .transaction(|txn| Ok(txn.delete_recipe(omelette.id)?))
            .unwrap();

        assert!(deleted);
        let ratings = store
            .read(|r| Ok(r.ratings_for_recipe(omelette.id)?))
            .unwrap();
        assert!(ratings.is_empty());
    }

    #[test]
    fn test_aggregate_write_failure_switch() {
        let store = MemoryStore::new();
        let omelette = recipe();
        store
            .transaction(|txn| Ok(txn.insert_recipe(&omelette)?))
            .unwrap();

        store.fail_aggregate_writes(true);
        let result = store.transaction(|txn| Ok(txn.set_cached_cost(omelette.id, 99)?));
        assert!(result.is_err());

        store.fail_aggregate_writes(false);
        let updated = store
            .transaction(|txn| Ok(txn.set_cached_cost(omelette.id, 99)?))
            .unwrap();
        assert_eq!(updated.map(|r| r.estimated_cost_cents), Some(99));
    }

    #[test]
    fn test_search_recipes_pages_in_order() {
        let store = MemoryStore::new();
        let mut recipes: Vec<Recipe> = (0..5)
            .map(|i| Recipe {
                cook_time_minutes: 10 * (5 - i),
                ..recipe()
            })
            .collect();
        store
            .transaction(|txn| {
                for r in &recipes {
                    txn.insert_recipe(r)?;
                }
                Ok(())
            })
            .unwrap();
        recipes.sort_by_key(|r| r.total_time_minutes());

        let query = |page| CatalogQuery {
            scope: RecipeScope {
                max_total_time: Some(45),
                ..Default::default()
            },
            sort: SortKey::Time,
            direction: SortDirection::Asc,
            page: PageRequest::new(page, 2),
        };

        let first = store.read(|r| Ok(r.search_recipes(&query(1))?)).unwrap();
        let ids: Vec<Uuid> = first.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![recipes[0].id, recipes[1].id]);
        assert_eq!(first.total_count, 4);
        assert_eq!(first.total_pages, 2);

        let past_end = store.read(|r| Ok(r.search_recipes(&query(7))?)).unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_count, 4);
    }
}
