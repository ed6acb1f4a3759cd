//! The catalog service: every search and mutation the engine offers.
//!
//! Mutations run in a single store transaction together with the aggregate
//! refreshes they trigger, so a failed refresh discards the whole change.

use crate::aggregates::{refresh_cost, refresh_rating};
use crate::budget::{match_budget, BudgetMatch, BudgetSearch};
use crate::cost::{line_cost, price_index};
use crate::error::{CatalogError, Entity};
use crate::filter::SearchCriteria;
use crate::matching::{match_recipes, IngredientMatch, IngredientSearch};
use crate::page::PageResult;
use crate::settings::CatalogSettings;
use crate::store::{CatalogReader, CatalogStore, CatalogWriter};
use crate::types::{
    Category, Ingredient, LineDetail, NewCategory, NewIngredient, NewIngredientLine, NewRecipe,
    Rating, RatingInput, RatingOutcome, Recipe, RecipeChanges, RecipeDetail, RecipeIngredientLine,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

pub struct Catalog<S> {
    store: S,
    settings: CatalogSettings,
}

impl<S: CatalogStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            settings: CatalogSettings::default(),
        }
    }

    pub fn with_settings(store: S, settings: CatalogSettings) -> Result<Self, CatalogError> {
        settings.validate()?;
        Ok(Self { store, settings })
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Searches
    // ------------------------------------------------------------------

    pub fn search(&self, criteria: &SearchCriteria) -> Result<PageResult<Recipe>, CatalogError> {
        let query = criteria.validate(&self.settings)?;
        self.store.read(|r| Ok(r.search_recipes(&query)?))
    }

    pub fn search_by_ingredients(
        &self,
        search: &IngredientSearch,
    ) -> Result<PageResult<IngredientMatch>, CatalogError> {
        let query = search.validate(&self.settings)?;
        self.store.read(|r| match_recipes(r, &query))
    }

    pub fn search_by_budget(
        &self,
        search: &BudgetSearch,
    ) -> Result<PageResult<BudgetMatch>, CatalogError> {
        let query = search.validate(&self.settings)?;
        self.store.read(|r| match_budget(r, &query))
    }

    // ------------------------------------------------------------------
    // Explicit recalculation
    // ------------------------------------------------------------------

    pub fn recalculate_cost(&self, recipe_id: Uuid) -> Result<Recipe, CatalogError> {
        self.store.transaction(|txn| {
            require_locked_recipe(txn, recipe_id)?;
            refresh_cost(txn, recipe_id)
        })
    }

    pub fn recalculate_rating(&self, recipe_id: Uuid) -> Result<Recipe, CatalogError> {
        self.store.transaction(|txn| {
            require_locked_recipe(txn, recipe_id)?;
            refresh_rating(txn, recipe_id)
        })
    }

    // ------------------------------------------------------------------
    // Recipes
    // ------------------------------------------------------------------

    pub fn get_recipe(&self, recipe_id: Uuid) -> Result<RecipeDetail, CatalogError> {
        self.store.read(|r| {
            let recipe = r
                .get_recipe(recipe_id)?
                .ok_or_else(|| CatalogError::not_found(Entity::Recipe, recipe_id))?;
            load_detail(r, recipe)
        })
    }

    pub fn create_recipe(&self, input: &NewRecipe) -> Result<RecipeDetail, CatalogError> {
        input.validate()?;

        let detail = self.store.transaction(|txn| {
            ensure_category(txn, input.category_id)?;

            let now = Utc::now();
            let recipe = Recipe {
                id: Uuid::now_v7(),
                title: input.title.trim().to_string(),
                description: input.description.clone(),
                instructions: input.instructions.clone(),
                prep_time_minutes: input.prep_time_minutes,
                cook_time_minutes: input.cook_time_minutes,
                servings: input.servings,
                difficulty: input.difficulty,
                category_id: input.category_id,
                estimated_cost_cents: 0,
                average_rating: Decimal::new(0, 1),
                ratings_count: 0,
                created_at: now,
                updated_at: now,
            };
            txn.insert_recipe(&recipe)?;

            let lines = build_lines(txn, recipe.id, &input.ingredients)?;
            txn.replace_lines(recipe.id, &lines)?;
            let recipe = refresh_cost(txn, recipe.id)?;

            load_detail(txn, recipe)
        })?;

        tracing::info!(
            "Created recipe {} ({} lines, cost {})",
            detail.recipe.id,
            detail.ingredients.len(),
            detail.recipe.estimated_cost_cents
        );
        Ok(detail)
    }

    pub fn update_recipe(
        &self,
        recipe_id: Uuid,
        changes: &RecipeChanges,
    ) -> Result<RecipeDetail, CatalogError> {
        changes.validate()?;

        self.store.transaction(|txn| {
            let mut recipe = require_locked_recipe(txn, recipe_id)?;
            ensure_category(txn, changes.category_id.flatten())?;

            changes.apply_to(&mut recipe);
            recipe.updated_at = Utc::now();
            txn.update_recipe(&recipe)?;

            let recipe = match changes.ingredients {
                Some(ref new_lines) => {
                    let lines = build_lines(txn, recipe_id, new_lines)?;
                    txn.replace_lines(recipe_id, &lines)?;
                    refresh_cost(txn, recipe_id)?
                }
                None => recipe,
            };

            load_detail(txn, recipe)
        })
    }

    pub fn delete_recipe(&self, recipe_id: Uuid) -> Result<(), CatalogError> {
        let deleted = self
            .store
            .transaction(|txn| Ok(txn.delete_recipe(recipe_id)?))?;
        if !deleted {
            return Err(CatalogError::not_found(Entity::Recipe, recipe_id));
        }
        tracing::info!("Deleted recipe {}", recipe_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    /// Create the user's rating of a recipe, or replace it if one exists.
    /// Returns the outcome together with the recipe's refreshed aggregates.
    pub fn rate_recipe(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        input: &RatingInput,
    ) -> Result<(RatingOutcome, Recipe), CatalogError> {
        input.validate()?;

        self.store.transaction(|txn| {
            require_locked_recipe(txn, recipe_id)?;

            let now = Utc::now();
            let outcome = match txn.find_rating(recipe_id, user_id)? {
                Some(mut rating) => {
                    rating.score = input.score;
                    rating.review = input.review.clone();
                    rating.updated_at = now;
                    txn.update_rating(&rating)?;
                    RatingOutcome::Updated(rating)
                }
                None => {
                    let rating = Rating {
                        id: Uuid::now_v7(),
                        recipe_id,
                        user_id,
                        score: input.score,
                        review: input.review.clone(),
                        created_at: now,
                        updated_at: now,
                    };
                    txn.insert_rating(&rating)?;
                    RatingOutcome::Created(rating)
                }
            };

            let recipe = refresh_rating(txn, recipe_id)?;
            Ok((outcome, recipe))
        })
    }

    /// Remove the user's rating of a recipe.
    pub fn delete_rating(&self, recipe_id: Uuid, user_id: Uuid) -> Result<Recipe, CatalogError> {
        self.store.transaction(|txn| {
            require_locked_recipe(txn, recipe_id)?;
            let rating = txn
                .find_rating(recipe_id, user_id)?
                .ok_or_else(|| CatalogError::not_found(Entity::Rating, recipe_id))?;
            txn.delete_rating(rating.id)?;
            refresh_rating(txn, recipe_id)
        })
    }

    pub fn list_ratings(&self, recipe_id: Uuid) -> Result<Vec<Rating>, CatalogError> {
        self.store.read(|r| {
            if r.get_recipe(recipe_id)?.is_none() {
                return Err(CatalogError::not_found(Entity::Recipe, recipe_id));
            }
            Ok(r.ratings_for_recipe(recipe_id)?)
        })
    }

    // ------------------------------------------------------------------
    // Ingredients and categories
    // ------------------------------------------------------------------

    pub fn create_ingredient(&self, input: &NewIngredient) -> Result<Ingredient, CatalogError> {
        input.validate()?;

        let now = Utc::now();
        let ingredient = Ingredient {
            id: Uuid::now_v7(),
            name: input.name.trim().to_string(),
            unit_price_cents: input.unit_price_cents,
            default_unit: input.default_unit.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store
            .transaction(|txn| Ok(txn.insert_ingredient(&ingredient)?))?;
        Ok(ingredient)
    }

    pub fn list_ingredients(&self) -> Result<Vec<Ingredient>, CatalogError> {
        self.store.read(|r| Ok(r.list_ingredients()?))
    }

    /// Change an ingredient's price and re-derive the cost of every recipe
    /// that uses it.
    pub fn update_ingredient_price(
        &self,
        ingredient_id: Uuid,
        unit_price_cents: i64,
    ) -> Result<Ingredient, CatalogError> {
        if unit_price_cents < 0 {
            return Err(CatalogError::invalid(
                "unit_price_cents",
                "must not be negative",
            ));
        }

        let (ingredient, refreshed) = self.store.transaction(|txn| {
            // Recipes are locked ahead of the ingredient row, the order recipe
            // edits and recalculations take their locks in.
            let mut locked = Vec::new();
            for recipe_id in txn.recipe_ids_using_ingredient(ingredient_id)? {
                if txn.lock_recipe(recipe_id)?.is_some() {
                    locked.push(recipe_id);
                }
            }

            let ingredient = txn
                .set_ingredient_price(ingredient_id, unit_price_cents)?
                .ok_or_else(|| CatalogError::not_found(Entity::Ingredient, ingredient_id))?;

            // Edits that committed while the price update waited may have
            // added lines.
            let mut refreshed = 0;
            for recipe_id in txn.recipe_ids_using_ingredient(ingredient_id)? {
                if !locked.contains(&recipe_id) && txn.lock_recipe(recipe_id)?.is_none() {
                    continue;
                }
                refresh_cost(txn, recipe_id)?;
                refreshed += 1;
            }
            Ok((ingredient, refreshed))
        })?;

        tracing::info!(
            "Ingredient {} now costs {}, refreshed {} recipes",
            ingredient.id,
            ingredient.unit_price_cents,
            refreshed
        );
        Ok(ingredient)
    }

    pub fn create_category(&self, input: &NewCategory) -> Result<Category, CatalogError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CatalogError::invalid("name", "can't be blank"));
        }

        let category = Category {
            id: Uuid::now_v7(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.store
            .transaction(|txn| Ok(txn.insert_category(&category)?))?;
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.store.read(|r| Ok(r.list_categories()?))
    }
}

fn require_locked_recipe<W>(txn: &mut W, recipe_id: Uuid) -> Result<Recipe, CatalogError>
where
    W: CatalogWriter + ?Sized,
{
    txn.lock_recipe(recipe_id)?
        .ok_or_else(|| CatalogError::not_found(Entity::Recipe, recipe_id))
}

fn ensure_category<R>(store: &mut R, category_id: Option<Uuid>) -> Result<(), CatalogError>
where
    R: CatalogReader + ?Sized,
{
    if let Some(id) = category_id {
        if store.get_category(id)?.is_none() {
            return Err(CatalogError::not_found(Entity::Category, id));
        }
    }
    Ok(())
}

/// Resolve requested lines against the ingredient table in one lookup.
fn build_lines<R>(
    store: &mut R,
    recipe_id: Uuid,
    input: &[NewIngredientLine],
) -> Result<Vec<RecipeIngredientLine>, CatalogError>
where
    R: CatalogReader + ?Sized,
{
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = input.iter().map(|line| line.ingredient_id).collect();
    let ingredients: HashMap<Uuid, Ingredient> = store
        .find_ingredients_by_ids(&ids)?
        .into_iter()
        .map(|ingredient| (ingredient.id, ingredient))
        .collect();

    input
        .iter()
        .map(|line| {
            let ingredient = ingredients
                .get(&line.ingredient_id)
                .ok_or_else(|| CatalogError::not_found(Entity::Ingredient, line.ingredient_id))?;
            let unit = line
                .unit
                .as_deref()
                .map(str::trim)
                .filter(|unit| !unit.is_empty())
                .unwrap_or(ingredient.default_unit.as_str())
                .to_string();
            Ok(RecipeIngredientLine {
                recipe_id,
                ingredient_id: line.ingredient_id,
                quantity: line.quantity,
                unit,
                optional: line.optional,
                notes: line.notes.clone(),
            })
        })
        .collect()
}

fn load_detail<R>(store: &mut R, recipe: Recipe) -> Result<RecipeDetail, CatalogError>
where
    R: CatalogReader + ?Sized,
{
    let lines = store.lines_for_recipes(&[recipe.id])?;
    let ids: Vec<Uuid> = lines.iter().map(|line| line.ingredient_id).collect();
    let ingredients = if ids.is_empty() {
        Vec::new()
    } else {
        store.find_ingredients_by_ids(&ids)?
    };
    let prices = price_index(&ingredients);
    let names: HashMap<Uuid, &str> = ingredients
        .iter()
        .map(|ingredient| (ingredient.id, ingredient.name.as_str()))
        .collect();

    let ingredients = lines
        .into_iter()
        .map(|line| LineDetail {
            ingredient_name: names.get(&line.ingredient_id).map(|name| name.to_string()),
            line_cost_cents: prices
                .get(&line.ingredient_id)
                .map(|&price| line_cost(line.quantity, price))
                .unwrap_or(0),
            ingredient_id: line.ingredient_id,
            quantity: line.quantity,
            unit: line.unit,
            optional: line.optional,
            notes: line.notes,
        })
        .collect();

    Ok(RecipeDetail {
        recipe,
        ingredients,
    })
}
