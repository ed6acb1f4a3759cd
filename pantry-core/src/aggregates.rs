//! Aggregate maintainer: keeps the cached cost and rating columns of a recipe
//! equal to what its current lines and ratings say.
//!
//! Both refreshes recompute from scratch; nothing is adjusted incrementally.
//! They must run inside the transaction that made the triggering change so the
//! cache and its sources commit or roll back together.

use crate::cost::{price_index, recipe_cost};
use crate::error::CatalogError;
use crate::rounding::one_decimal;
use crate::store::CatalogWriter;
use crate::types::Recipe;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Mean score and count of a recipe's ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingSummary {
    /// One fractional digit, 0.0 when there are no ratings
    pub average: Decimal,
    pub count: i32,
}

impl RatingSummary {
    pub fn empty() -> Self {
        Self {
            average: Decimal::new(0, 1),
            count: 0,
        }
    }

    pub fn from_scores(scores: impl IntoIterator<Item = i16>) -> Self {
        let (sum, count) = scores
            .into_iter()
            .fold((0i64, 0i32), |(sum, count), score| {
                (sum + i64::from(score), count + 1)
            });
        if count == 0 {
            return Self::empty();
        }
        Self {
            average: one_decimal(Decimal::from(sum) / Decimal::from(count)),
            count,
        }
    }
}

/// Recompute and store the cost of `recipe_id` from its lines and the current
/// ingredient prices. The priced ingredients stay locked until the transaction
/// ends, so a concurrent price change either lands first or waits and then
/// refreshes this recipe itself.
pub fn refresh_cost<W>(store: &mut W, recipe_id: Uuid) -> Result<Recipe, CatalogError>
where
    W: CatalogWriter + ?Sized,
{
    let lines = store.lines_for_recipes(&[recipe_id])?;
    let mut ingredient_ids: Vec<Uuid> = lines.iter().map(|line| line.ingredient_id).collect();
    ingredient_ids.sort_unstable();
    ingredient_ids.dedup();

    let ingredients = store.lock_ingredients(&ingredient_ids)?;
    let cost = recipe_cost(&lines, &price_index(&ingredients));

    let recipe = store.set_cached_cost(recipe_id, cost)?.ok_or_else(|| {
        CatalogError::Consistency(format!(
            "recipe {recipe_id} disappeared while refreshing its cost"
        ))
    })?;

    tracing::debug!(%recipe_id, cost_cents = cost, lines = lines.len(), "refreshed recipe cost");
    Ok(recipe)
}

/// Recompute and store the rating average and count of `recipe_id`.
pub fn refresh_rating<W>(store: &mut W, recipe_id: Uuid) -> Result<Recipe, CatalogError>
where
    W: CatalogWriter + ?Sized,
{
    let ratings = store.ratings_for_recipe(recipe_id)?;
    let summary = RatingSummary::from_scores(ratings.iter().map(|rating| rating.score));

    let recipe = store
        .set_cached_rating(recipe_id, &summary)?
        .ok_or_else(|| {
            CatalogError::Consistency(format!(
                "recipe {recipe_id} disappeared while refreshing its rating"
            ))
        })?;

    tracing::debug!(
        %recipe_id,
        average = %summary.average,
        count = summary.count,
        "refreshed recipe rating"
    );
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CatalogStore, MemoryStore};
    use crate::types::{Difficulty, Ingredient, Rating, RecipeIngredientLine};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_of_scores() {
        let summary = RatingSummary::from_scores([4, 5, 4]);
        assert_eq!(summary.average, dec!(4.3));
        assert_eq!(summary.count, 3);

        assert_eq!(RatingSummary::from_scores([1, 2]).average, dec!(1.5));
        assert_eq!(RatingSummary::from_scores([5, 4, 4, 4]).average, dec!(4.3)); // 4.25
    }

    #[test]
    fn test_summary_without_ratings() {
        let summary = RatingSummary::from_scores(std::iter::empty());
        assert_eq!(summary, RatingSummary::empty());
        assert_eq!(summary.average.to_string(), "0.0");
    }

    fn seed(store: &MemoryStore) -> (Uuid, Uuid) {
        let now = Utc::now();
        let recipe = Recipe {
            id: Uuid::now_v7(),
            title: "Salsa".to_string(),
            description: None,
            instructions: "Chop.".to_string(),
            prep_time_minutes: 10,
            cook_time_minutes: 0,
            servings: 2,
            difficulty: Difficulty::Easy,
            category_id: None,
            estimated_cost_cents: 0,
            average_rating: Decimal::ZERO,
            ratings_count: 0,
            created_at: now,
            updated_at: now,
        };
        let tomato = Ingredient {
            id: Uuid::now_v7(),
            name: "tomato".to_string(),
            unit_price_cents: 50,
            default_unit: "piece".to_string(),
            created_at: now,
            updated_at: now,
        };
        let line = RecipeIngredientLine {
            recipe_id: recipe.id,
            ingredient_id: tomato.id,
            quantity: dec!(3),
            unit: "piece".to_string(),
            optional: false,
            notes: None,
        };
        store
            .transaction(|txn| {
                txn.insert_recipe(&recipe)?;
                txn.insert_ingredient(&tomato)?;
                Ok(txn.replace_lines(recipe.id, &[line])?)
            })
            .unwrap();
        (recipe.id, tomato.id)
    }

    #[test]
    fn test_refresh_cost_uses_current_prices() {
        let store = MemoryStore::new();
        let (recipe_id, tomato) = seed(&store);

        let recipe = store
            .transaction(|txn| refresh_cost(txn, recipe_id))
            .unwrap();
        assert_eq!(recipe.estimated_cost_cents, 150);

        let recipe = store
            .transaction(|txn| {
                txn.set_ingredient_price(tomato, 60)?;
                refresh_cost(txn, recipe_id)
            })
            .unwrap();
        assert_eq!(recipe.estimated_cost_cents, 180);
    }

    #[test]
    fn test_refresh_rating_recomputes_from_scratch() {
        let store = MemoryStore::new();
        let (recipe_id, _) = seed(&store);
        let now = Utc::now();

        let recipe = store
            .transaction(|txn| {
                for score in [5, 3] {
                    txn.insert_rating(&Rating {
                        id: Uuid::now_v7(),
                        recipe_id,
                        user_id: Uuid::now_v7(),
                        score,
                        review: None,
                        created_at: now,
                        updated_at: now,
                    })?;
                }
                refresh_rating(txn, recipe_id)
            })
            .unwrap();

        assert_eq!(recipe.average_rating, dec!(4.0));
        assert_eq!(recipe.ratings_count, 2);
    }

    #[test]
    fn test_refresh_of_missing_recipe_is_a_consistency_error() {
        let store = MemoryStore::new();
        let result = store.transaction(|txn| refresh_rating(txn, Uuid::now_v7()));
        assert!(matches!(result, Err(CatalogError::Consistency(_))));
    }
}
