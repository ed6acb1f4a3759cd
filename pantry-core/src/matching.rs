//! Ingredient matcher: how much of each recipe's requirements a supplied
//! ingredient set covers.

use crate::error::{CatalogError, FieldErrors};
use crate::filter::{validate_page, RecipeScope, ScopeInput};
use crate::page::{PageRequest, PageResult};
use crate::rounding::percent_of;
use crate::settings::CatalogSettings;
use crate::store::CatalogReader;
use crate::types::{Ingredient, Recipe, RecipeIngredientLine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// "What can I cook with these?" request.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IngredientSearch {
    /// Ingredients the caller has on hand
    #[serde(default)]
    pub ingredient_ids: Vec<Uuid>,
    /// Minimum match percentage, 1 to 100 (default: 70)
    pub threshold: Option<i64>,
    /// Count optional lines as requirements too (default: false)
    pub include_optional: Option<bool>,
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub difficulty: Option<String>,
    pub max_cost: Option<i64>,
    pub max_time: Option<i32>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<f64>))]
    pub min_rating: Option<Decimal>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngredientQuery {
    pub available: BTreeSet<Uuid>,
    pub threshold: u8,
    pub include_optional: bool,
    pub scope: RecipeScope,
    pub page: PageRequest,
}

impl IngredientSearch {
    pub fn validate(&self, settings: &CatalogSettings) -> Result<IngredientQuery, CatalogError> {
        let mut errors = FieldErrors::new();

        if self.ingredient_ids.is_empty() {
            errors.add("ingredient_ids", "must contain at least one ingredient");
        }

        let threshold = match self.threshold {
            None => settings.default_match_threshold,
            Some(t) => match u8::try_from(t) {
                Ok(t) if (1..=100).contains(&t) => t,
                _ => {
                    errors.add("threshold", "must be between 1 and 100");
                    settings.default_match_threshold
                }
            },
        };

        let scope = ScopeInput {
            q: self.q.as_deref(),
            category_id: self.category_id,
            difficulty: self.difficulty.as_deref(),
            max_cost: self.max_cost,
            max_time: self.max_time,
            min_rating: self.min_rating,
        }
        .validate(&mut errors);
        let page = validate_page(self.page, self.per_page, settings, &mut errors);

        errors.into_result()?;
        Ok(IngredientQuery {
            available: self.ingredient_ids.iter().copied().collect(),
            threshold,
            include_optional: self.include_optional.unwrap_or(false),
            scope,
            page,
        })
    }
}

/// Coverage of one recipe's required set.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub matched_count: usize,
    pub total_count: usize,
    pub percentage: Decimal,
    /// Required ingredients the caller lacks, in id order
    pub missing: Vec<Uuid>,
}

impl Coverage {
    /// `None` when the recipe has nothing to match against.
    pub fn of(
        lines: &[&RecipeIngredientLine],
        available: &BTreeSet<Uuid>,
        include_optional: bool,
    ) -> Option<Self> {
        let required: BTreeSet<Uuid> = lines
            .iter()
            .filter(|line| include_optional || !line.optional)
            .map(|line| line.ingredient_id)
            .collect();
        if required.is_empty() {
            return None;
        }

        let matched_count = required.intersection(available).count();
        let missing: Vec<Uuid> = required.difference(available).copied().collect();
        let total_count = required.len();

        Some(Self {
            matched_count,
            total_count,
            percentage: percent_of(matched_count as i64, total_count as i64),
            missing,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IngredientMatch {
    pub recipe: Recipe,
    /// Share of required ingredients covered, one fractional digit
    #[serde(with = "rust_decimal::serde::float")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub match_percentage: Decimal,
    pub matched_count: usize,
    pub total_count: usize,
    /// Required ingredients not in the supplied set, ordered by id
    pub missing_ingredients: Vec<Ingredient>,
}

/// Find recipes whose required ingredients are covered by `query.available`
/// to at least `query.threshold` percent, best match first.
///
/// Issues a fixed number of store calls regardless of the result size.
pub fn match_recipes<R>(
    store: &mut R,
    query: &IngredientQuery,
) -> Result<PageResult<IngredientMatch>, CatalogError>
where
    R: CatalogReader + ?Sized,
{
    let recipes = store.find_recipes(&query.scope)?;
    let recipe_ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let lines = store.lines_for_recipes(&recipe_ids)?;

    let mut lines_by_recipe: HashMap<Uuid, Vec<&RecipeIngredientLine>> = HashMap::new();
    for line in &lines {
        lines_by_recipe.entry(line.recipe_id).or_default().push(line);
    }

    let threshold = Decimal::from(query.threshold);
    let mut candidates: Vec<(Recipe, Coverage)> = recipes
        .into_iter()
        .filter_map(|recipe| {
            let recipe_lines = lines_by_recipe
                .get(&recipe.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let coverage = Coverage::of(recipe_lines, &query.available, query.include_optional)?;
            (coverage.percentage >= threshold).then_some((recipe, coverage))
        })
        .collect();

    candidates.sort_by(|(a, ca), (b, cb)| {
        cb.percentage
            .cmp(&ca.percentage)
            .then_with(|| a.id.cmp(&b.id))
    });

    let page = PageResult::paginate(candidates, query.page);

    let missing_ids: BTreeSet<Uuid> = page
        .items
        .iter()
        .flat_map(|(_, coverage)| coverage.missing.iter().copied())
        .collect();
    let ingredients: HashMap<Uuid, Ingredient> = if missing_ids.is_empty() {
        HashMap::new()
    } else {
        let ids: Vec<Uuid> = missing_ids.into_iter().collect();
        store
            .find_ingredients_by_ids(&ids)?
            .into_iter()
            .map(|ingredient| (ingredient.id, ingredient))
            .collect()
    };

    Ok(page.map(|(recipe, coverage)| {
        let missing_ingredients = coverage
            .missing
            .iter()
            .filter_map(|id| {
                let found = ingredients.get(id).cloned();
                if found.is_none() {
                    tracing::warn!(
                        recipe_id = %recipe.id,
                        ingredient_id = %id,
                        "missing ingredient no longer exists, leaving it out"
                    );
                }
                found
            })
            .collect();
        IngredientMatch {
            recipe,
            match_percentage: coverage.percentage,
            matched_count: coverage.matched_count,
            total_count: coverage.total_count,
            missing_ingredients,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(ingredient_id: Uuid, optional: bool) -> RecipeIngredientLine {
        RecipeIngredientLine {
            recipe_id: Uuid::nil(),
            ingredient_id,
            quantity: dec!(1),
            unit: "piece".to_string(),
            optional,
            notes: None,
        }
    }

    fn ids(n: usize) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = (0..n).map(|_| Uuid::now_v7()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_full_coverage_is_exactly_one_hundred() {
        let i = ids(2);
        let lines = [line(i[0], false), line(i[1], false)];
        let refs: Vec<&RecipeIngredientLine> = lines.iter().collect();
        let available = BTreeSet::from([i[0], i[1], Uuid::now_v7()]);

        let coverage = Coverage::of(&refs, &available, false).unwrap();
        assert_eq!(coverage.percentage, dec!(100.0));
        assert_eq!(coverage.matched_count, 2);
        assert!(coverage.missing.is_empty());
    }

    #[test]
    fn test_optional_lines_are_ignored_by_default() {
        let i = ids(3);
        let lines = [line(i[0], false), line(i[1], false), line(i[2], true)];
        let refs: Vec<&RecipeIngredientLine> = lines.iter().collect();
        let available = BTreeSet::from([i[0]]);

        let coverage = Coverage::of(&refs, &available, false).unwrap();
        assert_eq!(coverage.total_count, 2);
        assert_eq!(coverage.percentage, dec!(50.0));
        assert_eq!(coverage.missing, vec![i[1]]);

        let coverage = Coverage::of(&refs, &available, true).unwrap();
        assert_eq!(coverage.total_count, 3);
        assert_eq!(coverage.percentage, dec!(33.3));
        assert_eq!(coverage.missing, vec![i[1], i[2]]);
    }

    #[test]
    fn test_recipe_with_only_optional_lines_has_no_coverage() {
        let i = ids(1);
        let lines = [line(i[0], true)];
        let refs: Vec<&RecipeIngredientLine> = lines.iter().collect();

        assert!(Coverage::of(&refs, &BTreeSet::from([i[0]]), false).is_none());
        assert!(Coverage::of(&[], &BTreeSet::from([i[0]]), true).is_none());
    }

    #[test]
    fn test_validation() {
        let settings = CatalogSettings::default();
        let Err(CatalogError::Validation(errors)) = IngredientSearch {
            threshold: Some(0),
            ..Default::default()
        }
        .validate(&settings) else {
            panic!("expected validation error");
        };
        assert!(errors.get("ingredient_ids").is_some());
        assert_eq!(errors.get("threshold"), Some("must be between 1 and 100"));

        let id = Uuid::now_v7();
        let query = IngredientSearch {
            ingredient_ids: vec![id, id],
            ..Default::default()
        }
        .validate(&settings)
        .unwrap();
        assert_eq!(query.available.len(), 1);
        assert_eq!(query.threshold, 70);
        assert!(!query.include_optional);
    }
}
