//! Budget matcher: recipes whose cost, scaled to a serving count, fits a
//! budget.

use crate::error::{CatalogError, FieldErrors};
use crate::filter::{validate_page, RecipeScope, ScopeInput};
use crate::page::{PageRequest, PageResult};
use crate::rounding::{div_round, percent_of};
use crate::settings::CatalogSettings;
use crate::store::CatalogReader;
use crate::types::Recipe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// "What can I cook for this much?" request.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct BudgetSearch {
    /// Budget in minor currency units, must be positive
    pub budget_cents: Option<i64>,
    /// Servings to cook (default: 4)
    pub servings: Option<i64>,
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub difficulty: Option<String>,
    pub max_cost: Option<i64>,
    pub max_time: Option<i32>,
    #[cfg_attr(feature = "openapi", param(value_type = Option<f64>))]
    pub min_rating: Option<Decimal>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetQuery {
    pub budget_cents: i64,
    pub servings: i32,
    pub scope: RecipeScope,
    pub page: PageRequest,
}

impl BudgetSearch {
    pub fn validate(&self, settings: &CatalogSettings) -> Result<BudgetQuery, CatalogError> {
        let mut errors = FieldErrors::new();

        let budget_cents = match self.budget_cents {
            None => {
                errors.add("budget_cents", "is required");
                0
            }
            Some(b) if b <= 0 => {
                errors.add("budget_cents", "must be greater than 0");
                0
            }
            Some(b) => b,
        };

        let servings = match self.servings {
            None => settings.default_servings,
            Some(s) => match i32::try_from(s) {
                Ok(s) if s >= 1 => s,
                _ => {
                    errors.add("servings", "must be at least 1");
                    settings.default_servings
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
        Ok(BudgetQuery {
            budget_cents,
            servings,
            scope,
            page,
        })
    }
}

/// `round(cost / recipe_servings * servings)`, computed exactly.
/// `None` when the recipe has no meaningful per-serving cost.
pub fn scaled_cost(cost_cents: i64, recipe_servings: i32, servings: i32) -> Option<i64> {
    if recipe_servings <= 0 {
        return None;
    }
    let scaled = div_round(
        i128::from(cost_cents) * i128::from(servings),
        i128::from(recipe_servings),
    );
    Some(i64::try_from(scaled).unwrap_or(i64::MAX))
}

/// How a scaled cost sits against a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetFit {
    pub actual_cost_cents: i64,
    pub remaining_budget_cents: i64,
    pub usage_percentage: Decimal,
}

impl BudgetFit {
    /// `None` when `actual_cost_cents` exceeds the budget.
    pub fn of(actual_cost_cents: i64, budget_cents: i64) -> Option<Self> {
        if actual_cost_cents > budget_cents {
            return None;
        }
        Some(Self {
            actual_cost_cents,
            remaining_budget_cents: (budget_cents - actual_cost_cents).max(0),
            usage_percentage: percent_of(actual_cost_cents, budget_cents),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BudgetMatch {
    pub recipe: Recipe,
    /// Cost scaled to the requested servings
    pub actual_cost_cents: i64,
    pub remaining_budget_cents: i64,
    #[serde(with = "rust_decimal::serde::float")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub budget_usage_percentage: Decimal,
    pub fits_budget: bool,
}

/// Recipes affordable within `query.budget_cents`, cheapest first.
pub fn match_budget<R>(
    store: &mut R,
    query: &BudgetQuery,
) -> Result<PageResult<BudgetMatch>, CatalogError>
where
    R: CatalogReader + ?Sized,
{
    let recipes = store.find_recipes(&query.scope)?;

    let mut fits: Vec<(Recipe, BudgetFit)> = recipes
        .into_iter()
        .filter_map(|recipe| {
            let actual =
                scaled_cost(recipe.estimated_cost_cents, recipe.servings, query.servings)?;
            let fit = BudgetFit::of(actual, query.budget_cents)?;
            Some((recipe, fit))
        })
        .collect();

    fits.sort_by(|(a, fa), (b, fb)| {
        fa.actual_cost_cents
            .cmp(&fb.actual_cost_cents)
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(PageResult::paginate(fits, query.page).map(|(recipe, fit)| BudgetMatch {
        recipe,
        actual_cost_cents: fit.actual_cost_cents,
        remaining_budget_cents: fit.remaining_budget_cents,
        budget_usage_percentage: fit.usage_percentage,
        fits_budget: true,
    }))
}
