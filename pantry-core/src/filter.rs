//! Catalog filter: criteria validation, scoping, ordering and pagination.
//!
//! Every search input is validated into typed values before the store is
//! touched. Plain searches are ordered and paged by the store; the ingredient
//! and budget searches narrow the candidate set with [`RecipeScope`] and rank
//! and page here.

use crate::error::{CatalogError, FieldErrors};
use crate::page::{PageRequest, MAX_PER_PAGE};
use crate::settings::CatalogSettings;
use crate::types::{Difficulty, Recipe};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::cmp::Ordering;
use uuid::Uuid;

/// Highest possible average rating.
const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Recipe search criteria as supplied by a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct SearchCriteria {
    /// Case-insensitive substring matched against title or description
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    /// easy, medium or hard
    pub difficulty: Option<String>,
    /// Maximum estimated cost, in minor currency units
    pub max_cost: Option<i64>,
    /// Maximum prep + cook time, in minutes
    pub max_time: Option<i32>,
    /// Minimum average rating (0 to 5)
    #[cfg_attr(feature = "openapi", param(value_type = Option<f64>))]
    pub min_rating: Option<Decimal>,
    /// rating (default), cost, time or created
    pub sort: Option<String>,
    /// asc or desc (default)
    pub direction: Option<String>,
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Items per page (default: 20, max: 100)
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Rating,
    Cost,
    Time,
    Created,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "rating" => Some(SortKey::Rating),
            "cost" => Some(SortKey::Cost),
            "time" => Some(SortKey::Time),
            "created" => Some(SortKey::Created),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Validated narrowing criteria, combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeScope {
    /// Trimmed, never blank
    pub text: Option<String>,
    pub category_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
    pub max_cost_cents: Option<i64>,
    pub max_total_time: Option<i32>,
    pub min_rating: Option<Decimal>,
}

impl RecipeScope {
    pub fn matches(&self, recipe: &Recipe) -> bool {
        if let Some(ref text) = self.text {
            let needle = text.to_lowercase();
            let in_title = recipe.title.to_lowercase().contains(&needle);
            let in_description = recipe
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if recipe.category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(difficulty) = self.difficulty {
            if recipe.difficulty != difficulty {
                return false;
            }
        }
        if let Some(max_cost) = self.max_cost_cents {
            if recipe.estimated_cost_cents > max_cost {
                return false;
            }
        }
        if let Some(max_time) = self.max_total_time {
            if recipe.total_time_minutes() > max_time {
                return false;
            }
        }
        if let Some(min_rating) = self.min_rating {
            if recipe.average_rating < min_rating {
                return false;
            }
        }
        true
    }
}

/// A fully validated recipe search.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub scope: RecipeScope,
    pub sort: SortKey,
    pub direction: SortDirection,
    pub page: PageRequest,
}

impl SearchCriteria {
    pub fn validate(&self, settings: &CatalogSettings) -> Result<CatalogQuery, CatalogError> {
        let mut errors = FieldErrors::new();

        let scope = ScopeInput {
            q: self.q.as_deref(),
            category_id: self.category_id,
            difficulty: self.difficulty.as_deref(),
            max_cost: self.max_cost,
            max_time: self.max_time,
            min_rating: self.min_rating,
        }
        .validate(&mut errors);

        let sort = match self.sort.as_deref() {
            None => SortKey::default(),
            Some(s) => SortKey::parse(s).unwrap_or_else(|| {
                errors.add("sort", "must be one of rating, cost, time, created");
                SortKey::default()
            }),
        };

        let direction = match self.direction.as_deref() {
            None => SortDirection::default(),
            Some(s) => SortDirection::parse(s).unwrap_or_else(|| {
                errors.add("direction", "must be asc or desc");
                SortDirection::default()
            }),
        };

        let page = validate_page(self.page, self.per_page, settings, &mut errors);

        errors.into_result()?;
        Ok(CatalogQuery {
            scope,
            sort,
            direction,
            page,
        })
    }
}

/// Scope fields shared by every search input.
pub(crate) struct ScopeInput<'a> {
    pub q: Option<&'a str>,
    pub category_id: Option<Uuid>,
    pub difficulty: Option<&'a str>,
    pub max_cost: Option<i64>,
    pub max_time: Option<i32>,
    pub min_rating: Option<Decimal>,
}

impl ScopeInput<'_> {
    pub(crate) fn validate(&self, errors: &mut FieldErrors) -> RecipeScope {
        let text = self
            .q
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let difficulty = self.difficulty.and_then(|d| {
            let parsed = Difficulty::parse(d);
            if parsed.is_none() {
                errors.add("difficulty", "must be one of easy, medium, hard");
            }
            parsed
        });

        if let Some(max_cost) = self.max_cost {
            if max_cost <= 0 {
                errors.add("max_cost", "must be greater than 0");
            }
        }
        if let Some(max_time) = self.max_time {
            if max_time <= 0 {
                errors.add("max_time", "must be greater than 0");
            }
        }
        if let Some(min_rating) = self.min_rating {
            if min_rating < Decimal::ZERO || min_rating > MAX_RATING {
                errors.add("min_rating", "must be between 0 and 5");
            }
        }

        RecipeScope {
            text,
            category_id: self.category_id,
            difficulty,
            max_cost_cents: self.max_cost,
            max_total_time: self.max_time,
            min_rating: self.min_rating,
        }
    }
}

pub(crate) fn validate_page(
    page: Option<i64>,
    per_page: Option<i64>,
    settings: &CatalogSettings,
    errors: &mut FieldErrors,
) -> PageRequest {
    let page = match page {
        None => 1,
        Some(p) => match u32::try_from(p) {
            Ok(p) if p >= 1 => p,
            _ => {
                errors.add("page", "must be at least 1");
                1
            }
        },
    };

    let per_page = match per_page {
        None => settings.default_per_page,
        Some(n) => match u32::try_from(n) {
            Ok(n) if (1..=MAX_PER_PAGE).contains(&n) => n,
            _ => {
                errors.add("per_page", format!("must be between 1 and {MAX_PER_PAGE}"));
                settings.default_per_page
            }
        },
    };

    PageRequest::new(page, per_page)
}

/// Order recipes by `key` in `direction`, ties broken by ascending id.
pub fn sort_recipes(recipes: &mut [Recipe], key: SortKey, direction: SortDirection) {
    recipes.sort_by(|a, b| {
        let primary = match key {
            SortKey::Rating => a.average_rating.cmp(&b.average_rating),
            SortKey::Cost => a.estimated_cost_cents.cmp(&b.estimated_cost_cents),
            SortKey::Time => a.total_time_minutes().cmp(&b.total_time_minutes()),
            SortKey::Created => a.created_at.cmp(&b.created_at),
        };
        let primary = match direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        match primary {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn recipe(title: &str) -> Recipe {
        let now = Utc::now();
        Recipe {
            id: Uuid::now_v7(),
            title: title.to_string(),
            description: None,
            instructions: "Cook.".to_string(),
            prep_time_minutes: 10,
            cook_time_minutes: 20,
            servings: 4,
            difficulty: Difficulty::Easy,
            category_id: None,
            estimated_cost_cents: 500,
            average_rating: Decimal::ZERO,
            ratings_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate(criteria: SearchCriteria) -> Result<CatalogQuery, CatalogError> {
        criteria.validate(&CatalogSettings::default())
    }

    fn field_errors(result: Result<CatalogQuery, CatalogError>) -> FieldErrors {
        match result {
            Err(CatalogError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let query = validate(SearchCriteria::default()).unwrap();
        assert_eq!(query.sort, SortKey::Rating);
        assert_eq!(query.direction, SortDirection::Desc);
        assert_eq!(query.page, PageRequest::new(1, 20));
        assert_eq!(query.scope, RecipeScope::default());
    }

    #[test]
    fn test_unknown_sort_and_difficulty_rejected() {
        let errors = field_errors(validate(SearchCriteria {
            sort: Some("popularity".to_string()),
            difficulty: Some("extreme".to_string()),
            direction: Some("sideways".to_string()),
            ..Default::default()
        }));
        assert!(errors.get("sort").is_some());
        assert!(errors.get("difficulty").is_some());
        assert!(errors.get("direction").is_some());
    }

    #[test]
    fn test_numeric_bounds_rejected() {
        let errors = field_errors(validate(SearchCriteria {
            max_cost: Some(0),
            max_time: Some(-10),
            min_rating: Some(dec!(5.5)),
            page: Some(0),
            per_page: Some(101),
            ..Default::default()
        }));
        assert_eq!(errors.get("max_cost"), Some("must be greater than 0"));
        assert_eq!(errors.get("max_time"), Some("must be greater than 0"));
        assert_eq!(errors.get("min_rating"), Some("must be between 0 and 5"));
        assert_eq!(errors.get("page"), Some("must be at least 1"));
        assert_eq!(errors.get("per_page"), Some("must be between 1 and 100"));
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let query = validate(SearchCriteria {
            q: Some("   ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(query.scope.text.is_none());
    }

    #[test]
    fn test_text_matches_title_or_description_case_insensitively() {
        let scope = RecipeScope {
            text: Some("SOUP".to_string()),
            ..Default::default()
        };
        let mut by_title = recipe("Tomato soup");
        let mut by_description = recipe("Gazpacho");
        by_description.description = Some("A cold Soup from Spain".to_string());
        let neither = recipe("Pancakes");

        assert!(scope.matches(&by_title));
        assert!(scope.matches(&by_description));
        assert!(!scope.matches(&neither));

        by_title.title = "Tomato sou p".to_string();
        assert!(!scope.matches(&by_title));
    }

    #[test]
    fn test_criteria_are_combined_with_and() {
        let category = Uuid::now_v7();
        let scope = RecipeScope {
            category_id: Some(category),
            difficulty: Some(Difficulty::Easy),
            max_cost_cents: Some(1000),
            max_total_time: Some(30),
            min_rating: Some(dec!(4.0)),
            ..Default::default()
        };

        let mut good = recipe("Salad");
        good.category_id = Some(category);
        good.average_rating = dec!(4.0);
        assert!(scope.matches(&good));

        let mut too_slow = good.clone();
        too_slow.cook_time_minutes = 21;
        assert!(!scope.matches(&too_slow));

        let mut too_expensive = good.clone();
        too_expensive.estimated_cost_cents = 1001;
        assert!(!scope.matches(&too_expensive));

        let mut badly_rated = good.clone();
        badly_rated.average_rating = dec!(3.9);
        assert!(!scope.matches(&badly_rated));

        let mut uncategorized = good.clone();
        uncategorized.category_id = None;
        assert!(!scope.matches(&uncategorized));

        let mut hard = good;
        hard.difficulty = Difficulty::Hard;
        assert!(!scope.matches(&hard));
    }

    #[test]
    fn test_sort_by_rating_desc_breaks_ties_by_id() {
        let mut a = recipe("a");
        let mut b = recipe("b");
        let mut c = recipe("c");
        a.average_rating = dec!(4.0);
        b.average_rating = dec!(4.5);
        c.average_rating = dec!(4.0);
        let mut recipes = vec![c.clone(), a.clone(), b.clone()];

        sort_recipes(&mut recipes, SortKey::Rating, SortDirection::Desc);

        let (first_tie, second_tie) = if a.id < c.id { (a.id, c.id) } else { (c.id, a.id) };
        let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, first_tie, second_tie]);
    }

    #[test]
    fn test_sort_by_time_and_created() {
        let mut quick = recipe("quick");
        quick.cook_time_minutes = 5;
        let mut slow = recipe("slow");
        slow.created_at = quick.created_at - Duration::days(1);

        let mut recipes = vec![slow.clone(), quick.clone()];
        sort_recipes(&mut recipes, SortKey::Time, SortDirection::Asc);
        assert_eq!(recipes[0].id, quick.id);

        sort_recipes(&mut recipes, SortKey::Created, SortDirection::Asc);
        assert_eq!(recipes[0].id, slow.id);
    }

    #[test]
    fn test_criteria_from_query_string_values() {
        let criteria: SearchCriteria = serde_json::from_value(serde_json::json!({
            "q": "soup",
            "min_rating": "4.5",
            "sort": "cost",
            "direction": "asc",
            "per_page": 5
        }))
        .unwrap();
        let query = validate(criteria).unwrap();
        assert_eq!(query.scope.min_rating, Some(dec!(4.5)));
        assert_eq!(query.sort, SortKey::Cost);
        assert_eq!(query.direction, SortDirection::Asc);
        assert_eq!(query.page.per_page, 5);
    }
}
