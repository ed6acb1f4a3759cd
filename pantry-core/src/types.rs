//! Catalog data model and the inputs accepted by catalog mutations.

use crate::error::{CatalogError, FieldErrors};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructions: String,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub servings: i32,
    pub difficulty: Difficulty,
    pub category_id: Option<Uuid>,
    /// Cached sum of line costs, in minor currency units
    pub estimated_cost_cents: i64,
    /// Cached mean of all rating scores, one fractional digit
    #[serde(with = "rust_decimal::serde::float")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub average_rating: Decimal,
    /// Cached number of ratings
    pub ratings_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn total_time_minutes(&self) -> i32 {
        self.prep_time_minutes.saturating_add(self.cook_time_minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    /// Price of one default unit, in minor currency units
    pub unit_price_cents: i64,
    pub default_unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeIngredientLine {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub quantity: Decimal,
    pub unit: String,
    pub optional: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Rating {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    /// 1 to 5
    pub score: i16,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One ingredient line as shown with its recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LineDetail {
    pub ingredient_id: Uuid,
    /// `None` when the line points at an ingredient that no longer exists
    pub ingredient_name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub quantity: Decimal,
    pub unit: String,
    pub optional: bool,
    pub notes: Option<String>,
    pub line_cost_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<LineDetail>,
}

// ============================================================================
// Mutation inputs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewIngredientLine {
    pub ingredient_id: Uuid,
    #[cfg_attr(feature = "openapi", schema(value_type = f64))]
    pub quantity: Decimal,
    /// Defaults to the ingredient's default unit
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewRecipe {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub instructions: String,
    #[serde(default)]
    pub prep_time_minutes: i32,
    #[serde(default)]
    pub cook_time_minutes: i32,
    pub servings: i32,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub ingredients: Vec<NewIngredientLine>,
}

impl NewRecipe {
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut errors = FieldErrors::new();
        check_not_blank(&mut errors, "title", &self.title);
        check_not_blank(&mut errors, "instructions", &self.instructions);
        check_servings(&mut errors, self.servings);
        check_minutes(&mut errors, "prep_time_minutes", self.prep_time_minutes);
        check_minutes(&mut errors, "cook_time_minutes", self.cook_time_minutes);
        check_lines(&mut errors, &self.ingredients);
        errors.into_result()
    }
}

/// Partial recipe update. Absent fields keep their current value; a present
/// `ingredients` list replaces the whole line set. The nullable fields tell
/// `null` (clear it) apart from leaving them out.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeChanges {
    pub title: Option<String>,
    /// `null` removes the description
    #[serde(default, deserialize_with = "present")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub description: Option<Option<String>>,
    pub instructions: Option<String>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<Difficulty>,
    /// `null` takes the recipe out of its category
    #[serde(default, deserialize_with = "present")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Uuid>))]
    pub category_id: Option<Option<Uuid>>,
    pub ingredients: Option<Vec<NewIngredientLine>>,
}

/// Wraps whatever a present field holds, `null` included, in `Some`. Missing
/// fields fall back to `None` through `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl RecipeChanges {
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut errors = FieldErrors::new();
        if let Some(ref title) = self.title {
            check_not_blank(&mut errors, "title", title);
        }
        if let Some(ref instructions) = self.instructions {
            check_not_blank(&mut errors, "instructions", instructions);
        }
        if let Some(servings) = self.servings {
            check_servings(&mut errors, servings);
        }
        if let Some(minutes) = self.prep_time_minutes {
            check_minutes(&mut errors, "prep_time_minutes", minutes);
        }
        if let Some(minutes) = self.cook_time_minutes {
            check_minutes(&mut errors, "cook_time_minutes", minutes);
        }
        if let Some(ref lines) = self.ingredients {
            check_lines(&mut errors, lines);
        }
        errors.into_result()
    }

    /// Apply the scalar changes to `recipe`. Ingredient lines are handled
    /// separately because they feed the cost rule.
    pub fn apply_to(&self, recipe: &mut Recipe) {
        if let Some(ref title) = self.title {
            recipe.title = title.trim().to_string();
        }
        if let Some(ref description) = self.description {
            recipe.description = description.clone();
        }
        if let Some(ref instructions) = self.instructions {
            recipe.instructions = instructions.clone();
        }
        if let Some(minutes) = self.prep_time_minutes {
            recipe.prep_time_minutes = minutes;
        }
        if let Some(minutes) = self.cook_time_minutes {
            recipe.cook_time_minutes = minutes;
        }
        if let Some(servings) = self.servings {
            recipe.servings = servings;
        }
        if let Some(difficulty) = self.difficulty {
            recipe.difficulty = difficulty;
        }
        if let Some(category_id) = self.category_id {
            recipe.category_id = category_id;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewIngredient {
    pub name: String,
    pub unit_price_cents: i64,
    pub default_unit: String,
}

impl NewIngredient {
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut errors = FieldErrors::new();
        check_not_blank(&mut errors, "name", &self.name);
        check_not_blank(&mut errors, "default_unit", &self.default_unit);
        if self.unit_price_cents < 0 {
            errors.add("unit_price_cents", "must not be negative");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewCategory {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RatingInput {
    /// 1 to 5
    pub score: i16,
    #[serde(default)]
    pub review: Option<String>,
}

impl RatingInput {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if !(1..=5).contains(&self.score) {
            return Err(CatalogError::invalid("score", "must be between 1 and 5"));
        }
        Ok(())
    }
}

/// Result of rating a recipe: a user holds at most one rating per recipe, so
/// a second rating from the same user replaces the first.
#[derive(Debug, Clone, PartialEq)]
pub enum RatingOutcome {
    Created(Rating),
    Updated(Rating),
}

impl RatingOutcome {
    pub fn rating(&self) -> &Rating {
        match self {
            RatingOutcome::Created(rating) | RatingOutcome::Updated(rating) => rating,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, RatingOutcome::Created(_))
    }
}

fn check_not_blank(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "can't be blank");
    }
}

fn check_servings(errors: &mut FieldErrors, servings: i32) {
    if servings < 1 {
        errors.add("servings", "must be at least 1");
    }
}

fn check_minutes(errors: &mut FieldErrors, field: &str, minutes: i32) {
    if minutes < 0 {
        errors.add(field, "must not be negative");
    }
}

/// Quantities are stored as NUMERIC(10, 3).
const QUANTITY_SCALE: u32 = 3;
const MAX_QUANTITY: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

fn check_lines(errors: &mut FieldErrors, lines: &[NewIngredientLine]) {
    let mut seen = HashSet::new();
    for (i, line) in lines.iter().enumerate() {
        let field = format!("ingredients[{i}].quantity");
        if line.quantity <= Decimal::ZERO {
            errors.add(field, "must be greater than 0");
        } else if line.quantity >= MAX_QUANTITY {
            errors.add(field, format!("must be less than {MAX_QUANTITY}"));
        } else if line.quantity.normalize().scale() > QUANTITY_SCALE {
            errors.add(field, format!("must have at most {QUANTITY_SCALE} decimal places"));
        }
        if !seen.insert(line.ingredient_id) {
            errors.add(
                format!("ingredients[{i}].ingredient_id"),
                "is listed more than once",
            );
        }
    }
}
