use crate::schema::{categories, ingredients, ratings, recipe_ingredients, recipes};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use pantry_core::{
    Category, Difficulty, Ingredient, Rating, Recipe, RecipeIngredientLine, StoreError,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructions: String,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub servings: i32,
    pub difficulty: String,
    pub category_id: Option<Uuid>,
    pub estimated_cost_cents: i64,
    pub average_rating: Decimal,
    pub ratings_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecipeRow {
    pub fn into_recipe(self) -> Result<Recipe, StoreError> {
        let difficulty = Difficulty::parse(&self.difficulty).ok_or_else(|| {
            StoreError::Backend(format!(
                "recipe {} has unknown difficulty {:?}",
                self.id, self.difficulty
            ))
        })?;
        Ok(Recipe {
            id: self.id,
            title: self.title,
            description: self.description,
            instructions: self.instructions,
            prep_time_minutes: self.prep_time_minutes,
            cook_time_minutes: self.cook_time_minutes,
            servings: self.servings,
            difficulty,
            category_id: self.category_id,
            estimated_cost_cents: self.estimated_cost_cents,
            average_rating: self.average_rating,
            ratings_count: self.ratings_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<&Recipe> for RecipeRow {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            instructions: recipe.instructions.clone(),
            prep_time_minutes: recipe.prep_time_minutes,
            cook_time_minutes: recipe.cook_time_minutes,
            servings: recipe.servings,
            difficulty: recipe.difficulty.as_str().to_string(),
            category_id: recipe.category_id,
            estimated_cost_cents: recipe.estimated_cost_cents,
            average_rating: recipe.average_rating,
            ratings_count: recipe.ratings_count,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

/// Descriptive recipe columns. The cached aggregate columns are only ever
/// written by the aggregate refreshes.
#[derive(AsChangeset)]
#[diesel(table_name = recipes)]
#[diesel(treat_none_as_null = true)]
pub struct RecipeDetailsChangeset<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub instructions: &'a str,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub servings: i32,
    pub difficulty: &'a str,
    pub category_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Recipe> for RecipeDetailsChangeset<'a> {
    fn from(recipe: &'a Recipe) -> Self {
        Self {
            title: &recipe.title,
            description: recipe.description.as_deref(),
            instructions: &recipe.instructions,
            prep_time_minutes: recipe.prep_time_minutes,
            cook_time_minutes: recipe.cook_time_minutes,
            servings: recipe.servings,
            difficulty: recipe.difficulty.as_str(),
            category_id: recipe.category_id,
            updated_at: recipe.updated_at,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IngredientRow {
    pub id: Uuid,
    pub name: String,
    pub unit_price_cents: i64,
    pub default_unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            unit_price_cents: row.unit_price_cents,
            default_unit: row.default_unit,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Ingredient> for IngredientRow {
    fn from(ingredient: &Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name.clone(),
            unit_price_cents: ingredient.unit_price_cents,
            default_unit: ingredient.default_unit.clone(),
            created_at: ingredient.created_at,
            updated_at: ingredient.updated_at,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = recipe_ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LineRow {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
    pub is_optional: bool,
    pub notes: Option<String>,
}

impl From<LineRow> for RecipeIngredientLine {
    fn from(row: LineRow) -> Self {
        Self {
            recipe_id: row.recipe_id,
            ingredient_id: row.ingredient_id,
            quantity: row.quantity,
            unit: row.unit,
            optional: row.is_optional,
            notes: row.notes,
        }
    }
}

impl From<&RecipeIngredientLine> for LineRow {
    fn from(line: &RecipeIngredientLine) -> Self {
        Self {
            recipe_id: line.recipe_id,
            ingredient_id: line.ingredient_id,
            quantity: line.quantity,
            unit: line.unit.clone(),
            is_optional: line.optional,
            notes: line.notes.clone(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = ratings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RatingRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub score: i16,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Self {
            id: row.id,
            recipe_id: row.recipe_id,
            user_id: row.user_id,
            score: row.score,
            review: row.review,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Rating> for RatingRow {
    fn from(rating: &Rating) -> Self {
        Self {
            id: rating.id,
            recipe_id: rating.recipe_id,
            user_id: rating.user_id,
            score: rating.score,
            review: rating.review.clone(),
            created_at: rating.created_at,
            updated_at: rating.updated_at,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

impl From<&Category> for CategoryRow {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            created_at: category.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(difficulty: &str) -> RecipeRow {
        let now = Utc::now();
        RecipeRow {
            id: Uuid::now_v7(),
            title: "Flatbread".to_string(),
            description: Some("Quick".to_string()),
            instructions: "Knead and bake.".to_string(),
            prep_time_minutes: 15,
            cook_time_minutes: 10,
            servings: 4,
            difficulty: difficulty.to_string(),
            category_id: None,
            estimated_cost_cents: 240,
            average_rating: dec!(4.5),
            ratings_count: 2,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_recipe_row_round_trip() {
        let recipe = row("medium").into_recipe().unwrap();
        assert_eq!(recipe.difficulty, Difficulty::Medium);

        let back = RecipeRow::from(&recipe);
        assert_eq!(back.difficulty, "medium");
        assert_eq!(back.average_rating, dec!(4.5));
    }

    #[test]
    fn test_unknown_difficulty_is_a_backend_error() {
        assert!(matches!(
            row("impossible").into_recipe(),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn test_optional_flag_maps_to_column() {
        let line = RecipeIngredientLine {
            recipe_id: Uuid::now_v7(),
            ingredient_id: Uuid::now_v7(),
            quantity: dec!(0.5),
            unit: "cup".to_string(),
            optional: true,
            notes: None,
        };
        let row = LineRow::from(&line);
        assert!(row.is_optional);
        assert_eq!(RecipeIngredientLine::from(row), line);
    }
}
