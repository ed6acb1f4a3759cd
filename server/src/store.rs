//! PostgreSQL catalog store.
//!
//! Every statement runs inside a `db.query` span so the per-request query
//! counter in [`crate::telemetry`] sees it.

use crate::db::DbPool;
use crate::models::{
    CategoryRow, IngredientRow, LineRow, RatingRow, RecipeDetailsChangeset, RecipeRow,
};
use crate::schema::{categories, ingredients, ratings, recipe_ingredients, recipes};
use diesel::dsl::sql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::BigInt;
use pantry_core::{
    CatalogError, CatalogQuery, CatalogReader, CatalogStore, CatalogWriter, Category, Ingredient,
    PageResult, Rating, RatingSummary, Recipe, RecipeIngredientLine, RecipeScope, SortDirection,
    SortKey, StoreError,
};
use uuid::Uuid;

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        self.pool.get().map_err(|e| {
            tracing::error!("Database connection failed: {}", e);
            StoreError::Backend(format!("database connection failed: {e}"))
        })
    }
}

impl CatalogStore for PgStore {
    fn read<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut dyn CatalogReader) -> Result<T, CatalogError>,
    {
        let mut pooled = self.connection()?;

        // A multi-statement search must see one snapshot, not interleave with
        // commits made between its queries.
        let mut failure = None;
        let result = pooled
            .build_transaction()
            .read_only()
            .repeatable_read()
            .run::<T, DieselError, _>(|conn| {
                f(&mut PgRepo { conn }).map_err(|err| {
                    failure = Some(err);
                    DieselError::RollbackTransaction
                })
            });

        result.map_err(|err| unwind_failure(failure, err))
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut dyn CatalogWriter) -> Result<T, CatalogError>,
    {
        let mut pooled = self.connection()?;
        let conn: &mut PgConnection = &mut pooled;

        // Diesel only rolls back on its own error type, so the catalog error is
        // parked here while diesel unwinds the transaction.
        let mut failure = None;
        let result = conn.transaction::<T, DieselError, _>(|conn| {
            f(&mut PgRepo { conn }).map_err(|err| {
                failure = Some(err);
                DieselError::RollbackTransaction
            })
        });

        result.map_err(|err| unwind_failure(failure, err))
    }
}

/// The catalog error parked by a rolled back closure, or the diesel error that
/// ended the transaction on its own.
fn unwind_failure(failure: Option<CatalogError>, err: DieselError) -> CatalogError {
    match failure {
        Some(failure) => failure,
        None => CatalogError::Store(store_error(err)),
    }
}

/// A connection, possibly inside a transaction.
struct PgRepo<'a> {
    conn: &'a mut PgConnection,
}

fn store_error(err: DieselError) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreError::Conflict(info.constraint_name().unwrap_or("unique").to_string())
        }
        other => {
            tracing::error!("Database query failed: {}", other);
            StoreError::Backend(other.to_string())
        }
    }
}

fn query<T>(name: &'static str, run: impl FnOnce() -> QueryResult<T>) -> Result<T, StoreError> {
    let _span = tracing::info_span!("db.query", query = name).entered();
    run().map_err(store_error)
}

/// `%text%` for ILIKE, with the pattern metacharacters escaped.
pub fn like_pattern(text: &str) -> String {
    format!(
        "%{}%",
        text.replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
    )
}

fn into_recipes(rows: Vec<RecipeRow>) -> Result<Vec<Recipe>, StoreError> {
    rows.into_iter().map(RecipeRow::into_recipe).collect()
}

/// Recipes accepted by `scope`, as a boxed query the caller can order and
/// page further.
fn scoped_recipes(scope: &RecipeScope) -> recipes::BoxedQuery<'static, Pg> {
    let mut q = recipes::table.into_boxed();

    if let Some(pattern) = scope.text.as_deref().map(like_pattern) {
        q = q.filter(
            recipes::title
                .ilike(pattern.clone())
                .or(recipes::description.ilike(pattern)),
        );
    }
    if let Some(category_id) = scope.category_id {
        q = q.filter(recipes::category_id.eq(category_id));
    }
    if let Some(difficulty) = scope.difficulty {
        q = q.filter(recipes::difficulty.eq(difficulty.as_str()));
    }
    if let Some(max_cost) = scope.max_cost_cents {
        q = q.filter(recipes::estimated_cost_cents.le(max_cost));
    }
    if let Some(max_time) = scope.max_total_time {
        q = q.filter((recipes::prep_time_minutes + recipes::cook_time_minutes).le(max_time));
    }
    if let Some(min_rating) = scope.min_rating {
        q = q.filter(recipes::average_rating.ge(min_rating));
    }
    q
}

impl CatalogReader for PgRepo<'_> {
    fn find_recipes(&mut self, scope: &RecipeScope) -> Result<Vec<Recipe>, StoreError> {
        let rows = query("find_recipes", || {
            scoped_recipes(scope)
                .select(RecipeRow::as_select())
                .load(self.conn)
        })?;
        into_recipes(rows)
    }

    fn search_recipes(&mut self, search: &CatalogQuery) -> Result<PageResult<Recipe>, StoreError> {
        let total_time = recipes::prep_time_minutes + recipes::cook_time_minutes;
        let q = scoped_recipes(&search.scope);
        let q = match (search.sort, search.direction) {
            (SortKey::Rating, SortDirection::Asc) => {
                q.order((recipes::average_rating.asc(), recipes::id.asc()))
            }
            (SortKey::Rating, SortDirection::Desc) => {
                q.order((recipes::average_rating.desc(), recipes::id.asc()))
            }
            (SortKey::Cost, SortDirection::Asc) => {
                q.order((recipes::estimated_cost_cents.asc(), recipes::id.asc()))
            }
            (SortKey::Cost, SortDirection::Desc) => {
                q.order((recipes::estimated_cost_cents.desc(), recipes::id.asc()))
            }
            (SortKey::Time, SortDirection::Asc) => q.order((total_time.asc(), recipes::id.asc())),
            (SortKey::Time, SortDirection::Desc) => {
                q.order((total_time.desc(), recipes::id.asc()))
            }
            (SortKey::Created, SortDirection::Asc) => {
                q.order((recipes::created_at.asc(), recipes::id.asc()))
            }
            (SortKey::Created, SortDirection::Desc) => {
                q.order((recipes::created_at.desc(), recipes::id.asc()))
            }
        };

        // COUNT(*) OVER() carries the size of the whole scoped set on every row
        let per_page = i64::from(search.page.per_page);
        let offset = i64::try_from(search.page.offset()).unwrap_or(i64::MAX);
        let rows: Vec<(RecipeRow, i64)> = query("search_recipes", || {
            q.select((RecipeRow::as_select(), sql::<BigInt>("COUNT(*) OVER()")))
                .limit(per_page)
                .offset(offset)
                .load(self.conn)
        })?;

        let total = match rows.first() {
            Some((_, total)) => *total,
            // Past the last page no row carries the total
            None if search.page.page > 1 => query("count_recipes", || {
                scoped_recipes(&search.scope)
                    .count()
                    .get_result(self.conn)
            })?,
            None => 0,
        };

        let items = into_recipes(rows.into_iter().map(|(row, _)| row).collect())?;
        Ok(PageResult::from_page(
            items,
            u64::try_from(total).unwrap_or(0),
            search.page,
        ))
    }

    fn get_recipe(&mut self, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        let row = query("get_recipe", || {
            recipes::table
                .find(id)
                .select(RecipeRow::as_select())
                .first(self.conn)
                .optional()
        })?;
        row.map(RecipeRow::into_recipe).transpose()
    }

    fn find_ingredients_by_ids(&mut self, ids: &[Uuid]) -> Result<Vec<Ingredient>, StoreError> {
        let rows = query("find_ingredients_by_ids", || {
            ingredients::table
                .filter(ingredients::id.eq_any(ids))
                .select(IngredientRow::as_select())
                .order(ingredients::id.asc())
                .load(self.conn)
        })?;
        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    fn list_ingredients(&mut self) -> Result<Vec<Ingredient>, StoreError> {
        let rows = query("list_ingredients", || {
            ingredients::table
                .select(IngredientRow::as_select())
                .order(ingredients::name.asc())
                .load(self.conn)
        })?;
        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    fn lines_for_recipes(
        &mut self,
        recipe_ids: &[Uuid],
    ) -> Result<Vec<RecipeIngredientLine>, StoreError> {
        let rows = query("lines_for_recipes", || {
            recipe_ingredients::table
                .filter(recipe_ingredients::recipe_id.eq_any(recipe_ids))
                .select(LineRow::as_select())
                .order((
                    recipe_ingredients::recipe_id.asc(),
                    recipe_ingredients::ingredient_id.asc(),
                ))
                .load(self.conn)
        })?;
        Ok(rows.into_iter().map(RecipeIngredientLine::from).collect())
    }

    fn recipe_ids_using_ingredient(
        &mut self,
        ingredient_id: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        query("recipe_ids_using_ingredient", || {
            recipe_ingredients::table
                .filter(recipe_ingredients::ingredient_id.eq(ingredient_id))
                .select(recipe_ingredients::recipe_id)
                .order(recipe_ingredients::recipe_id.asc())
                .load(self.conn)
        })
    }

    fn ratings_for_recipe(&mut self, recipe_id: Uuid) -> Result<Vec<Rating>, StoreError> {
        let rows = query("ratings_for_recipe", || {
            ratings::table
                .filter(ratings::recipe_id.eq(recipe_id))
                .select(RatingRow::as_select())
                .order((ratings::created_at.asc(), ratings::id.asc()))
                .load(self.conn)
        })?;
        Ok(rows.into_iter().map(Rating::from).collect())
    }

    fn find_rating(
        &mut self,
        recipe_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Rating>, StoreError> {
        let row = query("find_rating", || {
            ratings::table
                .filter(ratings::recipe_id.eq(recipe_id))
                .filter(ratings::user_id.eq(user_id))
                .select(RatingRow::as_select())
                .first(self.conn)
                .optional()
        })?;
        Ok(row.map(Rating::from))
    }

    fn get_category(&mut self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let row = query("get_category", || {
            categories::table
                .find(id)
                .select(CategoryRow::as_select())
                .first(self.conn)
                .optional()
        })?;
        Ok(row.map(Category::from))
    }

    fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let rows = query("list_categories", || {
            categories::table
                .select(CategoryRow::as_select())
                .order(categories::name.asc())
                .load(self.conn)
        })?;
        Ok(rows.into_iter().map(Category::from).collect())
    }
}

impl CatalogWriter for PgRepo<'_> {
    fn lock_recipe(&mut self, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        let row = query("lock_recipe", || {
            recipes::table
                .find(id)
                .select(RecipeRow::as_select())
                .for_update()
                .first(self.conn)
                .optional()
        })?;
        row.map(RecipeRow::into_recipe).transpose()
    }

    fn lock_ingredients(&mut self, ids: &[Uuid]) -> Result<Vec<Ingredient>, StoreError> {
        // Shared locks in id order: concurrent cost refreshes don't block each
        // other, a price change waits for them and they wait for it.
        let rows = query("lock_ingredients", || {
            ingredients::table
                .filter(ingredients::id.eq_any(ids))
                .select(IngredientRow::as_select())
                .order(ingredients::id.asc())
                .for_share()
                .load(self.conn)
        })?;
        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    fn insert_recipe(&mut self, recipe: &Recipe) -> Result<(), StoreError> {
        query("insert_recipe", || {
            diesel::insert_into(recipes::table)
                .values(RecipeRow::from(recipe))
                .execute(self.conn)
        })?;
        Ok(())
    }

    fn update_recipe(&mut self, recipe: &Recipe) -> Result<(), StoreError> {
        query("update_recipe", || {
            diesel::update(recipes::table.find(recipe.id))
                .set(RecipeDetailsChangeset::from(recipe))
                .execute(self.conn)
        })?;
        Ok(())
    }

    fn delete_recipe(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let deleted = query("delete_recipe", || {
            diesel::delete(recipes::table.find(id)).execute(self.conn)
        })?;
        Ok(deleted > 0)
    }

    fn replace_lines(
        &mut self,
        recipe_id: Uuid,
        lines: &[RecipeIngredientLine],
    ) -> Result<(), StoreError> {
        query("delete_lines", || {
            diesel::delete(
                recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)),
            )
            .execute(self.conn)
        })?;
        if lines.is_empty() {
            return Ok(());
        }

        let rows: Vec<LineRow> = lines.iter().map(LineRow::from).collect();
        query("insert_lines", || {
            diesel::insert_into(recipe_ingredients::table)
                .values(&rows)
                .execute(self.conn)
        })?;
        Ok(())
    }

    fn set_cached_cost(
        &mut self,
        id: Uuid,
        cost_cents: i64,
    ) -> Result<Option<Recipe>, StoreError> {
        let row = query("set_cached_cost", || {
            diesel::update(recipes::table.find(id))
                .set(recipes::estimated_cost_cents.eq(cost_cents))
                .returning(RecipeRow::as_returning())
                .get_result(self.conn)
                .optional()
        })?;
        row.map(RecipeRow::into_recipe).transpose()
    }

    fn set_cached_rating(
        &mut self,
        id: Uuid,
        summary: &RatingSummary,
    ) -> Result<Option<Recipe>, StoreError> {
        let row = query("set_cached_rating", || {
            diesel::update(recipes::table.find(id))
                .set((
                    recipes::average_rating.eq(summary.average),
                    recipes::ratings_count.eq(summary.count),
                ))
                .returning(RecipeRow::as_returning())
                .get_result(self.conn)
                .optional()
        })?;
        row.map(RecipeRow::into_recipe).transpose()
    }

    fn insert_rating(&mut self, rating: &Rating) -> Result<(), StoreError> {
        query("insert_rating", || {
            diesel::insert_into(ratings::table)
                .values(RatingRow::from(rating))
                .execute(self.conn)
        })?;
        Ok(())
    }

    fn update_rating(&mut self, rating: &Rating) -> Result<(), StoreError> {
        query("update_rating", || {
            diesel::update(ratings::table.find(rating.id))
                .set((
                    ratings::score.eq(rating.score),
                    ratings::review.eq(rating.review.as_deref()),
                    ratings::updated_at.eq(rating.updated_at),
                ))
                .execute(self.conn)
        })?;
        Ok(())
    }

    fn delete_rating(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let deleted = query("delete_rating", || {
            diesel::delete(ratings::table.find(id)).execute(self.conn)
        })?;
        Ok(deleted > 0)
    }

    fn insert_ingredient(&mut self, ingredient: &Ingredient) -> Result<(), StoreError> {
        query("insert_ingredient", || {
            diesel::insert_into(ingredients::table)
                .values(IngredientRow::from(ingredient))
                .execute(self.conn)
        })?;
        Ok(())
    }

    fn set_ingredient_price(
        &mut self,
        id: Uuid,
        unit_price_cents: i64,
    ) -> Result<Option<Ingredient>, StoreError> {
        let row = query("set_ingredient_price", || {
            diesel::update(ingredients::table.find(id))
                .set((
                    ingredients::unit_price_cents.eq(unit_price_cents),
                    ingredients::updated_at.eq(chrono::Utc::now()),
                ))
                .returning(IngredientRow::as_returning())
                .get_result(self.conn)
                .optional()
        })?;
        Ok(row.map(Ingredient::from))
    }

    fn insert_category(&mut self, category: &Category) -> Result<(), StoreError> {
        query("insert_category", || {
            diesel::insert_into(categories::table)
                .values(CategoryRow::from(category))
                .execute(self.conn)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::{
        refresh_cost, Catalog, Difficulty, NewCategory, NewIngredient, NewIngredientLine,
        NewRecipe, SearchCriteria,
    };
    use rust_decimal_macros::dec;

    /// A migrated store when TEST_DATABASE_URL names a scratch database.
    /// Tests that need one pass quietly without it.
    fn test_catalog() -> Option<Catalog<PgStore>> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = crate::db::create_pool(&url).unwrap();
        Some(Catalog::new(PgStore::new(pool)))
    }

    fn ingredient(catalog: &Catalog<PgStore>, name: &str, price: i64) -> Ingredient {
        catalog
            .create_ingredient(&NewIngredient {
                name: format!("{name} {}", Uuid::now_v7()),
                unit_price_cents: price,
                default_unit: "g".to_string(),
            })
            .unwrap()
    }

    fn new_recipe(title: &str, cook_time_minutes: i32) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            description: None,
            instructions: "Simmer.".to_string(),
            prep_time_minutes: 0,
            cook_time_minutes,
            servings: 2,
            difficulty: Difficulty::Easy,
            category_id: None,
            ingredients: vec![],
        }
    }

    #[test]
    fn test_search_pages_in_the_database() {
        let Some(catalog) = test_catalog() else {
            return;
        };
        let category = catalog
            .create_category(&NewCategory {
                name: format!("Stews {}", Uuid::now_v7()),
            })
            .unwrap();

        let mut by_time = Vec::new();
        for minutes in [40, 10, 30, 20, 50] {
            let recipe = catalog
                .create_recipe(&NewRecipe {
                    category_id: Some(category.id),
                    ..new_recipe(&format!("Stew {minutes}"), minutes)
                })
                .unwrap()
                .recipe;
            by_time.push((minutes, recipe.id));
        }
        by_time.sort();

        let criteria = |page| SearchCriteria {
            category_id: Some(category.id),
            sort: Some("time".to_string()),
            direction: Some("asc".to_string()),
            page: Some(page),
            per_page: Some(2),
            ..Default::default()
        };

        let second = catalog.search(&criteria(2)).unwrap();
        let ids: Vec<Uuid> = second.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![by_time[2].1, by_time[3].1]);
        assert_eq!(second.total_count, 5);
        assert_eq!(second.total_pages, 3);

        let past_end = catalog.search(&criteria(9)).unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_count, 5);
    }

    #[test]
    fn test_read_sees_one_snapshot() {
        let Some(catalog) = test_catalog() else {
            return;
        };
        let salt = ingredient(&catalog, "salt", 100);

        let seen = catalog
            .store()
            .read(|r| {
                let before = r.find_ingredients_by_ids(&[salt.id])?;
                // Commits on another pooled connection
                catalog.update_ingredient_price(salt.id, 250)?;
                let after = r.find_ingredients_by_ids(&[salt.id])?;
                Ok((before[0].unit_price_cents, after[0].unit_price_cents))
            })
            .unwrap();

        assert_eq!(seen, (100, 100));
        let stored = catalog
            .store()
            .read(|r| Ok(r.find_ingredients_by_ids(&[salt.id])?))
            .unwrap();
        assert_eq!(stored[0].unit_price_cents, 250);
    }

    #[test]
    fn test_cost_refresh_holds_off_price_changes() {
        let Some(catalog) = test_catalog() else {
            return;
        };
        let flour = ingredient(&catalog, "flour", 40);
        let bread = catalog
            .create_recipe(&NewRecipe {
                ingredients: vec![NewIngredientLine {
                    ingredient_id: flour.id,
                    quantity: dec!(2),
                    unit: None,
                    optional: false,
                    notes: None,
                }],
                ..new_recipe("Bread", 45)
            })
            .unwrap()
            .recipe;

        let attempt = catalog
            .store()
            .transaction(|txn| {
                refresh_cost(txn, bread.id)?;

                let mut other = catalog.store().connection()?;
                Ok(other.transaction::<_, DieselError, _>(|conn| {
                    diesel::sql_query("SET LOCAL lock_timeout = '200ms'").execute(conn)?;
                    diesel::update(ingredients::table.find(flour.id))
                        .set(ingredients::unit_price_cents.eq(90))
                        .execute(conn)
                }))
            })
            .unwrap();
        assert!(attempt.is_err());

        catalog.update_ingredient_price(flour.id, 90).unwrap();
        let detail = catalog.get_recipe(bread.id).unwrap();
        assert_eq!(detail.recipe.estimated_cost_cents, 180);
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("soup"), "%soup%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }
}
