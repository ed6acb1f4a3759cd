pub mod aggregates;
pub mod budget;
pub mod catalog;
pub mod cost;
pub mod error;
pub mod filter;
pub mod matching;
pub mod page;
pub mod rounding;
pub mod settings;
pub mod store;
pub mod types;

pub use aggregates::{refresh_cost, refresh_rating, RatingSummary};
pub use budget::{BudgetMatch, BudgetQuery, BudgetSearch};
pub use catalog::Catalog;
pub use error::{CatalogError, Entity, FieldErrors, StoreError};
pub use filter::{CatalogQuery, RecipeScope, SearchCriteria, SortDirection, SortKey};
pub use matching::{IngredientMatch, IngredientQuery, IngredientSearch};
pub use page::{PageRequest, PageResult, MAX_PER_PAGE};
pub use settings::CatalogSettings;
pub use store::{CatalogReader, CatalogStore, CatalogWriter, MemoryStore};
pub use types::{
    Category, Difficulty, Ingredient, LineDetail, NewCategory, NewIngredient, NewIngredientLine,
    NewRecipe, Rating, RatingInput, RatingOutcome, Recipe, RecipeChanges, RecipeDetail,
    RecipeIngredientLine,
};
