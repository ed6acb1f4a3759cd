use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Field name -> message map describing why a request was rejected.
///
/// Only the first message recorded for a field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<(), CatalogError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field} {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Failure reported by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("{0}")]
    Backend(String),
}

/// Kind of row a not-found error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Recipe,
    Ingredient,
    Category,
    /// A user's rating, identified by the recipe it belongs to
    Rating,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Recipe => "recipe",
            Entity::Ingredient => "ingredient",
            Entity::Category => "category",
            Entity::Rating => "rating on recipe",
        })
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid request: {0}")]
    Validation(FieldErrors),

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: Uuid },

    #[error("aggregate recomputation failed: {0}")]
    Consistency(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn not_found(entity: Entity, id: Uuid) -> Self {
        CatalogError::NotFound { entity, id }
    }

    /// Shorthand for a validation error on a single field.
    pub fn invalid(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        CatalogError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("per_page", "must be between 1 and 100");
        errors.add("per_page", "is not a number");
        assert_eq!(errors.get("per_page"), Some("must be between 1 and 100"));
    }

    #[test]
    fn test_empty_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_display_joins_fields_in_order() {
        let mut errors = FieldErrors::new();
        errors.add("sort", "is not a known sort key");
        errors.add("max_cost", "must be greater than 0");
        assert_eq!(
            errors.to_string(),
            "max_cost must be greater than 0; sort is not a known sort key"
        );
    }

    #[test]
    fn test_not_found_message() {
        let id = Uuid::nil();
        let err = CatalogError::not_found(Entity::Rating, id);
        assert_eq!(
            err.to_string(),
            format!("rating on recipe {id} not found")
        );
    }
}
