use crate::error::{CatalogError, FieldErrors};
use crate::page::MAX_PER_PAGE;

/// Defaults applied when a request leaves a knob unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSettings {
    pub default_per_page: u32,
    /// Minimum match percentage for ingredient searches
    pub default_match_threshold: u8,
    /// Serving count budget searches scale to
    pub default_servings: i32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            default_match_threshold: 70,
            default_servings: 4,
        }
    }
}

impl CatalogSettings {
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut errors = FieldErrors::new();
        if !(1..=MAX_PER_PAGE).contains(&self.default_per_page) {
            errors.add(
                "default_per_page",
                format!("must be between 1 and {MAX_PER_PAGE}"),
            );
        }
        if !(1..=100).contains(&self.default_match_threshold) {
            errors.add("default_match_threshold", "must be between 1 and 100");
        }
        if self.default_servings < 1 {
            errors.add("default_servings", "must be at least 1");
        }
        errors.into_result()
    }
}
