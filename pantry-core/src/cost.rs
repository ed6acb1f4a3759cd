//! Cost model: ingredient lines to a cost in minor currency units.
//!
//! Prices are read at computation time, never snapshotted on the line.

use crate::types::{Ingredient, RecipeIngredientLine};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// `floor(quantity * unit_price)`, saturating at `i64::MAX`.
pub fn line_cost(quantity: Decimal, unit_price_cents: i64) -> i64 {
    quantity
        .checked_mul(Decimal::from(unit_price_cents))
        .and_then(|cost| cost.floor().to_i64())
        .unwrap_or(i64::MAX)
}

/// Ingredient id -> unit price, for use with [`recipe_cost`].
pub fn price_index(ingredients: &[Ingredient]) -> HashMap<Uuid, i64> {
    ingredients
        .iter()
        .map(|ingredient| (ingredient.id, ingredient.unit_price_cents))
        .collect()
}

/// Sum of the line costs. A line whose ingredient is absent from `prices`
/// contributes nothing.
pub fn recipe_cost(lines: &[RecipeIngredientLine], prices: &HashMap<Uuid, i64>) -> i64 {
    lines.iter().fold(0i64, |total, line| {
        let cost = match prices.get(&line.ingredient_id) {
            Some(&price) => line_cost(line.quantity, price),
            None => {
                tracing::warn!(
                    recipe_id = %line.recipe_id,
                    ingredient_id = %line.ingredient_id,
                    "ingredient line points at a missing ingredient, counting it as zero cost"
                );
                0
            }
        };
        total.saturating_add(cost)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(recipe_id: Uuid, ingredient_id: Uuid, quantity: Decimal) -> RecipeIngredientLine {
        RecipeIngredientLine {
            recipe_id,
            ingredient_id,
            quantity,
            unit: "piece".to_string(),
            optional: false,
            notes: None,
        }
    }

    #[test]
    fn test_line_cost_floors() {
        assert_eq!(line_cost(dec!(2), 50), 100);
        assert_eq!(line_cost(dec!(1.5), 33), 49); // 49.5
        assert_eq!(line_cost(dec!(0.001), 999), 0);
        assert_eq!(line_cost(dec!(3), 0), 0);
    }

    #[test]
    fn test_line_cost_saturates() {
        assert_eq!(line_cost(dec!(1000000), i64::MAX), i64::MAX);
    }

    #[test]
    fn test_tomato_and_onion() {
        let recipe = Uuid::now_v7();
        let tomato = Uuid::now_v7();
        let onion = Uuid::now_v7();
        let prices = HashMap::from([(tomato, 50), (onion, 30)]);
        let lines = vec![line(recipe, tomato, dec!(2)), line(recipe, onion, dec!(1))];

        assert_eq!(recipe_cost(&lines, &prices), 130);
    }

    #[test]
    fn test_each_line_is_floored_before_summing() {
        let recipe = Uuid::now_v7();
        let salt = Uuid::now_v7();
        let pepper = Uuid::now_v7();
        let prices = HashMap::from([(salt, 3), (pepper, 3)]);
        let lines = vec![
            line(recipe, salt, dec!(0.5)),
            line(recipe, pepper, dec!(0.5)),
        ];

        // 1.5 + 1.5 floors to 1 + 1, not 3
        assert_eq!(recipe_cost(&lines, &prices), 2);
    }

    #[test]
    fn test_missing_ingredient_counts_as_zero() {
        let recipe = Uuid::now_v7();
        let tomato = Uuid::now_v7();
        let prices = HashMap::from([(tomato, 50)]);
        let lines = vec![
            line(recipe, tomato, dec!(2)),
            line(recipe, Uuid::now_v7(), dec!(7)),
        ];

        assert_eq!(recipe_cost(&lines, &prices), 100);
    }

    #[test]
    fn test_no_lines_costs_nothing() {
        assert_eq!(recipe_cost(&[], &HashMap::new()), 0);
    }
}
