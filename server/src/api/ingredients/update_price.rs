use crate::api::{ApiError, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use pantry_core::Ingredient;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePriceRequest {
    pub unit_price_cents: i64,
}

/// Reprice an ingredient. Every recipe using it gets its cost re-derived in
/// the same transaction.
#[utoipa::path(
    put,
    path = "/api/ingredients/{id}/price",
    tag = "ingredients",
    params(
        ("id" = Uuid, Path, description = "Ingredient ID")
    ),
    request_body = UpdatePriceRequest,
    responses(
        (status = 200, description = "Ingredient repriced", body = Ingredient),
        (status = 400, description = "Negative price", body = ErrorResponse),
        (status = 404, description = "Ingredient not found", body = ErrorResponse)
    )
)]
pub async fn update_price(
    State(catalog): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePriceRequest>,
) -> Result<Json<Ingredient>, ApiError> {
    Ok(Json(
        catalog.update_ingredient_price(id, request.unit_price_cents)?,
    ))
}
