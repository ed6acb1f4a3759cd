pub mod categories;
pub mod ingredients;
pub mod ratings;
pub mod recipes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pantry_core::{CatalogError, Entity, StoreError};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{OpenApi, ToSchema};

use crate::identity::USER_ID_HEADER;

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Per-field messages for rejected input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: None,
        }
    }
}

/// Catalog failures rendered as HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub CatalogError);

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            CatalogError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Invalid request".to_string(),
                    fields: Some(errors.fields().clone()),
                },
            ),
            CatalogError::NotFound { entity, .. } => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new(format!("{} not found", entity_label(entity))),
            ),
            CatalogError::Store(StoreError::Conflict(constraint)) => {
                tracing::info!("Rejected write violating {}", constraint);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("Conflicts with an existing record"),
                )
            }
            err @ (CatalogError::Consistency(_) | CatalogError::Store(StoreError::Backend(_))) => {
                tracing::error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn entity_label(entity: Entity) -> &'static str {
    match entity {
        Entity::Recipe => "Recipe",
        Entity::Ingredient => "Ingredient",
        Entity::Category => "Category",
        Entity::Rating => "Rating",
    }
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    #[derive(OpenApi)]
    #[openapi(
        info(title = "pantry", description = "Recipe catalog with ingredient and budget matching"),
        components(schemas(ErrorResponse))
    )]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "user_id",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_ID_HEADER))),
        );
    }

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        recipes::ApiDoc::openapi(),
        ratings::ApiDoc::openapi(),
        ingredients::ApiDoc::openapi(),
        categories::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_is_bad_request_with_fields() {
        let response =
            ApiError(CatalogError::invalid("budget_cents", "must be greater than 0")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["fields"]["budget_cents"], "must be greater than 0");
    }

    #[tokio::test]
    async fn test_not_found_names_the_entity() {
        let response =
            ApiError(CatalogError::not_found(Entity::Recipe, Uuid::now_v7())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Recipe not found");
        assert!(body.get("fields").is_none());
    }

    #[test]
    fn test_conflict() {
        let err = CatalogError::Store(StoreError::Conflict("ingredients_name_key".to_string()));
        assert_eq!(ApiError(err).into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let err = CatalogError::Store(StoreError::Backend(
            "relation \"recipes\" does not exist".to_string(),
        ));
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");

        let response = ApiError(CatalogError::Consistency("recipe vanished".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_openapi_lists_search_paths() {
        let spec = openapi();
        for path in [
            "/api/recipes",
            "/api/recipes/by-ingredients",
            "/api/recipes/by-budget",
            "/api/recipes/{id}/recalculate",
            "/api/recipes/{id}/ratings",
            "/api/ingredients/{id}/price",
            "/api/categories",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
