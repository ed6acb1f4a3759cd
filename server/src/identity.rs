use crate::api::ErrorResponse;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// The user a rating request acts for.
///
/// Authentication happens upstream; this service only trusts the
/// `X-User-Id` header the gateway forwards.
/// ```ignore
/// async fn my_handler(ActingUser(user_id): ActingUser) -> impl IntoResponse {
///     // user_id is the caller's UUID
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub Uuid);

#[derive(Debug, PartialEq, Eq)]
pub enum IdentityError {
    MissingHeader,
    InvalidHeader,
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let message = match self {
            IdentityError::MissingHeader => "Missing X-User-Id header",
            IdentityError::InvalidHeader => "X-User-Id must be a UUID",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(message)),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = IdentityError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(IdentityError::MissingHeader)?;

        let user_id = header
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or(IdentityError::InvalidHeader)?;

        Ok(ActingUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<ActingUser, IdentityError> {
        let mut builder = Request::builder().uri("/api/recipes/x/ratings");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ActingUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_reads_user_id_header() {
        let user_id = Uuid::now_v7();
        let user = extract(Some(&user_id.to_string())).await.unwrap();
        assert_eq!(user, ActingUser(user_id));
    }

    #[tokio::test]
    async fn test_missing_header() {
        assert_eq!(extract(None).await, Err(IdentityError::MissingHeader));
    }

    #[tokio::test]
    async fn test_malformed_header() {
        assert_eq!(
            extract(Some("not-a-uuid")).await,
            Err(IdentityError::InvalidHeader)
        );
    }

    #[test]
    fn test_rejection_is_unauthorized() {
        let response = IdentityError::MissingHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
