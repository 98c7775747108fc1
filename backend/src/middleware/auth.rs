//! Authentication middleware
//!
//! Identity is issued elsewhere. This layer only verifies the bearer token and
//! exposes the acting user id to handlers.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ErrorDetail, ErrorResponse};
use crate::AppState;

/// Authenticated user extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// JWT claims structure
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: i64,
}

/// Validates the bearer token and stores the [`AuthUser`] in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let claims = match decode_jwt(token, &state.config.auth.jwt_secret) {
        Ok(claims) => claims,
        Err(msg) => return unauthorized_response(&msg),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    request.extensions_mut().insert(AuthUser { user_id });

    next.run(request).await
}

fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail::new("UNAUTHORIZED", message),
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for the authenticated user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.user_id
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail::new("UNAUTHORIZED", "Authentication required"),
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}
