use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::{
    AppState,
    error::AppError,
    models::UserRole,
    utils::jwt::{self, Claims},
};

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

// Browsers cannot set headers on a WebSocket handshake, so the token may
// also arrive as `?access_token=`.
fn bearer_claims(state: &AppState, req: &Request) -> Result<Claims, AppError> {
    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let token = match header {
        Some(auth_header) => auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid token format".to_string()))?
            .to_string(),
        None => Query::<TokenQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(q)| q.access_token)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?,
    };

    jwt::verify_token(&state.jwt_secret, &token)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = bearer_claims(&state, &req)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

pub async fn seller_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = bearer_claims(&state, &req)?;

    if !matches!(claims.role, UserRole::Seller | UserRole::Admin) {
        return Err(AppError::Forbidden("Seller access required".to_string()));
    }

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

pub async fn admin_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = bearer_claims(&state, &req)?;

    if claims.role != UserRole::Admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
