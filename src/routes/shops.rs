use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{CreateShopRequest, OpenShopResponse, Shop, ShopQuery, UpdateShopRequest},
    queries::shop_queries,
    utils::{
        extractors::extract_user_id,
        jwt::{self, Claims},
        pagination::Paginated,
    },
};

/// The caller's live shop, or `Forbidden` for accounts without one.
pub(crate) async fn require_own_shop(state: &AppState, claims: &Claims) -> Result<Shop> {
    let user_id = extract_user_id(claims)?;

    shop_queries::find_by_owner(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("You do not own a shop".to_string()))
}

pub async fn open_shop(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateShopRequest>,
) -> Result<Json<OpenShopResponse>> {
    let user_id = extract_user_id(&claims)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Shop name is required".to_string()));
    }

    if shop_queries::find_by_owner(&state.db, user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("You already own a shop".to_string()));
    }

    if shop_queries::find_by_name(&state.db, payload.name.trim())
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "Shop with name '{}' already exists",
            payload.name.trim()
        )));
    }

    let (shop, user) = shop_queries::open_shop(&state.db, user_id, &payload).await?;

    tracing::info!("User {} opened shop {}", user.id, shop.id);

    let token = jwt::generate_token(
        &state.jwt_secret,
        state.token_expiry_days,
        user.id,
        &user.email,
        &user.name,
        user.role,
    )?;

    Ok(Json(OpenShopResponse { shop, token }))
}

pub async fn get_shops(
    State(state): State<AppState>,
    Query(params): Query<ShopQuery>,
) -> Result<Json<Paginated<Shop>>> {
    let shops = shop_queries::find_paginated(&state.db, &params).await?;
    Ok(Json(shops))
}

pub async fn get_shop(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Shop>> {
    let shop = shop_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Shop with id {} not found", id)))?;

    Ok(Json(shop))
}

pub async fn get_my_shop(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Shop>> {
    let user_id = extract_user_id(&claims)?;

    let shop = shop_queries::find_by_owner(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".to_string()))?;

    Ok(Json(shop))
}

pub async fn update_my_shop(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateShopRequest>,
) -> Result<Json<Shop>> {
    let shop = require_own_shop(&state, &claims).await?;

    if let Some(ref name) = payload.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Shop name is required".to_string()));
        }

        if let Some(existing) = shop_queries::find_by_name(&state.db, name).await? {
            if existing.id != shop.id {
                return Err(AppError::Conflict(format!(
                    "Another shop with name '{}' already exists",
                    name
                )));
            }
        }
    }

    let shop = shop_queries::update_shop(&state.db, shop.id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".to_string()))?;

    Ok(Json(shop))
}
