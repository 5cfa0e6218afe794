use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{Category, CategoryQuery, CategoryTree},
    queries::category_queries,
    utils::pagination::Paginated,
};

pub async fn get_categories(
    State(state): State<AppState>,
    Query(params): Query<CategoryQuery>,
) -> Result<Json<Paginated<Category>>> {
    let categories = category_queries::find_paginated(&state.db, &params).await?;
    Ok(Json(categories))
}

pub async fn get_category_tree(State(state): State<AppState>) -> Result<Json<CategoryTree>> {
    let tree = category_queries::get_category_tree(&state.db).await?;
    Ok(Json(tree))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Category>> {
    let category = category_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))?;

    Ok(Json(category))
}
