use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{Product, ProductQuery},
    queries::product_queries,
    utils::pagination::Paginated,
};

pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> Result<Json<Paginated<Product>>> {
    if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
        if min > max {
            return Err(AppError::BadRequest(
                "min_price cannot exceed max_price".to_string(),
            ));
        }
    }

    let products = product_queries::search_products(&state.db, &params).await?;

    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>> {
    let product = product_queries::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(product))
}
