use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{CreateProductRequest, Product, ProductQuery, SortBy, UpdateProductRequest},
    utils::pagination::Paginated,
};

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = $1 AND delete_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(product)
}

/// Live products keyed by id; missing ids are simply absent.
pub async fn find_by_ids(pool: &PgPool, ids: &[i32]) -> Result<HashMap<i32, Product>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = ANY($1) AND delete_at IS NULL",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

fn push_product_filters(query: &mut QueryBuilder<'_, Postgres>, params: &ProductQuery) {
    query.push(" WHERE delete_at IS NULL");

    if let Some(ref search) = params.search {
        query.push(" AND name ILIKE ");
        query.push_bind(format!("%{}%", search));
    }

    if let Some(category_id) = params.category_id {
        query.push(" AND category_id = ");
        query.push_bind(category_id);
    }

    if let Some(shop_id) = params.shop_id {
        query.push(" AND shop_id = ");
        query.push_bind(shop_id);
    }

    if let Some(min_price) = params.min_price {
        query.push(" AND price >= ");
        query.push_bind(min_price);
    }

    if let Some(max_price) = params.max_price {
        query.push(" AND price <= ");
        query.push_bind(max_price);
    }
}

fn order_clause(sort: Option<SortBy>) -> &'static str {
    match sort.unwrap_or_default() {
        SortBy::Newest => " ORDER BY create_at DESC, id DESC",
        SortBy::PriceAsc => " ORDER BY price ASC, id ASC",
        SortBy::PriceDesc => " ORDER BY price DESC, id ASC",
        SortBy::BestSelling => " ORDER BY sold DESC, id ASC",
    }
}

pub async fn search_products(pool: &PgPool, params: &ProductQuery) -> Result<Paginated<Product>> {
    let page = params.page();

    let mut count_query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM products");
    push_product_filters(&mut count_query, params);
    let total = count_query
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM products");
    push_product_filters(&mut query, params);
    query.push(order_clause(params.sort));
    query.push(" LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.skip());

    let products = query.build_query_as::<Product>().fetch_all(pool).await?;

    Ok(Paginated::new(products, total, page))
}

pub async fn create_product(
    pool: &PgPool,
    shop_id: i32,
    req: &CreateProductRequest,
) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (shop_id, category_id, name, description, price, stock, images)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(req.category_id)
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(req.price)
    .bind(req.stock)
    .bind(&req.images)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

pub async fn update_product(
    pool: &PgPool,
    id: i32,
    shop_id: i32,
    req: &UpdateProductRequest,
) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET
            category_id = COALESCE($1, category_id),
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            stock = COALESCE($5, stock),
            images = COALESCE($6, images),
            update_at = NOW()
        WHERE id = $7 AND shop_id = $8 AND delete_at IS NULL
        RETURNING *
        "#,
    )
    .bind(req.category_id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(req.price)
    .bind(req.stock)
    .bind(&req.images)
    .bind(id)
    .bind(shop_id)
    .fetch_optional(pool)
    .await?;

    Ok(product)
}

pub async fn soft_delete_product(pool: &PgPool, id: i32, shop_id: i32) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE products SET delete_at = NOW()
         WHERE id = $1 AND shop_id = $2 AND delete_at IS NULL",
    )
    .bind(id)
    .bind(shop_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
