use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{CreateShopRequest, Shop, ShopQuery, UpdateShopRequest, User},
    utils::pagination::Paginated,
};

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Shop>> {
    let shop =
        sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE id = $1 AND delete_at IS NULL")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(shop)
}

pub async fn find_by_owner(pool: &PgPool, owner_id: i32) -> Result<Option<Shop>> {
    let shop = sqlx::query_as::<_, Shop>(
        "SELECT * FROM shops WHERE owner_id = $1 AND delete_at IS NULL",
    )
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    Ok(shop)
}

pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Shop>> {
    let shop =
        sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE name = $1 AND delete_at IS NULL")
            .bind(name)
            .fetch_optional(pool)
            .await?;

    Ok(shop)
}

fn push_shop_filters(query: &mut QueryBuilder<'_, Postgres>, params: &ShopQuery) {
    query.push(" WHERE delete_at IS NULL");

    if let Some(ref search) = params.search {
        query.push(" AND name ILIKE ");
        query.push_bind(format!("%{}%", search));
    }
}

pub async fn find_paginated(pool: &PgPool, params: &ShopQuery) -> Result<Paginated<Shop>> {
    let page = params.page();

    let mut count_query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM shops");
    push_shop_filters(&mut count_query, params);
    let total = count_query
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM shops");
    push_shop_filters(&mut query, params);
    query.push(" ORDER BY create_at DESC LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.skip());

    let shops = query.build_query_as::<Shop>().fetch_all(pool).await?;

    Ok(Paginated::new(shops, total, page))
}

/// Creates the shop and promotes a customer owner to seller in one transaction.
pub async fn open_shop(
    pool: &PgPool,
    owner_id: i32,
    req: &CreateShopRequest,
) -> Result<(Shop, User)> {
    let mut tx = pool.begin().await?;

    let shop = sqlx::query_as::<_, Shop>(
        "INSERT INTO shops (owner_id, name, description, logo_url, address, phone)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(owner_id)
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(&req.logo_url)
    .bind(&req.address)
    .bind(&req.phone)
    .fetch_one(&mut *tx)
    .await?;

    let user = sqlx::query_as::<_, User>(
        "UPDATE users
         SET role = CASE WHEN role = 'customer' THEN 'seller'::user_role ELSE role END,
             update_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(owner_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((shop, user))
}

pub async fn update_shop(pool: &PgPool, id: i32, req: &UpdateShopRequest) -> Result<Option<Shop>> {
    let shop = sqlx::query_as::<_, Shop>(
        r#"
        UPDATE shops
        SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            logo_url = COALESCE($3, logo_url),
            address = COALESCE($4, address),
            phone = COALESCE($5, phone),
            update_at = NOW()
        WHERE id = $6 AND delete_at IS NULL
        RETURNING *
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(&req.logo_url)
    .bind(&req.address)
    .bind(&req.phone)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(shop)
}

/// Soft deletes the shop together with its products, vouchers and conversations.
pub async fn soft_delete_shop(pool: &PgPool, id: i32) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("UPDATE shops SET delete_at = NOW() WHERE id = $1 AND delete_at IS NULL")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    const CASCADE: [&str; 3] = [
        "UPDATE products SET delete_at = NOW() WHERE shop_id = $1 AND delete_at IS NULL",
        "UPDATE vouchers SET delete_at = NOW() WHERE shop_id = $1 AND delete_at IS NULL",
        "UPDATE conversations SET delete_at = NOW() WHERE shop_id = $1 AND delete_at IS NULL",
    ];

    for statement in CASCADE {
        sqlx::query(statement).bind(id).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(true)
}
