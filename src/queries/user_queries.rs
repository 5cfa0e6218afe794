use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{AdminUpdateUserRequest, UpdateProfileRequest, User, UserQuery},
    utils::pagination::Paginated,
};

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, name, password) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE email = $1 AND delete_at IS NULL",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<User>> {
    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND delete_at IS NULL")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(user)
}

pub async fn update_profile(
    pool: &PgPool,
    id: i32,
    req: &UpdateProfileRequest,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET
            name = COALESCE($1, name),
            phone = COALESCE($2, phone),
            avatar_url = COALESCE($3, avatar_url),
            update_at = NOW()
        WHERE id = $4 AND delete_at IS NULL
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&req.phone)
    .bind(&req.avatar_url)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn admin_update_user(
    pool: &PgPool,
    id: i32,
    req: &AdminUpdateUserRequest,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET
            name = COALESCE($1, name),
            phone = COALESCE($2, phone),
            role = COALESCE($3, role),
            update_at = NOW()
        WHERE id = $4 AND delete_at IS NULL
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&req.phone)
    .bind(req.role)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn soft_delete_user(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET delete_at = NOW() WHERE id = $1 AND delete_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn push_user_filters(query: &mut QueryBuilder<'_, Postgres>, params: &UserQuery) {
    query.push(" WHERE delete_at IS NULL");

    if let Some(ref search) = params.search {
        let pattern = format!("%{}%", search);
        query.push(" AND (name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR email ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    if let Some(role) = params.role {
        query.push(" AND role = ");
        query.push_bind(role);
    }
}

pub async fn search_users(pool: &PgPool, params: &UserQuery) -> Result<Paginated<User>> {
    let page = params.page();

    let mut count_query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM users");
    push_user_filters(&mut count_query, params);
    let total = count_query.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users");
    push_user_filters(&mut query, params);
    query.push(" ORDER BY create_at DESC LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.skip());

    let users = query.build_query_as::<User>().fetch_all(pool).await?;

    Ok(Paginated::new(users, total, page))
}
