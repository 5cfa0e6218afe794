use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{
        Category, CategoryQuery, CategoryTree, CategoryWithChildren, CreateCategoryRequest,
        UpdateCategoryRequest,
    },
    utils::pagination::Paginated,
};

/// Find live category by ID
pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE id = $1 AND delete_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(category)
}

/// Find live category by exact name
pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE name = $1 AND delete_at IS NULL",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(category)
}

/// Get all live categories (flat list)
pub async fn get_all(pool: &PgPool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE delete_at IS NULL ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

fn push_category_filters(query: &mut QueryBuilder<'_, Postgres>, params: &CategoryQuery) {
    query.push(" WHERE delete_at IS NULL");

    if let Some(ref search) = params.search {
        query.push(" AND name ILIKE ");
        query.push_bind(format!("%{}%", search));
    }
}

/// Paginated listing with optional name search
pub async fn find_paginated(pool: &PgPool, params: &CategoryQuery) -> Result<Paginated<Category>> {
    let page = params.page();

    let mut count_query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM categories");
    push_category_filters(&mut count_query, params);
    let total = count_query
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM categories");
    push_category_filters(&mut query, params);
    query.push(" ORDER BY name ASC LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.skip());

    let categories = query.build_query_as::<Category>().fetch_all(pool).await?;

    Ok(Paginated::new(categories, total, page))
}

/// Get category tree (hierarchical structure)
pub async fn get_category_tree(pool: &PgPool) -> Result<CategoryTree> {
    let categories = get_all(pool).await?;
    Ok(build_tree(categories))
}

/// Children whose parent was removed are promoted to roots.
pub fn build_tree(categories: Vec<Category>) -> CategoryTree {
    let live_ids: std::collections::HashSet<i32> = categories.iter().map(|c| c.id).collect();

    let mut children_map: HashMap<Option<i32>, Vec<Category>> = HashMap::new();
    for category in categories {
        let parent = category.parent_id.filter(|id| live_ids.contains(id));
        children_map.entry(parent).or_default().push(category);
    }

    fn build(
        parent_id: Option<i32>,
        children_map: &HashMap<Option<i32>, Vec<Category>>,
    ) -> Vec<CategoryWithChildren> {
        children_map
            .get(&parent_id)
            .map(|categories| {
                categories
                    .iter()
                    .map(|cat| CategoryWithChildren {
                        children: build(Some(cat.id), children_map),
                        category: cat.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    CategoryTree {
        categories: build(None, &children_map),
    }
}

/// True when making `parent_id` the parent of `id` would close a loop,
/// i.e. `id` is `parent_id` itself or one of its ancestors.
pub fn would_create_cycle(id: i32, parent_id: i32, categories: &[Category]) -> bool {
    let parents: HashMap<i32, Option<i32>> =
        categories.iter().map(|c| (c.id, c.parent_id)).collect();

    let mut seen = std::collections::HashSet::new();
    let mut current = Some(parent_id);

    while let Some(cursor) = current {
        if cursor == id || !seen.insert(cursor) {
            return true;
        }
        current = parents.get(&cursor).copied().flatten();
    }

    false
}

/// Create a new category
pub async fn create_category(pool: &PgPool, req: &CreateCategoryRequest) -> Result<Category> {
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (parent_id, name, description, image_url)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(req.parent_id)
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(&req.image_url)
    .fetch_one(pool)
    .await?;

    Ok(category)
}

/// Update an existing category
pub async fn update_category(
    pool: &PgPool,
    id: i32,
    req: UpdateCategoryRequest,
) -> Result<Option<Category>> {
    let mut query_builder = QueryBuilder::<Postgres>::new("UPDATE categories SET ");
    let mut fields = query_builder.separated(", ");
    let mut has_fields = false;

    if let Some(parent_id) = req.parent_id {
        fields.push("parent_id = ");
        fields.push_bind_unseparated(parent_id);
        has_fields = true;
    }

    if let Some(name) = req.name {
        fields.push("name = ");
        fields.push_bind_unseparated(name.trim().to_string());
        has_fields = true;
    }

    if let Some(description) = req.description {
        fields.push("description = ");
        fields.push_bind_unseparated(description);
        has_fields = true;
    }

    if let Some(image_url) = req.image_url {
        fields.push("image_url = ");
        fields.push_bind_unseparated(image_url);
        has_fields = true;
    }

    if !has_fields {
        // No fields to update, return existing category
        return find_by_id(pool, id).await;
    }

    fields.push("update_at = NOW()");
    query_builder.push(" WHERE id = ");
    query_builder.push_bind(id);
    query_builder.push(" AND delete_at IS NULL RETURNING *");

    let category = query_builder
        .build_query_as::<Category>()
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

/// Soft delete a category
pub async fn soft_delete_category(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE categories SET delete_at = NOW() WHERE id = $1 AND delete_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(id: i32, parent_id: Option<i32>) -> Category {
        let now = Utc::now();
        Category {
            id,
            parent_id,
            name: format!("cat-{}", id),
            description: None,
            image_url: None,
            create_at: now,
            update_at: now,
            delete_at: None,
        }
    }

    #[test]
    fn tree_nests_children_under_parents() {
        let tree = build_tree(vec![
            category(1, None),
            category(2, Some(1)),
            category(3, Some(2)),
            category(4, None),
        ]);

        assert_eq!(tree.categories.len(), 2);
        let root = &tree.categories[0];
        assert_eq!(root.category.id, 1);
        assert_eq!(root.children[0].category.id, 2);
        assert_eq!(root.children[0].children[0].category.id, 3);
    }

    #[test]
    fn reparenting_under_a_descendant_is_a_cycle() {
        let categories = vec![category(1, None), category(2, Some(1)), category(3, Some(2))];

        assert!(would_create_cycle(1, 1, &categories));
        assert!(would_create_cycle(1, 2, &categories));
        assert!(would_create_cycle(1, 3, &categories));
        assert!(!would_create_cycle(3, 1, &categories));
        assert!(!would_create_cycle(2, 1, &categories));
    }

    #[test]
    fn moving_to_an_unrelated_branch_is_allowed() {
        let categories = vec![category(1, None), category(2, Some(1)), category(4, None)];

        assert!(!would_create_cycle(2, 4, &categories));
        assert!(!would_create_cycle(4, 2, &categories));
    }

    #[test]
    fn orphans_become_roots() {
        let tree = build_tree(vec![category(5, Some(99)), category(6, None)]);
        let ids: Vec<i32> = tree.categories.iter().map(|c| c.category.id).collect();

        assert_eq!(ids, vec![5, 6]);
    }
}
