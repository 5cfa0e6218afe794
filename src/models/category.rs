use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::pagination::Page;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub delete_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CategoryWithChildren {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryWithChildren>,
}

#[derive(Debug, Serialize)]
pub struct CategoryTree {
    pub categories: Vec<CategoryWithChildren>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub parent_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub parent_id: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl CategoryQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}
