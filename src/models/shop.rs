use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::pagination::Page;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shop {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub delete_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateShopRequest {
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateShopRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// A freshly opened shop plus a token that already carries the seller role.
#[derive(Debug, Serialize)]
pub struct OpenShopResponse {
    pub shop: Shop,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ShopQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}
