use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: i32,
    pub user_id: i32,
    pub full_name: String,
    pub phone: String,
    pub province: String,
    pub district: String,
    pub ward: String,
    pub street: String,
    pub is_default: bool,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub delete_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAddressRequest {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub ward: String,
    pub street: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAddressRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    pub street: Option<String>,
    pub is_default: Option<bool>,
}
