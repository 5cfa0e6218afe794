use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::{pagination::Page, serde_helpers::double_option};

/// Platform-wide when `shop_id` is `None`, otherwise a shop voucher.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Voucher {
    pub id: i32,
    pub shop_id: Option<i32>,
    pub code: String,
    pub description: Option<String>,
    pub discount_percent: i32,
    pub max_discount: Option<Decimal>,
    pub min_order_value: Decimal,
    pub quantity: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub delete_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVoucherRequest {
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_percent: i32,
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub min_order_value: Decimal,
    pub quantity: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVoucherRequest {
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_percent: Option<i32>,
    /// `null` removes the cap.
    #[serde(default, deserialize_with = "double_option")]
    pub max_discount: Option<Option<Decimal>>,
    pub min_order_value: Option<Decimal>,
    pub quantity: Option<i32>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AvailableVoucherQuery {
    pub shop_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CheckVoucherQuery {
    pub code: String,
    pub amount: Decimal,
    pub shop_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct VoucherCheckResponse {
    pub voucher: Voucher,
    pub discount: Decimal,
    pub amount_after_discount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct VoucherQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl VoucherQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn update_can_clear_the_cap() {
        let req: UpdateVoucherRequest = serde_json::from_str(r#"{"max_discount": null}"#).unwrap();
        assert_eq!(req.max_discount, Some(None));
    }

    #[test]
    fn update_without_cap_keeps_it() {
        let req: UpdateVoucherRequest = serde_json::from_str(r#"{"quantity": 3}"#).unwrap();
        assert_eq!(req.max_discount, None);
        assert_eq!(req.quantity, Some(3));
    }

    #[test]
    fn update_sets_a_new_cap() {
        let req: UpdateVoucherRequest = serde_json::from_str(r#"{"max_discount": "12.50"}"#).unwrap();
        assert_eq!(req.max_discount, Some(Some(dec!(12.50))));
    }
}
