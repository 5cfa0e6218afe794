use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::pagination::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Confirmed,
    Shipping,
    Delivered,
    Cancelled,
}

impl InvoiceStatus {
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Shipping)
                | (Shipping, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    BankTransfer,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: i32,
    pub checkout_id: Uuid,
    pub user_id: i32,
    pub shop_id: i32,
    pub address_snapshot: serde_json::Value,
    pub payment_method: PaymentMethod,
    pub status: InvoiceStatus,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub shop_discount: Decimal,
    pub platform_discount: Decimal,
    pub total: Decimal,
    pub shop_voucher_id: Option<i32>,
    pub voucher_id: Option<i32>,
    pub create_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub delete_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InvoiceItem {
    pub id: i32,
    pub invoice_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub create_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CartItem {
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub address_id: i32,
    pub payment_method: PaymentMethod,
    pub items: Vec<CartItem>,
    pub voucher_code: Option<String>,
    /// Shop id to shop voucher code.
    #[serde(default)]
    pub shop_vouchers: BTreeMap<i32, String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_id: Uuid,
    pub invoices: Vec<InvoiceResponse>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceStatusRequest {
    pub status: InvoiceStatus,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub shop_id: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl InvoiceQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::InvoiceStatus::*;

    #[test]
    fn lifecycle_moves_forward_one_step() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Shipping));
        assert!(Shipping.can_transition_to(Delivered));
    }

    #[test]
    fn only_pending_or_confirmed_can_be_cancelled() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Shipping.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
    }

    #[test]
    fn no_skips_or_reversals() {
        assert!(!Pending.can_transition_to(Shipping));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }
}
