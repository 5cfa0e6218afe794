use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    error::{AppError, Result},
    models::Voucher,
};

pub const GENERATED_CODE_LEN: usize = 8;
const MAX_CODE_LEN: usize = 32;

/// Rounds a money amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Discount for `amount` if the voucher can be used right now.
pub fn discount_for(voucher: &Voucher, amount: Decimal, now: DateTime<Utc>) -> Result<Decimal> {
    if voucher.delete_at.is_some() {
        return Err(AppError::BadRequest(format!(
            "Voucher {} is no longer available",
            voucher.code
        )));
    }

    if now < voucher.start_at {
        return Err(AppError::BadRequest(format!(
            "Voucher {} is not active yet",
            voucher.code
        )));
    }

    if now >= voucher.end_at {
        return Err(AppError::BadRequest(format!(
            "Voucher {} has expired",
            voucher.code
        )));
    }

    if voucher.quantity <= 0 {
        return Err(AppError::BadRequest(format!(
            "Voucher {} has been used up",
            voucher.code
        )));
    }

    if amount < voucher.min_order_value {
        return Err(AppError::BadRequest(format!(
            "Voucher {} requires a minimum order of {}",
            voucher.code, voucher.min_order_value
        )));
    }

    Ok(percent_discount(
        amount,
        voucher.discount_percent,
        voucher.max_discount,
    ))
}

pub fn percent_discount(amount: Decimal, percent: i32, cap: Option<Decimal>) -> Decimal {
    let raw = round_money(amount * Decimal::from(percent) / Decimal::from(100));
    let capped = match cap {
        Some(cap) => raw.min(cap),
        None => raw,
    };
    capped.min(amount).max(Decimal::ZERO)
}

pub fn normalize_code(code: &str) -> Result<String> {
    let code = code.trim().to_uppercase();

    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return Err(AppError::BadRequest(format!(
            "Voucher code must be 1 to {} characters",
            MAX_CODE_LEN
        )));
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::BadRequest(
            "Voucher code may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }

    Ok(code)
}

pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(GENERATED_CODE_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}

pub struct VoucherFields {
    pub discount_percent: i32,
    pub max_discount: Option<Decimal>,
    pub min_order_value: Decimal,
    pub quantity: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

pub fn validate_fields(fields: &VoucherFields) -> Result<()> {
    if !(1..=100).contains(&fields.discount_percent) {
        return Err(AppError::BadRequest(
            "discount_percent must be between 1 and 100".to_string(),
        ));
    }

    if let Some(cap) = fields.max_discount {
        if cap <= Decimal::ZERO {
            return Err(AppError::BadRequest(
                "max_discount must be positive".to_string(),
            ));
        }
    }

    if fields.min_order_value < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "min_order_value cannot be negative".to_string(),
        ));
    }

    if fields.quantity < 0 {
        return Err(AppError::BadRequest(
            "quantity cannot be negative".to_string(),
        ));
    }

    if fields.end_at <= fields.start_at {
        return Err(AppError::BadRequest(
            "end_at must be later than start_at".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::dec;

    fn voucher(percent: i32, cap: Option<Decimal>, min: Decimal) -> Voucher {
        let now = Utc::now();
        Voucher {
            id: 1,
            shop_id: None,
            code: "SALE10".to_string(),
            description: None,
            discount_percent: percent,
            max_discount: cap,
            min_order_value: min,
            quantity: 5,
            start_at: now - Duration::days(1),
            end_at: now + Duration::days(1),
            create_at: now,
            update_at: now,
            delete_at: None,
        }
    }

    #[test]
    fn percentage_is_rounded_to_cents() {
        assert_eq!(percent_discount(dec!(33.33), 10, None), dec!(3.33));
        assert_eq!(percent_discount(dec!(0.05), 50, None), dec!(0.03));
    }

    #[test]
    fn cap_limits_discount() {
        assert_eq!(percent_discount(dec!(1000), 20, Some(dec!(50))), dec!(50));
    }

    #[test]
    fn discount_never_exceeds_amount() {
        assert_eq!(percent_discount(dec!(12.50), 100, None), dec!(12.50));
    }

    #[test]
    fn below_minimum_order_is_rejected() {
        let v = voucher(10, None, dec!(100));
        let err = discount_for(&v, dec!(99.99), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(discount_for(&v, dec!(100), Utc::now()).unwrap(), dec!(10));
    }

    #[test]
    fn outside_window_or_used_up_is_rejected() {
        let mut v = voucher(10, None, Decimal::ZERO);
        assert!(discount_for(&v, dec!(10), v.end_at).is_err());
        assert!(discount_for(&v, dec!(10), v.start_at - Duration::seconds(1)).is_err());

        v.quantity = 0;
        assert!(discount_for(&v, dec!(10), Utc::now()).is_err());
    }

    #[test]
    fn codes_are_normalized_to_uppercase() {
        assert_eq!(normalize_code("  summer-24 ").unwrap(), "SUMMER-24");
        assert!(normalize_code("").is_err());
        assert!(normalize_code("bad code").is_err());
    }

    #[test]
    fn generated_codes_are_uppercase_alphanumeric() {
        let code = generate_code(&mut rand::rng());
        assert_eq!(code.len(), GENERATED_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn field_validation() {
        let now = Utc::now();
        let mut fields = VoucherFields {
            discount_percent: 10,
            max_discount: None,
            min_order_value: Decimal::ZERO,
            quantity: 1,
            start_at: now,
            end_at: now + Duration::hours(1),
        };
        assert!(validate_fields(&fields).is_ok());

        fields.discount_percent = 0;
        assert!(validate_fields(&fields).is_err());

        fields.discount_percent = 10;
        fields.end_at = now;
        assert!(validate_fields(&fields).is_err());
    }
}
