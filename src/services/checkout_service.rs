use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;

use crate::{
    error::{AppError, Result},
    models::{CartItem, Product},
    services::voucher_service::round_money,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub product_id: i32,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// One shop's share of a checkout before it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub shop_id: i32,
    pub lines: Vec<DraftLine>,
    pub subtotal: Decimal,
    pub shop_discount: Decimal,
    pub platform_discount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub shop_voucher_id: Option<i32>,
    pub voucher_id: Option<i32>,
}

impl InvoiceDraft {
    /// Amount left after the shop voucher, which is what the platform voucher applies to.
    pub fn after_shop_discount(&self) -> Decimal {
        (self.subtotal - self.shop_discount).max(Decimal::ZERO)
    }

    pub fn compute_total(&mut self) {
        let goods = (self.after_shop_discount() - self.platform_discount).max(Decimal::ZERO);
        self.total = goods + self.shipping_fee;
    }
}

/// Validates quantities and folds repeated products into a single line.
pub fn merge_cart(items: &[CartItem]) -> Result<BTreeMap<i32, i32>> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }

    let mut merged: BTreeMap<i32, i32> = BTreeMap::new();
    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "Invalid quantity for product {}",
                item.product_id
            )));
        }

        let entry = merged.entry(item.product_id).or_insert(0);
        *entry = entry
            .checked_add(item.quantity)
            .ok_or_else(|| AppError::BadRequest("Quantity too large".to_string()))?;
    }

    Ok(merged)
}

/// Groups the cart into one draft per shop, ordered by shop id.
pub fn split_by_shop(
    cart: &BTreeMap<i32, i32>,
    products: &HashMap<i32, Product>,
    shipping_fee: Decimal,
) -> Result<Vec<InvoiceDraft>> {
    let mut by_shop: BTreeMap<i32, Vec<DraftLine>> = BTreeMap::new();

    for (&product_id, &quantity) in cart {
        let product = products
            .get(&product_id)
            .filter(|p| p.delete_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;

        if product.stock < quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                product_id
            )));
        }

        by_shop.entry(product.shop_id).or_default().push(DraftLine {
            product_id,
            product_name: product.name.clone(),
            price: product.price,
            quantity,
        });
    }

    let drafts = by_shop
        .into_iter()
        .map(|(shop_id, lines)| {
            let subtotal = lines
                .iter()
                .map(|l| l.price * Decimal::from(l.quantity))
                .sum();

            let mut draft = InvoiceDraft {
                shop_id,
                lines,
                subtotal,
                shop_discount: Decimal::ZERO,
                platform_discount: Decimal::ZERO,
                shipping_fee,
                total: Decimal::ZERO,
                shop_voucher_id: None,
                voucher_id: None,
            };
            draft.compute_total();
            draft
        })
        .collect();

    Ok(drafts)
}

/// Splits `discount` across `weights` proportionally, to the cent.
/// Every share stays within `0..=weight`. The rounding remainder is settled
/// on the last invoices that have room for it, so the shares sum to
/// `min(discount, sum(weights))`.
pub fn apportion(discount: Decimal, weights: &[Decimal]) -> Vec<Decimal> {
    let total_weight: Decimal = weights.iter().copied().sum();

    if weights.is_empty() || total_weight <= Decimal::ZERO || discount <= Decimal::ZERO {
        return vec![Decimal::ZERO; weights.len()];
    }

    let discount = discount.min(total_weight);

    let mut shares: Vec<Decimal> = weights
        .iter()
        .map(|&weight| {
            let weight = weight.max(Decimal::ZERO);
            round_money(discount * weight / total_weight).min(weight)
        })
        .collect();

    let mut remainder = discount - shares.iter().copied().sum::<Decimal>();

    for (share, &weight) in shares.iter_mut().zip(weights).rev() {
        if remainder.is_zero() {
            break;
        }

        let step = if remainder > Decimal::ZERO {
            remainder.min(weight.max(Decimal::ZERO) - *share)
        } else {
            remainder.max(-*share)
        };

        *share += step;
        remainder -= step;
    }

    shares
}

/// Spreads the platform voucher over the drafts and recomputes totals.
pub fn apply_platform_discount(drafts: &mut [InvoiceDraft], discount: Decimal, voucher_id: i32) {
    let weights: Vec<Decimal> = drafts.iter().map(|d| d.after_shop_discount()).collect();
    let shares = apportion(discount, &weights);

    for (draft, share) in drafts.iter_mut().zip(shares) {
        draft.platform_discount = share;
        draft.voucher_id = Some(voucher_id);
        draft.compute_total();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::dec;

    fn product(id: i32, shop_id: i32, price: Decimal, stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id,
            shop_id,
            category_id: 1,
            name: format!("product-{}", id),
            description: None,
            price,
            stock,
            sold: 0,
            images: Vec::new(),
            create_at: now,
            update_at: now,
            delete_at: None,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<i32, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert!(matches!(merge_cart(&[]), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn repeated_products_are_merged() {
        let cart = merge_cart(&[
            CartItem { product_id: 1, quantity: 2 },
            CartItem { product_id: 2, quantity: 1 },
            CartItem { product_id: 1, quantity: 3 },
        ])
        .unwrap();

        assert_eq!(cart.get(&1), Some(&5));
        assert_eq!(cart.get(&2), Some(&1));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let err = merge_cart(&[CartItem { product_id: 1, quantity: 0 }]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn cart_splits_into_one_invoice_per_shop() {
        let products = catalog(vec![
            product(1, 20, dec!(10.00), 5),
            product(2, 10, dec!(3.50), 5),
            product(3, 20, dec!(1.25), 5),
        ]);
        let cart = merge_cart(&[
            CartItem { product_id: 1, quantity: 2 },
            CartItem { product_id: 2, quantity: 2 },
            CartItem { product_id: 3, quantity: 4 },
        ])
        .unwrap();

        let drafts = split_by_shop(&cart, &products, dec!(2)).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].shop_id, 10);
        assert_eq!(drafts[0].subtotal, dec!(7.00));
        assert_eq!(drafts[0].total, dec!(9.00));
        assert_eq!(drafts[1].shop_id, 20);
        assert_eq!(drafts[1].lines.len(), 2);
        assert_eq!(drafts[1].subtotal, dec!(25.00));
    }

    #[test]
    fn stock_is_checked_against_merged_quantity() {
        let products = catalog(vec![product(1, 1, dec!(5), 4)]);
        let cart = merge_cart(&[
            CartItem { product_id: 1, quantity: 3 },
            CartItem { product_id: 1, quantity: 2 },
        ])
        .unwrap();

        assert!(matches!(
            split_by_shop(&cart, &products, Decimal::ZERO),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn unknown_or_deleted_product_is_not_found() {
        let mut deleted = product(2, 1, dec!(5), 10);
        deleted.delete_at = Some(Utc::now());
        let products = catalog(vec![deleted]);

        let cart = merge_cart(&[CartItem { product_id: 2, quantity: 1 }]).unwrap();
        assert!(matches!(
            split_by_shop(&cart, &products, Decimal::ZERO),
            Err(AppError::NotFound(_))
        ));

        let cart = merge_cart(&[CartItem { product_id: 99, quantity: 1 }]).unwrap();
        assert!(matches!(
            split_by_shop(&cart, &products, Decimal::ZERO),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn apportioned_shares_sum_to_discount() {
        let shares = apportion(dec!(10.00), &[dec!(10), dec!(10), dec!(10)]);
        assert_eq!(shares, vec![dec!(3.33), dec!(3.33), dec!(3.34)]);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(10.00));
    }

    #[test]
    fn apportion_follows_weights() {
        let shares = apportion(dec!(9), &[dec!(100), dec!(200)]);
        assert_eq!(shares, vec![dec!(3.00), dec!(6.00)]);
    }

    #[test]
    fn rounding_up_never_pushes_a_share_negative() {
        let weights = [dec!(1), dec!(1), Decimal::ZERO];
        let shares = apportion(dec!(0.01), &weights);

        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(0.01));
        for (share, weight) in shares.iter().zip(weights) {
            assert!(*share >= Decimal::ZERO && *share <= weight, "{:?}", shares);
        }
        assert_eq!(shares[2], Decimal::ZERO);
    }

    #[test]
    fn fully_discounted_invoice_takes_no_platform_share() {
        let shares = apportion(dec!(3), &[dec!(10), Decimal::ZERO]);
        assert_eq!(shares, vec![dec!(3.00), Decimal::ZERO]);
    }

    #[test]
    fn discount_is_capped_at_total_weight() {
        let shares = apportion(dec!(50), &[dec!(10), dec!(5)]);
        assert_eq!(shares, vec![dec!(10.00), dec!(5.00)]);
    }

    #[test]
    fn zero_weights_get_nothing() {
        assert_eq!(apportion(dec!(5), &[Decimal::ZERO, Decimal::ZERO]), vec![Decimal::ZERO; 2]);
        assert!(apportion(dec!(5), &[]).is_empty());
    }

    #[test]
    fn platform_discount_applies_after_shop_discount() {
        let products = catalog(vec![product(1, 1, dec!(60), 5), product(2, 2, dec!(40), 5)]);
        let cart = merge_cart(&[
            CartItem { product_id: 1, quantity: 1 },
            CartItem { product_id: 2, quantity: 1 },
        ])
        .unwrap();
        let mut drafts = split_by_shop(&cart, &products, dec!(1)).unwrap();

        drafts[0].shop_discount = dec!(20);
        drafts[0].shop_voucher_id = Some(7);
        drafts[0].compute_total();

        // 40 + 40 left after the shop voucher, platform takes 8 split evenly.
        apply_platform_discount(&mut drafts, dec!(8), 9);

        assert_eq!(drafts[0].platform_discount, dec!(4.00));
        assert_eq!(drafts[1].platform_discount, dec!(4.00));
        assert_eq!(drafts[0].total, dec!(37.00));
        assert_eq!(drafts[1].total, dec!(37.00));
        assert!(drafts.iter().all(|d| d.voucher_id == Some(9)));
    }

    #[test]
    fn total_never_drops_below_shipping() {
        let products = catalog(vec![product(1, 1, dec!(5), 5)]);
        let cart = merge_cart(&[CartItem { product_id: 1, quantity: 1 }]).unwrap();
        let mut drafts = split_by_shop(&cart, &products, dec!(3)).unwrap();

        drafts[0].shop_discount = dec!(5);
        drafts[0].platform_discount = dec!(1);
        drafts[0].compute_total();

        assert_eq!(drafts[0].total, dec!(3));
    }
}
