//! Discount resolver: one applied coupon at a time, resolved server-side.
//!
//! Discount amounts are never computed locally. Both manually entered codes
//! and coupons attached to the account go through the backend's validate
//! endpoint, which owns expiry, minimum-purchase, and amount arithmetic. The
//! resolver only caches the server's answer for the pricing aggregator.

use std::sync::RwLock;

use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use maplecart_core::{CouponId, CouponStatus};

use crate::api::ApiClient;
use crate::error::{Result, StorefrontError};
use crate::lock;
use crate::types::{Coupon, CouponValidation, UserProfile, ValidateCouponRequest};

/// Backend surface for coupon lookup and validation.
pub trait CouponApi {
    /// Validate a code against a purchase amount. The server computes the
    /// discount.
    fn validate(
        &self,
        request: &ValidateCouponRequest,
    ) -> impl Future<Output = Result<CouponValidation>> + Send;

    /// Fetch a coupon document by id.
    fn fetch_coupon(&self, id: &CouponId) -> impl Future<Output = Result<Coupon>> + Send;

    /// Detach a coupon from the signed-in account.
    fn remove_account_coupon(&self, id: &CouponId) -> impl Future<Output = Result<()>> + Send;
}

impl CouponApi for ApiClient {
    async fn validate(&self, request: &ValidateCouponRequest) -> Result<CouponValidation> {
        self.create("/api/coupons/validate", request).await
    }

    async fn fetch_coupon(&self, id: &CouponId) -> Result<Coupon> {
        self.fetch(&format!("/api/coupons/{id}")).await
    }

    async fn remove_account_coupon(&self, id: &CouponId) -> Result<()> {
        self.delete(&format!("/api/coupons/user/{id}")).await
    }
}

/// Backend surface for reading the signed-in user's profile, which carries
/// the account's attached coupons.
pub trait ProfileApi {
    /// Fetch the current user's profile.
    fn current_profile(&self) -> impl Future<Output = Result<UserProfile>> + Send;
}

impl ProfileApi for ApiClient {
    async fn current_profile(&self) -> Result<UserProfile> {
        self.fetch("/api/auth/me").await
    }
}

/// A server-validated discount held against the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDiscount {
    /// The coupon the discount came from.
    pub coupon: Coupon,
    /// Server-computed discount amount.
    pub amount: Decimal,
}

/// Resolves and holds the single active discount for the session.
pub struct DiscountResolver<C, P> {
    coupons: C,
    profile: P,
    applied: RwLock<Option<AppliedDiscount>>,
}

impl<C: CouponApi, P: ProfileApi> DiscountResolver<C, P> {
    /// Create a resolver with no discount applied.
    pub fn new(coupons: C, profile: P) -> Self {
        Self {
            coupons,
            profile,
            applied: RwLock::new(None),
        }
    }

    /// The currently applied discount, if any.
    #[must_use]
    pub fn applied(&self) -> Option<AppliedDiscount> {
        lock::read(&self.applied).clone()
    }

    /// Discount amount for the pricing aggregator; zero when nothing is
    /// applied.
    #[must_use]
    pub fn discount_amount(&self) -> Decimal {
        lock::read(&self.applied)
            .as_ref()
            .map_or(Decimal::ZERO, |applied| applied.amount)
    }

    /// Validate and apply a manually entered code against the current
    /// purchase amount. Replaces any previously applied discount.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank code with no network call, or the
    /// backend rejection (expired, inactive, below minimum purchase, unknown
    /// code); on rejection any previously applied discount is cleared so a
    /// failed apply never leaves a stale amount behind.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn apply_code(&self, code: &str, purchase_amount: Decimal) -> Result<AppliedDiscount> {
        let code = code.trim();
        if code.is_empty() {
            return Err(StorefrontError::Validation(
                "a coupon code is required".to_string(),
            ));
        }

        *lock::write(&self.applied) = None;

        let request = ValidateCouponRequest {
            code: code.to_string(),
            purchase_amount,
        };
        let validation = self.coupons.validate(&request).await?;

        let applied = AppliedDiscount {
            amount: validation.discount_amount,
            coupon: validation.coupon,
        };
        debug!(code = %applied.coupon.code, amount = %applied.amount, "Coupon applied");
        *lock::write(&self.applied) = Some(applied.clone());
        Ok(applied)
    }

    /// Resolve a coupon attached to the account, if one is active.
    ///
    /// The profile's first active coupon reference is looked up and pushed
    /// through the same server validation as a typed-in code. Returns `None`
    /// when the account has no usable coupon; resolution failures also yield
    /// `None` rather than an error, since an account coupon is a bonus the
    /// user never asked for.
    #[instrument(skip(self))]
    pub async fn resolve_account_coupon(
        &self,
        purchase_amount: Decimal,
    ) -> Result<Option<AppliedDiscount>> {
        let profile = self.profile.current_profile().await?;

        let Some(coupon_id) = profile
            .discount_coupons
            .iter()
            .find(|reference| {
                reference.status == CouponStatus::Active && reference.coupon_id.is_some()
            })
            .and_then(|reference| reference.coupon_id.clone())
        else {
            return Ok(None);
        };

        let coupon = match self.coupons.fetch_coupon(&coupon_id).await {
            Ok(coupon) => coupon,
            Err(e) => {
                warn!(coupon = %coupon_id, error = %e, "Failed to fetch account coupon");
                return Ok(None);
            }
        };

        match self.apply_code(&coupon.code, purchase_amount).await {
            Ok(applied) => Ok(Some(applied)),
            Err(e) => {
                warn!(code = %coupon.code, error = %e, "Account coupon failed validation");
                Ok(None)
            }
        }
    }

    /// Detach the applied coupon from the account and clear the discount.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local discount is cleared regardless
    /// so pricing never shows a discount the server may have revoked.
    #[instrument(skip(self), fields(coupon = %coupon_id))]
    pub async fn remove(&self, coupon_id: &CouponId) -> Result<()> {
        let result = self.coupons.remove_account_coupon(coupon_id).await;
        *lock::write(&self.applied) = None;
        result
    }

    /// Drop the applied discount locally without touching the account.
    pub fn clear(&self) {
        *lock::write(&self.applied) = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn coupon(code: &str) -> Coupon {
        serde_json::from_value(serde_json::json!({
            "_id": format!("coupon-{code}"),
            "code": code,
            "discountType": "percentage",
            "discountValue": "10",
            "minPurchase": "0",
            "expirationDate": "2027-01-01T00:00:00Z",
            "status": "active",
        }))
        .unwrap()
    }

    #[derive(Default)]
    struct FakeCouponApi {
        reject_validation: AtomicBool,
        validate_calls: AtomicU32,
    }

    impl FakeCouponApi {
        fn rejecting() -> Self {
            Self {
                reject_validation: AtomicBool::new(true),
                ..Self::default()
            }
        }
    }

    impl CouponApi for &FakeCouponApi {
        async fn validate(&self, request: &ValidateCouponRequest) -> Result<CouponValidation> {
            self.validate_calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_validation.load(Ordering::SeqCst) {
                return Err(StorefrontError::Api {
                    status: reqwest::StatusCode::BAD_REQUEST,
                    message: "Invalid or expired coupon".to_string(),
                });
            }
            // Server-side math: 10% of the purchase amount
            Ok(CouponValidation {
                coupon: coupon(&request.code),
                discount_amount: request.purchase_amount / Decimal::from(10),
                final_amount: None,
            })
        }

        async fn fetch_coupon(&self, id: &CouponId) -> Result<Coupon> {
            Ok(coupon(&format!("FROM-{id}")))
        }

        async fn remove_account_coupon(&self, _id: &CouponId) -> Result<()> {
            Ok(())
        }
    }

    struct FakeProfileApi {
        coupons: Vec<(Option<&'static str>, CouponStatus)>,
    }

    impl ProfileApi for &FakeProfileApi {
        async fn current_profile(&self) -> Result<UserProfile> {
            let refs: Vec<_> = self
                .coupons
                .iter()
                .map(|(id, status)| {
                    serde_json::json!({
                        "couponId": id,
                        "status": status,
                    })
                })
                .collect();
            Ok(serde_json::from_value(serde_json::json!({
                "_id": "u1",
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "discountCoupons": refs,
            }))
            .unwrap())
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_apply_code_stores_server_amount() {
        let coupons = FakeCouponApi::default();
        let profile = FakeProfileApi { coupons: vec![] };
        let resolver = DiscountResolver::new(&coupons, &profile);

        let applied = resolver.apply_code("SAVE10", dec("80.00")).await.unwrap();
        assert_eq!(applied.amount, dec("8.00"));
        assert_eq!(resolver.discount_amount(), dec("8.00"));
    }

    #[tokio::test]
    async fn test_apply_code_trims_whitespace() {
        let coupons = FakeCouponApi::default();
        let profile = FakeProfileApi { coupons: vec![] };
        let resolver = DiscountResolver::new(&coupons, &profile);

        let applied = resolver.apply_code("  SAVE10 ", dec("80.00")).await.unwrap();
        assert_eq!(applied.coupon.code, "SAVE10");
    }

    #[tokio::test]
    async fn test_failed_apply_clears_previous_discount() {
        let coupons = FakeCouponApi::default();
        let profile = FakeProfileApi { coupons: vec![] };
        let resolver = DiscountResolver::new(&coupons, &profile);
        resolver.apply_code("SAVE10", dec("80.00")).await.unwrap();
        assert!(resolver.applied().is_some());

        coupons.reject_validation.store(true, Ordering::SeqCst);
        assert!(resolver.apply_code("EXPIRED", dec("80.00")).await.is_err());
        assert_eq!(resolver.discount_amount(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_account_coupon_resolved_through_server_validation() {
        let coupons = FakeCouponApi::default();
        let profile = FakeProfileApi {
            coupons: vec![(Some("c1"), CouponStatus::Active)],
        };
        let resolver = DiscountResolver::new(&coupons, &profile);

        let applied = resolver
            .resolve_account_coupon(dec("100.00"))
            .await
            .unwrap()
            .unwrap();
        // The amount comes from the validate endpoint, not local math
        assert_eq!(applied.amount, dec("10.00"));
        assert_eq!(coupons.validate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inactive_account_coupons_are_skipped() {
        let coupons = FakeCouponApi::default();
        let profile = FakeProfileApi {
            coupons: vec![
                (Some("c1"), CouponStatus::Expired),
                (None, CouponStatus::Active),
            ],
        };
        let resolver = DiscountResolver::new(&coupons, &profile);

        let applied = resolver.resolve_account_coupon(dec("100.00")).await.unwrap();
        assert!(applied.is_none());
        assert_eq!(coupons.validate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_active_entry_without_reference_does_not_shadow_later_one() {
        let coupons = FakeCouponApi::default();
        let profile = FakeProfileApi {
            coupons: vec![
                (None, CouponStatus::Active),
                (Some("c2"), CouponStatus::Active),
            ],
        };
        let resolver = DiscountResolver::new(&coupons, &profile);

        let applied = resolver
            .resolve_account_coupon(dec("100.00"))
            .await
            .unwrap()
            .expect("the second entry carries a usable coupon");
        assert_eq!(applied.coupon.code, "FROM-c2");
        assert_eq!(coupons.validate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_account_coupon_validation_failure_yields_none() {
        let coupons = FakeCouponApi::rejecting();
        let profile = FakeProfileApi {
            coupons: vec![(Some("c1"), CouponStatus::Active)],
        };
        let resolver = DiscountResolver::new(&coupons, &profile);

        let applied = resolver.resolve_account_coupon(dec("100.00")).await.unwrap();
        assert!(applied.is_none());
        assert_eq!(resolver.discount_amount(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_blank_code_is_refused_without_network() {
        let coupons = FakeCouponApi::default();
        let profile = FakeProfileApi { coupons: vec![] };
        let resolver = DiscountResolver::new(&coupons, &profile);
        resolver.apply_code("SAVE10", dec("80.00")).await.unwrap();

        let err = resolver.apply_code("   ", dec("80.00")).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
        assert_eq!(coupons.validate_calls.load(Ordering::SeqCst), 1);
        // A refused input does not disturb the applied discount
        assert_eq!(resolver.discount_amount(), dec("8.00"));
    }

    #[tokio::test]
    async fn test_apply_then_remove_restores_zero_discount() {
        let coupons = FakeCouponApi::default();
        let profile = FakeProfileApi { coupons: vec![] };
        let resolver = DiscountResolver::new(&coupons, &profile);

        assert_eq!(resolver.discount_amount(), Decimal::ZERO);
        let applied = resolver.apply_code("SAVE10", dec("100.00")).await.unwrap();
        assert_eq!(applied.amount, dec("10.00"));

        resolver.remove(&applied.coupon.id).await.unwrap();
        assert_eq!(resolver.discount_amount(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_remove_clears_discount() {
        let coupons = FakeCouponApi::default();
        let profile = FakeProfileApi { coupons: vec![] };
        let resolver = DiscountResolver::new(&coupons, &profile);
        let applied = resolver.apply_code("SAVE10", dec("80.00")).await.unwrap();

        resolver.remove(&applied.coupon.id).await.unwrap();
        assert!(resolver.applied().is_none());
    }
}
