//! Domain model for a discount coupon.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponType {
    Percentage,
    Fixed,
    Free,
}

impl CouponType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponType::Percentage => "percentage",
            CouponType::Fixed => "fixed",
            CouponType::Free => "free",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(CouponType::Percentage),
            "fixed" => Some(CouponType::Fixed),
            "free" => Some(CouponType::Free),
            _ => None,
        }
    }
}

/// What the coupon is restricted to. At most one scope id is populated and it
/// must match the scope variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponScope {
    Global,
    Service,
    Professional,
    User,
}

impl CouponScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponScope::Global => "global",
            CouponScope::Service => "service",
            CouponScope::Professional => "professional",
            CouponScope::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "global" => Some(CouponScope::Global),
            "service" => Some(CouponScope::Service),
            "professional" => Some(CouponScope::Professional),
            "user" => Some(CouponScope::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    /// Unique redemption code, stored uppercase.
    pub code: String,
    pub coupon_type: CouponType,
    pub scope: CouponScope,
    pub service_id: Option<String>,
    pub professional_id: Option<String>,
    pub user_id: Option<String>,
    /// Percentage in (0, 100] for percentage coupons, currency amount for
    /// fixed ones, 0 for free ones.
    pub value: f64,
    pub min_booking_value: Option<f64>,
    pub max_uses: Option<u32>,
    pub uses: u32,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Generate a coupon ID.
    /// Format: coupon::<uuid>
    pub fn generate_id() -> String {
        format!("coupon::{}", Uuid::new_v4())
    }

    /// Structural validation of the scope/value invariants. Called when a
    /// coupon is stored; lookups trust the stored rows.
    pub fn validate(&self) -> Result<(), String> {
        let scope_ids = [
            (CouponScope::Service, self.service_id.is_some()),
            (CouponScope::Professional, self.professional_id.is_some()),
            (CouponScope::User, self.user_id.is_some()),
        ];
        for (scope, populated) in scope_ids {
            if (self.scope == scope) != populated {
                return Err(format!(
                    "coupon {} scope is {} but its scope ids do not match",
                    self.code,
                    self.scope.as_str()
                ));
            }
        }
        match self.coupon_type {
            CouponType::Percentage if !(self.value > 0.0 && self.value <= 100.0) => {
                Err(format!("percentage coupon {} must be in (0, 100]", self.code))
            }
            CouponType::Free if self.value != 0.0 => {
                Err(format!("free coupon {} must carry value 0", self.code))
            }
            _ => Ok(()),
        }
    }

    /// Whether the usage ceiling has been reached.
    pub fn exhausted(&self) -> bool {
        matches!(self.max_uses, Some(max) if self.uses >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_coupon() -> Coupon {
        Coupon {
            id: Coupon::generate_id(),
            code: "WELCOME10".to_string(),
            coupon_type: CouponType::Percentage,
            scope: CouponScope::Global,
            service_id: None,
            professional_id: None,
            user_id: None,
            value: 10.0,
            min_booking_value: None,
            max_uses: None,
            uses: 0,
            active: true,
            starts_at: None,
            ends_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn validates_scope_id_pairing() {
        let mut coupon = base_coupon();
        assert!(coupon.validate().is_ok());

        coupon.scope = CouponScope::Professional;
        assert!(coupon.validate().is_err());

        coupon.professional_id = Some("professional::x".to_string());
        assert!(coupon.validate().is_ok());

        // A stray id outside its scope is also rejected.
        coupon.service_id = Some("service::y".to_string());
        assert!(coupon.validate().is_err());
    }

    #[test]
    fn validates_value_ranges() {
        let mut coupon = base_coupon();
        coupon.value = 0.0;
        assert!(coupon.validate().is_err());
        coupon.value = 100.0;
        assert!(coupon.validate().is_ok());
        coupon.value = 100.5;
        assert!(coupon.validate().is_err());

        coupon.coupon_type = CouponType::Free;
        coupon.value = 5.0;
        assert!(coupon.validate().is_err());
        coupon.value = 0.0;
        assert!(coupon.validate().is_ok());
    }

    #[test]
    fn exhausted_respects_ceiling() {
        let mut coupon = base_coupon();
        assert!(!coupon.exhausted());
        coupon.max_uses = Some(2);
        coupon.uses = 1;
        assert!(!coupon.exhausted());
        coupon.uses = 2;
        assert!(coupon.exhausted());
    }
}
