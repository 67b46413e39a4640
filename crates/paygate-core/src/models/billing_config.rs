//! Merchant billing configuration model
//!
//! One configuration row per merchant: the fee schedule applied to its
//! payments and the cadence used by the automatic billing sweep. Rows are
//! created lazily on the first fee-relevant event and are never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default domestic (European) card percentage: 0.5%
pub const DEFAULT_DOMESTIC_PERCENTAGE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
/// Default domestic (European) card fixed fee: 0.10
pub const DEFAULT_DOMESTIC_FIXED_FEE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
/// Default foreign (non-European) card percentage: 2.4%
pub const DEFAULT_FOREIGN_PERCENTAGE: Decimal = Decimal::from_parts(24, 0, 0, false, 1);
/// Default foreign (non-European) card fixed fee: 0.20
pub const DEFAULT_FOREIGN_FIXED_FEE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);
/// Default chargeback fee: 9.00
pub const DEFAULT_CHARGEBACK_FEE: Decimal = Decimal::from_parts(900, 0, 0, false, 2);
/// Default refund fee: 0.05
pub const DEFAULT_REFUND_FEE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Billing cycle enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    /// One invoice per calendar month
    #[default]
    Monthly,
    /// One invoice per week
    Weekly,
    /// One invoice per day
    Daily,
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingCycle::Monthly => write!(f, "monthly"),
            BillingCycle::Weekly => write!(f, "weekly"),
            BillingCycle::Daily => write!(f, "daily"),
        }
    }
}

impl BillingCycle {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Some(BillingCycle::Monthly),
            "weekly" => Some(BillingCycle::Weekly),
            "daily" => Some(BillingCycle::Daily),
            _ => None,
        }
    }
}

/// The percentage + fixed-fee pair applied to a payment, selected by card
/// origin class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Percentage of the payment amount (e.g. 0.5 means 0.5%)
    pub percentage: Decimal,

    /// Flat fee added per payment
    pub fixed_fee: Decimal,
}

impl FeeSchedule {
    /// Default schedule for a card origin class
    pub fn default_for(is_domestic_card: bool) -> Self {
        if is_domestic_card {
            Self {
                percentage: DEFAULT_DOMESTIC_PERCENTAGE,
                fixed_fee: DEFAULT_DOMESTIC_FIXED_FEE,
            }
        } else {
            Self {
                percentage: DEFAULT_FOREIGN_PERCENTAGE,
                fixed_fee: DEFAULT_FOREIGN_FIXED_FEE,
            }
        }
    }
}

/// Merchant billing configuration entity
///
/// Backed by the `merchant_billing` table; `merchant_id` carries a unique
/// constraint that resolves the lazy-creation race (the losing inserter
/// re-fetches the winner's row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantBillingConfig {
    /// Unique identifier
    pub id: i32,

    /// Owning merchant (unique)
    pub merchant_id: String,

    /// Percentage fee for domestic (European) cards
    pub domestic_card_percentage: Decimal,

    /// Fixed fee for domestic (European) cards
    pub domestic_card_fixed_fee: Decimal,

    /// Percentage fee for foreign (non-European) cards
    pub foreign_card_percentage: Decimal,

    /// Fixed fee for foreign (non-European) cards
    pub foreign_card_fixed_fee: Decimal,

    /// Flat fee charged per chargeback
    pub chargeback_fee: Decimal,

    /// Flat fee charged per refund
    pub refund_fee: Decimal,

    /// Invoice cadence
    pub billing_cycle: BillingCycle,

    /// Day of month (monthly) or Monday-based weekday index (weekly)
    pub billing_day: i32,

    /// Whether the automatic billing sweep covers this merchant
    pub auto_billing_enabled: bool,

    /// Billing contact email
    pub billing_email: Option<String>,

    /// Billing postal address
    pub billing_address: Option<String>,

    /// Preferred payment method (bank_transfer, card, ...)
    pub payment_method: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl MerchantBillingConfig {
    /// Build the default configuration for a merchant
    ///
    /// Used by the lazy get-or-create path. The billing email is a
    /// placeholder and is expected to be updated by the merchant.
    pub fn new_default(merchant_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            merchant_id: merchant_id.to_string(),
            domestic_card_percentage: DEFAULT_DOMESTIC_PERCENTAGE,
            domestic_card_fixed_fee: DEFAULT_DOMESTIC_FIXED_FEE,
            foreign_card_percentage: DEFAULT_FOREIGN_PERCENTAGE,
            foreign_card_fixed_fee: DEFAULT_FOREIGN_FIXED_FEE,
            chargeback_fee: DEFAULT_CHARGEBACK_FEE,
            refund_fee: DEFAULT_REFUND_FEE,
            billing_cycle: BillingCycle::Monthly,
            billing_day: 1,
            auto_billing_enabled: true,
            billing_email: Some(format!("{}@example.com", merchant_id)),
            billing_address: None,
            payment_method: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The fee schedule this merchant pays for the given card origin class
    #[inline]
    pub fn fee_schedule(&self, is_domestic_card: bool) -> FeeSchedule {
        if is_domestic_card {
            FeeSchedule {
                percentage: self.domestic_card_percentage,
                fixed_fee: self.domestic_card_fixed_fee,
            }
        } else {
            FeeSchedule {
                percentage: self.foreign_card_percentage,
                fixed_fee: self.foreign_card_fixed_fee,
            }
        }
    }
}

/// Round a monetary amount to 2 decimal places, half-up
#[inline]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Calculate the transaction fee for a payment amount
///
/// `fee = amount * percentage / 100 + fixed_fee`, rounded to 2 decimal
/// places half-up. When `config` is `None` the hardcoded default schedule
/// for the card class applies. The caller guarantees a non-negative amount;
/// nothing is validated here.
pub fn calculate_fee(
    amount: Decimal,
    is_domestic_card: bool,
    config: Option<&MerchantBillingConfig>,
) -> Decimal {
    let schedule = config
        .map(|c| c.fee_schedule(is_domestic_card))
        .unwrap_or_else(|| FeeSchedule::default_for(is_domestic_card));

    let percentage_fee = amount * schedule.percentage / Decimal::ONE_HUNDRED;
    round_money(percentage_fee + schedule.fixed_fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_DOMESTIC_PERCENTAGE, dec!(0.5));
        assert_eq!(DEFAULT_DOMESTIC_FIXED_FEE, dec!(0.10));
        assert_eq!(DEFAULT_FOREIGN_PERCENTAGE, dec!(2.4));
        assert_eq!(DEFAULT_FOREIGN_FIXED_FEE, dec!(0.20));
        assert_eq!(DEFAULT_CHARGEBACK_FEE, dec!(9.00));
        assert_eq!(DEFAULT_REFUND_FEE, dec!(0.05));
    }

    #[test]
    fn test_calculate_fee_default_schedule() {
        // 100.00 domestic: 100 * 0.5 / 100 + 0.10 = 0.60
        assert_eq!(calculate_fee(dec!(100.00), true, None), dec!(0.60));

        // 100.00 foreign: 100 * 2.4 / 100 + 0.20 = 2.60
        assert_eq!(calculate_fee(dec!(100.00), false, None), dec!(2.60));
    }

    #[test]
    fn test_calculate_fee_rounds_half_up() {
        // 1.01 domestic: 0.00505 + 0.10 = 0.10505 -> 0.11
        assert_eq!(calculate_fee(dec!(1.01), true, None), dec!(0.11));

        // 1.00 domestic: 0.005 + 0.10 = 0.105 -> 0.11 (midpoint goes up)
        assert_eq!(calculate_fee(dec!(1.00), true, None), dec!(0.11));

        // Zero amount still pays the fixed component
        assert_eq!(calculate_fee(dec!(0.00), false, None), dec!(0.20));
    }

    #[test]
    fn test_calculate_fee_merchant_schedule() {
        let mut config = MerchantBillingConfig::new_default("MRC001");
        config.domestic_card_percentage = dec!(1.0);
        config.domestic_card_fixed_fee = dec!(0.25);

        // 50.00 * 1.0 / 100 + 0.25 = 0.75
        assert_eq!(calculate_fee(dec!(50.00), true, Some(&config)), dec!(0.75));

        // Foreign class untouched: 50.00 * 2.4 / 100 + 0.20 = 1.40
        assert_eq!(calculate_fee(dec!(50.00), false, Some(&config)), dec!(1.40));
    }

    #[test]
    fn test_new_default() {
        let config = MerchantBillingConfig::new_default("MRC001");
        assert_eq!(config.merchant_id, "MRC001");
        assert_eq!(config.billing_cycle, BillingCycle::Monthly);
        assert_eq!(config.billing_day, 1);
        assert!(config.auto_billing_enabled);
        assert_eq!(
            config.billing_email.as_deref(),
            Some("MRC001@example.com")
        );
    }

    #[test]
    fn test_billing_cycle_from_str() {
        assert_eq!(BillingCycle::from_str("monthly"), Some(BillingCycle::Monthly));
        assert_eq!(BillingCycle::from_str("WEEKLY"), Some(BillingCycle::Weekly));
        assert_eq!(BillingCycle::from_str("daily"), Some(BillingCycle::Daily));
        assert_eq!(BillingCycle::from_str("yearly"), None);
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(3.14159)), dec!(3.14));
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
        assert_eq!(round_money(dec!(2.00)), dec!(2.00));
    }
}
