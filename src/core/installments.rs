use crate::domain::model::{OfferingId, PackageId};
use crate::utils::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Splits `total` into `count` whole amounts. The first `total % count`
/// entries carry the extra unit, so the sum is exact and no two entries
/// differ by more than one.
pub fn allocate(total: u64, count: NonZeroU32) -> Vec<u64> {
    let count = u64::from(count.get());
    let base = total / count;
    let remainder = total % count;
    (0..count)
        .map(|index| if index < remainder { base + 1 } else { base })
        .collect()
}

/// Rounds to the nearest whole currency unit, halves away from zero.
pub fn round_currency(amount: f64) -> Result<u64> {
    if !amount.is_finite() {
        return Err(LedgerError::input("total", "amount must be a finite number"));
    }
    if amount < 0.0 {
        return Err(LedgerError::input("total", "amount cannot be negative"));
    }
    Ok(amount.round() as u64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub package_id: PackageId,
    pub offering_id: OfferingId,
    pub sessions_selected: u32,
    pub unit_price: f64,
    #[serde(default)]
    pub discount: f64,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        (self.unit_price - self.discount).max(0.0)
    }

    pub fn is_drop_in(&self) -> bool {
        self.sessions_selected <= 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// Installments are offered only when some line buys more than one session.
    pub fn allows_installments(&self) -> bool {
        self.lines.iter().any(|line| !line.is_drop_in())
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub number: u32,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub total: u64,
    pub installments: Vec<Installment>,
}

impl InstallmentPlan {
    pub fn from_total(total: u64, count: NonZeroU32) -> Self {
        let installments = allocate(total, count)
            .into_iter()
            .zip(1..)
            .map(|(amount, number)| Installment { number, amount })
            .collect();
        Self {
            total,
            installments,
        }
    }

    pub fn is_single_payment(&self) -> bool {
        self.installments.len() == 1
    }

    pub fn amounts(&self) -> Vec<u64> {
        self.installments.iter().map(|i| i.amount).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentPolicy {
    pub max_installments: u32,
}

impl Default for InstallmentPolicy {
    fn default() -> Self {
        Self {
            max_installments: 6,
        }
    }
}

impl InstallmentPolicy {
    pub fn new(max_installments: u32) -> Self {
        Self {
            max_installments: max_installments.max(1),
        }
    }

    /// Builds the checkout payment plan. Carts made only of drop-in classes are
    /// always paid in one installment, whatever was requested.
    pub fn plan(&self, cart: &Cart, requested: u32) -> Result<InstallmentPlan> {
        if cart.lines.is_empty() {
            return Err(LedgerError::input("cart", "cart is empty"));
        }
        let requested = NonZeroU32::new(requested)
            .ok_or_else(|| LedgerError::input("installments", "must be at least 1"))?;
        if requested.get() > self.max_installments {
            return Err(LedgerError::input(
                "installments",
                format!("at most {} installments are offered", self.max_installments),
            ));
        }

        let count = if cart.allows_installments() {
            requested
        } else {
            if requested.get() > 1 {
                tracing::debug!(
                    "Drop-in cart forced to a single payment (requested {})",
                    requested
                );
            }
            NonZeroU32::MIN
        };

        let total = round_currency(cart.total())?;
        Ok(InstallmentPlan::from_total(total, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(count: u32) -> NonZeroU32 {
        NonZeroU32::new(count).unwrap()
    }

    fn line(sessions: u32, price: f64) -> CartLine {
        CartLine {
            package_id: PackageId(1),
            offering_id: OfferingId(10),
            sessions_selected: sessions,
            unit_price: price,
            discount: 0.0,
        }
    }

    #[test]
    fn test_allocate_known_values() {
        assert_eq!(allocate(301, n(2)), vec![151, 150]);
        assert_eq!(allocate(100, n(3)), vec![34, 33, 33]);
        assert_eq!(allocate(0, n(2)), vec![0, 0]);
        assert_eq!(allocate(5, n(5)), vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_allocate_invariants() {
        for total in [0_u64, 1, 7, 99, 100, 301, 1_000, 123_457] {
            for count in 1..=12_u32 {
                let parts = allocate(total, n(count));
                let base = total / u64::from(count);
                let larger = (total % u64::from(count)) as usize;

                assert_eq!(parts.len(), count as usize);
                assert_eq!(parts.iter().sum::<u64>(), total);
                assert!(parts.iter().all(|p| *p == base || *p == base + 1));
                assert!(parts[..larger].iter().all(|p| *p == base + 1));
                assert!(parts[larger..].iter().all(|p| *p == base));
            }
        }
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(150.5).unwrap(), 151);
        assert_eq!(round_currency(150.49).unwrap(), 150);
        assert_eq!(round_currency(0.0).unwrap(), 0);
        assert!(round_currency(-1.0).is_err());
        assert!(round_currency(f64::NAN).is_err());
    }

    #[test]
    fn test_plan_drop_in_forced_single_payment() {
        let cart = Cart::new(vec![line(1, 25.0), line(1, 30.0)]);
        let plan = InstallmentPolicy::default().plan(&cart, 3).unwrap();
        assert!(plan.is_single_payment());
        assert_eq!(plan.amounts(), vec![55]);
    }

    #[test]
    fn test_plan_splits_rounded_total() {
        let mut package = line(8, 320.4);
        package.discount = 20.0;
        let cart = Cart::new(vec![package, line(1, 0.6)]);

        let plan = InstallmentPolicy::default().plan(&cart, 2).unwrap();
        assert_eq!(plan.total, 301);
        assert_eq!(plan.amounts(), vec![151, 150]);
        assert_eq!(plan.installments[1].number, 2);
    }

    #[test]
    fn test_plan_rejects_bad_requests() {
        let policy = InstallmentPolicy::new(3);
        let cart = Cart::new(vec![line(4, 100.0)]);
        assert!(policy.plan(&cart, 0).is_err());
        assert!(policy.plan(&cart, 4).is_err());
        assert!(policy.plan(&Cart::default(), 1).is_err());
    }
}
