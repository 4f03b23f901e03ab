use serde::{Deserialize, Serialize};

/// An amount in the smallest currency unit (whole so'm).
///
/// Prices and totals are integers end to end so that sums over cart lines
/// are exact. The operators saturate at the `i64` bounds; callers that must
/// reject overflow use the `checked_*` methods.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from whole so'm.
    pub fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the raw amount.
    pub fn amount(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a quantity, saturating on overflow.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            write!(f, "-{grouped} so'm")
        } else {
            write!(f, "{grouped} so'm")
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display_groups_thousands() {
        assert_eq!(Money::new(450_000).to_string(), "450 000 so'm");
        assert_eq!(Money::new(15_000).to_string(), "15 000 so'm");
        assert_eq!(Money::new(1_234_567).to_string(), "1 234 567 so'm");
        assert_eq!(Money::new(999).to_string(), "999 so'm");
        assert_eq!(Money::new(-1500).to_string(), "-1 500 so'm");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(1000);
        let b = Money::new(500);

        assert_eq!((a + b).amount(), 1500);
        assert_eq!((a - b).amount(), 500);
        assert_eq!(a.multiply(3).amount(), 3000);
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [Money::new(100), Money::new(250), Money::new(650)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::new(1000));
    }

    #[test]
    fn test_money_overflow() {
        let big = Money::new(i64::MAX / 2);

        assert_eq!(big.checked_multiply(3), None);
        assert_eq!(big.checked_multiply(2), Some(Money::new(i64::MAX - 1)));
        assert_eq!(big.checked_add(big), Some(Money::new(i64::MAX - 1)));
        assert_eq!(Money::new(i64::MAX).checked_add(Money::new(1)), None);

        assert_eq!(big.multiply(3), Money::new(i64::MAX));
        assert_eq!(big + big + big, Money::new(i64::MAX));
        let total: Money = [big, big, big].into_iter().sum();
        assert_eq!(total, Money::new(i64::MAX));
    }

    #[test]
    fn test_money_predicates() {
        assert!(Money::new(1).is_positive());
        assert!(Money::zero().is_zero());
        assert!(!Money::new(-1).is_positive());
    }
}
