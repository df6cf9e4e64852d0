//! Proportional allocation primitive.
//!
//! `amount[p] = W[p] / sum(W) * T` for every participant with a positive
//! weight, zero otherwise. Shared by every facility and asset class.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::checked_sum;
use crate::error::AllocationError;
use crate::types::Money;
use crate::AllocationResult;

/// One participant's slice of a prorated total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    /// Participant name (vehicle or asset class).
    pub name: String,
    /// Amount allocated to the participant.
    pub amount: Money,
}

/// Result of a single proration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proration {
    /// One entry per participant, in input order.
    pub shares: Vec<Share>,
    /// Sum of the positive weights.
    pub total_weight: Decimal,
    /// Sum of the allocated amounts.
    pub allocated: Money,
    /// Part of the total left unallocated because nobody had weight.
    pub undistributed: Money,
}

/// Split `total` across `weights` in proportion to each positive weight.
///
/// A zero total short-circuits to all zeros. When no participant has a
/// positive weight the total is left undistributed. No rounding correction
/// is applied to the shares.
pub fn prorate(total: Money, weights: &[(String, Decimal)]) -> Proration {
    let total_weight: Decimal = weights
        .iter()
        .map(|(_, w)| *w)
        .filter(|w| *w > Decimal::ZERO)
        .fold(Decimal::ZERO, |acc, w| acc.saturating_add(w));

    let zeroed = || {
        weights
            .iter()
            .map(|(name, _)| Share {
                name: name.clone(),
                amount: Decimal::ZERO,
            })
            .collect::<Vec<_>>()
    };

    if total.is_zero() {
        return Proration {
            shares: zeroed(),
            total_weight,
            allocated: Decimal::ZERO,
            undistributed: Decimal::ZERO,
        };
    }

    if total_weight.is_zero() {
        return Proration {
            shares: zeroed(),
            total_weight,
            allocated: Decimal::ZERO,
            undistributed: total,
        };
    }

    let shares: Vec<Share> = weights
        .iter()
        .map(|(name, w)| {
            let amount = if *w > Decimal::ZERO {
                *w / total_weight * total
            } else {
                Decimal::ZERO
            };
            Share {
                name: name.clone(),
                amount,
            }
        })
        .collect();
    let allocated = shares
        .iter()
        .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.amount));

    Proration {
        shares,
        total_weight,
        allocated,
        undistributed: Decimal::ZERO,
    }
}

/// Check a proration request: the total must not be negative and the
/// positive weights must sum without overflow.
pub fn validate_proration(total: Money, weights: &[(String, Decimal)]) -> AllocationResult<()> {
    if total < Decimal::ZERO {
        return Err(AllocationError::InvalidInput {
            field: "total".into(),
            reason: "Total to prorate cannot be negative.".into(),
        });
    }
    let positive = weights.iter().map(|(_, w)| *w).filter(|w| *w > Decimal::ZERO);
    if checked_sum(positive).is_none() {
        return Err(AllocationError::InvalidInput {
            field: "weights".into(),
            reason: "Sum of weights is too large.".into(),
        });
    }
    Ok(())
}

/// `prorate` behind `validate_proration`. Entry point for front-ends that
/// take the total and weights straight from the caller.
pub fn try_prorate(total: Money, weights: &[(String, Decimal)]) -> AllocationResult<Proration> {
    validate_proration(total, weights)?;
    Ok(prorate(total, weights))
}

impl Proration {
    /// Amount allocated to `name`, zero if absent.
    pub fn amount_for(&self, name: &str) -> Money {
        self.shares
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.amount)
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, eps: Decimal) -> bool {
        (a - b).abs() < eps
    }

    fn weights(pairs: &[(&str, Decimal)]) -> Vec<(String, Decimal)> {
        pairs.iter().map(|(n, w)| (n.to_string(), *w)).collect()
    }

    #[test]
    fn test_simple_split() {
        let p = prorate(dec!(100), &weights(&[("A", dec!(10)), ("B", dec!(30))]));
        assert_eq!(p.amount_for("A"), dec!(25));
        assert_eq!(p.amount_for("B"), dec!(75));
        assert_eq!(p.allocated, dec!(100));
        assert_eq!(p.undistributed, Decimal::ZERO);
        assert_eq!(p.total_weight, dec!(40));
    }

    #[test]
    fn test_zero_total_short_circuits() {
        let p = prorate(Decimal::ZERO, &weights(&[("A", dec!(10)), ("B", dec!(30))]));
        assert!(p.shares.iter().all(|s| s.amount.is_zero()));
        assert_eq!(p.undistributed, Decimal::ZERO);
    }

    #[test]
    fn test_no_weight_leaves_total_undistributed() {
        let p = prorate(dec!(50), &weights(&[("A", Decimal::ZERO), ("B", dec!(-5))]));
        assert!(p.shares.iter().all(|s| s.amount.is_zero()));
        assert_eq!(p.allocated, Decimal::ZERO);
        assert_eq!(p.undistributed, dec!(50));
    }

    #[test]
    fn test_non_positive_weights_get_nothing() {
        let p = prorate(
            dec!(90),
            &weights(&[("A", dec!(1)), ("B", Decimal::ZERO), ("C", dec!(-4)), ("D", dec!(2))]),
        );
        assert_eq!(p.amount_for("A"), dec!(30));
        assert_eq!(p.amount_for("B"), Decimal::ZERO);
        assert_eq!(p.amount_for("C"), Decimal::ZERO);
        assert_eq!(p.amount_for("D"), dec!(60));
    }

    #[test]
    fn test_preserves_input_order() {
        let p = prorate(dec!(10), &weights(&[("Z", dec!(1)), ("A", dec!(1)), ("M", dec!(1))]));
        let names: Vec<&str> = p.shares.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Z", "A", "M"]);
    }

    #[test]
    fn test_repeating_thirds_sum_within_tolerance() {
        let p = prorate(dec!(100), &weights(&[("A", dec!(1)), ("B", dec!(1)), ("C", dec!(1))]));
        assert!(approx_eq(p.allocated, dec!(100), dec!(0.000001)));
        assert!(approx_eq(p.amount_for("A"), dec!(33.333333), dec!(0.000001)));
    }

    #[test]
    fn test_empty_weights() {
        let p = prorate(dec!(100), &[]);
        assert!(p.shares.is_empty());
        assert_eq!(p.undistributed, dec!(100));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let p = prorate(dec!(100), &weights(&[("A", dec!(10)), ("B", dec!(30))]));
        let json = serde_json::to_string(&p).unwrap();
        let back: Proration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_try_prorate_rejects_negative_total() {
        let err = try_prorate(dec!(-100), &weights(&[("A", dec!(1))])).unwrap_err();
        assert!(matches!(err, AllocationError::InvalidInput { ref field, .. } if field == "total"));
    }

    #[test]
    fn test_try_prorate_rejects_overflowing_weights() {
        let err = try_prorate(dec!(100), &weights(&[("A", Decimal::MAX), ("B", Decimal::MAX)]))
            .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidInput { ref field, .. } if field == "weights"));
    }

    #[test]
    fn test_try_prorate_matches_prorate() {
        let w = weights(&[("A", dec!(10)), ("B", dec!(30))]);
        assert_eq!(try_prorate(dec!(100), &w).unwrap(), prorate(dec!(100), &w));
    }

    #[test]
    fn test_huge_weights_do_not_panic() {
        let p = prorate(dec!(100), &weights(&[("A", Decimal::MAX), ("B", Decimal::MAX)]));
        assert_eq!(p.total_weight, Decimal::MAX);
        assert_eq!(p.shares.len(), 2);
    }
}
