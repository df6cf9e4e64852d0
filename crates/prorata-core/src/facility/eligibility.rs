use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::availability::Vehicle;

/// Loan facility within a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facility {
    TermLoan,
    Revolver,
    Ddtl,
}

impl Facility {
    /// Facilities in report order.
    pub const ALL: [Facility; 3] = [Facility::TermLoan, Facility::Revolver, Facility::Ddtl];

    /// Short label used in report headers.
    pub fn label(&self) -> &'static str {
        match self {
            Facility::TermLoan => "TL",
            Facility::Revolver => "REV",
            Facility::Ddtl => "DDTL",
        }
    }
}

impl std::fmt::Display for Facility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facility::TermLoan => write!(f, "Term Loan"),
            Facility::Revolver => write!(f, "Revolver"),
            Facility::Ddtl => write!(f, "DDTL"),
        }
    }
}

/// Whether `vehicle` participates in `facility`.
///
/// Term Loan has no opt-out; Revolver and DDTL need the matching toggle.
pub fn is_eligible(vehicle: &Vehicle, facility: Facility) -> bool {
    if !vehicle.has_availability() {
        return false;
    }
    match facility {
        Facility::TermLoan => true,
        Facility::Revolver => vehicle.revolver_on,
        Facility::Ddtl => vehicle.ddtl_on,
    }
}

/// Proration weights for one facility, one entry per vehicle in input
/// order. Ineligible vehicles carry a zero weight; eligible ones carry
/// their full availability.
pub fn facility_weights(vehicles: &[Vehicle], facility: Facility) -> Vec<(String, Decimal)> {
    vehicles
        .iter()
        .map(|v| {
            let weight = if is_eligible(v, facility) {
                v.availability()
            } else {
                Decimal::ZERO
            };
            (v.name.clone(), weight)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn vehicle(name: &str, cash: Decimal, revolver_on: bool, ddtl_on: bool) -> Vehicle {
        Vehicle {
            name: name.into(),
            cash,
            unfunded_commitments: Decimal::ZERO,
            uncalled_capital: Decimal::ZERO,
            revolver_on,
            ddtl_on,
            target_hold: None,
        }
    }

    #[test]
    fn test_term_loan_ignores_toggles() {
        let v = vehicle("A", dec!(10), false, false);
        assert!(is_eligible(&v, Facility::TermLoan));
        assert!(!is_eligible(&v, Facility::Revolver));
        assert!(!is_eligible(&v, Facility::Ddtl));
    }

    #[test]
    fn test_toggles_gate_revolver_and_ddtl() {
        let v = vehicle("A", dec!(10), true, false);
        assert!(is_eligible(&v, Facility::Revolver));
        assert!(!is_eligible(&v, Facility::Ddtl));
        let v = vehicle("B", dec!(10), false, true);
        assert!(!is_eligible(&v, Facility::Revolver));
        assert!(is_eligible(&v, Facility::Ddtl));
    }

    #[test]
    fn test_no_availability_blocks_every_facility() {
        let v = vehicle("A", Decimal::ZERO, true, true);
        for f in Facility::ALL {
            assert!(!is_eligible(&v, f), "{f} should be blocked");
        }
    }

    #[test]
    fn test_weights_keep_full_availability() {
        let vehicles = vec![
            vehicle("A", dec!(10), false, false),
            vehicle("B", dec!(30), true, false),
        ];
        let w = facility_weights(&vehicles, Facility::Revolver);
        assert_eq!(w, vec![("A".to_string(), Decimal::ZERO), ("B".to_string(), dec!(30))]);
        let w = facility_weights(&vehicles, Facility::TermLoan);
        assert_eq!(w[0].1, dec!(10));
        assert_eq!(w[1].1, dec!(30));
    }

    #[test]
    fn test_labels_and_serde_names() {
        assert_eq!(Facility::Ddtl.label(), "DDTL");
        assert_eq!(Facility::TermLoan.to_string(), "Term Loan");
        assert_eq!(serde_json::to_string(&Facility::TermLoan).unwrap(), "\"term_loan\"");
    }
}
