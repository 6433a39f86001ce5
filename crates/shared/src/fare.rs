//! Fare table and deterministic fare breakdown.
//!
//! All arithmetic uses [`Decimal`] so breakdowns are exact and reproducible;
//! totals are rounded half-up to two decimals.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::geo::{estimate_duration_minutes, AVG_CITY_SPEED_KMH};

/// Per-vehicle-class pricing parameters.
#[derive(Debug, Clone)]
pub struct FareConfig {
    pub base: Decimal,
    pub per_km: Decimal,
    pub per_min: Decimal,
    pub min_fare: Decimal,
}

impl FareConfig {
    /// Pricing for a vehicle class. Unknown classes fall back to `mini`.
    pub fn for_vehicle(vehicle: &str) -> Self {
        match vehicle {
            "auto" => Self {
                base: Decimal::new(25, 0),
                per_km: Decimal::new(8, 0),
                per_min: Decimal::new(10, 1),
                min_fare: Decimal::new(30, 0),
            },
            "sedan" => Self {
                base: Decimal::new(60, 0),
                per_km: Decimal::new(14, 0),
                per_min: Decimal::new(20, 1),
                min_fare: Decimal::new(80, 0),
            },
            "suv" => Self {
                base: Decimal::new(80, 0),
                per_km: Decimal::new(18, 0),
                per_min: Decimal::new(25, 1),
                min_fare: Decimal::new(100, 0),
            },
            _ => Self {
                base: Decimal::new(40, 0),
                per_km: Decimal::new(10, 0),
                per_min: Decimal::new(15, 1),
                min_fare: Decimal::new(50, 0),
            },
        }
    }
}

/// Itemized fare for a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub base_fare: Decimal,
    pub distance_fare: Decimal,
    pub time_fare: Decimal,
    pub surge_multiplier: Decimal,
    pub total_fare: Decimal,
}

fn dec(value: f64) -> Decimal {
    // Parse the shortest decimal form of the float, so 0.1 enters the
    // arithmetic as 0.1 and not its binary expansion.
    value.to_string().parse().unwrap_or_default()
}

/// Compute the fare breakdown for a measured trip.
///
/// `total = max(min_fare, (base + distance + time) * surge)`, rounded
/// half-up to two decimals.
pub fn calculate_fare(
    vehicle: &str,
    distance_km: f64,
    duration_min: f64,
    surge_multiplier: Decimal,
) -> FareBreakdown {
    let cfg = FareConfig::for_vehicle(vehicle);

    let distance_fare = dec(distance_km) * cfg.per_km;
    let time_fare = dec(duration_min) * cfg.per_min;
    let subtotal = cfg.base + distance_fare + time_fare;

    let total = (subtotal * surge_multiplier)
        .max(cfg.min_fare)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    FareBreakdown {
        base_fare: cfg.base.round_dp(2),
        distance_fare: distance_fare.round_dp(2),
        time_fare: time_fare.round_dp(2),
        surge_multiplier: surge_multiplier.round_dp(2),
        total_fare: total,
    }
}

/// Quick estimate for an unstarted trip, assuming average city speed.
pub fn estimate_fare(vehicle: &str, distance_km: f64, surge_multiplier: Decimal) -> Decimal {
    let duration_min = if distance_km > 0.0 {
        estimate_duration_minutes(distance_km, AVG_CITY_SPEED_KMH)
    } else {
        0.0
    };
    calculate_fare(vehicle, distance_km, duration_min, surge_multiplier).total_fare
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_auto_breakdown() {
        let fare = calculate_fare("auto", 10.0, 20.0, dec!(1.0));
        assert_eq!(fare.base_fare, dec!(25.00));
        assert_eq!(fare.distance_fare, dec!(80.00));
        assert_eq!(fare.time_fare, dec!(20.00));
        assert_eq!(fare.total_fare, dec!(125.00));
    }

    #[test]
    fn test_mini_breakdown() {
        let fare = calculate_fare("mini", 10.0, 20.0, dec!(1.0));
        assert_eq!(fare.base_fare, dec!(40.00));
        assert_eq!(fare.distance_fare, dec!(100.00));
        assert_eq!(fare.time_fare, dec!(30.00));
        assert_eq!(fare.total_fare, dec!(170.00));
    }

    #[test]
    fn test_sedan_breakdown() {
        let fare = calculate_fare("sedan", 10.0, 20.0, dec!(1.0));
        assert_eq!(fare.total_fare, dec!(240.00));
    }

    #[test]
    fn test_suv_breakdown() {
        let fare = calculate_fare("suv", 10.0, 20.0, dec!(1.0));
        assert_eq!(fare.total_fare, dec!(310.00));
    }

    #[test]
    fn test_unknown_vehicle_falls_back_to_mini() {
        let fare = calculate_fare("rickshaw", 10.0, 20.0, dec!(1.0));
        assert_eq!(fare.total_fare, dec!(170.00));
    }

    #[test]
    fn test_surge_doubles_total() {
        let normal = calculate_fare("mini", 10.0, 20.0, dec!(1.0));
        let surged = calculate_fare("mini", 10.0, 20.0, dec!(2.0));
        assert_eq!(surged.total_fare, normal.total_fare * dec!(2));
    }

    #[test]
    fn test_surge_multiplier_recorded() {
        let fare = calculate_fare("sedan", 5.0, 10.0, dec!(1.75));
        assert_eq!(fare.surge_multiplier, dec!(1.75));
    }

    #[test]
    fn test_minimum_fare_enforced() {
        for (vehicle, min_fare) in [
            ("auto", dec!(30.00)),
            ("mini", dec!(50.00)),
            ("sedan", dec!(80.00)),
            ("suv", dec!(100.00)),
        ] {
            let fare = calculate_fare(vehicle, 0.0, 0.0, dec!(1.0));
            assert_eq!(fare.total_fare, min_fare);
        }
    }

    #[test]
    fn test_minimum_fare_not_multiplied_by_surge() {
        // Surge scales the subtotal, then the floor applies.
        let fare = calculate_fare("mini", 0.0, 0.0, dec!(3.0));
        assert_eq!(fare.total_fare, dec!(120.00));
    }

    #[test]
    fn test_decimal_inputs_stay_exact() {
        // 0.1 km and 0.2 min are not exact in binary; the breakdown items
        // must still come out as clean decimals.
        let fare = calculate_fare("mini", 0.1, 0.2, dec!(1.0));
        assert_eq!(fare.distance_fare, dec!(1.00));
        assert_eq!(fare.time_fare, dec!(0.30));
    }

    #[test]
    fn test_rounding_half_up() {
        // 0.0005 km * 10 = 0.005, which rounds up to 0.01.
        let fare = calculate_fare("mini", 0.0005, 0.0, dec!(1.0));
        assert_eq!(fare.distance_fare, dec!(0.01));
    }

    #[test]
    fn test_estimate_at_zero_distance_is_min_fare() {
        assert_eq!(estimate_fare("auto", 0.0, dec!(1.0)), dec!(30.00));
        assert_eq!(estimate_fare("suv", 0.0, dec!(2.5)), dec!(200.00));
    }

    #[test]
    fn test_estimate_uses_city_speed() {
        // 5 km at 25 km/h is 12 minutes: 40 + 50 + 18 = 108.
        assert_eq!(estimate_fare("mini", 5.0, dec!(1.0)), dec!(108.00));
    }
}
