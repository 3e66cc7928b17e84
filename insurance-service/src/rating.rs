//! Premium rating tables. Everything here is pure arithmetic over flat
//! constants: the same inputs always produce the same premium. The tables are
//! illustrative demo rates, not an actuarial model.

use serde::{Deserialize, Serialize};

use crate::domain::{FuelType, PropertyType, VehicleDetails, VehicleType};

/// Annual vehicle premium before multipliers, as a fraction of IDV.
pub const VEHICLE_BASE_RATE: f64 = 0.03;

/// Annual property premium before multipliers, as a fraction of sum insured.
pub const PROPERTY_BASE_RATE: f64 = 0.0025;

/// Recognised no-claim-bonus tiers, in percent.
pub const NCB_TIERS: [u32; 6] = [0, 20, 25, 35, 45, 50];

pub fn vehicle_type_multiplier(vehicle_type: VehicleType) -> f64 {
    match vehicle_type {
        VehicleType::Car => 1.0,
        VehicleType::Bike => 0.7,
        VehicleType::Commercial => 1.4,
    }
}

pub fn fuel_multiplier(fuel_type: FuelType) -> f64 {
    match fuel_type {
        FuelType::Petrol => 1.0,
        FuelType::Diesel => 1.15,
        FuelType::Cng => 1.1,
        FuelType::Electric => 0.9,
    }
}

pub fn driver_age_multiplier(age: u32) -> f64 {
    match age {
        0..=25 => 1.25,
        26..=40 => 1.0,
        41..=60 => 1.05,
        _ => 1.15,
    }
}

/// Discount fraction for an NCB tier, or `None` for an unrecognised tier.
pub fn ncb_discount(tier_percent: u32) -> Option<f64> {
    NCB_TIERS
        .contains(&tier_percent)
        .then(|| f64::from(tier_percent) / 100.0)
}

/// Discount fraction for a voluntary deductible amount, or `None` for an
/// amount outside the tier table.
pub fn deductible_discount(amount: u32) -> Option<f64> {
    match amount {
        0 => Some(0.0),
        2500 => Some(0.05),
        5000 => Some(0.10),
        7500 => Some(0.125),
        15000 => Some(0.15),
        _ => None,
    }
}

pub fn property_type_multiplier(property_type: PropertyType) -> f64 {
    match property_type {
        PropertyType::Apartment => 1.0,
        PropertyType::House => 1.2,
        PropertyType::Commercial => 1.5,
    }
}

/// Older construction rates higher. `reference_year` lets callers pin the
/// calculation to a fixed year so a quote stays reproducible.
pub fn construction_age_multiplier(year_built: u32, reference_year: u32) -> f64 {
    let age = reference_year.saturating_sub(year_built);
    match age {
        0..=10 => 1.0,
        11..=30 => 1.1,
        _ => 1.25,
    }
}

/// One multiplicative line item of a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLine {
    pub label: String,
    pub factor: f64,
}

/// Fully itemised premium: `premium` equals `base_amount * base_rate` times
/// every line factor, rounded to two decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    pub base_amount: f64,
    pub base_rate: f64,
    pub lines: Vec<QuoteLine>,
    pub premium: f64,
}

impl QuoteBreakdown {
    fn compute(base_amount: f64, base_rate: f64, lines: Vec<QuoteLine>) -> Self {
        let mut premium = base_amount * base_rate;
        for line in &lines {
            premium *= line.factor;
        }
        Self {
            base_amount,
            base_rate,
            lines,
            premium: round2(premium),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("unrecognised NCB tier: {0}%")]
    UnknownNcbTier(u32),
    #[error("unrecognised deductible amount: {0}")]
    UnknownDeductible(u32),
}

/// Quote a vehicle risk: IDV x base rate x vehicle type x fuel x driver age
/// x (1 - NCB discount) x (1 - deductible discount).
pub fn vehicle_quote(
    details: &VehicleDetails,
    deductible: u32,
) -> Result<QuoteBreakdown, RatingError> {
    let ncb = ncb_discount(details.ncb_tier)
        .ok_or(RatingError::UnknownNcbTier(details.ncb_tier))?;
    let deductible_off =
        deductible_discount(deductible).ok_or(RatingError::UnknownDeductible(deductible))?;

    let lines = vec![
        QuoteLine {
            label: format!("vehicle type ({})", details.vehicle_type),
            factor: vehicle_type_multiplier(details.vehicle_type),
        },
        QuoteLine {
            label: format!("fuel ({})", details.fuel_type),
            factor: fuel_multiplier(details.fuel_type),
        },
        QuoteLine {
            label: format!("driver age ({})", details.driver_age),
            factor: driver_age_multiplier(details.driver_age),
        },
        QuoteLine {
            label: format!("no-claim bonus ({}%)", details.ncb_tier),
            factor: 1.0 - ncb,
        },
        QuoteLine {
            label: format!("deductible ({deductible})"),
            factor: 1.0 - deductible_off,
        },
    ];

    Ok(QuoteBreakdown::compute(details.idv, VEHICLE_BASE_RATE, lines))
}

/// Quote a property risk: sum insured x base rate x property type
/// x construction age x (1 - deductible discount).
pub fn property_quote(
    details: &crate::domain::PropertyDetails,
    deductible: u32,
    reference_year: u32,
) -> Result<QuoteBreakdown, RatingError> {
    let deductible_off =
        deductible_discount(deductible).ok_or(RatingError::UnknownDeductible(deductible))?;

    let lines = vec![
        QuoteLine {
            label: format!("property type ({})", details.property_type),
            factor: property_type_multiplier(details.property_type),
        },
        QuoteLine {
            label: format!("construction year ({})", details.year_built),
            factor: construction_age_multiplier(details.year_built, reference_year),
        },
        QuoteLine {
            label: format!("deductible ({deductible})"),
            factor: 1.0 - deductible_off,
        },
    ];

    Ok(QuoteBreakdown::compute(
        details.sum_insured,
        PROPERTY_BASE_RATE,
        lines,
    ))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PropertyDetails;

    fn sample_vehicle() -> VehicleDetails {
        VehicleDetails {
            make: "Honda".to_string(),
            model: "City".to_string(),
            year: 2021,
            vehicle_type: VehicleType::Car,
            fuel_type: FuelType::Petrol,
            registration: "KA-01-AB-1234".to_string(),
            idv: 500_000.0,
            driver_age: 30,
            ncb_tier: 20,
        }
    }

    #[test]
    fn vehicle_quote_is_deterministic() {
        let details = sample_vehicle();
        let first = vehicle_quote(&details, 5000).unwrap();
        let second = vehicle_quote(&details, 5000).unwrap();
        assert_eq!(first.premium, second.premium);

        // 500_000 * 0.03 * 1.0 * 1.0 * 1.0 * 0.8 * 0.9 = 10_800
        assert_eq!(first.premium, 10_800.0);
    }

    #[test]
    fn vehicle_multipliers_all_apply() {
        let details = VehicleDetails {
            vehicle_type: VehicleType::Commercial,
            fuel_type: FuelType::Diesel,
            driver_age: 22,
            ncb_tier: 0,
            idv: 100_000.0,
            ..sample_vehicle()
        };
        let quote = vehicle_quote(&details, 0).unwrap();
        // 100_000 * 0.03 * 1.4 * 1.15 * 1.25 * 1.0 * 1.0 = 6037.5
        assert_eq!(quote.premium, 6037.5);
        assert_eq!(quote.lines.len(), 5);
    }

    #[test]
    fn unknown_ncb_tier_is_rejected() {
        let details = VehicleDetails {
            ncb_tier: 37,
            ..sample_vehicle()
        };
        assert_eq!(
            vehicle_quote(&details, 0).unwrap_err(),
            RatingError::UnknownNcbTier(37)
        );
    }

    #[test]
    fn unknown_deductible_is_rejected() {
        let details = sample_vehicle();
        assert_eq!(
            vehicle_quote(&details, 123).unwrap_err(),
            RatingError::UnknownDeductible(123)
        );
    }

    #[test]
    fn property_quote_rates_by_type_and_age() {
        let details = PropertyDetails {
            address: "456 Oak Ave".to_string(),
            property_type: PropertyType::House,
            year_built: 1990,
            sum_insured: 250_000.0,
        };
        let quote = property_quote(&details, 2500, 2024).unwrap();
        // 250_000 * 0.0025 * 1.2 * 1.25 * 0.95 = 890.63 (rounded)
        assert_eq!(quote.premium, 890.63);
    }

    #[test]
    fn driver_age_brackets() {
        assert_eq!(driver_age_multiplier(25), 1.25);
        assert_eq!(driver_age_multiplier(26), 1.0);
        assert_eq!(driver_age_multiplier(41), 1.05);
        assert_eq!(driver_age_multiplier(61), 1.15);
    }

    #[test]
    fn ncb_tiers_match_the_table() {
        for tier in NCB_TIERS {
            assert!(ncb_discount(tier).is_some());
        }
        assert!(ncb_discount(10).is_none());
    }
}
