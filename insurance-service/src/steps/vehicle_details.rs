use async_trait::async_trait;
use case_flow::{Context, Result, Step, StepAction, StepResult};
use tracing::info;

use crate::domain::{FuelType, VehicleDetails, VehicleType};
use crate::rating;

use super::{session_keys, utils};

/// Step 3 (vehicle branch): the insured vehicle and its rating inputs.
pub struct VehicleDetailsStep;

#[async_trait]
impl Step for VehicleDetailsStep {
    fn id(&self) -> &str {
        "vehicle_details"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }
        let form = utils::submitted_form(&context).await;

        let mut problems = Vec::new();
        let make = utils::text_field(&form, "make");
        if make.is_none() {
            problems.push("make is required".to_string());
        }
        let model = utils::text_field(&form, "model");
        if model.is_none() {
            problems.push("model is required".to_string());
        }
        let year = utils::integer_field(&form, "year");
        if year.is_none() {
            problems.push("year is required".to_string());
        }
        let registration = utils::text_field(&form, "registration");
        if registration.is_none() {
            problems.push("registration is required".to_string());
        }

        let vehicle_type = match utils::text_field(&form, "vehicle_type") {
            Some(value) => match value.parse::<VehicleType>() {
                Ok(parsed) => Some(parsed),
                Err(message) => {
                    problems.push(message);
                    None
                }
            },
            None => {
                problems.push("vehicle_type is required (car, bike or commercial)".to_string());
                None
            }
        };
        let fuel_type = match utils::text_field(&form, "fuel_type") {
            Some(value) => match value.parse::<FuelType>() {
                Ok(parsed) => Some(parsed),
                Err(message) => {
                    problems.push(message);
                    None
                }
            },
            None => {
                problems.push("fuel_type is required (petrol, diesel, cng or electric)".to_string());
                None
            }
        };

        let idv = utils::number_field(&form, "idv");
        match idv {
            Some(value) if value > 0.0 => {}
            Some(_) => problems.push("idv must be greater than zero".to_string()),
            None => problems.push("idv is required".to_string()),
        }
        let driver_age = utils::integer_field(&form, "driver_age");
        match driver_age {
            Some(age) if age >= 18 => {}
            Some(_) => problems.push("driver_age must be at least 18".to_string()),
            None => problems.push("driver_age is required".to_string()),
        }
        let ncb_tier = utils::integer_field(&form, "ncb_tier").unwrap_or(0);
        if rating::ncb_discount(ncb_tier).is_none() {
            problems.push(format!(
                "ncb_tier must be one of {:?}, got {ncb_tier}",
                rating::NCB_TIERS
            ));
        }

        if !problems.is_empty() {
            return Ok(utils::validation_result(problems));
        }

        let details = VehicleDetails {
            make: make.expect("validated above"),
            model: model.expect("validated above"),
            year: year.expect("validated above"),
            vehicle_type: vehicle_type.expect("validated above"),
            fuel_type: fuel_type.expect("validated above"),
            registration: registration.expect("validated above"),
            idv: idv.expect("validated above"),
            driver_age: driver_age.expect("validated above"),
            ncb_tier,
        };
        info!(
            make = %details.make,
            model = %details.model,
            idv = %details.idv,
            "vehicle details collected"
        );
        context.set(session_keys::VEHICLE_DETAILS, details).await;

        Ok(StepResult::with_status(
            Some("Vehicle details recorded. Select coverage options.".to_string()),
            StepAction::Advance,
            "vehicle details collected",
        ))
    }
}
