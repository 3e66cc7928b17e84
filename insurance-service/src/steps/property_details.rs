use async_trait::async_trait;
use case_flow::{Context, Result, Step, StepAction, StepResult};
use chrono::{Datelike, Utc};
use tracing::info;

use crate::domain::{PropertyDetails, PropertyType};

use super::{session_keys, utils};

/// Step 3 (property branch): the insured property and its rating inputs.
pub struct PropertyDetailsStep;

#[async_trait]
impl Step for PropertyDetailsStep {
    fn id(&self) -> &str {
        "property_details"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }
        let form = utils::submitted_form(&context).await;

        let mut problems = Vec::new();
        let address = utils::text_field(&form, "address");
        if address.is_none() {
            problems.push("address is required".to_string());
        }
        let property_type = match utils::text_field(&form, "property_type") {
            Some(value) => match value.parse::<PropertyType>() {
                Ok(parsed) => Some(parsed),
                Err(message) => {
                    problems.push(message);
                    None
                }
            },
            None => {
                problems
                    .push("property_type is required (apartment, house or commercial)".to_string());
                None
            }
        };

        let current_year = Utc::now().year() as u32;
        let year_built = utils::integer_field(&form, "year_built");
        match year_built {
            Some(year) if (1800..=current_year).contains(&year) => {}
            Some(year) => problems.push(format!("year_built {year} is out of range")),
            None => problems.push("year_built is required".to_string()),
        }
        let sum_insured = utils::number_field(&form, "sum_insured");
        match sum_insured {
            Some(value) if value > 0.0 => {}
            Some(_) => problems.push("sum_insured must be greater than zero".to_string()),
            None => problems.push("sum_insured is required".to_string()),
        }

        if !problems.is_empty() {
            return Ok(utils::validation_result(problems));
        }

        let details = PropertyDetails {
            address: address.expect("validated above"),
            property_type: property_type.expect("validated above"),
            year_built: year_built.expect("validated above"),
            sum_insured: sum_insured.expect("validated above"),
        };
        info!(
            property_type = %details.property_type,
            sum_insured = %details.sum_insured,
            "property details collected"
        );
        context.set(session_keys::PROPERTY_DETAILS, details).await;

        Ok(StepResult::with_status(
            Some("Property details recorded. Select coverage options.".to_string()),
            StepAction::Advance,
            "property details collected",
        ))
    }
}
