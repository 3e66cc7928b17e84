use async_trait::async_trait;
use case_flow::{Context, Result, Step, StepAction, StepResult};
use tracing::info;

use super::types::{INSURANCE_TYPE_PROPERTY, INSURANCE_TYPE_VEHICLE};
use super::{session_keys, utils};

/// Step 2: pick the product line. The value stored here drives the
/// conditional edge into either the vehicle or the property details screen.
pub struct InsuranceTypeStep;

#[async_trait]
impl Step for InsuranceTypeStep {
    fn id(&self) -> &str {
        "insurance_type"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }
        let form = utils::submitted_form(&context).await;

        let selected = match utils::text_field(&form, "insurance_type") {
            Some(value) => value.to_ascii_lowercase(),
            None => {
                return Ok(utils::validation_result(vec![
                    "insurance_type is required (vehicle or property)".to_string(),
                ]));
            }
        };
        if selected != INSURANCE_TYPE_VEHICLE && selected != INSURANCE_TYPE_PROPERTY {
            return Ok(utils::validation_result(vec![format!(
                "insurance_type must be vehicle or property, got '{selected}'"
            )]));
        }

        info!(insurance_type = %selected, "insurance type selected");
        context.set(session_keys::INSURANCE_TYPE, &selected).await;

        Ok(StepResult::with_status(
            Some(format!("{selected} insurance selected. Provide the {selected} details.")),
            StepAction::Advance,
            format!("insurance type selected: {selected}"),
        ))
    }
}
