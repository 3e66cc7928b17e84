use async_trait::async_trait;
use case_flow::{Context, Result, Step, StepAction, StepResult};
use tracing::info;

use crate::domain::CoverageSelection;
use crate::rating;

use super::{session_keys, utils};

/// Step 4: deductible tier and optional add-ons. Advances straight into the
/// quote step so the premium appears without an extra submission.
pub struct CoverageStep;

#[async_trait]
impl Step for CoverageStep {
    fn id(&self) -> &str {
        "coverage"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }
        let form = utils::submitted_form(&context).await;

        let deductible = match utils::integer_field(&form, "deductible") {
            Some(amount) => amount,
            None => {
                return Ok(utils::validation_result(vec![
                    "deductible is required (0, 2500, 5000, 7500 or 15000)".to_string(),
                ]));
            }
        };
        if rating::deductible_discount(deductible).is_none() {
            return Ok(utils::validation_result(vec![format!(
                "deductible must be one of 0, 2500, 5000, 7500 or 15000, got {deductible}"
            )]));
        }

        let selection = CoverageSelection {
            deductible,
            addons: utils::string_list_field(&form, "addons"),
        };
        info!(deductible = %selection.deductible, addons = ?selection.addons, "coverage selected");
        context.set(session_keys::COVERAGE, selection).await;

        Ok(StepResult::with_status(
            None,
            StepAction::AdvanceAndRun,
            "coverage selected - computing quote",
        ))
    }
}
