use async_trait::async_trait;
use case_flow::{Context, Result, Step, StepAction, StepResult};

use super::utils;

/// Step 8: the declaration checkbox must be ticked before the case can be
/// issued.
pub struct DeclarationsStep;

#[async_trait]
impl Step for DeclarationsStep {
    fn id(&self) -> &str {
        "declarations"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }
        let form = utils::submitted_form(&context).await;

        if !utils::flag_field(&form, "declaration_accepted") {
            return Ok(utils::validation_result(vec![
                "the declaration must be accepted (declaration_accepted=true)".to_string(),
            ]));
        }
        Ok(StepResult::with_status(
            Some("Declaration accepted. Submit once more to issue the case.".to_string()),
            StepAction::Advance,
            "declaration accepted",
        ))
    }
}
