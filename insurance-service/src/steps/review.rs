use async_trait::async_trait;
use case_flow::{Context, FlowError, Result, Step, StepAction, StepResult};

use crate::domain::CustomerDetails;
use crate::rating::QuoteBreakdown;

use super::{session_keys, utils};

/// Step 6: show the assembled case and require an explicit confirmation
/// before moving on.
pub struct ReviewStep;

#[async_trait]
impl Step for ReviewStep {
    fn id(&self) -> &str {
        "review"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }
        let form = utils::submitted_form(&context).await;

        let customer: CustomerDetails = context
            .get(session_keys::CUSTOMER)
            .await
            .ok_or_else(|| FlowError::ContextError("customer not found".to_string()))?;
        let insurance_type: String = context
            .get(session_keys::INSURANCE_TYPE)
            .await
            .ok_or_else(|| FlowError::ContextError("insurance_type not found".to_string()))?;
        let quote: QuoteBreakdown = context
            .get(session_keys::QUOTE)
            .await
            .ok_or_else(|| FlowError::ContextError("quote not found".to_string()))?;

        if !utils::flag_field(&form, "confirmed") {
            let summary = format!(
                "Review the case before continuing:\n  Customer: {} ({}, {})\n  Product: {} insurance\n  Annual premium: ${:.2}\nResubmit with confirmed=true to accept.",
                customer.name, customer.email, customer.phone, insurance_type, quote.premium
            );
            return Ok(StepResult::with_status(
                Some(summary),
                StepAction::Stay,
                "awaiting review confirmation",
            ));
        }

        Ok(StepResult::with_status(
            Some("Case confirmed. List any supporting documents next.".to_string()),
            StepAction::Advance,
            "review confirmed",
        ))
    }
}
