use async_trait::async_trait;
use case_flow::{Context, FlowError, Result, Step, StepAction, StepResult};
use chrono::{Datelike, Utc};
use tracing::info;

use crate::domain::{CoverageSelection, PropertyDetails, VehicleDetails};
use crate::rating::{self, QuoteBreakdown};

use super::types::INSURANCE_TYPE_VEHICLE;
use super::{session_keys, utils};

/// Step 5: compute the premium from the collected details. Runs chained from
/// the coverage step, presents the breakdown and waits for acknowledgement.
pub struct QuoteStep;

#[async_trait]
impl Step for QuoteStep {
    fn id(&self) -> &str {
        "quote"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }

        let insurance_type: String = context
            .get(session_keys::INSURANCE_TYPE)
            .await
            .ok_or_else(|| FlowError::ContextError("insurance_type not found".to_string()))?;
        let coverage: CoverageSelection = context
            .get(session_keys::COVERAGE)
            .await
            .ok_or_else(|| FlowError::ContextError("coverage not found".to_string()))?;

        let quote = if insurance_type == INSURANCE_TYPE_VEHICLE {
            let vehicle: VehicleDetails = context
                .get(session_keys::VEHICLE_DETAILS)
                .await
                .ok_or_else(|| FlowError::ContextError("vehicle_details not found".to_string()))?;
            rating::vehicle_quote(&vehicle, coverage.deductible)
                .map_err(|e| FlowError::StepFailed(e.to_string()))?
        } else {
            let property: PropertyDetails = context
                .get(session_keys::PROPERTY_DETAILS)
                .await
                .ok_or_else(|| FlowError::ContextError("property_details not found".to_string()))?;
            rating::property_quote(&property, coverage.deductible, Utc::now().year() as u32)
                .map_err(|e| FlowError::StepFailed(e.to_string()))?
        };

        info!(premium = %quote.premium, "quote computed");
        let response = render_quote(&quote);
        context.set(session_keys::QUOTE, quote).await;

        Ok(StepResult::with_status(
            Some(response),
            StepAction::Advance,
            "quote presented",
        ))
    }
}

fn render_quote(quote: &QuoteBreakdown) -> String {
    let mut out = format!(
        "Annual premium: ${:.2}\nBase: ${:.2} at {:.2}%",
        quote.premium,
        quote.base_amount,
        quote.base_rate * 100.0
    );
    for line in &quote.lines {
        out.push_str(&format!("\n  {} x{:.3}", line.label, line.factor));
    }
    out.push_str("\nSubmit again to review the case.");
    out
}
