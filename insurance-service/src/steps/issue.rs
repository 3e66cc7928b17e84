use async_trait::async_trait;
use case_flow::{Context, FlowError, Result, Step, StepAction, StepResult};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{CaseRecord, CaseStatus, CoverageSelection, CustomerDetails};
use crate::rating::QuoteBreakdown;

use super::{session_keys, utils};

/// Step 9: assemble the final case record and finish the wizard. The HTTP
/// layer appends the record to the tenant store once the flow completes.
pub struct IssueStep;

#[async_trait]
impl Step for IssueStep {
    fn id(&self) -> &str {
        "issue"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }

        let customer: CustomerDetails = context
            .get(session_keys::CUSTOMER)
            .await
            .ok_or_else(|| FlowError::ContextError("customer not found".to_string()))?;
        let coverage: CoverageSelection = context
            .get(session_keys::COVERAGE)
            .await
            .ok_or_else(|| FlowError::ContextError("coverage not found".to_string()))?;
        let quote: QuoteBreakdown = context
            .get(session_keys::QUOTE)
            .await
            .ok_or_else(|| FlowError::ContextError("quote not found".to_string()))?;
        let vehicle = context.get(session_keys::VEHICLE_DETAILS).await;
        let property = context.get(session_keys::PROPERTY_DETAILS).await;
        let documents: Vec<String> = context
            .get(session_keys::DOCUMENTS)
            .await
            .unwrap_or_default();

        let case = CaseRecord {
            id: Uuid::new_v4().to_string(),
            reference: format!("CASE-{:08X}", rand::random::<u32>()),
            status: CaseStatus::Issued,
            customer,
            vehicle,
            property,
            coverage,
            quote,
            documents,
            agent_id: None,
            issued_at: Utc::now(),
        };

        info!(reference = %case.reference, premium = %case.quote.premium, "case issued");
        let response = format!(
            "Case {} issued for {} at ${:.2}/year.",
            case.reference, case.customer.name, case.quote.premium
        );
        let status_message = format!("case issued: {}", case.reference);
        context.set(session_keys::ISSUED_CASE, case).await;

        Ok(StepResult::with_status(
            Some(response),
            StepAction::Complete,
            status_message,
        ))
    }
}
