use async_trait::async_trait;
use case_flow::{Context, Result, Step, StepAction, StepResult};
use tracing::info;

use crate::domain::CustomerDetails;

use super::{session_keys, utils};

/// Step 1: lead contact details.
pub struct CustomerDetailsStep;

#[async_trait]
impl Step for CustomerDetailsStep {
    fn id(&self) -> &str {
        "customer_details"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }
        let form = utils::submitted_form(&context).await;

        let mut problems = Vec::new();
        let name = utils::text_field(&form, "name");
        if name.is_none() {
            problems.push("name is required".to_string());
        }
        let email = utils::text_field(&form, "email");
        match &email {
            None => problems.push("email is required".to_string()),
            Some(value) if !value.contains('@') => {
                problems.push("email must contain '@'".to_string())
            }
            Some(_) => {}
        }
        let phone = utils::text_field(&form, "phone");
        if phone.is_none() {
            problems.push("phone is required".to_string());
        }
        if !problems.is_empty() {
            return Ok(utils::validation_result(problems));
        }

        let details = CustomerDetails {
            name: name.expect("validated above"),
            email: email.expect("validated above"),
            phone: phone.expect("validated above"),
        };
        info!(customer = %details.name, "customer details collected");
        context.set(session_keys::CUSTOMER, details).await;

        Ok(StepResult::with_status(
            Some("Customer details recorded. Choose the insurance type: vehicle or property.".to_string()),
            StepAction::Advance,
            "customer details collected",
        ))
    }
}
