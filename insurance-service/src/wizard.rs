//! Assembly of the case creation flow: nine numbered screens, with the
//! product-details screen branching on the insurance type selected in step 2.

use std::sync::Arc;

use case_flow::{Flow, FlowBuilder};

use crate::steps::{
    CoverageStep, CustomerDetailsStep, DeclarationsStep, DocumentsStep, InsuranceTypeStep,
    IssueStep, PropertyDetailsStep, QuoteStep, ReviewStep, VehicleDetailsStep, session_keys,
    types::INSURANCE_TYPE_VEHICLE,
};

pub const CASE_FLOW_ID: &str = "case_creation";

pub fn create_case_flow() -> Flow {
    let customer_details = Arc::new(CustomerDetailsStep);
    let insurance_type = Arc::new(InsuranceTypeStep);
    let vehicle_details = Arc::new(VehicleDetailsStep);
    let property_details = Arc::new(PropertyDetailsStep);
    let coverage = Arc::new(CoverageStep);
    let quote = Arc::new(QuoteStep);
    let review = Arc::new(ReviewStep);
    let documents = Arc::new(DocumentsStep);
    let declarations = Arc::new(DeclarationsStep);
    let issue = Arc::new(IssueStep);

    FlowBuilder::new(CASE_FLOW_ID)
        .add_step(customer_details)
        .add_step(insurance_type)
        .add_step(vehicle_details)
        .add_step(property_details)
        .add_step(coverage)
        .add_step(quote)
        .add_step(review)
        .add_step(documents)
        .add_step(declarations)
        .add_step(issue)
        .add_edge("customer_details", "insurance_type")
        // Branch on the selected product line; property is the default path.
        .add_conditional_edge("insurance_type", "vehicle_details", |ctx| {
            ctx.get_sync::<String>(session_keys::INSURANCE_TYPE)
                .map(|t| t == INSURANCE_TYPE_VEHICLE)
                .unwrap_or(false)
        })
        .add_edge("insurance_type", "property_details")
        .add_edge("vehicle_details", "coverage")
        .add_edge("property_details", "coverage")
        .add_edge("coverage", "quote")
        .add_edge("quote", "review")
        .add_edge("review", "documents")
        .add_edge("documents", "declarations")
        .add_edge("declarations", "issue")
        .build()
}

/// Screen number (1-9) and title for a step id. Both product-details screens
/// are step 3.
pub fn step_info(step_id: &str) -> (u8, &'static str) {
    match step_id {
        "customer_details" => (1, "Customer details"),
        "insurance_type" => (2, "Insurance type"),
        "vehicle_details" => (3, "Vehicle details"),
        "property_details" => (3, "Property details"),
        "coverage" => (4, "Coverage selection"),
        "quote" => (5, "Premium quote"),
        "review" => (6, "Review"),
        "documents" => (7, "Documents"),
        "declarations" => (8, "Declarations"),
        "issue" => (9, "Issue"),
        _ => (0, "Unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_flow::{CaseSession, ExecutionOutcome, ExecutionStatus};
    use serde_json::{Value, json};

    use crate::domain::CaseRecord;

    async fn submit(flow: &Flow, session: &mut CaseSession, fields: Value) -> ExecutionOutcome {
        session.context.set(session_keys::FORM, fields).await;
        flow.execute_session(session).await.unwrap()
    }

    fn new_session(flow: &Flow) -> CaseSession {
        CaseSession::new_from_step("wizard-1".to_string(), &flow.start_step_id().unwrap())
    }

    fn customer_fields() -> Value {
        json!({"name": "John Doe", "email": "john@example.com", "phone": "+1-555-0123"})
    }

    fn vehicle_fields() -> Value {
        json!({
            "make": "Honda", "model": "City", "year": 2021,
            "vehicle_type": "car", "fuel_type": "petrol",
            "registration": "KA-01-AB-1234", "idv": 500000.0,
            "driver_age": 30, "ncb_tier": 20
        })
    }

    #[tokio::test]
    async fn vehicle_happy_path_issues_a_case() {
        let flow = create_case_flow();
        let mut session = new_session(&flow);

        submit(&flow, &mut session, customer_fields()).await;
        assert_eq!(session.current_step_id, "insurance_type");

        submit(&flow, &mut session, json!({"insurance_type": "vehicle"})).await;
        assert_eq!(session.current_step_id, "vehicle_details");

        submit(&flow, &mut session, vehicle_fields()).await;
        assert_eq!(session.current_step_id, "coverage");

        // Coverage chains straight into the quote.
        let outcome = submit(&flow, &mut session, json!({"deductible": 5000})).await;
        assert_eq!(session.current_step_id, "review");
        let quote_text = outcome.response.unwrap();
        assert!(quote_text.contains("Annual premium: $10800.00"), "{quote_text}");

        submit(&flow, &mut session, json!({"confirmed": true})).await;
        assert_eq!(session.current_step_id, "documents");

        submit(&flow, &mut session, json!({"documents": ["rc_book.pdf"]})).await;
        assert_eq!(session.current_step_id, "declarations");

        submit(&flow, &mut session, json!({"declaration_accepted": true})).await;
        assert_eq!(session.current_step_id, "issue");

        let outcome = submit(&flow, &mut session, json!({})).await;
        assert_eq!(outcome.status, ExecutionStatus::Completed);

        let case: CaseRecord = session
            .context
            .get(session_keys::ISSUED_CASE)
            .await
            .unwrap();
        assert!(case.reference.starts_with("CASE-"));
        assert_eq!(case.quote.premium, 10_800.0);
        assert_eq!(case.customer.name, "John Doe");
        assert!(case.vehicle.is_some());
        assert!(case.property.is_none());
        assert_eq!(case.documents, vec!["rc_book.pdf".to_string()]);
    }

    #[tokio::test]
    async fn property_branch_is_selected_for_property_cases() {
        let flow = create_case_flow();
        let mut session = new_session(&flow);

        submit(&flow, &mut session, customer_fields()).await;
        submit(&flow, &mut session, json!({"insurance_type": "property"})).await;
        assert_eq!(session.current_step_id, "property_details");

        submit(
            &flow,
            &mut session,
            json!({
                "address": "456 Oak Ave", "property_type": "house",
                "year_built": 1990, "sum_insured": 250000.0
            }),
        )
        .await;
        assert_eq!(session.current_step_id, "coverage");

        let outcome = submit(&flow, &mut session, json!({"deductible": 2500})).await;
        assert_eq!(session.current_step_id, "review");
        assert!(outcome.response.unwrap().contains("Annual premium"));
    }

    #[tokio::test]
    async fn missing_required_fields_stay_on_the_step() {
        let flow = create_case_flow();
        let mut session = new_session(&flow);

        let outcome = submit(&flow, &mut session, json!({"name": "John Doe"})).await;
        assert_eq!(session.current_step_id, "customer_details");
        let message = outcome.response.unwrap();
        assert!(message.contains("email is required"));
        assert!(message.contains("phone is required"));

        // Nothing was stored for the incomplete submission.
        assert!(
            session
                .context
                .get::<Value>(session_keys::CUSTOMER)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn invalid_enum_values_are_reported() {
        let flow = create_case_flow();
        let mut session = new_session(&flow);

        submit(&flow, &mut session, customer_fields()).await;
        let outcome = submit(&flow, &mut session, json!({"insurance_type": "boat"})).await;
        assert_eq!(session.current_step_id, "insurance_type");
        assert!(outcome.response.unwrap().contains("vehicle or property"));
    }

    #[tokio::test]
    async fn back_returns_to_the_previous_screen() {
        let flow = create_case_flow();
        let mut session = new_session(&flow);

        submit(&flow, &mut session, customer_fields()).await;
        submit(&flow, &mut session, json!({"insurance_type": "vehicle"})).await;
        assert_eq!(session.current_step_id, "vehicle_details");

        session.context.set(session_keys::NAV_BACK, true).await;
        submit(&flow, &mut session, json!({})).await;
        assert_eq!(session.current_step_id, "insurance_type");

        // The branch can be changed after going back.
        submit(&flow, &mut session, json!({"insurance_type": "property"})).await;
        assert_eq!(session.current_step_id, "property_details");
    }

    #[tokio::test]
    async fn declaration_must_be_accepted() {
        let flow = create_case_flow();
        let mut session = new_session(&flow);
        session.current_step_id = "declarations".to_string();

        let outcome = submit(&flow, &mut session, json!({})).await;
        assert_eq!(session.current_step_id, "declarations");
        assert!(outcome.response.unwrap().contains("declaration"));

        submit(&flow, &mut session, json!({"declaration_accepted": true})).await;
        assert_eq!(session.current_step_id, "issue");
    }

    #[test]
    fn every_step_has_a_screen_number() {
        let flow = create_case_flow();
        for id in [
            "customer_details",
            "insurance_type",
            "vehicle_details",
            "property_details",
            "coverage",
            "quote",
            "review",
            "documents",
            "declarations",
            "issue",
        ] {
            assert!(flow.get_step(id).is_some(), "missing step {id}");
            assert_ne!(step_info(id).0, 0, "missing screen number for {id}");
        }
    }
}
