//! HTTP handlers. Every authenticated route resolves the tenant from the
//! `x-session-token` header; failures map to plain status codes and are
//! logged with the request's correlation span.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use case_flow::{CaseSession, ExecutionStatus, Flow, FlowError, FlowRunner, SessionStore};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::analytics::AnalyticsReport;
use crate::auth::{SessionRegistry, tenant_from_headers, token_from_headers};
use crate::domain::{Activity, Agent, CaseRecord, Claim, ClaimStatus, Payment, Policy, User};
use crate::steps::session_keys;
use crate::store::{
    ClaimView, DashboardSummary, NewClaim, NewPayment, PolicyFilter, Tenant,
};
use crate::wizard::step_info;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub case_flow: Arc<Flow>,
    pub case_sessions: Arc<dyn SessionStore>,
    pub case_runner: FlowRunner,
    /// Wizard session id to owning login token. A session is only visible to
    /// the token that started it.
    case_owners: Arc<DashMap<String, String>>,
}

impl AppState {
    pub fn new(case_flow: Arc<Flow>, case_sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            case_runner: FlowRunner::new(case_flow.clone(), case_sessions.clone()),
            case_flow,
            case_sessions,
            case_owners: Arc::new(DashMap::new()),
        }
    }

    fn tenant(&self, headers: &HeaderMap) -> Result<Arc<Tenant>, StatusCode> {
        tenant_from_headers(&self.registry, headers)
    }

    fn owns_case_session(&self, session_id: &str, token: &str) -> bool {
        self.case_owners
            .get(session_id)
            .map_or(false, |owner| owner.value() == token)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub errors: Vec<String>,
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    match state.registry.login(&request.email, &request.password) {
        Some((token, user)) => Ok(Json(LoginResponse { token, user })),
        None => {
            info!(email = %request.email, "login rejected");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, StatusCode> {
    let token = headers
        .get(crate::auth::SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if state.registry.logout(token) {
        Ok(Json(MessageResponse {
            message: "Logged out; session data discarded".to_string(),
        }))
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardSummary>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    Ok(Json(tenant.dashboard()))
}

pub async fn list_policies(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<PolicyFilter>,
) -> Result<Json<Vec<Policy>>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    Ok(Json(tenant.policies(&filter)))
}

pub async fn get_policy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Policy>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    tenant.policy(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
pub struct ClaimQuery {
    pub status: Option<String>,
}

pub async fn list_claims(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ClaimQuery>,
) -> Result<Json<Vec<ClaimView>>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    let status = match query.status.as_deref() {
        Some(raw) => Some(raw.parse::<ClaimStatus>().map_err(|e| {
            info!(error = %e, "bad claim status filter");
            StatusCode::BAD_REQUEST
        })?),
        None => None,
    };
    Ok(Json(tenant.claims(status)))
}

pub async fn submit_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new_claim): Json<NewClaim>,
) -> Result<(StatusCode, Json<Claim>), (StatusCode, Json<ValidationResponse>)> {
    let tenant = state
        .tenant(&headers)
        .map_err(|code| (code, Json(ValidationResponse { errors: vec![] })))?;
    match tenant.submit_claim(new_claim) {
        Ok(claim) => {
            info!(claim_number = %claim.claim_number, "claim submitted");
            Ok((StatusCode::CREATED, Json(claim)))
        }
        Err(validation) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ValidationResponse {
                errors: validation.0,
            }),
        )),
    }
}

/// Deletion is acknowledged but never performed; the record stays in the
/// session list.
pub async fn delete_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    let claim = tenant
        .claims(None)
        .into_iter()
        .find(|c| c.claim.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(MessageResponse {
        message: format!(
            "Deletion request for claim {} received",
            claim.claim.claim_number
        ),
    }))
}

pub async fn list_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Payment>>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    Ok(Json(tenant.payments()))
}

pub async fn record_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new_payment): Json<NewPayment>,
) -> Result<(StatusCode, Json<Payment>), (StatusCode, Json<ValidationResponse>)> {
    let tenant = state
        .tenant(&headers)
        .map_err(|code| (code, Json(ValidationResponse { errors: vec![] })))?;
    match tenant.record_payment(new_payment) {
        Ok(payment) => Ok((StatusCode::CREATED, Json(payment))),
        Err(validation) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ValidationResponse {
                errors: validation.0,
            }),
        )),
    }
}

pub async fn list_agents(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Agent>>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    Ok(Json(tenant.agents()))
}

pub async fn list_activities(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Activity>>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    Ok(Json(tenant.activities()))
}

pub async fn analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsReport>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    Ok(Json(tenant.analytics()))
}

// --- Case wizard -----------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CaseStepRequest {
    pub session_id: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub back: bool,
}

#[derive(Debug, Serialize)]
pub struct CaseStepResponse {
    pub session_id: String,
    pub step: u8,
    pub step_title: &'static str,
    pub status: ExecutionStatus,
    pub response: Option<String>,
    pub issued_case: Option<CaseRecord>,
}

pub async fn execute_case(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CaseStepRequest>,
) -> Result<Json<CaseStepResponse>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    let token = token_from_headers(&headers)?.to_string();

    let session_id_provided = request.session_id.is_some();
    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if session_id_provided && Uuid::parse_str(&session_id).is_err() {
        error!(session_id = %session_id, "invalid wizard session id");
        return Err(StatusCode::BAD_REQUEST);
    }

    let session = match state.case_sessions.get(&session_id).await {
        Ok(Some(session)) => {
            // Sessions started under another login token do not exist as far
            // as this caller is concerned.
            if !state.owns_case_session(&session_id, &token) {
                error!(session_id = %session_id, "wizard session not found");
                return Err(StatusCode::NOT_FOUND);
            }
            if session.completed {
                info!(session_id = %session_id, "wizard session already completed");
                return Err(StatusCode::CONFLICT);
            }
            session
        }
        Ok(None) => {
            if session_id_provided {
                error!(session_id = %session_id, "wizard session not found");
                return Err(StatusCode::NOT_FOUND);
            }
            let start = state
                .case_flow
                .start_step_id()
                .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
            info!(session_id = %session_id, "starting case wizard session");
            state.case_owners.insert(session_id.clone(), token);
            CaseSession::new_from_step(session_id.clone(), &start)
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, "failed to load wizard session");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    // Hand the submitted fields (and the back flag) to the current step.
    session.context.set(session_keys::FORM, request.fields).await;
    if request.back {
        session.context.set(session_keys::NAV_BACK, true).await;
    }
    if let Err(e) = state.case_sessions.save(session).await {
        error!(session_id = %session_id, error = %e, "failed to save wizard session");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let outcome = match state.case_runner.run(&session_id).await {
        Ok(outcome) => outcome,
        Err(FlowError::SessionCompleted(_)) => return Err(StatusCode::CONFLICT),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "wizard step failed");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let session = state
        .case_sessions
        .get(&session_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    // Once the flow completes, the assembled case moves into the tenant store.
    let issued_case = if outcome.status == ExecutionStatus::Completed {
        match session.context.get(session_keys::ISSUED_CASE).await {
            Some(case) => Some(tenant.add_case(case)),
            None => {
                error!(session_id = %session_id, "completed wizard without an issued case");
                None
            }
        }
    } else {
        None
    };

    let (step, step_title) = step_info(&session.current_step_id);
    Ok(Json(CaseStepResponse {
        session_id,
        step,
        step_title,
        status: outcome.status,
        response: outcome.response,
        issued_case,
    }))
}

#[derive(Debug, Serialize)]
pub struct CaseSessionView {
    pub step: u8,
    pub step_title: &'static str,
    #[serde(flatten)]
    pub session: CaseSession,
}

pub async fn get_case_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<CaseSessionView>, StatusCode> {
    state.tenant(&headers)?;
    let token = token_from_headers(&headers)?;
    if !state.owns_case_session(&session_id, token) {
        return Err(StatusCode::NOT_FOUND);
    }
    match state.case_sessions.get(&session_id).await {
        Ok(Some(session)) => {
            let (step, step_title) = step_info(&session.current_step_id);
            Ok(Json(CaseSessionView {
                step,
                step_title,
                session,
            }))
        }
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "failed to load wizard session");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn list_cases(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<CaseRecord>>, StatusCode> {
    let tenant = state.tenant(&headers)?;
    Ok(Json(tenant.cases()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_flow::InMemorySessionStore;
    use serde_json::json;

    use crate::auth::{DEMO_EMAIL, DEMO_PASSWORD, SESSION_TOKEN_HEADER};
    use crate::wizard::create_case_flow;

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(create_case_flow()),
            Arc::new(InMemorySessionStore::new()),
        )
    }

    fn login(state: &AppState) -> HeaderMap {
        let (token, _) = state.registry.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_TOKEN_HEADER, token.parse().unwrap());
        headers
    }

    fn step_request(session_id: Option<String>, fields: Value) -> CaseStepRequest {
        CaseStepRequest {
            session_id,
            fields: fields.as_object().cloned().unwrap_or_default(),
            back: false,
        }
    }

    async fn execute(
        state: &AppState,
        headers: &HeaderMap,
        request: CaseStepRequest,
    ) -> Result<CaseStepResponse, StatusCode> {
        execute_case(State(state.clone()), headers.clone(), Json(request))
            .await
            .map(|json| json.0)
    }

    /// Drives a full vehicle case to completion and returns the session id
    /// with the final response.
    async fn drive_vehicle_wizard(
        state: &AppState,
        headers: &HeaderMap,
    ) -> (String, CaseStepResponse) {
        let first = execute(
            state,
            headers,
            step_request(
                None,
                json!({"name": "John Doe", "email": "john@example.com", "phone": "+1-555-0123"}),
            ),
        )
        .await
        .unwrap();
        let session_id = first.session_id.clone();

        let submissions = [
            json!({"insurance_type": "vehicle"}),
            json!({
                "make": "Honda", "model": "City", "year": 2021,
                "vehicle_type": "car", "fuel_type": "petrol",
                "registration": "KA-01-AB-1234", "idv": 500000.0,
                "driver_age": 30, "ncb_tier": 20
            }),
            json!({"deductible": 5000}),
            json!({"confirmed": true}),
            json!({"documents": ["rc_book.pdf"]}),
            json!({"declaration_accepted": true}),
            json!({}),
        ];
        let mut last = first;
        for fields in submissions {
            last = execute(state, headers, step_request(Some(session_id.clone()), fields))
                .await
                .unwrap();
        }
        (session_id, last)
    }

    #[tokio::test]
    async fn completed_wizard_session_cannot_be_replayed() {
        let state = test_state();
        let headers = login(&state);

        let (session_id, last) = drive_vehicle_wizard(&state, &headers).await;
        assert_eq!(last.status, ExecutionStatus::Completed);
        let issued = last.issued_case.unwrap();

        // A retry of the final submission must not mint a second case.
        let err = execute(&state, &headers, step_request(Some(session_id), json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, StatusCode::CONFLICT);

        let cases = state.tenant(&headers).unwrap().cases();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].reference, issued.reference);
    }

    #[tokio::test]
    async fn wizard_sessions_are_scoped_to_their_login() {
        let state = test_state();
        let owner = login(&state);
        let intruder = login(&state);

        let started = execute(
            &state,
            &owner,
            step_request(
                None,
                json!({"name": "John Doe", "email": "john@example.com", "phone": "+1-555-0123"}),
            ),
        )
        .await
        .unwrap();
        let session_id = started.session_id.clone();

        // Another login can neither resume nor inspect the session.
        let err = execute(
            &state,
            &intruder,
            step_request(Some(session_id.clone()), json!({"insurance_type": "vehicle"})),
        )
        .await
        .unwrap_err();
        assert_eq!(err, StatusCode::NOT_FOUND);

        let err = get_case_session(
            State(state.clone()),
            intruder.clone(),
            Path(session_id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err, StatusCode::NOT_FOUND);

        // The owner is unaffected.
        let resumed = execute(
            &state,
            &owner,
            step_request(Some(session_id.clone()), json!({"insurance_type": "vehicle"})),
        )
        .await
        .unwrap();
        assert_eq!(resumed.step, 3);

        let view = get_case_session(State(state.clone()), owner.clone(), Path(session_id))
            .await
            .unwrap();
        assert_eq!(view.0.session.current_step_id, "vehicle_details");
    }
}
