//! Form helpers shared by every wizard step: reading the submitted fields out
//! of the context, trimming and typing individual values, and the two step
//! results every screen can produce (back navigation, validation failure).

use case_flow::{Context, StepAction, StepResult};
use serde_json::{Map, Value};

use super::session_keys;

/// True when the client asked to go back; the flag is consumed so it only
/// applies to this submission.
pub async fn take_back_request(context: &Context) -> bool {
    let requested = context
        .get::<bool>(session_keys::NAV_BACK)
        .await
        .unwrap_or(false);
    if requested {
        context.remove(session_keys::NAV_BACK).await;
    }
    requested
}

pub fn back_result() -> StepResult {
    StepResult::with_status(None, StepAction::Back, "returned to previous step")
}

pub async fn submitted_form(context: &Context) -> Map<String, Value> {
    context
        .get::<Map<String, Value>>(session_keys::FORM)
        .await
        .unwrap_or_default()
}

/// Non-empty trimmed string field.
pub fn text_field(form: &Map<String, Value>, key: &str) -> Option<String> {
    form.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn number_field(form: &Map<String, Value>, key: &str) -> Option<f64> {
    form.get(key).and_then(Value::as_f64)
}

pub fn integer_field(form: &Map<String, Value>, key: &str) -> Option<u32> {
    form.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

/// Unchecked boxes are commonly omitted from form payloads, so a missing key
/// reads as false.
pub fn flag_field(form: &Map<String, Value>, key: &str) -> bool {
    form.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub fn string_list_field(form: &Map<String, Value>, key: &str) -> Vec<String> {
    form.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Stay on the step and report every problem at once.
pub fn validation_result(problems: Vec<String>) -> StepResult {
    StepResult::with_status(
        Some(problems.join("; ")),
        StepAction::Stay,
        "validation failed",
    )
}
