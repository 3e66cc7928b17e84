use async_trait::async_trait;
use case_flow::{Context, Result, Step, StepAction, StepResult};
use tracing::info;

use super::{session_keys, utils};

/// Step 7: optional document names. Only the names are kept on the case
/// record; no file content is ever stored.
pub struct DocumentsStep;

#[async_trait]
impl Step for DocumentsStep {
    fn id(&self) -> &str {
        "documents"
    }

    async fn run(&self, context: Context) -> Result<StepResult> {
        if utils::take_back_request(&context).await {
            return Ok(utils::back_result());
        }
        let form = utils::submitted_form(&context).await;

        let documents = utils::string_list_field(&form, "documents");
        info!(count = documents.len(), "documents noted");
        let response = if documents.is_empty() {
            "No documents attached.".to_string()
        } else {
            format!("{} document name(s) noted on the case.", documents.len())
        };
        context.set(session_keys::DOCUMENTS, documents).await;

        Ok(StepResult::with_status(
            Some(response),
            StepAction::Advance,
            "documents recorded",
        ))
    }
}
