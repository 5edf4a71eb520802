use axum::Json;
use axum::extract::State;

use swa_infra::metadata::workflows::list_workflows;
use swa_types::metadata::ListWorkflowsResponse;

use crate::http::error::AppError;
use crate::state::AppState;

/// GET /workflows - Workflows found under the workflows directory.
pub async fn list(State(state): State<AppState>) -> Result<Json<ListWorkflowsResponse>, AppError> {
    let workflows = list_workflows(state.workflow_driver.workflows_dir())
        .await
        .map_err(|e| AppError::Internal(format!("cannot list workflows: {e}")))?;
    Ok(Json(ListWorkflowsResponse {
        total_count: workflows.len(),
        workflows,
    }))
}
