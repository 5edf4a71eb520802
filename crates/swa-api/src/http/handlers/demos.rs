//! Ready-to-submit demo payloads compiled from wrapper self-tests.

use axum::Json;
use axum::extract::{Path, State};

use swa_types::rule::DemoCall;

use super::tools::wrapper_id;
use crate::http::error::AppError;
use crate::state::AppState;

/// GET /demos/{*id} - Demo calls for one wrapper (possibly empty).
pub async fn get_demos(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DemoCall>>, AppError> {
    let meta = state.metadata.load(&wrapper_id(&id)).await?;
    Ok(Json(meta.demos))
}
