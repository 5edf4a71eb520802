//! Wrapper catalogue served from the metadata cache.

use axum::Json;
use axum::extract::{Path, State};

use swa_core::component;
use swa_types::metadata::{ListWrappersResponse, WrapperSummary};

use crate::http::error::AppError;
use crate::state::AppState;

/// Normalize a wildcard-captured wrapper id.
pub(crate) fn wrapper_id(raw: &str) -> String {
    component::strip_legacy_prefix(raw.trim_matches('/')).to_string()
}

/// GET /tools - List every cached wrapper.
pub async fn list_tools(State(state): State<AppState>) -> Result<Json<ListWrappersResponse>, AppError> {
    let wrappers: Vec<WrapperSummary> = state.metadata.list().await?.iter().map(|m| m.summary()).collect();
    Ok(Json(ListWrappersResponse {
        total_count: wrappers.len(),
        wrappers,
    }))
}

/// GET /tools/{*id} - One wrapper's public metadata.
pub async fn get_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WrapperSummary>, AppError> {
    let meta = state.metadata.load(&wrapper_id(&id)).await?;
    Ok(Json(meta.summary()))
}
