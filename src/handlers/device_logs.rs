use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{ApiResult, AppState};
use crate::{
    auth::{consts as perm, AccessGate, Decision, Principal},
    entities::device_log,
    errors::ServiceError,
    services::ledger::{LogWithDevice, ReversedMovement},
    stores::ProvenanceUpdate,
    ApiResponse, ListQuery, PaginatedResponse,
};

/// GET /stock/device_log
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<device_log::Model>> {
    let (page, limit) = query.resolve(&state.config);
    let result = state.ledger.list_logs(page, limit).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        result.items,
        result.total,
        page,
        limit,
    ))))
}

/// GET /stock/device_log/:id, with the referenced device if it still exists.
pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<LogWithDevice> {
    let log = state.ledger.get_log_with_device(id).await?;
    Ok(Json(ApiResponse::success(log)))
}

/// PATCH /stock/device_log/:id
///
/// Authors may edit their own entries; editing someone else's needs
/// `org.device_log.write`.
pub async fn update_log(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(gate): Extension<Arc<dyn AccessGate>>,
    Path(id): Path<Uuid>,
    Json(update): Json<ProvenanceUpdate>,
) -> ApiResult<device_log::Model> {
    let author_id = state.ledger.log_author(id).await?;

    if gate.authorize_owned(&principal, &author_id, perm::ORG_DEVICE_LOG_WRITE) == Decision::Deny
    {
        debug!(principal = %principal.id, devicelog_id = %id, "provenance edit denied");
        return Err(ServiceError::Forbidden(
            "Only the author or a holder of org.device_log.write may edit this entry".to_string(),
        ));
    }

    let log = state.ledger.update_provenance(id, update).await?;
    Ok(Json(
        ApiResponse::success(log).with_message("Device log updated successfully"),
    ))
}

/// DELETE /stock/device_log/:id
///
/// Reverses the movement; a device left without available stock is deleted.
pub async fn reverse_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReversedMovement> {
    let reversed = state.ledger.reverse_movement(id).await?;
    let messages = reversed.outcome.messages();

    Ok(Json(
        ApiResponse::success(reversed)
            .with_message("Stock movement reversed")
            .with_messages(messages),
    ))
}
