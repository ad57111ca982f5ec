use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ApiResult, AppState};
use crate::{
    auth::Principal,
    entities::device,
    errors::ServiceError,
    services::ledger::{DeviceWithHistory, MovementIntent, RecordedMovement},
    stores::DeviceDetailsUpdate,
    ApiResponse, ListQuery, PaginatedResponse,
};

/// GET /stock/device
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<device::Model>> {
    let (page, limit) = query.resolve(&state.config);
    let result = state.ledger.list_devices(page, limit).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        result.items,
        result.total,
        page,
        limit,
    ))))
}

/// GET /stock/device/:id, with the device's movement history.
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeviceWithHistory> {
    let device = state.ledger.get_device_with_history(id).await?;
    Ok(Json(ApiResponse::success(device)))
}

/// POST /stock/device
///
/// Records a stock movement. Without `device_id` the body describes a new
/// device and its initial stock; the response is then `201 Created`.
pub async fn record_movement(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(intent): Json<MovementIntent>,
) -> Result<(StatusCode, Json<ApiResponse<RecordedMovement>>), ServiceError> {
    let recorded = state.ledger.record_movement(intent, &principal.id).await?;

    let status = if recorded.device_created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let message = if recorded.negative_stock {
        "Stock movement recorded; available stock is negative"
    } else {
        "Stock movement recorded"
    };
    let messages = recorded.outcome.messages();

    Ok((
        status,
        Json(
            ApiResponse::success(recorded)
                .with_message(message)
                .with_messages(messages),
        ),
    ))
}

/// PATCH /stock/device/:id
pub async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(details): Json<DeviceDetailsUpdate>,
) -> ApiResult<device::Model> {
    let device = state.ledger.update_device_details(id, details).await?;
    Ok(Json(
        ApiResponse::success(device).with_message("Device updated successfully"),
    ))
}

/// DELETE /stock/device/:id
pub async fn retire_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.ledger.retire_device(id).await?;
    Ok(Json(
        ApiResponse::success(json!({ "device_id": id, "deleted": true }))
            .with_message("Device deleted successfully"),
    ))
}
