use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::Json,
};
use push_core::{ObjectRequest, ObjectResponse, Platform};
use push_service::RegisterDevice;
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::ApiState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "push-api"
    }))
}

/// Unwrap `{"requestObject": ...}`; malformed bodies and missing payloads
/// both fail with `InvalidInput`.
pub(crate) fn request_object<T>(
    payload: Result<Json<ObjectRequest<T>>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(request) = payload?;
    Ok(request.into_inner()?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRegistrationRequest {
    pub app_id: i64,
    pub token: String,
    pub platform: String,
    #[serde(default)]
    pub activation_id: Option<String>,
}

/// POST /push/device/create
pub async fn create_device(
    Extension(state): Extension<ApiState>,
    payload: Result<Json<ObjectRequest<CreateDeviceRegistrationRequest>>, JsonRejection>,
) -> Result<Json<ObjectResponse<()>>, ApiError> {
    let req = request_object(payload)?;
    let platform: Platform = req.platform.parse()?;

    state
        .devices
        .register(RegisterDevice {
            app_id: req.app_id,
            push_token: req.token,
            platform,
            activation_id: req.activation_id,
        })
        .await?;

    Ok(Json(ObjectResponse::ok()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub activation_id: String,
}

/// POST /push/device/status/update
pub async fn update_status(
    Extension(state): Extension<ApiState>,
    payload: Result<Json<ObjectRequest<UpdateStatusRequest>>, JsonRejection>,
) -> Result<Json<ObjectResponse<()>>, ApiError> {
    let req = request_object(payload)?;
    state.devices.sync_status(&req.activation_id).await?;

    Ok(Json(ObjectResponse::ok()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveDeviceRegistrationRequest {
    pub app_id: i64,
    pub token: String,
}

/// POST /push/device/remove
pub async fn remove_device(
    Extension(state): Extension<ApiState>,
    payload: Result<Json<ObjectRequest<RemoveDeviceRegistrationRequest>>, JsonRejection>,
) -> Result<Json<ObjectResponse<()>>, ApiError> {
    let req = request_object(payload)?;
    state.devices.remove(req.app_id, &req.token).await?;

    Ok(Json(ObjectResponse::ok()))
}
