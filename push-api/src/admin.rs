//! Credential provisioning endpoints. Mounted behind the JWT middleware.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use push_core::{AndroidCredential, IosCredential, ObjectRequest, ObjectResponse, PushError};
use push_service::AppCredentialDetail;
use serde::Deserialize;
use tracing;

use crate::auth::AuthenticatedAdmin;
use crate::error::ApiError;
use crate::handlers::request_object;
use crate::server::ApiState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRequest {
    pub app_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIosRequest {
    pub app_id: i64,
    pub bundle: String,
    pub key_id: String,
    pub team_id: String,
    pub private_key_base64: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAndroidRequest {
    pub app_id: i64,
    pub bundle: String,
    pub token: String,
}

/// POST /push/admin/app/detail
pub async fn app_detail(
    Extension(state): Extension<ApiState>,
    payload: Result<Json<ObjectRequest<AppRequest>>, JsonRejection>,
) -> Result<Json<ObjectResponse<AppCredentialDetail>>, ApiError> {
    let req = request_object(payload)?;
    let detail = state.credentials.detail(req.app_id).await?;

    Ok(Json(ObjectResponse::with(detail)))
}

/// POST /push/admin/app/ios/update
pub async fn update_ios(
    Extension(state): Extension<ApiState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    payload: Result<Json<ObjectRequest<UpdateIosRequest>>, JsonRejection>,
) -> Result<Json<ObjectResponse<AppCredentialDetail>>, ApiError> {
    let req = request_object(payload)?;
    let private_key = STANDARD
        .decode(req.private_key_base64.trim())
        .map_err(|e| PushError::invalid_input(format!("Private key is not valid base64: {}", e)))?;

    tracing::info!("{} updates iOS credentials of app {}", admin.subject, req.app_id);
    let detail = state
        .credentials
        .update_ios(
            req.app_id,
            IosCredential {
                private_key,
                team_id: req.team_id,
                key_id: req.key_id,
                bundle: req.bundle,
            },
        )
        .await?;

    Ok(Json(ObjectResponse::with(detail)))
}

/// POST /push/admin/app/ios/remove
pub async fn remove_ios(
    Extension(state): Extension<ApiState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    payload: Result<Json<ObjectRequest<AppRequest>>, JsonRejection>,
) -> Result<Json<ObjectResponse<AppCredentialDetail>>, ApiError> {
    let req = request_object(payload)?;

    tracing::info!("{} removes iOS credentials of app {}", admin.subject, req.app_id);
    let detail = state.credentials.remove_ios(req.app_id).await?;

    Ok(Json(ObjectResponse::with(detail)))
}

/// POST /push/admin/app/android/update
pub async fn update_android(
    Extension(state): Extension<ApiState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    payload: Result<Json<ObjectRequest<UpdateAndroidRequest>>, JsonRejection>,
) -> Result<Json<ObjectResponse<AppCredentialDetail>>, ApiError> {
    let req = request_object(payload)?;

    tracing::info!("{} updates Android credentials of app {}", admin.subject, req.app_id);
    let detail = state
        .credentials
        .update_android(
            req.app_id,
            AndroidCredential {
                server_key: req.token,
                bundle: req.bundle,
            },
        )
        .await?;

    Ok(Json(ObjectResponse::with(detail)))
}

/// POST /push/admin/app/android/remove
pub async fn remove_android(
    Extension(state): Extension<ApiState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    payload: Result<Json<ObjectRequest<AppRequest>>, JsonRejection>,
) -> Result<Json<ObjectResponse<AppCredentialDetail>>, ApiError> {
    let req = request_object(payload)?;

    tracing::info!("{} removes Android credentials of app {}", admin.subject, req.app_id);
    let detail = state.credentials.remove_android(req.app_id).await?;

    Ok(Json(ObjectResponse::with(detail)))
}

/// POST /push/admin/app/remove
pub async fn remove_app(
    Extension(state): Extension<ApiState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    payload: Result<Json<ObjectRequest<AppRequest>>, JsonRejection>,
) -> Result<Json<ObjectResponse<()>>, ApiError> {
    let req = request_object(payload)?;

    tracing::info!("{} deletes credentials of app {}", admin.subject, req.app_id);
    state.credentials.delete(req.app_id).await?;

    Ok(Json(ObjectResponse::ok()))
}
