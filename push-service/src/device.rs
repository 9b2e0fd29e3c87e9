use chrono::Utc;
use push_core::activation::{ActivationGateway, ActivationStatus};
use push_core::store::DeviceRegistrationStore;
use push_core::{ActivationLinkage, DeviceRegistration, Platform, PushError, RegistrationUpsert};
use std::sync::Arc;
use tracing;

/// Registration request for a single device installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDevice {
    pub app_id: i64,
    pub push_token: String,
    pub platform: Platform,
    pub activation_id: Option<String>,
}

/// Keeps device registrations in line with the activation server.
pub struct DeviceService {
    devices: Arc<dyn DeviceRegistrationStore>,
    gateway: Arc<dyn ActivationGateway>,
}

impl DeviceService {
    pub fn new(devices: Arc<dyn DeviceRegistrationStore>, gateway: Arc<dyn ActivationGateway>) -> Self {
        Self { devices, gateway }
    }

    /// Create or refresh the registration for `(app_id, push_token)`.
    ///
    /// When an activation id is supplied the activation server is asked for
    /// its status; removed activations and failed lookups leave the linkage
    /// as it was.
    pub async fn register(&self, request: RegisterDevice) -> Result<DeviceRegistration, PushError> {
        if request.push_token.trim().is_empty() {
            return Err(PushError::invalid_input("Push token must not be empty"));
        }

        let activation_id = request
            .activation_id
            .filter(|id| !id.trim().is_empty());

        let linkage = match activation_id {
            Some(activation_id) => self.resolve_linkage(activation_id).await,
            None => None,
        };

        let registration = self
            .devices
            .upsert(RegistrationUpsert {
                app_id: request.app_id,
                push_token: request.push_token,
                platform: request.platform,
                last_registered: Utc::now(),
                linkage,
            })
            .await?;

        tracing::info!(
            "Registered device {} for app {} on {} (linked: {}, active: {})",
            registration.id,
            registration.app_id,
            registration.platform,
            registration.activation_id.is_some(),
            registration.active
        );

        Ok(registration)
    }

    async fn resolve_linkage(&self, activation_id: String) -> Option<ActivationLinkage> {
        let info = match self.gateway.get_activation_status(&activation_id).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                tracing::debug!("No status returned for activation {}", activation_id);
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping activation linkage for {}: status lookup failed: {}",
                    activation_id,
                    e
                );
                return None;
            }
        };

        if info.status == ActivationStatus::Removed {
            tracing::debug!("Activation {} is removed, linkage unchanged", activation_id);
            return None;
        }

        let active = info.is_active();
        let encryption_key = if active {
            match self.gateway.generate_encryption_key(&activation_id, None).await {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(
                        "Encryption key generation failed for activation {}: {}",
                        activation_id,
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        Some(ActivationLinkage {
            activation_id,
            active,
            user_id: info.user_id,
            encryption_key,
        })
    }

    /// Refresh the `active` flag of every registration linked to
    /// `activation_id`. Returns the number of updated registrations.
    pub async fn sync_status(&self, activation_id: &str) -> Result<usize, PushError> {
        if activation_id.trim().is_empty() {
            return Err(PushError::invalid_input("Activation ID must not be empty"));
        }

        let registrations = self.devices.find_by_activation_id(activation_id).await?;
        if registrations.is_empty() {
            tracing::debug!("No registrations linked to activation {}", activation_id);
            return Ok(0);
        }

        let info = self
            .gateway
            .get_activation_status(activation_id)
            .await?
            .ok_or_else(|| {
                PushError::GatewayUnavailable(format!(
                    "No status returned for activation {}",
                    activation_id
                ))
            })?;

        let active = info.is_active();
        let updated = self
            .devices
            .set_active_for_activation(activation_id, active)
            .await?;

        tracing::info!(
            "Activation {} is {:?}, updated {} registrations",
            activation_id,
            info.status,
            updated
        );

        Ok(updated)
    }

    /// Delete the registration for `(app_id, push_token)`. Missing
    /// registrations are not an error.
    pub async fn remove(&self, app_id: i64, push_token: &str) -> Result<bool, PushError> {
        if push_token.trim().is_empty() {
            return Err(PushError::invalid_input("Push token must not be empty"));
        }

        let removed = self.devices.delete_by_app_and_token(app_id, push_token).await?;
        if removed {
            tracing::info!("Removed device registration for app {}", app_id);
        } else {
            tracing::debug!("No device registration to remove for app {}", app_id);
        }

        Ok(removed)
    }
}
