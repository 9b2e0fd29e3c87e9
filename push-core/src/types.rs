use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PushError;

/// Delivery channel a push token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PushError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(PushError::invalid_input(format!("Unsupported platform: {}", other))),
        }
    }
}

/// Personalized end-to-end encryption key minted for an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionKey {
    pub encryption_key: String,
    pub encryption_key_index: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub id: i64,
    pub app_id: i64,
    pub push_token: String,
    pub platform: Platform,
    pub activation_id: Option<String>,
    pub active: bool,
    pub user_id: Option<String>,
    pub encryption_key: Option<String>,
    pub encryption_key_index: Option<String>,
    pub last_registered: DateTime<Utc>,
}

/// Activation data observed from the activation server during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationLinkage {
    pub activation_id: String,
    pub active: bool,
    pub user_id: Option<String>,
    /// Only ever `Some` when the activation was observed active.
    pub encryption_key: Option<EncryptionKey>,
}

/// Create-or-update request for the `(app_id, push_token)` registration.
///
/// `platform` and `last_registered` always overwrite. Linkage columns are
/// only touched when `linkage` is present. See [`RegistrationUpsert::key_update`]
/// for key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationUpsert {
    pub app_id: i64,
    pub push_token: String,
    pub platform: Platform,
    pub last_registered: DateTime<Utc>,
    pub linkage: Option<ActivationLinkage>,
}

impl RegistrationUpsert {
    /// Key material to write over a record currently linked to
    /// `stored_activation_id`. `None` leaves the stored key alone,
    /// `Some(None)` clears it.
    ///
    /// A stored key survives only when the same activation is seen active
    /// again and no fresh key was issued.
    pub fn key_update(&self, stored_activation_id: Option<&str>) -> Option<Option<&EncryptionKey>> {
        let linkage = self.linkage.as_ref()?;
        match &linkage.encryption_key {
            Some(key) if linkage.active => Some(Some(key)),
            None if linkage.active && stored_activation_id == Some(linkage.activation_id.as_str()) => {
                None
            }
            _ => Some(None),
        }
    }
}

impl DeviceRegistration {
    /// Apply an upsert onto an existing record.
    pub fn apply(&mut self, upsert: &RegistrationUpsert) {
        if let Some(key) = upsert.key_update(self.activation_id.as_deref()) {
            self.encryption_key = key.map(|k| k.encryption_key.clone());
            self.encryption_key_index = key.map(|k| k.encryption_key_index.clone());
        }

        self.platform = upsert.platform;
        self.last_registered = upsert.last_registered;
        if let Some(linkage) = &upsert.linkage {
            self.activation_id = Some(linkage.activation_id.clone());
            self.active = linkage.active;
            self.user_id = linkage.user_id.clone();
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IosCredential {
    pub private_key: Vec<u8>,
    pub team_id: String,
    pub key_id: String,
    pub bundle: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidCredential {
    pub server_key: String,
    pub bundle: String,
}

// Secrets stay out of logs.
impl fmt::Debug for IosCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IosCredential")
            .field("private_key", &"****")
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .field("bundle", &self.bundle)
            .finish()
    }
}

impl fmt::Debug for AndroidCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidCredential")
            .field("server_key", &"****")
            .field("bundle", &self.bundle)
            .finish()
    }
}

/// Platform credentials of one application, used by the delivery transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCredential {
    pub id: i64,
    pub app_id: i64,
    pub ios: Option<IosCredential>,
    pub android: Option<AndroidCredential>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Replaces the credentials of a single platform; `None` clears them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPatch {
    Ios(Option<IosCredential>),
    Android(Option<AndroidCredential>),
}

impl AppCredential {
    pub fn apply(&mut self, patch: &CredentialPatch) {
        match patch {
            CredentialPatch::Ios(ios) => self.ios = ios.clone(),
            CredentialPatch::Android(android) => self.android = android.clone(),
        }
    }
}
