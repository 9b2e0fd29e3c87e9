//! Storage contracts for device registrations and application credentials.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::PushError;
use crate::types::{AppCredential, CredentialPatch, DeviceRegistration, RegistrationUpsert};

pub use memory::{InMemoryAppCredentialStore, InMemoryDeviceRegistrationStore};
pub use postgres::{PgAppCredentialStore, PgDeviceRegistrationStore};

#[async_trait]
pub trait DeviceRegistrationStore: Send + Sync {
    /// Lookup by the natural key `(app_id, push_token)`.
    async fn find_by_app_and_token(
        &self,
        app_id: i64,
        push_token: &str,
    ) -> Result<Option<DeviceRegistration>, PushError>;

    async fn find_by_activation_id(
        &self,
        activation_id: &str,
    ) -> Result<Vec<DeviceRegistration>, PushError>;

    /// Atomically create or update the registration keyed by
    /// `(app_id, push_token)` and return the stored record.
    async fn upsert(&self, upsert: RegistrationUpsert) -> Result<DeviceRegistration, PushError>;

    /// Set `active` on every registration linked to `activation_id` in one
    /// transaction. Returns the number of updated records.
    async fn set_active_for_activation(
        &self,
        activation_id: &str,
        active: bool,
    ) -> Result<usize, PushError>;

    /// Returns `true` when a record was deleted.
    async fn delete_by_app_and_token(&self, app_id: i64, push_token: &str) -> Result<bool, PushError>;
}

#[async_trait]
pub trait AppCredentialStore: Send + Sync {
    async fn find_by_app_id(&self, app_id: i64) -> Result<Option<AppCredential>, PushError>;

    /// Create the record for `app_id` if needed and replace one platform's
    /// credentials.
    async fn upsert(&self, app_id: i64, patch: CredentialPatch) -> Result<AppCredential, PushError>;

    async fn delete(&self, app_id: i64) -> Result<bool, PushError>;
}
