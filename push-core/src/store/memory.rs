use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::error::PushError;
use crate::store::{AppCredentialStore, DeviceRegistrationStore};
use crate::types::{AppCredential, CredentialPatch, DeviceRegistration, RegistrationUpsert};

struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Device registrations held in process memory. Each operation holds the
/// table lock for its whole read-modify-write.
#[derive(Default)]
pub struct InMemoryDeviceRegistrationStore {
    table: Mutex<Table<DeviceRegistration>>,
}

impl InMemoryDeviceRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DeviceRegistrationStore for InMemoryDeviceRegistrationStore {
    async fn find_by_app_and_token(
        &self,
        app_id: i64,
        push_token: &str,
    ) -> Result<Option<DeviceRegistration>, PushError> {
        let table = self.table.lock().await;
        Ok(table
            .rows
            .values()
            .find(|r| r.app_id == app_id && r.push_token == push_token)
            .cloned())
    }

    async fn find_by_activation_id(
        &self,
        activation_id: &str,
    ) -> Result<Vec<DeviceRegistration>, PushError> {
        let table = self.table.lock().await;
        Ok(table
            .rows
            .values()
            .filter(|r| r.activation_id.as_deref() == Some(activation_id))
            .cloned()
            .collect())
    }

    async fn upsert(&self, upsert: RegistrationUpsert) -> Result<DeviceRegistration, PushError> {
        let mut table = self.table.lock().await;

        if let Some(existing) = table
            .rows
            .values_mut()
            .find(|r| r.app_id == upsert.app_id && r.push_token == upsert.push_token)
        {
            existing.apply(&upsert);
            return Ok(existing.clone());
        }

        let id = table.allocate_id();
        let mut registration = DeviceRegistration {
            id,
            app_id: upsert.app_id,
            push_token: upsert.push_token.clone(),
            platform: upsert.platform,
            activation_id: None,
            active: false,
            user_id: None,
            encryption_key: None,
            encryption_key_index: None,
            last_registered: upsert.last_registered,
        };
        registration.apply(&upsert);
        table.rows.insert(id, registration.clone());

        Ok(registration)
    }

    async fn set_active_for_activation(
        &self,
        activation_id: &str,
        active: bool,
    ) -> Result<usize, PushError> {
        let mut table = self.table.lock().await;
        let mut updated = 0;
        for registration in table
            .rows
            .values_mut()
            .filter(|r| r.activation_id.as_deref() == Some(activation_id))
        {
            registration.active = active;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_by_app_and_token(&self, app_id: i64, push_token: &str) -> Result<bool, PushError> {
        let mut table = self.table.lock().await;
        let id = table
            .rows
            .values()
            .find(|r| r.app_id == app_id && r.push_token == push_token)
            .map(|r| r.id);

        Ok(match id {
            Some(id) => table.rows.remove(&id).is_some(),
            None => false,
        })
    }
}

#[derive(Default)]
pub struct InMemoryAppCredentialStore {
    table: Mutex<Table<AppCredential>>,
}

impl InMemoryAppCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppCredentialStore for InMemoryAppCredentialStore {
    async fn find_by_app_id(&self, app_id: i64) -> Result<Option<AppCredential>, PushError> {
        let table = self.table.lock().await;
        Ok(table.rows.values().find(|c| c.app_id == app_id).cloned())
    }

    async fn upsert(&self, app_id: i64, patch: CredentialPatch) -> Result<AppCredential, PushError> {
        let mut table = self.table.lock().await;
        let now = Utc::now();

        if let Some(existing) = table.rows.values_mut().find(|c| c.app_id == app_id) {
            existing.apply(&patch);
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = table.allocate_id();
        let mut credential = AppCredential {
            id,
            app_id,
            ios: None,
            android: None,
            created_at: now,
            updated_at: now,
        };
        credential.apply(&patch);
        table.rows.insert(id, credential.clone());

        Ok(credential)
    }

    async fn delete(&self, app_id: i64) -> Result<bool, PushError> {
        let mut table = self.table.lock().await;
        let before = table.rows.len();
        table.rows.retain(|_, c| c.app_id != app_id);
        Ok(table.rows.len() < before)
    }
}
