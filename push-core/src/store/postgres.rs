use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::error::PushError;
use crate::schema::{push_app_credential, push_device_registration};
use crate::store::{AppCredentialStore, DeviceRegistrationStore};
use crate::types::{
    AndroidCredential, AppCredential, CredentialPatch, DeviceRegistration, IosCredential,
    RegistrationUpsert,
};

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = push_device_registration)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct DeviceRegistrationRow {
    id: i64,
    app_id: i64,
    push_token: String,
    platform: String,
    activation_id: Option<String>,
    active: bool,
    user_id: Option<String>,
    encryption_key: Option<String>,
    encryption_key_index: Option<String>,
    timestamp_last_registered: DateTime<Utc>,
}

impl TryFrom<DeviceRegistrationRow> for DeviceRegistration {
    type Error = PushError;

    fn try_from(row: DeviceRegistrationRow) -> Result<Self, Self::Error> {
        let platform = row.platform.parse().map_err(|_| {
            PushError::Internal(anyhow!(
                "Registration {} has unknown platform '{}'",
                row.id,
                row.platform
            ))
        })?;

        Ok(DeviceRegistration {
            id: row.id,
            app_id: row.app_id,
            push_token: row.push_token,
            platform,
            activation_id: row.activation_id,
            active: row.active,
            user_id: row.user_id,
            encryption_key: row.encryption_key,
            encryption_key_index: row.encryption_key_index,
            last_registered: row.timestamp_last_registered,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = push_device_registration)]
struct NewDeviceRegistration<'a> {
    app_id: i64,
    push_token: &'a str,
    platform: &'a str,
    activation_id: Option<&'a str>,
    active: bool,
    user_id: Option<&'a str>,
    encryption_key: Option<&'a str>,
    encryption_key_index: Option<&'a str>,
    timestamp_last_registered: DateTime<Utc>,
}

/// Columns written when the `(app_id, push_token)` row already exists.
/// `None` leaves the column untouched.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = push_device_registration)]
struct DeviceRegistrationChanges<'a> {
    platform: &'a str,
    timestamp_last_registered: DateTime<Utc>,
    activation_id: Option<&'a str>,
    active: Option<bool>,
    user_id: Option<Option<&'a str>>,
    encryption_key: Option<Option<&'a str>>,
    encryption_key_index: Option<Option<&'a str>>,
}

impl<'a> From<&'a RegistrationUpsert> for NewDeviceRegistration<'a> {
    fn from(upsert: &'a RegistrationUpsert) -> Self {
        let linkage = upsert.linkage.as_ref();
        let key = upsert.key_update(None).flatten();
        NewDeviceRegistration {
            app_id: upsert.app_id,
            push_token: &upsert.push_token,
            platform: upsert.platform.as_str(),
            activation_id: linkage.map(|l| l.activation_id.as_str()),
            active: linkage.map(|l| l.active).unwrap_or(false),
            user_id: linkage.and_then(|l| l.user_id.as_deref()),
            encryption_key: key.map(|k| k.encryption_key.as_str()),
            encryption_key_index: key.map(|k| k.encryption_key_index.as_str()),
            timestamp_last_registered: upsert.last_registered,
        }
    }
}

impl<'a> DeviceRegistrationChanges<'a> {
    /// Changes for a row currently linked to `stored_activation_id`.
    fn new(upsert: &'a RegistrationUpsert, stored_activation_id: Option<&str>) -> Self {
        let linkage = upsert.linkage.as_ref();
        let key = upsert.key_update(stored_activation_id);
        DeviceRegistrationChanges {
            platform: upsert.platform.as_str(),
            timestamp_last_registered: upsert.last_registered,
            activation_id: linkage.map(|l| l.activation_id.as_str()),
            active: linkage.map(|l| l.active),
            user_id: linkage.map(|l| l.user_id.as_deref()),
            encryption_key: key.map(|k| k.map(|k| k.encryption_key.as_str())),
            encryption_key_index: key.map(|k| k.map(|k| k.encryption_key_index.as_str())),
        }
    }
}

pub struct PgDeviceRegistrationStore {
    pool: Arc<DbPool>,
}

impl PgDeviceRegistrationStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRegistrationStore for PgDeviceRegistrationStore {
    async fn find_by_app_and_token(
        &self,
        app_id: i64,
        push_token: &str,
    ) -> Result<Option<DeviceRegistration>, PushError> {
        let mut conn = get_connection(&self.pool).await?;

        let row: Option<DeviceRegistrationRow> = push_device_registration::table
            .filter(push_device_registration::app_id.eq(app_id))
            .filter(push_device_registration::push_token.eq(push_token))
            .select(DeviceRegistrationRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        row.map(DeviceRegistration::try_from).transpose()
    }

    async fn find_by_activation_id(
        &self,
        activation_id: &str,
    ) -> Result<Vec<DeviceRegistration>, PushError> {
        let mut conn = get_connection(&self.pool).await?;

        let rows: Vec<DeviceRegistrationRow> = push_device_registration::table
            .filter(push_device_registration::activation_id.eq(activation_id))
            .order(push_device_registration::id.asc())
            .select(DeviceRegistrationRow::as_select())
            .load(&mut conn)
            .await?;

        rows.into_iter().map(DeviceRegistration::try_from).collect()
    }

    async fn upsert(&self, upsert: RegistrationUpsert) -> Result<DeviceRegistration, PushError> {
        let mut conn = get_connection(&self.pool).await?;
        let upsert = &upsert;
        let new_row = NewDeviceRegistration::from(upsert);

        let row: DeviceRegistrationRow = conn
            .transaction::<_, PushError, _>(|conn| {
                async move {
                    let stored_activation_id: Option<Option<String>> =
                        push_device_registration::table
                            .filter(push_device_registration::app_id.eq(upsert.app_id))
                            .filter(push_device_registration::push_token.eq(&upsert.push_token))
                            .select(push_device_registration::activation_id)
                            .for_update()
                            .first(conn)
                            .await
                            .optional()?;

                    let changes =
                        DeviceRegistrationChanges::new(upsert, stored_activation_id.flatten().as_deref());

                    let row = diesel::insert_into(push_device_registration::table)
                        .values(&new_row)
                        .on_conflict((
                            push_device_registration::app_id,
                            push_device_registration::push_token,
                        ))
                        .do_update()
                        .set(&changes)
                        .returning(DeviceRegistrationRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(row)
                }
                .scope_boxed()
            })
            .await?;

        tracing::debug!(
            "Stored registration {} for app {} ({})",
            row.id,
            row.app_id,
            row.platform
        );

        DeviceRegistration::try_from(row)
    }

    async fn set_active_for_activation(
        &self,
        activation_id: &str,
        active: bool,
    ) -> Result<usize, PushError> {
        let mut conn = get_connection(&self.pool).await?;

        conn.transaction::<_, PushError, _>(|conn| {
            async move {
                let updated = diesel::update(
                    push_device_registration::table
                        .filter(push_device_registration::activation_id.eq(activation_id)),
                )
                .set(push_device_registration::active.eq(active))
                .execute(conn)
                .await?;
                Ok(updated)
            }
            .scope_boxed()
        })
        .await
    }

    async fn delete_by_app_and_token(&self, app_id: i64, push_token: &str) -> Result<bool, PushError> {
        let mut conn = get_connection(&self.pool).await?;

        let deleted = conn
            .transaction::<_, PushError, _>(|conn| {
                async move {
                    let deleted = diesel::delete(
                        push_device_registration::table
                            .filter(push_device_registration::app_id.eq(app_id))
                            .filter(push_device_registration::push_token.eq(push_token)),
                    )
                    .execute(conn)
                    .await?;
                    Ok(deleted)
                }
                .scope_boxed()
            })
            .await?;

        Ok(deleted > 0)
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = push_app_credential)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AppCredentialRow {
    id: i64,
    app_id: i64,
    ios_private_key: Option<Vec<u8>>,
    ios_team_id: Option<String>,
    ios_key_id: Option<String>,
    ios_bundle: Option<String>,
    android_server_key: Option<String>,
    android_bundle: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AppCredentialRow> for AppCredential {
    fn from(row: AppCredentialRow) -> Self {
        let ios = match (row.ios_private_key, row.ios_team_id, row.ios_key_id, row.ios_bundle) {
            (Some(private_key), Some(team_id), Some(key_id), Some(bundle)) => Some(IosCredential {
                private_key,
                team_id,
                key_id,
                bundle,
            }),
            _ => None,
        };
        let android = match (row.android_server_key, row.android_bundle) {
            (Some(server_key), Some(bundle)) => Some(AndroidCredential { server_key, bundle }),
            _ => None,
        };

        AppCredential {
            id: row.id,
            app_id: row.app_id,
            ios,
            android,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = push_app_credential)]
struct NewAppCredential<'a> {
    app_id: i64,
    ios_private_key: Option<&'a [u8]>,
    ios_team_id: Option<&'a str>,
    ios_key_id: Option<&'a str>,
    ios_bundle: Option<&'a str>,
    android_server_key: Option<&'a str>,
    android_bundle: Option<&'a str>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = push_app_credential, treat_none_as_null = true)]
struct IosCredentialChanges<'a> {
    ios_private_key: Option<&'a [u8]>,
    ios_team_id: Option<&'a str>,
    ios_key_id: Option<&'a str>,
    ios_bundle: Option<&'a str>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = push_app_credential, treat_none_as_null = true)]
struct AndroidCredentialChanges<'a> {
    android_server_key: Option<&'a str>,
    android_bundle: Option<&'a str>,
    updated_at: DateTime<Utc>,
}

pub struct PgAppCredentialStore {
    pool: Arc<DbPool>,
}

impl PgAppCredentialStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppCredentialStore for PgAppCredentialStore {
    async fn find_by_app_id(&self, app_id: i64) -> Result<Option<AppCredential>, PushError> {
        let mut conn = get_connection(&self.pool).await?;

        let row: Option<AppCredentialRow> = push_app_credential::table
            .filter(push_app_credential::app_id.eq(app_id))
            .select(AppCredentialRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(AppCredential::from))
    }

    async fn upsert(&self, app_id: i64, patch: CredentialPatch) -> Result<AppCredential, PushError> {
        let mut conn = get_connection(&self.pool).await?;
        let now = Utc::now();

        let row: AppCredentialRow = conn
            .transaction::<_, PushError, _>(|conn| {
                async move {
                    let insert = diesel::insert_into(push_app_credential::table);
                    let row = match &patch {
                        CredentialPatch::Ios(ios) => {
                            let ios = ios.as_ref();
                            let new_row = NewAppCredential {
                                app_id,
                                ios_private_key: ios.map(|c| c.private_key.as_slice()),
                                ios_team_id: ios.map(|c| c.team_id.as_str()),
                                ios_key_id: ios.map(|c| c.key_id.as_str()),
                                ios_bundle: ios.map(|c| c.bundle.as_str()),
                                android_server_key: None,
                                android_bundle: None,
                                updated_at: now,
                            };
                            let changes = IosCredentialChanges {
                                ios_private_key: new_row.ios_private_key,
                                ios_team_id: new_row.ios_team_id,
                                ios_key_id: new_row.ios_key_id,
                                ios_bundle: new_row.ios_bundle,
                                updated_at: now,
                            };
                            insert
                                .values(&new_row)
                                .on_conflict(push_app_credential::app_id)
                                .do_update()
                                .set(&changes)
                                .returning(AppCredentialRow::as_returning())
                                .get_result(conn)
                                .await?
                        }
                        CredentialPatch::Android(android) => {
                            let android = android.as_ref();
                            let new_row = NewAppCredential {
                                app_id,
                                ios_private_key: None,
                                ios_team_id: None,
                                ios_key_id: None,
                                ios_bundle: None,
                                android_server_key: android.map(|c| c.server_key.as_str()),
                                android_bundle: android.map(|c| c.bundle.as_str()),
                                updated_at: now,
                            };
                            let changes = AndroidCredentialChanges {
                                android_server_key: new_row.android_server_key,
                                android_bundle: new_row.android_bundle,
                                updated_at: now,
                            };
                            insert
                                .values(&new_row)
                                .on_conflict(push_app_credential::app_id)
                                .do_update()
                                .set(&changes)
                                .returning(AppCredentialRow::as_returning())
                                .get_result(conn)
                                .await?
                        }
                    };
                    Ok(row)
                }
                .scope_boxed()
            })
            .await?;

        Ok(AppCredential::from(row))
    }

    async fn delete(&self, app_id: i64) -> Result<bool, PushError> {
        let mut conn = get_connection(&self.pool).await?;

        let deleted = conn
            .transaction::<_, PushError, _>(|conn| {
                async move {
                    let deleted = diesel::delete(
                        push_app_credential::table.filter(push_app_credential::app_id.eq(app_id)),
                    )
                    .execute(conn)
                    .await?;
                    Ok(deleted)
                }
                .scope_boxed()
            })
            .await?;

        Ok(deleted > 0)
    }
}
