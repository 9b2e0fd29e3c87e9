use std::sync::Arc;

use crate::activation::{ActivationGateway, PowerAuthRestClient};
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::store::{
    AppCredentialStore, DeviceRegistrationStore, PgAppCredentialStore, PgDeviceRegistrationStore,
};

/// Shared handles for every component of the push server.
#[derive(Clone)]
pub struct PushContext {
    pub config: Arc<Config>,
    pub devices: Arc<dyn DeviceRegistrationStore>,
    pub credentials: Arc<dyn AppCredentialStore>,
    pub gateway: Arc<dyn ActivationGateway>,
}

impl PushContext {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = create_pool(&config.database).await?;
        run_migrations(&config.database).await?;
        let gateway = PowerAuthRestClient::new(&config.powerauth)?;

        Ok(PushContext {
            devices: Arc::new(PgDeviceRegistrationStore::new(db_pool.clone())),
            credentials: Arc::new(PgAppCredentialStore::new(db_pool)),
            gateway: Arc::new(gateway),
            config: Arc::new(config),
        })
    }

    /// Assemble a context from already constructed parts.
    pub fn from_parts(
        config: Config,
        devices: Arc<dyn DeviceRegistrationStore>,
        credentials: Arc<dyn AppCredentialStore>,
        gateway: Arc<dyn ActivationGateway>,
    ) -> Self {
        PushContext {
            config: Arc::new(config),
            devices,
            credentials,
            gateway,
        }
    }
}
