pub mod activation;
pub mod config;
pub mod context;
pub mod db;
pub mod envelope;
pub mod error;
pub mod schema;
pub mod store;
pub mod types;

pub use activation::{ActivationGateway, ActivationStatus, ActivationStatusInfo, PowerAuthRestClient};
pub use config::Config;
pub use context::PushContext;
pub use db::DbPool;
pub use envelope::{ErrorDetail, ObjectRequest, ObjectResponse, ResponseStatus};
pub use error::{PushError, PushResult};
pub use types::{
    ActivationLinkage, AndroidCredential, AppCredential, CredentialPatch, DeviceRegistration,
    EncryptionKey, IosCredential, Platform, RegistrationUpsert,
};
