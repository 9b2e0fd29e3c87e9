pub mod credential;
pub mod device;

pub use credential::{AppCredentialDetail, CredentialService};
pub use device::{DeviceService, RegisterDevice};
