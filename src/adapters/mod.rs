//! Adapters between the custom resources and the operation service
//!
//! Request builders turn a backup/restore spec into the request the operation
//! service expects, and rebuild the request an observed operation was created
//! from so the two can be compared.

mod backup_request;
mod restore_request;
mod secrets;
mod storage_config;

pub use backup_request::*;
pub use restore_request::*;
pub use secrets::*;
pub use storage_config::*;
