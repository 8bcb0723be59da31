//! Client side of the operation service that executes backups and restores
//! on the Cassandra nodes.

mod client;
mod types;

pub use client::*;
pub use types::*;
