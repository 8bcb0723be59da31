//! Cassandra Backup Kubernetes Operator
//!
//! This operator reconciles CassandraBackup and CassandraRestore resources
//! against the operation service running on the Cassandra nodes, which
//! performs the actual snapshot upload and download.

pub mod adapters;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod operations;
pub mod reconcilers;

pub use error::{Error, Result};
