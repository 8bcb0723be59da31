//! Storage location adapter
//!
//! Validates user supplied storage locations and derives the per-cluster path
//! the operation service reads from and writes to.

use crate::crd::{CassandraCluster, StorageProvider};
use crate::error::{Error, Result};

/// Check that a location has the `protocol://path` form with a supported protocol
pub fn validate_storage_location(location: &str) -> Result<StorageProvider> {
    let Some(index) = location.find("://") else {
        return Err(Error::validation(
            "storage location should be in format 'protocol://backup/location'",
        ));
    };

    StorageProvider::from_location(location).ok_or_else(|| {
        let supported: Vec<&str> = StorageProvider::ALL.iter().map(|p| p.scheme()).collect();
        Error::validation(format!(
            "protocol {} is not supported. Should be one of the following: {:?}",
            &location[..index],
            supported
        ))
    })
}

/// `{location}/{cluster}/{first dc}/1`, adding the separator only when missing
pub fn cluster_storage_path(location: &str, cluster: &CassandraCluster) -> Result<String> {
    if location.is_empty() {
        return Err(Error::storage("storage location is empty"));
    }

    let cluster_name = cluster
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| Error::storage("CassandraCluster has no name"))?;
    let dc = cluster.first_dc().ok_or_else(|| {
        Error::storage(format!("CassandraCluster {} has no DCs defined", cluster_name))
    })?;

    let separator = if location.ends_with('/') { "" } else { "/" };
    Ok(format!("{location}{separator}{cluster_name}/{dc}/1"))
}
