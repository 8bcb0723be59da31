//! Custom Resource Definitions for the Cassandra Backup Operator

mod cassandra_backup;
mod cassandra_cluster;
mod cassandra_restore;

pub use cassandra_backup::*;
pub use cassandra_cluster::*;
pub use cassandra_restore::*;

use kube::CustomResourceExt;

/// Generate the CRD YAML manifests owned by this operator
pub fn generate_crds() -> Result<Vec<String>, serde_yaml::Error> {
    Ok(vec![
        serde_yaml::to_string(&CassandraBackup::crd())?,
        serde_yaml::to_string(&CassandraRestore::crd())?,
    ])
}
