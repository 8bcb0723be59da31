//! Read-only view of the CassandraCluster resource
//!
//! The cluster resource is owned by the cluster controller; only the fields
//! needed to address the coordinator pod are modelled here.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "db.ibm.com",
    version = "v1alpha1",
    kind = "CassandraCluster",
    plural = "cassandraclusters",
    namespaced,
    status = "CassandraClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct CassandraClusterSpec {
    /// Datacenters; the first one hosts the coordinator
    #[serde(default)]
    pub dcs: Vec<DcSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct DcSpec {
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CassandraClusterStatus {
    #[serde(default, rename = "readyAllDCs")]
    pub ready_all_dcs: bool,
}

impl CassandraCluster {
    /// First datacenter name, used for storage paths and the coordinator address
    pub fn first_dc(&self) -> Option<&str> {
        self.spec.dcs.first().map(|dc| dc.name.as_str())
    }

    pub fn is_ready(&self) -> bool {
        self.status.as_ref().map(|s| s.ready_all_dcs).unwrap_or(false)
    }
}
