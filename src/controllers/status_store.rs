//! Status writes guarded by optimistic concurrency

use std::fmt::Debug;

use async_trait::async_trait;
use kube::{
    api::{Patch, PatchParams},
    Api, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::crd::OperationStatus;
use crate::error::{Error, Result};
use crate::metrics;

/// Where the local status of one backup or restore is persisted
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Replace the status. Fails with [`Error::Conflict`] when the resource
    /// changed since it was read.
    async fn write(&self, status: &OperationStatus) -> Result<()>;
}

/// [`StatusStore`] writing the status subresource of a custom resource
pub struct KubeStatusStore<K> {
    api: Api<K>,
    kind: String,
    name: String,
    namespace: String,
    resource_version: Option<String>,
}

impl<K> KubeStatusStore<K>
where
    K: Resource<DynamicType = ()>,
{
    /// Store for `obj` as it was observed; writes carry its resourceVersion
    pub fn new(api: Api<K>, obj: &K) -> Self {
        Self {
            api,
            kind: K::kind(&()).to_string(),
            name: obj.name_any(),
            namespace: obj.namespace().unwrap_or_default(),
            resource_version: obj.resource_version(),
        }
    }
}

#[async_trait]
impl<K> StatusStore for KubeStatusStore<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync,
{
    async fn write(&self, status: &OperationStatus) -> Result<()> {
        // explicit nulls so a reset clears fields a merge patch would otherwise keep
        let patch = json!({
            "metadata": { "resourceVersion": self.resource_version },
            "status": {
                "state": status.state,
                "progress": status.progress,
                "errors": status.errors,
            }
        });

        match self
            .api
            .patch_status(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                metrics::STATUS_UPDATES.with_label_values(&[&self.kind]).inc();
                metrics::record_progress(
                    &self.kind,
                    &self.namespace,
                    &self.name,
                    status.state,
                    status.progress,
                );
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 409 => {
                metrics::STATUS_CONFLICTS.with_label_values(&[&self.kind]).inc();
                Err(Error::Conflict(format!("{}/{}", self.namespace, self.name)))
            }
            Err(e) => Err(Error::Kube(e)),
        }
    }
}
