//! Storage credentials secret lookup and validation

use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, ResourceExt};
use tracing::info;

use crate::crd::StorageProvider;
use crate::error::{Error, Result};

/// Fetch a secret from Kubernetes
pub async fn get_secret(client: &Client, name: &str, namespace: &str) -> Result<Secret> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    secrets.get(name).await.map_err(|e| match e {
        kube::Error::Api(api_err) if api_err.code == 404 => {
            Error::SecretNotFound(format!("{}/{}", namespace, name))
        }
        other => Error::Kube(other),
    })
}

fn has_key(secret: &Secret, key: &str) -> bool {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| !value.0.is_empty())
        .unwrap_or(false)
}

fn invalid(secret: &Secret, reason: impl Into<String>) -> Error {
    Error::InvalidSecret {
        secret: secret.name_any(),
        reason: reason.into(),
    }
}

/// Check that a secret carries the keys the operation service needs for `provider`
pub fn validate_storage_secret(secret: &Secret, provider: StorageProvider) -> Result<()> {
    match provider {
        p if p.is_s3_compatible() => {
            let has_secret_key = has_key(secret, "awssecretaccesskey");
            let has_key_id = has_key(secret, "awsaccesskeyid");

            if !has_secret_key || !has_key_id {
                info!(
                    secret = %secret.name_any(),
                    "AWS access keys are not set, AWS compatible env vars will be used to obtain credentials"
                );
            }

            if has_secret_key && has_key_id && !has_key(secret, "awsregion") {
                return Err(invalid(
                    secret,
                    "there is no 'awsregion' property while both 'awssecretaccesskey' and 'awsaccesskeyid' are set",
                ));
            }

            if has_key(secret, "awsendpoint") && !has_key(secret, "awsregion") {
                return Err(invalid(
                    secret,
                    "'awsendpoint' is specified but 'awsregion' is not set",
                ));
            }
        }
        StorageProvider::Gcp => {
            if !has_key(secret, "gcp") {
                return Err(invalid(secret, "storage provider is GCP but key 'gcp' is not set"));
            }
        }
        StorageProvider::Azure => {
            for key in ["azurestorageaccount", "azurestoragekey"] {
                if !has_key(secret, key) {
                    return Err(invalid(secret, format!("'{}' key is not set", key)));
                }
            }
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;

    fn secret(keys: &[(&str, &str)]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("storage-credentials".to_string()),
                ..Default::default()
            },
            data: Some(
                keys.iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn s3_without_keys_falls_back_to_environment() {
        assert!(validate_storage_secret(&secret(&[]), StorageProvider::S3).is_ok());
    }

    #[test]
    fn s3_keys_require_region() {
        let keys = [("awssecretaccesskey", "s"), ("awsaccesskeyid", "k")];
        let err = validate_storage_secret(&secret(&keys), StorageProvider::Minio).unwrap_err();
        assert!(matches!(err, Error::InvalidSecret { .. }));
        assert!(err.to_string().contains("awsregion"));

        let keys = [
            ("awssecretaccesskey", "s"),
            ("awsaccesskeyid", "k"),
            ("awsregion", "us-east-1"),
        ];
        assert!(validate_storage_secret(&secret(&keys), StorageProvider::S3).is_ok());
    }

    #[test]
    fn endpoint_requires_region() {
        let err = validate_storage_secret(&secret(&[("awsendpoint", "http://minio:9000")]), StorageProvider::Ceph)
            .unwrap_err();
        assert!(err.to_string().contains("awsendpoint"));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let err = validate_storage_secret(&secret(&[("gcp", "")]), StorageProvider::Gcp).unwrap_err();
        assert!(err.to_string().contains("'gcp'"));
        assert!(validate_storage_secret(&secret(&[("gcp", "{}")]), StorageProvider::Gcp).is_ok());
    }

    #[test]
    fn azure_requires_account_and_key() {
        let err = validate_storage_secret(&secret(&[("azurestorageaccount", "acct")]), StorageProvider::Azure)
            .unwrap_err();
        assert!(err.to_string().contains("azurestoragekey"));
    }
}
