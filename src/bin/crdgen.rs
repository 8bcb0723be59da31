//! CRD YAML Generator
//!
//! Prints the Kubernetes CRD manifests owned by the cassandra-backup-operator.
//!
//! Usage: cargo run --bin crdgen > deploy/crds/all.yaml

use cassandra_backup_operator::crd::generate_crds;

fn main() -> Result<(), serde_yaml::Error> {
    for crd in generate_crds()? {
        println!("---");
        print!("{}", crd);
    }
    Ok(())
}
