//! Selection of the remote operation a backup or restore refers to

use chrono::{DateTime, FixedOffset};
use tracing::warn;

use crate::operations::{Backup, RemoteOperation, Restore};

/// Coordinator backup record for `tag`.
///
/// Incremental backups are recorded under `{tag}-{schemaVersion}-…`, so a
/// schema-qualified tag containing `{tag}-{schemaVersion}` matches as well as
/// the exact tag.
pub fn find_related_backup<'a>(backups: &'a [Backup], tag: &str) -> Option<&'a Backup> {
    let candidates = backups
        .iter()
        .filter(|b| b.is_global())
        .filter(|b| {
            b.snapshot_tag == tag
                || b.snapshot_tag
                    .contains(&format!("{}-{}", tag, b.schema_version))
        })
        .collect();
    latest(candidates)
}

/// Coordinator restore record for `tag`, matched exactly
pub fn find_related_restore<'a>(restores: &'a [Restore], tag: &str) -> Option<&'a Restore> {
    let candidates = restores
        .iter()
        .filter(|r| r.is_global() && r.snapshot_tag == tag)
        .collect();
    latest(candidates)
}

/// Most recently created candidate.
///
/// Candidates with an unparsable creation time are skipped. When none parses,
/// the candidate with the greatest `(creation time, id)` pair is kept so the
/// result never depends on list order.
fn latest<O: RemoteOperation>(candidates: Vec<&O>) -> Option<&O> {
    if candidates.len() <= 1 {
        return candidates.into_iter().next();
    }

    let mut parsed: Vec<(DateTime<FixedOffset>, &O)> = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        match DateTime::parse_from_rfc3339(candidate.creation_time()) {
            Ok(created) => parsed.push((created, *candidate)),
            Err(e) => warn!(
                operation_id = %candidate.id(),
                snapshot_tag = %candidate.snapshot_tag(),
                error = %e,
                "Couldn't parse creation time of operation, skipping it"
            ),
        }
    }

    parsed
        .into_iter()
        .max_by(|(a_time, a), (b_time, b)| a_time.cmp(b_time).then_with(|| a.id().cmp(b.id())))
        .map(|(_, op)| op)
        .or_else(|| {
            candidates
                .into_iter()
                .max_by(|a, b| {
                    a.creation_time()
                        .cmp(b.creation_time())
                        .then_with(|| a.id().cmp(b.id()))
                })
        })
}
