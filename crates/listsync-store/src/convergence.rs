//! Convergence checking between a store and its gateway.
//!
//! A store has converged when nothing is pending and its snapshot holds
//! exactly what the gateway returns for its criteria, in the same order.

use listsync_core::{Entity, Record};
use listsync_gateway::Gateway;

use crate::error::Result;
use crate::store::SyncStore;

/// Domain separation prefix for snapshot digests.
const DIGEST_PREFIX: &[u8] = b"listsync-snapshot-v0:";

/// Outcome of a convergence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Local and remote agree.
    Converged { digest: String },
    /// They differ, with a human-readable reason.
    NotConverged { reason: String },
}

impl ConvergenceResult {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged { .. })
    }
}

/// Hash a list of records, order-sensitive.
///
/// Each record contributes its id and its canonical JSON body (keys sorted).
pub fn snapshot_digest<E: Entity>(records: &[Record<E>]) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DIGEST_PREFIX);
    hasher.update(&(records.len() as u64).to_le_bytes());

    for record in records {
        let id = record.id.as_str().as_bytes();
        hasher.update(&(id.len() as u64).to_le_bytes());
        hasher.update(id);

        let body = serde_json::to_vec(&record.to_document()?)
            .map_err(|e| listsync_core::CoreError::Encode {
                entity: E::NAME,
                message: e.to_string(),
            })?;
        hasher.update(&(body.len() as u64).to_le_bytes());
        hasher.update(&body);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Compare a store's snapshot with what `gateway` returns for the store's
/// criteria.
pub async fn verify_convergence<E, G, R>(
    store: &SyncStore<E, G>,
    gateway: &R,
) -> Result<ConvergenceResult>
where
    E: Entity,
    G: Gateway + 'static,
    R: Gateway + ?Sized,
{
    let view = store.snapshot();
    if !view.pending.is_empty() {
        return Ok(ConvergenceResult::NotConverged {
            reason: format!("{} mutations pending", view.pending.len()),
        });
    }

    let criteria = store.criteria();
    let order = criteria.order.as_ref();
    let documents = if criteria.is_unfiltered() {
        gateway.list(E::NAME, order, criteria.limit).await?
    } else {
        gateway
            .filter(E::NAME, &criteria.predicate, order, criteria.limit)
            .await?
    };
    let mut remote = documents
        .into_iter()
        .map(Record::<E>::from_document)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if criteria.reverse {
        remote.reverse();
    }

    if view.records.len() != remote.len() {
        return Ok(ConvergenceResult::NotConverged {
            reason: format!(
                "local has {} records, remote has {}",
                view.records.len(),
                remote.len()
            ),
        });
    }
    if let Some((local, remote)) = view
        .records
        .iter()
        .zip(&remote)
        .find(|(local, remote)| local.id != remote.id)
    {
        return Ok(ConvergenceResult::NotConverged {
            reason: format!("order differs: local {} vs remote {}", local.id, remote.id),
        });
    }

    let local_digest = snapshot_digest(&view.records)?;
    let remote_digest = snapshot_digest(&remote)?;
    if local_digest != remote_digest {
        return Ok(ConvergenceResult::NotConverged {
            reason: "record contents differ".into(),
        });
    }

    Ok(ConvergenceResult::Converged {
        digest: local_digest,
    })
}
