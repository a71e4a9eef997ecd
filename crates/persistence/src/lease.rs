//! Soft lease marking which process owns idle accrual.
//!
//! The background aggregator renews the lease every tick. A holder that
//! dies stops renewing and its lease expires after the TTL, after which
//! the foreground loop resumes accrual on its own.

use crate::{PersistError, Store};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Key of the aggregator lease.
pub const LEASE_KEY: &str = "idle-clicker:aggregator-lease";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRecord {
    /// Identifier of the owning process.
    pub holder: String,
    /// Wall-clock milliseconds after which the lease is void.
    pub expires_at: i64,
}

impl LeaseRecord {
    pub fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }
}

/// Result of a renewal attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaseOutcome {
    /// The caller holds the lease until the returned expiry.
    Acquired(LeaseRecord),
    /// Another holder's lease is still live.
    HeldBy(LeaseRecord),
}

async fn read_raw<S: Store>(store: &S) -> Result<Option<LeaseRecord>, PersistError> {
    let Some(raw) = store.get(LEASE_KEY).await? else {
        return Ok(None);
    };
    match serde_json::from_str::<LeaseRecord>(&raw) {
        Ok(rec) => Ok(Some(rec)),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable lease record");
            Ok(None)
        }
    }
}

/// The current lease if it has not expired.
pub async fn read_lease<S: Store>(
    store: &S,
    now_ms: i64,
) -> Result<Option<LeaseRecord>, PersistError> {
    Ok(read_raw(store).await?.filter(|rec| rec.is_live(now_ms)))
}

/// Take or extend the lease for `holder` unless someone else holds a live one.
pub async fn renew_lease<S: Store>(
    store: &S,
    holder: &str,
    now_ms: i64,
    ttl_ms: i64,
) -> Result<LeaseOutcome, PersistError> {
    if let Some(current) = read_lease(store, now_ms).await? {
        if current.holder != holder {
            return Ok(LeaseOutcome::HeldBy(current));
        }
    }
    let rec = LeaseRecord {
        holder: holder.to_string(),
        expires_at: now_ms.saturating_add(ttl_ms),
    };
    store.set(LEASE_KEY, serde_json::to_string(&rec)?).await?;
    debug!(holder, expires_at = rec.expires_at, "lease renewed");
    Ok(LeaseOutcome::Acquired(rec))
}

/// Drop the lease if `holder` owns it or it is unreadable. Returns whether
/// anything was removed.
pub async fn release_lease<S: Store>(store: &S, holder: &str) -> Result<bool, PersistError> {
    let owned = match store.get(LEASE_KEY).await? {
        None => return Ok(false),
        Some(raw) => match serde_json::from_str::<LeaseRecord>(&raw) {
            Ok(rec) => rec.holder == holder,
            Err(_) => true,
        },
    };
    if owned {
        store.remove(LEASE_KEY).await?;
        debug!(holder, "lease released");
    }
    Ok(owned)
}
