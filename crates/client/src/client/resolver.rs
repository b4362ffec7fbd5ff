//! Read/write origin selection and cluster leader discovery.
//!
//! Reads always go to the appliance. Writes go to the cluster leader, which
//! is looked up through `Cluster/Members` when its cache has expired.
//!
//! # Invariants
//! - A failed lookup keeps the previous leader; with no previous leader the
//!   appliance origin is used.
//! - The appliance and leader caches are never locked at the same time.

use tracing::{debug, instrument, warn};

use crate::client::SafeguardClient;
use crate::client::dispatch::RequestOptions;
use crate::error::{ClientError, Result};
use crate::models::ClusterMember;
use crate::origin::Origin;

/// Filter that selects the leader member.
const LEADER_FILTER: &str = "IsLeader eq true";

impl SafeguardClient {
    /// Origin used for GET requests and the first POST attempt.
    pub fn resolve_read_origin(&self) -> Result<String> {
        self.appliance_url()
    }

    /// Origin of the cluster leader, refreshed first if its cache expired.
    pub async fn resolve_write_origin(&self) -> Result<String> {
        if self.inner.leader.is_expired() {
            self.refresh_leader().await;
        }
        match self.inner.leader.read() {
            Some(leader) => Ok(leader),
            None => self.appliance_url(),
        }
    }

    /// Look up the leader and cache its origin. Failures are logged only.
    #[instrument(skip(self))]
    pub(crate) async fn refresh_leader(&self) {
        let outcome = self.discover_leader().await;
        if let Some(metrics) = self.metrics() {
            metrics.record_leader_refresh(outcome.is_ok());
        }

        match outcome {
            Ok(origin) => {
                debug!(leader = %origin, "Resolved cluster leader");
                self.inner
                    .leader
                    .store(origin, self.inner.settings.leader_cache);
            }
            Err(e) => {
                warn!(
                    error = %e,
                    stale = ?self.inner.leader.read(),
                    "Cluster leader lookup failed; keeping previous leader"
                );
            }
        }
    }

    async fn discover_leader(&self) -> Result<Origin> {
        let appliance = self
            .inner
            .appliance
            .origin()
            .ok_or_else(|| ClientError::InvalidUrl("appliance origin is not set".to_string()))?;

        let options = RequestOptions::new().query("filter", LEADER_FILTER);
        let body = self
            .send_once(reqwest::Method::GET, &appliance.url(), "Cluster/Members", &options)
            .await?;

        let members: Vec<ClusterMember> = serde_json::from_slice(&body)
            .map_err(|e| ClientError::InvalidResponse(format!("cluster members: {e}")))?;
        leader_origin(&appliance, &members)
    }
}

/// Derive the leader origin from the appliance origin and the member list.
pub(crate) fn leader_origin(appliance: &Origin, members: &[ClusterMember]) -> Result<Origin> {
    let leader = members
        .iter()
        .find(|m| m.is_leader)
        .or_else(|| members.first())
        .ok_or_else(|| ClientError::InvalidResponse("cluster has no members".to_string()))?;

    let label = leader.host_label().ok_or_else(|| {
        ClientError::InvalidResponse(format!("leader {} has no host name", leader.id))
    })?;
    Ok(appliance.with_host_label(label))
}
