//! Registration and heartbeat handling
//!
//! An announce without a token registers a new node after confirming it is
//! reachable. An announce with a token is a heartbeat for the node that token
//! was issued to.

use std::sync::Arc;

use chrono::Utc;
use rollcall_common::{RollcallError, is_valid_domain, normalize_domain};
use rollcall_persistence::{NodePersistence, NodeRecord, NodeStats, PersistenceError};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::merge;
use crate::probe::NodeProbe;

const REGISTERED_MESSAGE: &str =
    "Node registered. Keep this token: it is required for heartbeats and removal and will not be shown again.";

/// Body of `POST /announce`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnnounceRequest {
    pub domain: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub token: Option<String>,
    pub track_count: Option<i64>,
    pub user_count: Option<i64>,
    pub open_registration: Option<bool>,
    pub p2p_enabled: Option<bool>,
    pub p2p_node_id: Option<String>,
}

/// Result of a successful announce
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnnounceOutcome {
    Registered {
        id: String,
        domain: String,
        token: String,
        message: String,
    },
    Updated {
        id: String,
        domain: String,
    },
}

impl AnnounceOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, AnnounceOutcome::Registered { .. })
    }
}

/// Generate a fresh node token: 32 random bytes, hex encoded
pub fn generate_token() -> String {
    const_hex::encode(rand::random::<[u8; 32]>())
}

/// Normalize and validate a caller-supplied domain
pub fn parse_domain(raw: Option<&str>) -> Result<String, RollcallError> {
    let domain = raw.map(normalize_domain).unwrap_or_default();

    if domain.is_empty() {
        return Err(RollcallError::invalid_input("domain is required")
            .with_hint("send the node's public host, e.g. {\"domain\": \"node.example.com\"}"));
    }
    if !is_valid_domain(&domain) {
        return Err(RollcallError::invalid_input(format!("invalid domain: {}", domain))
            .with_hint("use a bare host[:port] without a path"));
    }
    Ok(domain)
}

fn store_failure(err: anyhow::Error) -> RollcallError {
    error!(error = %err, "Node store operation failed");
    RollcallError::internal("storage failure")
}

/// Registry operations shared by the HTTP layer
pub struct RegistryService {
    store: Arc<dyn NodePersistence>,
    probe: Arc<dyn NodeProbe>,
}

impl RegistryService {
    pub fn new(store: Arc<dyn NodePersistence>, probe: Arc<dyn NodeProbe>) -> Self {
        Self { store, probe }
    }

    pub fn store(&self) -> Arc<dyn NodePersistence> {
        self.store.clone()
    }

    pub fn probe(&self) -> Arc<dyn NodeProbe> {
        self.probe.clone()
    }

    /// Register a new node or apply a heartbeat
    pub async fn announce(&self, request: AnnounceRequest) -> Result<AnnounceOutcome, RollcallError> {
        let domain = parse_domain(request.domain.as_deref())?;

        let token = request
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        match token {
            Some(token) => self.heartbeat(&token, domain, &request).await,
            None => self.register(domain, &request).await,
        }
    }

    async fn heartbeat(
        &self,
        token: &str,
        domain: String,
        request: &AnnounceRequest,
    ) -> Result<AnnounceOutcome, RollcallError> {
        let existing = self
            .store
            .node_find_by_token(token)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| {
                RollcallError::unauthorized("unknown token")
                    .with_hint("omit the token to register a new node")
            })?;

        if existing.domain != domain {
            warn!(domain = %domain, registered = %existing.domain, "Heartbeat token used for another domain");
            return Err(RollcallError::forbidden("token does not belong to this domain"));
        }

        let fetched = self.probe.fetch_info(&domain).await;
        let updated = merge::merge_heartbeat(&existing, request, fetched.as_ref(), Utc::now());

        if !self.store.node_update(&updated).await.map_err(store_failure)? {
            return Err(RollcallError::not_found("node was removed")
                .with_hint("announce again without a token to re-register"));
        }

        if !existing.is_online {
            info!(domain = %domain, "Node back online via heartbeat");
        }
        info!(domain = %domain, id = %updated.id, "Heartbeat accepted");

        Ok(AnnounceOutcome::Updated {
            id: updated.id,
            domain: updated.domain,
        })
    }

    async fn register(
        &self,
        domain: String,
        request: &AnnounceRequest,
    ) -> Result<AnnounceOutcome, RollcallError> {
        let conflict = || {
            RollcallError::conflict(format!("{} is already registered", domain))
                .with_hint("include the token issued at registration to send a heartbeat")
        };

        if self
            .store
            .node_find_by_domain(&domain)
            .await
            .map_err(store_failure)?
            .is_some()
        {
            return Err(conflict());
        }

        if !self.probe.probe_health(&domain).await {
            info!(domain = %domain, "Registration rejected: health probe failed");
            return Err(RollcallError::unprocessable(format!(
                "{} did not pass the health check",
                domain
            ))
            .with_hint("GET /healthz on the node must answer 2xx with {\"status\":\"ok\"}"));
        }

        let fetched = self.probe.fetch_info(&domain).await;
        let record = merge::new_record(
            uuid::Uuid::new_v4().to_string(),
            generate_token(),
            domain.clone(),
            request,
            fetched.as_ref(),
            Utc::now(),
        );

        if let Err(err) = self.store.node_insert(&record).await {
            if err.downcast_ref::<PersistenceError>().is_some() {
                return Err(conflict());
            }
            return Err(store_failure(err));
        }

        info!(domain = %domain, id = %record.id, "Node registered");

        Ok(AnnounceOutcome::Registered {
            id: record.id,
            domain: record.domain,
            token: record.token,
            message: REGISTERED_MESSAGE.to_string(),
        })
    }

    pub async fn get_node(&self, domain: &str) -> Result<NodeRecord, RollcallError> {
        let domain = normalize_domain(domain);
        self.store
            .node_find_by_domain(&domain)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| RollcallError::not_found(format!("node {} not found", domain)))
    }

    pub async fn list_nodes(&self, include_offline: bool) -> Result<Vec<NodeRecord>, RollcallError> {
        self.store
            .node_list(include_offline)
            .await
            .map_err(store_failure)
    }

    /// Delete a node; the token must match the domain's record
    pub async fn remove_node(&self, domain: &str, token: &str) -> Result<String, RollcallError> {
        let domain = normalize_domain(domain);
        let removed = self
            .store
            .node_delete_by_domain_and_token(&domain, token)
            .await
            .map_err(store_failure)?;

        if !removed {
            return Err(RollcallError::not_found("no node matches this domain and token"));
        }

        info!(domain = %domain, "Node removed by owner");
        Ok(domain)
    }

    pub async fn stats(&self) -> Result<NodeStats, RollcallError> {
        self.store.node_stats().await.map_err(store_failure)
    }

    /// Whether the backing store answers
    pub async fn health_check(&self) -> Result<(), RollcallError> {
        self.store
            .health_check()
            .await
            .map_err(|e| RollcallError::internal(e.to_string()))
    }
}
