//! Health sweeper
//!
//! Periodically re-probes every stored node:
//! - healthy: back online, timestamps refreshed, fetched info merged
//! - unhealthy: marked offline on the transition (`down_since = now`)
//! - offline for at least the eviction threshold: deleted
//!
//! A node that goes offline in a cycle has `down_since == now` and is never
//! evicted by that same cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::StreamExt;
use futures::stream;
use rollcall_persistence::{NodePersistence, NodeRecord};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::merge;
use crate::probe::NodeProbe;

/// Sweeper timing and limits
#[derive(Clone, Debug)]
pub struct SweeperConfig {
    /// Time between cycles (default: 5 minutes)
    pub interval: Duration,
    /// Delay before the first cycle (default: 10 seconds)
    pub initial_delay: Duration,
    /// Continuous downtime after which a node is deleted (default: 48 hours)
    pub eviction_after: TimeDelta,
    /// Maximum nodes probed at once (default: 16)
    pub concurrency: usize,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            initial_delay: Duration::from_secs(10),
            eviction_after: TimeDelta::hours(48),
            concurrency: 16,
        }
    }
}

/// Per-cycle counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub online: usize,
    pub went_offline: usize,
    pub recovered: usize,
    pub evicted: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum NodeOutcome {
    Healthy { recovered: bool },
    Unhealthy { went_offline: bool },
    Evicted,
    /// Deleted by someone else while being checked
    Vanished,
}

impl SweepReport {
    fn record(&mut self, outcome: NodeOutcome) {
        match outcome {
            NodeOutcome::Healthy { recovered } => {
                self.online += 1;
                if recovered {
                    self.recovered += 1;
                }
            }
            NodeOutcome::Unhealthy { went_offline } => {
                if went_offline {
                    self.went_offline += 1;
                }
            }
            NodeOutcome::Evicted => self.evicted += 1,
            NodeOutcome::Vanished => {}
        }
    }
}

/// Background re-prober for all stored nodes
#[derive(Clone)]
pub struct HealthSweeper {
    store: Arc<dyn NodePersistence>,
    probe: Arc<dyn NodeProbe>,
    config: SweeperConfig,
}

/// Running sweeper loop; dropping it leaves the loop running until the runtime stops
pub struct SweeperHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the loop to stop and wait for it. An in-flight cycle completes first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Health sweeper task ended abnormally: {}", e);
        }
        info!("Health sweeper stopped");
    }
}

impl HealthSweeper {
    pub fn new(
        store: Arc<dyn NodePersistence>,
        probe: Arc<dyn NodeProbe>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            store,
            probe,
            config,
        }
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Spawn the periodic loop on the current tokio runtime
    pub fn start(&self) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let sweeper = self.clone();

        info!(
            "Starting health sweeper (interval: {:?}, initial delay: {:?}, eviction after: {}h)",
            self.config.interval,
            self.config.initial_delay,
            self.config.eviction_after.num_hours()
        );

        let task = tokio::spawn(async move {
            let start = Instant::now() + sweeper.config.initial_delay;
            let mut ticker = tokio::time::interval_at(start, sweeper.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweeper.sweep().await;
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });

        SweeperHandle { stop_tx, task }
    }

    /// Run one cycle now
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    /// Run one cycle using `now` as the cycle time
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let records = match self.store.node_list(true).await {
            Ok(records) => records,
            Err(e) => {
                error!("Health sweep skipped, failed to list nodes: {}", e);
                return report;
            }
        };

        let eviction_after = self.config.eviction_after;
        let tasks = records.into_iter().map(|record| {
            let store = self.store.clone();
            let probe = self.probe.clone();
            let domain = record.domain.clone();
            let handle = tokio::spawn(async move {
                check_node(store, probe, record, now, eviction_after).await
            });
            async move { (domain, handle.await) }
        });

        let results: Vec<_> = stream::iter(tasks)
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for (domain, result) in results {
            report.checked += 1;
            match result {
                Ok(Ok(outcome)) => report.record(outcome),
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(domain = %domain, "Health sweep failed for node: {}", e);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(domain = %domain, "Health sweep task panicked: {}", e);
                }
            }
        }

        info!(
            checked = report.checked,
            online = report.online,
            went_offline = report.went_offline,
            recovered = report.recovered,
            evicted = report.evicted,
            failed = report.failed,
            "Health sweep completed"
        );
        report
    }
}

async fn check_node(
    store: Arc<dyn NodePersistence>,
    probe: Arc<dyn NodeProbe>,
    record: NodeRecord,
    now: DateTime<Utc>,
    eviction_after: TimeDelta,
) -> anyhow::Result<NodeOutcome> {
    let domain = record.domain.as_str();

    if probe.probe_health(domain).await {
        let fetched = probe.fetch_info(domain).await;
        let updated = merge::merge_probe(&record, fetched.as_ref(), now);
        if !store.node_update(&updated).await? {
            return Ok(NodeOutcome::Vanished);
        }

        let recovered = !record.is_online;
        if recovered {
            info!(domain = %domain, "Node recovered");
        } else {
            debug!(domain = %domain, "Node healthy");
        }
        return Ok(NodeOutcome::Healthy { recovered });
    }

    let went_offline = record.is_online;
    let updated = merge::mark_offline(&record, now);

    if went_offline || record.down_since.is_none() {
        if !store.node_update(&updated).await? {
            return Ok(NodeOutcome::Vanished);
        }
        if went_offline {
            info!(domain = %domain, "Node went offline");
        } else {
            warn!(domain = %domain, "Offline node had no down_since, stamped with cycle time");
        }
    }

    if let Some(down_since) = updated.down_since
        && let Some(cutoff) = now.checked_sub_signed(eviction_after)
        && down_since <= cutoff
    {
        // The row may have changed since it was listed
        if !store.node_delete_if_down_since(&updated.id, cutoff).await? {
            debug!(domain = %domain, "Eviction skipped, node changed during sweep");
            return Ok(NodeOutcome::Unhealthy { went_offline });
        }
        info!(domain = %domain, down_since = %down_since, "Evicted node after prolonged downtime");
        return Ok(NodeOutcome::Evicted);
    }

    Ok(NodeOutcome::Unhealthy { went_offline })
}
