//! Periodic visitor status sweep.

use std::time::Duration;

use chrono::{DateTime, Utc};
use lift_core::error::LiftResult;
use lift_core::models::visitor_access::StatusTransition;
use lift_core::repository::VisitorAccessRepository;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::events::{AccessEvent, EventPublisher};

/// Records moved by one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub activated: Vec<StatusTransition>,
    pub expired: Vec<StatusTransition>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty() && self.expired.is_empty()
    }
}

/// Moves visitor records Pending → Active → Expired as time passes.
pub struct StatusSweeper<V: VisitorAccessRepository, E: EventPublisher> {
    access_repo: V,
    publisher: E,
}

impl<V: VisitorAccessRepository, E: EventPublisher> StatusSweeper<V, E> {
    pub fn new(access_repo: V, publisher: E) -> Self {
        Self {
            access_repo,
            publisher,
        }
    }

    /// Apply both transitions as of `now` and announce each move.
    ///
    /// Running it again with the same `now` changes nothing, and
    /// expired records are never touched.
    pub async fn sweep_statuses(&self, now: DateTime<Utc>) -> LiftResult<SweepReport> {
        let moved = self.access_repo.transition_statuses(now).await?;

        for transition in moved.activated.iter().chain(&moved.expired) {
            self.publisher.publish(AccessEvent::VisitorStatusChanged {
                visitor_access_id: transition.visitor_access_id,
                visitor_name: transition.visitor_name.clone(),
                status: transition.status,
                at: now,
            });
        }

        let report = SweepReport {
            activated: moved.activated,
            expired: moved.expired,
        };
        if !report.is_empty() {
            info!(
                activated = report.activated.len(),
                expired = report.expired.len(),
                "Visitor statuses swept"
            );
        }
        Ok(report)
    }

    /// Sweep every `interval` until `shutdown` flips to `true`.
    ///
    /// A failed sweep is logged and retried on the next tick.
    pub async fn run_periodic(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_statuses(Utc::now()).await {
                        error!(error = %e, "Status sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Status sweeper stopping");
                        break;
                    }
                }
            }
        }
    }
}
