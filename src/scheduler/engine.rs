//! Scheduler loop: sleep until the next daily fire time, fire, repeat.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::DailySchedule;
use crate::runner::Orchestrator;

/// Run until `shutdown` resolves.
///
/// Each firing is spawned as its own task, so a long firing never delays the
/// next trigger and an overlapping manual run proceeds independently.
/// Once `shutdown` resolves no new firing starts, but firings already running
/// are awaited so they still clean up and emit CRON_END.
pub async fn run_scheduler_loop<F>(
    schedule: DailySchedule,
    orchestrator: Arc<Orchestrator>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    info!(%schedule, "Scheduler started");
    run_firing_loop(
        |now| schedule.next_fire_after(now).map(|t| t.with_timezone(&Utc)),
        orchestrator,
        shutdown,
    )
    .await;
}

/// The loop behind [`run_scheduler_loop`], driven by any fire-time source.
///
/// `next_fire` maps the current time to the next strictly later fire time;
/// `None` stops the loop.
pub async fn run_firing_loop<N, F>(mut next_fire: N, orchestrator: Arc<Orchestrator>, shutdown: F)
where
    N: FnMut(DateTime<Utc>) -> Option<DateTime<Utc>>,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut firings: JoinSet<()> = JoinSet::new();

    loop {
        let now = Utc::now();
        let Some(next) = next_fire(now) else {
            error!("Schedule yields no further fire times, stopping");
            break;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(next = %next.to_rfc3339(), wait_secs = wait.as_secs(), "Waiting for next firing");

        tokio::select! {
            _ = &mut shutdown => {
                info!("Scheduler stopped, no further firings will start");
                break;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        // The monotonic timer can drift from wall-clock time over a day.
        if Utc::now() < next {
            debug!("Woke before fire time, sleeping again");
            continue;
        }

        reap(&mut firings);

        let orchestrator = orchestrator.clone();
        firings.spawn(async move {
            let report = orchestrator.execute().await;
            debug!(id = %report.id, status = report.status.as_str(), "Firing task done");
        });
    }

    if !firings.is_empty() {
        info!(in_flight = firings.len(), "Waiting for running firings to finish");
    }
    while let Some(done) = firings.join_next().await {
        if let Err(e) = done {
            warn!(error = %e, "Firing ended abnormally");
        }
    }
}

fn reap(firings: &mut JoinSet<()>) {
    while let Some(done) = firings.try_join_next() {
        if let Err(e) = done {
            warn!(error = %e, "Previous firing ended abnormally");
        }
    }
}
