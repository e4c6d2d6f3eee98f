//! Maintenance Scheduler
//!
//! Owns the three background loops (refresh, health monitor, cleanup). Each
//! loop sleeps on its own interval and wakes early on the shared shutdown
//! signal. A failed iteration is logged and the loop carries on.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::CacheClient;
use crate::tasks::{run_warmers, SharedSink, SharedWarmer};
use crate::telemetry::Telemetry;

// == Schedule ==
/// Interval of each loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub refresh: Duration,
    pub health: Duration,
    pub cleanup: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            refresh: Duration::from_secs(30 * 60),
            health: Duration::from_secs(5 * 60),
            cleanup: Duration::from_secs(2 * 60 * 60),
        }
    }
}

struct RunningLoops {
    shutdown: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

// == Scheduler ==
/// Background maintenance for one cache client.
///
/// `Stopped -> Running` on [`start`](Self::start), back on
/// [`stop`](Self::stop), which returns only after every loop has exited.
pub struct MaintenanceScheduler {
    client: CacheClient,
    telemetry: Telemetry,
    warmers: Arc<Vec<SharedWarmer>>,
    sinks: Arc<Vec<SharedSink>>,
    schedule: Schedule,
    running: Arc<AtomicBool>,
    loops: Mutex<Option<RunningLoops>>,
}

impl MaintenanceScheduler {
    // == Constructor ==
    pub fn new(
        client: CacheClient,
        telemetry: Telemetry,
        warmers: Vec<SharedWarmer>,
        sinks: Vec<SharedSink>,
        schedule: Schedule,
    ) -> Self {
        Self {
            client,
            telemetry,
            warmers: Arc::new(warmers),
            sinks: Arc::new(sinks),
            schedule,
            running: Arc::new(AtomicBool::new(false)),
            loops: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    // == Start ==
    /// Spawns the three loops. Returns false if already running.
    pub async fn start(&self) -> bool {
        let mut loops = self.loops.lock().await;
        if loops.is_some() {
            return false;
        }

        let (shutdown, _) = broadcast::channel(1);
        let handles = vec![
            self.spawn_refresh_loop(shutdown.subscribe()),
            self.spawn_health_loop(shutdown.subscribe()),
            self.spawn_cleanup_loop(shutdown.subscribe()),
        ];

        *loops = Some(RunningLoops { shutdown, handles });
        self.running.store(true, Ordering::SeqCst);
        info!(
            "Maintenance scheduler started (refresh {:?}, health {:?}, cleanup {:?})",
            self.schedule.refresh, self.schedule.health, self.schedule.cleanup
        );
        true
    }

    // == Stop ==
    /// Signals every loop and waits for each to exit. In-flight store calls
    /// are allowed to finish. Returns false if not running.
    pub async fn stop(&self) -> bool {
        let Some(running) = self.loops.lock().await.take() else {
            return false;
        };

        self.running.store(false, Ordering::SeqCst);
        // Send only fails when every loop has already exited
        let _ = running.shutdown.send(());

        for handle in running.handles {
            if let Err(e) = handle.await {
                error!("Maintenance loop ended abnormally: {}", e);
            }
        }

        info!("Maintenance scheduler stopped");
        true
    }

    // == Loops ==
    fn spawn_refresh_loop(&self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let client = self.client.clone();
        let warmers = self.warmers.clone();
        spawn_loop("refresh", self.schedule.refresh, shutdown, move || {
            refresh_once(client.clone(), warmers.clone())
        })
    }

    fn spawn_health_loop(&self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let telemetry = self.telemetry.clone();
        let sinks = self.sinks.clone();
        spawn_loop("health", self.schedule.health, shutdown, move || {
            health_once(telemetry.clone(), sinks.clone())
        })
    }

    fn spawn_cleanup_loop(&self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let client = self.client.clone();
        let telemetry = self.telemetry.clone();
        spawn_loop("cleanup", self.schedule.cleanup, shutdown, move || {
            cleanup_once(client.clone(), telemetry.clone())
        })
    }
}

// == Loop Bodies ==
async fn refresh_once(client: CacheClient, warmers: Arc<Vec<SharedWarmer>>) -> anyhow::Result<()> {
    if !client.is_available() || warmers.is_empty() {
        debug!("Refresh skipped");
        return Ok(());
    }

    let result = run_warmers(&warmers, &client, None).await;
    if !result.failures.is_empty() {
        anyhow::bail!("{} of {} warmers failed", result.failures.len(), warmers.len());
    }
    Ok(())
}

async fn health_once(telemetry: Telemetry, sinks: Arc<Vec<SharedSink>>) -> anyhow::Result<()> {
    if !telemetry.is_available() {
        warn!("Health check skipped: cache backend not initialized");
        return Ok(());
    }

    let snapshot = telemetry.health_check().await?;
    for sink in sinks.iter() {
        sink.record(&snapshot).await;
    }
    Ok(())
}

async fn cleanup_once(client: CacheClient, telemetry: Telemetry) -> anyhow::Result<()> {
    if !client.is_available() {
        debug!("Cleanup skipped");
        return Ok(());
    }

    let removed = client.clear_keys_without_expiry().await?;
    debug!("Cleanup removed {} keys without expiry", removed);

    let memory = telemetry.memory_analysis().await?;
    if memory.utilization_percent > telemetry.thresholds().memory_warning_percent {
        warn!(
            "Cache memory utilization high: {}% ({})",
            memory.utilization_percent, memory.used_memory_human
        );
    }
    Ok(())
}

/// Runs `body` every `interval` until the shutdown signal arrives.
fn spawn_loop<F, Fut>(
    name: &'static str,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut body: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        debug!("Starting {} loop with interval of {:?}", name, interval);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            if let Err(e) = body().await {
                error!("{} loop iteration failed: {:#}", name, e);
            }
        }

        debug!("{} loop stopped", name);
    })
}
