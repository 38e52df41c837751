use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{Connector, SharedConn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Outcome of a single keepalive cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Healthy,
    Reconnected,
    StillDown,
}

/// Background owner of the store connection: probes it on a fixed interval
/// and swaps in a fresh one when the probe fails.
pub struct ConnectionKeeper<C: Connector> {
    connector: Arc<C>,
    handle: SharedConn<C::Conn>,
    interval: Duration,
}

impl<C: Connector> ConnectionKeeper<C> {
    pub fn new(connector: C, handle: SharedConn<C::Conn>, interval: Duration) -> Self {
        Self {
            connector: Arc::new(connector),
            handle,
            interval,
        }
    }

    pub fn handle(&self) -> SharedConn<C::Conn> {
        self.handle.clone()
    }

    /// One probe-and-repair cycle. A ping that outlasts the interval counts
    /// as a failure.
    pub async fn tick(&self) -> Probe {
        if let Some(conn) = self.handle.load() {
            match tokio::time::timeout(self.interval, self.connector.ping(&conn)).await {
                Ok(Ok(())) => return Probe::Healthy,
                Ok(Err(e)) => warn!(error = %e, "lost store connection, restoring"),
                Err(_) => warn!(timeout = ?self.interval, "store ping timed out, restoring"),
            }
        } else {
            debug!("no store connection, restoring");
        }

        // Unpublish first so callers fail fast instead of using a dying handle.
        // Closing may wait on checked-out connections, so it runs off the repair path.
        if let Some(stale) = self.handle.take() {
            let connector = Arc::clone(&self.connector);
            tokio::spawn(async move {
                connector.close(&stale).await;
                debug!("stale store connection closed");
            });
        }

        match self.connector.connect().await {
            Ok(conn) => {
                self.handle.store(conn);
                info!("store reconnected");
                Probe::Reconnected
            }
            Err(e) => {
                warn!(error = %e, retry_in = ?self.interval, "store reconnect failed");
                Probe::StillDown
            }
        }
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("connection keeper stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    };

    use async_trait::async_trait;

    use super::*;

    struct FakeConn {
        generation: u32,
        closed: AtomicBool,
    }

    #[derive(Clone, Default)]
    struct FakeConnector {
        probe_fails: Arc<AtomicBool>,
        connect_fails: Arc<AtomicBool>,
        ping_hangs: Arc<AtomicBool>,
        close_hangs: Arc<AtomicBool>,
        generations: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Conn = FakeConn;

        async fn connect(&self) -> anyhow::Result<FakeConn> {
            if self.connect_fails.load(Ordering::SeqCst) {
                anyhow::bail!("connection refused");
            }
            Ok(FakeConn {
                generation: self.generations.fetch_add(1, Ordering::SeqCst) + 1,
                closed: AtomicBool::new(false),
            })
        }

        async fn ping(&self, conn: &FakeConn) -> anyhow::Result<()> {
            if self.ping_hangs.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if conn.closed.load(Ordering::SeqCst) || self.probe_fails.load(Ordering::SeqCst) {
                anyhow::bail!("ping failed");
            }
            Ok(())
        }

        async fn close(&self, conn: &FakeConn) {
            if self.close_hangs.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            conn.closed.store(true, Ordering::SeqCst);
        }
    }

    /// What a repository call does with the handle: fail when absent or closed.
    fn call(handle: &SharedConn<FakeConn>) -> Result<u32, &'static str> {
        let conn = handle.load().ok_or("backend unavailable")?;
        if conn.closed.load(Ordering::SeqCst) {
            return Err("backend unavailable");
        }
        Ok(conn.generation)
    }

    fn initial() -> FakeConn {
        FakeConn {
            generation: 0,
            closed: AtomicBool::new(false),
        }
    }

    #[tokio::test]
    async fn healthy_connection_is_left_alone() {
        let connector = FakeConnector::default();
        let keeper = ConnectionKeeper::new(
            connector.clone(),
            SharedConn::new(initial()),
            Duration::from_millis(5),
        );
        assert_eq!(keeper.tick().await, Probe::Healthy);
        assert_eq!(call(&keeper.handle()), Ok(0));
        assert_eq!(connector.generations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn outage_then_reconnect_swaps_handle() {
        let connector = FakeConnector::default();
        let keeper = ConnectionKeeper::new(
            connector.clone(),
            SharedConn::new(initial()),
            Duration::from_millis(5),
        );
        let handle = keeper.handle();
        let old = handle.load().unwrap();

        connector.probe_fails.store(true, Ordering::SeqCst);
        connector.connect_fails.store(true, Ordering::SeqCst);
        assert_eq!(keeper.tick().await, Probe::StillDown);
        assert!(handle.load().is_none());
        // close runs on its own task
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(old.closed.load(Ordering::SeqCst));
        assert_eq!(call(&handle), Err("backend unavailable"));

        // still down: a missing handle triggers another attempt
        assert_eq!(keeper.tick().await, Probe::StillDown);

        connector.probe_fails.store(false, Ordering::SeqCst);
        connector.connect_fails.store(false, Ordering::SeqCst);
        assert_eq!(keeper.tick().await, Probe::Reconnected);
        assert_eq!(call(&handle), Ok(1));
        assert_eq!(keeper.tick().await, Probe::Healthy);
    }

    #[tokio::test]
    async fn hung_ping_and_close_do_not_block_reconnect() {
        let connector = FakeConnector::default();
        let keeper = ConnectionKeeper::new(
            connector.clone(),
            SharedConn::new(initial()),
            Duration::from_millis(20),
        );
        connector.ping_hangs.store(true, Ordering::SeqCst);
        connector.close_hangs.store(true, Ordering::SeqCst);

        let probe = tokio::time::timeout(Duration::from_secs(1), keeper.tick())
            .await
            .expect("tick should not wait on a dead connection");
        assert_eq!(probe, Probe::Reconnected);
        assert_eq!(call(&keeper.handle()), Ok(1));
    }

    #[tokio::test]
    async fn starts_without_connection() {
        let keeper = ConnectionKeeper::new(
            FakeConnector::default(),
            SharedConn::empty(),
            Duration::from_millis(5),
        );
        assert_eq!(keeper.tick().await, Probe::Reconnected);
        assert_eq!(call(&keeper.handle()), Ok(1));
    }

    #[tokio::test]
    async fn concurrent_callers_never_use_a_closed_handle() {
        let connector = FakeConnector::default();
        let keeper = ConnectionKeeper::new(
            connector.clone(),
            SharedConn::new(initial()),
            Duration::from_millis(2),
        );
        let handle = keeper.handle();
        let (tx, rx) = watch::channel(false);
        let task = keeper.spawn(rx);

        connector.connect_fails.store(true, Ordering::SeqCst);
        connector.probe_fails.store(true, Ordering::SeqCst);

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    for _ in 0..200 {
                        if let Some(conn) = handle.load() {
                            // a loaded handle is either live or reports closed; never both
                            seen.push((conn.generation, conn.closed.load(Ordering::SeqCst)));
                        }
                        tokio::task::yield_now().await;
                    }
                    seen
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.load().is_none());

        connector.connect_fails.store(false, Ordering::SeqCst);
        connector.probe_fails.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;

        let new_generation = call(&handle).expect("reconnected");
        assert!(new_generation >= 1);

        for reader in readers {
            for (generation, closed) in reader.await.unwrap() {
                // only generation 0 was ever closed while published
                if generation >= 1 {
                    assert!(!closed);
                }
            }
        }

        tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stops_on_shutdown_signal() {
        let keeper = ConnectionKeeper::new(
            FakeConnector::default(),
            SharedConn::new(initial()),
            Duration::from_secs(3600),
        );
        let (tx, rx) = watch::channel(false);
        let task = keeper.spawn(rx);
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("keeper should stop promptly")
            .unwrap();
    }
}
