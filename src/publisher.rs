//! The status publish loop.
//!
//! One loop, one store connection, one tick counter. Each iteration
//! gathers the host facts, composes a [`StatusFrame`], and writes the
//! three display keys in order. Failures are not retried; they bubble up
//! and end the process.

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::PublisherResult;
use crate::hostinfo::HostInfo;
use crate::status::StatusFrame;
use crate::store::StoreClient;

/// Periodic host status publisher.
pub struct StatusPublisher<H> {
    store: StoreClient,
    host: H,
    period: Duration,
    ticks: u64,
}

impl<H: HostInfo> StatusPublisher<H> {
    /// Create a publisher around an established store connection.
    pub fn new(store: StoreClient, host: H, period: Duration) -> Self {
        Self {
            store,
            host,
            period,
            ticks: 0,
        }
    }

    /// Number of frames published so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Publish one frame stamped with the current local wall-clock time.
    pub async fn publish_once(&mut self) -> PublisherResult<()> {
        let now = Local::now().naive_local();
        self.publish_frame(now).await
    }

    async fn publish_frame(&mut self, now: NaiveDateTime) -> PublisherResult<()> {
        let hostname = self.host.hostname()?;
        let address = self
            .host
            .primary_ipv4()
            .map(|ip| ip.to_string())
            .unwrap_or_default();

        let frame = StatusFrame::compose(&hostname, &address, now, self.ticks);
        for (key, value) in frame.entries() {
            self.store.set(key, value).await?;
        }

        self.ticks += 1;
        debug!(tick = self.ticks, clock = %frame.clock, "Published status frame");
        Ok(())
    }

    /// Run until the shutdown signal fires, then release the connection.
    ///
    /// The inter-iteration wait is a plain sleep measured after the loop
    /// body, so the period is not compensated for the time the body takes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PublisherResult<u64> {
        info!(period_secs = self.period.as_secs(), "Status publish loop started");

        loop {
            self.publish_once().await?;

            tokio::select! {
                _ = tokio::time::sleep(self.period) => {}
                _ = shutdown.changed() => {
                    info!("Shutdown signal received, stopping publish loop");
                    break;
                }
            }
        }

        let ticks = self.ticks;
        self.store.close().await?;
        Ok(ticks)
    }
}
