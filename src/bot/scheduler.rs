//! Outer loop: fetch word, scan, sleep, forever.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::bot::Error;
use crate::bot::engine::MatchEngine;
use crate::bot::reddit::{ReplyTransport, StreamWatcher};
use crate::bot::word::WordSource;

pub struct Scheduler<W, P> {
    source: W,
    engine: MatchEngine<P>,
    interval: Duration,
}

impl<W: WordSource, P: StreamWatcher + ReplyTransport> Scheduler<W, P> {
    pub fn new(source: W, engine: MatchEngine<P>, interval: Duration) -> Self {
        Self { source, engine, interval }
    }

    pub fn engine(&self) -> &MatchEngine<P> {
        &self.engine
    }

    /// One cycle. Non-fatal failures are logged and swallowed so the loop
    /// simply tries again after the next sleep.
    pub async fn run_once(&mut self) -> Result<(), Error> {
        let record = match self.source.fetch().await {
            Ok(record) => record,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Skipping cycle: {e}");
                return Ok(());
            }
        };

        match self.engine.run_cycle(&record).await {
            Ok(report) => {
                info!(
                    "Cycle done for '{}': scanned {}, replied {}, failed {}",
                    record.word(),
                    report.scanned,
                    report.replied,
                    report.failed
                );
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Skipping cycle: {e}");
                Ok(())
            }
        }
    }

    /// Run until Ctrl-C or a fatal error. Ctrl-C is only honoured between
    /// cycles; a cycle always runs to completion.
    pub async fn run(mut self) -> Result<(), Error> {
        info!("Polling every {}s", self.interval.as_secs());
        loop {
            if let Err(e) = self.run_once().await {
                error!("Fatal: {e}");
                return Err(e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C, stopping");
                    return Ok(());
                }
            }
        }
    }
}
