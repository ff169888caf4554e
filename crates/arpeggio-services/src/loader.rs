//! Background source loading: read or fetch bytes, then decode, off the caller's thread

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arpeggio_core::{ArpError, AudioDecoder, DecodedBuffer, Fetch, LoadTicket, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::debug;

/// Where a load gets its encoded bytes
#[derive(Debug, Clone)]
pub enum LoadJob {
    File(PathBuf),
    Resource(String),
    Bytes(Vec<u8>),
}

/// A finished load, to be handed to the resolver
#[derive(Debug)]
pub struct LoadResult {
    pub ticket: LoadTicket,
    pub label: String,
    pub result: Result<DecodedBuffer>,
}

pub struct SourceLoader {
    decoder: Arc<dyn AudioDecoder>,
    fetcher: Arc<dyn Fetch>,
    result_tx: Sender<LoadResult>,
    result_rx: Receiver<LoadResult>,
    in_flight: usize,
}

impl SourceLoader {
    pub fn new(decoder: Arc<dyn AudioDecoder>, fetcher: Arc<dyn Fetch>) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            decoder,
            fetcher,
            result_tx,
            result_rx,
            in_flight: 0,
        }
    }

    /// Loads submitted and not yet received
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Run `job` on a worker thread; its result arrives through `try_recv`/`recv_timeout`
    pub fn submit(&mut self, ticket: LoadTicket, label: impl Into<String>, job: LoadJob) {
        let label = label.into();
        let decoder = self.decoder.clone();
        let fetcher = self.fetcher.clone();
        let tx = self.result_tx.clone();
        self.in_flight += 1;

        debug!(kind = %ticket.kind, generation = ticket.generation, label = %label, "Submitting load");

        thread::spawn(move || {
            let result = read_job(&job, fetcher.as_ref()).and_then(|bytes| decoder.decode(&bytes));
            let _ = tx.send(LoadResult { ticket, label, result });
        });
    }

    pub fn try_recv(&mut self) -> Option<LoadResult> {
        let result = self.result_rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(result)
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<LoadResult> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(result)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn read_job(job: &LoadJob, fetcher: &dyn Fetch) -> Result<Vec<u8>> {
    match job {
        LoadJob::File(path) => std::fs::read(path).map_err(ArpError::from),
        LoadJob::Resource(resource) => fetcher.fetch(resource),
        LoadJob::Bytes(bytes) => Ok(bytes.clone()),
    }
}
