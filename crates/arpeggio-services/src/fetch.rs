//! Fetching the bundled default sound from a URL or the filesystem

use std::io::Read;
use std::time::Duration;

use arpeggio_core::{ArpError, Fetch, Result};
use tracing::{debug, info};

/// Refuse anything larger than this; a default sound is a short one-shot
const MAX_SOUND_BYTES: u64 = 32 * 1024 * 1024;

/// Reads `http(s)://` identifiers over HTTP and anything else as a file path
#[derive(Debug, Clone)]
pub struct ResourceFetcher {
    timeout: Duration,
}

impl Default for ResourceFetcher {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(10) }
    }
}

impl ResourceFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn fetch_http(&self, url: &str) -> Result<Vec<u8>> {
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let response = agent
            .get(url)
            .call()
            .map_err(|e| ArpError::Fetch(format!("{url}: {e}")))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_SOUND_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| ArpError::Fetch(format!("{url}: {e}")))?;

        info!(url, bytes = bytes.len(), "Fetched sound");
        Ok(bytes)
    }
}

fn is_remote(resource: &str) -> bool {
    resource.starts_with("http://") || resource.starts_with("https://")
}

impl Fetch for ResourceFetcher {
    fn fetch(&self, resource: &str) -> Result<Vec<u8>> {
        if is_remote(resource) {
            return self.fetch_http(resource);
        }

        debug!(path = resource, "Reading sound from disk");
        std::fs::read(resource).map_err(|e| ArpError::Fetch(format!("{resource}: {e}")))
    }
}
