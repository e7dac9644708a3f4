//! Page fetching.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// Fetches a page body by URL. The crawl and catalog code is written against
/// this trait so tests can feed canned pages instead of hitting the network.
pub trait PageFetch {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP fetcher with conservative timeouts. One agent is reused for
/// the whole run so keep-alive connections survive across pages.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .user_agent(concat!("chartwatch/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let resp = match self.agent.get(url).set("Accept", "text/html, application/json").call() {
            Ok(r) => r,
            Err(ureq::Error::Status(code, _)) => {
                return Err(anyhow!("GET {} returned HTTP {}", url, code));
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(anyhow!("GET {} failed: {}", url, t));
            }
        };
        resp.into_string()
            .with_context(|| format!("reading response body of {}", url))
    }
}
