// Polling fallback for platforms without reachability callbacks.
//
// Any HTTP response from the health URL counts as reachable, whatever its
// status; only a transport failure counts as offline.

use std::time::Duration;

use reqwest::Client;

use crate::shared::infrastructure::reachability::ReachabilityProbe;

pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::trace!(url = %self.url, %error, "reachability probe failed");
                false
            }
        }
    }
}
