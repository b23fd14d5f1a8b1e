use async_trait::async_trait;

/// Raw, undebounced network reachability as the platform reports it.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

pub mod http;
pub mod signal;
